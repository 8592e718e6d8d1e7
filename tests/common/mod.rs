//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use flatsite::{Page, Site};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Initialize tracing for tests, respecting `FLATSITE_LOG`.
///
/// Safe to call multiple times; later calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("FLATSITE_LOG"))
        .with_test_writer()
        .try_init()
        .ok();
}

/// Copy `fixtures/<name>/` to a temp directory and open it as a site.
pub fn open_fixture(name: &str) -> (TempDir, Site) {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name);
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    let site = Site::open(tmp.path()).unwrap();
    (tmp, site)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Find a page by uid path. Panics if not found.
#[allow(dead_code)]
pub fn page(site: &Site, uri: &str) -> Page {
    site.page(uri)
        .unwrap_or_else(|| panic!("page '{uri}' not found"))
}

/// Directory names of a page's children, in order.
#[allow(dead_code)]
pub fn dirnames(page: &Page) -> Vec<String> {
    page.children()
        .iter()
        .map(|p| p.dirname().to_string())
        .collect()
}
