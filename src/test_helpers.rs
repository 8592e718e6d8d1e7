//! Shared test utilities for the flatsite test suite.
//!
//! Fixture sites are copied to a temp directory so tests can mutate them
//! freely. Lookup helpers panic with the list of available pages on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (_tmp, site) = setup_site();
//! let project = find_page(&site, "projects/project-a");
//! assert_eq!(project.title().value(), "A");
//! assert_eq!(visible_numbers(&site.root()), vec![1, 2, 3]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::page::Page;
use crate::pages::Pages;
use crate::site::Site;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and open it.
pub fn setup_site() -> (TempDir, Site) {
    setup_fixture("site")
}

/// Copy `fixtures/multilang/` (en default, de) to a temp directory and open it.
pub fn setup_multilang_site() -> (TempDir, Site) {
    setup_fixture("multilang")
}

fn setup_fixture(name: &str) -> (TempDir, Site) {
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

/// Create `dir` if needed and write one file into it.
pub fn write_page(dir: &Path, filename: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(filename), body).unwrap();
}

// =========================================================================
// Lookups (panic with a clear message on miss)
// =========================================================================

/// Find a page by uid path. Panics if not found.
pub fn find_page(site: &Site, uri: &str) -> Page {
    site.page(uri).unwrap_or_else(|| {
        let available = keys(&site.index());
        panic!("page '{uri}' not found. Available: {available:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Collection keys in order.
pub fn keys(pages: &Pages) -> Vec<String> {
    pages.keys().map(str::to_string).collect()
}

/// Sort numbers of the visible children of `page`, ascending.
pub fn visible_numbers(page: &Page) -> Vec<u32> {
    let mut numbers: Vec<u32> = page
        .children()
        .visible()
        .iter()
        .filter_map(Page::number)
        .collect();
    numbers.sort_unstable();
    numbers
}
