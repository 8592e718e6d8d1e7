//! Directory nodes.
//!
//! A [`Dir`] wraps one content directory: its parsed `[NNN-]uid` name, its
//! URI relative to the content root, and a lazily scanned split of its
//! immediate entries into files and subdirectories. The scan runs on first
//! access and is kept for the lifetime of the `Dir`; callers that need fresh
//! results construct a new one.

use crate::collection::natural_cmp;
use crate::error::{Error, Result};
use crate::naming::{self, ParsedName};
use indexmap::IndexMap;
use std::cell::OnceCell;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

/// Names excluded from every scan.
#[derive(Debug, Clone, Default)]
pub struct ScanRules {
    /// File or directory names skipped everywhere (`.git`, `.DS_Store`, ...).
    pub ignore: Vec<String>,
    /// Content file names that are never read.
    pub content_ignore: Vec<String>,
}

impl ScanRules {
    fn skips(&self, name: &str) -> bool {
        self.ignore.iter().any(|n| n == name) || self.content_ignore.iter().any(|n| n == name)
    }
}

/// Immediate entries of a directory, in natural name order.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    /// File name → absolute path.
    pub files: IndexMap<String, PathBuf>,
    /// Subdirectory name → absolute path.
    pub children: IndexMap<String, PathBuf>,
}

#[derive(Debug)]
pub struct Dir {
    root: PathBuf,
    name: String,
    parsed: ParsedName,
    uri: String,
    rules: Rc<ScanRules>,
    scan: OnceCell<Scan>,
}

impl Dir {
    /// Wrap `root`, computing its URI relative to `content_root`.
    pub fn new(root: impl Into<PathBuf>, content_root: &Path, rules: Rc<ScanRules>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let parsed = naming::parse_dirname(&name);
        let uri = relative_uri(&root, content_root);
        Self {
            root,
            name,
            parsed,
            uri,
            rules,
            scan: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory base name, prefix included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sort prefix digits, `None` for invisible directories.
    pub fn num(&self) -> Option<&str> {
        self.parsed.num.as_deref()
    }

    /// Numeric value of the sort prefix.
    pub fn number(&self) -> Option<u32> {
        self.parsed.number()
    }

    pub fn uid(&self) -> &str {
        &self.parsed.uid
    }

    /// Path relative to the content root, with forward slashes.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Read the directory's immediate entries.
    ///
    /// Fails if the root does not exist or is not a directory. Unreadable
    /// individual entries are skipped.
    pub fn scan(&self) -> Result<Scan> {
        if !self.root.exists() {
            return Err(Error::MissingDirectory(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(Error::NotADirectory(self.root.clone()));
        }
        let mut entries: Vec<(String, PathBuf, bool)> = fs::read_dir(&self.root)
            .map_err(|e| Error::io(&self.root, e))?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                if self.rules.skips(&name) {
                    return None;
                }
                let path = e.path();
                let is_dir = path.is_dir();
                Some((name, path, is_dir))
            })
            .collect();
        entries.sort_by(|a, b| natural_cmp(&a.0, &b.0));

        let mut scan = Scan::default();
        for (name, path, is_dir) in entries {
            if is_dir {
                scan.children.insert(name, path);
            } else {
                scan.files.insert(name, path);
            }
        }
        tracing::debug!(
            dir = %self.uri,
            files = scan.files.len(),
            children = scan.children.len(),
            "scanned directory"
        );
        Ok(scan)
    }

    fn entries(&self) -> &Scan {
        self.scan.get_or_init(|| {
            self.scan().unwrap_or_else(|e| {
                tracing::warn!(dir = %self.root.display(), error = %e, "directory scan failed");
                Scan::default()
            })
        })
    }

    /// File name → path for immediate files.
    pub fn files(&self) -> &IndexMap<String, PathBuf> {
        &self.entries().files
    }

    /// Directory name → path for immediate subdirectories.
    pub fn children(&self) -> &IndexMap<String, PathBuf> {
        &self.entries().children
    }

    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.root).and_then(|m| m.modified()).ok()
    }
}

/// `root` relative to `base`, joined with forward slashes. Empty for `base` itself.
pub fn relative_uri(root: &Path, base: &Path) -> String {
    root.strip_prefix(base)
        .unwrap_or(root)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
