//! Crate-wide error type.
//!
//! Every failure surfaces as a single [`Error`] carrying a human-readable
//! message and a machine-readable [`Error::code`]. Read-path lookups never
//! produce errors for "not found"; they return `None` or empty collections.
//! Structural mutations (create, move, sort, delete, visibility) fail fast
//! and do not roll back partial filesystem changes.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Parent page not found: {0}")]
    MissingParent(String),
    #[error("Invalid slug in {0:?}")]
    InvalidSlug(String),
    #[error("A page already exists at {0}")]
    PageExists(String),
    #[error("Page could not be found after creation: {0}")]
    MissingPage(String),
    #[error("Could not move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Page has children and cannot be deleted: {0}")]
    HasChildren(String),
    #[error("Not allowed to modify {0}")]
    Unauthorized(String),
    #[error("Page is invisible: {0}")]
    Invisible(String),
    #[error("Language support is enabled but no languages are configured")]
    NoLanguages,
    #[error("Render error in template {template}: {message}")]
    Render { template: String, message: String },
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Config(_) => "config",
            Self::MissingDirectory(_) => "missing-directory",
            Self::NotADirectory(_) => "not-a-directory",
            Self::MissingParent(_) => "missing-parent",
            Self::InvalidSlug(_) => "invalid-slug",
            Self::PageExists(_) => "page-exists",
            Self::MissingPage(_) => "missing-page",
            Self::MoveFailed { .. } => "move-failed",
            Self::HasChildren(_) => "has-children",
            Self::Unauthorized(_) => "unauthorized",
            Self::Invisible(_) => "invisible",
            Self::NoLanguages => "no-languages",
            Self::Render { .. } => "render",
        }
    }
}
