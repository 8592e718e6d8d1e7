//! # flatsite
//!
//! A flat-file content engine. The filesystem is the database: every
//! directory below the content root is a page, text files inside it hold
//! the page's fields, and every other file is attached to the page.
//!
//! ```text
//! content/
//! ├── site.txt              → site-wide fields
//! ├── home/home.txt         → homepage (no number: invisible)
//! ├── error/error.txt       → error page
//! └── 01-projects/          → visible page, position 1
//!     ├── projects.txt      → fields; the file name picks the template
//!     └── project-a/
//!         ├── project.txt
//!         ├── photo.jpg
//!         └── photo.jpg.txt → fields describing photo.jpg
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`site`] | Site root: config, languages, page arena, request resolution, rendering |
//! | [`page`] | Page handles: traversal, fields, URLs, structural mutations |
//! | [`pages`] | Page collections: visibility filters, flattening, level-by-level lookup |
//! | [`files`] | Files attached to a page: type table, metadata companions, thumbnails |
//! | [`content`] | Content file format, content units, typed field values |
//! | [`collection`] | Ordered keyed collection with filtering, sorting and slicing |
//! | [`dir`] | Lazy directory scans |
//! | [`naming`] | `NN-uid` directory names, slugs, field keys |
//! | [`language`] | Configured languages and the default |
//! | [`router`] | URL patterns mapped to pages |
//! | [`markup`] | Field text → HTML |
//! | [`render`] | Maud templates |
//! | [`cache`] | Rendered-page cache |
//! | [`config`] | `config.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | tracing subscriber setup for the binary |
//!
//! # Design Decisions
//!
//! ## Handles Over an Arena
//!
//! [`Page`] values are cheap handles: the [`Site`] plus a shared record in
//! the site's arena, keyed by directory path. Parents and children are
//! re-derived from paths instead of stored as pointers, so the tree has no
//! reference cycles and two lookups of the same directory see the same
//! memoized state.
//!
//! ## Lazy, Memoized, Explicitly Invalidated
//!
//! Nothing is read until asked for. Directory scans, file lists and parsed
//! content are kept on the record. Mutations drop the affected records
//! (the page, its ancestors, its descendants) and return fresh handles;
//! handles taken before a mutation keep their old view.
//!
//! ## Single-Threaded Site
//!
//! A [`Site`] serves one request at a time on one thread. Shared state uses
//! `Rc` and `RefCell`, so the type is not `Send`.

pub mod cache;
pub mod collection;
pub mod config;
pub mod content;
pub mod dir;
pub mod error;
pub mod files;
pub mod language;
pub mod logging;
pub mod markup;
pub mod naming;
pub mod output;
pub mod page;
pub mod pages;
pub mod render;
pub mod router;
pub mod site;

pub use collection::{Collection, Entry};
pub use content::{Content, Field};
pub use error::{Error, Result};
pub use files::{File, FileType, Files};
pub use page::{Page, PageId, SortTarget, Visibility};
pub use pages::Pages;
pub use site::Site;

#[cfg(test)]
pub(crate) mod test_helpers;
