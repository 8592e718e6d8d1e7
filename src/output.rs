//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (page, file) leads with its identity on a header line and
//! shows filesystem detail as indented context lines underneath:
//!
//! ```text
//! Flat Site → https://example.org
//! 01 Projects → https://example.org/projects
//!     Source: 01-projects/ (projects.txt)
//!     -- A → https://example.org/projects/project-a
//!         Source: 01-projects/project-a/ (project.txt)
//!         Template: default (intended: project)
//! -- Home → https://example.org
//!     Source: home/ (home.txt)
//! ```
//!
//! Files:
//!
//! ```text
//! photo.jpg (image, 15 B)
//!     URL: https://example.org/content/01-projects/project-a/photo.jpg
//!     Meta: photo.jpg.txt
//!
//! 1 file, 15 B
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions do no I/O of their own. Machine-readable output goes through
//! [`PageSummary`], which serializes with serde.

use crate::collection::Entry;
use crate::files::Files;
use crate::page::Page;
use crate::site::Site;
use indexmap::IndexMap;
use serde::Serialize;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Sort number as written in the directory name, `--` for invisible pages.
fn format_num(page: &Page) -> String {
    page.num().unwrap_or("--").to_string()
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Header line: sort number, title and URL.
///
/// ```text
/// 01 Projects → https://example.org/projects
/// ```
fn page_header(page: &Page) -> String {
    format!(
        "{} {} → {}",
        format_num(page),
        page.title().value(),
        page.url(None)
    )
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Context lines shared by tree and show views.
fn page_context(page: &Page, depth: usize) -> Vec<String> {
    let pad = indent(depth);
    let mut lines = Vec::new();
    let source = match page.content(None) {
        Some(content) => format!("{}/ ({})", page.diruri(), content.filename()),
        None => format!("{}/", page.diruri()),
    };
    lines.push(format!("{pad}Source: {source}"));
    let template = page.template();
    let intended = page.intended_template();
    if template != intended {
        lines.push(format!("{pad}Template: {template} (intended: {intended})"));
    }
    lines
}

// ============================================================================
// Tree
// ============================================================================

fn walk_tree(page: &Page, depth: usize, lines: &mut Vec<String>) {
    for child in page.children().iter() {
        lines.push(format!("{}{}", indent(depth), page_header(child)));
        lines.extend(page_context(child, depth + 1));
        walk_tree(child, depth + 1, lines);
    }
}

/// Format the whole page tree, site first.
pub fn format_tree(site: &Site) -> Vec<String> {
    let root = site.root();
    let mut lines = vec![format!("{} → {}", root.title().value(), site.url())];
    walk_tree(&root, 0, &mut lines);
    lines
}

pub fn print_tree(site: &Site) {
    for line in format_tree(site) {
        println!("{}", line);
    }
}

// ============================================================================
// Single page
// ============================================================================

/// Format one page with all of its fields in the current language.
pub fn format_page(page: &Page) -> Vec<String> {
    let mut lines = vec![page_header(page)];
    lines.extend(page_context(page, 1));
    if let Some(content) = page.content(None) {
        for (key, field) in content.fields() {
            lines.push(format!("    {}: {}", key, truncate(field.value(), 60)));
        }
    }
    let children = page.children();
    if !children.is_empty() {
        lines.push(format!(
            "    Children: {} ({} visible)",
            children.len(),
            children.visible().len()
        ));
    }
    lines
}

pub fn print_page(page: &Page) {
    for line in format_page(page) {
        println!("{}", line);
    }
}

// ============================================================================
// Files
// ============================================================================

/// Format a page's files with their metadata companions.
pub fn format_files(files: &Files) -> Vec<String> {
    let mut lines = Vec::new();
    for file in files.iter() {
        lines.push(format!(
            "{} ({}, {})",
            file.filename(),
            file.kind(),
            file.nice_size()
        ));
        lines.push(format!("    URL: {}", file.url()));
        for meta in file.metas() {
            lines.push(format!("    Meta: {}", meta.filename()));
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    let count = files.len();
    lines.push(format!(
        "{} file{}, {}",
        count,
        if count == 1 { "" } else { "s" },
        crate::files::nice_size(files.total_size())
    ));
    lines
}

pub fn print_files(files: &Files) {
    for line in format_files(files) {
        println!("{}", line);
    }
}

// ============================================================================
// Machine-readable resolution
// ============================================================================

/// What a request path resolved to.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub id: String,
    pub uid: String,
    pub uid_path: String,
    pub num: Option<String>,
    pub uri: String,
    pub url: String,
    pub title: String,
    pub template: String,
    pub intended_template: String,
    pub visible: bool,
    pub depth: usize,
    pub language: String,
    pub path: String,
    pub params: IndexMap<String, String>,
    pub fields: IndexMap<String, String>,
}

impl PageSummary {
    pub fn new(site: &Site, page: &Page) -> Self {
        let fields = page
            .content(None)
            .map(|c| c.to_map())
            .unwrap_or_default();
        Self {
            id: page.id().to_string(),
            uid: page.uid().to_string(),
            uid_path: Entry::key(page),
            num: page.num().map(str::to_string),
            uri: page.uri(None),
            url: page.url(None),
            title: page.title().value().to_string(),
            template: page.template(),
            intended_template: page.intended_template(),
            visible: page.is_visible(),
            depth: page.depth(),
            language: site.language(),
            path: site.path(),
            params: site.params(),
            fields,
        }
    }
}

/// Format a resolution as short human-readable lines.
pub fn format_resolution(summary: &PageSummary) -> Vec<String> {
    let mut lines = vec![format!("/{} → {}", summary.path, summary.uid_path)];
    lines.push(format!("    Title: {}", summary.title));
    lines.push(format!("    URL: {}", summary.url));
    lines.push(format!("    Template: {}", summary.template));
    if !summary.language.is_empty() {
        lines.push(format!("    Language: {}", summary.language));
    }
    for (name, value) in &summary.params {
        lines.push(format!("    Param {}: {}", name, value));
    }
    lines
}

pub fn print_resolution(summary: &PageSummary) {
    for line in format_resolution(summary) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{find_page, setup_site};

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn truncate_short() {
        assert_eq!(truncate("Short text", 40), "Short text");
    }

    #[test]
    fn truncate_long() {
        let text = "a".repeat(50);
        assert_eq!(truncate(&text, 40), format!("{}...", "a".repeat(40)));
    }

    #[test]
    fn truncate_multibyte() {
        assert_eq!(truncate("ääää", 2), "ää...");
    }

    #[test]
    fn indent_is_four_spaces() {
        assert_eq!(indent(2), "        ");
    }

    // =========================================================================
    // Views
    // =========================================================================

    #[test]
    fn tree_lists_pages_nested() {
        let (_tmp, site) = setup_site();
        let lines = format_tree(&site);
        assert_eq!(lines[0], "Flat Site → https://example.org");
        assert_eq!(lines[1], "01 Projects → https://example.org/projects");
        assert_eq!(lines[2], "    Source: 01-projects/ (projects.txt)");
        assert!(lines.contains(&"    -- A → https://example.org/projects/project-a".to_string()));
        assert!(lines.contains(&"        Template: default (intended: project)".to_string()));
    }

    #[test]
    fn page_lists_fields() {
        let (_tmp, site) = setup_site();
        let lines = format_page(&find_page(&site, "projects"));
        assert!(lines.contains(&"    title: Projects".to_string()));
        assert!(lines.contains(&"    Children: 2 (0 visible)".to_string()));
    }

    #[test]
    fn files_show_metas_and_total() {
        let (_tmp, site) = setup_site();
        let files = find_page(&site, "projects/project-a").images();
        let lines = format_files(&files);
        assert!(lines[0].starts_with("photo.jpg (image, "));
        assert!(lines.contains(&"    Meta: photo.jpg.txt".to_string()));
        assert!(lines.last().unwrap().starts_with("1 file, "));
    }

    #[test]
    fn resolution_serializes() {
        let (_tmp, site) = setup_site();
        let page = site.visit("blog/2012/11");
        let summary = PageSummary::new(&site, &page);
        let lines = format_resolution(&summary);
        assert_eq!(lines[0], "/blog/2012/11 → blog");
        assert!(lines.contains(&"    Param year: 2012".to_string()));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["uid_path"], "blog");
        assert_eq!(json["params"]["month"], "11");
        assert_eq!(json["fields"]["title"], "Blog");
    }
}
