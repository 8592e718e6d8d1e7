//! Content units and their fields.
//!
//! A content file holds a page's (or an asset's) structured fields as
//! sections separated by lines of four or more dashes:
//!
//! ```text
//! Title: Hello
//!
//! ----
//!
//! Text: World
//! ```
//!
//! Each section splits on its first colon. Keys are normalized with
//! [`naming::sanitize_key`]; a section without a colon becomes an empty
//! field named after the whole section, and sections whose key sanitizes to
//! nothing are dropped. Field order follows the file.
//!
//! File names carry an optional language code before the extension
//! (`project.de.txt`). On multi-language sites the code picks the unit's
//! language; an absent or unknown code means the default language.

use crate::error::{Error, Result};
use crate::language::Languages;
use crate::naming;
use crate::page::PageId;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use regex::Regex;
use std::cell::OnceCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

static DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^-{4,}[ \t]*\r?$").expect("delimiter regex is valid"));

/// Value lines written with one extra leading space on save.
static DELIMITER_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ *-{4,}[ \t]*\r?$").expect("delimiter-like regex is valid"));

static ESCAPED_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ ( *-{4,}[ \t]*\r?)$").expect("escape regex is valid"));

static LANGUAGE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\.([a-zA-Z]{2})$").expect("language regex is valid"));

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

/// Split a file stem into its base name and language code.
///
/// Only codes of configured languages count; anything else stays part of
/// the name and the default language applies. Single-language sites always
/// get the empty code.
pub fn split_language<'a>(stem: &'a str, languages: &Languages) -> (&'a str, String) {
    if !languages.is_enabled() {
        return (stem, String::new());
    }
    if let Some(caps) = LANGUAGE_SUFFIX.captures(stem) {
        let code = caps[2].to_ascii_lowercase();
        if languages.contains(&code) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or(stem);
            return (name, code);
        }
    }
    (stem, languages.default_code().to_string())
}

/// Parse raw content text into an ordered key → value map.
pub fn parse(text: &str) -> IndexMap<String, String> {
    let mut fields = IndexMap::new();
    for section in DELIMITER.split(text) {
        let section = section.trim();
        let (raw_key, value) = match section.split_once(':') {
            Some((k, v)) => (k, v.trim()),
            None => (section, ""),
        };
        let key = naming::sanitize_key(raw_key);
        if key.is_empty() {
            continue;
        }
        let value = ESCAPED_DELIMITER.replace_all(value, "$1").into_owned();
        fields.insert(key, value);
    }
    fields
}

/// Serialize fields back into the sectioned text format.
///
/// Keys are written with an uppercase first letter. Every value line made
/// of dashes gains one leading space, already-indented ones included, and
/// [`parse`] removes exactly one again.
pub fn serialize<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    fields
        .into_iter()
        .map(|(key, value)| {
            let value = DELIMITER_LIKE.replace_all(value, " $0");
            format!("{}: {}", ucfirst(key), value.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n----\n\n")
        + "\n"
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One parsed content file.
#[derive(Debug)]
pub struct Content {
    root: PathBuf,
    filename: String,
    name: String,
    extension: String,
    language: String,
    is_default: bool,
    page: Option<PageId>,
    raw: OnceCell<String>,
    fields: OnceCell<IndexMap<String, Field>>,
}

impl Content {
    /// Wrap the content file at `root`. Nothing is read until a field is
    /// requested.
    pub fn new(root: impl Into<PathBuf>, languages: &Languages, page: Option<PageId>) -> Self {
        let root = root.into();
        let filename = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let (stem, extension) = match filename.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), ext.to_ascii_lowercase()),
            None => (filename.clone(), String::new()),
        };
        let (name, language) = split_language(&stem, languages);
        let is_default = language == languages.default_code();
        Self {
            name: name.to_string(),
            root,
            filename,
            extension,
            language,
            is_default,
            page,
            raw: OnceCell::new(),
            fields: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Base name without language code and extension (`project`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Detected language code, `""` on single-language sites.
    pub fn language_code(&self) -> &str {
        &self.language
    }

    /// Whether this is the default-language unit.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn exists(&self) -> bool {
        self.root.is_file()
    }

    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.root).and_then(|m| m.modified()).ok()
    }

    /// Unparsed file text. Unreadable files read as empty.
    pub fn raw(&self) -> &str {
        self.raw.get_or_init(|| match fs::read_to_string(&self.root) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %self.root.display(), error = %e, "content file unreadable");
                String::new()
            }
        })
    }

    /// All fields in file order, parsed on first access.
    pub fn fields(&self) -> &IndexMap<String, Field> {
        self.fields.get_or_init(|| {
            let parsed = parse(self.raw());
            tracing::debug!(file = %self.filename, fields = parsed.len(), "parsed content");
            parsed
                .into_iter()
                .map(|(key, value)| {
                    let field = Field::new(key.clone(), value, self.page);
                    (key, field)
                })
                .collect()
        })
    }

    /// A single field of this unit. Keys are sanitized before lookup, so
    /// `get("Published On")` finds `published_on`.
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields().get(&naming::sanitize_key(key))
    }

    /// Fields as plain key → value pairs.
    pub fn to_map(&self) -> IndexMap<String, String> {
        self.fields()
            .iter()
            .map(|(k, f)| (k.clone(), f.value().to_string()))
            .collect()
    }

    /// Write `fields` to this unit's file, replacing its contents.
    ///
    /// The in-memory view is not refreshed; construct a new unit to read
    /// the result.
    pub fn save(&self, fields: &IndexMap<String, String>) -> Result<()> {
        write(&self.root, fields)
    }
}

/// Serialize `fields` into the file at `path`.
pub fn write(path: &Path, fields: &IndexMap<String, String>) -> Result<()> {
    let text = serialize(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    fs::write(path, text).map_err(|e| Error::io(path, e))
}

/// A single field value.
///
/// Conversions are pure functions of the raw value. Conversions that need
/// page context (markup rendering, links) live on
/// [`Site`](crate::site::Site), which resolves [`Field::page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: String,
    value: String,
    page: Option<PageId>,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<String>, page: Option<PageId>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            page,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Page owning the content unit this field came from.
    pub fn page(&self) -> Option<PageId> {
        self.page
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Split on `separator`, trimming entries and dropping empty ones.
    pub fn split(&self, separator: char) -> Vec<String> {
        self.value
            .split(separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// `true`, `1`, `yes` and `on` (any case) are true.
    pub fn to_bool(&self) -> bool {
        matches!(
            self.value.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    }

    pub fn to_int(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }

    pub fn to_float(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }

    /// Parse `YYYY-MM-DD` with an optional `HH:MM[:SS]` time.
    pub fn to_date(&self) -> Option<NaiveDateTime> {
        let v = self.value.trim();
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(v, fmt) {
                return Some(dt);
            }
        }
        NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// Plain-text preview: tags and markdown emphasis removed, whitespace
    /// collapsed, cut to `chars` characters with an ellipsis.
    pub fn excerpt(&self, chars: usize) -> String {
        let stripped = TAGS.replace_all(&self.value, " ");
        let plain: String = stripped
            .chars()
            .filter(|c| !matches!(c, '*' | '_' | '#' | '`' | '>'))
            .collect();
        let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate(&collapsed, chars)
    }

    pub fn words(&self) -> usize {
        self.value.split_whitespace().count()
    }

    pub fn lower(&self) -> String {
        self.value.to_lowercase()
    }

    pub fn upper(&self) -> String {
        self.value.to_uppercase()
    }

    /// Cut to `len` characters with an ellipsis.
    pub fn short(&self, len: usize) -> String {
        truncate(self.value.trim(), len)
    }

    pub fn slug(&self) -> String {
        naming::slugify(&self.value)
    }

    /// HTML-escaped value.
    pub fn escape(&self) -> String {
        let mut out = String::with_capacity(self.value.len());
        for c in self.value.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

fn truncate(text: &str, chars: usize) -> String {
    if text.chars().count() <= chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(chars).collect();
    format!("{}…", cut.trim_end())
}
