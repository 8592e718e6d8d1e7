//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the site directory next to the content root:
//!
//! ```text
//! mysite/
//! ├── config.toml              # Site config (optional)
//! ├── cache/                   # Rendered-page cache (when enabled)
//! └── content/
//!     ├── home/
//!     ├── error/
//!     └── 01-projects/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! url = ""                  # Base URL, may include a subfolder path
//! content_root = "content"  # Content directory, relative to the site directory
//! home = "home"             # uid of the homepage
//! error = "error"           # uid of the error page
//! home_keepurl = false      # Keep the homepage uid in its URL
//! ignore = [".svn", ".git", ".DS_Store", "Thumbs.db", ".htaccess"]
//!
//! [content]
//! extensions = ["txt"]      # Content file extensions
//! ignore = []               # Content file names that are never read
//!
//! [lang]
//! support = false
//!
//! [[lang.available]]
//! code = "en"
//! name = "English"
//! default = true
//!
//! [cache]
//! enabled = false
//! dir = "cache"
//! autoupdate = false        # Invalidate on any content change (walks the tree)
//! ignore = []               # Page URIs never cached
//!
//! [markdown]
//! extra = false             # Tables, strikethrough, footnotes
//! breaks = true             # Single newlines become <br>
//!
//! [[routes]]
//! pattern = "blog(/@year(/@month))"
//! page = "blog"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::files::FileType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file within the site directory.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Base URL of the site. A path component (`https://x.org/blog`) is the subfolder.
    pub url: String,
    /// Path to the content root directory, relative to the site directory.
    pub content_root: String,
    /// uid of the homepage directory (a direct child of the content root).
    pub home: String,
    /// uid of the error page directory (a direct child of the content root).
    pub error: String,
    /// Keep the homepage's own uid in its URL instead of collapsing it to the site URL.
    pub home_keepurl: bool,
    /// File and directory names skipped on every scan.
    pub ignore: Vec<String>,
    /// Content file settings.
    pub content: ContentConfig,
    /// Multi-language settings.
    pub lang: LangConfig,
    /// Rendered-page cache settings.
    pub cache: CacheConfig,
    /// Markdown rendering options.
    pub markdown: MarkdownConfig,
    /// Additional extension → type mappings for files.
    pub files: FilesConfig,
    /// URL routes, tried in order before direct lookup.
    pub routes: Vec<RouteConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            content_root: "content".to_string(),
            home: "home".to_string(),
            error: "error".to_string(),
            home_keepurl: false,
            ignore: [".svn", ".git", ".DS_Store", "Thumbs.db", ".htaccess"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            content: ContentConfig::default(),
            lang: LangConfig::default(),
            cache: CacheConfig::default(),
            markdown: MarkdownConfig::default(),
            files: FilesConfig::default(),
            routes: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "content_root must not be empty".into(),
            ));
        }
        if self.home.is_empty() || self.error.is_empty() {
            return Err(ConfigError::Validation(
                "home and error must name a page uid".into(),
            ));
        }
        if self.content.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "content.extensions must not be empty".into(),
            ));
        }
        for language in &self.lang.available {
            if language.code.len() != 2 || !language.code.bytes().all(|b| b.is_ascii_alphabetic())
            {
                return Err(ConfigError::Validation(format!(
                    "language code must be two letters: {:?}",
                    language.code
                )));
            }
        }
        if self.lang.available.iter().filter(|l| l.default).count() > 1 {
            return Err(ConfigError::Validation(
                "only one language may be the default".into(),
            ));
        }
        for route in &self.routes {
            if route.pattern.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "routes.pattern must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// The primary content file extension, used when writing new content.
    pub fn content_extension(&self) -> &str {
        self.content
            .extensions
            .first()
            .map(String::as_str)
            .unwrap_or("txt")
    }
}

/// Content file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Extensions that mark a file as a content file. The first is used for new files.
    pub extensions: Vec<String>,
    /// Content file names (with extension) that are never read.
    pub ignore: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["txt".to_string()],
            ignore: Vec::new(),
        }
    }
}

/// Multi-language settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LangConfig {
    /// Enable per-language content files (`name.<code>.txt`).
    pub support: bool,
    /// Configured languages. Exactly one should be marked `default`;
    /// when none is, the first one is.
    pub available: Vec<LanguageConfig>,
}

/// One configured language.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageConfig {
    /// Two-letter code used in content file names.
    pub code: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Locale identifier, e.g. `de_DE`.
    #[serde(default)]
    pub locale: String,
    /// URL prefix. Defaults to the code; an empty string means no prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether this is the default language.
    #[serde(default)]
    pub default: bool,
}

/// Rendered-page cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Cache directory, relative to the site directory.
    pub dir: String,
    /// Compare cached entries against the newest modification in the content
    /// tree. This walks every file, so it is off by default.
    pub autoupdate: bool,
    /// Page URIs that are never cached.
    pub ignore: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: "cache".to_string(),
            autoupdate: false,
            ignore: Vec::new(),
        }
    }
}

/// Markdown rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Enable tables, strikethrough and footnotes.
    pub extra: bool,
    /// Render single newlines as hard line breaks.
    pub breaks: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extra: false,
            breaks: true,
        }
    }
}

/// Extra entries for the extension table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    pub types: Vec<FileTypeConfig>,
}

/// Maps one extension to a file type and MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTypeConfig {
    pub extension: String,
    pub kind: FileType,
    pub mime: String,
}

/// A route binding: URL pattern → page URI template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Pattern with `@name`, `@name:regex`, optional `( )` groups and a trailing `*`.
    pub pattern: String,
    /// Page URI to resolve. `@name` placeholders are replaced with captures.
    pub page: String,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no config file exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given site directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# flatsite configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Base URL of the site. A path component is treated as the subfolder
# the site is served from, e.g. "https://example.org/blog".
url = ""

# Content directory, relative to the site directory.
content_root = "content"

# uid of the homepage and of the error page (direct children of the content root).
home = "home"
error = "error"

# Keep the homepage uid in its own URL ("/home") instead of the bare site URL.
home_keepurl = false

# File and directory names skipped on every scan.
ignore = [".svn", ".git", ".DS_Store", "Thumbs.db", ".htaccess"]

# ---------------------------------------------------------------------------
# Content files
# ---------------------------------------------------------------------------
[content]
# Extensions that mark a file as a content file. The first is used for new files.
extensions = ["txt"]

# Content file names that are never read.
ignore = []

# ---------------------------------------------------------------------------
# Languages
# ---------------------------------------------------------------------------
[lang]
# When enabled, each page keeps one content file per language: project.en.txt
support = false

# [[lang.available]]
# code = "en"
# name = "English"
# locale = "en_US"
# url = "en"        # URL prefix; "" for none
# default = true

# ---------------------------------------------------------------------------
# Rendered-page cache
# ---------------------------------------------------------------------------
[cache]
enabled = false
dir = "cache"

# Invalidate cached pages whenever anything in the content tree changes.
# Walks the whole tree on every request.
autoupdate = false

# Page URIs that are never cached.
ignore = []

# ---------------------------------------------------------------------------
# Markdown
# ---------------------------------------------------------------------------
[markdown]
# Tables, strikethrough and footnotes.
extra = false

# Single newlines become <br>.
breaks = true

# ---------------------------------------------------------------------------
# Files
# ---------------------------------------------------------------------------
[files]
# Extra extension mappings on top of the built-in table.
types = []
# [[files.types]]
# extension = "heic"
# kind = "image"
# mime = "image/heic"

# ---------------------------------------------------------------------------
# Routes, tried in order before direct URI lookup
# ---------------------------------------------------------------------------
# [[routes]]
# pattern = "blog(/@year(/@month))"
# page = "blog"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.content_root, "content");
        assert_eq!(config.home, "home");
        assert_eq!(config.error, "error");
        assert!(!config.home_keepurl);
        assert_eq!(config.content.extensions, vec!["txt"]);
        assert!(config.ignore.contains(&".git".to_string()));
        assert!(!config.lang.support);
        assert!(config.markdown.breaks);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
home = "start"

[cache]
enabled = true
"##;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.home, "start");
        assert!(config.cache.enabled);
        // Defaults preserved
        assert_eq!(config.cache.dir, "cache");
        assert_eq!(config.error, "error");
    }

    #[test]
    fn parse_languages() {
        let toml = r##"
[lang]
support = true

[[lang.available]]
code = "en"
name = "English"
default = true

[[lang.available]]
code = "de"
name = "Deutsch"
url = ""
"##;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert!(config.lang.support);
        assert_eq!(config.lang.available.len(), 2);
        assert!(config.lang.available[0].default);
        assert_eq!(config.lang.available[1].url.as_deref(), Some(""));
        assert_eq!(config.lang.available[0].url, None);
    }

    #[test]
    fn parse_routes_and_file_types() {
        let toml = r##"
[[routes]]
pattern = "blog/@year:[0-9]+"
page = "blog"

[[files.types]]
extension = "heic"
kind = "image"
mime = "image/heic"
"##;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.routes[0].pattern, "blog/@year:[0-9]+");
        assert_eq!(config.files.types[0].kind, FileType::Image);
    }

    #[test]
    fn content_extension_is_first_entry() {
        let mut config = SiteConfig::default();
        config.content.extensions = vec!["md".into(), "txt".into()];
        assert_eq!(config.content_extension(), "md");
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_nested_tables() {
        let base: toml::Value = toml::from_str("[cache]\nenabled = false\ndir = \"c\"").unwrap();
        let overlay: toml::Value = toml::from_str("[cache]\nenabled = true").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["cache"]["enabled"].as_bool(), Some(true));
        assert_eq!(merged["cache"]["dir"].as_str(), Some("c"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("ignore = [\"a\", \"b\"]").unwrap();
        let overlay: toml::Value = toml::from_str("ignore = [\"c\"]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["ignore"].as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("homepage = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[cache]\nttl = 5");
        assert!(result.is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_bad_language_code() {
        let mut config = SiteConfig::default();
        config.lang.available.push(LanguageConfig {
            code: "eng".into(),
            name: String::new(),
            locale: String::new(),
            url: None,
            default: true,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_two_defaults() {
        let mut config = SiteConfig::default();
        for code in ["en", "de"] {
            config.lang.available.push(LanguageConfig {
                code: code.into(),
                name: String::new(),
                locale: String::new(),
                url: None,
                default: true,
            });
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_empty_extensions() {
        let mut config = SiteConfig::default();
        config.content.extensions.clear();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.home, "home");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "url = \"https://example.org/blog\"\n[markdown]\nextra = true\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.url, "https://example.org/blog");
        assert!(config.markdown.extra);
        assert!(config.markdown.breaks);
    }

    #[test]
    fn load_config_rejects_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "url = ").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(tmp.path()).unwrap().is_none());
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.home, defaults.home);
        assert_eq!(config.ignore, defaults.ignore);
        assert_eq!(config.content.extensions, defaults.content.extensions);
        assert_eq!(config.cache.dir, defaults.cache.dir);
        assert_eq!(config.markdown.breaks, defaults.markdown.breaks);
    }

    #[test]
    fn stock_defaults_value_is_table() {
        assert!(stock_defaults_value().is_table());
    }
}
