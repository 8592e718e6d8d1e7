//! Configured languages.
//!
//! With `[lang] support = true`, every page keeps one content file per
//! language (`project.en.txt`, `project.de.txt`) and URLs carry a language
//! prefix. One language is the default: its content is the fallback for
//! fields missing in a translation, and its slugs are the directory uids.

use crate::config::LangConfig;
use crate::error::{Error, Result};

/// One configured language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub code: String,
    pub name: String,
    pub locale: String,
    /// URL prefix, empty when the language is served without one.
    pub url: String,
    pub default: bool,
}

/// The set of configured languages and which one is the default.
#[derive(Debug, Clone, Default)]
pub struct Languages {
    enabled: bool,
    list: Vec<Language>,
}

impl Languages {
    /// Build the language list from config.
    ///
    /// Fails with [`Error::NoLanguages`] when support is enabled but nothing
    /// is configured. When no entry is marked default, the first one is.
    pub fn from_config(config: &LangConfig) -> Result<Self> {
        if config.support && config.available.is_empty() {
            return Err(Error::NoLanguages);
        }
        let has_default = config.available.iter().any(|l| l.default);
        let list = config
            .available
            .iter()
            .enumerate()
            .map(|(i, l)| Language {
                code: l.code.to_ascii_lowercase(),
                name: if l.name.is_empty() {
                    l.code.clone()
                } else {
                    l.name.clone()
                },
                locale: l.locale.clone(),
                url: l
                    .url
                    .clone()
                    .unwrap_or_else(|| l.code.to_ascii_lowercase())
                    .trim_matches('/')
                    .to_string(),
                default: l.default || (!has_default && i == 0),
            })
            .collect();
        Ok(Self {
            enabled: config.support,
            list,
        })
    }

    /// Whether per-language content is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_language(&self) -> Option<&Language> {
        self.list.iter().find(|l| l.default)
    }

    /// Code of the default language, or `""` on single-language sites.
    pub fn default_code(&self) -> &str {
        if !self.enabled {
            return "";
        }
        self.default_language().map(|l| l.code.as_str()).unwrap_or("")
    }

    pub fn find(&self, code: &str) -> Option<&Language> {
        self.list.iter().find(|l| l.code == code)
    }

    /// Whether `code` names a configured language.
    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    /// Find the language whose URL prefix equals `segment`.
    pub fn find_by_url(&self, segment: &str) -> Option<&Language> {
        self.list
            .iter()
            .find(|l| !l.url.is_empty() && l.url == segment)
    }

    /// The language served without a URL prefix, if any.
    pub fn unprefixed(&self) -> Option<&Language> {
        self.list.iter().find(|l| l.url.is_empty())
    }

    pub fn codes(&self) -> Vec<&str> {
        self.list.iter().map(|l| l.code.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
