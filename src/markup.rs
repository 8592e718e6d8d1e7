//! Field text → HTML.
//!
//! The engine never interprets markup itself. It hands a raw field value,
//! plus the page the value belongs to, to a [`Markup`] implementation and
//! uses whatever comes back. [`Markdown`] is the built-in one.

use crate::config::MarkdownConfig;
use crate::page::Page;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

pub trait Markup {
    /// Convert `text` to HTML. `page` resolves relative links and file
    /// references.
    fn render(&self, text: &str, page: Option<&Page>) -> String;
}

/// CommonMark via pulldown-cmark.
///
/// Relative link and image targets are rewritten against the page: a
/// target naming one of the page's files becomes that file's URL, anything
/// else is resolved below the page URL.
#[derive(Debug, Clone, Default)]
pub struct Markdown {
    pub extra: bool,
    pub breaks: bool,
}

impl Markdown {
    pub fn from_config(config: &MarkdownConfig) -> Self {
        Self {
            extra: config.extra,
            breaks: config.breaks,
        }
    }

    fn options(&self) -> Options {
        let mut options = Options::empty();
        if self.extra {
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            options.insert(Options::ENABLE_FOOTNOTES);
        }
        options
    }
}

impl Markup for Markdown {
    fn render(&self, text: &str, page: Option<&Page>) -> String {
        let parser = Parser::new_ext(text, self.options()).map(|event| match event {
            Event::SoftBreak if self.breaks => Event::HardBreak,
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: resolve_target(dest_url, page),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Image {
                link_type,
                dest_url: resolve_target(dest_url, page),
                title,
                id,
            }),
            other => other,
        });
        let mut out = String::new();
        html::push_html(&mut out, parser);
        out
    }
}

fn is_relative(target: &str) -> bool {
    !(target.is_empty()
        || target.starts_with('/')
        || target.starts_with('#')
        || target.starts_with("mailto:")
        || target.contains("://"))
}

fn resolve_target<'a>(target: CowStr<'a>, page: Option<&Page>) -> CowStr<'a> {
    let Some(page) = page else {
        return target;
    };
    if !is_relative(&target) {
        return target;
    }
    if let Some(file) = page.file(&target) {
        return CowStr::from(file.url().to_string());
    }
    CowStr::from(format!(
        "{}/{}",
        page.url(None).trim_end_matches('/'),
        target.trim_start_matches("./")
    ))
}
