//! Templates.
//!
//! A template turns a page into a string given the render context: the
//! [`Site`], the top-level [`Pages`], and the [`Page`] itself. The engine
//! only asks two things of a template set: whether a name exists, and to
//! render one.
//!
//! [`HtmlTemplates`] ships `site`, `default` and `error` templates written with
//! [maud](https://maud.lambda.xyz/), and accepts additional named templates
//! as closures. A page whose content file is `project.txt` renders with the
//! `project` template when one is registered, `default` otherwise.

use crate::error::{Error, Result};
use crate::page::Page;
use crate::pages::Pages;
use crate::site::Site;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::HashMap;

/// What a template gets to see.
pub struct RenderContext<'a> {
    pub site: &'a Site,
    pub pages: &'a Pages,
    pub page: &'a Page,
}

pub trait Templates {
    fn exists(&self, name: &str) -> bool;
    fn render(&self, name: &str, ctx: &RenderContext<'_>) -> Result<String>;
}

type TemplateFn = Box<dyn Fn(&RenderContext<'_>) -> Result<String>>;

/// Built-in HTML templates plus registered ones.
#[derive(Default)]
pub struct HtmlTemplates {
    custom: HashMap<String, TemplateFn>,
}

impl HtmlTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a named template.
    pub fn register(
        &mut self,
        name: &str,
        template: impl Fn(&RenderContext<'_>) -> Result<String> + 'static,
    ) {
        self.custom.insert(name.to_string(), Box::new(template));
    }
}

const BUILTIN: &[&str] = &["site", "default", "error"];

impl Templates for HtmlTemplates {
    fn exists(&self, name: &str) -> bool {
        self.custom.contains_key(name) || BUILTIN.contains(&name)
    }

    fn render(&self, name: &str, ctx: &RenderContext<'_>) -> Result<String> {
        if let Some(template) = self.custom.get(name) {
            return template(ctx);
        }
        match name {
            "site" => Ok(render_site(ctx).into_string()),
            "default" => Ok(render_default(ctx).into_string()),
            "error" => Ok(render_error(ctx).into_string()),
            other => Err(Error::Render {
                template: other.to_string(),
                message: "no such template".to_string(),
            }),
        }
    }
}

const CSS: &str = "\
body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 0 auto; padding: 1rem; }
.site-header { display: flex; justify-content: space-between; align-items: baseline; }
.site-nav ul { list-style: none; display: flex; gap: 1rem; padding: 0; }
.site-nav li.current a { font-weight: bold; }
.files img { max-width: 100%; }
";

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, lang: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(lang) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders the site header with breadcrumb and navigation
fn site_header(breadcrumb: Markup, nav: Markup) -> Markup {
    html! {
        header.site-header {
            nav.breadcrumb {
                (breadcrumb)
            }
            nav.site-nav {
                (nav)
            }
        }
    }
}

/// Top-level visible pages, the open one marked current.
pub fn render_nav(pages: &Pages) -> Markup {
    html! {
        ul {
            @for page in pages.visible().iter() {
                li class=[page.is_open().then_some("current")] {
                    a href=(page.url(None)) { (page.title().value()) }
                }
            }
        }
    }
}

/// Ancestor chain from the site down to `page`.
pub fn render_breadcrumb(site: &Site, page: &Page) -> Markup {
    let mut trail = page.parents().to_vec();
    trail.reverse();
    html! {
        a href=(site.url()) { (site.root().title().value()) }
        @for ancestor in &trail {
            " › "
            a href=(ancestor.url(None)) { (ancestor.title().value()) }
        }
        @if !page.is_site() {
            " › "
            (page.title().value())
        }
    }
}

fn page_language(site: &Site) -> String {
    let code = site.language();
    if code.is_empty() {
        "en".to_string()
    } else {
        code
    }
}

/// The site root: title, description and the visible top-level pages.
fn render_site(ctx: &RenderContext<'_>) -> Markup {
    let root = ctx.page;
    let description = root.field("description");
    let content = html! {
        (site_header(render_breadcrumb(ctx.site, root), render_nav(ctx.pages)))
        main.site {
            h1 { (root.title().value()) }
            @if let Some(description) = &description {
                p.description { (description.value()) }
            }
            ul.children {
                @for page in ctx.pages.visible().iter() {
                    li { a href=(page.url(None)) { (page.title().value()) } }
                }
            }
        }
    };
    base_document(
        root.title().value(),
        &page_language(ctx.site),
        Some("site"),
        content,
    )
}

fn render_default(ctx: &RenderContext<'_>) -> Markup {
    let page = ctx.page;
    let text = page
        .field("text")
        .map(|f| ctx.site.html(&f))
        .unwrap_or_default();
    let images = page.images();
    let documents = page.documents();
    let children = page.children().visible();
    let language = ctx.site.language();

    let content = html! {
        (site_header(render_breadcrumb(ctx.site, page), render_nav(ctx.pages)))
        main.page {
            article {
                h1 { (page.title().value()) }
                (PreEscaped(text))
            }
            @if !images.is_empty() {
                section.files {
                    @for image in images.iter() {
                        @let caption = image
                            .meta(&language)
                            .and_then(|m| m.get("caption").map(|f| f.value().to_string()))
                            .unwrap_or_else(|| image.name().to_string());
                        figure {
                            img src=(image.url()) alt=(caption);
                        }
                    }
                }
            }
            @if !documents.is_empty() {
                ul.documents {
                    @for doc in documents.iter() {
                        li { a href=(doc.url()) { (doc.filename()) } " (" (doc.nice_size()) ")" }
                    }
                }
            }
            @if !children.is_empty() {
                ul.children {
                    @for child in children.iter() {
                        li { a href=(child.url(None)) { (child.title().value()) } }
                    }
                }
            }
        }
    };
    base_document(
        page.title().value(),
        &page_language(ctx.site),
        Some(&page.template()),
        content,
    )
}

fn render_error(ctx: &RenderContext<'_>) -> Markup {
    let page = ctx.page;
    let text = page
        .field("text")
        .map(|f| ctx.site.html(&f))
        .unwrap_or_default();
    let content = html! {
        (site_header(render_breadcrumb(ctx.site, page), render_nav(ctx.pages)))
        main.error-page {
            h1 { (page.title().value()) }
            (PreEscaped(text))
            p { "No page matches " code { "/" (ctx.site.path()) } }
        }
    };
    base_document(
        page.title().value(),
        &page_language(ctx.site),
        Some("error"),
        content,
    )
}

// ============================================================================
// Tests
// ============================================================================
