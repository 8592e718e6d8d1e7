//! The site root.
//!
//! [`Site`] is the entry point: it owns the configuration, the language
//! list and current language, the router, the extension table and the
//! arena of page records. Resolving a request path goes through
//! [`Site::visit`]:
//!
//! 1. strip the subfolder of the configured base URL
//! 2. detect a language prefix (multi-language sites)
//! 3. empty path → homepage
//! 4. routes, in order; a route only matches when its page exists
//! 5. direct lookup, one segment per level
//! 6. the error page
//!
//! The site is a cheap handle over shared state and is not `Send`; one
//! site serves one thread.

use crate::cache::{self, Cache, FileCache};
use crate::config::{self, SiteConfig};
use crate::content::Field;
use crate::dir::{Dir, ScanRules};
use crate::error::{Error, Result};
use crate::files::ExtensionTable;
use crate::language::Languages;
use crate::markup::{Markdown, Markup};
use crate::page::{Page, PageData, PageId, Records, split_uri};
use crate::pages::Pages;
use crate::render::{HtmlTemplates, RenderContext, Templates};
use crate::router::Router;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;
use walkdir::WalkDir;

struct SiteInner {
    dir: PathBuf,
    config: SiteConfig,
    content_root: PathBuf,
    base_url: String,
    subfolder: String,
    languages: Languages,
    language: RefCell<String>,
    extensions: ExtensionTable,
    rules: Rc<ScanRules>,
    router: Router,
    arena: RefCell<HashMap<PathBuf, Rc<PageData>>>,
    index: RefCell<Option<Records>>,
    active: RefCell<Option<PathBuf>>,
    path: RefCell<String>,
    params: RefCell<IndexMap<String, String>>,
    templates: RefCell<Rc<dyn Templates>>,
    markup: RefCell<Rc<dyn Markup>>,
    cache: RefCell<Option<Rc<dyn Cache>>>,
}

#[derive(Clone)]
pub struct Site {
    inner: Rc<SiteInner>,
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("dir", &self.inner.dir)
            .field("content_root", &self.inner.content_root)
            .field("language", &self.inner.language.borrow())
            .finish()
    }
}

impl Site {
    /// Load `config.toml` from `dir` and open the site.
    pub fn open(dir: &Path) -> Result<Self> {
        let config = config::load_config(dir)?;
        Self::new(dir, config)
    }

    /// Open the site in `dir` with an already loaded config.
    pub fn new(dir: &Path, config: SiteConfig) -> Result<Self> {
        config.validate()?;
        let languages = Languages::from_config(&config.lang)?;
        let router = Router::from_config(&config.routes)?;
        let content_root = dir.join(&config.content_root);
        if !content_root.is_dir() {
            return Err(Error::MissingDirectory(content_root));
        }
        let (base_url, subfolder) = split_base_url(&config.url);
        let rules = Rc::new(ScanRules {
            ignore: config.ignore.clone(),
            content_ignore: config.content.ignore.clone(),
        });
        let cache: Option<Rc<dyn Cache>> = config
            .cache
            .enabled
            .then(|| Rc::new(FileCache::new(dir.join(&config.cache.dir))) as Rc<dyn Cache>);
        let markup: Rc<dyn Markup> = Rc::new(Markdown::from_config(&config.markdown));
        let templates: Rc<dyn Templates> = Rc::new(HtmlTemplates::new());

        tracing::debug!(
            content_root = %content_root.display(),
            languages = languages.len(),
            routes = router.len(),
            cache = config.cache.enabled,
            "opened site"
        );

        Ok(Self {
            inner: Rc::new(SiteInner {
                dir: dir.to_path_buf(),
                extensions: ExtensionTable::from_config(&config),
                language: RefCell::new(languages.default_code().to_string()),
                languages,
                router,
                content_root,
                base_url,
                subfolder,
                rules,
                config,
                arena: RefCell::new(HashMap::new()),
                index: RefCell::new(None),
                active: RefCell::new(None),
                path: RefCell::new(String::new()),
                params: RefCell::new(IndexMap::new()),
                templates: RefCell::new(templates),
                markup: RefCell::new(markup),
                cache: RefCell::new(cache),
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    pub fn content_root(&self) -> &Path {
        &self.inner.content_root
    }

    pub fn languages(&self) -> &Languages {
        &self.inner.languages
    }

    /// Current language code, `""` on single-language sites.
    pub fn language(&self) -> String {
        self.inner.language.borrow().clone()
    }

    /// Switch the current language. Returns `false` for unknown codes and
    /// on single-language sites.
    pub fn set_language(&self, code: &str) -> bool {
        if !self.inner.languages.is_enabled() || !self.inner.languages.contains(code) {
            return false;
        }
        *self.inner.language.borrow_mut() = code.to_string();
        true
    }

    pub fn extensions(&self) -> &ExtensionTable {
        &self.inner.extensions
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Subfolder the site is served from, without slashes.
    pub fn subfolder(&self) -> &str {
        &self.inner.subfolder
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    pub fn set_templates(&self, templates: impl Templates + 'static) {
        *self.inner.templates.borrow_mut() = Rc::new(templates);
    }

    pub fn set_markup(&self, markup: impl Markup + 'static) {
        *self.inner.markup.borrow_mut() = Rc::new(markup);
    }

    pub fn set_cache(&self, cache: Option<Rc<dyn Cache>>) {
        *self.inner.cache.borrow_mut() = cache;
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.inner.templates.borrow().exists(name)
    }

    // =========================================================================
    // URLs
    // =========================================================================

    /// Site URL in the current language.
    pub fn url(&self) -> String {
        self.url_for(None)
    }

    /// Site URL in `language` (current when `None`), language prefix
    /// included.
    pub fn url_for(&self, language: Option<&str>) -> String {
        let mut url = self.inner.base_url.clone();
        if self.inner.languages.is_enabled() {
            let current = self.language();
            let code = language.unwrap_or(&current);
            if let Some(lang) = self.inner.languages.find(code)
                && !lang.url.is_empty()
            {
                url = join_url(&url, &lang.url);
            }
        }
        if url.is_empty() { "/".to_string() } else { url }
    }

    /// URL the content directory is served under.
    pub fn content_url(&self) -> String {
        join_url(&self.inner.base_url, &self.inner.config.content_root)
    }

    // =========================================================================
    // Page arena
    // =========================================================================

    /// Handle for the page at `root`, reusing the arena record when present.
    pub(crate) fn page_at(&self, root: &Path) -> Page {
        let existing = self.inner.arena.borrow().get(root).cloned();
        let data = match existing {
            Some(data) => data,
            None => {
                let is_site = root == self.inner.content_root;
                let dir = Dir::new(root, &self.inner.content_root, self.inner.rules.clone());
                let data = Rc::new(PageData::new(dir, is_site));
                self.inner
                    .arena
                    .borrow_mut()
                    .insert(root.to_path_buf(), data.clone());
                data
            }
        };
        Page::from_data(self.clone(), data)
    }

    pub(crate) fn wrap(&self, records: &Records) -> Pages {
        Pages::from_map(
            records
                .iter()
                .map(|(key, data)| (key.clone(), Page::from_data(self.clone(), data.clone())))
                .collect(),
        )
    }

    /// Forget memoized state for `root`, its ancestors and descendants.
    pub(crate) fn invalidate(&self, root: &Path) {
        let mut arena = self.inner.arena.borrow_mut();
        let before = arena.len();
        arena.retain(|path, _| !(root.starts_with(path) || path.starts_with(root)));
        tracing::debug!(root = %root.display(), dropped = before - arena.len(), "invalidated pages");
        *self.inner.index.borrow_mut() = None;
    }

    /// Forget all memoized pages.
    pub fn reset(&self) {
        self.inner.arena.borrow_mut().clear();
        *self.inner.index.borrow_mut() = None;
    }

    /// The site itself as a page (depth 0, template `site`).
    pub fn root(&self) -> Page {
        self.page_at(&self.inner.content_root)
    }

    /// Top-level pages.
    pub fn children(&self) -> Pages {
        self.root().children()
    }

    /// Every page below the site, memoized until the next mutation.
    pub fn index(&self) -> Pages {
        if let Some(records) = self.inner.index.borrow().as_ref() {
            return self.wrap(records);
        }
        let pages = self.children().index();
        let records: Records = pages
            .as_map()
            .iter()
            .map(|(key, page)| (key.clone(), page.data().clone()))
            .collect();
        *self.inner.index.borrow_mut() = Some(records);
        pages
    }

    /// Page by uid path (`projects/project-a`).
    pub fn page(&self, uri: &str) -> Option<Page> {
        self.children().find_uri(uri)
    }

    pub fn find_by_id(&self, id: PageId) -> Option<Page> {
        let root = self.root();
        if root.id() == id {
            return Some(root);
        }
        self.index().iter().find(|p| p.id() == id).cloned()
    }

    pub fn homepage(&self) -> Option<Page> {
        self.children().find(&self.inner.config.home)
    }

    pub fn errorpage(&self) -> Option<Page> {
        self.children().find(&self.inner.config.error)
    }

    /// Parent for a new or moved page: the site for an empty path.
    pub(crate) fn resolve_parent(&self, uri: &str) -> Option<Page> {
        if uri.trim_matches('/').is_empty() {
            Some(self.root())
        } else {
            self.page(uri)
        }
    }

    /// Create a page at `uri` (parent uid path + new slug).
    pub fn create(
        &self,
        uri: &str,
        template: &str,
        fields: &IndexMap<String, String>,
    ) -> Result<Page> {
        let (parent_path, slug) = split_uri(uri);
        let parent = self
            .resolve_parent(parent_path)
            .ok_or_else(|| Error::MissingParent(parent_path.to_string()))?;
        parent.create_child(slug, template, fields)
    }

    // =========================================================================
    // Request resolution
    // =========================================================================

    /// Resolve a request path to a page and make it the active page.
    ///
    /// Never fails: unmatched paths land on the error page (or the site
    /// itself when there is none).
    pub fn visit(&self, path: &str) -> Page {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let mut rest = path.trim_matches('/');
        let subfolder = self.inner.subfolder.as_str();
        if !subfolder.is_empty() {
            if rest == subfolder {
                rest = "";
            } else if let Some(stripped) = rest
                .strip_prefix(subfolder)
                .and_then(|r| r.strip_prefix('/'))
            {
                rest = stripped;
            }
        }
        let rest = self.detect_language(rest);

        let (page, params) = self.resolve(rest);
        tracing::debug!(
            path = rest,
            page = %page.uid_path(),
            language = %self.language(),
            "resolved request"
        );
        *self.inner.path.borrow_mut() = rest.to_string();
        *self.inner.params.borrow_mut() = params;
        *self.inner.active.borrow_mut() = Some(page.root().to_path_buf());
        page
    }

    /// Set the current language from the first path segment and return the
    /// remaining path.
    fn detect_language<'a>(&self, path: &'a str) -> &'a str {
        let languages = &self.inner.languages;
        if !languages.is_enabled() {
            return path;
        }
        let (first, remainder) = path.split_once('/').unwrap_or((path, ""));
        if let Some(lang) = languages.find_by_url(first) {
            *self.inner.language.borrow_mut() = lang.code.clone();
            return remainder;
        }
        let fallback = languages
            .unprefixed()
            .or_else(|| languages.default_language())
            .map(|l| l.code.clone())
            .unwrap_or_default();
        *self.inner.language.borrow_mut() = fallback;
        path
    }

    fn resolve(&self, path: &str) -> (Page, IndexMap<String, String>) {
        if path.is_empty() {
            if let Some(home) = self.homepage() {
                return (home, IndexMap::new());
            }
        } else {
            if let Some(hit) = self
                .inner
                .router
                .run(path, |uri| self.page(uri).is_some())
                && let Some(page) = self.page(&hit.page)
            {
                return (page, hit.params);
            }
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            if let Some(page) = self.children().find_by_uri(&segments) {
                return (page, IndexMap::new());
            }
        }
        let fallback = self.errorpage().unwrap_or_else(|| self.root());
        (fallback, IndexMap::new())
    }

    /// The page resolved by the last [`Site::visit`].
    pub fn active(&self) -> Option<Page> {
        let root = self.inner.active.borrow().clone()?;
        root.is_dir().then(|| self.page_at(&root))
    }

    pub(crate) fn active_id(&self) -> Option<PageId> {
        self.inner
            .active
            .borrow()
            .as_deref()
            .map(PageId::from_path)
    }

    /// Request path of the last visit, subfolder and language prefix removed.
    pub fn path(&self) -> String {
        self.inner.path.borrow().clone()
    }

    /// Route captures of the last visit.
    pub fn params(&self) -> IndexMap<String, String> {
        self.inner.params.borrow().clone()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.inner.params.borrow().get(name).cloned()
    }

    // =========================================================================
    // Field conversions that need page context
    // =========================================================================

    /// Render a field through the markup collaborator, resolving relative
    /// targets against the field's page.
    pub fn html(&self, field: &Field) -> String {
        let page = field.page().and_then(|id| self.find_by_id(id));
        let markup = self.inner.markup.borrow().clone();
        markup.render(field.value(), page.as_ref())
    }

    /// The page a field's value names by uid path.
    pub fn link(&self, field: &Field) -> Option<Page> {
        self.page(field.value().trim())
    }

    // =========================================================================
    // Rendering and cache
    // =========================================================================

    /// Newest modification time anywhere in the content tree.
    pub fn modified(&self) -> Option<SystemTime> {
        WalkDir::new(&self.inner.content_root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.metadata().ok())
            .filter_map(|m| m.modified().ok())
            .max()
    }

    fn is_cacheable(&self, page: &Page) -> bool {
        let config = &self.inner.config.cache;
        config.enabled && !page.is_errorpage() && !config.ignore.contains(&page.uid_path())
    }

    /// Render `page` with its template, consulting the cache first.
    pub fn render(&self, page: &Page) -> Result<String> {
        let id = format!(
            "{}{}",
            cache::cache_id(page.root()),
            self.language()
        );
        let cache = if self.is_cacheable(page) {
            self.inner.cache.borrow().clone()
        } else {
            None
        };

        if let Some(cache) = &cache
            && let Some(html) = cache.get(&id)
        {
            let fresh = !self.inner.config.cache.autoupdate
                || match (cache.modified(&id), self.modified()) {
                    (Some(written), Some(changed)) => written >= changed,
                    _ => false,
                };
            if fresh {
                tracing::debug!(page = %page.uid_path(), "cache hit");
                return Ok(html);
            }
            tracing::debug!(page = %page.uid_path(), "cache entry stale");
        }

        let template = page.template();
        let pages = self.children();
        let templates = self.inner.templates.borrow().clone();
        let html = templates.render(
            &template,
            &RenderContext {
                site: self,
                pages: &pages,
                page,
            },
        )?;
        tracing::info!(page = %page.uid_path(), template = %template, "rendered page");

        if let Some(cache) = &cache {
            cache.set(&id, &html)?;
        }
        Ok(html)
    }
}

/// Split the configured URL into base URL (no trailing slash) and subfolder.
fn split_base_url(url: &str) -> (String, String) {
    let base = url.trim_end_matches('/').to_string();
    let subfolder = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().trim_matches('/').to_string(),
        Err(_) => url.trim_matches('/').to_string(),
    };
    (base, subfolder)
}

/// Join URL parts with exactly one slash between them.
pub fn join_url(base: &str, tail: &str) -> String {
    if tail.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        tail.trim_start_matches('/')
    )
}
