//! Page nodes.
//!
//! A [`Page`] is a cheap handle: the owning [`Site`] plus a shared record
//! ([`PageData`]) held in the site's arena, keyed by the page's directory.
//! Relationships are never stored as pointers. The parent is re-derived
//! from the directory path, children from the directory scan, and both
//! resolve through the arena, so the tree has no reference cycles.
//!
//! Derived values (children, files, content units) are memoized on the
//! record. Structural mutations ([`Page::sort`], [`Page::move_to`],
//! [`Page::delete`], ...) change the disk, drop the affected records from the
//! arena and return fresh handles. Handles obtained before a mutation keep
//! their old cached view.

use crate::collection::Entry;
use crate::content::{self, Content, Field};
use crate::dir::Dir;
use crate::error::{Error, Result};
use crate::files::{File, Files, FilesContext};
use crate::naming;
use crate::pages::Pages;
use crate::site::{Site, join_url};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use std::time::SystemTime;

/// Stable page identity derived from the directory path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl PageId {
    /// First eight bytes of the SHA-256 of the path.
    pub fn from_path(path: &Path) -> Self {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Keyed child records. Records rather than [`Page`] handles, so the arena
/// never holds a reference back to the site.
pub(crate) type Records = Vec<(String, Rc<PageData>)>;

/// Memoized state of one page directory.
#[derive(Debug)]
pub struct PageData {
    id: PageId,
    dir: Dir,
    is_site: bool,
    children: OnceCell<Records>,
    files: OnceCell<Files>,
    contents: RefCell<HashMap<String, Option<Rc<Content>>>>,
}

impl PageData {
    pub(crate) fn new(dir: Dir, is_site: bool) -> Self {
        Self {
            id: PageId::from_path(dir.root()),
            dir,
            is_site,
            children: OnceCell::new(),
            files: OnceCell::new(),
            contents: RefCell::new(HashMap::new()),
        }
    }
}

/// Target position for [`Page::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortTarget {
    Position(usize),
    First,
    Last,
    Up,
    Down,
}

impl FromStr for SortTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            n => n
                .parse()
                .map(Self::Position)
                .map_err(|_| format!("expected first, last, up, down or a number, got {n:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Invisible,
}

#[derive(Clone)]
pub struct Page {
    site: Site,
    data: Rc<PageData>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.data.id)
            .field("dir", &self.data.dir.uri())
            .field("site", &self.data.is_site)
            .finish()
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.data.id == other.data.id
    }
}

impl Eq for Page {}

impl Page {
    pub(crate) fn from_data(site: Site, data: Rc<PageData>) -> Self {
        Self { site, data }
    }

    pub(crate) fn data(&self) -> &Rc<PageData> {
        &self.data
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn id(&self) -> PageId {
        self.data.id
    }

    pub fn root(&self) -> &Path {
        self.data.dir.root()
    }

    pub fn dir(&self) -> &Dir {
        &self.data.dir
    }

    /// Directory name including the sort prefix.
    pub fn dirname(&self) -> &str {
        self.data.dir.name()
    }

    /// Directory path relative to the content root (`01-projects/project-a`).
    pub fn diruri(&self) -> &str {
        self.data.dir.uri()
    }

    pub fn num(&self) -> Option<&str> {
        self.data.dir.num()
    }

    pub fn number(&self) -> Option<u32> {
        self.data.dir.number()
    }

    pub fn uid(&self) -> &str {
        self.data.dir.uid()
    }

    pub fn is_site(&self) -> bool {
        self.data.is_site
    }

    /// uid path from below the site root (`projects/project-a`). Used as the
    /// collection key and for [`Site::page`] lookups.
    pub fn uid_path(&self) -> String {
        if self.is_site() {
            return String::new();
        }
        match self.parent() {
            Some(parent) if !parent.is_site() => format!("{}/{}", parent.uid_path(), self.uid()),
            _ => self.uid().to_string(),
        }
    }

    /// 0 for the site, 1 for its children, and so on.
    pub fn depth(&self) -> usize {
        if self.is_site() {
            0
        } else {
            self.diruri().split('/').count()
        }
    }

    pub fn is_visible(&self) -> bool {
        self.num().is_some()
    }

    pub fn is_invisible(&self) -> bool {
        !self.is_visible()
    }

    fn parent_is_site(&self) -> bool {
        !self.is_site() && self.root().parent() == Some(self.site.content_root())
    }

    pub fn is_homepage(&self) -> bool {
        self.parent_is_site() && self.uid() == self.site.config().home
    }

    pub fn is_errorpage(&self) -> bool {
        self.parent_is_site() && self.uid() == self.site.config().error
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Parent page; the site root for top-level pages, `None` for the site.
    pub fn parent(&self) -> Option<Page> {
        if self.is_site() {
            return None;
        }
        if self.parent_is_site() {
            return Some(self.site.root());
        }
        self.root().parent().map(|p| self.site.page_at(p))
    }

    /// Ancestors up to (not including) the site, nearest first.
    pub fn parents(&self) -> Pages {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(page) = current {
            if page.is_site() {
                break;
            }
            current = page.parent();
            chain.push(page);
        }
        chain.into_iter().collect()
    }

    pub fn children(&self) -> Pages {
        let records = self.data.children.get_or_init(|| {
            self.data
                .dir
                .children()
                .values()
                .map(|path| {
                    let child = self.site.page_at(path);
                    (child.uid_path(), child.data)
                })
                .collect()
        });
        self.site.wrap(records)
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn has_visible_children(&self) -> bool {
        !self.children().visible().is_empty()
    }

    /// The parent's children, this page included.
    pub fn siblings(&self) -> Pages {
        self.parent().map(|p| p.children()).unwrap_or_default()
    }

    pub fn prev(&self) -> Option<Page> {
        self.siblings().prev_of(&self.uid_path())
    }

    pub fn next(&self) -> Option<Page> {
        self.siblings().next_of(&self.uid_path())
    }

    pub fn has_prev(&self) -> bool {
        self.prev().is_some()
    }

    pub fn has_next(&self) -> bool {
        self.next().is_some()
    }

    pub fn prev_visible(&self) -> Option<Page> {
        self.siblings().visible().prev_of(&self.uid_path())
    }

    pub fn next_visible(&self) -> Option<Page> {
        self.siblings().visible().next_of(&self.uid_path())
    }

    pub fn is_child_of(&self, other: &Page) -> bool {
        self.root().parent() == Some(other.root())
    }

    pub fn is_descendant_of(&self, other: &Page) -> bool {
        self.root() != other.root() && self.root().starts_with(other.root())
    }

    pub fn is_ancestor_of(&self, other: &Page) -> bool {
        other.is_descendant_of(self)
    }

    /// Whether this is the page the current request resolved to.
    pub fn is_active(&self) -> bool {
        self.site.active_id() == Some(self.id())
    }

    /// Whether this page is active or an ancestor of the active page.
    pub fn is_open(&self) -> bool {
        match self.site.active() {
            Some(active) => active == *self || active.is_descendant_of(self),
            None => false,
        }
    }

    // =========================================================================
    // Files and content
    // =========================================================================

    pub fn files(&self) -> Files {
        self.data
            .files
            .get_or_init(|| {
                let content_url = self.site.content_url();
                Files::build(
                    &self.data.dir,
                    &FilesContext {
                        table: self.site.extensions(),
                        languages: self.site.languages(),
                        content_url: &content_url,
                        page: Some(self.id()),
                    },
                )
            })
            .clone()
    }

    pub fn file(&self, filename: &str) -> Option<Rc<File>> {
        self.files().find(filename)
    }

    pub fn images(&self) -> Files {
        self.files().images()
    }

    pub fn videos(&self) -> Files {
        self.files().videos()
    }

    pub fn documents(&self) -> Files {
        self.files().documents()
    }

    pub fn sounds(&self) -> Files {
        self.files().sounds()
    }

    pub fn code(&self) -> Files {
        self.files().code()
    }

    pub fn archives(&self) -> Files {
        self.files().archives()
    }

    pub fn contents(&self) -> Files {
        self.files().contents()
    }

    pub fn metas(&self) -> Files {
        self.files().metas()
    }

    pub fn thumbs(&self) -> Files {
        self.files().thumbs()
    }

    pub fn others(&self) -> Files {
        self.files().others()
    }

    /// Content unit for `language` (current language when `None`).
    ///
    /// `None` when no content file exists for that language; there is no
    /// fallback at this level.
    pub fn content(&self, language: Option<&str>) -> Option<Rc<Content>> {
        let code = language
            .map(str::to_string)
            .unwrap_or_else(|| self.site.language());
        if let Some(hit) = self.data.contents.borrow().get(&code) {
            return hit.clone();
        }
        let found = self
            .files()
            .contents()
            .iter()
            .find(|f| f.language_code() == Some(code.as_str()))
            .and_then(|f| f.content());
        self.data
            .contents
            .borrow_mut()
            .insert(code, found.clone());
        found
    }

    /// A fresh, unmemoized content unit for `language`.
    fn read_content(&self, language: &str) -> Option<Content> {
        self.files()
            .contents()
            .iter()
            .find(|f| f.language_code() == Some(language))
            .map(|f| Content::new(f.root(), self.site.languages(), Some(self.id())))
    }

    /// Field in the current language.
    ///
    /// On multi-language sites a field missing from a translation is read
    /// from this page's default-language content.
    pub fn field(&self, key: &str) -> Option<Field> {
        let current = self.site.language();
        let local = self
            .content(Some(&current))
            .and_then(|c| c.get(key).cloned());
        if local.is_some() {
            return local;
        }
        let languages = self.site.languages();
        if languages.is_enabled() && current != languages.default_code() {
            return self
                .content(Some(languages.default_code()))
                .and_then(|c| c.get(key).cloned());
        }
        None
    }

    /// Field in a specific language, without fallback.
    pub fn field_in(&self, key: &str, language: &str) -> Option<Field> {
        self.content(Some(language))
            .and_then(|c| c.get(key).cloned())
    }

    /// `title` field, or the uid when there is none.
    pub fn title(&self) -> Field {
        self.field("title")
            .unwrap_or_else(|| Field::new("title", self.uid(), Some(self.id())))
    }

    /// Name of the content file (`project` for `project.en.txt`), or
    /// `default` when the page has none.
    pub fn intended_template(&self) -> String {
        if self.is_site() {
            return "site".to_string();
        }
        let default = self.site.languages().default_code().to_string();
        self.content(Some(&default))
            .or_else(|| self.files().contents().first().and_then(|f| f.content()))
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "default".to_string())
    }

    /// The intended template when it exists, `default` otherwise.
    pub fn template(&self) -> String {
        if self.is_site() {
            return "site".to_string();
        }
        let intended = self.intended_template();
        if self.site.has_template(&intended) {
            intended
        } else {
            "default".to_string()
        }
    }

    /// Latest modification of the directory or its content files.
    pub fn modified(&self) -> Option<SystemTime> {
        self.contents()
            .iter()
            .filter_map(|f| f.modified())
            .chain(self.data.dir.modified())
            .max()
    }

    // =========================================================================
    // Slug, URI, URL
    // =========================================================================

    /// URL segment of this page in `language` (current when `None`).
    ///
    /// The directory uid, unless a non-default language carries a
    /// `url_key` field.
    pub fn slug(&self, language: Option<&str>) -> String {
        if self.is_site() {
            return String::new();
        }
        let languages = self.site.languages();
        if !languages.is_enabled() {
            return self.uid().to_string();
        }
        let current = self.site.language();
        let code = language.unwrap_or(&current);
        if code == languages.default_code() {
            return self.uid().to_string();
        }
        let key = if code == current {
            self.content(None)
                .and_then(|c| c.get("url_key").map(|f| f.value().to_string()))
        } else {
            self.read_content(code)
                .and_then(|c| c.get("url_key").map(|f| f.value().to_string()))
        };
        match key.map(|k| naming::slugify(&k)) {
            Some(slug) if !slug.is_empty() => slug,
            _ => self.uid().to_string(),
        }
    }

    /// Slash-joined slugs from below the site root down to this page.
    pub fn uri(&self, language: Option<&str>) -> String {
        if self.is_site() {
            return String::new();
        }
        match self.parent() {
            Some(parent) if !parent.is_site() => {
                format!("{}/{}", parent.uri(language), self.slug(language))
            }
            _ => self.slug(language),
        }
    }

    /// Absolute URL. The homepage collapses to the site URL unless
    /// `home_keepurl` is set.
    pub fn url(&self, language: Option<&str>) -> String {
        let base = self.site.url_for(language);
        let keep_home = self.site.config().home_keepurl;
        if self.is_site() || (self.is_homepage() && !keep_home) {
            return base;
        }
        let Some(parent) = self.parent() else {
            return base;
        };
        let slug = self.slug(language);
        if parent.is_site() {
            join_url(&base, &slug)
        } else if parent.is_homepage() && !keep_home {
            join_url(&join_url(&base, parent.uid()), &slug)
        } else {
            join_url(&parent.url(language), &slug)
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn content_filename(&self, template: &str, language: &str) -> String {
        let ext = self.site.config().content_extension();
        if self.site.languages().is_enabled() {
            format!("{template}.{language}.{ext}")
        } else {
            format!("{template}.{ext}")
        }
    }

    fn guard_structural(&self) -> Result<()> {
        if self.is_site() || self.is_homepage() || self.is_errorpage() {
            return Err(Error::Unauthorized(self.describe()));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.is_site() {
            "site".to_string()
        } else {
            self.uid_path()
        }
    }

    /// Drop this page, its ancestors and its descendants from the site's
    /// memoized state.
    pub fn reset(&self) {
        self.site.invalidate(self.root());
    }

    /// Create a child page directory with an initial content file.
    ///
    /// Returns the existing child when one with the same uid is already
    /// there.
    pub fn create_child(
        &self,
        slug: &str,
        template: &str,
        fields: &IndexMap<String, String>,
    ) -> Result<Page> {
        let uid = naming::slugify(slug);
        if uid.is_empty() {
            return Err(Error::InvalidSlug(slug.to_string()));
        }
        if let Some(existing) = self.children().iter().find(|c| c.uid() == uid) {
            return Ok(existing.clone());
        }
        let root = self.root().join(&uid);
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        let template = if template.is_empty() { "default" } else { template };
        let filename =
            self.content_filename(template, self.site.languages().default_code());
        content::write(&root.join(filename), fields)?;
        self.reset();

        let parent = self.site.page_at(self.root());
        let created = parent
            .children()
            .iter()
            .find(|c| c.uid() == uid)
            .cloned()
            .ok_or_else(|| Error::MissingPage(join_url(&parent.uid_path(), &uid)))?;
        tracing::info!(page = %created.uid_path(), template, "created page");
        Ok(created)
    }

    /// Merge `fields` into the content of `language` (current when `None`)
    /// and rewrite the file. A missing translation file is created.
    pub fn update(&self, fields: &IndexMap<String, String>, language: Option<&str>) -> Result<Page> {
        let code = language
            .map(str::to_string)
            .unwrap_or_else(|| self.site.language());
        let existing = self.content(Some(&code));
        let mut merged = existing
            .as_deref()
            .map(Content::to_map)
            .unwrap_or_default();
        for (key, value) in fields {
            merged.insert(naming::sanitize_key(key), value.clone());
        }
        let path = match &existing {
            Some(unit) => unit.root().to_path_buf(),
            None => self
                .root()
                .join(self.content_filename(&self.intended_template(), &code)),
        };
        content::write(&path, &merged)?;
        self.reset();
        tracing::info!(page = %self.describe(), language = %code, fields = fields.len(), "updated page");
        Ok(self.site.page_at(self.root()))
    }

    /// Move the page to `uri` (a uid path), keeping its sort prefix.
    pub fn move_to(&self, uri: &str) -> Result<Page> {
        self.guard_structural()?;
        let (parent_path, raw_slug) = split_uri(uri);
        let target_parent = self
            .site
            .resolve_parent(parent_path)
            .ok_or_else(|| Error::MissingParent(parent_path.to_string()))?;
        let uid = naming::slugify(raw_slug);
        if uid.is_empty() {
            return Err(Error::InvalidSlug(uri.to_string()));
        }
        let occupied = target_parent
            .children()
            .iter()
            .any(|c| c.uid() == uid && c != self);
        if occupied {
            return Err(Error::PageExists(uri.to_string()));
        }
        let name = match self.num() {
            Some(num) => format!("{num}-{uid}"),
            None => uid.clone(),
        };
        let destination = target_parent.root().join(name);
        if destination != self.root() {
            rename_dir(self.root(), &destination)?;
        }
        self.reset();
        target_parent.reset();
        tracing::info!(from = %self.describe(), to = uri, "moved page");
        Ok(self.site.page_at(&destination))
    }

    /// Remove the page directory. Pages with children are refused.
    pub fn delete(&self) -> Result<()> {
        self.guard_structural()?;
        if self.has_children() {
            return Err(Error::HasChildren(self.describe()));
        }
        fs::remove_dir_all(self.root()).map_err(|e| Error::io(self.root(), e))?;
        self.reset();
        tracing::info!(page = %self.describe(), "deleted page");
        Ok(())
    }

    /// Move the page to `target` among its visible siblings, renumbering
    /// them so positions stay `1..=n` without gaps.
    pub fn sort(&self, target: SortTarget) -> Result<Page> {
        if self.is_site() {
            return Err(Error::Unauthorized(self.describe()));
        }
        let parent = self
            .parent()
            .ok_or_else(|| Error::MissingParent(self.describe()))?;
        let key = self.uid_path();
        let siblings = parent.children().visible().not(&[key.as_str()]);
        let count = siblings.len();
        let slot = match target {
            SortTarget::Position(n) => n,
            SortTarget::First => 1,
            SortTarget::Last => count + 1,
            SortTarget::Up | SortTarget::Down => {
                if self.is_invisible() {
                    return Err(Error::Invisible(self.describe()));
                }
                let current = self.number().unwrap_or(u32::MAX) as usize;
                if target == SortTarget::Up {
                    current.saturating_sub(1)
                } else {
                    current + 1
                }
            }
        }
        .clamp(1, count + 1);

        let mut n = 1;
        for sibling in siblings.iter() {
            if n == slot {
                n += 1;
            }
            sibling.renumber(n)?;
            n += 1;
        }
        let destination = self.renumber(slot)?;
        parent.reset();
        tracing::info!(page = %key, position = slot, "sorted page");
        Ok(self.site.page_at(&destination))
    }

    /// Rename the directory to carry sort number `n`. Returns the new root.
    fn renumber(&self, n: usize) -> Result<PathBuf> {
        let name = naming::dirname(Some(n as u32), self.uid());
        let destination = self.sibling_path(&name);
        if destination != self.root() {
            rename_dir(self.root(), &destination)?;
        }
        Ok(destination)
    }

    fn sibling_path(&self, name: &str) -> PathBuf {
        self.root()
            .parent()
            .map(|p| p.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }

    /// Switch visibility. Becoming visible sorts the page to `num`
    /// (last when `None`); becoming invisible drops the prefix and closes
    /// the gap among the remaining visible siblings.
    pub fn make(&self, visibility: Visibility, num: Option<usize>) -> Result<Page> {
        match visibility {
            Visibility::Visible => {
                let target = num.map(SortTarget::Position).unwrap_or(SortTarget::Last);
                self.sort(target)
            }
            Visibility::Invisible => self.hide(),
        }
    }

    fn hide(&self) -> Result<Page> {
        if self.is_site() {
            return Err(Error::Unauthorized(self.describe()));
        }
        if self.is_invisible() {
            return Ok(self.clone());
        }
        let parent = self
            .parent()
            .ok_or_else(|| Error::MissingParent(self.describe()))?;
        let destination = self.sibling_path(self.uid());
        if destination.exists() {
            return Err(Error::PageExists(self.uid().to_string()));
        }
        rename_dir(self.root(), &destination)?;
        let key = self.uid_path();
        for (i, sibling) in parent
            .children()
            .visible()
            .not(&[key.as_str()])
            .iter()
            .enumerate()
        {
            sibling.renumber(i + 1)?;
        }
        parent.reset();
        tracing::info!(page = %key, "hid page");
        Ok(self.site.page_at(&destination))
    }

    /// Flip visibility.
    pub fn toggle(&self) -> Result<Page> {
        if self.is_visible() {
            self.make(Visibility::Invisible, None)
        } else {
            self.make(Visibility::Visible, None)
        }
    }
}

impl Entry for Page {
    fn key(&self) -> String {
        self.uid_path()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "uid" => Some(self.uid().to_string()),
            "slug" => Some(self.slug(None)),
            "num" => self.num().map(str::to_string),
            "id" | "uid_path" => Some(self.uid_path()),
            "uri" => Some(self.uri(None)),
            "url" => Some(self.url(None)),
            "dirname" => Some(self.dirname().to_string()),
            "template" => Some(self.template()),
            "intended_template" => Some(self.intended_template()),
            "depth" => Some(self.depth().to_string()),
            "visible" => Some(self.is_visible().to_string()),
            other => Page::field(self, other).map(|f| f.value().to_string()),
        }
    }
}

/// Split `a/b/c` into (`a/b`, `c`).
pub(crate) fn split_uri(uri: &str) -> (&str, &str) {
    let uri = uri.trim_matches('/');
    match uri.rsplit_once('/') {
        Some((parent, slug)) => (parent, slug),
        None => ("", uri),
    }
}

fn rename_dir(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(Error::PageExists(to.display().to_string()));
    }
    fs::rename(from, to).map_err(|source| Error::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
