//! File nodes and file collections.
//!
//! Every non-directory entry in a page directory becomes a [`File`]. Its
//! [`FileType`] comes from the extension table, with two adjustments made
//! once the whole directory is known:
//!
//! - a content file named like another asset (`photo.jpg` + `photo.jpg.txt`
//!   or `photo.txt`) is that asset's **meta** file
//! - an image named `<name>.thumb.<ext>` is a **thumb** when `<name>.<ext>`
//!   style siblings exist
//!
//! Asset files keep their meta content units, one per language, and resolve
//! them with a default-language fallback.

use crate::collection::{Collection, Entry};
use crate::config::SiteConfig;
use crate::content::{self, Content};
use crate::dir::Dir;
use crate::language::Languages;
use crate::page::PageId;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

/// File category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Content,
    Image,
    Video,
    Document,
    Audio,
    Code,
    Archive,
    Meta,
    Thumb,
    Other,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Code => "code",
            Self::Archive => "archive",
            Self::Meta => "meta",
            Self::Thumb => "thumb",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BUILTIN_TYPES: &[(&str, FileType, &str)] = &[
    ("jpg", FileType::Image, "image/jpeg"),
    ("jpeg", FileType::Image, "image/jpeg"),
    ("png", FileType::Image, "image/png"),
    ("gif", FileType::Image, "image/gif"),
    ("webp", FileType::Image, "image/webp"),
    ("avif", FileType::Image, "image/avif"),
    ("svg", FileType::Image, "image/svg+xml"),
    ("ico", FileType::Image, "image/x-icon"),
    ("tif", FileType::Image, "image/tiff"),
    ("tiff", FileType::Image, "image/tiff"),
    ("bmp", FileType::Image, "image/bmp"),
    ("mp4", FileType::Video, "video/mp4"),
    ("m4v", FileType::Video, "video/x-m4v"),
    ("mov", FileType::Video, "video/quicktime"),
    ("webm", FileType::Video, "video/webm"),
    ("ogv", FileType::Video, "video/ogg"),
    ("avi", FileType::Video, "video/x-msvideo"),
    ("mkv", FileType::Video, "video/x-matroska"),
    ("mp3", FileType::Audio, "audio/mpeg"),
    ("wav", FileType::Audio, "audio/wav"),
    ("ogg", FileType::Audio, "audio/ogg"),
    ("m4a", FileType::Audio, "audio/mp4"),
    ("flac", FileType::Audio, "audio/flac"),
    ("aiff", FileType::Audio, "audio/aiff"),
    ("pdf", FileType::Document, "application/pdf"),
    ("doc", FileType::Document, "application/msword"),
    (
        "docx",
        FileType::Document,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", FileType::Document, "application/vnd.ms-excel"),
    (
        "xlsx",
        FileType::Document,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", FileType::Document, "application/vnd.ms-powerpoint"),
    (
        "pptx",
        FileType::Document,
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("odt", FileType::Document, "application/vnd.oasis.opendocument.text"),
    ("ods", FileType::Document, "application/vnd.oasis.opendocument.spreadsheet"),
    ("rtf", FileType::Document, "application/rtf"),
    ("csv", FileType::Document, "text/csv"),
    ("zip", FileType::Archive, "application/zip"),
    ("tar", FileType::Archive, "application/x-tar"),
    ("gz", FileType::Archive, "application/gzip"),
    ("tgz", FileType::Archive, "application/gzip"),
    ("rar", FileType::Archive, "application/vnd.rar"),
    ("7z", FileType::Archive, "application/x-7z-compressed"),
    ("html", FileType::Code, "text/html"),
    ("htm", FileType::Code, "text/html"),
    ("css", FileType::Code, "text/css"),
    ("js", FileType::Code, "text/javascript"),
    ("json", FileType::Code, "application/json"),
    ("xml", FileType::Code, "application/xml"),
    ("php", FileType::Code, "text/x-php"),
    ("py", FileType::Code, "text/x-python"),
    ("rb", FileType::Code, "text/x-ruby"),
    ("rs", FileType::Code, "text/x-rust"),
];

/// Extension → (type, MIME) lookup.
///
/// Owned by the site so differently configured sites never share state.
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    types: HashMap<String, (FileType, String)>,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        let mut table = Self {
            types: HashMap::new(),
        };
        for (ext, kind, mime) in BUILTIN_TYPES {
            table.insert(ext, *kind, mime);
        }
        table.insert("txt", FileType::Content, "text/plain");
        table
    }
}

impl ExtensionTable {
    /// Built-in table plus the configured content extensions and
    /// `[[files.types]]` entries.
    pub fn from_config(config: &SiteConfig) -> Self {
        let mut table = Self::default();
        if !config.content.extensions.iter().any(|e| e == "txt") {
            table.insert("txt", FileType::Document, "text/plain");
        }
        for ext in &config.content.extensions {
            let mime = table.mime(ext).unwrap_or("text/plain").to_string();
            table.insert(ext, FileType::Content, &mime);
        }
        for extra in &config.files.types {
            table.insert(&extra.extension, extra.kind, &extra.mime);
        }
        table
    }

    pub fn insert(&mut self, extension: &str, kind: FileType, mime: &str) {
        self.types
            .insert(extension.to_ascii_lowercase(), (kind, mime.to_string()));
    }

    /// Category for an extension, [`FileType::Other`] when unknown.
    pub fn kind(&self, extension: &str) -> FileType {
        self.types
            .get(&extension.to_ascii_lowercase())
            .map(|(kind, _)| *kind)
            .unwrap_or(FileType::Other)
    }

    pub fn mime(&self, extension: &str) -> Option<&str> {
        self.types
            .get(&extension.to_ascii_lowercase())
            .map(|(_, mime)| mime.as_str())
    }
}

/// Inputs for building a page's file collection.
pub struct FilesContext<'a> {
    pub table: &'a ExtensionTable,
    pub languages: &'a Languages,
    /// URL the content root is served under.
    pub content_url: &'a str,
    pub page: Option<PageId>,
}

/// One file inside a page directory.
#[derive(Debug, Clone)]
pub struct File {
    root: PathBuf,
    filename: String,
    name: String,
    extension: String,
    kind: FileType,
    mime: String,
    size: u64,
    uri: String,
    url: String,
    page: Option<PageId>,
    content: Option<Rc<Content>>,
    metas: Vec<Rc<Content>>,
    meta_cache: RefCell<HashMap<String, Option<Rc<Content>>>>,
}

impl File {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Name without extension. For content files, also without the
    /// language code.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn kind(&self) -> FileType {
        self.kind
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Size formatted with binary units, e.g. `1.5 KB`.
    pub fn nice_size(&self) -> String {
        nice_size(self.size)
    }

    /// Path relative to the content root.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn page(&self) -> Option<PageId> {
        self.page
    }

    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.root).and_then(|m| m.modified()).ok()
    }

    /// The parsed unit of a content or meta file.
    pub fn content(&self) -> Option<Rc<Content>> {
        self.content.clone()
    }

    /// Language code of a content or meta file.
    pub fn language_code(&self) -> Option<&str> {
        self.content.as_deref().map(Content::language_code)
    }

    /// Meta unit for `language`.
    ///
    /// Falls back to the default-language meta file when the requested
    /// language has none. On single-language sites the only meta file is
    /// returned. Memoized per language code.
    pub fn meta(&self, language: &str) -> Option<Rc<Content>> {
        if let Some(hit) = self.meta_cache.borrow().get(language) {
            return hit.clone();
        }
        let found = self
            .metas
            .iter()
            .find(|m| m.language_code() == language)
            .or_else(|| self.metas.iter().find(|m| m.is_default()))
            .or_else(|| self.metas.first())
            .cloned();
        self.meta_cache
            .borrow_mut()
            .insert(language.to_string(), found.clone());
        found
    }

    /// Every meta unit attached to this file.
    pub fn metas(&self) -> &[Rc<Content>] {
        &self.metas
    }
}

impl Entry for File {
    fn key(&self) -> String {
        self.filename.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "filename" => Some(self.filename.clone()),
            "name" => Some(self.name.clone()),
            "extension" => Some(self.extension.clone()),
            "type" => Some(self.kind.to_string()),
            "mime" => Some(self.mime.clone()),
            "size" => Some(self.size.to_string()),
            "uri" => Some(self.uri.clone()),
            "url" => Some(self.url.clone()),
            "language" => self.language_code().map(str::to_string),
            other => self
                .metas
                .iter()
                .find(|m| m.is_default())
                .or_else(|| self.metas.first())
                .and_then(|m| m.get(other).map(|f| f.value().to_string())),
        }
    }
}

pub fn nice_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let formatted = format!("{size:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Files of one page, keyed by filename.
pub type Files = Collection<Rc<File>>;

struct Draft {
    root: PathBuf,
    filename: String,
    name: String,
    extension: String,
    kind: FileType,
}

impl Collection<Rc<File>> {
    /// Build the collection for a scanned directory.
    ///
    /// Reclassification into meta and thumb happens over the full set
    /// before any [`File`] is created, so scan order does not matter.
    pub fn build(dir: &Dir, ctx: &FilesContext<'_>) -> Self {
        let mut drafts: Vec<Draft> = dir
            .files()
            .iter()
            .map(|(filename, path)| {
                let (stem, extension) = match filename.rsplit_once('.') {
                    Some((stem, ext)) => (stem, ext.to_ascii_lowercase()),
                    None => (filename.as_str(), String::new()),
                };
                let kind = ctx.table.kind(&extension);
                let name = if kind == FileType::Content {
                    content::split_language(stem, ctx.languages).0.to_string()
                } else {
                    stem.to_string()
                };
                Draft {
                    root: path.clone(),
                    filename: filename.clone(),
                    name,
                    extension,
                    kind,
                }
            })
            .collect();

        let kinds = reclassify(&drafts);
        for (draft, kind) in drafts.iter_mut().zip(kinds) {
            draft.kind = kind;
        }

        let units: Vec<Option<Rc<Content>>> = drafts
            .iter()
            .map(|d| {
                matches!(d.kind, FileType::Content | FileType::Meta)
                    .then(|| Rc::new(Content::new(&d.root, ctx.languages, ctx.page)))
            })
            .collect();

        let files: Self = drafts
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let metas = if matches!(d.kind, FileType::Content | FileType::Meta) {
                    Vec::new()
                } else {
                    drafts
                        .iter()
                        .zip(&units)
                        .filter(|(m, _)| m.kind == FileType::Meta && describes(m, d))
                        .filter_map(|(_, unit)| unit.clone())
                        .collect()
                };
                let uri = join_uri(dir.uri(), &d.filename);
                let url = join_uri(ctx.content_url.trim_end_matches('/'), &uri);
                Rc::new(File {
                    root: d.root.clone(),
                    filename: d.filename.clone(),
                    name: d.name.clone(),
                    extension: d.extension.clone(),
                    kind: d.kind,
                    mime: ctx
                        .table
                        .mime(&d.extension)
                        .unwrap_or("application/octet-stream")
                        .to_string(),
                    size: fs::metadata(&d.root).map(|m| m.len()).unwrap_or(0),
                    uri,
                    url,
                    page: ctx.page,
                    content: units[i].clone(),
                    metas,
                    meta_cache: RefCell::new(HashMap::new()),
                })
            })
            .collect();
        tracing::debug!(dir = %dir.uri(), files = files.len(), "built file collection");
        files
    }

    pub fn of_kind(&self, kind: FileType) -> Self {
        self.filter(|f| f.kind() == kind)
    }

    pub fn images(&self) -> Self {
        self.of_kind(FileType::Image)
    }

    pub fn videos(&self) -> Self {
        self.of_kind(FileType::Video)
    }

    pub fn documents(&self) -> Self {
        self.of_kind(FileType::Document)
    }

    pub fn sounds(&self) -> Self {
        self.of_kind(FileType::Audio)
    }

    pub fn code(&self) -> Self {
        self.of_kind(FileType::Code)
    }

    pub fn archives(&self) -> Self {
        self.of_kind(FileType::Archive)
    }

    pub fn contents(&self) -> Self {
        self.of_kind(FileType::Content)
    }

    pub fn metas(&self) -> Self {
        self.of_kind(FileType::Meta)
    }

    pub fn thumbs(&self) -> Self {
        self.of_kind(FileType::Thumb)
    }

    pub fn others(&self) -> Self {
        self.of_kind(FileType::Other)
    }

    /// The collection without `file`.
    pub fn siblings(&self, file: &File) -> Self {
        self.not(&[file.filename()])
    }

    pub fn prev(&self, file: &File) -> Option<Rc<File>> {
        self.prev_of(file.filename())
    }

    pub fn next(&self, file: &File) -> Option<Rc<File>> {
        self.next_of(file.filename())
    }

    /// First file whose `field` equals `value`.
    pub fn find_by(&self, field: &str, value: &str) -> Option<Rc<File>> {
        self.filter_by(field, value).first()
    }

    /// Every file whose `field` is one of `values`.
    pub fn find_by_any(&self, field: &str, values: &[&str]) -> Self {
        self.filter_by_any(field, values)
    }

    /// Sum of all file sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.iter().map(|f| f.size()).sum()
    }
}

/// Final type of every draft, computed against the full sibling set.
fn reclassify(drafts: &[Draft]) -> Vec<FileType> {
    drafts
        .iter()
        .map(|d| match d.kind {
            FileType::Content if drafts.iter().any(|o| o.kind != FileType::Content && describes(d, o)) => {
                FileType::Meta
            }
            FileType::Image => match d.name.strip_suffix(".thumb") {
                Some(base)
                    if drafts.iter().any(|o| {
                        o.kind == FileType::Image
                            && o.filename != d.filename
                            && !o.name.ends_with(".thumb")
                            && o.name == base
                    }) =>
                {
                    FileType::Thumb
                }
                _ => d.kind,
            },
            kind => kind,
        })
        .collect()
}

/// Whether content draft `meta` names asset draft `asset`.
fn describes(meta: &Draft, asset: &Draft) -> bool {
    meta.name == asset.filename || meta.name == asset.name
}

fn join_uri(base: &str, tail: &str) -> String {
    if base.is_empty() {
        tail.to_string()
    } else {
        format!("{base}/{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LangConfig, LanguageConfig};
    use crate::dir::ScanRules;
    use tempfile::TempDir;

    fn build(root: &Path, languages: &Languages) -> Files {
        let table = ExtensionTable::default();
        let dir = Dir::new(root, root.parent().unwrap(), Rc::new(ScanRules::default()));
        Files::build(
            &dir,
            &FilesContext {
                table: &table,
                languages,
                content_url: "https://example.org/content",
                page: None,
            },
        )
    }

    fn page_dir(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("01-blog");
        fs::create_dir_all(&root).unwrap();
        for (name, body) in files {
            fs::write(root.join(name), body).unwrap();
        }
        (tmp, root)
    }

    fn kinds(files: &Files) -> Vec<(String, FileType)> {
        files
            .iter()
            .map(|f| (f.filename().to_string(), f.kind()))
            .collect()
    }

    #[test]
    fn classifies_by_extension() {
        let (_tmp, root) = page_dir(&[
            ("blog.txt", "Title: Blog"),
            ("photo.JPG", ""),
            ("manual.pdf", ""),
            ("data.bin", ""),
        ]);
        let files = build(&root, &Languages::default());
        assert_eq!(files.get("blog.txt").unwrap().kind(), FileType::Content);
        assert_eq!(files.get("photo.JPG").unwrap().kind(), FileType::Image);
        assert_eq!(files.get("photo.JPG").unwrap().mime(), "image/jpeg");
        assert_eq!(files.get("manual.pdf").unwrap().kind(), FileType::Document);
        assert_eq!(files.get("data.bin").unwrap().kind(), FileType::Other);
    }

    #[test]
    fn content_named_after_asset_becomes_meta() {
        let (_tmp, root) = page_dir(&[
            ("blog.txt", "Title: Blog"),
            ("photo.jpg", ""),
            ("photo.jpg.txt", "Caption: Sunset"),
            ("cover.png", ""),
            ("cover.txt", "Caption: Cover"),
        ]);
        let files = build(&root, &Languages::default());
        let k = kinds(&files);
        assert!(k.contains(&("blog.txt".into(), FileType::Content)));
        assert!(k.contains(&("photo.jpg.txt".into(), FileType::Meta)));
        assert!(k.contains(&("cover.txt".into(), FileType::Meta)));

        let photo = files.get("photo.jpg").unwrap();
        let meta = photo.meta("").unwrap();
        assert_eq!(meta.get("caption").unwrap().value(), "Sunset");
        assert_eq!(photo.field("caption").as_deref(), Some("Sunset"));
    }

    #[test]
    fn thumb_needs_original_sibling() {
        let (_tmp, root) = page_dir(&[
            ("photo.jpg", ""),
            ("photo.thumb.jpg", ""),
            ("lonely.thumb.png", ""),
        ]);
        let files = build(&root, &Languages::default());
        assert_eq!(files.get("photo.thumb.jpg").unwrap().kind(), FileType::Thumb);
        assert_eq!(files.get("lonely.thumb.png").unwrap().kind(), FileType::Image);
        assert_eq!(files.get("photo.jpg").unwrap().kind(), FileType::Image);
        assert_eq!(files.thumbs().len(), 1);
    }

    #[test]
    fn meta_falls_back_to_default_language() {
        let lang = |code: &str, default| LanguageConfig {
            code: code.into(),
            name: String::new(),
            locale: String::new(),
            url: None,
            default,
        };
        let languages = Languages::from_config(&LangConfig {
            support: true,
            available: vec![lang("en", true), lang("de", false), lang("fr", false)],
        })
        .unwrap();
        let (_tmp, root) = page_dir(&[
            ("blog.en.txt", "Title: Blog"),
            ("photo.jpg", ""),
            ("photo.jpg.en.txt", "Caption: Sunset"),
            ("photo.jpg.de.txt", "Caption: Sonnenuntergang"),
        ]);
        let files = build(&root, &languages);
        assert_eq!(files.metas().len(), 2);
        let photo = files.get("photo.jpg").unwrap();
        let caption = |code: &str| {
            photo
                .meta(code)
                .and_then(|m| m.get("caption").map(|f| f.value().to_string()))
        };
        assert_eq!(caption("de").as_deref(), Some("Sonnenuntergang"));
        assert_eq!(caption("fr").as_deref(), Some("Sunset"));
        assert_eq!(caption("en").as_deref(), Some("Sunset"));
    }

    #[test]
    fn siblings_and_neighbors() {
        let (_tmp, root) = page_dir(&[("a.jpg", ""), ("b.jpg", ""), ("c.jpg", "")]);
        let files = build(&root, &Languages::default());
        let b = files.get("b.jpg").unwrap().clone();
        let siblings_coll = files.siblings(&b);
        let siblings: Vec<&str> = siblings_coll.keys().collect();
        assert_eq!(siblings, vec!["a.jpg", "c.jpg"]);
        assert_eq!(files.prev(&b).unwrap().filename(), "a.jpg");
        assert_eq!(files.next(&b).unwrap().filename(), "c.jpg");
        let c = files.get("c.jpg").unwrap().clone();
        assert!(files.next(&c).is_none());
    }

    #[test]
    fn find_variants() {
        let (_tmp, root) = page_dir(&[("a.jpg", ""), ("b.pdf", ""), ("c.jpg", "")]);
        let files = build(&root, &Languages::default());
        assert_eq!(files.find("b.pdf").unwrap().filename(), "b.pdf");
        assert!(files.find("z.pdf").is_none());
        assert_eq!(files.find_many(&["c.jpg", "a.jpg"]).unwrap().len(), 2);
        assert!(files.find_many(&["x", "y"]).is_none());
        assert_eq!(files.find_by("extension", "jpg").unwrap().filename(), "a.jpg");
        let any_coll = files.find_by_any("extension", &["pdf", "jpg"]);
        let any: Vec<&str> = any_coll.keys().collect();
        assert_eq!(any, vec!["a.jpg", "b.pdf", "c.jpg"]);
    }

    #[test]
    fn uri_url_and_size() {
        let (_tmp, root) = page_dir(&[("notes.pdf", "12345")]);
        let files = build(&root, &Languages::default());
        let file = files.get("notes.pdf").unwrap();
        assert_eq!(file.uri(), "01-blog/notes.pdf");
        assert_eq!(file.url(), "https://example.org/content/01-blog/notes.pdf");
        assert_eq!(file.size(), 5);
        assert_eq!(file.nice_size(), "5 B");
    }

    #[test]
    fn nice_size_units() {
        assert_eq!(nice_size(0), "0 B");
        assert_eq!(nice_size(1536), "1.5 KB");
        assert_eq!(nice_size(1024 * 1024), "1 MB");
    }

    #[test]
    fn configured_extensions_join_the_table() {
        let mut config = SiteConfig::default();
        config.content.extensions = vec!["md".into()];
        config.files.types.push(crate::config::FileTypeConfig {
            extension: "heic".into(),
            kind: FileType::Image,
            mime: "image/heic".into(),
        });
        let table = ExtensionTable::from_config(&config);
        assert_eq!(table.kind("md"), FileType::Content);
        assert_eq!(table.kind("txt"), FileType::Document);
        assert_eq!(table.kind("HEIC"), FileType::Image);
        assert_eq!(table.mime("heic"), Some("image/heic"));
    }
}
