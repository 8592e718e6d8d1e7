//! Page collections.
//!
//! [`Pages`] is a [`Collection`] of [`Page`] handles keyed by uid path
//! (`projects/project-a`). On top of the generic operations it adds
//! visibility filters, recursive flattening, and level-by-level lookups.

use crate::collection::{Collection, Entry};
use crate::page::Page;

pub type Pages = Collection<Page>;

impl Collection<Page> {
    pub fn visible(&self) -> Self {
        self.filter(Page::is_visible)
    }

    pub fn invisible(&self) -> Self {
        self.filter(Page::is_invisible)
    }

    /// Every page in this collection and all their descendants, parents
    /// before their children.
    pub fn index(&self) -> Self {
        let mut flat = Vec::new();
        for page in self.iter() {
            collect_descendants(page, &mut flat);
        }
        flat.into_iter().collect()
    }

    /// Children of every page in this collection.
    pub fn children(&self) -> Self {
        self.iter()
            .flat_map(|p| p.children().to_vec())
            .collect()
    }

    /// Breadth-first search for the first page whose `field` equals `value`.
    ///
    /// Every page of a level is checked before the next level is entered.
    /// With `deep = false` only this collection's own level is searched.
    pub fn find_by(&self, field: &str, value: &str, deep: bool) -> Option<Page> {
        let mut level = self.to_vec();
        while !level.is_empty() {
            if let Some(hit) = level
                .iter()
                .find(|p| Entry::field(*p, field).as_deref() == Some(value))
            {
                return Some(hit.clone());
            }
            if !deep {
                break;
            }
            level = level
                .iter()
                .flat_map(|p| p.children().to_vec())
                .collect();
        }
        None
    }

    /// Walk `segments` one level at a time.
    ///
    /// Single-language sites match segments against uids; multi-language
    /// sites match against slugs in the current language. Returns `None`
    /// as soon as a segment is not found on its level.
    pub fn find_by_uri(&self, segments: &[&str]) -> Option<Page> {
        let (first, rest) = segments.split_first()?;
        let multi = self
            .first()
            .is_some_and(|p| p.site().languages().is_enabled());
        let field = if multi { "slug" } else { "uid" };

        let mut page = self.find_by(field, first, false)?;
        for segment in rest {
            page = page.children().find_by(field, segment, false)?;
        }
        Some(page)
    }

    /// Look up a page by uid path, descending one level per segment.
    pub fn find_uri(&self, uri: &str) -> Option<Page> {
        let uri = uri.trim_matches('/');
        if uri.is_empty() {
            return None;
        }
        let mut current = self.clone();
        let mut key = String::new();
        let mut found = None;
        for segment in uri.split('/') {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(segment);
            let page = current
                .find(&key)
                .or_else(|| current.iter().find(|p| p.uid() == segment).cloned())?;
            current = page.children();
            found = Some(page);
        }
        found
    }

    /// Pages using `template`.
    pub fn template(&self, template: &str) -> Self {
        self.filter(|p| p.template() == template)
    }

    /// The active page, if it is in this collection.
    pub fn active(&self) -> Option<Page> {
        self.iter().find(|p| p.is_active()).cloned()
    }

    /// The first open page (active or an ancestor of it).
    pub fn find_open(&self) -> Option<Page> {
        self.iter().find(|p| p.is_open()).cloned()
    }
}

fn collect_descendants(page: &Page, out: &mut Vec<Page>) {
    out.push(page.clone());
    for child in page.children().iter() {
        collect_descendants(child, out);
    }
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::{find_page, keys, setup_multilang_site, setup_site};

    #[test]
    fn visible_and_invisible_split() {
        let (_tmp, site) = setup_site();
        let children = site.root().children();
        assert_eq!(keys(&children.visible()), vec!["projects", "blog", "about"]);
        assert_eq!(keys(&children.invisible()), vec!["error", "home"]);
    }

    #[test]
    fn index_flattens_parents_first() {
        let (_tmp, site) = setup_site();
        let index = site.root().children().index();
        let all = keys(&index);
        let projects = all.iter().position(|k| k == "projects").unwrap();
        let project_a = all.iter().position(|k| k == "projects/project-a").unwrap();
        assert!(projects < project_a);
        assert!(all.contains(&"home/welcome".to_string()));
        assert_eq!(index.len(), site.index().len());
    }

    #[test]
    fn find_by_is_breadth_first() {
        let (_tmp, site) = setup_site();
        let children = site.root().children();
        // "welcome" only exists below home
        assert!(children.find_by("uid", "welcome", false).is_none());
        let deep = children.find_by("uid", "welcome", true).unwrap();
        assert_eq!(deep.uid_path(), "home/welcome");
        // Level one wins over deeper matches with the same title
        let hit = children.find_by("title", "Projects", true).unwrap();
        assert_eq!(hit.uid_path(), "projects");
    }

    #[test]
    fn find_by_uri_walks_levels() {
        let (_tmp, site) = setup_site();
        let children = site.root().children();
        let page = children.find_by_uri(&["projects", "project-a"]).unwrap();
        assert_eq!(page.title().value(), "A");
        assert!(children.find_by_uri(&["project-a"]).is_none());
        assert!(children.find_by_uri(&["projects", "nope"]).is_none());
        assert!(children.find_by_uri(&[]).is_none());
    }

    #[test]
    fn find_uri_by_uid_path() {
        let (_tmp, site) = setup_site();
        let children = site.root().children();
        assert_eq!(
            children.find_uri("/projects/project-a/").unwrap(),
            find_page(&site, "projects/project-a")
        );
        assert!(children.find_uri("").is_none());
    }

    #[test]
    fn find_by_uri_uses_translated_slugs() {
        let (_tmp, site) = setup_multilang_site();
        assert!(site.set_language("de"));
        let children = site.root().children();
        let page = children.find_by_uri(&["projekte"]).unwrap();
        assert_eq!(page.uid(), "projects");
        assert!(children.find_by_uri(&["projects"]).is_none());
    }

    #[test]
    fn active_and_open() {
        let (_tmp, site) = setup_site();
        site.visit("projects/project-a");
        let children = site.root().children();
        assert!(children.active().is_none());
        assert_eq!(children.find_open().unwrap().uid(), "projects");
        let projects = find_page(&site, "projects");
        assert_eq!(projects.children().active().unwrap().uid(), "project-a");
    }
}
