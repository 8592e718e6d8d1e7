//! Request resolution end to end: fixture site on disk → visit → page.

mod common;

use common::{open_fixture, page};
use flatsite::{Entry, render::HtmlTemplates};

#[test]
fn nested_page_resolves_with_fields_and_url() {
    let (_tmp, site) = open_fixture("site");
    let project = site.visit("/projects/project-a");

    assert_eq!(project.uid_path(), "projects/project-a");
    assert_eq!(project.title().value(), "A");
    assert_eq!(project.field("year").unwrap().to_int(), Some(2012));
    assert!(project.url(None).ends_with("/projects/project-a"));
    assert_eq!(project.depth(), 2);
    assert!(project.parent().unwrap().is_visible());
    assert!(project.is_active());
    assert!(page(&site, "projects").is_open());
}

#[test]
fn unknown_paths_land_on_error_page() {
    let (_tmp, site) = open_fixture("site");
    assert!(site.visit("/projects/nope").is_errorpage());
    assert!(site.visit("/").is_homepage());
}

#[test]
fn configured_routes_resolve_before_lookup() {
    let (_tmp, site) = open_fixture("site");
    let blog = site.visit("blog/2024/03");
    assert_eq!(blog.uid(), "blog");
    assert_eq!(site.param("year").as_deref(), Some("2024"));
    assert_eq!(site.param("month").as_deref(), Some("03"));

    // Pattern requires four digits; falls through to lookup and fails
    assert!(site.visit("blog/24").is_errorpage());
}

#[test]
fn subfolder_is_stripped() {
    let (tmp, _site) = open_fixture("site");
    std::fs::write(
        tmp.path().join("config.toml"),
        "url = \"https://example.org/sub\"\n",
    )
    .unwrap();
    let site = flatsite::Site::open(tmp.path()).unwrap();
    let project = site.visit("/sub/projects/project-a");
    assert_eq!(project.uid_path(), "projects/project-a");
    assert_eq!(
        project.url(None),
        "https://example.org/sub/projects/project-a"
    );
}

#[test]
fn translation_falls_back_to_default_language() {
    let (_tmp, site) = open_fixture("multilang");
    let project = site.visit("de/projekte/project-a");
    assert_eq!(site.language(), "de");
    assert_eq!(project.uid_path(), "projects/project-a");
    assert!(project.content(Some("de")).is_none());
    assert_eq!(project.title().value(), "A");
    assert_eq!(
        project.url(None),
        "https://example.org/de/projekte/project-a"
    );
    assert_eq!(
        project.url(Some("en")),
        "https://example.org/en/projects/project-a"
    );
}

#[test]
fn unprefixed_path_uses_default_language() {
    let (_tmp, site) = open_fixture("multilang");
    site.visit("de/projekte");
    let projects = site.visit("projects");
    assert_eq!(site.language(), "en");
    assert_eq!(projects.title().value(), "Projects");
}

#[test]
fn custom_template_is_chosen_by_content_name() {
    let (_tmp, site) = open_fixture("site");
    let mut templates = HtmlTemplates::new();
    templates.register("project", |ctx| {
        Ok(format!("<h1>{}</h1>", ctx.page.title().value()))
    });
    site.set_templates(templates);

    let project = site.visit("projects/project-a");
    assert_eq!(project.template(), "project");
    assert_eq!(site.render(&project).unwrap(), "<h1>A</h1>");
    assert_eq!(Entry::field(&project, "template").as_deref(), Some("project"));
}
