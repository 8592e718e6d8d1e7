//! URL routes.
//!
//! A route binds a URL pattern to a page URI. Patterns are plain path text
//! with a few special forms:
//!
//! | Form | Meaning |
//! |---|---|
//! | `@name` | one path segment, captured as `name` |
//! | `@name:regex` | captured as `name`, constrained by `regex` |
//! | `@name:(a\|b)` | a constraint opening with `(` runs to its matching `)` |
//! | `( ... )` | optional group |
//! | trailing `*` | the rest of the path, captured as `splat` |
//!
//! `blog(/@year(/@month))` matches `blog`, `blog/2012` and `blog/2012/11`.
//! The page side may reuse captures: `page = "blog/@year"`.
//!
//! Routes are tried in order. A route only wins if its pattern matches
//! **and** its page exists; otherwise the next route is tried.

use crate::config::{ConfigError, RouteConfig};
use indexmap::IndexMap;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct Route {
    pattern: String,
    page: String,
    regex: Regex,
}

impl Route {
    pub fn new(pattern: &str, page: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: pattern.to_string(),
            page: page.to_string(),
            regex: compile(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    /// Captures when the pattern matches the whole `path`.
    pub fn captures(&self, path: &str) -> Option<IndexMap<String, String>> {
        let caps = self.regex.captures(path.trim_matches('/'))?;
        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// A successful route match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub pattern: String,
    /// Page URI with placeholders replaced by their captures.
    pub page: String,
    pub params: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, ConfigError> {
        let mut router = Self::new();
        for route in routes {
            router.add(&route.pattern, &route.page).map_err(|e| {
                ConfigError::Validation(format!("invalid route {:?}: {e}", route.pattern))
            })?;
        }
        Ok(router)
    }

    pub fn add(&mut self, pattern: &str, page: &str) -> Result<(), regex::Error> {
        self.routes.push(Route::new(pattern, page)?);
        Ok(())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route whose pattern matches `path` and whose page passes
    /// `exists`.
    pub fn run(&self, path: &str, exists: impl Fn(&str) -> bool) -> Option<RouteMatch> {
        for route in &self.routes {
            let Some(params) = route.captures(path) else {
                continue;
            };
            let page = substitute(&route.page, &params);
            if exists(&page) {
                tracing::debug!(pattern = %route.pattern, page = %page, "route matched");
                return Some(RouteMatch {
                    pattern: route.pattern.clone(),
                    page,
                    params,
                });
            }
            tracing::debug!(pattern = %route.pattern, page = %page, "route target missing, trying next");
        }
        None
    }
}

/// Translate a route pattern into an anchored regex.
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = pattern.trim_start_matches('/');
    let (body, splat) = match pattern.strip_suffix('*') {
        Some(rest) => (rest, true),
        None => (pattern, false),
    };

    let mut regex = String::from("^");
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '(' => {
                regex.push_str("(?:");
                i += 1;
            }
            ')' => {
                regex.push_str(")?");
                i += 1;
            }
            '@' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                if name.is_empty() {
                    regex.push_str(&regex::escape("@"));
                    i += 1;
                    continue;
                }
                let mut constraint = String::from("[^/?]+");
                i = end;
                if i < chars.len() && chars[i] == ':' {
                    let c_start = i + 1;
                    let mut c_end = c_start;
                    let mut depth = 0usize;
                    while c_end < chars.len() {
                        match chars[c_end] {
                            '(' if c_end == c_start || depth > 0 => depth += 1,
                            ')' if depth > 0 => depth -= 1,
                            '/' | '(' | ')' if depth == 0 => break,
                            _ => {}
                        }
                        c_end += 1;
                    }
                    if c_end > c_start {
                        constraint = chars[c_start..c_end].iter().collect();
                    }
                    i = c_end;
                }
                regex.push_str(&format!("(?P<{name}>{constraint})"));
            }
            _ => {
                let start = i;
                while i < chars.len() && !matches!(chars[i], '(' | ')' | '@') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                regex.push_str(&regex::escape(&literal));
            }
        }
    }

    if splat {
        match regex.strip_suffix('/') {
            Some(without_slash) => {
                regex = without_slash.to_string();
                regex.push_str("(?:/(?P<splat>.*))?");
            }
            None => regex.push_str("(?P<splat>.*)"),
        }
    }
    regex.push_str("/?$");
    Regex::new(&regex)
}

/// Replace `@name` placeholders in `page` with captured values. Unfilled
/// placeholders are dropped along with the slashes they leave behind.
fn substitute(page: &str, params: &IndexMap<String, String>) -> String {
    page.split('/')
        .filter_map(|segment| match segment.strip_prefix('@') {
            Some(name) => params.get(name).cloned(),
            None => Some(segment.to_string()),
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn optional_groups() {
        let route = Route::new("blog(/@year(/@month))", "blog").unwrap();
        assert_eq!(route.captures("blog/2012"), Some(params(&[("year", "2012")])));
        assert_eq!(route.captures("blog"), Some(params(&[])));
        assert_eq!(
            route.captures("blog/2012/11"),
            Some(params(&[("year", "2012"), ("month", "11")]))
        );
        assert!(route.captures("blog/2012/11/10").is_none());
        assert!(route.captures("blogs").is_none());
    }

    #[test]
    fn wildcard_takes_the_rest() {
        let route = Route::new("blog/*", "blog").unwrap();
        assert_eq!(
            route.captures("blog/2012/11/10"),
            Some(params(&[("splat", "2012/11/10")]))
        );
        assert!(route.captures("blog").is_some());
        assert!(route.captures("news/1").is_none());
    }

    #[test]
    fn regex_constraints() {
        let route = Route::new("archive/@year:[0-9]{4}", "archive").unwrap();
        assert!(route.captures("archive/2012").is_some());
        assert!(route.captures("archive/twelve").is_none());
    }

    #[test]
    fn parenthesized_constraints() {
        let route = Route::new("@lang:(en|de)/news", "news").unwrap();
        assert_eq!(route.captures("de/news"), Some(params(&[("lang", "de")])));
        assert!(route.captures("fr/news").is_none());

        let route = Route::new("docs(/@lang:(en|de)(/@page))", "docs").unwrap();
        assert_eq!(route.captures("docs/en"), Some(params(&[("lang", "en")])));
        assert_eq!(
            route.captures("docs/en/intro"),
            Some(params(&[("lang", "en"), ("page", "intro")]))
        );
        assert!(route.captures("docs/fr").is_none());
    }

    #[test]
    fn literals_are_escaped() {
        let route = Route::new("feed.xml", "feed").unwrap();
        assert!(route.captures("feed.xml").is_some());
        assert!(route.captures("feedxxml").is_none());
    }

    #[test]
    fn leading_and_trailing_slashes_ignored() {
        let route = Route::new("/about", "about").unwrap();
        assert!(route.captures("/about/").is_some());
    }

    #[test]
    fn invalid_constraint_fails_to_compile() {
        assert!(Route::new("x/@id:[", "x").is_err());
    }

    #[test]
    fn run_substitutes_captures() {
        let mut router = Router::new();
        router.add("tag/@tag", "tags/@tag").unwrap();
        let hit = router.run("tag/rust", |_| true).unwrap();
        assert_eq!(hit.page, "tags/rust");
        assert_eq!(hit.params["tag"], "rust");
    }

    #[test]
    fn run_falls_through_missing_pages() {
        let mut router = Router::new();
        router.add("@section", "missing").unwrap();
        router.add("@section", "@section").unwrap();
        let hit = router.run("projects", |page| page == "projects").unwrap();
        assert_eq!(hit.page, "projects");
        assert!(router.run("projects", |_| false).is_none());
    }

    #[test]
    fn unfilled_placeholders_are_dropped() {
        assert_eq!(substitute("blog/@year/@month", &params(&[("year", "2012")])), "blog/2012");
    }

    #[test]
    fn from_config_reports_bad_patterns() {
        let routes = vec![RouteConfig {
            pattern: "x/@id:(".into(),
            page: "x".into(),
        }];
        assert!(matches!(
            Router::from_config(&routes),
            Err(ConfigError::Validation(_))
        ));
    }
}
