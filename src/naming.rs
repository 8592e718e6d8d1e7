//! Name parsing for the `[NNN-]uid` directory convention, plus the two
//! sanitizers used across the engine: URL slugs and content field keys.
//!
//! ## Directory names
//!
//! A content directory may carry a numeric sort prefix followed by a dash.
//! The prefix makes the page visible and fixes its position among siblings:
//!
//! - `01-projects` → num=`Some("01")`, uid=`projects` (visible)
//! - `projects` → num=`None`, uid=`projects` (invisible)
//! - `001` → num=`None`, uid=`001` (no dash, so no prefix)
//! - `3-` → num=`Some("3")`, uid=`` (empty uid)

/// Result of parsing a directory name like `01-projects`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Digit run before the first dash, kept verbatim (`"01"`, not `1`).
    pub num: Option<String>,
    /// Everything after the prefix, or the whole name when there is no prefix.
    pub uid: String,
}

impl ParsedName {
    /// Numeric value of the prefix.
    /// Numeric prefix value, saturating at `u32::MAX` for overlong prefixes.
    pub fn number(&self) -> Option<u32> {
        self.num.as_deref().map(|n| n.parse().unwrap_or(u32::MAX))
    }
}

/// Parse a directory name against `^([0-9]+)-(.*)$`.
pub fn parse_dirname(name: &str) -> ParsedName {
    if let Some(dash_pos) = name.find('-') {
        let prefix = &name[..dash_pos];
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            return ParsedName {
                num: Some(prefix.to_string()),
                uid: name[dash_pos + 1..].to_string(),
            };
        }
    }
    ParsedName {
        num: None,
        uid: name.to_string(),
    }
}

/// Build a directory name from an optional sort number and a uid.
pub fn dirname(num: Option<u32>, uid: &str) -> String {
    match num {
        Some(n) => format!("{n}-{uid}"),
        None => uid.to_string(),
    }
}

const MAX_SLUG_LEN: usize = 80;

/// Turn arbitrary text into a lowercase URL slug.
///
/// - Common Latin diacritics are transliterated (`ä` → `ae`, `é` → `e`)
/// - Anything else that is not ASCII alphanumeric becomes a dash
/// - Consecutive dashes collapse, leading/trailing dashes are stripped
/// - Truncates to `MAX_SLUG_LEN` characters at the last dash before the limit
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match transliterate(c) {
            Some(t) => slug.push_str(t),
            None if c.is_ascii_alphanumeric() => slug.push(c),
            None => slug.push('-'),
        }
    }

    let mut collapsed = String::with_capacity(slug.len());
    let mut prev_dash = false;
    for c in slug.chars() {
        if c == '-' {
            if !prev_dash {
                collapsed.push('-');
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }

    let trimmed = collapsed.trim_matches('-');
    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}

fn transliterate(c: char) -> Option<&'static str> {
    let t = match c {
        'ä' | 'æ' => "ae",
        'ö' | 'œ' => "oe",
        'ü' => "ue",
        'ß' => "ss",
        'à' | 'á' | 'â' | 'ã' | 'å' => "a",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' => "o",
        'ù' | 'ú' | 'û' => "u",
        'ý' | 'ÿ' => "y",
        _ => return None,
    };
    Some(t)
}

/// Normalize a content field key: trimmed, lowercased, and every run of
/// non-alphanumeric characters replaced by a single underscore.
///
/// `"URL-Key"` → `"url_key"`, `"  Title "` → `"title"`, `"!!"` → `"_"`.
pub fn sanitize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
            in_run = false;
        } else if !in_run {
            key.push('_');
            in_run = true;
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_directory() {
        let p = parse_dirname("01-projects");
        assert_eq!(p.num.as_deref(), Some("01"));
        assert_eq!(p.uid, "projects");
        assert_eq!(p.number(), Some(1));
    }

    #[test]
    fn overlong_prefix_saturates() {
        let p = parse_dirname("99999999999-huge");
        assert_eq!(p.num.as_deref(), Some("99999999999"));
        assert_eq!(p.number(), Some(u32::MAX));
    }

    #[test]
    fn unnumbered_directory() {
        let p = parse_dirname("projects");
        assert_eq!(p.num, None);
        assert_eq!(p.uid, "projects");
    }

    #[test]
    fn dashes_after_prefix_are_kept() {
        let p = parse_dirname("20-my-best-work");
        assert_eq!(p.num.as_deref(), Some("20"));
        assert_eq!(p.uid, "my-best-work");
    }

    #[test]
    fn number_without_dash_is_not_a_prefix() {
        let p = parse_dirname("001");
        assert_eq!(p.num, None);
        assert_eq!(p.uid, "001");
    }

    #[test]
    fn trailing_dash_gives_empty_uid() {
        let p = parse_dirname("3-");
        assert_eq!(p.num.as_deref(), Some("3"));
        assert_eq!(p.uid, "");
    }

    #[test]
    fn leading_dash_is_not_a_prefix() {
        let p = parse_dirname("-draft");
        assert_eq!(p.num, None);
        assert_eq!(p.uid, "-draft");
    }

    #[test]
    fn mixed_prefix_is_not_a_number() {
        let p = parse_dirname("v2-notes");
        assert_eq!(p.num, None);
        assert_eq!(p.uid, "v2-notes");
    }

    #[test]
    fn dirname_roundtrips_through_parse() {
        assert_eq!(dirname(Some(3), "blog"), "3-blog");
        assert_eq!(dirname(None, "blog"), "blog");
        let p = parse_dirname(&dirname(Some(12), "a-b"));
        assert_eq!(p.number(), Some(12));
        assert_eq!(p.uid, "a-b");
    }

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("My Great Photo!"), "my-great-photo");
        assert_eq!(slugify("  --Hello--World--  "), "hello-world");
    }

    #[test]
    fn slugify_transliterates() {
        assert_eq!(slugify("Über uns"), "ueber-uns");
        assert_eq!(slugify("Café Noël"), "cafe-noel");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn slugify_drops_unknown_scripts() {
        assert_eq!(slugify("日本語"), "");
        assert_eq!(slugify("@#$%"), "");
    }

    #[test]
    fn slugify_truncates_at_word_boundary() {
        let long = "word-".repeat(30);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn sanitize_key_examples() {
        assert_eq!(sanitize_key("Title"), "title");
        assert_eq!(sanitize_key("URL-Key"), "url_key");
        assert_eq!(sanitize_key("  Published On "), "published_on");
        assert_eq!(sanitize_key("a -- b"), "a_b");
        assert_eq!(sanitize_key("!!"), "_");
        assert_eq!(sanitize_key("   "), "");
    }
}
