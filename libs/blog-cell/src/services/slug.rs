use std::collections::HashSet;

pub const MAX_SLUG_CHARS: usize = 255;

/// Lowercase ASCII slug: punctuation dropped, whitespace and hyphen runs
/// collapsed to one hyphen, leading and trailing `-`/`_` stripped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.chars().filter(char::is_ascii).map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_whitespace() || c == '-' {
            pending_separator = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_')
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect()
}

/// `base`, or the first of `base-1`, `base-2`, ... not already taken.
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    let base = if base.is_empty() { "post" } else { base };
    if !taken.contains(base) {
        return base.to_string();
    }

    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_matches_url_rules() {
        assert_eq!(slugify("Coping with Anxiety: 5 Tips!"), "coping-with-anxiety-5-tips");
        assert_eq!(slugify("  --Self   care -- basics_ "), "self-care-basics");
        assert_eq!(slugify("Café & Calm"), "caf-calm");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn unique_slug_counts_up() {
        let taken: HashSet<String> = ["sleep-hygiene", "sleep-hygiene-1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique_slug("sleep-hygiene", &taken), "sleep-hygiene-2");
        assert_eq!(unique_slug("new-post", &taken), "new-post");
        assert_eq!(unique_slug("", &HashSet::new()), "post");
    }
}
