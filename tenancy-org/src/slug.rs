//! Slug generation.
//!
//! Slugs are lowercase ASCII alphanumerics joined by single dashes.
//! Organization slugs are unique globally, team slugs per organization;
//! collisions are resolved by suffixing `-2`, `-3`, ...

/// Generate a URL-safe slug from a name, using `fallback` when nothing
/// usable remains.
///
/// ```
/// use tenancy_org::slug::slugify;
///
/// assert_eq!(slugify("Acme Corp", "org"), "acme-corp");
/// assert_eq!(slugify("  R&D -- Platform ", "team"), "r-d-platform");
/// assert_eq!(slugify("!!!", "team"), "team");
/// ```
pub fn slugify(name: &str, fallback: &str) -> String {
    let slug = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Whether `slug` is already in canonical form.
pub fn is_valid(slug: &str) -> bool {
    !slug.is_empty() && slugify(slug, "") == slug
}

/// Candidate slugs in the order they should be tried: `base`, `base-2`, `base-3`, ...
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain((2u32..).map(move |n| format!("{base}-{n}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Organization", "org"), "my-organization");
        assert_eq!(slugify("Acme Inc.", "org"), "acme-inc");
        assert_eq!(slugify("Test  --  Company", "org"), "test-company");
        assert_eq!(slugify("123 ABC", "org"), "123-abc");
        assert_eq!(slugify("Équipe", "team"), "quipe");
        assert_eq!(slugify("", "org"), "org");
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("eng-core"));
        assert!(!is_valid("Eng"));
        assert!(!is_valid("eng--core"));
        assert!(!is_valid(""));
    }

    #[test]
    fn test_candidates() {
        let first: Vec<String> = candidates("acme").take(3).collect();
        assert_eq!(first, vec!["acme", "acme-2", "acme-3"]);
    }
}
