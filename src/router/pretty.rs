//! PascalCase identifiers to URL path segments.

/// Converts a PascalCase identifier into a lowercase, hyphen-separated path segment.
///
/// The first character is lowercased; every later ASCII uppercase letter becomes
/// `-` followed by its lowercase form. Everything else passes through.
///
/// # Examples
///
/// ```
/// use rttp_mvc::router::pretty_path;
///
/// assert_eq!(pretty_path("CommentAdd"), "comment-add");
/// assert_eq!(pretty_path("Index"), "index");
/// assert_eq!(pretty_path(""), "");
/// ```
pub fn pretty_path(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len() + 4);
    let mut chars = identifier.chars();

    if let Some(first) = chars.next() {
        out.push(first.to_ascii_lowercase());
    }
    for c in chars {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hyphenates_inner_capitals() {
        assert_eq!(pretty_path("PostComment"), "post-comment");
        assert_eq!(pretty_path("ABC"), "a-b-c");
        assert_eq!(pretty_path("View2Html"), "view2-html");
    }

    #[test]
    fn lowercase_input_is_untouched() {
        assert_eq!(pretty_path("already-pretty"), "already-pretty");
    }

    #[test]
    fn non_ascii_passes_through() {
        assert_eq!(pretty_path("ÜberCafé"), "Über-café");
    }

    proptest! {
        #[test]
        fn output_has_no_ascii_uppercase(s in "[A-Z][A-Za-z0-9]{0,24}") {
            let pretty = pretty_path(&s);
            prop_assert!(!pretty.chars().any(|c| c.is_ascii_uppercase()));
            let capitals = s.chars().skip(1).filter(char::is_ascii_uppercase).count();
            prop_assert_eq!(pretty.matches('-').count(), capitals);
        }

        #[test]
        fn is_idempotent(s in "[A-Z][A-Za-z0-9]{0,24}") {
            let once = pretty_path(&s);
            prop_assert_eq!(pretty_path(&once), once.clone());
        }
    }
}
