//! Lexical path cleanup used by the fixed-path redirect.

/// Returns the canonical form of a URL path.
///
/// Repeated slashes collapse, `.` segments are dropped, `..` removes the previous
/// segment (never climbing above the root), and the result always starts with `/`.
/// A trailing slash on the input is preserved.
///
/// # Examples
///
/// ```
/// use rttp_mvc::router::clean_path;
///
/// assert_eq!(clean_path("//post/./view/../index"), "/post/index");
/// assert_eq!(clean_path("../../etc"), "/etc");
/// assert_eq!(clean_path("/post/"), "/post/");
/// assert_eq!(clean_path(""), "/");
/// ```
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for part in &parts {
        cleaned.push('/');
        cleaned.push_str(part);
    }

    let wants_trailing = path.ends_with('/')
        || path.ends_with("/.")
        || path.ends_with("/..");
    if cleaned.is_empty() || (wants_trailing && !parts.is_empty()) {
        cleaned.push('/');
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_clean_paths_are_unchanged() {
        for p in ["/", "/post", "/post/view/1", "/post/"] {
            assert_eq!(clean_path(p), p);
        }
    }

    #[test]
    fn collapses_dots_and_slashes() {
        assert_eq!(clean_path("/a//b"), "/a/b");
        assert_eq!(clean_path("/a/./b/"), "/a/b/");
        assert_eq!(clean_path("/a/b/.."), "/a/");
        assert_eq!(clean_path("/.."), "/");
        assert_eq!(clean_path("post/index"), "/post/index");
    }
}
