//! Compiled route patterns.

use crate::http::request::percent_decode;

use super::PathParams;

// A single path segment, either a literal string or a named capture (`:name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Static(String),
    Parameter(String),
}

/// Compiled representation of a route pattern string.
///
/// | Pattern              | Example match              | Captured params                    |
/// |----------------------|----------------------------|------------------------------------|
/// | `/post`              | `/post`                    | *(none)*                           |
/// | `/post/view/:a`      | `/post/view/42`            | `a → "42"`                         |
/// | `/static/*filepath`  | `/static/css/site.css`     | `filepath → "/css/site.css"`       |
///
/// Trailing slashes are significant: `/post/` does not match `/post`. The router
/// turns that near miss into a redirect when configured to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pattern {
    // Matches one exact path string, e.g. `/post`.
    Exact(String),
    // Matches a fixed number of segments where some are named captures.
    Parameterized(Vec<Segment>),
    // Matches the prefix itself or anything below it.
    Wildcard { prefix: String, name: String },
}

impl Pattern {
    /// Parse a route pattern string.
    ///
    /// Classified in order: a final `/*` or `/*name` segment makes a wildcard,
    /// any `:` segment makes a parameterized pattern, everything else is exact.
    pub(crate) fn parse(pattern: &str) -> Self {
        if let Some((prefix, last)) = pattern.rsplit_once('/') {
            if let Some(name) = last.strip_prefix('*') {
                let name = if name.is_empty() { "wildcard" } else { name };
                return Pattern::Wildcard {
                    prefix: prefix.to_owned(),
                    name: name.to_owned(),
                };
            }
        }

        if pattern.split('/').any(|s| s.starts_with(':')) {
            let segments = segments(pattern)
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_owned()),
                    None => Segment::Static(s.to_owned()),
                })
                .collect();
            return Pattern::Parameterized(segments);
        }

        Pattern::Exact(pattern.to_owned())
    }

    pub(crate) fn is_exact(&self) -> bool {
        matches!(self, Pattern::Exact(_))
    }

    /// Try to match `path`, returning the captured parameters in pattern order.
    pub(crate) fn matches(&self, path: &str) -> Option<PathParams> {
        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized(pattern_segments) => {
                let mut params = PathParams::new();
                let mut path_segments = segments(path);

                for seg in pattern_segments {
                    let actual = path_segments.next()?;
                    match seg {
                        Segment::Static(s) if s == actual => {}
                        Segment::Static(_) => return None,
                        Segment::Parameter(_) if actual.is_empty() => return None,
                        Segment::Parameter(name) => {
                            params.push(name.clone(), percent_decode(actual));
                        }
                    }
                }

                match path_segments.next() {
                    Some(_) => None,
                    None => Some(params),
                }
            }
            Pattern::Wildcard { prefix, name } => {
                let rest = path.strip_prefix(prefix.as_str())?;
                if !rest.is_empty() && !rest.starts_with('/') {
                    return None;
                }
                let mut params = PathParams::new();
                params.push(name.clone(), percent_decode(rest));
                Some(params)
            }
        }
    }

    /// Case-insensitive match. Returns the path rewritten with the pattern's own
    /// spelling of every static part, keeping captured values as given.
    pub(crate) fn matches_ignore_case(&self, path: &str) -> Option<String> {
        match self {
            Pattern::Exact(p) => p.eq_ignore_ascii_case(path).then(|| p.clone()),
            Pattern::Parameterized(pattern_segments) => {
                let mut fixed = String::with_capacity(path.len());
                let mut path_segments = segments(path);

                for seg in pattern_segments {
                    let actual = path_segments.next()?;
                    fixed.push('/');
                    match seg {
                        Segment::Static(s) if s.eq_ignore_ascii_case(actual) => fixed.push_str(s),
                        Segment::Static(_) => return None,
                        Segment::Parameter(_) if actual.is_empty() => return None,
                        Segment::Parameter(_) => fixed.push_str(actual),
                    }
                }

                match path_segments.next() {
                    Some(_) => None,
                    None => Some(fixed),
                }
            }
            Pattern::Wildcard { prefix, .. } => {
                let head = path.get(..prefix.len())?;
                let rest = &path[prefix.len()..];
                if !head.eq_ignore_ascii_case(prefix) || !(rest.is_empty() || rest.starts_with('/'))
                {
                    return None;
                }
                Some(format!("{prefix}{rest}"))
            }
        }
    }
}

// Segments after the leading slash. Empty segments are kept so that `/a/` and `/a`
// stay distinct.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exact() {
        assert_eq!(Pattern::parse("/"), Pattern::Exact("/".into()));
        assert_eq!(Pattern::parse("/post/index"), Pattern::Exact("/post/index".into()));
    }

    #[test]
    fn parse_parameterized() {
        let pat = Pattern::parse("/post/comment-add/:a/:b");
        assert_eq!(
            pat,
            Pattern::Parameterized(vec![
                Segment::Static("post".into()),
                Segment::Static("comment-add".into()),
                Segment::Parameter("a".into()),
                Segment::Parameter("b".into()),
            ])
        );
    }

    #[test]
    fn parse_wildcard() {
        assert_eq!(
            Pattern::parse("/static/*filepath"),
            Pattern::Wildcard {
                prefix: "/static".into(),
                name: "filepath".into()
            }
        );
        assert!(matches!(
            Pattern::parse("/files/*"),
            Pattern::Wildcard { name, .. } if name == "wildcard"
        ));
    }

    #[test]
    fn exact_is_slash_sensitive() {
        let pat = Pattern::parse("/post");
        assert!(pat.matches("/post").is_some());
        assert!(pat.matches("/post/").is_none());
    }

    #[test]
    fn params_are_positional_and_decoded() {
        let pat = Pattern::parse("/post/view/:a/:b");
        let params = pat.matches("/post/view/7/hello%20world").unwrap();
        assert_eq!(params.get("a"), Some("7"));
        assert_eq!(params.get_index(1), Some("hello world"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn params_require_exact_segment_count() {
        let pat = Pattern::parse("/post/view/:a");
        assert!(pat.matches("/post/view").is_none());
        assert!(pat.matches("/post/view/").is_none());
        assert!(pat.matches("/post/view/1/2").is_none());
        assert!(pat.matches("/post/edit/1").is_none());
    }

    #[test]
    fn wildcard_respects_segment_boundary() {
        let pat = Pattern::parse("/static/*filepath");
        let params = pat.matches("/static/css/site.css").unwrap();
        assert_eq!(params.get("filepath"), Some("/css/site.css"));
        assert!(pat.matches("/staticfoo").is_none());
    }

    #[test]
    fn case_insensitive_fix_keeps_param_values() {
        let pat = Pattern::parse("/post/view/:a");
        assert_eq!(
            pat.matches_ignore_case("/POST/View/AbC"),
            Some("/post/view/AbC".to_owned())
        );
        assert_eq!(
            Pattern::parse("/about").matches_ignore_case("/ABOUT"),
            Some("/about".to_owned())
        );
        assert!(pat.matches_ignore_case("/posts/view/1").is_none());
    }
}
