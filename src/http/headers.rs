//! HTTP header map with case-insensitive name lookup.
//!
//! HTTP headers are order-preserving and case-insensitive per [RFC 9110 §5].

use std::fmt;

/// A case-insensitive, multi-value HTTP header map.
///
/// Preserves insertion order and allows multiple values per header name.
/// [`set`](Self::set) replaces every existing value, [`insert`](Self::insert) appends.
///
/// # Examples
///
/// ```
/// use rttp_mvc::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Set-Cookie", "a=1");
/// headers.insert("Set-Cookie", "b=2");
/// headers.set("Content-Type", "text/plain");
/// headers.set("content-type", "text/html; charset=utf-8");
///
/// assert_eq!(headers.get("Content-Type"), Some("text/html; charset=utf-8"));
/// assert_eq!(headers.get_all("set-cookie").count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    fn matching<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a (String, String)> + use<'a, 'n> {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Appends an entry, keeping any earlier values of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every value of `name` with `value`. The entry keeps the position
    /// of the first one it replaces.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let Some(first) = self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(&name)) else {
            self.entries.push((name, value));
            return;
        };
        let mut index = 0;
        self.entries.retain(|(k, _)| {
            let keep = index <= first || !k.eq_ignore_ascii_case(&name);
            index += 1;
            keep
        });
        self.entries[first] = (name, value);
    }

    /// First value of `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.matching(name).next().map(|(_, v)| v.as_str())
    }

    /// Every value of `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.matching(name).map(|(_, v)| v.as_str())
    }

    /// Drops every value of `name`; `true` if there was one.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.entries.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.matching(name).next().is_some()
    }

    /// Number of entries, counting repeated names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter()
            .try_for_each(|(name, value)| write!(f, "{name}: {value}\r\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut h = Headers::new();
        h.insert("X-CSRF-Token", "abc");
        assert_eq!(h.get("x-csrf-token"), Some("abc"));
        assert!(h.contains("X-Csrf-Token"));
    }

    #[test]
    fn set_replaces_every_value() {
        let mut h = Headers::new();
        h.insert("Allow", "GET");
        h.insert("allow", "POST");
        h.set("ALLOW", "GET, POST");
        let vals: Vec<_> = h.get_all("allow").collect();
        assert_eq!(vals, vec!["GET, POST"]);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn set_keeps_position() {
        let mut h = Headers::new();
        h.insert("Content-Type", "text/plain");
        h.insert("Location", "/a");
        h.set("content-type", "text/html");
        let names: Vec<_> = h.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["content-type", "Location"]);
        assert_eq!(h.to_string(), "content-type: text/html\r\nLocation: /a\r\n");
    }

    #[test]
    fn remove_reports_presence() {
        let mut h = Headers::new();
        h.insert("Location", "/a");
        assert!(h.remove("location"));
        assert!(!h.remove("location"));
        assert!(h.is_empty());
    }

    #[test]
    fn values_outlive_the_lookup_name() {
        let mut h = Headers::new();
        h.insert("X-Request-Id", "42");
        let value = {
            let name = String::from("x-request-id");
            h.get(&name)
        };
        assert_eq!(value, Some("42"));
        let present = {
            let name = "X-REQUEST-ID".to_owned();
            h.contains(&name)
        };
        assert!(present);
    }
}
