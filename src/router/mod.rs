//! Request routing: the per-host table mapping `(method, pattern)` to handlers.
//!
//! A [`Router`] resolves a request in three tiers: exact patterns through a hash
//! lookup, then parameterized patterns, then wildcards, each in registration order.
//! Registering the same method and pattern twice replaces the earlier handler.
//!
//! When nothing matches, the router consults its [`RouterOptions`]:
//!
//! - **trailing-slash redirect**: `/post/` → `/post` (or the reverse) when only the
//!   other spelling is registered;
//! - **fixed-path redirect**: `//POST/./Index` → `/post/index` via [`clean_path`] and a
//!   case-insensitive lookup;
//! - **method not allowed**: a `405` with an `Allow` header when the path exists for
//!   other verbs;
//! - **automatic OPTIONS**: `200` with an `Allow` header when no explicit `OPTIONS`
//!   handler exists.
//!
//! Remaining misses become `404`. Both `404` and `405` are rendered by the
//! configured [`ErrorHandler`].

mod path;
mod pattern;
mod pretty;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::BoxFuture;
use crate::config::{Mode, RouterConfig};
use crate::dispatch::{ErrorHandler, ErrorReport};
use crate::{Method, Request, Response, StatusCode};

pub use path::clean_path;
pub(crate) use pattern::Pattern;
pub use pretty::pretty_path;

/// Type-erased, heap-allocated async handler taking the request and the captured
/// path parameters.
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so a table can be shared across
/// connection tasks without copying closures.
pub type Handler = Arc<dyn Fn(Request, PathParams) -> BoxFuture<'static, Response> + Send + Sync>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Request, PathParams) -> impl Future<Output = Response> + Send` that is
/// also `Send + Sync + 'static` implements this trait through the blanket impl.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler, boxing the returned future.
    fn call(&self, request: Request, params: PathParams) -> BoxFuture<'static, Response>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Request, PathParams) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request, params: PathParams) -> BoxFuture<'static, Response> {
        Box::pin((self)(request, params))
    }
}

/// Erase a concrete handler into a [`Handler`].
pub fn handler(h: impl IntoHandler) -> Handler {
    Arc::new(move |request, params| h.call(request, params))
}

/// Path parameters captured by a route match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: String, value: String) {
        self.entries.push((name, value));
    }

    /// Value of the named capture (`a` for `:a`).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the capture at `index`, counting from zero.
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(_, v)| v.as_str())
    }

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

/// Behaviour flags applied when a request has no direct match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    pub redirect_trailing_slash: bool,
    pub redirect_fixed_path: bool,
    pub handle_method_not_allowed: bool,
    pub handle_options: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self::from(&RouterConfig::default())
    }
}

impl From<&RouterConfig> for RouterOptions {
    fn from(config: &RouterConfig) -> Self {
        Self {
            redirect_trailing_slash: config.redirect_trailing_slash,
            redirect_fixed_path: config.redirect_fixed_path,
            handle_method_not_allowed: config.handle_method_not_allowed,
            handle_options: config.handle_options,
        }
    }
}

// One pattern and the handlers bound to it, per verb.
struct Slot {
    raw: String,
    pattern: Pattern,
    handlers: BTreeMap<Method, Handler>,
}

/// Outcome of resolving a method and path against the table.
pub enum Lookup {
    Found(Handler, PathParams),
    /// The path exists, but not for this verb.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Routing table for one host.
///
/// # Examples
///
/// ```rust
/// use rttp_mvc::router::{handler, Router};
/// use rttp_mvc::{Method, Response, StatusCode};
///
/// let mut router = Router::default();
/// router.handle(Method::Get, "/ping", handler(|_req, _params| async {
///     Response::new(StatusCode::Ok).body("pong")
/// }));
/// assert_eq!(router.len(), 1);
/// assert_eq!(router.allowed_methods("/ping"), vec![Method::Get]);
/// ```
pub struct Router {
    exact: HashMap<String, usize>,
    slots: Vec<Slot>,
    options: RouterOptions,
    errors: Arc<dyn ErrorHandler>,
    mode: Mode,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(
            RouterOptions::default(),
            Arc::new(crate::dispatch::HtmlErrorHandler),
            Mode::Production,
        )
    }
}

impl Router {
    /// Create an empty table.
    pub fn new(options: RouterOptions, errors: Arc<dyn ErrorHandler>, mode: Mode) -> Self {
        Self {
            exact: HashMap::new(),
            slots: Vec::new(),
            options,
            errors,
            mode,
        }
    }

    pub fn options(&self) -> RouterOptions {
        self.options
    }

    /// Bind `handler` to `method` on `pattern`, replacing any previous binding.
    pub fn handle(&mut self, method: Method, pattern: &str, handler: Handler) {
        let index = match self.slots.iter().position(|s| s.raw == pattern) {
            Some(index) => index,
            None => {
                let compiled = Pattern::parse(pattern);
                if compiled.is_exact() {
                    self.exact.insert(pattern.to_owned(), self.slots.len());
                }
                self.slots.push(Slot {
                    raw: pattern.to_owned(),
                    pattern: compiled,
                    handlers: BTreeMap::new(),
                });
                self.slots.len() - 1
            }
        };
        self.slots[index].handlers.insert(method, handler);
    }

    /// Register a `GET` handler.
    pub fn get(&mut self, pattern: &str, h: impl IntoHandler) {
        self.handle(Method::Get, pattern, handler(h));
    }

    /// Register a `POST` handler.
    pub fn post(&mut self, pattern: &str, h: impl IntoHandler) {
        self.handle(Method::Post, pattern, handler(h));
    }

    /// The handler bound to exactly this method and pattern string, if any.
    pub fn handler_for(&self, method: &Method, pattern: &str) -> Option<Handler> {
        self.slots
            .iter()
            .find(|s| s.raw == pattern)
            .and_then(|s| s.handlers.get(method))
            .cloned()
    }

    /// Number of `(method, pattern)` bindings.
    pub fn len(&self) -> usize {
        self.slots.iter().map(|s| s.handlers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Exact slot first, then the remaining patterns by kind, in registration order.
    fn candidates<'a>(&'a self, path: &'a str) -> impl Iterator<Item = (&'a Slot, PathParams)> + 'a {
        let exact = self
            .exact
            .get(path)
            .map(|&i| (&self.slots[i], PathParams::new()));
        let parameterized = self
            .slots
            .iter()
            .filter(|s| matches!(s.pattern, Pattern::Parameterized(_)))
            .filter_map(move |s| s.pattern.matches(path).map(|p| (s, p)));
        let wildcard = self
            .slots
            .iter()
            .filter(|s| matches!(s.pattern, Pattern::Wildcard { .. }))
            .filter_map(move |s| s.pattern.matches(path).map(|p| (s, p)));
        exact.into_iter().chain(parameterized).chain(wildcard)
    }

    /// Every verb some pattern matching `path` accepts, sorted.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let allowed: BTreeSet<Method> = self
            .candidates(path)
            .flat_map(|(slot, _)| slot.handlers.keys().cloned())
            .collect();
        allowed.into_iter().collect()
    }

    /// Resolve a method and path without invoking anything.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup {
        let mut allowed = BTreeSet::new();
        for (slot, params) in self.candidates(path) {
            if let Some(h) = slot.handlers.get(method) {
                return Lookup::Found(Arc::clone(h), params);
            }
            allowed.extend(slot.handlers.keys().cloned());
        }
        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed.into_iter().collect())
        }
    }

    fn path_exists_for(&self, method: &Method, path: &str) -> bool {
        matches!(self.lookup(method, path), Lookup::Found(..))
    }

    // Case-insensitive search over every pattern that serves `method`.
    fn find_ignore_case(&self, method: &Method, path: &str) -> Option<String> {
        self.slots
            .iter()
            .filter(|s| s.handlers.contains_key(method))
            .find_map(|s| s.pattern.matches_ignore_case(path))
    }

    fn redirect_target(&self, method: &Method, path: &str) -> Option<String> {
        if path == "/" {
            return None;
        }

        if self.options.redirect_trailing_slash {
            let alternative = match path.strip_suffix('/') {
                Some(stripped) => stripped.to_owned(),
                None => format!("{path}/"),
            };
            if !alternative.is_empty() && self.path_exists_for(method, &alternative) {
                return Some(alternative);
            }
        }

        if self.options.redirect_fixed_path {
            let cleaned = clean_path(path);
            if let Some(found) = self.find_ignore_case(method, &cleaned) {
                return Some(found);
            }
            if self.options.redirect_trailing_slash {
                let flipped = match cleaned.strip_suffix('/') {
                    Some(stripped) if !stripped.is_empty() => stripped.to_owned(),
                    Some(_) => return None,
                    None => format!("{cleaned}/"),
                };
                return self.find_ignore_case(method, &flipped);
            }
        }

        None
    }

    fn render_error(&self, request: &Request, status: StatusCode) -> Response {
        let report = ErrorReport::status(status, self.mode);
        self.errors.handle(request, &report)
    }

    /// Dispatch `request` to the matching handler and return its response.
    pub async fn route(&self, request: Request) -> Response {
        let method = request.method().clone();
        let path = request.path().to_owned();

        let allowed = match self.lookup(&method, &path) {
            Lookup::Found(handler, params) => return handler(request, params).await,
            Lookup::MethodNotAllowed(allowed) => allowed,
            Lookup::NotFound => Vec::new(),
        };

        if method == Method::Options && self.options.handle_options && !allowed.is_empty() {
            return Response::new(StatusCode::Ok).header("Allow", allow_header(&allowed, true));
        }

        if method != Method::Connect {
            if let Some(target) = self.redirect_target(&method, &path) {
                let status = if method == Method::Get {
                    StatusCode::MovedPermanently
                } else {
                    StatusCode::PermanentRedirect
                };
                let location = match request.query_string() {
                    Some(q) => format!("{target}?{q}"),
                    None => target,
                };
                tracing::debug!(from = %path, to = %location, "redirecting to canonical path");
                return Response::new(status).header("Location", location);
            }
        }

        if !allowed.is_empty() && self.options.handle_method_not_allowed {
            let mut response = self.render_error(&request, StatusCode::MethodNotAllowed);
            response.set_header("Allow", allow_header(&allowed, self.options.handle_options));
            return response;
        }

        self.render_error(&request, StatusCode::NotFound)
    }
}

fn allow_header(methods: &[Method], with_options: bool) -> String {
    let mut names: BTreeSet<&str> = methods.iter().map(Method::as_str).collect();
    if with_options {
        names.insert("OPTIONS");
    }
    names.into_iter().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(method: &str, path: &str) -> Request {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    fn ok(status: StatusCode) -> Handler {
        handler(move |_req, _params| async move { Response::new(status) })
    }

    fn echo_params() -> Handler {
        handler(|_req, params: PathParams| async move {
            let joined: Vec<_> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            Response::new(StatusCode::Ok).body(joined.join("&"))
        })
    }

    #[test]
    fn router_starts_empty() {
        let router = Router::default();
        assert!(router.is_empty());
    }

    #[test]
    fn rebinding_replaces_handler() {
        let mut router = Router::default();
        router.handle(Method::Get, "/a", ok(StatusCode::Ok));
        router.handle(Method::Get, "/a", ok(StatusCode::Accepted));
        router.handle(Method::Post, "/a", ok(StatusCode::Created));
        assert_eq!(router.len(), 2);
    }

    #[tokio::test]
    async fn empty_router_returns_404() {
        let router = Router::default();
        let res = router.route(make_request("GET", "/")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn later_binding_wins() {
        let mut router = Router::default();
        router.handle(Method::Get, "/path", ok(StatusCode::Ok));
        router.handle(Method::Get, "/path", ok(StatusCode::Accepted));
        let res = router.route(make_request("GET", "/path")).await;
        assert_eq!(res.status(), StatusCode::Accepted);
    }

    #[tokio::test]
    async fn wrong_verb_is_405_with_allow() {
        let mut router = Router::default();
        router.handle(Method::Get, "/post/index", ok(StatusCode::Ok));
        let res = router.route(make_request("POST", "/post/index")).await;
        assert_eq!(res.status(), StatusCode::MethodNotAllowed);
        assert_eq!(res.headers().get("allow"), Some("GET, OPTIONS"));
    }

    #[tokio::test]
    async fn wrong_verb_is_404_when_405_disabled() {
        let options = RouterOptions {
            handle_method_not_allowed: false,
            ..RouterOptions::default()
        };
        let mut router = Router::new(options, Arc::new(crate::dispatch::HtmlErrorHandler), Mode::Production);
        router.handle(Method::Get, "/only-get", ok(StatusCode::Ok));
        let res = router.route(make_request("DELETE", "/only-get")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn exact_beats_parameterized() {
        let mut router = Router::default();
        router.handle(Method::Get, "/post/:a", echo_params());
        router.handle(Method::Get, "/post/index", ok(StatusCode::Accepted));
        let res = router.route(make_request("GET", "/post/index")).await;
        assert_eq!(res.status(), StatusCode::Accepted);
        let res = router.route(make_request("GET", "/post/42")).await;
        assert_eq!(res.body_text(), "a=42");
    }

    #[tokio::test]
    async fn trailing_slash_redirects() {
        let mut router = Router::default();
        router.handle(Method::Get, "/post", ok(StatusCode::Ok));
        router.handle(Method::Post, "/post", ok(StatusCode::Ok));

        let res = router.route(make_request("GET", "/post/")).await;
        assert_eq!(res.status(), StatusCode::MovedPermanently);
        assert_eq!(res.headers().get("location"), Some("/post"));

        let res = router.route(make_request("POST", "/post/")).await;
        assert_eq!(res.status(), StatusCode::PermanentRedirect);
    }

    #[tokio::test]
    async fn fixed_path_redirect_keeps_query() {
        let mut router = Router::default();
        router.handle(Method::Get, "/post/comment-add/:a", ok(StatusCode::Ok));
        let res = router
            .route(make_request("GET", "//Post/./Comment-Add/Hi?x=1"))
            .await;
        assert_eq!(res.status(), StatusCode::MovedPermanently);
        assert_eq!(res.headers().get("location"), Some("/post/comment-add/Hi?x=1"));
    }

    #[tokio::test]
    async fn redirects_can_be_disabled() {
        let options = RouterOptions {
            redirect_trailing_slash: false,
            redirect_fixed_path: false,
            ..RouterOptions::default()
        };
        let mut router = Router::new(options, Arc::new(crate::dispatch::HtmlErrorHandler), Mode::Production);
        router.handle(Method::Get, "/post", ok(StatusCode::Ok));
        let res = router.route(make_request("GET", "/post/")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
        let res = router.route(make_request("GET", "/POST")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn automatic_options() {
        let mut router = Router::default();
        router.handle(Method::Get, "/post/index", ok(StatusCode::Ok));
        router.handle(Method::Post, "/post/index", ok(StatusCode::Ok));
        let res = router.route(make_request("OPTIONS", "/post/index")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.headers().get("allow"), Some("GET, OPTIONS, POST"));
    }

    #[tokio::test]
    async fn explicit_options_handler_wins() {
        let mut router = Router::default();
        router.handle(Method::Get, "/r", ok(StatusCode::Ok));
        router.handle(Method::Options, "/r", ok(StatusCode::NoContent));
        let res = router.route(make_request("OPTIONS", "/r")).await;
        assert_eq!(res.status(), StatusCode::NoContent);
    }

    #[tokio::test]
    async fn wildcard_route_captures_rest() {
        let mut router = Router::default();
        router.handle(Method::Get, "/static/*filepath", echo_params());
        let res = router.route(make_request("GET", "/static/css/site.css")).await;
        assert_eq!(res.body_text(), "filepath=/css/site.css");
    }

    #[test]
    fn lookup_reports_allowed_methods() {
        let mut router = Router::default();
        router.handle(Method::Put, "/r/:a", ok(StatusCode::Ok));
        router.handle(Method::Get, "/r/:a", ok(StatusCode::Ok));
        match router.lookup(&Method::Delete, "/r/1") {
            Lookup::MethodNotAllowed(allowed) => assert_eq!(allowed, vec![Method::Get, Method::Put]),
            _ => panic!("expected MethodNotAllowed"),
        }
        assert!(matches!(router.lookup(&Method::Get, "/nope"), Lookup::NotFound));
    }
}
