//! Per-request context: request, response accumulator, session and CSRF state.
//!
//! A [`Context`] is created for every dispatched request and handed to the
//! controller hooks and the action. It owns everything request-scoped; the
//! application-wide collaborators are reached through a shared, read-only
//! [`AppState`].

mod writer;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::BoxFuture;
use crate::DispatchError;
use crate::config::Config;
use crate::discovery::{ControllerDescriptor, RouteDescriptor};
use crate::host::AppState;
use crate::http::{Method, Request};
use crate::router::PathParams;
use crate::security::csrf;
use crate::session::Session;
use crate::view::view_file;

pub use writer::ResponseWriter;

const CSRF_FAILURE: &str = "Unable to verify your data submission.";
const XML_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Where a request is in its dispatch lifecycle. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Created,
    Initialized,
    BeforeAction,
    ActionInvoked,
    ResponseFinalized,
}

/// Everything one request's controller can see.
pub struct Context {
    request: Request,
    params: PathParams,
    form: HashMap<String, String>,
    response: ResponseWriter,
    session: Option<Session>,
    csrf_token: String,
    true_csrf_token: String,
    stage: Stage,
    route: Arc<RouteDescriptor>,
    state: Arc<AppState>,
}

impl Context {
    pub(crate) fn new(
        request: Request,
        params: PathParams,
        route: Arc<RouteDescriptor>,
        state: Arc<AppState>,
    ) -> Self {
        let form = request.form();
        Self {
            request,
            params,
            form,
            response: ResponseWriter::new(),
            session: None,
            csrf_token: String::new(),
            true_csrf_token: String::new(),
            stage: Stage::Created,
            route,
            state,
        }
    }

    pub(crate) fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "lifecycle moved from {:?} to {next:?}", self.stage);
        if next > self.stage {
            self.stage = next;
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Load the session and set up CSRF state. A failure here commits an error
    /// response; the lifecycle still runs to finalization.
    pub(crate) async fn initialize(&mut self) {
        self.advance(Stage::Initialized);
        let state = Arc::clone(&self.state);
        let config = state.config();

        if config.session.enable {
            if let Some(store) = state.sessions() {
                match store.load(&self.request, &config.session.name).await {
                    Ok(session) => self.session = Some(session),
                    Err(err) => {
                        tracing::error!(error = %err, "failed to load session");
                        self.response.internal_server_error(&err.to_string());
                    }
                }
            }
        }

        if config.csrf.enable {
            self.prepare_csrf(config);
            if !self.validate_csrf_token() {
                tracing::warn!(
                    method = %self.request.method(),
                    path = %self.request.path(),
                    "CSRF token validation failed"
                );
                self.response.bad_request(CSRF_FAILURE);
            }
        }
    }

    fn prepare_csrf(&mut self, config: &Config) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mask_length = config.csrf.mask_length;
        let key = &config.csrf.session_param;

        let true_token = match session.get(key) {
            Some(token) => token.to_owned(),
            None => {
                let token = csrf::generate_true_token(mask_length);
                session.insert(key.clone(), token.clone());
                token
            }
        };
        self.csrf_token = csrf::generate_token(mask_length, true_token.as_bytes());
        self.true_csrf_token = true_token;
    }

    /// `true` when the request may proceed: a safe method, or a valid token in the
    /// configured header or form field.
    pub fn validate_csrf_token(&self) -> bool {
        if self.request.method().is_csrf_exempt() {
            return true;
        }
        if self.true_csrf_token.is_empty() {
            return false;
        }

        let csrf_config = &self.state.config().csrf;
        let mask_length = csrf_config.mask_length;
        let presented = [
            self.form_value(&csrf_config.form_param),
            self.request.headers().get(&csrf_config.header_param),
        ];
        presented
            .into_iter()
            .flatten()
            .any(|token| csrf::validate_token(mask_length, token, &self.true_csrf_token))
    }

    /// Save the session through the store. A failure commits a `500`.
    pub(crate) async fn save_session(&mut self) {
        let state = Arc::clone(&self.state);
        let (Some(store), Some(session)) = (state.sessions(), self.session.as_ref()) else {
            return;
        };
        if let Err(err) = store.save(session, &mut self.response).await {
            tracing::error!(error = %err, "failed to save session");
            self.response
                .internal_server_error(&format!("Error saving session: {err}"));
        }
    }

    pub(crate) fn into_response(self) -> crate::Response {
        self.response.into_response()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// The masked token to embed in forms. Empty when CSRF protection is off.
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn route(&self) -> &RouteDescriptor {
        &self.route
    }

    pub fn controller(&self) -> &ControllerDescriptor {
        &self.route.controller
    }

    /// The stripped action name, e.g. `CommentAdd`.
    pub fn action_name(&self) -> &str {
        &self.route.action_name
    }

    pub fn config(&self) -> &Config {
        self.state.config()
    }

    /// A field of an `application/x-www-form-urlencoded` body.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    pub fn form(&self) -> &HashMap<String, String> {
        &self.form
    }

    pub fn is_get(&self) -> bool {
        *self.request.method() == Method::Get
    }

    pub fn is_post(&self) -> bool {
        *self.request.method() == Method::Post
    }

    pub fn is_put(&self) -> bool {
        *self.request.method() == Method::Put
    }

    pub fn is_head(&self) -> bool {
        *self.request.method() == Method::Head
    }

    pub fn is_delete(&self) -> bool {
        *self.request.method() == Method::Delete
    }

    pub fn is_patch(&self) -> bool {
        *self.request.method() == Method::Patch
    }

    pub fn is_options(&self) -> bool {
        *self.request.method() == Method::Options
    }

    /// `X-Requested-With: XMLHttpRequest`.
    pub fn is_ajax(&self) -> bool {
        self.request.headers().get("x-requested-with") == Some("XMLHttpRequest")
    }

    /// Render the action's default view, in the controller's layout if it has one.
    pub fn render<T: Serialize + ?Sized>(&mut self, data: &T) -> BoxFuture<'_, Result<(), DispatchError>> {
        self.render_view(None, data, true)
    }

    /// Render `<name><suffix>` from the controller's view directory.
    pub fn render_file<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        data: &T,
    ) -> BoxFuture<'_, Result<(), DispatchError>> {
        self.render_view(Some(name), data, true)
    }

    /// Like [`render`](Self::render), without the layout.
    pub fn render_partial<T: Serialize + ?Sized>(&mut self, data: &T) -> BoxFuture<'_, Result<(), DispatchError>> {
        self.render_view(None, data, false)
    }

    pub fn render_partial_file<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        data: &T,
    ) -> BoxFuture<'_, Result<(), DispatchError>> {
        self.render_view(Some(name), data, false)
    }

    fn render_view<T: Serialize + ?Sized>(
        &mut self,
        name: Option<&str>,
        data: &T,
        with_layout: bool,
    ) -> BoxFuture<'_, Result<(), DispatchError>> {
        let value = serde_json::to_value(data);
        let state = Arc::clone(&self.state);
        let config = state.config();
        let controller = &self.route.controller;
        let view = view_file(
            &controller.view_directory,
            name,
            &self.route.action_name,
            &config.view.suffix,
        );
        let layout = with_layout
            .then(|| controller.layout_file(&config.view.layout_dir))
            .flatten();

        Box::pin(async move {
            let value = value?;
            let renderer = state.renderer();
            let body = match layout {
                Some(layout) => renderer.render_in_layout(&view, &layout, &value).await?,
                None => renderer.render(&view, &value).await?,
            };
            self.response.set_html_header();
            self.response.set_body(body);
            Ok(())
        })
    }

    /// Serialize `value` as the JSON body.
    pub fn render_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DispatchError> {
        let body = serde_json::to_string(value)?;
        self.response.set_json_header();
        self.response.set_body(body);
        Ok(())
    }

    /// `callback(<json>)` as a JavaScript body.
    pub fn render_jsonp<T: Serialize + ?Sized>(&mut self, value: &T, callback: &str) -> Result<(), DispatchError> {
        let json = serde_json::to_string(value)?;
        self.response.set_jsonp_header();
        self.response.set_body(format!("{callback}({json})"));
        Ok(())
    }

    pub fn render_text(&mut self, text: impl Into<String>) {
        self.response.set_html_header();
        self.response.set_body(text.into());
    }

    /// An XML document body. The standard prolog is prepended when missing.
    pub fn render_xml(&mut self, xml: impl Into<String>) {
        let mut xml = xml.into();
        if !xml.trim_start().starts_with("<?xml") {
            xml.insert_str(0, XML_PROLOG);
        }
        self.response.set_xml_header();
        self.response.set_body(xml);
    }

    /// `302 Found` to `url`; commits the response.
    pub fn redirect(&mut self, url: &str) {
        self.response.redirect(url);
    }
}
