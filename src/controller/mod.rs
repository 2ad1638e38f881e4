//! Controllers: the per-request unit of application code.
//!
//! A controller is a plain `Default` type listing its actions in a table. Nothing
//! is discovered at runtime: [`Controller::actions`] names each raw action
//! identifier and the function it runs, and the parameter types come from that
//! function's signature.
//!
//! ```rust
//! use rttp_mvc::prelude::*;
//!
//! #[derive(Default)]
//! struct PostController {
//!     visits: u32,
//! }
//!
//! fn index<'a>(c: &'a mut PostController, ctx: &'a mut Context) -> ActionFuture<'a> {
//!     Box::pin(async move {
//!         c.visits += 1;
//!         ctx.render_text("all posts");
//!         Ok(())
//!     })
//! }
//!
//! fn comment_add<'a>(
//!     _c: &'a mut PostController,
//!     ctx: &'a mut Context,
//!     title: String,
//! ) -> ActionFuture<'a> {
//!     Box::pin(async move {
//!         ctx.render_text(format!("comment on {title}"));
//!         Ok(())
//!     })
//! }
//!
//! impl Controller for PostController {
//!     const NAME: &'static str = "PostController";
//!
//!     fn actions() -> Vec<Action<Self>> {
//!         vec![
//!             Action::new("ActionIndex", index),
//!             Action::new("ActionCommentAdd", comment_add),
//!         ]
//!     }
//!
//!     fn method_filter() -> MethodFilter {
//!         MethodFilter::new().allow("CommentAdd", [Method::Post])
//!     }
//! }
//! ```

mod action;
mod param;

use std::collections::HashMap;

use crate::BoxFuture;
use crate::Method;
use crate::context::Context;

pub use action::{Action, ActionFuture, IntoAction};
pub use param::{ParamKind, RouteParam};

/// Application code dispatched by the framework.
///
/// A fresh value is created with [`Default`] for every request, so fields are
/// request-scoped state.
pub trait Controller: Default + Send + 'static {
    /// The raw type name, including any configured prefix or suffix.
    const NAME: &'static str;

    /// The action table.
    fn actions() -> Vec<Action<Self>>;

    /// Per-action verb restrictions, keyed by stripped action name.
    fn method_filter() -> MethodFilter {
        MethodFilter::default()
    }

    fn layout() -> Layout {
        Layout::Inherit
    }

    /// Runs before the action. Returning `false` skips the action; the response
    /// is still finalized.
    fn before_action<'a>(&'a mut self, _ctx: &'a mut Context) -> BoxFuture<'a, bool> {
        Box::pin(async { true })
    }

    /// Runs after the action (or after the skip) and before the session is saved.
    fn before_response<'a>(&'a mut self, _ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}

/// Which layout a controller renders full views in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Layout {
    /// Use the application's configured layout.
    #[default]
    Inherit,
    /// Render views without a layout.
    None,
    /// Use this layout file.
    Named(String),
}

impl Layout {
    /// Resolve against the configured global layout. An empty name disables it.
    pub fn resolve(&self, global: &str) -> Option<String> {
        let name = match self {
            Layout::Inherit => global,
            Layout::None => return None,
            Layout::Named(name) => name.as_str(),
        };
        (!name.is_empty()).then(|| name.to_owned())
    }
}

/// Verbs allowed per action. Actions without an entry accept `GET` and `POST`.
#[derive(Debug, Clone, Default)]
pub struct MethodFilter {
    rules: HashMap<String, Vec<Method>>,
}

impl MethodFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the stripped action `action` to `methods`.
    #[must_use]
    pub fn allow(mut self, action: impl Into<String>, methods: impl IntoIterator<Item = Method>) -> Self {
        self.rules.insert(action.into(), methods.into_iter().collect());
        self
    }

    pub fn methods_for(&self, action: &str) -> Vec<Method> {
        match self.rules.get(action) {
            Some(methods) => methods.clone(),
            None => vec![Method::Get, Method::Post],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
