//! # rttp-mvc
//!
//! Convention-driven controller dispatch on top of the rttp async HTTP/1.1 server.
//!
//! Controllers declare their actions in a table. Registering a controller on a
//! [`Host`](host::Host) derives its routes from the naming conventions. For example,
//! `PostController::ActionCommentAdd(String)` under `/post` answers on
//! `/post/comment-add` and `/post/comment-add/:a`. Every request then runs
//! through a fixed lifecycle: fresh controller, session and CSRF check,
//! `before_action` gate, action, `before_response`, session save, send.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rttp_mvc::prelude::*;
//!
//! #[derive(Default)]
//! struct SiteController;
//!
//! fn index<'a>(_c: &'a mut SiteController, ctx: &'a mut Context) -> ActionFuture<'a> {
//!     Box::pin(async move {
//!         ctx.render_text("Hello from rttp-mvc.");
//!         Ok(())
//!     })
//! }
//!
//! impl Controller for SiteController {
//!     const NAME: &'static str = "SiteController";
//!
//!     fn actions() -> Vec<Action<Self>> {
//!         vec![Action::new("ActionIndex", index)]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = Application::builder().config(Config::default()).build()?;
//!     app.host("localhost").register_controller::<SiteController>("/site")?;
//!
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     server.serve(app.into_registry()?).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod config;
pub mod context;
pub mod controller;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod http;
pub mod router;
pub mod security;
pub mod server;
pub mod session;
pub mod view;

/// A boxed, `Send` future borrowed for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::{Config, Mode};
pub use error::{BootstrapError, DispatchError, RegistrationError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};

/// Everything a controller module usually needs.
pub mod prelude {
    pub use crate::BoxFuture;
    pub use crate::config::{Config, Mode};
    pub use crate::context::Context;
    pub use crate::controller::{Action, ActionFuture, Controller, Layout, MethodFilter};
    pub use crate::error::DispatchError;
    pub use crate::host::{Application, Host, HostRegistry};
    pub use crate::http::{Method, Request, Response, StatusCode};
    pub use crate::server::Server;
}
