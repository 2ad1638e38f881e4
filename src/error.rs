//! Crate-level error types.
//!
//! Startup problems ([`RegistrationError`], [`BootstrapError`]) are returned from the
//! registration calls and stop the process before it serves anything.
//! [`DispatchError`] is request-scoped: it becomes that request's `500` response.

use thiserror::Error;

use crate::config::ConfigError;
use crate::controller::ParamKind;
use crate::session::SessionError;
use crate::view::RenderError;

/// A controller or host could not be registered.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("the first character of route {route:?} must be '/'")]
    RouteMissingSlash { route: String },

    #[error("route {route:?} must be longer than one character")]
    RouteTooShort { route: String },

    #[error(
        "controller {name:?} is invalid: its prefix and suffix must be {prefix:?} and {suffix:?}"
    )]
    ControllerName {
        name: String,
        prefix: String,
        suffix: String,
    },

    #[error("static route prefix {prefix:?} is invalid")]
    StaticPrefix { prefix: String },

    #[error("no host has been registered")]
    NoHosts,

    #[error("{count} hosts are registered, the default host must be set")]
    MissingDefaultHost { count: usize },

    #[error("default host {domain:?} was never registered")]
    UnknownDefaultHost { domain: String },
}

/// Failure while assembling an application.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),
}

/// A failure raised while a single request is being dispatched.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("path parameter #{position} ({value:?}) is not a valid {kind}")]
    InvalidParam {
        position: usize,
        value: String,
        kind: ParamKind,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl DispatchError {
    /// Builds an ad-hoc error from any displayable message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}
