//! Sessions: a string bag keyed by an id carried in a cookie.
//!
//! The dispatcher loads a [`Session`] from the configured [`SessionStore`] before
//! the action runs and saves it back after `before_response`. Storage is pluggable;
//! [`MemoryStore`] is used when sessions are enabled and no store is supplied.

mod memory;

use std::collections::HashMap;

use thiserror::Error;

use crate::BoxFuture;
use crate::Request;
use crate::context::ResponseWriter;

pub use memory::MemoryStore;

/// Session storage failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session {id:?} could not be decoded: {reason}")]
    Corrupt { id: String, reason: String },
}

/// One client's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    name: String,
    id: String,
    is_new: bool,
    /// Mutable key-value bag.
    pub values: HashMap<String, String>,
}

impl Session {
    /// A fresh, empty session that no client has been told about yet.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            is_new: true,
            values: HashMap::new(),
        }
    }

    /// A session restored from storage.
    pub fn restored(name: impl Into<String>, id: impl Into<String>, values: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            is_new: false,
            values,
        }
    }

    /// Cookie name the session travels under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

/// Pluggable session backend.
///
/// Implementations must be safe to share across every in-flight request.
pub trait SessionStore: Send + Sync {
    /// Load the session named `name` for `request`, creating a new one when the
    /// request carries no valid id.
    fn load<'a>(&'a self, request: &'a Request, name: &'a str) -> BoxFuture<'a, Result<Session, SessionError>>;

    /// Persist `session` and attach whatever the client needs (usually a cookie)
    /// to `response`.
    fn save<'a>(
        &'a self,
        session: &'a Session,
        response: &'a mut ResponseWriter,
    ) -> BoxFuture<'a, Result<(), SessionError>>;
}
