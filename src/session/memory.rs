//! Process-local session storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};

use super::{Session, SessionError, SessionStore};
use crate::BoxFuture;
use crate::Request;
use crate::context::ResponseWriter;

const SESSION_ID_LENGTH: usize = 32;

/// Every this many saves, expired entries are swept from the map.
const SWEEP_INTERVAL: usize = 64;

struct Entry {
    values: HashMap<String, String>,
    expires_at: Instant,
}

/// Sessions kept in a concurrent map, lost on restart.
///
/// Entries expire `max_age` after their last save. Expired entries are dropped
/// when their id is next presented, and by a sweep every [`SWEEP_INTERVAL`] saves.
pub struct MemoryStore {
    sessions: DashMap<String, Entry>,
    max_age: Duration,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new(max_age: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_age,
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of stored sessions, expired ones included until they are next looked up.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn fresh_id() -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Remove every expired entry.
    pub fn sweep(&self) {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::debug!(removed, "swept expired sessions");
        }
    }

    fn lookup(&self, id: &str) -> Option<HashMap<String, String>> {
        match self.sessions.get(id) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.values.clone()),
            Some(_) => {}
            None => return None,
        }
        tracing::debug!(session = id, "dropping expired session");
        self.sessions.remove(id);
        None
    }
}

impl SessionStore for MemoryStore {
    fn load<'a>(&'a self, request: &'a Request, name: &'a str) -> BoxFuture<'a, Result<Session, SessionError>> {
        Box::pin(async move {
            let restored = request
                .cookie(name)
                .and_then(|id| self.lookup(id).map(|values| (id.to_owned(), values)));

            Ok(match restored {
                Some((id, values)) => Session::restored(name, id, values),
                None => Session::new(name, Self::fresh_id()),
            })
        })
    }

    fn save<'a>(
        &'a self,
        session: &'a Session,
        response: &'a mut ResponseWriter,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            if self.saves.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == 0 {
                self.sweep();
            }
            self.sessions.insert(
                session.id().to_owned(),
                Entry {
                    values: session.values.clone(),
                    expires_at: Instant::now() + self.max_age,
                },
            );
            response.set_cookie(format!(
                "{}={}; Path=/; Max-Age={}; HttpOnly",
                session.name(),
                session.id(),
                self.max_age.as_secs()
            ));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_cookie(cookie: Option<&str>) -> Request {
        let raw = match cookie {
            Some(c) => format!("GET / HTTP/1.1\r\nHost: localhost\r\nCookie: {c}\r\n\r\n"),
            None => "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n".to_owned(),
        };
        Request::parse(raw.as_bytes()).unwrap().0
    }

    #[tokio::test]
    async fn new_session_without_cookie() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let session = store.load(&request_with_cookie(None), "SID").await.unwrap();
        assert!(session.is_new());
        assert_eq!(session.id().len(), SESSION_ID_LENGTH);
        assert_eq!(session.name(), "SID");
    }

    #[tokio::test]
    async fn saved_values_come_back() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let mut session = store.load(&request_with_cookie(None), "SID").await.unwrap();
        session.insert("user", "ada");

        let mut writer = ResponseWriter::new();
        store.save(&session, &mut writer).await.unwrap();
        let response = writer.into_response();
        let cookie = response.headers().get("set-cookie").unwrap();
        assert!(cookie.starts_with(&format!("SID={}; Path=/; Max-Age=60", session.id())));
        assert!(cookie.ends_with("HttpOnly"));

        let cookie_header = format!("SID={}", session.id());
        let restored = store
            .load(&request_with_cookie(Some(&cookie_header)), "SID")
            .await
            .unwrap();
        assert!(!restored.is_new());
        assert_eq!(restored.get("user"), Some("ada"));
    }

    #[tokio::test]
    async fn unknown_or_expired_ids_start_over() {
        let store = MemoryStore::new(Duration::ZERO);
        let session = Session::new("SID", "abc");
        let mut writer = ResponseWriter::new();
        store.save(&session, &mut writer).await.unwrap();
        assert_eq!(store.len(), 1);

        let loaded = store
            .load(&request_with_cookie(Some("SID=abc")), "SID")
            .await
            .unwrap();
        assert!(loaded.is_new());
        assert_ne!(loaded.id(), "abc");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn abandoned_sessions_are_swept() {
        let store = MemoryStore::new(Duration::ZERO);
        for _ in 0..1000 {
            let session = store.load(&request_with_cookie(None), "SID").await.unwrap();
            let mut writer = ResponseWriter::new();
            store.save(&session, &mut writer).await.unwrap();
        }
        assert!(store.len() <= SWEEP_INTERVAL, "{} sessions kept", store.len());

        store.sweep();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn sweep_keeps_live_sessions() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let session = Session::new("SID", "live");
        let mut writer = ResponseWriter::new();
        store.save(&session, &mut writer).await.unwrap();
        store.sweep();
        assert_eq!(store.len(), 1);
    }
}
