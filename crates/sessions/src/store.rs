//! In-memory session store (spec.md §4.3, C4).

use chrono::{DateTime, Utc};
use cueso_domain::config::SessionConfig;
use cueso_domain::error::{Error, Result};
use cueso_domain::tool::Message;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A single conversation's state (spec.md §3 `Session`).
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub config: SessionConfig,
    pub messages: Vec<Message>,
    pub iteration_count: u32,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn new(id: String, config: SessionConfig) -> Self {
        Self {
            id,
            config,
            messages: Vec::new(),
            iteration_count: 0,
            last_activity: Utc::now(),
        }
    }
}

struct Entry {
    session: Session,
    /// Per-session mutual exclusion for `with_lock` (spec.md: "at most one
    /// driver advances a session at a time"). Separate from the `RwLock`
    /// guarding the map so a long-held turn doesn't block other sessions.
    lock: Arc<Mutex<()>>,
}

/// Maps session ids to session state plus a per-session exclusion lock.
/// Tolerates concurrent access from many bridge instances (spec.md §4.3).
pub struct SessionStore {
    entries: RwLock<HashMap<String, Entry>>,
    idle_eviction_minutes: Option<u64>,
}

impl SessionStore {
    pub fn new(idle_eviction_minutes: Option<u64>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            idle_eviction_minutes,
        }
    }

    /// Returns an existing session by id, or creates a fresh one. A missing
    /// `id` always creates. An `id` that doesn't resolve to an existing
    /// session also creates one under that id, so callers can mint their
    /// own ids up front.
    pub fn get_or_create(&self, id: Option<String>, default_config: SessionConfig) -> Session {
        let mut entries = self.entries.write();
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if let Some(entry) = entries.get(&id) {
            return entry.session.clone();
        }
        let session = Session::new(id.clone(), default_config);
        entries.insert(
            id,
            Entry {
                session: session.clone(),
                lock: Arc::new(Mutex::new(())),
            },
        );
        session
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.entries.read().get(id).map(|e| e.session.clone())
    }

    /// Clears messages and iteration count; keeps config.
    pub fn reset(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        entry.session.messages.clear();
        entry.session.iteration_count = 0;
        entry.session.last_activity = Utc::now();
        Ok(())
    }

    pub fn delete(&self, id: &str) {
        self.entries.write().remove(id);
    }

    /// Persists a driver's updated view of a session (messages,
    /// iteration_count, last_activity). Callers hold `with_lock` for the
    /// duration of the mutation this guards against races with.
    pub fn put(&self, session: Session) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(&session.id) {
            entry.session = session;
        }
    }

    /// Runs `f` with exclusive access to the named session. Only one
    /// caller advances a given session at a time; other sessions are
    /// unaffected.
    pub async fn with_lock<F, Fut, T>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let lock = {
            let entries = self.entries.read();
            let entry = entries
                .get(id)
                .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
            entry.lock.clone()
        };
        let _guard = lock.lock().await;
        let session = self
            .get(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        f(session).await
    }

    /// Removes sessions idle longer than the configured threshold. No-op
    /// when idle eviction is disabled. Intended to be driven by a periodic
    /// background task in the gateway.
    pub fn evict_idle(&self) -> usize {
        let Some(minutes) = self.idle_eviction_minutes else {
            return 0;
        };
        let cutoff = Utc::now() - chrono::Duration::minutes(minutes as i64);
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.session.last_activity > cutoff);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Summaries of all live sessions, for the REST listing endpoint.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.entries
            .read()
            .values()
            .map(|e| SessionSummary {
                id: e.session.id.clone(),
                message_count: e.session.messages.len(),
                iteration_count: e.session.iteration_count,
                last_activity: e.session.last_activity,
            })
            .collect()
    }
}

/// Lightweight view of a session for listing, without the full message history.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub message_count: usize,
    pub iteration_count: u32,
    pub last_activity: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_with_no_id_creates_fresh_session() {
        let store = SessionStore::new(None);
        let s = store.get_or_create(None, SessionConfig::default());
        assert_eq!(s.iteration_count, 0);
        assert!(s.messages.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_or_create_with_existing_id_returns_same_session() {
        let store = SessionStore::new(None);
        let s1 = store.get_or_create(None, SessionConfig::default());
        let s2 = store.get_or_create(Some(s1.id.clone()), SessionConfig::default());
        assert_eq!(s1.id, s2.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reset_clears_messages_and_iteration_but_keeps_config() {
        let store = SessionStore::new(None);
        let mut cfg = SessionConfig::default();
        cfg.system_prompt = Some("be terse".into());
        let s = store.get_or_create(None, cfg);
        let mut s = s;
        s.messages.push(Message::user("hi"));
        s.iteration_count = 3;
        store.put(s.clone());

        store.reset(&s.id).unwrap();

        let after = store.get(&s.id).unwrap();
        assert!(after.messages.is_empty());
        assert_eq!(after.iteration_count, 0);
        assert_eq!(after.config.system_prompt.as_deref(), Some("be terse"));
    }

    #[test]
    fn reset_unknown_session_is_an_error() {
        let store = SessionStore::new(None);
        assert!(store.reset("nope").is_err());
    }

    #[test]
    fn delete_removes_session() {
        let store = SessionStore::new(None);
        let s = store.get_or_create(None, SessionConfig::default());
        store.delete(&s.id);
        assert!(store.get(&s.id).is_none());
    }

    #[tokio::test]
    async fn with_lock_runs_against_current_session_state() {
        let store = SessionStore::new(None);
        let s = store.get_or_create(None, SessionConfig::default());
        let id = s.id.clone();

        store
            .with_lock(&id, |mut session| async move {
                session.messages.push(Message::user("hi"));
                session.iteration_count += 1;
                store.put(session);
                Ok(())
            })
            .await
            .unwrap();

        let after = store.get(&id).unwrap();
        assert_eq!(after.iteration_count, 1);
        assert_eq!(after.messages.len(), 1);
    }

    #[tokio::test]
    async fn with_lock_on_unknown_session_is_an_error() {
        let store = SessionStore::new(None);
        let result = store.with_lock("nope", |s| async move { Ok(s) }).await;
        assert!(result.is_err());
    }

    #[test]
    fn evict_idle_disabled_by_default_none() {
        let store = SessionStore::new(None);
        store.get_or_create(None, SessionConfig::default());
        assert_eq!(store.evict_idle(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn list_reports_a_summary_per_session() {
        let store = SessionStore::new(None);
        store.get_or_create(None, SessionConfig::default());
        store.get_or_create(None, SessionConfig::default());
        let summaries = store.list();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.message_count == 0));
    }

    #[test]
    fn evict_idle_removes_stale_sessions() {
        let store = SessionStore::new(Some(30));
        let s = store.get_or_create(None, SessionConfig::default());
        let mut stale = s.clone();
        stale.last_activity = Utc::now() - chrono::Duration::minutes(60);
        store.put(stale);

        assert_eq!(store.evict_idle(), 1);
        assert!(store.is_empty());
    }
}
