//! In-memory session registry: session id -> lock-guarded state.
//!
//! Each session sits behind its own `tokio::sync::Mutex`, so concurrent requests for the
//! same id are serialized for the whole turn while different sessions proceed in parallel.
//! Idle sessions expire after a TTL; when the registry is full the least recently used
//! session is evicted, finalized sessions first.

use super::state::SessionState;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to one session's state.
pub type SessionHandle = Arc<Mutex<SessionState>>;

const DEFAULT_TTL_SECS: i64 = 2 * 60 * 60;
const DEFAULT_CAPACITY: usize = 1024;

struct SessionSlot {
    state: SessionHandle,
    last_activity: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
}

impl SessionSlot {
    fn new(session_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(session_id))),
            last_activity: now,
            finalized_at: None,
        }
    }

    /// A handle is held outside the store while a turn is running.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.state) > 1
    }
}

/// Session registry with TTL and capacity bounds.
pub struct SessionStore {
    sessions: DashMap<String, SessionSlot>,
    ttl: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS), DEFAULT_CAPACITY)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Returns the session for `session_id`, creating a fresh one (primary counter 1) if absent.
    /// Touches the activity timestamp either way.
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        let now = Utc::now();
        if let Some(mut slot) = self.sessions.get_mut(session_id) {
            slot.last_activity = now;
            return slot.state.clone();
        }
        if self.sessions.len() >= self.capacity {
            self.evict_one();
        }
        let slot = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionSlot::new(session_id, now));
        tracing::debug!(target: "solace::session", session_id, "session created");
        slot.state.clone()
    }

    /// Existing session without creating one.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.get(session_id).map(|slot| slot.state.clone())
    }

    /// Marks a session as finalized; finalized sessions are the first eviction candidates.
    pub fn mark_finalized(&self, session_id: &str) {
        if let Some(mut slot) = self.sessions.get_mut(session_id) {
            slot.finalized_at = Some(Utc::now());
        }
    }

    pub fn is_finalized(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .map(|slot| slot.finalized_at.is_some())
            .unwrap_or(false)
    }

    pub fn evict(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Drops sessions idle longer than the TTL as of `now`. Sessions with a turn in flight are kept.
    /// Returns the number evicted.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, slot| slot.in_use() || now.signed_duration_since(slot.last_activity) <= ttl);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!(target: "solace::session", evicted, remaining = self.sessions.len(), "expired sessions evicted");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes the best eviction candidate: finalized before active, then least recently used.
    fn evict_one(&self) {
        let victim = self
            .sessions
            .iter()
            .filter(|entry| !entry.value().in_use())
            .min_by_key(|entry| (entry.value().finalized_at.is_none(), entry.value().last_activity))
            .map(|entry| entry.key().clone());
        if let Some(id) = victim {
            self.sessions.remove(&id);
            tracing::info!(target: "solace::session", session_id = %id, "session evicted at capacity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_returns_the_same_session() {
        let store = SessionStore::default();
        let a = store.get_or_create("s1");
        a.lock().await.schedule = "gym at 6".to_string();
        drop(a);
        let b = store.get_or_create("s1");
        assert_eq!(b.lock().await.schedule, "gym at 6");
        assert_eq!(store.len(), 1);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn expired_sessions_are_evicted() {
        let store = SessionStore::new(Duration::seconds(60), 16);
        drop(store.get_or_create("old"));
        assert_eq!(store.evict_expired(Utc::now()), 0);
        assert_eq!(store.evict_expired(Utc::now() + Duration::seconds(120)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn sessions_in_use_survive_expiry() {
        let store = SessionStore::new(Duration::seconds(1), 16);
        let held = store.get_or_create("busy");
        assert_eq!(store.evict_expired(Utc::now() + Duration::seconds(10)), 0);
        drop(held);
        assert_eq!(store.evict_expired(Utc::now() + Duration::seconds(10)), 1);
    }

    #[test]
    fn capacity_prefers_finalized_then_oldest() {
        let store = SessionStore::new(Duration::seconds(3600), 2);
        drop(store.get_or_create("a"));
        drop(store.get_or_create("b"));
        store.mark_finalized("b");
        assert!(store.is_finalized("b"));
        drop(store.get_or_create("c"));
        assert_eq!(store.len(), 2);
        assert!(store.get("a").is_some());
        assert!(store.get("b").is_none());

        if let Some(mut slot) = store.sessions.get_mut("a") {
            slot.last_activity = Utc::now() - Duration::seconds(30);
        }
        drop(store.get_or_create("d"));
        assert!(store.get("a").is_none());
        assert!(store.get("c").is_some());
        assert!(store.get("d").is_some());
    }
}
