//! Per-session plan storage for the two-phase inquiry mode
//!
//! One plan slot per session, in process memory. Writing overwrites, reading
//! never clears or refreshes. Entries expire `ttl` after their last write and
//! the store keeps at most `max_sessions` entries, dropping the oldest write
//! when a new session arrives at capacity.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use quartet_config::{DEFAULT_MAX_SESSIONS, DEFAULT_PLAN_TTL_SECS};
use quartet_utils::error::OrchestrationError;

/// Caller-supplied key isolating plan state between users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Session used by requests that do not name one.
    pub const DEFAULT: &'static str = "default";

    /// # Errors
    ///
    /// `OrchestrationError::Validation` if `id` is empty or whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, OrchestrationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(OrchestrationError::Validation(
                "session id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// `id` when present, otherwise the default session.
    ///
    /// # Errors
    ///
    /// Same as [`SessionId::new`] for a present but blank `id`.
    pub fn from_optional(id: Option<&str>) -> Result<Self, OrchestrationError> {
        id.map_or_else(|| Ok(Self::default()), Self::new)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct Entry {
    plan: String,
    written_at: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<SessionId, Entry>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct PlanStore {
    slots: Mutex<Slots>,
    ttl: Duration,
    max_sessions: usize,
}

impl PlanStore {
    /// `max_sessions` is raised to 1 if zero.
    #[must_use]
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Store `plan` for `session`, replacing any earlier plan.
    pub fn write(&self, session: &SessionId, plan: impl Into<String>) {
        let now = Instant::now();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        if !slots.entries.contains_key(session) {
            let ttl = self.ttl;
            slots
                .entries
                .retain(|_, entry| now.duration_since(entry.written_at) < ttl);

            while slots.entries.len() >= self.max_sessions {
                let oldest = slots
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.seq)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        debug!(session = %id, "Evicting oldest plan at capacity");
                        slots.entries.remove(&id);
                    }
                    None => break,
                }
            }
        }

        let seq = slots.next_seq;
        slots.next_seq += 1;
        slots.entries.insert(
            session.clone(),
            Entry {
                plan: plan.into(),
                written_at: now,
                seq,
            },
        );
    }

    /// The plan stored for `session`, unless none was written or it expired.
    #[must_use]
    pub fn read(&self, session: &SessionId) -> Option<String> {
        let now = Instant::now();
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entries
            .get(session)
            .filter(|entry| now.duration_since(entry.written_at) < self.ttl)
            .map(|entry| entry.plan.clone())
    }

    /// Number of entries held, expired ones included until the next write purges them.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PlanStore {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_PLAN_TTL_SECS),
            DEFAULT_MAX_SESSIONS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sid(id: &str) -> SessionId {
        SessionId::new(id).unwrap()
    }

    #[test]
    fn test_session_id_rejects_blank() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("  ").is_err());
        assert_eq!(SessionId::from_optional(None).unwrap().as_str(), "default");
        assert_eq!(SessionId::from_optional(Some("s1")).unwrap().as_str(), "s1");
        assert!(SessionId::from_optional(Some("")).is_err());
    }

    #[test]
    fn test_write_overwrites_and_read_does_not_clear() {
        let store = PlanStore::default();
        let s = sid("alice");
        assert_eq!(store.read(&s), None);

        store.write(&s, "first");
        store.write(&s, "second");
        assert_eq!(store.read(&s).as_deref(), Some("second"));
        assert_eq!(store.read(&s).as_deref(), Some("second"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = PlanStore::default();
        store.write(&sid("alice"), "A");
        store.write(&sid("bob"), "B");
        assert_eq!(store.read(&sid("alice")).as_deref(), Some("A"));
        assert_eq!(store.read(&sid("bob")).as_deref(), Some("B"));
        assert_eq!(store.read(&sid("carol")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl_from_last_write() {
        let store = PlanStore::new(Duration::from_secs(60), 8);
        let s = sid("alice");
        store.write(&s, "plan");

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(store.read(&s).as_deref(), Some("plan"));

        // Reading does not extend the lifetime
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.read(&s), None);

        store.write(&s, "again");
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.read(&s).as_deref(), Some("again"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_purged_on_new_session() {
        let store = PlanStore::new(Duration::from_secs(10), 8);
        store.write(&sid("a"), "1");
        store.write(&sid("b"), "2");
        tokio::time::advance(Duration::from_secs(11)).await;

        store.write(&sid("c"), "3");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest_write() {
        let store = PlanStore::new(Duration::from_secs(3600), 2);
        store.write(&sid("a"), "1");
        store.write(&sid("b"), "2");
        // Rewriting "a" makes "b" the oldest write
        store.write(&sid("a"), "1'");
        store.write(&sid("c"), "3");

        assert_eq!(store.len(), 2);
        assert_eq!(store.read(&sid("b")), None);
        assert_eq!(store.read(&sid("a")).as_deref(), Some("1'"));
        assert_eq!(store.read(&sid("c")).as_deref(), Some("3"));
    }

    #[test]
    fn test_zero_capacity_still_holds_one() {
        let store = PlanStore::new(Duration::from_secs(60), 0);
        store.write(&sid("a"), "1");
        assert_eq!(store.read(&sid("a")).as_deref(), Some("1"));
    }

    proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(
            cap in 1usize..6,
            writes in proptest::collection::vec(0u8..12, 0..40),
        ) {
            let store = PlanStore::new(Duration::from_secs(3600), cap);
            for w in &writes {
                store.write(&sid(&format!("s{w}")), format!("plan {w}"));
                prop_assert!(store.len() <= cap);
            }
            if let Some(last) = writes.last() {
                let expected = format!("plan {last}");
                prop_assert_eq!(store.read(&sid(&format!("s{last}"))), Some(expected));
            }
        }
    }
}
