//! Session registry.
//!
//! Correlates asynchronous events with later queries for the same SMTP
//! connection. Bounded and least-recently-used: a daemon that never sends
//! DISCONNECT cannot grow it without limit.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::kinds::QueryKind;

/// The query currently awaiting an answer on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingQuery {
    pub kind: QueryKind,
    pub id: u64,
}

/// Per-connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Daemon-assigned session id.
    pub id: u64,
    /// Latest query seen on this session.
    pub query: Option<PendingQuery>,
}

impl Session {
    pub fn new(id: u64) -> Self {
        Self { id, query: None }
    }
}

/// Capacity-bounded LRU map from session id to [`Session`].
pub struct SessionRegistry {
    cache: LruCache<u64, Session>,
}

impl SessionRegistry {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Start tracking `id` afresh, replacing any earlier state.
    pub fn insert(&mut self, id: u64) {
        if let Some((evicted, _)) = self.cache.push(id, Session::new(id)) {
            if evicted != id {
                tracing::debug!("session registry full, evicted {:#x}", evicted);
            }
        }
    }

    /// Look up `id`, creating it if missing. Counts as a use.
    pub fn get_or_create(&mut self, id: u64) -> &mut Session {
        self.cache.get_or_insert_mut(id, || Session::new(id))
    }

    /// Look up `id` without touching its recency.
    pub fn peek(&self, id: u64) -> Option<&Session> {
        self.cache.peek(&id)
    }

    /// Stop tracking `id`. Missing ids are ignored.
    pub fn remove(&mut self, id: u64) -> Option<Session> {
        self.cache.pop(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.cache.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(capacity: usize) -> SessionRegistry {
        SessionRegistry::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_get_or_create_new_session() {
        let mut sessions = registry(4);
        let session = sessions.get_or_create(7);
        assert_eq!(session.id, 7);
        assert!(session.query.is_none());
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_state_persists_between_lookups() {
        let mut sessions = registry(4);
        sessions.get_or_create(1).query = Some(PendingQuery {
            kind: QueryKind::Helo,
            id: 3,
        });

        let session = sessions.get_or_create(1);
        assert_eq!(session.query.unwrap().id, 3);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut sessions = registry(3);
        sessions.insert(1);
        sessions.insert(2);
        sessions.insert(3);

        // Touch 1 so 2 becomes the oldest
        sessions.get_or_create(1);
        sessions.insert(4);

        assert_eq!(sessions.len(), 3);
        assert!(sessions.contains(1));
        assert!(!sessions.contains(2));
        assert!(sessions.contains(3));
        assert!(sessions.contains(4));
    }

    #[test]
    fn test_get_or_create_evicts_when_full() {
        let mut sessions = registry(2);
        sessions.get_or_create(1);
        sessions.get_or_create(2);
        sessions.get_or_create(3);

        assert!(!sessions.contains(1));
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_insert_resets_existing_session() {
        let mut sessions = registry(2);
        sessions.get_or_create(9).query = Some(PendingQuery {
            kind: QueryKind::Data,
            id: 1,
        });
        sessions.insert(9);
        assert!(sessions.peek(9).unwrap().query.is_none());
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut sessions = registry(2);
        assert!(sessions.remove(42).is_none());
        sessions.insert(1);
        assert!(sessions.remove(1).is_some());
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_capacity() {
        assert_eq!(registry(1024).capacity(), 1024);
    }
}
