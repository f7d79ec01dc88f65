//! # rf-session-memory
//!
//! In-process `SessionStore`. Preferences live for the life of the process;
//! a restart resets every session to the defaults.

use async_trait::async_trait;
use dashmap::DashMap;
use rf_core::error::Result;
use rf_core::session::ListPrefs;
use rf_core::traits::SessionStore;
use tracing::debug;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, ListPrefs>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_key: &str) -> Result<ListPrefs> {
        Ok(self
            .sessions
            .get(session_key)
            .map(|prefs| *prefs)
            .unwrap_or_default())
    }

    async fn save(&self, session_key: &str, prefs: ListPrefs) -> Result<()> {
        debug!(?prefs, "session preferences stored");
        self.sessions.insert(session_key.to_string(), prefs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::ranking::{CommentOrder, ThreadFilter, ThreadOrder};
    use tokio_test::block_on;

    #[test]
    fn test_unknown_session_loads_defaults() {
        let store = MemorySessionStore::new();
        assert_eq!(block_on(store.load("nobody")).unwrap(), ListPrefs::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = MemorySessionStore::new();
        let prefs = ListPrefs {
            thread_filter: ThreadFilter::Links,
            thread_order: ThreadOrder::Points,
            comment_order: CommentOrder::Likes,
        };
        block_on(store.save("a", prefs)).unwrap();

        assert_eq!(block_on(store.load("a")).unwrap(), prefs);
        assert_eq!(block_on(store.load("b")).unwrap(), ListPrefs::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_overwrites() {
        let store = MemorySessionStore::new();
        let mut prefs = ListPrefs::default();
        block_on(store.save("a", prefs)).unwrap();
        prefs.thread_order = ThreadOrder::NumComments;
        block_on(store.save("a", prefs)).unwrap();
        assert_eq!(block_on(store.load("a")).unwrap().thread_order, ThreadOrder::NumComments);
    }
}
