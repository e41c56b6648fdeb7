//! # Session Registry Module
//!
//! Maps opaque paging keys to live [`PageSource`]s so a paging-control tap
//! can resume a browse long after the originating command. The registry is
//! the only shared mutable state in the browsing core and is safe for
//! concurrent use from any number of handler tasks.
//!
//! Sessions are bounded two ways: a TTL (stale sessions resolve as
//! expired) and a capacity cap (oldest sessions are evicted first).
//! Eviction is an expected, normal cause of [`SessionExpired`] — the user
//! is asked to start over, nothing worse. Keys are 128-bit random tokens
//! and are never reused; an evicted key simply stops resolving.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::BotConfig;
use crate::errors::SessionExpired;
use crate::paging::PageSource;

struct Session {
    source: Arc<PageSource>,
    created_at: Instant,
}

/// Concurrency-safe store of live paging sessions.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    capacity: usize,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.session_capacity, config.session_ttl)
    }

    /// Store a page source and return its fresh paging key.
    ///
    /// The key is a 32-char hex token, short enough that a
    /// `page|<key>|<index>` callback payload stays inside Telegram's
    /// 64-byte callback-data budget.
    pub fn create(&self, source: Arc<PageSource>) -> String {
        let key = format!("{:032x}", rand::random::<u128>());
        let mut sessions = self.sessions.lock().unwrap();
        Self::purge_expired(&mut sessions, self.ttl);
        while sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.created_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(old_key) => {
                    sessions.remove(&old_key);
                    debug!(key = %old_key, "evicted oldest paging session");
                }
                None => break,
            }
        }
        sessions.insert(
            key.clone(),
            Session {
                source,
                created_at: Instant::now(),
            },
        );
        key
    }

    /// Look up a paging key. Unknown, evicted and timed-out keys all
    /// resolve to [`SessionExpired`].
    pub fn resolve(&self, key: &str) -> Result<Arc<PageSource>, SessionExpired> {
        let sessions = self.sessions.lock().unwrap();
        match sessions.get(key) {
            Some(session) if session.created_at.elapsed() < self.ttl => {
                Ok(Arc::clone(&session.source))
            }
            _ => Err(SessionExpired),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(sessions: &mut HashMap<String, Session>, ttl: Duration) {
        sessions.retain(|_, session| session.created_at.elapsed() < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AlbumSort, CatalogService, SongSort};
    use crate::errors::CatalogError;
    use crate::model::{Entry, FoundPage, RelatedLists};
    use crate::paging::QuerySpec;
    use async_trait::async_trait;

    struct NullCatalog;

    #[async_trait]
    impl CatalogService for NullCatalog {
        async fn search_entries(
            &self,
            _query: &str,
            _lang: &str,
            _offset: usize,
            _limit: usize,
        ) -> Result<FoundPage, CatalogError> {
            Ok(FoundPage {
                items: Vec::new(),
                total_count: 0,
            })
        }

        async fn search_songs(
            &self,
            _query: &str,
            _lang: &str,
            _sort: SongSort,
            _artist_id: Option<u64>,
            _originals_only: bool,
            _offset: usize,
            _limit: usize,
        ) -> Result<FoundPage, CatalogError> {
            Ok(FoundPage {
                items: Vec::new(),
                total_count: 0,
            })
        }

        async fn search_artists(
            &self,
            _query: &str,
            _lang: &str,
            _offset: usize,
            _limit: usize,
        ) -> Result<FoundPage, CatalogError> {
            Ok(FoundPage {
                items: Vec::new(),
                total_count: 0,
            })
        }

        async fn search_albums(
            &self,
            _query: &str,
            _lang: &str,
            _sort: AlbumSort,
            _artist_id: Option<u64>,
            _offset: usize,
            _limit: usize,
        ) -> Result<FoundPage, CatalogError> {
            Ok(FoundPage {
                items: Vec::new(),
                total_count: 0,
            })
        }

        async fn derived_songs(
            &self,
            _song_id: u64,
            _lang: &str,
        ) -> Result<Vec<Entry>, CatalogError> {
            Ok(Vec::new())
        }

        async fn related_songs(
            &self,
            _song_id: u64,
            _lang: &str,
        ) -> Result<RelatedLists, CatalogError> {
            Ok(RelatedLists::default())
        }

        async fn albums_for_song(
            &self,
            _song_id: u64,
            _lang: &str,
        ) -> Result<Vec<Entry>, CatalogError> {
            Ok(Vec::new())
        }

        async fn song(
            &self,
            _id: u64,
            _lang: &str,
        ) -> Result<Option<crate::model::SongDetail>, CatalogError> {
            Ok(None)
        }

        async fn artist(
            &self,
            _id: u64,
            _lang: &str,
        ) -> Result<Option<crate::model::ArtistDetail>, CatalogError> {
            Ok(None)
        }

        async fn album(
            &self,
            _id: u64,
            _lang: &str,
        ) -> Result<Option<crate::model::AlbumDetail>, CatalogError> {
            Ok(None)
        }
    }

    fn source() -> Arc<PageSource> {
        Arc::new(PageSource::new(
            Arc::new(NullCatalog),
            QuerySpec::Entries {
                query: "miku".to_string(),
            },
            "English",
            3,
        ))
    }

    #[test]
    fn test_create_then_resolve_returns_same_source() {
        let registry = SessionRegistry::new(16, Duration::from_secs(60));
        let src = source();
        let key = registry.create(Arc::clone(&src));
        let resolved = registry.resolve(&key).unwrap();
        assert!(Arc::ptr_eq(&src, &resolved));
    }

    #[test]
    fn test_unknown_key_is_expired() {
        let registry = SessionRegistry::new(16, Duration::from_secs(60));
        assert!(matches!(registry.resolve("no-such-key"), Err(SessionExpired)));
    }

    #[test]
    fn test_keys_are_unique_and_short() {
        let registry = SessionRegistry::new(64, Duration::from_secs(60));
        let mut keys = std::collections::HashSet::new();
        for _ in 0..32 {
            let key = registry.create(source());
            assert_eq!(key.len(), 32);
            assert!(keys.insert(key));
        }
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let registry = SessionRegistry::new(2, Duration::from_secs(60));
        let first = registry.create(source());
        std::thread::sleep(Duration::from_millis(5));
        let second = registry.create(source());
        std::thread::sleep(Duration::from_millis(5));
        let third = registry.create(source());

        assert_eq!(registry.len(), 2);
        assert!(matches!(registry.resolve(&first), Err(SessionExpired)));
        assert!(registry.resolve(&second).is_ok());
        assert!(registry.resolve(&third).is_ok());
    }

    #[test]
    fn test_ttl_expires_sessions() {
        let registry = SessionRegistry::new(16, Duration::from_millis(20));
        let key = registry.create(source());
        assert!(registry.resolve(&key).is_ok());
        std::thread::sleep(Duration::from_millis(30));
        assert!(matches!(registry.resolve(&key), Err(SessionExpired)));
    }
}
