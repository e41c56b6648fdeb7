//! Integration tests for the paging core: page sources over a mock
//! catalog, and the session registry contract.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tunebot::catalog::{AlbumSort, CatalogService, SongSort};
use tunebot::errors::{CatalogError, SessionExpired};
use tunebot::model::{
    AlbumDetail, ArtistDetail, Entry, FoundPage, RawEntry, RelatedLists, SongDetail, SongEntry,
};
use tunebot::paging::{current_page, last_page, PageSource, QuerySpec, ResultTag, SearchKind};
use tunebot::session::SessionRegistry;

fn song(id: u64) -> SongEntry {
    SongEntry {
        id,
        name: format!("song {id}"),
        song_type: "Original".to_string(),
        artist_string: Some("producer".to_string()),
        favorited_times: Some(id * 10),
        pv_services: None,
        main_picture: None,
    }
}

fn entry(id: u64) -> Entry {
    Entry::Song(song(id))
}

fn upstream_error() -> CatalogError {
    CatalogError::Malformed(serde_json::from_str::<serde_json::Value>("not json").unwrap_err())
}

/// Fixed-dataset catalog. `fail` simulates upstream trouble on search
/// endpoints; fetch counters observe how often full sets are pulled.
struct MockCatalog {
    songs: Vec<SongEntry>,
    derived: Vec<Entry>,
    related: RelatedLists,
    fail: AtomicBool,
    search_fetches: AtomicUsize,
    derived_fetches: AtomicUsize,
    related_fetches: AtomicUsize,
}

impl MockCatalog {
    fn with_songs(count: u64) -> Self {
        Self {
            songs: (1..=count).map(song).collect(),
            derived: Vec::new(),
            related: RelatedLists::default(),
            fail: AtomicBool::new(false),
            search_fetches: AtomicUsize::new(0),
            derived_fetches: AtomicUsize::new(0),
            related_fetches: AtomicUsize::new(0),
        }
    }

    fn search_page(&self, offset: usize, limit: usize) -> Result<FoundPage, CatalogError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(upstream_error());
        }
        self.search_fetches.fetch_add(1, Ordering::SeqCst);
        let end = (offset + limit).min(self.songs.len());
        let items = if offset < self.songs.len() {
            self.songs[offset..end]
                .iter()
                .map(|song| RawEntry::Song(song.clone()))
                .collect()
        } else {
            Vec::new()
        };
        Ok(FoundPage {
            items,
            total_count: self.songs.len(),
        })
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn search_entries(
        &self,
        _query: &str,
        _lang: &str,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        self.search_page(offset, limit)
    }

    async fn search_songs(
        &self,
        _query: &str,
        _lang: &str,
        _sort: SongSort,
        _artist_id: Option<u64>,
        _originals_only: bool,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        self.search_page(offset, limit)
    }

    async fn search_artists(
        &self,
        _query: &str,
        _lang: &str,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        self.search_page(offset, limit)
    }

    async fn search_albums(
        &self,
        _query: &str,
        _lang: &str,
        _sort: AlbumSort,
        _artist_id: Option<u64>,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        self.search_page(offset, limit)
    }

    async fn derived_songs(&self, _song_id: u64, _lang: &str) -> Result<Vec<Entry>, CatalogError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(upstream_error());
        }
        self.derived_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.derived.clone())
    }

    async fn related_songs(
        &self,
        _song_id: u64,
        _lang: &str,
    ) -> Result<RelatedLists, CatalogError> {
        self.related_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.related.clone())
    }

    async fn albums_for_song(
        &self,
        _song_id: u64,
        _lang: &str,
    ) -> Result<Vec<Entry>, CatalogError> {
        Ok(self.derived.clone())
    }

    async fn song(&self, _id: u64, _lang: &str) -> Result<Option<SongDetail>, CatalogError> {
        Ok(None)
    }

    async fn artist(&self, _id: u64, _lang: &str) -> Result<Option<ArtistDetail>, CatalogError> {
        Ok(None)
    }

    async fn album(&self, _id: u64, _lang: &str) -> Result<Option<AlbumDetail>, CatalogError> {
        Ok(None)
    }
}

fn song_source(catalog: Arc<MockCatalog>, page_size: usize) -> PageSource {
    PageSource::new(
        catalog,
        QuerySpec::search(SearchKind::Songs, "miku", false),
        "English",
        page_size,
    )
}

#[tokio::test]
async fn seven_results_page_three_at_a_time() {
    let catalog = Arc::new(MockCatalog::with_songs(7));
    let source = song_source(Arc::clone(&catalog), 3);

    let first = source.page(1).await;
    assert_eq!(first.items.len(), 3);
    assert_eq!(first.range_start, 0);
    assert_eq!(first.total_count, 7);
    assert_eq!(first.tag, ResultTag::Search);
    assert_eq!(current_page(first.range_start, 3), 1);
    assert_eq!(last_page(first.total_count, 3), 3);

    let last = source.page(3).await;
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.range_start, 6);
    assert_eq!(last.items[0].id(), 7);
    assert_eq!(current_page(last.range_start, 3), 3);
}

#[tokio::test]
async fn page_length_matches_the_remaining_count() {
    let catalog = Arc::new(MockCatalog::with_songs(7));
    let source = song_source(catalog, 3);

    for page_index in 1u32..=5 {
        let result = source.page(page_index).await;
        let expected = 3usize.min(7usize.saturating_sub((page_index as usize - 1) * 3));
        assert_eq!(result.items.len(), expected, "page {page_index}");
        assert_eq!(result.range_start, (page_index as usize - 1) * 3);
    }
}

#[tokio::test]
async fn repeated_fetches_are_identical() {
    let catalog = Arc::new(MockCatalog::with_songs(7));
    let source = song_source(catalog, 3);

    let once = source.page(2).await;
    let twice = source.page(2).await;
    assert_eq!(once, twice);
}

#[tokio::test]
async fn empty_result_set() {
    let catalog = Arc::new(MockCatalog::with_songs(0));
    let source = song_source(catalog, 3);

    let result = source.page(1).await;
    assert!(result.items.is_empty());
    assert_eq!(result.total_count, 0);
}

#[tokio::test]
async fn upstream_failure_degrades_to_empty_page_with_carried_total() {
    let catalog = Arc::new(MockCatalog::with_songs(7));
    let source = song_source(Arc::clone(&catalog), 3);

    let ok = source.page(1).await;
    assert_eq!(ok.total_count, 7);

    catalog.fail.store(true, Ordering::SeqCst);
    let degraded = source.page(2).await;
    assert!(degraded.items.is_empty());
    assert_eq!(degraded.total_count, 7, "total carried from last success");
    assert_eq!(degraded.range_start, 3);

    // A source that never succeeded reports zero
    let fresh = song_source(Arc::clone(&catalog), 3);
    let result = fresh.page(1).await;
    assert!(result.items.is_empty());
    assert_eq!(result.total_count, 0);
}

#[tokio::test]
async fn last_page_hint_tracks_successful_fetches() {
    let catalog = Arc::new(MockCatalog::with_songs(7));
    let source = song_source(catalog, 3);

    assert_eq!(source.last_page_hint(), None);
    source.page(1).await;
    assert_eq!(source.last_page_hint(), Some(3));
}

#[tokio::test]
async fn derived_set_is_fetched_once_and_sliced_client_side() {
    let mut catalog = MockCatalog::with_songs(0);
    catalog.derived = (1..=7).map(entry).collect();
    let catalog = Arc::new(catalog);

    let source = PageSource::new(
        Arc::clone(&catalog) as Arc<dyn CatalogService>,
        QuerySpec::DerivedSongs { song_id: 42 },
        "English",
        3,
    );

    let first = source.page(1).await;
    assert_eq!(first.items.len(), 3);
    assert_eq!(first.total_count, 7);
    assert_eq!(first.tag, ResultTag::Derived);

    let third = source.page(3).await;
    assert_eq!(third.items.len(), 1);
    assert_eq!(third.range_start, 6);

    // Past the end: empty page, total intact
    let fourth = source.page(4).await;
    assert!(fourth.items.is_empty());
    assert_eq!(fourth.total_count, 7);

    assert_eq!(
        catalog.derived_fetches.load(Ordering::SeqCst),
        1,
        "full set fetched exactly once per source"
    );
}

#[tokio::test]
async fn related_zip_takes_one_item_per_category_per_page() {
    let mut catalog = MockCatalog::with_songs(0);
    catalog.related = RelatedLists {
        artist_matches: (1..=5).map(entry).collect(),
        like_matches: (101..=102).map(entry).collect(),
        tag_matches: (201..=204).map(entry).collect(),
    };
    let catalog = Arc::new(catalog);

    let source = PageSource::new(
        catalog,
        QuerySpec::RelatedSongs { song_id: 42 },
        "English",
        3,
    );

    // totalCount = 3 * min(5, 2, 4)
    let first = source.page(1).await;
    assert_eq!(first.total_count, 6);
    assert_eq!(first.tag, ResultTag::Related);
    assert_eq!(
        first.items.iter().map(Entry::id).collect::<Vec<_>>(),
        vec![1, 101, 201],
        "one item per category, artist/like/tag order"
    );

    let second = source.page(2).await;
    assert_eq!(
        second.items.iter().map(Entry::id).collect::<Vec<_>>(),
        vec![2, 102, 202]
    );

    // likeMatches exhausted: the remaining artist and tag matches are
    // deliberately never surfaced
    let third = source.page(3).await;
    assert!(third.items.is_empty());
    assert_eq!(third.total_count, 6);
}

#[tokio::test]
async fn query_spec_survives_serialization() {
    let spec = QuerySpec::Songs {
        query: "tell your world".to_string(),
        sort: SongSort::FavoritedTimes,
        artist_id: Some(9),
        originals_only: true,
    };
    let json = serde_json::to_string(&spec).unwrap();
    let back: QuerySpec = serde_json::from_str(&json).unwrap();
    assert_eq!(spec, back);
}

#[tokio::test]
async fn registry_resolves_freshly_created_sessions() {
    let registry = SessionRegistry::new(16, Duration::from_secs(60));
    let catalog = Arc::new(MockCatalog::with_songs(7));
    let source = Arc::new(song_source(catalog, 3));

    let key = registry.create(Arc::clone(&source));
    let resolved = registry.resolve(&key).expect("fresh session must resolve");
    assert!(Arc::ptr_eq(&source, &resolved));

    // The resolved source is the same live object, not a copy
    resolved.page(1).await;
    assert_eq!(source.last_page_hint(), Some(3));
}

#[tokio::test]
async fn registry_rejects_unknown_keys() {
    let registry = SessionRegistry::new(16, Duration::from_secs(60));
    assert!(matches!(registry.resolve("never-issued"), Err(SessionExpired)));
    assert!(matches!(
        registry.resolve("00000000000000000000000000000000"),
        Err(SessionExpired)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registry_handles_concurrent_create_and_resolve() {
    let registry = Arc::new(SessionRegistry::new(1024, Duration::from_secs(60)));
    let catalog = Arc::new(MockCatalog::with_songs(7));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let registry = Arc::clone(&registry);
        let catalog = Arc::clone(&catalog);
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                let source = Arc::new(song_source(Arc::clone(&catalog), 3));
                let key = registry.create(source);
                assert!(registry.resolve(&key).is_ok());
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(registry.len(), 16 * 25);
}
