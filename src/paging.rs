//! Page sources: repeatable page-fetching bound to one query.
//!
//! A [`QuerySpec`] is a plain serializable value describing what to fetch;
//! a [`PageSource`] binds a spec to a catalog client, a display language
//! and a page size, and turns 1-based page indices into [`PageResult`]s.
//! Sources are registered in the session registry so a paging button tap
//! can re-invoke the original query later.
//!
//! Search-shaped specs translate page `i` into an offset fetch at
//! `(i - 1) * page_size`. Derived and albums-featuring-song sets have no
//! upstream paging, so the full set is fetched once per source and sliced
//! client-side. Related songs zip three ranked categories one item per
//! category per page, dropping the tail once the shortest category runs
//! out; that asymmetry is deliberate and matched to the catalog's ranking.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::catalog::{AlbumSort, CatalogService, SongSort};
use crate::errors::CatalogError;
use crate::model::{Entry, RawEntry, RelatedLists};

/// Related pages always carry one entry per match category.
pub const RELATED_CATEGORIES: usize = 3;

/// Why a result set is shaped the way it is. Drives the empty-state
/// message and the per-category headers of related pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultTag {
    Search,
    Derived,
    Related,
    AlbumsBySong,
}

/// Which entry kinds a search command covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchKind {
    All,
    Songs,
    Artists,
    Albums,
}

/// One page of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub items: Vec<Entry>,
    /// 0-based offset of the first item within the full result set
    pub range_start: usize,
    pub total_count: usize,
    pub tag: ResultTag,
}

/// 1-based page number containing the item at `range_start`.
pub fn current_page(range_start: usize, page_size: usize) -> u32 {
    (range_start / page_size) as u32 + 1
}

/// 1-based number of the final page; 0 when the result set is empty.
pub fn last_page(total_count: usize, page_size: usize) -> u32 {
    total_count.div_ceil(page_size) as u32
}

/// Everything needed to repeat a fetch: what to search, how to sort, and
/// any scoping filter. Serializable so a live session can be dumped when
/// debugging paging issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuerySpec {
    /// All-kinds search over songs, artists and albums at once
    Entries { query: String },
    Songs {
        query: String,
        sort: SongSort,
        artist_id: Option<u64>,
        originals_only: bool,
    },
    Artists { query: String },
    Albums {
        query: String,
        sort: AlbumSort,
        artist_id: Option<u64>,
    },
    DerivedSongs { song_id: u64 },
    RelatedSongs { song_id: u64 },
    AlbumsBySong { song_id: u64 },
}

impl QuerySpec {
    /// Spec for a plain text search over the given kinds.
    pub fn search(kind: SearchKind, query: &str, originals_only: bool) -> Self {
        match kind {
            SearchKind::All => QuerySpec::Entries {
                query: query.to_string(),
            },
            SearchKind::Songs => QuerySpec::Songs {
                query: query.to_string(),
                sort: SongSort::FavoritedTimes,
                artist_id: None,
                originals_only,
            },
            SearchKind::Artists => QuerySpec::Artists {
                query: query.to_string(),
            },
            SearchKind::Albums => QuerySpec::Albums {
                query: query.to_string(),
                sort: AlbumSort::NameThenReleaseDate,
                artist_id: None,
            },
        }
    }

    pub fn tag(&self) -> ResultTag {
        match self {
            QuerySpec::Entries { .. }
            | QuerySpec::Songs { .. }
            | QuerySpec::Artists { .. }
            | QuerySpec::Albums { .. } => ResultTag::Search,
            QuerySpec::DerivedSongs { .. } => ResultTag::Derived,
            QuerySpec::RelatedSongs { .. } => ResultTag::Related,
            QuerySpec::AlbumsBySong { .. } => ResultTag::AlbumsBySong,
        }
    }

    fn is_full_set(&self) -> bool {
        matches!(
            self,
            QuerySpec::DerivedSongs { .. }
                | QuerySpec::RelatedSongs { .. }
                | QuerySpec::AlbumsBySong { .. }
        )
    }
}

/// Full sets fetched once per source for the variants the catalog cannot
/// offset-page.
enum FullSet {
    Flat(Vec<Entry>),
    Related(RelatedLists),
}

/// A bound, repeatable page-fetching function for one query.
///
/// `page` never fails: upstream trouble degrades to an empty page carrying
/// the last total this source saw, so the renderer can show a graceful
/// not-found state and the paging controls stay consistent.
pub struct PageSource {
    spec: QuerySpec,
    lang: String,
    page_size: usize,
    catalog: Arc<dyn CatalogService>,
    full_set: OnceCell<FullSet>,
    last_total: Mutex<Option<usize>>,
}

impl PageSource {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        spec: QuerySpec,
        lang: &str,
        page_size: usize,
    ) -> Self {
        Self {
            spec,
            lang: lang.to_string(),
            page_size,
            catalog,
            full_set: OnceCell::new(),
            last_total: Mutex::new(None),
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total reported by the most recent successful fetch, if any.
    pub fn last_known_total(&self) -> Option<usize> {
        *self.last_total.lock().unwrap()
    }

    /// Final page number as of the last successful fetch. Used by the
    /// controller to clamp targets from stale paging controls.
    pub fn last_page_hint(&self) -> Option<u32> {
        self.last_known_total()
            .map(|total| last_page(total, self.page_size).max(1))
    }

    /// Fetch page `page_index` (1-based). Infallible by design: a failed
    /// or malformed upstream response yields an empty page with the total
    /// carried over from the last known value.
    pub async fn page(&self, page_index: u32) -> PageResult {
        debug_assert!(page_index >= 1);
        let page_index = page_index.max(1);
        match self.fetch(page_index).await {
            Ok(result) => {
                *self.last_total.lock().unwrap() = Some(result.total_count);
                result
            }
            Err(err) => {
                warn!(spec = ?self.spec, page = page_index, error = %err, "page fetch failed");
                PageResult {
                    items: Vec::new(),
                    range_start: (page_index as usize - 1) * self.effective_page_size(),
                    total_count: self.last_known_total().unwrap_or(0),
                    tag: self.spec.tag(),
                }
            }
        }
    }

    fn effective_page_size(&self) -> usize {
        if matches!(self.spec, QuerySpec::RelatedSongs { .. }) {
            RELATED_CATEGORIES
        } else {
            self.page_size
        }
    }

    async fn fetch(&self, page_index: u32) -> Result<PageResult, CatalogError> {
        if self.spec.is_full_set() {
            let set = self
                .full_set
                .get_or_try_init(|| self.fetch_full_set())
                .await?;
            return Ok(match set {
                FullSet::Flat(entries) => {
                    slice_page(entries, page_index, self.page_size, self.spec.tag())
                }
                FullSet::Related(lists) => zip_related(lists, page_index),
            });
        }

        let offset = (page_index as usize - 1) * self.page_size;
        let found = match &self.spec {
            QuerySpec::Entries { query } => {
                self.catalog
                    .search_entries(query, &self.lang, offset, self.page_size)
                    .await?
            }
            QuerySpec::Songs {
                query,
                sort,
                artist_id,
                originals_only,
            } => {
                self.catalog
                    .search_songs(
                        query,
                        &self.lang,
                        *sort,
                        *artist_id,
                        *originals_only,
                        offset,
                        self.page_size,
                    )
                    .await?
            }
            QuerySpec::Artists { query } => {
                self.catalog
                    .search_artists(query, &self.lang, offset, self.page_size)
                    .await?
            }
            QuerySpec::Albums {
                query,
                sort,
                artist_id,
            } => {
                self.catalog
                    .search_albums(query, &self.lang, *sort, *artist_id, offset, self.page_size)
                    .await?
            }
            full_set => unreachable!("full-set spec {full_set:?} handled above"),
        };

        let items: Vec<Entry> = found
            .items
            .into_iter()
            .filter_map(RawEntry::into_entry)
            .collect();
        debug!(spec = ?self.spec, offset, total = found.total_count, "search page fetched");
        Ok(PageResult {
            items,
            range_start: offset,
            total_count: found.total_count,
            tag: self.spec.tag(),
        })
    }

    async fn fetch_full_set(&self) -> Result<FullSet, CatalogError> {
        match &self.spec {
            QuerySpec::DerivedSongs { song_id } => Ok(FullSet::Flat(
                self.catalog.derived_songs(*song_id, &self.lang).await?,
            )),
            QuerySpec::RelatedSongs { song_id } => Ok(FullSet::Related(
                self.catalog.related_songs(*song_id, &self.lang).await?,
            )),
            QuerySpec::AlbumsBySong { song_id } => Ok(FullSet::Flat(
                self.catalog.albums_for_song(*song_id, &self.lang).await?,
            )),
            spec => unreachable!("search spec {spec:?} has no full set"),
        }
    }
}

/// Client-side slice of a full result set.
fn slice_page(entries: &[Entry], page_index: u32, page_size: usize, tag: ResultTag) -> PageResult {
    let start = (page_index as usize - 1) * page_size;
    let end = (start + page_size).min(entries.len());
    let items = if start < entries.len() {
        entries[start..end].to_vec()
    } else {
        Vec::new()
    };
    PageResult {
        items,
        range_start: start,
        total_count: entries.len(),
        tag,
    }
}

/// One item per match category per page, in artist/like/tag order. The zip
/// stops at the shortest category: `total_count` is three times its length
/// and later items in the longer categories are never surfaced.
fn zip_related(lists: &RelatedLists, page_index: u32) -> PageResult {
    let smallest = lists
        .artist_matches
        .len()
        .min(lists.like_matches.len())
        .min(lists.tag_matches.len());
    let idx = page_index as usize - 1;
    let items = if idx < smallest {
        vec![
            lists.artist_matches[idx].clone(),
            lists.like_matches[idx].clone(),
            lists.tag_matches[idx].clone(),
        ]
    } else {
        Vec::new()
    };
    PageResult {
        items,
        range_start: idx * RELATED_CATEGORIES,
        total_count: smallest * RELATED_CATEGORIES,
        tag: ResultTag::Related,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SongEntry;

    fn song(id: u64) -> Entry {
        Entry::Song(SongEntry {
            id,
            name: format!("song {id}"),
            song_type: "Original".to_string(),
            artist_string: None,
            favorited_times: None,
            pv_services: None,
            main_picture: None,
        })
    }

    #[test]
    fn test_page_math() {
        assert_eq!(current_page(0, 3), 1);
        assert_eq!(current_page(6, 3), 3);
        assert_eq!(last_page(7, 3), 3);
        assert_eq!(last_page(0, 3), 0);
        assert_eq!(last_page(9, 3), 3);
    }

    #[test]
    fn test_query_spec_tags() {
        assert_eq!(
            QuerySpec::search(SearchKind::All, "miku", false).tag(),
            ResultTag::Search
        );
        assert_eq!(QuerySpec::DerivedSongs { song_id: 1 }.tag(), ResultTag::Derived);
        assert_eq!(QuerySpec::RelatedSongs { song_id: 1 }.tag(), ResultTag::Related);
        assert_eq!(
            QuerySpec::AlbumsBySong { song_id: 1 }.tag(),
            ResultTag::AlbumsBySong
        );
    }

    #[test]
    fn test_slice_page_bounds() {
        let entries: Vec<Entry> = (1..=7).map(song).collect();

        let page = slice_page(&entries, 1, 3, ResultTag::Derived);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.range_start, 0);
        assert_eq!(page.total_count, 7);

        let page = slice_page(&entries, 3, 3, ResultTag::Derived);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.range_start, 6);

        // Past the end: empty, total intact
        let page = slice_page(&entries, 4, 3, ResultTag::Derived);
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 7);
    }

    #[test]
    fn test_zip_related_stops_at_shortest_category() {
        let lists = RelatedLists {
            artist_matches: (1..=5).map(song).collect(),
            like_matches: (10..=11).map(song).collect(),
            tag_matches: (20..=23).map(song).collect(),
        };

        let page = zip_related(&lists, 1);
        assert_eq!(page.total_count, 6);
        assert_eq!(
            page.items.iter().map(Entry::id).collect::<Vec<_>>(),
            vec![1, 10, 20]
        );

        let page = zip_related(&lists, 2);
        assert_eq!(
            page.items.iter().map(Entry::id).collect::<Vec<_>>(),
            vec![2, 11, 21]
        );

        // likeMatches exhausted: empty page even though the other two
        // categories still have items
        let page = zip_related(&lists, 3);
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 6);
    }

    #[test]
    fn test_zip_related_empty_category_empties_the_set() {
        let lists = RelatedLists {
            artist_matches: (1..=5).map(song).collect(),
            like_matches: Vec::new(),
            tag_matches: (20..=23).map(song).collect(),
        };
        let page = zip_related(&lists, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
    }
}
