//! Catalog API client.
//!
//! The catalog is a read-only REST service: offset-paged search endpoints
//! returning `{items, totalCount}` envelopes, per-entity detail lookups,
//! and three full-set lookups (derived songs, related songs, albums
//! featuring a song) that do not support offset paging upstream.
//!
//! Everything user-visible that comes out of this module has already had
//! `<` and `>` entity-escaped, so names can be embedded in HTML messages
//! without further processing.

use async_trait::async_trait;
use tracing::warn;

use crate::config::BotConfig;
use crate::errors::CatalogError;
use crate::model::{
    AlbumDetail, ArtistDetail, Entry, FoundPage, RawEntry, RelatedLists, RelatedSets, SongDetail,
};

/// Sort orders accepted by the song search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SongSort {
    /// Most-favourited first (the default browse order)
    FavoritedTimes,
    /// Newest additions first
    AdditionDate,
    /// Best-rated first
    RatingScore,
}

impl SongSort {
    pub fn as_str(self) -> &'static str {
        match self {
            SongSort::FavoritedTimes => "FavoritedTimes",
            SongSort::AdditionDate => "AdditionDate",
            SongSort::RatingScore => "RatingScore",
        }
    }
}

/// Sort orders accepted by the album search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AlbumSort {
    NameThenReleaseDate,
    RatingAverage,
    ReleaseDate,
}

impl AlbumSort {
    pub fn as_str(self) -> &'static str {
        match self {
            AlbumSort::NameThenReleaseDate => "NameThenReleaseDate",
            AlbumSort::RatingAverage => "RatingAverage",
            AlbumSort::ReleaseDate => "ReleaseDate",
        }
    }
}

/// Read-only view of the catalog API. All calls are idempotent.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn search_entries(
        &self,
        query: &str,
        lang: &str,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError>;

    #[allow(clippy::too_many_arguments)]
    async fn search_songs(
        &self,
        query: &str,
        lang: &str,
        sort: SongSort,
        artist_id: Option<u64>,
        originals_only: bool,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError>;

    async fn search_artists(
        &self,
        query: &str,
        lang: &str,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError>;

    async fn search_albums(
        &self,
        query: &str,
        lang: &str,
        sort: AlbumSort,
        artist_id: Option<u64>,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError>;

    /// Full derived-songs set for one song; no upstream paging.
    async fn derived_songs(&self, song_id: u64, lang: &str) -> Result<Vec<Entry>, CatalogError>;

    /// The three ranked related-song categories; no upstream paging.
    async fn related_songs(&self, song_id: u64, lang: &str)
        -> Result<RelatedLists, CatalogError>;

    /// Full set of albums featuring one song; no upstream paging.
    async fn albums_for_song(&self, song_id: u64, lang: &str)
        -> Result<Vec<Entry>, CatalogError>;

    async fn song(&self, id: u64, lang: &str) -> Result<Option<SongDetail>, CatalogError>;

    async fn artist(&self, id: u64, lang: &str) -> Result<Option<ArtistDetail>, CatalogError>;

    async fn album(&self, id: u64, lang: &str) -> Result<Option<AlbumDetail>, CatalogError>;
}

/// HTTP implementation of [`CatalogService`].
pub struct HttpCatalog {
    http: reqwest::Client,
    api_base: String,
}

impl HttpCatalog {
    pub fn new(api_base: &str, config: &BotConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("tunebot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// GET a JSON payload. 404 maps to `Ok(None)`; the response body is
    /// angle-bracket-escaped before parsing so names stay HTML-safe.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, CatalogError> {
        let url = format!("{}/{}", self.api_base, path);
        let response = self.http.get(&url).query(params).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            warn!(%url, "catalog returned 404");
            return Ok(None);
        }
        let body = response.error_for_status()?.text().await?;
        let parsed = serde_json::from_str(&escape_angle_brackets(&body))?;
        Ok(Some(parsed))
    }

    async fn search(
        &self,
        endpoint: &str,
        mut params: Vec<(&str, String)>,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        params.push(("start", offset.to_string()));
        params.push(("maxResults", limit.to_string()));
        params.push(("nameMatchMode", "Auto".to_string()));
        params.push(("getTotalCount", "true".to_string()));
        let page = self.get_json::<FoundPage>(endpoint, &params).await?;
        Ok(page.unwrap_or_else(|| FoundPage {
            items: Vec::new(),
            total_count: 0,
        }))
    }
}

#[async_trait]
impl CatalogService for HttpCatalog {
    async fn search_entries(
        &self,
        query: &str,
        lang: &str,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        let params = vec![
            ("query", query.to_string()),
            ("lang", lang.to_string()),
            ("fields", "MainPicture, Names, PVs".to_string()),
            ("sort", "Name".to_string()),
        ];
        self.search("entries", params, offset, limit).await
    }

    async fn search_songs(
        &self,
        query: &str,
        lang: &str,
        sort: SongSort,
        artist_id: Option<u64>,
        originals_only: bool,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("lang", lang.to_string()),
            ("fields", "MainPicture, Names, Artists".to_string()),
            ("sort", sort.as_str().to_string()),
            ("preferAccurateMatches", "true".to_string()),
        ];
        if let Some(id) = artist_id {
            params.push(("artistId", id.to_string()));
        }
        if originals_only {
            params.push(("onlyOriginalVersions", "true".to_string()));
        }
        self.search("songs", params, offset, limit).await
    }

    async fn search_artists(
        &self,
        query: &str,
        lang: &str,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        let params = vec![
            ("query", query.to_string()),
            ("lang", lang.to_string()),
            ("fields", "MainPicture, Names".to_string()),
            ("sort", "FollowerCount".to_string()),
            ("preferAccurateMatches", "true".to_string()),
        ];
        self.search("artists", params, offset, limit).await
    }

    async fn search_albums(
        &self,
        query: &str,
        lang: &str,
        sort: AlbumSort,
        artist_id: Option<u64>,
        offset: usize,
        limit: usize,
    ) -> Result<FoundPage, CatalogError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("lang", lang.to_string()),
            ("fields", "MainPicture, Names".to_string()),
            ("sort", sort.as_str().to_string()),
            ("preferAccurateMatches", "true".to_string()),
        ];
        if let Some(id) = artist_id {
            params.push(("artistId", id.to_string()));
        }
        self.search("albums", params, offset, limit).await
    }

    async fn derived_songs(&self, song_id: u64, lang: &str) -> Result<Vec<Entry>, CatalogError> {
        let params = vec![
            ("fields", "MainPicture".to_string()),
            ("lang", lang.to_string()),
        ];
        let items: Option<Vec<RawEntry>> = self
            .get_json(&format!("songs/{song_id}/derived"), &params)
            .await?;
        Ok(items
            .unwrap_or_default()
            .into_iter()
            .filter_map(RawEntry::into_entry)
            .collect())
    }

    async fn related_songs(
        &self,
        song_id: u64,
        lang: &str,
    ) -> Result<RelatedLists, CatalogError> {
        let params = vec![
            ("fields", "MainPicture".to_string()),
            ("lang", lang.to_string()),
        ];
        let sets: Option<RelatedSets> = self
            .get_json(&format!("songs/{song_id}/related"), &params)
            .await?;
        Ok(sets.unwrap_or_default().into_lists())
    }

    async fn albums_for_song(
        &self,
        song_id: u64,
        lang: &str,
    ) -> Result<Vec<Entry>, CatalogError> {
        let params = vec![
            ("fields", "MainPicture".to_string()),
            ("lang", lang.to_string()),
        ];
        let items: Option<Vec<RawEntry>> = self
            .get_json(&format!("songs/{song_id}/albums"), &params)
            .await?;
        Ok(items
            .unwrap_or_default()
            .into_iter()
            .filter_map(RawEntry::into_entry)
            .collect())
    }

    async fn song(&self, id: u64, lang: &str) -> Result<Option<SongDetail>, CatalogError> {
        let params = vec![
            ("fields", "MainPicture, Names, Lyrics, Artists, PVs".to_string()),
            ("lang", lang.to_string()),
        ];
        self.get_json(&format!("songs/{id}"), &params).await
    }

    async fn artist(&self, id: u64, lang: &str) -> Result<Option<ArtistDetail>, CatalogError> {
        let params = vec![
            ("fields", "MainPicture, Names".to_string()),
            ("lang", lang.to_string()),
        ];
        self.get_json(&format!("artists/{id}"), &params).await
    }

    async fn album(&self, id: u64, lang: &str) -> Result<Option<AlbumDetail>, CatalogError> {
        let params = vec![
            ("fields", "MainPicture, Names, Discs, Tracks".to_string()),
            ("lang", lang.to_string()),
        ];
        self.get_json(&format!("albums/{id}"), &params).await
    }
}

/// Entity-escape angle brackets in a raw JSON body. The brackets only ever
/// occur inside string values, so a plain text replacement is safe and
/// keeps every downstream name embeddable in HTML.
fn escape_angle_brackets(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}
