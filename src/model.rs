//! Catalog data model: the searchable entry union and per-entity detail
//! payloads.
//!
//! The catalog API classifies items by which type field they carry
//! (`songType` / `artistType` / `discType`). We model that as a proper
//! tagged union so rendering can match exhaustively instead of probing for
//! keys. Items that fit none of the variants are dropped per-item rather
//! than failing the page they arrived in.

use serde::{Deserialize, Serialize};

/// One searchable result item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Song(SongEntry),
    Artist(ArtistEntry),
    Album(AlbumEntry),
}

impl Entry {
    pub fn id(&self) -> u64 {
        match self {
            Entry::Song(s) => s.id,
            Entry::Artist(a) => a.id,
            Entry::Album(a) => a.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Song(s) => &s.name,
            Entry::Artist(a) => &a.name,
            Entry::Album(a) => &a.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongEntry {
    pub id: u64,
    pub name: String,
    /// Variant discriminator, e.g. "Original" or "Cover"
    pub song_type: String,
    #[serde(default)]
    pub artist_string: Option<String>,
    #[serde(default)]
    pub favorited_times: Option<u64>,
    /// Comma-separated list of PV services, "Nothing" when none
    #[serde(default)]
    pub pv_services: Option<String>,
    #[serde(default)]
    pub main_picture: Option<Picture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistEntry {
    pub id: u64,
    pub name: String,
    /// Variant discriminator, e.g. "Producer" or "Vocaloid"
    pub artist_type: String,
    #[serde(default)]
    pub main_picture: Option<Picture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumEntry {
    pub id: u64,
    pub name: String,
    /// Variant discriminator, e.g. "Album" or "Single"
    pub disc_type: String,
    #[serde(default)]
    pub artist_string: Option<String>,
    #[serde(default)]
    pub main_picture: Option<Picture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    #[serde(default)]
    pub url_thumb: Option<String>,
}

/// Raw search item as it arrives from the API. The `Other` arm soaks up
/// stubs and unknown entry kinds so one odd item never poisons a page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    Song(SongEntry),
    Artist(ArtistEntry),
    Album(AlbumEntry),
    Other(serde_json::Value),
}

impl RawEntry {
    pub fn into_entry(self) -> Option<Entry> {
        match self {
            RawEntry::Song(s) => Some(Entry::Song(s)),
            RawEntry::Artist(a) => Some(Entry::Artist(a)),
            RawEntry::Album(a) => Some(Entry::Album(a)),
            RawEntry::Other(_) => None,
        }
    }
}

/// Search response envelope: one page of items plus the full result count.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundPage {
    #[serde(default)]
    pub items: Vec<RawEntry>,
    #[serde(default)]
    pub total_count: usize,
}

/// The three ranked match categories of a related-songs lookup, as they
/// arrive on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSets {
    #[serde(default)]
    pub artist_matches: Vec<RawEntry>,
    #[serde(default)]
    pub like_matches: Vec<RawEntry>,
    #[serde(default)]
    pub tag_matches: Vec<RawEntry>,
}

impl RelatedSets {
    pub fn into_lists(self) -> RelatedLists {
        let classify = |raw: Vec<RawEntry>| -> Vec<Entry> {
            raw.into_iter().filter_map(RawEntry::into_entry).collect()
        };
        RelatedLists {
            artist_matches: classify(self.artist_matches),
            like_matches: classify(self.like_matches),
            tag_matches: classify(self.tag_matches),
        }
    }
}

/// Classified related-songs categories, ready for the paging zip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelatedLists {
    pub artist_matches: Vec<Entry>,
    pub like_matches: Vec<Entry>,
    pub tag_matches: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongDetail {
    pub id: u64,
    pub name: String,
    pub song_type: String,
    #[serde(default)]
    pub artist_string: Option<String>,
    #[serde(default)]
    pub favorited_times: Option<u64>,
    #[serde(default)]
    pub pv_services: Option<String>,
    #[serde(default)]
    pub original_version_id: Option<u64>,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub lyrics: Vec<LyricsEntry>,
    #[serde(default, rename = "pVs")]
    pub pvs: Vec<PvEntry>,
    #[serde(default)]
    pub artists: Vec<ArtistRole>,
}

impl SongDetail {
    pub fn artist(&self) -> &str {
        self.artist_string.as_deref().unwrap_or("?")
    }

    /// PV services as reported by the API, falling back to the PV list for
    /// payloads that only carry `pVs` (the all-kinds search shape).
    pub fn pv_service_list(&self) -> Vec<String> {
        match self.pv_services.as_deref() {
            Some("Nothing") | Some("") | None => {
                self.pvs.iter().map(|pv| pv.service.clone()).collect()
            }
            Some(services) => services.split(", ").map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistDetail {
    pub id: u64,
    pub name: String,
    pub artist_type: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub base_voicebank: Option<EntityRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDetail {
    pub id: u64,
    pub name: String,
    pub disc_type: String,
    #[serde(default)]
    pub artist_string: Option<String>,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub release_date: Option<ReleaseDate>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl AlbumDetail {
    pub fn artist(&self) -> &str {
        self.artist_string.as_deref().unwrap_or("?")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedName {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsEntry {
    pub id: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub translation_type: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl LyricsEntry {
    pub fn label(&self) -> &str {
        self.language
            .as_deref()
            .filter(|l| !l.is_empty())
            .or(self.translation_type.as_deref())
            .unwrap_or("?")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvEntry {
    pub service: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRole {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub effective_roles: Option<String>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub artist: Option<EntityRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDate {
    #[serde(default)]
    pub is_empty: bool,
    #[serde(default)]
    pub formatted: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default = "default_disc_number")]
    pub disc_number: u32,
    pub track_number: u32,
    #[serde(default)]
    pub song: Option<SongEntry>,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_disc_number() -> u32 {
    1
}
