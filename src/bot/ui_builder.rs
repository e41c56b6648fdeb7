//! UI Builder module: turns page results and detail payloads into HTML
//! message content and inline keyboards.
//!
//! The pagination controller treats everything produced here as opaque; it
//! only forwards content to the transport. Paging controls are derived
//! fresh on every render from the page's range/total, never stored.

use std::collections::BTreeMap;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::localization::{t_args_lang, t_lang};
use crate::model::{AlbumDetail, ArtistDetail, ArtistRole, Entry, LocalizedName, SongDetail};
use crate::paging::{current_page, last_page, PageResult, ResultTag};

/// PV services the song keyboard knows how to label, in display order.
pub const PV_SERVICES: &[&str] = &[
    "SoundCloud",
    "Youtube",
    "NicoNicoDouga",
    "Piapro",
    "Vimeo",
    "Bilibili",
];

/// Callback payload of an inert paging control. Taps are acknowledged and
/// otherwise ignored.
pub const NOOP_CALLBACK: &str = "page";

/// Command link that opens the detail view for an entry.
pub fn entry_command(entry: &Entry) -> String {
    match entry {
        Entry::Song(song) => format!("/info_{}", song.id),
        Entry::Artist(artist) => format!("/ar_{}", artist.id),
        Entry::Album(album) => format!("/al_{}", album.id),
    }
}

fn web_url(web_base: &str, kind: &str, id: u64) -> String {
    format!("{}/{}/{}", web_base.trim_end_matches('/'), kind, id)
}

/// One rendered entry block.
pub fn format_entry(entry: &Entry, lang: Option<&str>) -> String {
    match entry {
        Entry::Song(song) => {
            let mut text = t_args_lang(
                "entry-song",
                &[
                    ("name", song.name.as_str()),
                    ("artist", song.artist_string.as_deref().unwrap_or("?")),
                    ("type", song.song_type.as_str()),
                ],
                lang,
            );
            if let Some(count) = song.favorited_times {
                text.push(' ');
                text.push_str(&t_args_lang(
                    "entry-song-favourites",
                    &[("count", count.to_string().as_str())],
                    lang,
                ));
            }
            text
        }
        Entry::Artist(artist) => t_args_lang(
            "entry-artist",
            &[
                ("name", artist.name.as_str()),
                ("type", artist.artist_type.as_str()),
            ],
            lang,
        ),
        Entry::Album(album) => t_args_lang(
            "entry-album",
            &[
                ("name", album.name.as_str()),
                ("artist", album.artist_string.as_deref().unwrap_or("?")),
                ("type", album.disc_type.as_str()),
            ],
            lang,
        ),
    }
}

/// Render one page of browse results, including the result-count footer.
/// Empty pages render the tag's not-found message instead.
pub fn format_page(result: &PageResult, page_size: usize, lang: Option<&str>) -> String {
    if result.items.is_empty() {
        let key = match result.tag {
            ResultTag::Search => "not-found-search",
            ResultTag::Derived => "not-found-derived",
            ResultTag::Related => "not-found-related",
            ResultTag::AlbumsBySong => "not-found-albums",
        };
        return t_lang(key, lang);
    }

    let mut blocks = Vec::with_capacity(result.items.len());
    for (i, entry) in result.items.iter().enumerate() {
        let mut block = String::new();
        if result.tag == ResultTag::Related {
            // Position within a related page is the match category
            let header = match i {
                0 => "related-artist-match",
                1 => "related-like-match",
                _ => "related-tag-match",
            };
            block.push_str(&t_lang(header, lang));
            block.push('\n');
        }
        block.push_str(&format_entry(entry, lang));
        block.push('\n');
        block.push_str(&t_args_lang(
            "entry-info-hint",
            &[("link", entry_command(entry).as_str())],
            lang,
        ));
        blocks.push(block);
    }

    let mut text = blocks.join("\n\n");
    let page = current_page(result.range_start, page_size);
    let pages = last_page(result.total_count, page_size).max(1);
    text.push_str("\n\n");
    text.push_str(&t_args_lang(
        "found-counts",
        &[
            ("total", result.total_count.to_string().as_str()),
            ("page", page.to_string().as_str()),
            ("pages", pages.to_string().as_str()),
        ],
        lang,
    ));
    text
}

/// The five-button paging row: First / Previous / •current• / Next / Last.
///
/// Controls that cannot move (already on the first or last page) are
/// rendered inert so every tap still gets an acknowledgment without firing
/// a fetch. An empty result set gets no keyboard at all.
pub fn paging_keyboard(
    key: &str,
    result: &PageResult,
    page_size: usize,
    lang: Option<&str>,
) -> Option<InlineKeyboardMarkup> {
    if result.total_count == 0 {
        return None;
    }

    let cur = current_page(result.range_start, page_size);
    let last = last_page(result.total_count, page_size).max(1);

    let active = |label: String, page: u32| {
        InlineKeyboardButton::callback(label, format!("page|{key}|{page}"))
    };
    let inert = || InlineKeyboardButton::callback(" ", NOOP_CALLBACK);

    let row = vec![
        if cur > 1 {
            active(t_lang("btn-first", lang), 1)
        } else {
            inert()
        },
        if cur > 1 {
            active(t_lang("btn-previous", lang), cur - 1)
        } else {
            inert()
        },
        InlineKeyboardButton::callback(format!("•{cur}•"), NOOP_CALLBACK),
        if cur < last {
            active(t_lang("btn-next", lang), cur + 1)
        } else {
            inert()
        },
        if cur < last {
            active(t_lang("btn-last", lang), last)
        } else {
            inert()
        },
    ];

    Some(InlineKeyboardMarkup::new(vec![row]))
}

fn names_text(names: &[LocalizedName], primary: &str, lang: Option<&str>) -> String {
    if names.len() > 1 {
        let mut text = t_lang("additional-names", lang);
        for name in names {
            if name.value != primary {
                text.push('\n');
                text.push_str(&name.value);
            }
        }
        text
    } else {
        t_lang("no-additional-names", lang)
    }
}

fn artists_text(artists: &[ArtistRole], inline: bool, lang: Option<&str>) -> String {
    if artists.is_empty() {
        return t_lang("no-artists", lang);
    }
    let mut text = t_lang("artists-header", lang);
    for role in artists {
        let mut tags: Vec<String> = Vec::new();
        for part in role
            .effective_roles
            .as_deref()
            .unwrap_or("Default")
            .split(", ")
        {
            let source = if part == "Default" {
                role.categories.as_deref().unwrap_or("")
            } else {
                part
            };
            tags.push(source.chars().take(2).collect());
        }
        text.push('\n');
        text.push_str(&format!(
            "[<code>{}</code>] {}",
            tags.join(","),
            role.name.as_deref().unwrap_or("?")
        ));
        if !inline {
            if let Some(artist) = &role.artist {
                text.push_str(&format!(" /ar_{}", artist.id));
            }
        }
    }
    text
}

/// Full song detail view.
pub fn format_song_detail(song: &SongDetail, inline: bool, lang: Option<&str>) -> String {
    let mut text = format_entry(
        &Entry::Song(crate::model::SongEntry {
            id: song.id,
            name: song.name.clone(),
            song_type: song.song_type.clone(),
            artist_string: song.artist_string.clone(),
            favorited_times: song.favorited_times,
            pv_services: song.pv_services.clone(),
            main_picture: None,
        }),
        lang,
    );

    text.push_str("\n\n");
    text.push_str(&names_text(&song.names, &song.name, lang));
    text.push('\n');

    if !inline {
        text.push('\n');
        text.push_str(&t_args_lang(
            "derived-hint",
            &[("link", format!("/dev_{}", song.id).as_str())],
            lang,
        ));
        text.push('\n');
        text.push_str(&t_args_lang(
            "related-hint",
            &[("link", format!("/rel_{}", song.id).as_str())],
            lang,
        ));
        text.push('\n');
        text.push_str(&t_args_lang(
            "featured-hint",
            &[("link", format!("/albys_{}", song.id).as_str())],
            lang,
        ));
        if let Some(original) = song.original_version_id {
            text.push_str("\n\n");
            text.push_str(&t_args_lang(
                "original-song-hint",
                &[("link", format!("/info_{original}").as_str())],
                lang,
            ));
        }
        text.push_str("\n\n");
        text.push_str(&artists_text(&song.artists, inline, lang));
    }

    if song.pv_services.as_deref() == Some("Nothing") {
        text.push('\n');
        text.push_str(&t_lang("no-pvs", lang));
    }

    text
}

/// Full artist detail view.
pub fn format_artist_detail(artist: &ArtistDetail, lang: Option<&str>) -> String {
    let mut text = t_args_lang(
        "entry-artist",
        &[
            ("name", artist.name.as_str()),
            ("type", artist.artist_type.as_str()),
        ],
        lang,
    );
    text.push_str("\n\n");
    text.push_str(&names_text(&artist.names, &artist.name, lang));
    if let Some(base) = &artist.base_voicebank {
        text.push_str("\n\n");
        text.push_str(&t_args_lang(
            "base-voicebank-hint",
            &[("link", format!("/ar_{}", base.id).as_str())],
            lang,
        ));
    }
    text
}

/// Full album detail view.
pub fn format_album_detail(album: &AlbumDetail, lang: Option<&str>) -> String {
    let mut text = t_args_lang(
        "entry-album",
        &[
            ("name", album.name.as_str()),
            ("artist", album.artist()),
            ("type", album.disc_type.as_str()),
        ],
        lang,
    );
    text.push_str("\n\n");
    text.push_str(&names_text(&album.names, &album.name, lang));
    if let Some(date) = &album.release_date {
        if !date.is_empty {
            if let Some(formatted) = &date.formatted {
                text.push_str("\n\n");
                text.push_str(&t_args_lang(
                    "release-date",
                    &[("date", formatted.as_str())],
                    lang,
                ));
            }
        }
    }
    text
}

/// Track listing grouped by disc.
pub fn format_album_tracks(album: &AlbumDetail, lang: Option<&str>) -> String {
    let mut text = t_args_lang(
        "tracks-header",
        &[("album", album.name.as_str()), ("artist", album.artist())],
        lang,
    );

    let mut discs: BTreeMap<u32, Vec<&crate::model::Track>> = BTreeMap::new();
    for track in &album.tracks {
        discs.entry(track.disc_number).or_default().push(track);
    }
    let multi_disc = discs.len() > 1;

    for (disc_number, tracks) in discs {
        if multi_disc {
            text.push_str("\n\n");
            text.push_str(&t_args_lang(
                "disc-header",
                &[("disc", disc_number.to_string().as_str())],
                lang,
            ));
        }
        for track in tracks {
            let name = track
                .song
                .as_ref()
                .map(|song| song.name.as_str())
                .or(track.name.as_deref())
                .unwrap_or("?");
            let artist = track
                .song
                .as_ref()
                .and_then(|song| song.artist_string.as_deref())
                .unwrap_or("?");
            text.push('\n');
            text.push_str(&t_args_lang(
                "track-line",
                &[
                    ("number", track.track_number.to_string().as_str()),
                    ("name", name),
                    ("artist", artist),
                ],
                lang,
            ));
            if let Some(song) = &track.song {
                text.push_str(&format!(" /info_{}", song.id));
            }
        }
    }
    text
}

fn url_button(label: String, url: &str) -> Option<InlineKeyboardButton> {
    url.parse::<reqwest::Url>()
        .ok()
        .map(|url| InlineKeyboardButton::url(label, url))
}

/// Keyboard under a song detail view: lyrics, one button per known PV
/// service, share, and a web link.
pub fn song_keyboard(song: &SongDetail, web_base: &str, lang: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![InlineKeyboardButton::callback(
        t_lang("btn-lyrics", lang),
        format!("ly|{}", song.id),
    )]];

    let services = song.pv_service_list();
    let mut pv_row = Vec::new();
    for service in PV_SERVICES {
        if services.iter().any(|s| s == service) {
            pv_row.push(InlineKeyboardButton::callback(
                format!("🎬{service}"),
                format!("pv|{}|{}", song.id, service),
            ));
        }
    }
    if !pv_row.is_empty() {
        rows.push(pv_row);
    }

    let mut share_row = vec![InlineKeyboardButton::switch_inline_query(
        t_lang("btn-share-song", lang),
        format!("!s#{}", song.id),
    )];
    if let Some(button) = url_button(t_lang("btn-open-web", lang), &web_url(web_base, "S", song.id))
    {
        share_row.push(button);
    }
    rows.push(share_row);

    InlineKeyboardMarkup::new(rows)
}

/// Language picker for a song's lyrics, one button per translation.
pub fn lyrics_keyboard(song: &SongDetail) -> InlineKeyboardMarkup {
    let row: Vec<InlineKeyboardButton> = song
        .lyrics
        .iter()
        .map(|lyric| {
            InlineKeyboardButton::callback(
                lyric.label().to_string(),
                format!("ly|{}|{}", song.id, lyric.id),
            )
        })
        .collect();
    InlineKeyboardMarkup::new(vec![row])
}

/// Keyboard under an artist detail view. The browse buttons (popular and
/// latest songs/albums) are omitted in inline messages.
pub fn artist_keyboard(
    artist_id: u64,
    web_base: &str,
    inline: bool,
    lang: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if !inline {
        rows.push(vec![
            InlineKeyboardButton::callback(
                t_lang("btn-popular-songs", lang),
                format!("arlist|ps|{artist_id}"),
            ),
            InlineKeyboardButton::callback(
                t_lang("btn-latest-songs", lang),
                format!("arlist|ls|{artist_id}"),
            ),
        ]);
        rows.push(vec![
            InlineKeyboardButton::callback(
                t_lang("btn-popular-albums", lang),
                format!("arlist|pa|{artist_id}"),
            ),
            InlineKeyboardButton::callback(
                t_lang("btn-latest-albums", lang),
                format!("arlist|la|{artist_id}"),
            ),
        ]);
    }

    let mut share_row = vec![InlineKeyboardButton::switch_inline_query(
        t_lang("btn-share-artist", lang),
        format!("!ar#{artist_id}"),
    )];
    if let Some(button) = url_button(t_lang("btn-open-web", lang), &web_url(web_base, "Ar", artist_id)) {
        share_row.push(button);
    }
    rows.push(share_row);

    InlineKeyboardMarkup::new(rows)
}

/// Keyboard under an album detail view: track listing, share, web link.
pub fn album_keyboard(album_id: u64, web_base: &str, lang: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![InlineKeyboardButton::callback(
        t_lang("btn-tracks", lang),
        format!("allist|{album_id}"),
    )]];

    let mut share_row = vec![InlineKeyboardButton::switch_inline_query(
        t_lang("btn-share-album", lang),
        format!("!al#{album_id}"),
    )];
    if let Some(button) = url_button(t_lang("btn-open-web", lang), &web_url(web_base, "Al", album_id)) {
        share_row.push(button);
    }
    rows.push(share_row);

    InlineKeyboardMarkup::new(rows)
}

/// Keyboard attached to an inline result article, built from a bare search
/// entry rather than a full detail payload.
pub fn entry_keyboard(entry: &Entry, web_base: &str, lang: Option<&str>) -> InlineKeyboardMarkup {
    match entry {
        Entry::Song(song) => {
            let mut rows = vec![vec![InlineKeyboardButton::callback(
                t_lang("btn-lyrics", lang),
                format!("ly|{}", song.id),
            )]];
            let mut share_row = vec![InlineKeyboardButton::switch_inline_query(
                t_lang("btn-share-song", lang),
                format!("!s#{}", song.id),
            )];
            if let Some(button) =
                url_button(t_lang("btn-open-web", lang), &web_url(web_base, "S", song.id))
            {
                share_row.push(button);
            }
            rows.push(share_row);
            InlineKeyboardMarkup::new(rows)
        }
        Entry::Artist(artist) => artist_keyboard(artist.id, web_base, true, lang),
        Entry::Album(album) => album_keyboard(album.id, web_base, lang),
    }
}

/// Top-level settings keyboard, two buttons per row.
pub fn settings_keyboard(lang: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback(t_lang("btn-change-catalog", lang), "cfg|catalog"),
            InlineKeyboardButton::callback(t_lang("btn-change-originals", lang), "cfg|originals"),
        ],
        vec![InlineKeyboardButton::callback(
            t_lang("btn-change-interface", lang),
            "cfg|interface",
        )],
    ])
}

/// Option picker for one setting; `None` when the setting name is unknown
/// (stale keyboards from old bot versions).
pub fn settings_options_keyboard(name: &str, lang: Option<&str>) -> Option<InlineKeyboardMarkup> {
    let row = match name {
        "catalog" => crate::settings::CatalogLang::ALL
            .iter()
            .map(|value| {
                InlineKeyboardButton::callback(
                    t_lang(
                        &format!("lang-{}", value.as_str().to_lowercase()),
                        lang,
                    ),
                    format!("cfgv|catalog|{}", value.as_str()),
                )
            })
            .collect(),
        "originals" => vec![
            InlineKeyboardButton::callback(t_lang("enabled", lang), "cfgv|originals|true"),
            InlineKeyboardButton::callback(t_lang("disabled", lang), "cfgv|originals|false"),
        ],
        "interface" => vec![InlineKeyboardButton::callback(
            t_lang("lang-en", lang),
            "cfgv|interface|en",
        )],
        _ => return None,
    };
    Some(InlineKeyboardMarkup::new(vec![row]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::init_localization;
    use crate::model::SongEntry;

    fn song(id: u64) -> Entry {
        Entry::Song(SongEntry {
            id,
            name: format!("song {id}"),
            song_type: "Original".to_string(),
            artist_string: Some("producer".to_string()),
            favorited_times: Some(7),
            pv_services: None,
            main_picture: None,
        })
    }

    fn page(count: usize, range_start: usize, total: usize) -> PageResult {
        PageResult {
            items: (0..count).map(|i| song(i as u64 + 1)).collect(),
            range_start,
            total_count: total,
            tag: ResultTag::Search,
        }
    }

    fn button_data(kb: &InlineKeyboardMarkup, idx: usize) -> String {
        match &kb.inline_keyboard[0][idx].kind {
            teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
            other => panic!("unexpected button kind: {other:?}"),
        }
    }

    #[test]
    fn test_no_keyboard_for_empty_results() {
        init_localization().unwrap();
        assert!(paging_keyboard("k", &page(0, 0, 0), 3, None).is_none());
    }

    #[test]
    fn test_first_page_disables_backward_controls() {
        init_localization().unwrap();
        let kb = paging_keyboard("k", &page(3, 0, 7), 3, None).unwrap();
        assert_eq!(button_data(&kb, 0), NOOP_CALLBACK);
        assert_eq!(button_data(&kb, 1), NOOP_CALLBACK);
        assert_eq!(button_data(&kb, 2), NOOP_CALLBACK);
        assert_eq!(button_data(&kb, 3), "page|k|2");
        assert_eq!(button_data(&kb, 4), "page|k|3");
    }

    #[test]
    fn test_last_page_disables_forward_controls() {
        init_localization().unwrap();
        let kb = paging_keyboard("k", &page(1, 6, 7), 3, None).unwrap();
        assert_eq!(button_data(&kb, 0), "page|k|1");
        assert_eq!(button_data(&kb, 1), "page|k|2");
        assert_eq!(button_data(&kb, 3), NOOP_CALLBACK);
        assert_eq!(button_data(&kb, 4), NOOP_CALLBACK);
    }

    #[test]
    fn test_middle_page_enables_everything() {
        init_localization().unwrap();
        let kb = paging_keyboard("k", &page(3, 3, 9), 3, None).unwrap();
        assert_eq!(button_data(&kb, 0), "page|k|1");
        assert_eq!(button_data(&kb, 1), "page|k|1");
        assert_eq!(button_data(&kb, 3), "page|k|3");
        assert_eq!(button_data(&kb, 4), "page|k|3");
    }

    #[test]
    fn test_callback_payload_fits_platform_budget() {
        init_localization().unwrap();
        // Real keys are 32-char hex tokens
        let key = "a".repeat(32);
        let kb = paging_keyboard(&key, &page(3, 300_000, 3_000_000), 3, None).unwrap();
        for row in &kb.inline_keyboard {
            for button in row {
                if let teloxide::types::InlineKeyboardButtonKind::CallbackData(data) = &button.kind
                {
                    assert!(data.len() <= 64, "payload too long: {data}");
                }
            }
        }
    }

    #[test]
    fn test_format_page_footer_and_links() {
        init_localization().unwrap();
        let text = format_page(&page(3, 0, 7), 3, None);
        assert!(text.contains("song 1"));
        assert!(text.contains("/info_1"));
        assert!(text.contains("Found 7 total"));
        assert!(text.contains("page 1/3"));
        assert!(text.contains("with 7 favourites"));
    }

    #[test]
    fn test_format_page_empty_states() {
        init_localization().unwrap();
        let mut empty = page(0, 0, 0);
        assert!(format_page(&empty, 3, None).contains("couldn't find"));
        empty.tag = ResultTag::Derived;
        assert_eq!(format_page(&empty, 3, None), "No derived songs found.");
        empty.tag = ResultTag::Related;
        assert_eq!(format_page(&empty, 3, None), "No related songs found.");
        empty.tag = ResultTag::AlbumsBySong;
        assert_eq!(format_page(&empty, 3, None), "Not featured on any albums.");
    }

    #[test]
    fn test_related_page_carries_category_headers() {
        init_localization().unwrap();
        let mut result = page(3, 0, 6);
        result.tag = ResultTag::Related;
        let text = format_page(&result, 3, None);
        assert!(text.contains("Matching artist"));
        assert!(text.contains("Matching likes"));
        assert!(text.contains("Matching tags"));
    }
}
