//! Inline query handler: kind-scoped searches, direct id lookups and
//! paging that rides the inline `offset` field as `<key>|<next_page>`.
//!
//! Inline browsing keeps its own session registry with a larger page size;
//! an expired key answers with zero results rather than erroring, since
//! inline queries have no way to show a notice.

use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardMarkup, InlineQueryResult, InlineQueryResultArticle, InputMessageContent,
    InputMessageContentText, ParseMode,
};
use tracing::{debug, warn};

use super::{ui_builder, App};
use crate::catalog::SongSort;
use crate::localization::t_args_lang;
use crate::model::Entry;
use crate::paging::{PageSource, QuerySpec, SearchKind};

/// `!s#123` style direct lookups.
static DIRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!(s|al|ar?)#(\d+)$").unwrap());

/// `!s query` style kind-scoped searches. `al` must come before `ar?` so
/// album queries are not parsed as artist queries.
static SCOPED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!(s|al|ar?) ?(.*)$").unwrap());

pub async fn inline_handler(bot: Bot, q: InlineQuery, app: Arc<App>) -> Result<()> {
    let scope = super::scope_for_user(&q.from);
    let settings = app.settings.get(scope);
    let lang_code = settings.interface_lang.clone();
    let lang = Some(lang_code.as_str());

    // A non-empty offset means the client is asking for another page of an
    // ongoing inline browse
    if !q.offset.is_empty() {
        return next_page(&bot, &q, &app, lang).await;
    }

    if let Some(caps) = DIRECT_RE.captures(&q.query) {
        let id: u64 = caps[2].parse().unwrap_or(0);
        let kind = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
        return direct_lookup(&bot, &q, &app, &kind, id, scope, lang).await;
    }

    let spec = if let Some(caps) = SCOPED_RE.captures(&q.query) {
        let kind = match &caps[1] {
            "s" => SearchKind::Songs,
            "al" => SearchKind::Albums,
            _ => SearchKind::Artists,
        };
        let query = caps.get(2).map(|m| m.as_str()).unwrap_or("").trim().to_string();
        QuerySpec::search(kind, &query, settings.originals_only)
    } else if q.query.is_empty() {
        // No query: browse the most popular songs
        QuerySpec::Songs {
            query: String::new(),
            sort: SongSort::FavoritedTimes,
            artist_id: None,
            originals_only: false,
        }
    } else {
        QuerySpec::Entries {
            query: q.query.clone(),
        }
    };

    debug!(user_id = %q.from.id, ?spec, "inline browse started");
    let source = Arc::new(PageSource::new(
        Arc::clone(&app.catalog),
        spec,
        settings.catalog_lang.as_str(),
        app.config.inline_page_size,
    ));
    let result = source.page(1).await;

    // Register a session only when there is more to page through
    let next_offset = if result.range_start + app.config.inline_page_size < result.total_count {
        let key = app.inline_sessions.create(Arc::clone(&source));
        format!("{key}|2")
    } else {
        String::new()
    };

    answer(&bot, &q, &app, &result.items, next_offset, lang).await
}

async fn next_page(bot: &Bot, q: &InlineQuery, app: &App, lang: Option<&str>) -> Result<()> {
    let Some((key, page)) = q.offset.split_once('|') else {
        warn!(offset = %q.offset, "malformed inline offset");
        return answer(bot, q, app, &[], String::new(), lang).await;
    };
    let page: u32 = page.parse().unwrap_or(1);

    let source = match app.inline_sessions.resolve(key) {
        Ok(source) => source,
        Err(_) => {
            debug!(user_id = %q.from.id, key, "inline paging key expired");
            return answer(bot, q, app, &[], String::new(), lang).await;
        }
    };

    let result = source.page(page).await;
    let next_offset = if result.range_start + source.page_size() < result.total_count {
        format!("{key}|{}", page + 1)
    } else {
        String::new()
    };
    answer(bot, q, app, &result.items, next_offset, lang).await
}

async fn answer(
    bot: &Bot,
    q: &InlineQuery,
    app: &App,
    entries: &[Entry],
    next_offset: String,
    lang: Option<&str>,
) -> Result<()> {
    let results: Vec<InlineQueryResult> = entries
        .iter()
        .map(|entry| entry_article(entry, app, lang))
        .collect();
    let mut request = bot.answer_inline_query(q.id.clone(), results).is_personal(true);
    if !next_offset.is_empty() {
        request = request.next_offset(next_offset);
    }
    request.await?;
    Ok(())
}

fn random_result_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Deep-link payload opening the detail view in a private chat.
fn start_payload(entry: &Entry) -> String {
    match entry {
        Entry::Song(song) => format!("info_{}", song.id),
        Entry::Artist(artist) => format!("ar_{}", artist.id),
        Entry::Album(album) => format!("al_{}", album.id),
    }
}

fn entry_article(entry: &Entry, app: &App, lang: Option<&str>) -> InlineQueryResult {
    let mut content = ui_builder::format_entry(entry, lang);
    content.push_str("\n\n");
    content.push_str(&t_args_lang(
        "inline-more-features",
        &[
            ("bot", app.bot_username.as_str()),
            ("link", start_payload(entry).as_str()),
        ],
        lang,
    ));

    let (title, description) = match entry {
        Entry::Song(song) => {
            let mut description = t_args_lang(
                "inline-song-description",
                &[
                    ("artist", song.artist_string.as_deref().unwrap_or("?")),
                    ("type", song.song_type.as_str()),
                ],
                lang,
            );
            if let Some(count) = song.favorited_times {
                description.push(' ');
                description.push_str(&t_args_lang(
                    "entry-song-favourites",
                    &[("count", count.to_string().as_str())],
                    lang,
                ));
            }
            (format!("🎵 {}", song.name), description)
        }
        Entry::Artist(artist) => (
            format!("🎤 {}", artist.name),
            t_args_lang(
                "inline-artist-description",
                &[("type", artist.artist_type.as_str())],
                lang,
            ),
        ),
        Entry::Album(album) => (
            format!("💿 {}", album.name),
            t_args_lang(
                "inline-album-description",
                &[
                    ("artist", album.artist_string.as_deref().unwrap_or("?")),
                    ("type", album.disc_type.as_str()),
                ],
                lang,
            ),
        ),
    };

    let thumb = match entry {
        Entry::Song(song) => song.main_picture.as_ref(),
        Entry::Artist(artist) => artist.main_picture.as_ref(),
        Entry::Album(album) => album.main_picture.as_ref(),
    };

    build_article(
        title,
        description,
        content,
        ui_builder::entry_keyboard(entry, &app.web_base, lang),
        thumb.and_then(|picture| picture.url_thumb.as_deref()),
    )
}

fn build_article(
    title: String,
    description: String,
    content: String,
    keyboard: InlineKeyboardMarkup,
    thumb_url: Option<&str>,
) -> InlineQueryResult {
    let input =
        InputMessageContent::Text(InputMessageContentText::new(content).parse_mode(ParseMode::Html));
    let mut article = InlineQueryResultArticle::new(random_result_id(), title, input)
        .description(description)
        .reply_markup(keyboard);
    if let Some(url) = thumb_url.and_then(|url| url.parse::<reqwest::Url>().ok()) {
        article = article.thumbnail_url(url);
    }
    InlineQueryResult::Article(article)
}

/// `!s#123` and friends: answer with the one addressed entity.
async fn direct_lookup(
    bot: &Bot,
    q: &InlineQuery,
    app: &App,
    kind: &str,
    id: u64,
    scope: i64,
    lang: Option<&str>,
) -> Result<()> {
    let settings = app.settings.get(scope);
    let catalog_lang = settings.catalog_lang.as_str();

    let article = match kind {
        "s" => match app.catalog.song(id, catalog_lang).await {
            Ok(Some(song)) => Some(build_article(
                format!("🎵 {}", song.name),
                song.song_type.clone(),
                ui_builder::format_song_detail(&song, true, lang),
                ui_builder::song_keyboard(&song, &app.web_base, lang),
                None,
            )),
            Ok(None) => None,
            Err(e) => {
                warn!(song_id = id, error = %e, "inline song lookup failed");
                None
            }
        },
        "al" => match app.catalog.album(id, catalog_lang).await {
            Ok(Some(album)) => Some(build_article(
                format!("💿 {}", album.name),
                album.disc_type.clone(),
                ui_builder::format_album_detail(&album, lang),
                ui_builder::album_keyboard(album.id, &app.web_base, lang),
                None,
            )),
            Ok(None) => None,
            Err(e) => {
                warn!(album_id = id, error = %e, "inline album lookup failed");
                None
            }
        },
        _ => match app.catalog.artist(id, catalog_lang).await {
            Ok(Some(artist)) => Some(build_article(
                format!("🎤 {}", artist.name),
                artist.artist_type.clone(),
                ui_builder::format_artist_detail(&artist, lang),
                ui_builder::artist_keyboard(artist.id, &app.web_base, true, lang),
                None,
            )),
            Ok(None) => None,
            Err(e) => {
                warn!(artist_id = id, error = %e, "inline artist lookup failed");
                None
            }
        },
    };

    let results: Vec<InlineQueryResult> = article.into_iter().collect();
    bot.answer_inline_query(q.id.clone(), results)
        .is_personal(true)
        .await?;
    Ok(())
}
