//! Detail views: song, artist and album pages plus the lyrics, PV and
//! track-listing callback flows.
//!
//! Callback flows can originate from a normal chat message or from an
//! inline-sent message; the latter has no chat to send into, so content is
//! edited through the inline message id and prefixed with the detail text
//! to keep the message self-contained.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};
use tracing::warn;

use super::{ui_builder, App};
use crate::localization::{t_args_lang, t_lang};
use crate::model::{Entry, SongDetail};

pub async fn send_song(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    song_id: u64,
    scope: i64,
) -> Result<()> {
    let settings = app.settings.get(scope);
    let lang = Some(settings.interface_lang.as_str());
    match app.catalog.song(song_id, settings.catalog_lang.as_str()).await {
        Ok(Some(song)) => {
            let text = ui_builder::format_song_detail(&song, false, lang);
            let keyboard = ui_builder::song_keyboard(&song, &app.web_base, lang);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        Ok(None) => {
            bot.send_message(chat_id, t_lang("not-found", lang)).await?;
        }
        Err(e) => {
            warn!(song_id, error = %e, "song detail fetch failed");
            bot.send_message(chat_id, t_lang("not-found", lang)).await?;
        }
    }
    Ok(())
}

pub async fn send_artist(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    artist_id: u64,
    scope: i64,
) -> Result<()> {
    let settings = app.settings.get(scope);
    let lang = Some(settings.interface_lang.as_str());
    match app
        .catalog
        .artist(artist_id, settings.catalog_lang.as_str())
        .await
    {
        Ok(Some(artist)) => {
            let text = ui_builder::format_artist_detail(&artist, lang);
            let keyboard = ui_builder::artist_keyboard(artist.id, &app.web_base, false, lang);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        Ok(None) => {
            bot.send_message(chat_id, t_lang("not-found", lang)).await?;
        }
        Err(e) => {
            warn!(artist_id, error = %e, "artist detail fetch failed");
            bot.send_message(chat_id, t_lang("not-found", lang)).await?;
        }
    }
    Ok(())
}

pub async fn send_album(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    album_id: u64,
    scope: i64,
) -> Result<()> {
    let settings = app.settings.get(scope);
    let lang = Some(settings.interface_lang.as_str());
    match app
        .catalog
        .album(album_id, settings.catalog_lang.as_str())
        .await
    {
        Ok(Some(album)) => {
            let text = ui_builder::format_album_detail(&album, lang);
            let keyboard = ui_builder::album_keyboard(album.id, &app.web_base, lang);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        Ok(None) => {
            bot.send_message(chat_id, t_lang("not-found", lang)).await?;
        }
        Err(e) => {
            warn!(album_id, error = %e, "album detail fetch failed");
            bot.send_message(chat_id, t_lang("not-found", lang)).await?;
        }
    }
    Ok(())
}

/// Dispatch the right detail view for a browse entry (the singleton
/// shortcut lands here).
pub async fn send_entry_detail(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    entry: &Entry,
    scope: i64,
) -> Result<()> {
    match entry {
        Entry::Song(song) => send_song(bot, app, chat_id, song.id, scope).await,
        Entry::Artist(artist) => send_artist(bot, app, chat_id, artist.id, scope).await,
        Entry::Album(album) => send_album(bot, app, chat_id, album.id, scope).await,
    }
}

/// Lyrics callback. Without a lyrics id this shows the language picker;
/// with one it delivers the selected lyrics.
pub async fn lyrics(
    bot: &Bot,
    app: &App,
    q: &CallbackQuery,
    song_id: u64,
    lyrics_id: Option<u64>,
) -> Result<Option<String>> {
    let scope = super::scope_for_callback(q);
    let settings = app.settings.get(scope);
    let lang = Some(settings.interface_lang.as_str());

    let song = match fetch_song(app, song_id, settings.catalog_lang.as_str()).await {
        Some(song) => song,
        None => return Ok(Some(t_lang("not-found", lang))),
    };
    if song.lyrics.is_empty() {
        return Ok(Some(t_lang("no-lyrics", lang)));
    }

    let inline = q.message.is_none() && q.inline_message_id.is_some();
    match lyrics_id {
        None => {
            let text = t_args_lang(
                "lyrics-pick-language",
                &[("song", song.name.as_str()), ("artist", song.artist())],
                lang,
            );
            let text = with_inline_prefix(&song, text, inline, lang);
            let keyboard = ui_builder::lyrics_keyboard(&song);
            deliver(bot, q, text, Some(keyboard), !inline).await?;
        }
        Some(id) => {
            let lyric = match song.lyrics.iter().find(|l| l.id == id) {
                Some(lyric) => lyric,
                None => return Ok(Some(t_lang("no-lyrics", lang))),
            };
            let mut text = t_args_lang(
                "lyrics-header",
                &[
                    ("lang", lyric.label()),
                    ("song", song.name.as_str()),
                    ("artist", song.artist()),
                ],
                lang,
            );
            text.push('\n');
            text.push_str(lyric.value.as_deref().unwrap_or(""));
            let text = with_inline_prefix(&song, text, inline, lang);
            let keyboard = if inline {
                ui_builder::song_keyboard(&song, &app.web_base, lang)
            } else {
                ui_builder::lyrics_keyboard(&song)
            };
            deliver(bot, q, text, Some(keyboard), false).await?;
        }
    }
    Ok(None)
}

/// PV callback: deliver the title and URL of one promotional video.
pub async fn pv(
    bot: &Bot,
    app: &App,
    q: &CallbackQuery,
    song_id: u64,
    service: &str,
) -> Result<Option<String>> {
    let scope = super::scope_for_callback(q);
    let settings = app.settings.get(scope);
    let lang = Some(settings.interface_lang.as_str());

    let song = match fetch_song(app, song_id, settings.catalog_lang.as_str()).await {
        Some(song) => song,
        None => return Ok(Some(t_lang("not-found", lang))),
    };
    let pv = match song.pvs.iter().find(|pv| pv.service == service) {
        Some(pv) => pv,
        None => return Ok(Some(t_lang("not-found", lang))),
    };

    let inline = q.message.is_none() && q.inline_message_id.is_some();
    let mut text = t_args_lang(
        "pv-header",
        &[
            ("service", pv.service.as_str()),
            ("song", song.name.as_str()),
            ("artist", song.artist()),
        ],
        lang,
    );
    text.push('\n');
    text.push_str(&t_lang("pv-title", lang));
    text.push('\n');
    text.push_str(pv.name.as_deref().unwrap_or("?"));
    if let Some(url) = pv.url.as_deref() {
        text.push('\n');
        text.push_str(url);
    }
    let text = with_inline_prefix(&song, text, inline, lang);
    let keyboard = inline.then(|| ui_builder::song_keyboard(&song, &app.web_base, lang));
    deliver(bot, q, text, keyboard, !inline).await?;
    Ok(None)
}

/// Track-listing callback for an album.
pub async fn album_tracks(
    bot: &Bot,
    app: &App,
    q: &CallbackQuery,
    album_id: u64,
) -> Result<Option<String>> {
    let scope = super::scope_for_callback(q);
    let settings = app.settings.get(scope);
    let lang = Some(settings.interface_lang.as_str());

    let album = match app
        .catalog
        .album(album_id, settings.catalog_lang.as_str())
        .await
    {
        Ok(Some(album)) => album,
        Ok(None) => return Ok(Some(t_lang("not-found", lang))),
        Err(e) => {
            warn!(album_id, error = %e, "album fetch failed");
            return Ok(Some(t_lang("not-found", lang)));
        }
    };

    let inline = q.message.is_none() && q.inline_message_id.is_some();
    let mut text = String::new();
    if inline {
        text.push_str(&ui_builder::format_album_detail(&album, lang));
        text.push_str("\n\n");
    }
    text.push_str(&ui_builder::format_album_tracks(&album, lang));
    let keyboard = inline.then(|| ui_builder::album_keyboard(album.id, &app.web_base, lang));
    deliver(bot, q, text, keyboard, !inline).await?;
    Ok(None)
}

async fn fetch_song(app: &App, song_id: u64, catalog_lang: &str) -> Option<SongDetail> {
    match app.catalog.song(song_id, catalog_lang).await {
        Ok(song) => song,
        Err(e) => {
            warn!(song_id, error = %e, "song fetch failed");
            None
        }
    }
}

/// Inline-sent messages have no surrounding context, so detail flows keep
/// the song header above whatever they deliver.
fn with_inline_prefix(song: &SongDetail, text: String, inline: bool, lang: Option<&str>) -> String {
    if inline {
        let mut prefixed = ui_builder::format_song_detail(song, true, lang);
        prefixed.push_str("\n\n");
        prefixed.push_str(&text);
        prefixed
    } else {
        text
    }
}

/// Send or edit depending on where the triggering callback came from.
/// `send_fresh` sends a new chat message instead of editing (used by
/// flows that should keep the original view visible).
async fn deliver(
    bot: &Bot,
    q: &CallbackQuery,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
    send_fresh: bool,
) -> Result<()> {
    if let Some(message) = &q.message {
        if send_fresh {
            let mut request = bot
                .send_message(message.chat().id, text)
                .parse_mode(ParseMode::Html);
            if let Some(kb) = keyboard {
                request = request.reply_markup(kb);
            }
            request.await?;
        } else {
            let mut request = bot
                .edit_message_text(message.chat().id, message.id(), text)
                .parse_mode(ParseMode::Html);
            if let Some(kb) = keyboard {
                request = request.reply_markup(kb);
            }
            if let Err(e) = request.await {
                warn!(user_id = %q.from.id, error = %e, "detail edit rejected");
            }
        }
    } else if let Some(inline_id) = &q.inline_message_id {
        let mut request = bot
            .edit_message_text_inline(inline_id.clone(), text)
            .parse_mode(ParseMode::Html);
        if let Some(kb) = keyboard {
            request = request.reply_markup(kb);
        }
        if let Err(e) = request.await {
            warn!(user_id = %q.from.id, error = %e, "inline detail edit rejected");
        }
    }
    Ok(())
}
