//! Callback Handler module for processing inline keyboard callback queries.
//!
//! Every callback payload is a `|`-delimited tag. Exactly one
//! acknowledgment is sent per callback, with an optional transient notice
//! (session expiry, unknown setting), so every tap gets visual feedback
//! even on failure paths.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, warn};

use super::{browse, info, ui_builder, App};
use crate::catalog::{AlbumSort, SongSort};
use crate::localization::{t_args_lang, t_lang};
use crate::paging::QuerySpec;
use crate::settings::CatalogLang;

pub async fn callback_handler(bot: Bot, q: CallbackQuery, app: Arc<App>) -> Result<()> {
    let data = q.data.clone().unwrap_or_default();
    debug!(user_id = %q.from.id, data = %data, "callback received");

    let notice = route(&bot, &q, &app, &data).await?;

    // Exactly one acknowledgment per tap, notice or not
    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(text) = notice {
        answer = answer.text(text);
    }
    answer.await?;
    Ok(())
}

async fn route(bot: &Bot, q: &CallbackQuery, app: &App, data: &str) -> Result<Option<String>> {
    let parts: Vec<&str> = data.split('|').collect();
    match parts.as_slice() {
        &["page", key, index] => {
            let target: u32 = index.parse().unwrap_or(1);
            browse::change_page(bot, app, q, key, target).await
        }
        &["ly", song] => info::lyrics(bot, app, q, song.parse().unwrap_or(0), None).await,
        &["ly", song, lyric] => {
            info::lyrics(bot, app, q, song.parse().unwrap_or(0), lyric.parse().ok()).await
        }
        &["pv", song, service] => info::pv(bot, app, q, song.parse().unwrap_or(0), service).await,
        &["allist", album] => info::album_tracks(bot, app, q, album.parse().unwrap_or(0)).await,
        &["arlist", op, artist] => {
            artist_listing(bot, q, app, op, artist.parse().unwrap_or(0)).await
        }
        &["cfg", name] => settings_menu(bot, q, app, name).await,
        &["cfgv", name, value] => settings_apply(bot, q, app, name, value).await,
        // Inert paging controls and anything stale fall through to a bare
        // acknowledgment
        _ => Ok(None),
    }
}

/// Artist-scoped browse buttons: popular/latest songs and albums.
async fn artist_listing(
    bot: &Bot,
    q: &CallbackQuery,
    app: &App,
    op: &str,
    artist_id: u64,
) -> Result<Option<String>> {
    let Some(message) = &q.message else {
        return Ok(None);
    };
    let spec = match op {
        "ps" => QuerySpec::Songs {
            query: String::new(),
            sort: SongSort::FavoritedTimes,
            artist_id: Some(artist_id),
            originals_only: false,
        },
        "ls" => QuerySpec::Songs {
            query: String::new(),
            sort: SongSort::AdditionDate,
            artist_id: Some(artist_id),
            originals_only: false,
        },
        "pa" => QuerySpec::Albums {
            query: String::new(),
            sort: AlbumSort::RatingAverage,
            artist_id: Some(artist_id),
        },
        "la" => QuerySpec::Albums {
            query: String::new(),
            sort: AlbumSort::ReleaseDate,
            artist_id: Some(artist_id),
        },
        _ => return Ok(None),
    };
    let scope = super::scope_for_callback(q);
    browse::begin_browse(bot, app, message.chat().id, None, scope, spec).await?;
    Ok(None)
}

async fn settings_menu(
    bot: &Bot,
    q: &CallbackQuery,
    app: &App,
    name: &str,
) -> Result<Option<String>> {
    let scope = super::scope_for_callback(q);
    let settings = app.settings.get(scope);
    let lang_code = settings.interface_lang.clone();
    let lang = Some(lang_code.as_str());

    let Some(keyboard) = ui_builder::settings_options_keyboard(name, lang) else {
        return Ok(Some(t_lang("settings-unknown", lang)));
    };
    let prompt = match name {
        "catalog" => "settings-pick-catalog",
        "originals" => "settings-pick-originals",
        _ => "settings-pick-interface",
    };
    if let Some(message) = &q.message {
        let edit = bot
            .edit_message_text(message.chat().id, message.id(), t_lang(prompt, lang))
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard);
        if let Err(e) = edit.await {
            warn!(user_id = %q.from.id, error = %e, "settings menu edit rejected");
        }
    }
    Ok(None)
}

async fn settings_apply(
    bot: &Bot,
    q: &CallbackQuery,
    app: &App,
    name: &str,
    value: &str,
) -> Result<Option<String>> {
    let scope = super::scope_for_callback(q);
    let before = app.settings.get(scope);
    let lang_code = before.interface_lang.clone();
    let lang = Some(lang_code.as_str());

    let (label_key, old_label, new_label) = match name {
        "catalog" => {
            let Some(new_lang) = CatalogLang::from_str(value) else {
                return Ok(Some(t_lang("settings-unknown", lang)));
            };
            app.settings.update(scope, |s| s.catalog_lang = new_lang)?;
            (
                "settings-catalog-label",
                t_lang(
                    &format!("lang-{}", before.catalog_lang.as_str().to_lowercase()),
                    lang,
                ),
                t_lang(&format!("lang-{}", new_lang.as_str().to_lowercase()), lang),
            )
        }
        "originals" => {
            let enabled = match value {
                "true" => true,
                "false" => false,
                _ => return Ok(Some(t_lang("settings-unknown", lang))),
            };
            app.settings.update(scope, |s| s.originals_only = enabled)?;
            let label = |on: bool| {
                if on {
                    t_lang("enabled", lang)
                } else {
                    t_lang("disabled", lang)
                }
            };
            (
                "settings-originals-label",
                label(before.originals_only),
                label(enabled),
            )
        }
        "interface" => {
            if value != "en" {
                return Ok(Some(t_lang("settings-unknown", lang)));
            }
            app.settings
                .update(scope, |s| s.interface_lang = value.to_string())?;
            (
                "settings-interface-label",
                t_lang(&format!("lang-{}", before.interface_lang), lang),
                t_lang(&format!("lang-{value}"), lang),
            )
        }
        _ => return Ok(Some(t_lang("settings-unknown", lang))),
    };

    if let Some(message) = &q.message {
        let scope_label = if message.chat().is_private() {
            t_lang("scope-user", lang)
        } else {
            t_lang("scope-chat", lang)
        };
        let text = t_args_lang(
            "settings-changed",
            &[
                ("scope", scope_label.as_str()),
                ("name", t_lang(label_key, lang).as_str()),
                ("old", old_label.as_str()),
                ("new", new_label.as_str()),
            ],
            lang,
        );
        let edit = bot
            .edit_message_text(message.chat().id, message.id(), text)
            .parse_mode(ParseMode::Html);
        if let Err(e) = edit.await {
            warn!(user_id = %q.from.id, error = %e, "settings confirmation edit rejected");
        }
    }
    Ok(None)
}
