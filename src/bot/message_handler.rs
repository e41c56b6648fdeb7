//! Message Handler module: routes commands, id-shaped deep commands and
//! prompted search queries into the browsing core.

use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::{ForceReply, ParseMode};
use tracing::debug;

use super::{browse, info, ui_builder, App};
use crate::dialogue::{BrowseDialogue, BrowseDialogueState};
use crate::catalog::SongSort;
use crate::localization::{t_args_lang, t_lang};
use crate::paging::{QuerySpec, SearchKind};

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\w+)(?:@(\w+))?(?:\s+([\s\S]+))?$").unwrap());

/// Commands that address one entity directly: `/info_123`, `/dev_123`, ...
static ID_COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(info|s|ar|al|dev|rel|albys)_(\d+)$").unwrap());

#[derive(Debug, PartialEq)]
pub struct ParsedCommand<'a> {
    pub name: &'a str,
    pub bot_name: Option<&'a str>,
    pub args: &'a str,
}

pub fn parse_command(text: &str) -> Option<ParsedCommand<'_>> {
    let caps = COMMAND_RE.captures(text.trim())?;
    Some(ParsedCommand {
        name: caps.get(1).map(|m| m.as_str()).unwrap_or(""),
        bot_name: caps.get(2).map(|m| m.as_str()),
        args: caps.get(3).map(|m| m.as_str()).unwrap_or(""),
    })
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: BrowseDialogue,
    app: Arc<App>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let scope = super::scope_for_message(&msg);
    let settings = app.settings.get(scope);
    let lang_code = settings.interface_lang.clone();
    let lang = Some(lang_code.as_str());

    // A pending search prompt consumes the next plain text message
    if !text.starts_with('/') {
        if let Some(BrowseDialogueState::AwaitingQuery { kind }) = dialogue.get().await? {
            debug!(user_id = %msg.chat.id, ?kind, "prompted search query received");
            dialogue.update(BrowseDialogueState::Idle).await?;
            let spec = QuerySpec::search(kind, text, settings.originals_only);
            return browse::begin_browse(&bot, &app, msg.chat.id, Some(msg.id), scope, spec).await;
        }
        return Ok(());
    }

    let Some(cmd) = parse_command(text) else {
        return Ok(());
    };
    // Commands addressed to some other bot in a group chat are not ours
    if let Some(target) = cmd.bot_name {
        if !target.eq_ignore_ascii_case(&app.bot_username) {
            return Ok(());
        }
    }

    if let Some(caps) = ID_COMMAND_RE.captures(cmd.name) {
        let id: u64 = caps[2].parse().unwrap_or(0);
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
        return dispatch_id_command(&bot, &app, &msg, scope, &name, id).await;
    }

    let bot_at = format!("@{}", app.bot_username);
    match cmd.name {
        "start" => {
            let args = cmd.args.trim();
            // Deep links carry an id command without the slash
            if let Some(caps) = ID_COMMAND_RE.captures(args) {
                let id: u64 = caps[2].parse().unwrap_or(0);
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
                return dispatch_id_command(&bot, &app, &msg, scope, &name, id).await;
            }
            if args == "help_inline" {
                bot.send_message(
                    msg.chat.id,
                    t_args_lang("inline-help-text", &[("bot", bot_at.as_str())], lang),
                )
                .parse_mode(ParseMode::Html)
                .await?;
                return Ok(());
            }
            let user_name = msg
                .from
                .as_ref()
                .map(|user| user.first_name.as_str())
                .unwrap_or("there");
            let mut text = t_args_lang(
                "start-greeting",
                &[("user", user_name), ("bot", bot_at.as_str())],
                lang,
            );
            text.push('\n');
            text.push_str(&t_lang("start-help-hint", lang));
            bot.send_message(msg.chat.id, text).await?;
        }
        "help" => {
            bot.send_message(
                msg.chat.id,
                t_args_lang("help-text", &[("bot", bot_at.as_str())], lang),
            )
            .await?;
        }
        "about" => {
            bot.send_message(
                msg.chat.id,
                t_args_lang(
                    "about-text",
                    &[
                        ("bot", bot_at.as_str()),
                        ("version", env!("CARGO_PKG_VERSION")),
                    ],
                    lang,
                ),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        "inline" => {
            bot.send_message(
                msg.chat.id,
                t_args_lang("inline-help-text", &[("bot", bot_at.as_str())], lang),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        "settings" => {
            send_settings_view(&bot, &app, &msg, scope).await?;
        }
        "cancel" => {
            dialogue.update(BrowseDialogueState::Idle).await?;
            bot.send_message(msg.chat.id, t_lang("cancelled", lang))
                .await?;
        }
        "search" | "song" | "artist" | "album" => {
            let kind = match cmd.name {
                "search" => SearchKind::All,
                "song" => SearchKind::Songs,
                "artist" => SearchKind::Artists,
                _ => SearchKind::Albums,
            };
            let query = cmd.args.trim();
            if query.is_empty() {
                let prompt = match kind {
                    SearchKind::All => "search-prompt",
                    SearchKind::Songs => "search-prompt-song",
                    SearchKind::Artists => "search-prompt-artist",
                    SearchKind::Albums => "search-prompt-album",
                };
                bot.send_message(msg.chat.id, t_lang(prompt, lang))
                    .reply_markup(ForceReply::new())
                    .await?;
                dialogue
                    .update(BrowseDialogueState::AwaitingQuery { kind })
                    .await?;
            } else {
                let spec = QuerySpec::search(kind, query, settings.originals_only);
                browse::begin_browse(&bot, &app, msg.chat.id, Some(msg.id), scope, spec).await?;
            }
        }
        "top" => {
            browse::begin_browse(
                &bot,
                &app,
                msg.chat.id,
                Some(msg.id),
                scope,
                browse_songs_spec(SongSort::FavoritedTimes),
            )
            .await?;
        }
        "new" => {
            browse::begin_browse(
                &bot,
                &app,
                msg.chat.id,
                Some(msg.id),
                scope,
                browse_songs_spec(SongSort::AdditionDate),
            )
            .await?;
        }
        "trending" => {
            browse::begin_browse(
                &bot,
                &app,
                msg.chat.id,
                Some(msg.id),
                scope,
                browse_songs_spec(SongSort::RatingScore),
            )
            .await?;
        }
        _ => {
            // Unknown commands get a hint in private chats or when
            // explicitly addressed to us
            if msg.chat.is_private() || cmd.bot_name.is_some() {
                bot.send_message(msg.chat.id, t_lang("unknown-command", lang))
                    .await?;
            }
        }
    }

    Ok(())
}

/// Re-run a search when the user edits their command, updating the bot's
/// previous reply in place.
pub async fn edited_message_handler(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let scope = super::scope_for_message(&msg);
    let settings = app.settings.get(scope);

    let Some(cmd) = parse_command(text) else {
        return Ok(());
    };
    if let Some(target) = cmd.bot_name {
        if !target.eq_ignore_ascii_case(&app.bot_username) {
            return Ok(());
        }
    }

    if let Some(caps) = ID_COMMAND_RE.captures(cmd.name) {
        let id: u64 = caps[2].parse().unwrap_or(0);
        let spec = match &caps[1] {
            "dev" => QuerySpec::DerivedSongs { song_id: id },
            "rel" => QuerySpec::RelatedSongs { song_id: id },
            "albys" => QuerySpec::AlbumsBySong { song_id: id },
            _ => return Ok(()),
        };
        return browse::begin_browse(&bot, &app, msg.chat.id, Some(msg.id), scope, spec).await;
    }

    let spec = match cmd.name {
        "search" | "song" | "artist" | "album" => {
            let query = cmd.args.trim();
            if query.is_empty() {
                return Ok(());
            }
            let kind = match cmd.name {
                "search" => SearchKind::All,
                "song" => SearchKind::Songs,
                "artist" => SearchKind::Artists,
                _ => SearchKind::Albums,
            };
            QuerySpec::search(kind, query, settings.originals_only)
        }
        "top" => browse_songs_spec(SongSort::FavoritedTimes),
        "new" => browse_songs_spec(SongSort::AdditionDate),
        "trending" => browse_songs_spec(SongSort::RatingScore),
        _ => return Ok(()),
    };
    browse::begin_browse(&bot, &app, msg.chat.id, Some(msg.id), scope, spec).await
}

fn browse_songs_spec(sort: SongSort) -> QuerySpec {
    QuerySpec::Songs {
        query: String::new(),
        sort,
        artist_id: None,
        originals_only: false,
    }
}

async fn dispatch_id_command(
    bot: &Bot,
    app: &App,
    msg: &Message,
    scope: i64,
    name: &str,
    id: u64,
) -> Result<()> {
    match name {
        "info" | "s" => info::send_song(bot, app, msg.chat.id, id, scope).await,
        "ar" => info::send_artist(bot, app, msg.chat.id, id, scope).await,
        "al" => info::send_album(bot, app, msg.chat.id, id, scope).await,
        "dev" => {
            browse::begin_browse(
                bot,
                app,
                msg.chat.id,
                Some(msg.id),
                scope,
                QuerySpec::DerivedSongs { song_id: id },
            )
            .await
        }
        "rel" => {
            browse::begin_browse(
                bot,
                app,
                msg.chat.id,
                Some(msg.id),
                scope,
                QuerySpec::RelatedSongs { song_id: id },
            )
            .await
        }
        "albys" => {
            browse::begin_browse(
                bot,
                app,
                msg.chat.id,
                Some(msg.id),
                scope,
                QuerySpec::AlbumsBySong { song_id: id },
            )
            .await
        }
        _ => Ok(()),
    }
}

async fn send_settings_view(bot: &Bot, app: &App, msg: &Message, scope: i64) -> Result<()> {
    let settings = app.settings.get(scope);
    let lang_code = settings.interface_lang.clone();
    let lang = Some(lang_code.as_str());

    let scope_label = if msg.chat.is_private() {
        t_lang("scope-user", lang)
    } else {
        t_lang("scope-chat", lang)
    };
    let interface_label = t_lang(&format!("lang-{}", settings.interface_lang), lang);
    let catalog_label = t_lang(
        &format!("lang-{}", settings.catalog_lang.as_str().to_lowercase()),
        lang,
    );
    let originals_label = if settings.originals_only {
        t_lang("enabled", lang)
    } else {
        t_lang("disabled", lang)
    };

    let bot_at = format!("@{}", app.bot_username);
    let text = t_args_lang(
        "settings-text",
        &[
            ("bot", bot_at.as_str()),
            ("scope", scope_label.as_str()),
            ("interface", interface_label.as_str()),
            ("catalog", catalog_label.as_str()),
            ("originals", originals_label.as_str()),
        ],
        lang,
    );
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui_builder::settings_keyboard(lang))
        .await?;
    Ok(())
}
