//! Pagination Controller: owns the browse lifecycle from a fresh search to
//! any number of page changes.
//!
//! A new browse builds a [`PageSource`], renders page 1, registers the
//! source in the session registry and attaches a paging keyboard whose
//! buttons carry `page|<key>|<index>` payloads. A later button tap resolves
//! the key, fetches the target page and edits the original message in
//! place. Expired keys produce a transient notice and leave the rendered
//! message untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use tracing::{debug, warn};

use super::{info, ui_builder, App};
use crate::localization::t_lang;
use crate::model::Entry;
use crate::paging::{PageResult, PageSource, QuerySpec};

/// Remembers which bot reply answered which user message, so an edited
/// search command updates the existing reply instead of sending a new one.
/// Entries age out on the same clock as paging sessions.
pub struct ReplyTracker {
    inner: Mutex<HashMap<(ChatId, MessageId), TrackedReply>>,
    ttl: Duration,
}

struct TrackedReply {
    reply: MessageId,
    created_at: Instant,
}

impl ReplyTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn record(&self, chat: ChatId, origin: MessageId, reply: MessageId) {
        let mut inner = self.inner.lock().unwrap();
        inner.retain(|_, tracked| tracked.created_at.elapsed() < self.ttl);
        inner.insert(
            (chat, origin),
            TrackedReply {
                reply,
                created_at: Instant::now(),
            },
        );
    }

    pub fn lookup(&self, chat: ChatId, origin: MessageId) -> Option<MessageId> {
        let inner = self.inner.lock().unwrap();
        inner
            .get(&(chat, origin))
            .filter(|tracked| tracked.created_at.elapsed() < self.ttl)
            .map(|tracked| tracked.reply)
    }
}

/// The singleton shortcut test: exactly one result in a one-page set.
/// Malformed single entries never reach here (they are dropped at the
/// catalog boundary, leaving the page empty), so a hit is always a
/// detail-capable entity.
pub fn singleton_entry(result: &PageResult) -> Option<&Entry> {
    if result.total_count == 1 && result.items.len() == 1 {
        result.items.first()
    } else {
        None
    }
}

/// Start a browse: fetch page 1, register a paging session and render into
/// `chat_id`. When `anchor` points at a user message we already replied
/// to, the previous reply is edited in place instead of sending anew.
pub async fn begin_browse(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    anchor: Option<MessageId>,
    scope: i64,
    spec: QuerySpec,
) -> Result<()> {
    let settings = app.settings.get(scope);
    let lang = Some(settings.interface_lang.as_str());

    let source = Arc::new(PageSource::new(
        Arc::clone(&app.catalog),
        spec,
        settings.catalog_lang.as_str(),
        app.config.page_size,
    ));
    let result = source.page(1).await;

    // One unambiguous hit: skip the paging UI and go straight to details
    if let Some(entry) = singleton_entry(&result) {
        debug!(chat_id = %chat_id, entry_id = entry.id(), "singleton result, showing detail view");
        return info::send_entry_detail(bot, app, chat_id, entry, scope).await;
    }

    // Empty result sets get a not-found message and no session at all
    let keyboard = if result.total_count > 0 {
        let key = app.browse_sessions.create(Arc::clone(&source));
        ui_builder::paging_keyboard(&key, &result, app.config.page_size, lang)
    } else {
        None
    };
    let content = ui_builder::format_page(&result, app.config.page_size, lang);

    let existing = anchor.and_then(|origin| app.replies.lookup(chat_id, origin));
    if let Some(reply_id) = existing {
        let mut edit = bot
            .edit_message_text(chat_id, reply_id, content.clone())
            .parse_mode(ParseMode::Html);
        if let Some(kb) = keyboard.clone() {
            edit = edit.reply_markup(kb);
        }
        match edit.await {
            Ok(_) => return Ok(()),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "failed to edit tracked reply, sending fresh message");
            }
        }
    }

    let mut send = bot
        .send_message(chat_id, content)
        .parse_mode(ParseMode::Html);
    if let Some(kb) = keyboard {
        send = send.reply_markup(kb);
    }
    let sent = send.await?;
    if let Some(origin) = anchor {
        app.replies.record(chat_id, origin, sent.id);
    }
    Ok(())
}

/// Handle a paging-control tap: resolve the session, fetch the target page
/// and edit the message the keyboard is attached to.
///
/// Returns the transient notice to show in the callback acknowledgment,
/// if any. An expired session never touches the rendered message.
pub async fn change_page(
    bot: &Bot,
    app: &App,
    q: &CallbackQuery,
    key: &str,
    target_page: u32,
) -> Result<Option<String>> {
    let scope = super::scope_for_callback(q);
    let settings = app.settings.get(scope);
    let lang = Some(settings.interface_lang.as_str());

    let source = match app.browse_sessions.resolve(key) {
        Ok(source) => source,
        Err(_) => {
            debug!(user_id = %q.from.id, key, "paging key expired");
            return Ok(Some(t_lang("expired-notice", lang)));
        }
    };

    // Stale controls may name a page the shrunken result set no longer
    // has; clamp to the last page this source reported.
    let target_page = match source.last_page_hint() {
        Some(last) => target_page.clamp(1, last),
        None => target_page.max(1),
    };

    let result = source.page(target_page).await;
    let content = ui_builder::format_page(&result, app.config.page_size, lang);
    let keyboard = ui_builder::paging_keyboard(key, &result, app.config.page_size, lang);

    if let Some(message) = &q.message {
        let mut edit = bot
            .edit_message_text(message.chat().id, message.id(), content)
            .parse_mode(ParseMode::Html);
        if let Some(kb) = keyboard {
            edit = edit.reply_markup(kb);
        }
        // Racing taps can land on an already-current page; Telegram
        // rejects the no-op edit and that is fine
        if let Err(e) = edit.await {
            warn!(user_id = %q.from.id, error = %e, "page edit rejected");
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SongEntry;
    use crate::paging::ResultTag;

    fn song_entry() -> Entry {
        Entry::Song(SongEntry {
            id: 1,
            name: "only hit".to_string(),
            song_type: "Original".to_string(),
            artist_string: None,
            favorited_times: None,
            pv_services: None,
            main_picture: None,
        })
    }

    fn result(items: usize, total: usize) -> PageResult {
        PageResult {
            items: (0..items).map(|_| song_entry()).collect(),
            range_start: 0,
            total_count: total,
            tag: ResultTag::Search,
        }
    }

    #[test]
    fn test_singleton_fires_only_for_exactly_one() {
        assert!(singleton_entry(&result(1, 1)).is_some());
        assert!(singleton_entry(&result(0, 0)).is_none());
        assert!(singleton_entry(&result(2, 2)).is_none());
        assert!(singleton_entry(&result(3, 7)).is_none());
        // Total of one but the item was dropped as malformed
        assert!(singleton_entry(&result(0, 1)).is_none());
    }

    #[test]
    fn test_reply_tracker_round_trip() {
        let tracker = ReplyTracker::new(Duration::from_secs(60));
        let chat = ChatId(7);
        tracker.record(chat, MessageId(1), MessageId(100));
        assert_eq!(tracker.lookup(chat, MessageId(1)), Some(MessageId(100)));
        assert_eq!(tracker.lookup(chat, MessageId(2)), None);
        assert_eq!(tracker.lookup(ChatId(8), MessageId(1)), None);
    }

    #[test]
    fn test_reply_tracker_expires() {
        let tracker = ReplyTracker::new(Duration::from_millis(10));
        let chat = ChatId(7);
        tracker.record(chat, MessageId(1), MessageId(100));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(tracker.lookup(chat, MessageId(1)), None);
    }
}
