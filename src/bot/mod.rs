//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: routes commands and prompted search queries
//! - `callback_handler`: routes inline keyboard callback payloads
//! - `inline_handler`: inline queries and inline paging
//! - `browse`: the pagination controller and its session plumbing
//! - `info`: song/artist/album detail views
//! - `ui_builder`: message content and keyboards

pub mod browse;
pub mod callback_handler;
pub mod info;
pub mod inline_handler;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;

use teloxide::types::{CallbackQuery, Message, User};

use crate::catalog::CatalogService;
use crate::config::BotConfig;
use crate::session::SessionRegistry;
use crate::settings::SettingsStore;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use inline_handler::inline_handler;
pub use message_handler::{edited_message_handler, message_handler};

/// Shared state handed to every handler by the dispatcher.
pub struct App {
    pub config: BotConfig,
    pub catalog: Arc<dyn CatalogService>,
    /// Paging sessions for message browsing
    pub browse_sessions: SessionRegistry,
    /// Paging sessions for inline mode (different page size, same rules)
    pub inline_sessions: SessionRegistry,
    pub settings: SettingsStore,
    pub replies: browse::ReplyTracker,
    /// Base URL of the catalog's public website, for "open in browser"
    pub web_base: String,
    pub bot_username: String,
}

/// Settings scope id: the user in private chats, the chat in groups.
pub fn scope_for_message(msg: &Message) -> i64 {
    if msg.chat.is_private() {
        msg.from
            .as_ref()
            .map(|user| user.id.0 as i64)
            .unwrap_or(msg.chat.id.0)
    } else {
        msg.chat.id.0
    }
}

pub fn scope_for_user(user: &User) -> i64 {
    user.id.0 as i64
}

/// Scope for a callback: the chat its message lives in, or the tapping
/// user for inline-sent messages.
pub fn scope_for_callback(q: &CallbackQuery) -> i64 {
    match &q.message {
        Some(message) if !message.chat().is_private() => message.chat().id.0,
        _ => scope_for_user(&q.from),
    }
}
