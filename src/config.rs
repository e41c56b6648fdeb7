//! # Bot Configuration Module
//!
//! Central place for the tunables of the browsing subsystem: page sizes,
//! session registry bounds, and the upstream request timeout. Endpoint URLs
//! and the bot token are read from the environment in `main`.

use std::time::Duration;

/// Configuration for browsing, inline mode and the session registry
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Entries per page when browsing via chat messages
    pub page_size: usize,
    /// Entries per page when answering inline queries
    pub inline_page_size: usize,
    /// Maximum number of live paging sessions per registry
    pub session_capacity: usize,
    /// Sessions older than this are treated as expired
    pub session_ttl: Duration,
    /// Upper bound on a single catalog API request
    pub request_timeout: Duration,
    /// How long a search reply stays editable through an edited command
    pub reply_track_ttl: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            page_size: 3,
            inline_page_size: 10,
            session_capacity: 4096,
            session_ttl: Duration::from_secs(60 * 60),
            request_timeout: Duration::from_secs(10),
            reply_track_ttl: Duration::from_secs(60 * 60),
        }
    }
}
