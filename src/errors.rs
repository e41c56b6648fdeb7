//! Error types shared across the browsing subsystem.

use thiserror::Error;

/// Returned by the session registry when a paging key resolves to nothing.
///
/// This covers keys that never existed, keys evicted by the registry's
/// capacity/TTL policy, and keys minted before a process restart. All three
/// are recovered the same way: tell the user to start a fresh search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("browsing session expired")]
pub struct SessionExpired;

/// Failures talking to the catalog API.
///
/// Page sources translate these into empty result pages so a flaky upstream
/// degrades to a "not found" message instead of aborting the interaction.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
