//! Browse dialogue module for the search-prompt conversation state.
//!
//! A search command issued without a query prompts the user and remembers
//! which entry kinds the follow-up text should search.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::paging::SearchKind;

/// Conversation state for prompted searches
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum BrowseDialogueState {
    #[default]
    Idle,
    /// A search command arrived without a query; the next text message is
    /// the query for this kind
    AwaitingQuery { kind: SearchKind },
}

/// Type alias for the browse dialogue
pub type BrowseDialogue = Dialogue<BrowseDialogueState, InMemStorage<BrowseDialogueState>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(BrowseDialogueState::default(), BrowseDialogueState::Idle);
    }
}
