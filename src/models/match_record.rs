//! Recorded match outcomes.

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// The outcome of a single match. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub winner: PlayerId,
    pub loser: PlayerId,
}

impl MatchRecord {
    pub fn new(winner: PlayerId, loser: PlayerId) -> Self {
        Self { winner, loser }
    }

    /// A player cannot play against themselves.
    pub fn is_self_match(&self) -> bool {
        self.winner == self.loser
    }
}
