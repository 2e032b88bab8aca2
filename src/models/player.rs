//! Player model.

use serde::{Deserialize, Serialize};

/// Database-assigned player identifier (SQLite rowid).
pub type PlayerId = i64;

/// A registered player with maintained win/match counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    /// Unique identifier, assigned on registration
    pub id: PlayerId,

    /// Sanitized display name (not required to be unique)
    pub name: String,

    /// Matches won
    pub wins: u32,

    /// Matches played
    pub matches: u32,
}

impl Player {
    /// A freshly registered player with zeroed counters.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            wins: 0,
            matches: 0,
        }
    }

    pub fn record_win(&mut self) {
        self.wins += 1;
        self.matches += 1;
    }

    pub fn record_loss(&mut self) {
        self.matches += 1;
    }
}
