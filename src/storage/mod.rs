//! Player/match store.
//!
//! Persists players and match outcomes and answers the raw queries the
//! pairing engine needs:
//! - `sqlite`: the relational store over an sqlx connection pool
//! - `memory`: a process-local store with the same contract
//! - `schema`: table definitions for the relational store
//!
//! Every operation is a single atomic unit: it either commits fully or
//! leaves the store unchanged.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::error;

use crate::models::{Player, PlayerId, Standing};
use crate::sanitize::sanitize_name;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unreachable during {operation}: {source}")]
    Connection {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Could not register player {name:?}: {reason}")]
    Registration { name: String, reason: String },

    #[error("Invalid match ({winner} beat {loser}): {reason}")]
    InvalidMatch {
        winner: PlayerId,
        loser: PlayerId,
        reason: String,
    },

    #[error("{operation}: no player with id {id}")]
    NotFound { operation: &'static str, id: PlayerId },

    #[error("{operation} failed: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// Classify a database error raised while running `operation`.
    pub fn from_sqlx(operation: &'static str, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection { operation, source },
            _ => StoreError::Query { operation, source },
        }
    }
}

/// Storage contract shared by every store implementation.
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Delete every match record and zero all win/match counters.
    async fn reset_matches(&self) -> Result<(), StoreError>;

    /// Delete every match record, then every player.
    async fn reset_players(&self) -> Result<(), StoreError>;

    /// Number of registered players.
    async fn count_players(&self) -> Result<usize, StoreError>;

    /// Number of recorded matches.
    async fn count_matches(&self) -> Result<usize, StoreError>;

    /// Register a player under a sanitized name and return the assigned id.
    async fn register_player(&self, name: &str) -> Result<PlayerId, StoreError>;

    /// Record that `winner` beat `loser` and update both players' counters.
    async fn report_match(&self, winner: PlayerId, loser: PlayerId) -> Result<(), StoreError>;

    async fn get_player(&self, id: PlayerId) -> Result<Player, StoreError>;

    /// Win count of a player.
    async fn get_score(&self, id: PlayerId) -> Result<u32, StoreError>;

    /// Match count of a player.
    async fn get_matches(&self, id: PlayerId) -> Result<u32, StoreError>;

    /// Snapshot of all players, id to name.
    async fn get_players(&self) -> Result<BTreeMap<PlayerId, String>, StoreError>;

    /// All players ranked by wins (descending), ties in id order.
    async fn player_standings(&self) -> Result<Vec<Standing>, StoreError>;
}

/// Sanitize a name for registration, rejecting names that are empty afterwards.
pub(crate) fn clean_registration_name(raw: &str) -> Result<String, StoreError> {
    let name = sanitize_name(raw);
    if name.is_empty() {
        let reason = if raw.trim().is_empty() {
            "name is empty"
        } else {
            "name contains only markup"
        };
        error!("Could not register player {:?}: {}", raw, reason);
        return Err(StoreError::Registration {
            name: raw.to_string(),
            reason: reason.to_string(),
        });
    }
    Ok(name)
}
