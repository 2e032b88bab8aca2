//! # Swiss Tournament
//!
//! Player/match tracking and round pairing for Swiss-system tournaments.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (players, standings, matches, pairings)
//! - **storage**: Player/match store trait with SQLite and in-memory backends
//! - **pairing**: Standings ranking and Swiss pairing engine
//! - **sanitize**: Markup stripping for player names
//! - **config**: Configuration loading and validation

pub mod config;
pub mod models;
pub mod pairing;
pub mod sanitize;
pub mod storage;

pub use models::*;
pub use pairing::{pair_adjacent, rank_standings, SwissPairing};
pub use storage::{MemoryStore, SqliteStore, StoreError, TournamentStore};
