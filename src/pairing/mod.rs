//! Standings and Swiss pairing engine.
//!
//! Ranks players by win count and pairs neighbours in the ranking for the
//! next round:
//! - ranked 1st plays 2nd, 3rd plays 4th, and so on
//! - ties keep registration (id) order
//! - with an odd number of players the last-ranked one is left out
//!
//! No rematch avoidance and no tiebreaks beyond wins are applied.

use std::cmp::Reverse;

use tracing::{debug, warn};

use crate::models::{Pairing, Standing};
use crate::storage::{StoreError, TournamentStore};

/// Sort standings by wins (descending), then id (ascending).
pub fn rank_standings(mut standings: Vec<Standing>) -> Vec<Standing> {
    standings.sort_by_key(|s| (Reverse(s.wins), s.id));
    standings
}

/// Pair each even-indexed entry with the one after it.
///
/// Expects ranked input. A trailing unpaired entry is dropped and logged.
pub fn pair_adjacent(standings: &[Standing]) -> Vec<Pairing> {
    let chunks = standings.chunks_exact(2);
    if let [left_out] = chunks.remainder() {
        warn!(
            "Odd number of players ({}); {} ({}) is not paired this round",
            standings.len(),
            left_out.name,
            left_out.id
        );
    }

    chunks.map(|pair| Pairing::new(&pair[0], &pair[1])).collect()
}

/// Pairing engine over a player/match store.
#[derive(Debug, Clone)]
pub struct SwissPairing<S> {
    store: S,
}

impl<S: TournamentStore> SwissPairing<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store, for registration and match reporting.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current standings, ranked.
    pub async fn standings(&self) -> Result<Vec<Standing>, StoreError> {
        let standings = self.store.player_standings().await?;
        Ok(rank_standings(standings))
    }

    /// Pairings for the next round.
    pub async fn pairings(&self) -> Result<Vec<Pairing>, StoreError> {
        let standings = self.standings().await?;
        let pairings = pair_adjacent(&standings);
        debug!(
            "Paired {} of {} players into {} matches",
            pairings.len() * 2,
            standings.len(),
            pairings.len()
        );
        Ok(pairings)
    }
}
