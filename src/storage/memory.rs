//! Process-local store.
//!
//! Holds players and matches behind a single async mutex. Each operation
//! validates and mutates under one lock guard, which gives the same
//! all-or-nothing behavior as a database transaction.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{clean_registration_name, StoreError, TournamentStore};
use crate::models::{MatchRecord, Player, PlayerId, Standing};

#[derive(Debug, Default)]
struct MemoryState {
    /// Last id handed out; ids are never reused, even across resets.
    last_id: PlayerId,
    players: BTreeMap<PlayerId, Player>,
    matches: Vec<MatchRecord>,
}

/// In-memory player/match store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentStore for MemoryStore {
    async fn reset_matches(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let deleted = state.matches.len();
        state.matches.clear();
        for player in state.players.values_mut() {
            player.wins = 0;
            player.matches = 0;
        }
        info!("Deleted {} matches and reset counters", deleted);
        Ok(())
    }

    async fn reset_players(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.matches.clear();
        let deleted = state.players.len();
        state.players.clear();
        info!("Deleted {} players", deleted);
        Ok(())
    }

    async fn count_players(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock().await.players.len())
    }

    async fn count_matches(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock().await.matches.len())
    }

    async fn register_player(&self, name: &str) -> Result<PlayerId, StoreError> {
        let clean = clean_registration_name(name)?;

        let mut state = self.state.lock().await;
        state.last_id += 1;
        let id = state.last_id;
        state.players.insert(id, Player::new(id, clean.clone()));

        info!("Registered player {} as {:?}", id, clean);
        Ok(id)
    }

    async fn report_match(&self, winner: PlayerId, loser: PlayerId) -> Result<(), StoreError> {
        let record = MatchRecord::new(winner, loser);
        if record.is_self_match() {
            warn!("Rejected match of player {} against themselves", winner);
            return Err(StoreError::InvalidMatch {
                winner,
                loser,
                reason: "a player cannot play against themselves".to_string(),
            });
        }

        let mut state = self.state.lock().await;
        if let Some(&missing) = [winner, loser]
            .iter()
            .find(|id| !state.players.contains_key(*id))
        {
            warn!("Rejected match {} over {}: player {} not registered", winner, loser, missing);
            return Err(StoreError::InvalidMatch {
                winner,
                loser,
                reason: format!("player {} is not registered", missing),
            });
        }

        if let Some(player) = state.players.get_mut(&winner) {
            player.record_win();
        }
        if let Some(player) = state.players.get_mut(&loser) {
            player.record_loss();
        }
        state.matches.push(record);

        info!("Recorded match: {} beat {}", winner, loser);
        Ok(())
    }

    async fn get_player(&self, id: PlayerId) -> Result<Player, StoreError> {
        self.state
            .lock()
            .await
            .players
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                operation: "get_player",
                id,
            })
    }

    async fn get_score(&self, id: PlayerId) -> Result<u32, StoreError> {
        self.state
            .lock()
            .await
            .players
            .get(&id)
            .map(|p| p.wins)
            .ok_or(StoreError::NotFound {
                operation: "get_score",
                id,
            })
    }

    async fn get_matches(&self, id: PlayerId) -> Result<u32, StoreError> {
        self.state
            .lock()
            .await
            .players
            .get(&id)
            .map(|p| p.matches)
            .ok_or(StoreError::NotFound {
                operation: "get_matches",
                id,
            })
    }

    async fn get_players(&self) -> Result<BTreeMap<PlayerId, String>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .players
            .iter()
            .map(|(&id, p)| (id, p.name.clone()))
            .collect())
    }

    async fn player_standings(&self) -> Result<Vec<Standing>, StoreError> {
        let state = self.state.lock().await;
        // Players iterate in id order; the stable sort keeps it within ties.
        let mut standings: Vec<Standing> = state.players.values().map(Standing::from).collect();
        standings.sort_by_key(|s| Reverse(s.wins));

        debug!("Loaded standings for {} players", standings.len());
        Ok(standings)
    }
}
