//! Standings entries.

use serde::{Deserialize, Serialize};

use super::{Player, PlayerId};

/// One row of the ranked standings: `(id, name, wins, matches)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Standing {
    pub id: PlayerId,
    pub name: String,
    pub wins: u32,
    pub matches: u32,
}

impl From<&Player> for Standing {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            wins: player.wins,
            matches: player.matches,
        }
    }
}
