//! Pairing model: two adjacent-ranked players for the next round.

use serde::{Deserialize, Serialize};

use super::{PlayerId, Standing};

/// A pairing of two players: `(id1, name1, id2, name2)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    /// Higher-ranked player id
    pub id1: PlayerId,

    /// Higher-ranked player name
    pub name1: String,

    /// Lower-ranked player id
    pub id2: PlayerId,

    /// Lower-ranked player name
    pub name2: String,
}

impl Pairing {
    /// Pair two standings entries, first one ranked higher.
    pub fn new(first: &Standing, second: &Standing) -> Self {
        Self {
            id1: first.id,
            name1: first.name.clone(),
            id2: second.id,
            name2: second.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(id: PlayerId, name: &str, wins: u32) -> Standing {
        Standing {
            id,
            name: name.to_string(),
            wins,
            matches: wins,
        }
    }

    #[test]
    fn test_pairing_creation() {
        let pairing = Pairing::new(&standing(1, "Alice", 2), &standing(2, "Bob", 1));

        assert_eq!(pairing.id1, 1);
        assert_eq!(pairing.name1, "Alice");
        assert_eq!(pairing.id2, 2);
        assert_eq!(pairing.name2, "Bob");
    }

    #[test]
    fn test_pairing_serialization() {
        let pairing = Pairing::new(&standing(1, "Alice", 1), &standing(3, "Carol", 1));

        let json = serde_json::to_string(&pairing).unwrap();
        let deserialized: Pairing = serde_json::from_str(&json).unwrap();
        assert_eq!(pairing, deserialized);
    }
}
