//! Core data models for the tournament.

mod match_record;
mod pairing;
mod player;
mod standing;

pub use match_record::*;
pub use pairing::*;
pub use player::*;
pub use standing::*;
