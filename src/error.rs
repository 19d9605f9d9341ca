use thiserror::Error;

use crate::card::Card;

/// Errors that can occur while constructing a decision engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid deck: {0}")]
    InvalidDeck(#[from] DeckError),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Details of a rejected loadout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck must contain exactly {expected} cards, got {actual}")]
    WrongSize { expected: usize, actual: usize },
    #[error("card {0} appears more than once")]
    DuplicateCard(Card),
}

/// Returned when a detector name matches no known card.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown card name: {0}")]
pub struct UnknownCard(pub String);

/// Per-candidate scoring faults. These never reach callers of the engine;
/// the offending candidate is dropped and the fault is logged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    #[error("hand index {0} is out of range")]
    HandIndex(usize),
    #[error("tile ({x}, {y}) is outside the arena")]
    TileOutOfBounds { x: i32, y: i32 },
    #[error("score for {card} is not finite")]
    NonFinite { card: Card },
}
