use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::state::Tile;

/// What the engine wants the caller to do this cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Play,
    Wait,
    Defend,
    Attack,
    Combo,
    Cycle,
}

impl ActionKind {
    /// Kinds that place a card on the arena.
    pub fn places_card(self) -> bool {
        !matches!(self, ActionKind::Wait)
    }
}

/// Track that produced a recommendation. Each track carries its own adaptive weight.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Defense,
    Attack,
    Resource,
    Positioning,
    ComboTiming,
    GeneralScoring,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Defense,
        Category::Attack,
        Category::Resource,
        Category::Positioning,
        Category::ComboTiming,
        Category::GeneralScoring,
    ];
}

/// A single placement under consideration: the card, where it sits in hand,
/// and where it would go.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub card: Card,
    pub hand_index: usize,
    pub tile: Tile,
}

/// Output of one decision cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecommendation {
    pub kind: ActionKind,
    pub card: Option<Card>,
    pub position: Option<Tile>,
    pub confidence: f32,
    /// 1 (lowest) to 5 (highest).
    pub priority: u8,
    pub reasoning: Vec<String>,
    /// Seconds the caller should wait before executing.
    pub timing_delay: f32,
}

impl ActionRecommendation {
    pub fn new(kind: ActionKind, card: Card, position: Tile) -> Self {
        Self {
            kind,
            card: Some(card),
            position: Some(position),
            confidence: 0.5,
            priority: 3,
            reasoning: Vec::new(),
            timing_delay: 0.0,
        }
    }

    pub fn wait(confidence: f32, priority: u8, delay: f32) -> Self {
        Self {
            kind: ActionKind::Wait,
            card: None,
            position: None,
            confidence,
            priority,
            reasoning: Vec::new(),
            timing_delay: delay,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 5);
        self
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.timing_delay = delay.max(0.0);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasoning.push(reason.into());
        self
    }

    pub fn is_wait(&self) -> bool {
        self.kind == ActionKind::Wait
    }
}

/// A recommendation tagged with the track that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaggedRecommendation {
    pub category: Category,
    pub recommendation: ActionRecommendation,
}
