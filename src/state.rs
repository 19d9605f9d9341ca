use serde::{Deserialize, Serialize};

use crate::card::{Card, ELIXIR_CAP};

/// Arena tile coordinate.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in tiles.
    pub fn distance(self, other: Tile) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Returns the member of `tiles` closest to `self`, or `self` when the set is empty.
    pub fn snap_to(self, tiles: &[Tile]) -> Tile {
        tiles
            .iter()
            .copied()
            .min_by(|a, b| {
                self.distance(*a)
                    .partial_cmp(&self.distance(*b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(self)
    }
}

/// A visible opposing unit. `card` is `None` when the detector could not
/// identify it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpposingUnit {
    pub card: Option<Card>,
    pub tile: Tile,
}

impl OpposingUnit {
    pub fn new(card: Card, tile: Tile) -> Self {
        Self {
            card: Some(card),
            tile,
        }
    }

    pub fn unknown(tile: Tile) -> Self {
        Self { card: None, tile }
    }
}

/// Remaining health of each goal structure as a fraction of full health.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalHealth {
    pub own_left: f32,
    pub own_right: f32,
    pub own_king: f32,
    pub enemy_left: f32,
    pub enemy_right: f32,
    pub enemy_king: f32,
}

impl Default for GoalHealth {
    fn default() -> Self {
        Self {
            own_left: 1.0,
            own_right: 1.0,
            own_king: 1.0,
            enemy_left: 1.0,
            enemy_right: 1.0,
            enemy_king: 1.0,
        }
    }
}

impl GoalHealth {
    /// Lowest remaining fraction among the four forward goals.
    pub fn lowest_forward(&self) -> f32 {
        [self.own_left, self.own_right, self.enemy_left, self.enemy_right]
            .into_iter()
            .fold(1.0_f32, f32::min)
    }
}

/// Observation of the match handed to the engine once per control cycle.
///
/// Every field has a default so partial snapshots deserialize; missing data
/// degrades to "nothing visible" rather than an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSnapshot {
    /// Seconds since the match started.
    pub elapsed_time: f32,
    pub own_resource: f32,
    pub own_hand: Vec<Card>,
    /// Indices into `own_hand` that the client reports as playable right now.
    pub own_playable_indices: Vec<usize>,
    pub opposing_units: Vec<OpposingUnit>,
    pub goal_health: GoalHealth,
    /// Tiles where a card may be placed. Empty means unrestricted.
    pub legal_tiles: Vec<Tile>,
}

impl MatchSnapshot {
    /// Resource clamped to the valid range; NaN reads as empty.
    pub fn resource(&self) -> f32 {
        if self.own_resource.is_nan() {
            0.0
        } else {
            self.own_resource.clamp(0.0, ELIXIR_CAP)
        }
    }

    /// Time clamped to be non-negative.
    pub fn now(&self) -> f32 {
        if self.elapsed_time.is_finite() {
            self.elapsed_time.max(0.0)
        } else {
            0.0
        }
    }

    /// Playable hand entries as `(hand index, card)` pairs. Indices that point
    /// past the hand are ignored.
    pub fn playable_cards(&self) -> impl Iterator<Item = (usize, Card)> + '_ {
        self.own_playable_indices
            .iter()
            .filter_map(|idx| self.own_hand.get(*idx).map(|card| (*idx, *card)))
    }

    pub fn is_playable(&self, card: Card) -> bool {
        self.playable_cards().any(|(_, c)| c == card)
    }

    pub fn hand_index_of(&self, card: Card) -> Option<usize> {
        self.playable_cards()
            .find(|(_, c)| *c == card)
            .map(|(idx, _)| idx)
    }

    /// Places `tile` on the nearest legal tile when the set is restricted.
    pub fn legalize(&self, tile: Tile) -> Tile {
        tile.snap_to(&self.legal_tiles)
    }
}
