use rand::Rng;
use rand::seq::SliceRandom;

use crate::action::{ActionKind, ActionRecommendation};
use crate::card::CardCatalog;
use crate::config::ArenaConfig;
use crate::engine::DecisionEngine;
use crate::state::{MatchSnapshot, Tile};

/// Anything that turns a snapshot into a recommendation.
pub trait Advisor {
    fn advise(&mut self, snapshot: &MatchSnapshot) -> ActionRecommendation;

    /// Feedback on the last recommendation. Ignored by default.
    fn record_outcome(&mut self, _success: bool, _damage_dealt: u32) {}
}

impl Advisor for DecisionEngine {
    fn advise(&mut self, snapshot: &MatchSnapshot) -> ActionRecommendation {
        self.recommend(snapshot)
    }

    fn record_outcome(&mut self, success: bool, damage_dealt: u32) {
        DecisionEngine::record_outcome(self, success, damage_dealt);
    }
}

/// Baseline advisor that plays a uniformly random affordable card on a
/// uniformly random legal tile. Without a legal tile list it picks any
/// tile of the arena.
pub struct RandomAdvisor<R: Rng> {
    rng: R,
    catalog: CardCatalog,
    arena: ArenaConfig,
}

impl<R: Rng> RandomAdvisor<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            catalog: CardCatalog::default(),
            arena: ArenaConfig::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: CardCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_arena(mut self, arena: ArenaConfig) -> Self {
        self.arena = arena;
        self
    }
}

impl<R: Rng> Advisor for RandomAdvisor<R> {
    fn advise(&mut self, snapshot: &MatchSnapshot) -> ActionRecommendation {
        let resource = snapshot.resource();
        let options: Vec<_> = snapshot
            .playable_cards()
            .filter(|(_, card)| self.catalog.affordable(*card, resource))
            .map(|(_, card)| card)
            .collect();
        let Some(card) = options.choose(&mut self.rng).copied() else {
            return ActionRecommendation::wait(0.5, 1, 1.0).with_reason("no affordable card");
        };
        let tile = match snapshot.legal_tiles.choose(&mut self.rng) {
            Some(tile) => *tile,
            None => Tile::new(
                self.rng.gen_range(0..self.arena.width),
                self.rng.gen_range(0..self.arena.height),
            ),
        };
        ActionRecommendation::new(ActionKind::Play, card, tile)
            .with_confidence(0.1)
            .with_priority(1)
            .with_reason("random choice")
    }
}
