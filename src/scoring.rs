//! Per-placement scoring.
//!
//! Every legal `(card, tile)` pair is rated independently. A candidate whose
//! evaluation faults is dropped and logged; the rest still compete.

use std::collections::BTreeSet;

use crate::action::Candidate;
use crate::analysis::{MatchMode, StateAnalysis, ThreatLevel};
use crate::card::{Card, CardCatalog, CardRole};
use crate::combo::ComboCoordinator;
use crate::config::{ArenaConfig, ScoringConfig};
use crate::deck::{Deck, Strategy};
use crate::elixir::{ElixirAnalysis, ElixirState};
use crate::error::ScoringError;
use crate::opponent::PlayStyle;
use crate::phase::{MatchPhase, PhaseController};
use crate::state::{MatchSnapshot, Tile};

/// Everything a candidate is judged against during one cycle.
pub struct ScoringContext<'a> {
    pub snapshot: &'a MatchSnapshot,
    pub analysis: &'a StateAnalysis,
    pub deck: &'a Deck,
    pub catalog: &'a CardCatalog,
    pub phase: &'a PhaseController,
    pub combos: &'a ComboCoordinator,
    pub elixir: &'a ElixirAnalysis,
    pub opponent_style: PlayStyle,
    /// Own cards that answer something the opponent is expected to play.
    pub expected_counters: &'a BTreeSet<Card>,
}

#[derive(Clone, Debug)]
pub struct ActionScorer {
    arena: ArenaConfig,
    config: ScoringConfig,
}

impl ActionScorer {
    pub fn new(arena: ArenaConfig, config: ScoringConfig) -> Self {
        Self { arena, config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Every affordable playable card crossed with every legal tile. With no
    /// legal tile list, each card is offered at its role position.
    pub fn candidates(&self, ctx: &ScoringContext<'_>) -> Vec<Candidate> {
        let resource = ctx.snapshot.resource();
        let mut out = Vec::new();
        for (hand_index, card) in ctx.snapshot.playable_cards() {
            if !ctx.catalog.affordable(card, resource) {
                continue;
            }
            if ctx.snapshot.legal_tiles.is_empty() {
                out.push(Candidate {
                    card,
                    hand_index,
                    tile: self.role_position(card, ctx.analysis, ctx.catalog),
                });
            } else {
                out.extend(ctx.snapshot.legal_tiles.iter().map(|tile| Candidate {
                    card,
                    hand_index,
                    tile: *tile,
                }));
            }
        }
        out
    }

    /// Preferred tile for a card given its main role.
    pub fn role_position(&self, card: Card, analysis: &StateAnalysis, catalog: &CardCatalog) -> Tile {
        let c = &self.config;
        if catalog.has_role(card, CardRole::WinCondition) {
            if analysis.should_attack {
                c.attack_tile
            } else {
                c.hold_tile
            }
        } else if catalog.has_role(card, CardRole::Defense) || catalog.has_role(card, CardRole::Building) {
            match analysis.primary_threat() {
                Some(threat) if self.arena.is_left_lane(threat.position) => c.left_defense_tile,
                Some(_) => c.right_defense_tile,
                None => c.center_defense_tile,
            }
        } else {
            c.default_tile
        }
    }

    pub fn score(&self, candidate: &Candidate, ctx: &ScoringContext<'_>) -> Result<f32, ScoringError> {
        let card = candidate.card;
        if ctx.snapshot.own_hand.get(candidate.hand_index) != Some(&card) {
            return Err(ScoringError::HandIndex(candidate.hand_index));
        }
        if !self.arena.contains(candidate.tile) {
            return Err(ScoringError::TileOutOfBounds {
                x: candidate.tile.x,
                y: candidate.tile.y,
            });
        }
        if !ctx.catalog.affordable(card, ctx.snapshot.resource()) {
            return Ok(0.0);
        }

        let base = self.role_modifier(card, ctx)
            * self.phase_modifier(card, ctx.phase.phase(), ctx.catalog)
            * self.strategy_modifier(card, ctx.deck.strategy(), ctx.catalog)
            * self.situational_modifier(card, ctx.analysis, ctx.catalog)
            * self.elixir_modifier(card, ctx)
            * self.opponent_modifier(card, ctx)
            * self.placement_fit(candidate, ctx);
        let score = base.clamp(0.0, self.config.max_base_score) * ctx.combos.priority_boost(card);
        if !score.is_finite() {
            return Err(ScoringError::NonFinite { card });
        }
        Ok(score)
    }

    /// Scores every candidate and returns the survivors, best first.
    pub fn rank(&self, candidates: &[Candidate], ctx: &ScoringContext<'_>) -> Vec<(Candidate, f32)> {
        let mut scored: Vec<(Candidate, f32)> = candidates
            .iter()
            .filter_map(|candidate| match self.score(candidate, ctx) {
                Ok(score) => Some((*candidate, score)),
                Err(err) => {
                    tracing::warn!(card = %candidate.card, error = %err, "candidate excluded");
                    None
                }
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    fn role_modifier(&self, card: Card, ctx: &ScoringContext<'_>) -> f32 {
        let c = &self.config;
        let analysis = ctx.analysis;
        let catalog = ctx.catalog;
        let mut modifier = 1.0;
        if analysis.should_defend && catalog.has_role(card, CardRole::Defense) {
            let immediate = analysis
                .primary_threat()
                .is_some_and(|t| t.requires_immediate_response);
            modifier *= if immediate { c.immediate_defense } else { c.defense };
        }
        if analysis.should_attack && catalog.has_role(card, CardRole::WinCondition) {
            let confident = analysis
                .best_opportunity()
                .is_some_and(|o| o.confidence >= c.confident_opportunity);
            modifier *= if confident { c.confident_attack } else { c.attack };
        }
        if analysis.mode == MatchMode::Attack && catalog.has_role(card, CardRole::Support) {
            modifier *= c.attack_support;
        }
        let threats = analysis
            .threats
            .iter()
            .filter(|t| t.level > ThreatLevel::None)
            .count();
        if threats >= c.spell_threat_count && catalog.has_role(card, CardRole::Spell) {
            modifier *= c.spell_against_many;
        }
        modifier
    }

    fn phase_modifier(&self, card: Card, phase: MatchPhase, catalog: &CardCatalog) -> f32 {
        let c = &self.config;
        if catalog.has_role(card, CardRole::Cycle) {
            match phase {
                MatchPhase::Early => c.early_cycle,
                MatchPhase::Late | MatchPhase::Overtime => c.late_cycle,
                MatchPhase::Mid => 1.0,
            }
        } else if catalog.has_role(card, CardRole::Tank) {
            match phase {
                MatchPhase::Early => c.early_tank,
                _ => c.tank,
            }
        } else {
            1.0
        }
    }

    fn strategy_modifier(&self, card: Card, strategy: Strategy, catalog: &CardCatalog) -> f32 {
        let c = &self.config;
        match strategy {
            Strategy::Cycle if catalog.has_role(card, CardRole::Cycle) => c.cycle_strategy,
            Strategy::Defensive if catalog.has_role(card, CardRole::Defense) => c.defensive_strategy,
            Strategy::HeavyTank if c.big_win_conditions.contains(&card) => c.heavy_tank_strategy,
            _ => 1.0,
        }
    }

    fn situational_modifier(&self, card: Card, analysis: &StateAnalysis, catalog: &CardCatalog) -> f32 {
        let c = &self.config;
        let resource = analysis.own_resource;
        let mut modifier = 1.0;
        if resource >= c.rich_at_or_above {
            modifier *= c.rich;
        }
        if c.expensive_units.contains(&card) && resource <= c.poor_at_or_below {
            modifier *= c.expensive_when_poor;
        }
        if analysis.opponent_deficit >= c.punish_deficit && catalog.has_role(card, CardRole::WinCondition) {
            modifier *= c.punish;
        }
        modifier
    }

    /// What the elixir optimizer thinks of spending on this card now.
    fn elixir_modifier(&self, card: Card, ctx: &ScoringContext<'_>) -> f32 {
        let c = &self.config;
        let mut modifier = match ctx.elixir.opportunity(card) {
            Some(o) if o.recommended => c.elixir_recommended,
            Some(_) => c.elixir_not_recommended,
            None => 1.0,
        };
        match ctx.elixir.state {
            ElixirState::Critical if ctx.catalog.cost(card) > c.critical_bar_max_cost => {
                modifier *= c.critical_bar;
            }
            ElixirState::Full => modifier *= c.full_bar,
            _ => {}
        }
        modifier
    }

    /// Leans against the opponent's observed style and expected next cards.
    fn opponent_modifier(&self, card: Card, ctx: &ScoringContext<'_>) -> f32 {
        let c = &self.config;
        let catalog = ctx.catalog;
        let mut modifier = match ctx.opponent_style {
            PlayStyle::Aggressive
                if catalog.has_role(card, CardRole::Defense)
                    || catalog.has_role(card, CardRole::Building) =>
            {
                c.style_counter
            }
            PlayStyle::Defensive if catalog.has_role(card, CardRole::WinCondition) => c.style_counter,
            _ => 1.0,
        };
        if ctx.expected_counters.contains(&card) {
            modifier *= c.expected_counter;
        }
        modifier
    }

    /// Closeness of the tile to the card's role position, in
    /// `[1 - max_placement_penalty, 1]`.
    fn placement_fit(&self, candidate: &Candidate, ctx: &ScoringContext<'_>) -> f32 {
        let c = &self.config;
        let preferred = self.role_position(candidate.card, ctx.analysis, ctx.catalog);
        1.0 - (candidate.tile.distance(preferred) / c.placement_falloff).min(c.max_placement_penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RecommendedStrategy;
    use crate::combo::ComboCatalog;
    use crate::config::{ComboConfig, ElixirConfig, PhaseSettings};
    use crate::elixir::ElixirOptimizer;

    struct Fixture {
        catalog: CardCatalog,
        deck: Deck,
        snapshot: MatchSnapshot,
        analysis: StateAnalysis,
        phase: PhaseController,
        combos: ComboCoordinator,
        elixir: ElixirAnalysis,
        expected_counters: BTreeSet<Card>,
    }

    impl Fixture {
        fn new(resource: f32, hand: Vec<Card>) -> Self {
            let catalog = CardCatalog::default();
            let deck = Deck::new(
                vec![
                    Card::Giant,
                    Card::Musketeer,
                    Card::MiniPekka,
                    Card::Fireball,
                    Card::Zap,
                    Card::Knight,
                    Card::Archers,
                    Card::Cannon,
                ],
                &catalog,
            )
            .unwrap();
            let elixir = ElixirOptimizer::new(ElixirConfig::default()).analyze(resource, &hand, &catalog);
            let combos = ComboCoordinator::new(ComboConfig::default(), &ComboCatalog::default(), deck.cards());
            Self {
                snapshot: MatchSnapshot {
                    own_resource: resource,
                    own_playable_indices: (0..hand.len()).collect(),
                    own_hand: hand,
                    ..MatchSnapshot::default()
                },
                analysis: quiet_analysis(resource),
                phase: PhaseController::new(PhaseSettings::default()),
                combos,
                elixir,
                expected_counters: BTreeSet::new(),
                catalog,
                deck,
            }
        }

        fn ctx(&self, opponent_style: PlayStyle) -> ScoringContext<'_> {
            ScoringContext {
                snapshot: &self.snapshot,
                analysis: &self.analysis,
                deck: &self.deck,
                catalog: &self.catalog,
                phase: &self.phase,
                combos: &self.combos,
                elixir: &self.elixir,
                opponent_style,
                expected_counters: &self.expected_counters,
            }
        }

        fn score_at_role_position(&self, scorer: &ActionScorer, hand_index: usize, style: PlayStyle) -> f32 {
            let card = self.snapshot.own_hand[hand_index];
            let candidate = Candidate {
                card,
                hand_index,
                tile: scorer.role_position(card, &self.analysis, &self.catalog),
            };
            scorer.score(&candidate, &self.ctx(style)).unwrap()
        }
    }

    fn quiet_analysis(resource: f32) -> StateAnalysis {
        StateAnalysis {
            threats: Vec::new(),
            opportunities: Vec::new(),
            mode: MatchMode::Neutral,
            own_resource: resource,
            opponent_deficit: 1,
            should_defend: false,
            should_attack: false,
            recommended_strategy: RecommendedStrategy::WaitAndReact,
        }
    }

    fn scorer() -> ActionScorer {
        ActionScorer::new(ArenaConfig::default(), ScoringConfig::default())
    }

    #[test]
    fn mismatched_hand_index_is_a_fault() {
        let fixture = Fixture::new(5.0, vec![Card::Knight]);
        let ctx = fixture.ctx(PlayStyle::Unknown);
        let scorer = scorer();
        let good = Candidate {
            card: Card::Knight,
            hand_index: 0,
            tile: Tile::new(9, 6),
        };
        let bad = Candidate { hand_index: 3, ..good };
        let outside = Candidate {
            tile: Tile::new(40, 6),
            ..good
        };
        assert!(scorer.score(&good, &ctx).is_ok());
        assert_eq!(scorer.score(&bad, &ctx), Err(ScoringError::HandIndex(3)));
        assert!(scorer.score(&outside, &ctx).is_err());
        let ranked = scorer.rank(&[bad, good, outside], &ctx);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, good);
    }

    #[test]
    fn role_position_follows_threat_lane() {
        let catalog = CardCatalog::default();
        let scorer = scorer();
        let analysis = quiet_analysis(5.0);
        assert_eq!(scorer.role_position(Card::Cannon, &analysis, &catalog), Tile::new(9, 10));
        assert_eq!(scorer.role_position(Card::Giant, &analysis, &catalog), Tile::new(9, 4));
        assert_eq!(scorer.role_position(Card::Musketeer, &analysis, &catalog), Tile::new(9, 6));
    }

    #[test]
    fn role_tiles_come_from_config() {
        let catalog = CardCatalog::default();
        let config = ScoringConfig {
            hold_tile: Tile::new(4, 3),
            ..ScoringConfig::default()
        };
        let scorer = ActionScorer::new(ArenaConfig::default(), config);
        assert_eq!(
            scorer.role_position(Card::Giant, &quiet_analysis(5.0), &catalog),
            Tile::new(4, 3)
        );
    }

    #[test]
    fn elixir_recommendation_moves_the_score() {
        let mut fixture = Fixture::new(5.0, vec![Card::Knight]);
        let scorer = scorer();
        assert!(fixture.elixir.opportunity(Card::Knight).unwrap().recommended);
        let recommended = fixture.score_at_role_position(&scorer, 0, PlayStyle::Unknown);

        fixture.elixir.opportunities[0].recommended = false;
        let discouraged = fixture.score_at_role_position(&scorer, 0, PlayStyle::Unknown);
        assert!(recommended > discouraged);
        assert!((recommended / discouraged - 1.3 / 0.7).abs() < 1e-4);
    }

    #[test]
    fn full_bar_favours_spending() {
        let scorer = scorer();
        let low = Fixture::new(5.0, vec![Card::Knight]);
        let full = Fixture::new(10.0, vec![Card::Knight]);
        let low_score = low.score_at_role_position(&scorer, 0, PlayStyle::Unknown);
        let full_score = full.score_at_role_position(&scorer, 0, PlayStyle::Unknown);
        assert!(full_score > low_score);
    }

    #[test]
    fn opponent_style_favours_the_answer() {
        let fixture = Fixture::new(5.0, vec![Card::Cannon, Card::Giant]);
        let scorer = scorer();
        let neutral = fixture.score_at_role_position(&scorer, 0, PlayStyle::Unknown);
        let versus_aggro = fixture.score_at_role_position(&scorer, 0, PlayStyle::Aggressive);
        assert!((versus_aggro / neutral - 1.2).abs() < 1e-4);

        let neutral = fixture.score_at_role_position(&scorer, 1, PlayStyle::Unknown);
        let versus_turtle = fixture.score_at_role_position(&scorer, 1, PlayStyle::Defensive);
        let versus_aggro = fixture.score_at_role_position(&scorer, 1, PlayStyle::Aggressive);
        assert!((versus_turtle / neutral - 1.2).abs() < 1e-4);
        assert_eq!(versus_aggro, neutral);
    }

    #[test]
    fn expected_card_favours_its_counter() {
        let mut fixture = Fixture::new(5.0, vec![Card::MiniPekka]);
        let scorer = scorer();
        let before = fixture.score_at_role_position(&scorer, 0, PlayStyle::Unknown);
        fixture.expected_counters.insert(Card::MiniPekka);
        let after = fixture.score_at_role_position(&scorer, 0, PlayStyle::Unknown);
        assert!((after / before - 1.1).abs() < 1e-4);
    }
}
