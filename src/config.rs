use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::error::EngineError;
use crate::state::Tile;

/// Every tunable constant of the engine. All sections default to the values
/// the heuristics were tuned with, so a partial JSON document only needs to
/// name the knobs it changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub arena: ArenaConfig,
    pub analysis: AnalysisConfig,
    pub elixir: ElixirConfig,
    pub opponent: OpponentConfig,
    pub combo: ComboConfig,
    pub defense: DefenseConfig,
    pub phase: PhaseSettings,
    pub scoring: ScoringConfig,
    pub integration: IntegrationConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.arena.width <= 0 || self.arena.height <= 0 {
            return Err(EngineError::InvalidConfiguration(
                "arena dimensions must be positive",
            ));
        }
        let a = &self.analysis;
        if !(a.near_distance <= a.mid_distance && a.mid_distance <= a.far_distance) {
            return Err(EngineError::InvalidConfiguration(
                "distance bands must be increasing",
            ));
        }
        let p = &self.phase;
        if !(p.mid_start < p.late_start && p.late_start < p.overtime_start) {
            return Err(EngineError::InvalidConfiguration(
                "phase thresholds must be increasing",
            ));
        }
        if !(0.0..=1.0).contains(&p.very_low_health) || p.very_low_health > p.low_health {
            return Err(EngineError::InvalidConfiguration(
                "health fractions must satisfy 0 <= very_low <= low <= 1",
            ));
        }
        if self.opponent.window == 0 {
            return Err(EngineError::InvalidConfiguration(
                "opponent window must hold at least one play",
            ));
        }
        if !(0.0..=1.0).contains(&self.defense.learning_rate) {
            return Err(EngineError::InvalidConfiguration(
                "learning rate must lie in [0, 1]",
            ));
        }
        let i = &self.integration;
        if i.weight_min > i.weight_max {
            return Err(EngineError::InvalidConfiguration(
                "category weight bounds are inverted",
            ));
        }
        if i.cache_ttl < 0.0 {
            return Err(EngineError::InvalidConfiguration("cache ttl is negative"));
        }
        let s = &self.scoring;
        if s.max_base_score <= 0.0 || s.placement_falloff <= 0.0 {
            return Err(EngineError::InvalidConfiguration(
                "score cap and placement falloff must be positive",
            ));
        }
        let e = &self.elixir;
        if e.cheap_cost >= e.expensive_cost {
            return Err(EngineError::InvalidConfiguration(
                "cheap cost must be below expensive cost",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub width: i32,
    pub height: i32,
    pub left_goal: Tile,
    pub right_goal: Tile,
    /// Columns at or left of this belong to the left lane.
    pub lane_split_x: i32,
    /// Rows at or beyond this are on our side of the river.
    pub own_side_y: i32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 18,
            height: 32,
            left_goal: Tile::new(3, 14),
            right_goal: Tile::new(15, 14),
            lane_split_x: 9,
            own_side_y: 10,
        }
    }
}

impl ArenaConfig {
    pub fn contains(&self, tile: Tile) -> bool {
        (0..self.width).contains(&tile.x) && (0..self.height).contains(&tile.y)
    }

    pub fn is_left_lane(&self, tile: Tile) -> bool {
        tile.x <= self.lane_split_x
    }

    pub fn distance_to_goal(&self, tile: Tile) -> f32 {
        tile.distance(self.left_goal)
            .min(tile.distance(self.right_goal))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub near_distance: f32,
    pub mid_distance: f32,
    pub far_distance: f32,
    pub deficit_no_units: u8,
    pub deficit_one_unit: u8,
    pub deficit_crowded: u8,
    pub opportunity_deficit: u8,
    pub attack_resource: f32,
    pub forced_attack_resource: f32,
    pub attack_lane_resource: f32,
    pub should_attack_deficit: u8,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            near_distance: 3.0,
            mid_distance: 6.0,
            far_distance: 10.0,
            deficit_no_units: 6,
            deficit_one_unit: 3,
            deficit_crowded: 1,
            opportunity_deficit: 4,
            attack_resource: 6.0,
            forced_attack_resource: 9.0,
            attack_lane_resource: 7.0,
            should_attack_deficit: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElixirConfig {
    pub regen_rate: f32,
    pub double_elixir_time: f32,
    pub opponent_initial: f32,
    pub leak_margin: f32,
    pub conserve_at_or_below: f32,
    pub spend_at_or_above: f32,
    pub advantage_threshold: f32,
    pub history_len: usize,
    /// Answers worth their elixir in any situation.
    pub critical_defense: Vec<Card>,
    pub high_value_attack: Vec<Card>,
    pub efficient_defense: Vec<Card>,
    pub moderate_attack: Vec<Card>,
    /// Lead needed before a high-value win condition is rated as such.
    pub high_value_advantage: f32,
    pub cheap_cost: u8,
    pub heavy_cost: u8,
    pub expensive_cost: u8,
    pub cheap_value: f32,
    pub expensive_value: f32,
    pub ahead_value: f32,
    pub behind_value: f32,
    pub critical_defense_value: f32,
    pub high_value_attack_value: f32,
    /// Cheap cards get `cheap_timing` at or below this bar.
    pub cheap_timing_at_or_below: f32,
    pub cheap_timing: f32,
    /// Heavy cards get `heavy_timing` at or above this bar.
    pub heavy_timing_at_or_above: f32,
    pub heavy_timing: f32,
    pub recommend_value: f32,
    pub cycle_recommend_value: f32,
    pub base_risk: f32,
    pub expensive_risk: f32,
    pub cheap_risk: f32,
    pub low_bank: f32,
    pub low_bank_risk: f32,
}

impl Default for ElixirConfig {
    fn default() -> Self {
        Self {
            regen_rate: 1.0,
            double_elixir_time: 120.0,
            opponent_initial: 5.0,
            leak_margin: 1.0,
            conserve_at_or_below: 2.0,
            spend_at_or_above: 8.0,
            advantage_threshold: 3.0,
            history_len: 50,
            critical_defense: vec![
                Card::InfernoTower,
                Card::Cannon,
                Card::Tesla,
                Card::BombTower,
                Card::MiniPekka,
                Card::Pekka,
                Card::Valkyrie,
                Card::Knight,
            ],
            high_value_attack: vec![
                Card::Giant,
                Card::Golem,
                Card::Pekka,
                Card::MegaKnight,
                Card::HogRider,
                Card::RamRider,
                Card::Balloon,
            ],
            efficient_defense: vec![
                Card::Archers,
                Card::Musketeer,
                Card::Wizard,
                Card::ElectroWizard,
                Card::Skeletons,
                Card::Goblins,
                Card::SpearGoblins,
            ],
            moderate_attack: vec![Card::Knight, Card::Valkyrie, Card::MiniPekka, Card::BabyDragon],
            high_value_advantage: 2.0,
            cheap_cost: 3,
            heavy_cost: 6,
            expensive_cost: 7,
            cheap_value: 1.2,
            expensive_value: 0.8,
            ahead_value: 1.3,
            behind_value: 0.7,
            critical_defense_value: 1.5,
            high_value_attack_value: 1.3,
            cheap_timing_at_or_below: 6.0,
            cheap_timing: 1.2,
            heavy_timing_at_or_above: 8.0,
            heavy_timing: 1.1,
            recommend_value: 1.2,
            cycle_recommend_value: 1.0,
            base_risk: 0.5,
            expensive_risk: 0.3,
            cheap_risk: 0.2,
            low_bank: 4.0,
            low_bank_risk: 0.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpponentConfig {
    /// Plays kept for cycle detection and deck coverage.
    pub window: usize,
    pub default_cost: u8,
    pub cooccurrence_seconds: f32,
    pub full_cycle_seconds: f32,
    pub unseen_bonus_after: f32,
    pub min_style_plays: usize,
    pub pattern_min_len: usize,
    pub pattern_max_len: usize,
    pub log_len: usize,
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            window: 8,
            default_cost: 4,
            cooccurrence_seconds: 5.0,
            full_cycle_seconds: 30.0,
            unseen_bonus_after: 20.0,
            min_style_plays: 5,
            pattern_min_len: 2,
            pattern_max_len: 4,
            log_len: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    pub start_threshold: f32,
    pub recent_history: usize,
    pub repeat_penalty: f32,
    /// Seconds past a step's deadline before an unaffordable combo is dropped.
    pub stale_after: f32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            start_threshold: 0.6,
            recent_history: 3,
            repeat_penalty: 0.7,
            stale_after: 8.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    pub learning_rate: f32,
    pub urgent_secondary_delay: f32,
    pub secondary_delay: f32,
    pub extra_card_delay: f32,
    pub counter_attack_min_elixir: f32,
    pub spell_threat_count: usize,
    /// Distance bands scaling a threat's base priority into urgency.
    pub close_distance: f32,
    pub close_urgency: f32,
    pub near_distance: f32,
    pub near_urgency: f32,
    pub distant_distance: f32,
    pub distant_urgency: f32,
    pub max_urgency: f32,
    /// Urgency at or above which a response is immediate.
    pub immediate_urgency: f32,
    /// Seconds a measured (not immediate) response waits for the threat to close in.
    pub measured_response_delay: f32,
    pub building_left: Tile,
    pub building_right: Tile,
    pub troop_left: Tile,
    pub troop_right: Tile,
    /// Secondary cards fan out from here, one column per extra card.
    pub secondary_left: Tile,
    pub secondary_right: Tile,
    pub base_effectiveness: f32,
    pub category_match_bonus: f32,
    pub secondary_bonus: f32,
    pub dangerous_threat_priority: f32,
    pub dangerous_threat_penalty: f32,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.2,
            urgent_secondary_delay: 1.0,
            secondary_delay: 2.0,
            extra_card_delay: 0.5,
            counter_attack_min_elixir: 4.0,
            spell_threat_count: 3,
            close_distance: 3.0,
            close_urgency: 1.5,
            near_distance: 6.0,
            near_urgency: 1.2,
            distant_distance: 12.0,
            distant_urgency: 0.7,
            max_urgency: 10.0,
            immediate_urgency: 8.0,
            measured_response_delay: 0.5,
            building_left: Tile::new(6, 9),
            building_right: Tile::new(12, 9),
            troop_left: Tile::new(7, 11),
            troop_right: Tile::new(11, 11),
            secondary_left: Tile::new(8, 10),
            secondary_right: Tile::new(10, 10),
            base_effectiveness: 0.6,
            category_match_bonus: 0.3,
            secondary_bonus: 0.1,
            dangerous_threat_priority: 9.0,
            dangerous_threat_penalty: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseSettings {
    pub mid_start: f32,
    pub late_start: f32,
    pub overtime_start: f32,
    pub low_health: f32,
    pub very_low_health: f32,
    pub promotion_advantage: f32,
    pub advantage_window: usize,
    pub performance_window: usize,
    pub min_samples: usize,
    /// Average outcome above which a phase grows bolder.
    pub tune_up_above: f32,
    /// Average outcome below which a phase backs off.
    pub tune_down_below: f32,
    pub tune_up_step: f32,
    pub tune_down_step: f32,
    pub tune_floor: f32,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            mid_start: 60.0,
            late_start: 180.0,
            overtime_start: 300.0,
            low_health: 0.3,
            very_low_health: 0.1,
            promotion_advantage: 3.0,
            advantage_window: 5,
            performance_window: 20,
            min_samples: 10,
            tune_up_above: 0.7,
            tune_down_below: 0.3,
            tune_up_step: 0.05,
            tune_down_step: 0.1,
            tune_floor: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub cache_ttl: f32,
    pub weight_interval: f32,
    pub weight_step: f32,
    pub weight_min: f32,
    pub weight_max: f32,
    pub opponent_analysis_interval: f32,
    pub phase_tuning_interval: f32,
    /// Seconds after a tank recommendation during which support plays are suggested.
    pub support_window: f32,
    pub fallback_delay: f32,
    /// Recent outcomes kept per category for weight tuning.
    pub outcome_window: usize,
    pub weight_min_samples: usize,
    /// Seconds after a successful defense during which a counter-push is offered.
    pub counter_push_window: f32,
    /// Success rate above which a category's weight rises.
    pub weight_raise_above: f32,
    /// Success rate below which a category's weight falls.
    pub weight_lower_below: f32,
    /// Seconds of opposing spend considered when deciding a forced push.
    pub forced_push_lookback: f32,
    pub support_tile: Tile,
    pub combo_step: TrackSetting,
    /// Priority of starting a combo; its confidence is the combo's score.
    pub combo_start_priority: u8,
    pub counter_push: TrackSetting,
    pub forced_push: TrackSetting,
    /// Priority of an opportunity attack; its confidence comes from the opportunity.
    pub attack_priority: u8,
    pub leak: TrackSetting,
    pub conserve: TrackSetting,
    pub support: TrackSetting,
    pub scoring_priority: u8,
    pub idle: TrackSetting,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            cache_ttl: 1.0,
            weight_interval: 10.0,
            weight_step: 0.05,
            weight_min: 0.5,
            weight_max: 1.5,
            opponent_analysis_interval: 10.0,
            phase_tuning_interval: 10.0,
            support_window: 4.0,
            fallback_delay: 1.0,
            outcome_window: 20,
            weight_min_samples: 5,
            counter_push_window: 3.0,
            weight_raise_above: 0.7,
            weight_lower_below: 0.3,
            forced_push_lookback: 10.0,
            support_tile: Tile::new(9, 6),
            combo_step: TrackSetting::new(5, 0.9),
            combo_start_priority: 4,
            counter_push: TrackSetting::new(4, 0.7),
            forced_push: TrackSetting::new(3, 0.6),
            attack_priority: 4,
            leak: TrackSetting::new(3, 0.9),
            conserve: TrackSetting::new(2, 0.7),
            support: TrackSetting::new(3, 0.6),
            scoring_priority: 2,
            idle: TrackSetting::new(1, 0.5),
        }
    }
}

/// Priority and base confidence a decision track attaches to its proposal.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSetting {
    pub priority: u8,
    pub confidence: f32,
}

impl TrackSetting {
    pub const fn new(priority: u8, confidence: f32) -> Self {
        Self {
            priority,
            confidence,
        }
    }
}

/// Multipliers applied when rating a single placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub max_base_score: f32,
    /// Win condition spot when pushing.
    pub attack_tile: Tile,
    /// Win condition spot when holding back.
    pub hold_tile: Tile,
    pub left_defense_tile: Tile,
    pub right_defense_tile: Tile,
    pub center_defense_tile: Tile,
    pub default_tile: Tile,
    /// Tiles of distance that cost the full placement penalty.
    pub placement_falloff: f32,
    pub max_placement_penalty: f32,
    pub immediate_defense: f32,
    pub defense: f32,
    pub confident_opportunity: f32,
    pub confident_attack: f32,
    pub attack: f32,
    pub attack_support: f32,
    pub spell_threat_count: usize,
    pub spell_against_many: f32,
    pub early_cycle: f32,
    pub late_cycle: f32,
    pub early_tank: f32,
    pub tank: f32,
    pub cycle_strategy: f32,
    pub defensive_strategy: f32,
    pub heavy_tank_strategy: f32,
    pub big_win_conditions: Vec<Card>,
    pub expensive_units: Vec<Card>,
    pub rich_at_or_above: f32,
    pub rich: f32,
    pub poor_at_or_below: f32,
    pub expensive_when_poor: f32,
    pub punish_deficit: u8,
    pub punish: f32,
    /// Applied when the elixir optimizer rates the card.
    pub elixir_recommended: f32,
    pub elixir_not_recommended: f32,
    /// Cards above this cost are discouraged on a critical bar.
    pub critical_bar_max_cost: u8,
    pub critical_bar: f32,
    pub full_bar: f32,
    /// Applied to answers for the opponent's play style.
    pub style_counter: f32,
    /// Applied to answers for a card the opponent is expected to play.
    pub expected_counter: f32,
    pub prediction_confidence: f32,
    /// Predictions considered when looking for expected cards.
    pub predictions_considered: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_base_score: 2.0,
            attack_tile: Tile::new(9, 7),
            hold_tile: Tile::new(9, 4),
            left_defense_tile: Tile::new(7, 10),
            right_defense_tile: Tile::new(11, 10),
            center_defense_tile: Tile::new(9, 10),
            default_tile: Tile::new(9, 6),
            placement_falloff: 30.0,
            max_placement_penalty: 0.2,
            immediate_defense: 1.8,
            defense: 1.4,
            confident_opportunity: 0.7,
            confident_attack: 1.6,
            attack: 1.2,
            attack_support: 1.3,
            spell_threat_count: 3,
            spell_against_many: 1.5,
            early_cycle: 1.2,
            late_cycle: 0.9,
            early_tank: 0.8,
            tank: 1.3,
            cycle_strategy: 1.4,
            defensive_strategy: 1.3,
            heavy_tank_strategy: 1.5,
            big_win_conditions: vec![Card::Golem, Card::Giant, Card::ElectroGiant, Card::LavaHound],
            expensive_units: vec![Card::Golem, Card::ElectroGiant, Card::Pekka, Card::MegaKnight],
            rich_at_or_above: 9.0,
            rich: 1.2,
            poor_at_or_below: 5.0,
            expensive_when_poor: 0.6,
            punish_deficit: 4,
            punish: 1.4,
            elixir_recommended: 1.3,
            elixir_not_recommended: 0.7,
            critical_bar_max_cost: 3,
            critical_bar: 0.5,
            full_bar: 1.2,
            style_counter: 1.2,
            expected_counter: 1.1,
            prediction_confidence: 0.5,
            predictions_considered: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "integration": { "cache_ttl": 0.5 } }"#).unwrap();
        assert_eq!(config.integration.cache_ttl, 0.5);
        assert_eq!(config.integration.weight_max, 1.5);
        assert_eq!(config.phase, PhaseSettings::default());
    }

    #[test]
    fn rejects_inverted_phase_thresholds() {
        let err = EngineConfig::from_json_str(r#"{ "phase": { "late_start": 30.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn nested_tables_are_overridable() {
        let config = EngineConfig::from_json_str(
            r#"{
                "scoring": { "attack_tile": { "x": 12, "y": 8 } },
                "elixir": { "critical_defense": ["cannon"] },
                "integration": { "combo_step": { "priority": 4, "confidence": 0.8 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.scoring.attack_tile, Tile::new(12, 8));
        assert_eq!(config.scoring.hold_tile, Tile::new(9, 4));
        assert_eq!(config.elixir.critical_defense, vec![Card::Cannon]);
        assert_eq!(config.integration.combo_step, TrackSetting::new(4, 0.8));
        assert_eq!(config.integration.leak, TrackSetting::new(3, 0.9));
    }

    #[test]
    fn rejects_non_positive_score_cap() {
        let err = EngineConfig::from_json_str(r#"{ "scoring": { "max_base_score": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = EngineConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
