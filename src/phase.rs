use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardCatalog, CardRole};
use crate::config::PhaseSettings;
use crate::state::GoalHealth;

/// Stage of the match. Only ever moves forward within one match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Early,
    Mid,
    Late,
    Overtime,
}

impl MatchPhase {
    pub const ALL: [MatchPhase; 4] = [
        MatchPhase::Early,
        MatchPhase::Mid,
        MatchPhase::Late,
        MatchPhase::Overtime,
    ];

    fn next(self) -> Option<MatchPhase> {
        match self {
            MatchPhase::Early => Some(MatchPhase::Mid),
            MatchPhase::Mid => Some(MatchPhase::Late),
            MatchPhase::Late => Some(MatchPhase::Overtime),
            MatchPhase::Overtime => None,
        }
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchPhase::Early => "early",
            MatchPhase::Mid => "mid",
            MatchPhase::Late => "late",
            MatchPhase::Overtime => "overtime",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStrategy {
    Conservative,
    Balanced,
    Aggressive,
    AllIn,
    Defensive,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhasePriority {
    ElixirAdvantage,
    TowerDamage,
    CycleControl,
    DefensiveSetup,
    SpellCycling,
    PressureMaintain,
}

/// Kinds of plays a phase can veto.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseAction {
    ElixirSpending,
    TowerAttack,
    DefensivePlay,
    SpellCycle,
    ComboExecution,
    AggressiveCombo,
    ElixirConservation,
}

impl PhaseAction {
    fn required_priority(self) -> Option<PhasePriority> {
        match self {
            PhaseAction::ElixirSpending => Some(PhasePriority::ElixirAdvantage),
            PhaseAction::TowerAttack => Some(PhasePriority::TowerDamage),
            PhaseAction::DefensivePlay => Some(PhasePriority::DefensiveSetup),
            PhaseAction::SpellCycle => Some(PhasePriority::SpellCycling),
            PhaseAction::ComboExecution => Some(PhasePriority::PressureMaintain),
            PhaseAction::AggressiveCombo | PhaseAction::ElixirConservation => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardValueModifiers {
    pub cheap: f32,
    pub expensive: f32,
    pub defensive: f32,
    pub win_conditions: f32,
    pub damage_spells: f32,
    pub combo: f32,
}

impl Default for CardValueModifiers {
    fn default() -> Self {
        Self {
            cheap: 1.0,
            expensive: 1.0,
            defensive: 1.0,
            win_conditions: 1.0,
            damage_spells: 1.0,
            combo: 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingModifiers {
    pub combo_delay: f32,
    pub reaction_time: f32,
    pub spell_delay: f32,
    pub counter_delay: f32,
}

impl Default for TimingModifiers {
    fn default() -> Self {
        Self {
            combo_delay: 1.0,
            reaction_time: 1.0,
            spell_delay: 1.0,
            counter_delay: 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionModifiers {
    pub aggressive_bias: f32,
    pub defensive_bias: f32,
}

impl Default for PositionModifiers {
    fn default() -> Self {
        Self {
            aggressive_bias: 1.0,
            defensive_bias: 1.0,
        }
    }
}

/// Knobs in force during one phase. Mutated by transitions and feedback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub strategy: PhaseStrategy,
    pub priorities: Vec<PhasePriority>,
    pub aggression: f32,
    pub spend_rate: f32,
    pub combo_frequency: f32,
    pub risk_tolerance: f32,
    pub card_values: CardValueModifiers,
    pub timing: TimingModifiers,
    pub position: PositionModifiers,
}

impl PhaseConfig {
    pub fn for_phase(phase: MatchPhase) -> Self {
        use PhasePriority::*;
        match phase {
            MatchPhase::Early => Self {
                strategy: PhaseStrategy::Conservative,
                priorities: vec![ElixirAdvantage, DefensiveSetup, CycleControl],
                aggression: 0.3,
                spend_rate: 0.6,
                combo_frequency: 0.4,
                risk_tolerance: 0.2,
                card_values: CardValueModifiers {
                    cheap: 1.2,
                    expensive: 0.8,
                    defensive: 1.1,
                    ..CardValueModifiers::default()
                },
                timing: TimingModifiers {
                    combo_delay: 1.3,
                    reaction_time: 1.2,
                    ..TimingModifiers::default()
                },
                position: PositionModifiers {
                    aggressive_bias: 0.8,
                    defensive_bias: 1.2,
                },
            },
            MatchPhase::Mid => Self {
                strategy: PhaseStrategy::Balanced,
                priorities: vec![TowerDamage, PressureMaintain, ElixirAdvantage],
                aggression: 0.6,
                spend_rate: 0.8,
                combo_frequency: 0.7,
                risk_tolerance: 0.5,
                card_values: CardValueModifiers {
                    combo: 1.2,
                    win_conditions: 1.3,
                    ..CardValueModifiers::default()
                },
                timing: TimingModifiers::default(),
                position: PositionModifiers::default(),
            },
            MatchPhase::Late => Self {
                strategy: PhaseStrategy::Aggressive,
                priorities: vec![TowerDamage, SpellCycling, PressureMaintain],
                aggression: 0.8,
                spend_rate: 0.9,
                combo_frequency: 0.8,
                risk_tolerance: 0.7,
                card_values: CardValueModifiers {
                    damage_spells: 1.4,
                    win_conditions: 1.5,
                    defensive: 0.9,
                    ..CardValueModifiers::default()
                },
                timing: TimingModifiers {
                    combo_delay: 0.8,
                    reaction_time: 0.9,
                    ..TimingModifiers::default()
                },
                position: PositionModifiers {
                    aggressive_bias: 1.3,
                    defensive_bias: 0.8,
                },
            },
            MatchPhase::Overtime => Self {
                strategy: PhaseStrategy::AllIn,
                priorities: vec![TowerDamage, SpellCycling],
                aggression: 1.0,
                spend_rate: 1.0,
                combo_frequency: 0.9,
                risk_tolerance: 0.9,
                card_values: CardValueModifiers {
                    damage_spells: 1.6,
                    win_conditions: 1.7,
                    defensive: 0.6,
                    ..CardValueModifiers::default()
                },
                timing: TimingModifiers {
                    combo_delay: 0.6,
                    reaction_time: 0.7,
                    ..TimingModifiers::default()
                },
                position: PositionModifiers {
                    aggressive_bias: 1.5,
                    ..PositionModifiers::default()
                },
            },
        }
    }
}

/// Whether a card is being played to push or to hold.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PlayIntent {
    Attack,
    Defense,
    Neutral,
}

/// Kinds of delays a phase stretches or shrinks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TimingKind {
    Combo,
    DefensiveReaction,
    Spell,
    CounterAttack,
    Other,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: MatchPhase,
    pub to: MatchPhase,
    pub at: f32,
}

/// Owns the current phase and each phase's mutable configuration.
#[derive(Clone, Debug)]
pub struct PhaseController {
    settings: PhaseSettings,
    phase: MatchPhase,
    configs: BTreeMap<MatchPhase, PhaseConfig>,
    advantages: VecDeque<f32>,
    performance: BTreeMap<MatchPhase, VecDeque<f32>>,
    transitions: Vec<PhaseTransition>,
    phase_started: f32,
}

impl PhaseController {
    pub fn new(settings: PhaseSettings) -> Self {
        Self {
            settings,
            phase: MatchPhase::Early,
            configs: MatchPhase::ALL
                .iter()
                .map(|p| (*p, PhaseConfig::for_phase(*p)))
                .collect(),
            advantages: VecDeque::new(),
            performance: BTreeMap::new(),
            transitions: Vec::new(),
            phase_started: 0.0,
        }
    }

    /// Back to early phase with fresh configurations.
    pub fn reset(&mut self) {
        *self = Self::new(self.settings.clone());
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn config(&self) -> &PhaseConfig {
        self.config_for(self.phase)
    }

    pub fn config_for(&self, phase: MatchPhase) -> &PhaseConfig {
        // Every phase is seeded in `new`.
        &self.configs[&phase]
    }

    fn config_mut(&mut self, phase: MatchPhase) -> &mut PhaseConfig {
        self.configs
            .entry(phase)
            .or_insert_with(|| PhaseConfig::for_phase(phase))
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    /// Feeds one observation and returns the transition it caused, if any.
    pub fn update(
        &mut self,
        now: f32,
        goal_health: &GoalHealth,
        elixir_advantage: f32,
    ) -> Option<PhaseTransition> {
        self.advantages.push_back(elixir_advantage);
        while self.advantages.len() > self.settings.advantage_window.max(1) {
            self.advantages.pop_front();
        }

        let target = self.target_phase(now, goal_health);
        if target <= self.phase {
            return None;
        }
        let from = self.phase;
        let mut step = from;
        while step < target {
            let Some(next) = step.next() else { break };
            self.apply_transition_actions(step, next);
            step = next;
        }
        self.phase = target;
        self.phase_started = now;
        let transition = PhaseTransition {
            from,
            to: target,
            at: now,
        };
        self.transitions.push(transition);
        tracing::info!(from = %from, to = %target, time = now, "phase transition");
        Some(transition)
    }

    fn target_phase(&self, now: f32, goal_health: &GoalHealth) -> MatchPhase {
        let s = &self.settings;
        let mut phase = if now >= s.overtime_start {
            MatchPhase::Overtime
        } else if now >= s.late_start {
            MatchPhase::Late
        } else if now >= s.mid_start {
            MatchPhase::Mid
        } else {
            MatchPhase::Early
        };

        let lowest = goal_health.lowest_forward();
        if lowest < s.very_low_health {
            phase = MatchPhase::Overtime;
        } else if lowest < s.low_health {
            phase = phase.max(MatchPhase::Late);
        }

        if self.advantages.len() >= s.advantage_window && s.advantage_window > 0 {
            let average = self.advantages.iter().sum::<f32>() / self.advantages.len() as f32;
            if average >= s.promotion_advantage {
                phase = phase.max(MatchPhase::Mid);
            }
        }
        phase
    }

    fn apply_transition_actions(&mut self, from: MatchPhase, to: MatchPhase) {
        let config = self.config_mut(to);
        match (from, to) {
            (MatchPhase::Early, MatchPhase::Mid) => {
                config.aggression = (config.aggression + 0.2).min(1.0);
                config.combo_frequency = (config.combo_frequency + 0.3).min(1.0);
            }
            (MatchPhase::Mid, MatchPhase::Late) => {
                config.card_values.damage_spells = 1.4;
                config.card_values.win_conditions = 1.5;
            }
            (MatchPhase::Late, MatchPhase::Overtime) => {
                config.aggression = 1.0;
                config.risk_tolerance = 1.0;
                if !config.priorities.contains(&PhasePriority::SpellCycling) {
                    config.priorities.insert(0, PhasePriority::SpellCycling);
                }
            }
            _ => {}
        }
    }

    /// Card value multiplier for the current phase.
    pub fn card_value_modifier(
        &self,
        card: Card,
        intent: PlayIntent,
        catalog: &CardCatalog,
    ) -> f32 {
        let config = self.config();
        let values = &config.card_values;
        let cost = catalog.cost(card);
        let mut modifier = 1.0;
        if cost <= 3 {
            modifier *= values.cheap;
        } else if cost >= 6 {
            modifier *= values.expensive;
        }
        if catalog.has_role(card, CardRole::Defense) || catalog.has_role(card, CardRole::Building) {
            modifier *= values.defensive;
        } else if catalog.has_role(card, CardRole::WinCondition) {
            modifier *= values.win_conditions;
        } else if is_damage_spell(card, catalog) {
            modifier *= values.damage_spells;
        }
        modifier *= match intent {
            PlayIntent::Attack => config.position.aggressive_bias,
            PlayIntent::Defense => config.position.defensive_bias,
            PlayIntent::Neutral => 1.0,
        };
        modifier
    }

    pub fn timing_modifier(&self, kind: TimingKind) -> f32 {
        let timing = &self.config().timing;
        match kind {
            TimingKind::Combo => timing.combo_delay,
            TimingKind::DefensiveReaction => timing.reaction_time,
            TimingKind::Spell => timing.spell_delay,
            TimingKind::CounterAttack => timing.counter_delay,
            TimingKind::Other => 1.0,
        }
    }

    /// Phase gate: risk tolerance, the phase's priorities and its strategy.
    pub fn should_execute_action(&self, action: PhaseAction, risk: f32) -> bool {
        let config = self.config();
        if risk > config.risk_tolerance {
            return false;
        }
        if let Some(required) = action.required_priority() {
            if !config.priorities.contains(&required) {
                return false;
            }
        }
        match config.strategy {
            PhaseStrategy::Defensive => {
                !matches!(action, PhaseAction::TowerAttack | PhaseAction::AggressiveCombo)
            }
            PhaseStrategy::AllIn => !matches!(
                action,
                PhaseAction::DefensivePlay | PhaseAction::ElixirConservation
            ),
            _ => true,
        }
    }

    /// Outcome score in [0, 1]: success base plus a capped damage bonus.
    pub fn outcome_score(success: bool, damage_dealt: u32) -> f32 {
        let base = if success { 0.8 } else { 0.2 };
        (base + (damage_dealt as f32 / 1000.0).min(0.2)).min(1.0)
    }

    pub fn record_performance(&mut self, score: f32) {
        let window = self.settings.performance_window.max(1);
        let scores = self.performance.entry(self.phase).or_default();
        scores.push_back(score.clamp(0.0, 1.0));
        while scores.len() > window {
            scores.pop_front();
        }
    }

    pub fn performance_samples(&self, phase: MatchPhase) -> usize {
        self.performance.get(&phase).map(VecDeque::len).unwrap_or(0)
    }

    /// Nudges each phase's aggression and risk from its recent scores.
    pub fn optimize(&mut self) {
        let min_samples = self.settings.min_samples;
        let s = self.settings.clone();
        let averages: Vec<(MatchPhase, f32)> = self
            .performance
            .iter()
            .filter(|(_, scores)| scores.len() >= min_samples && !scores.is_empty())
            .map(|(phase, scores)| (*phase, scores.iter().sum::<f32>() / scores.len() as f32))
            .collect();
        for (phase, average) in averages {
            let config = self.config_mut(phase);
            if average > s.tune_up_above {
                config.aggression = (config.aggression + s.tune_up_step).min(1.0);
                config.risk_tolerance = (config.risk_tolerance + s.tune_up_step).min(1.0);
            } else if average < s.tune_down_below {
                config.aggression = (config.aggression - s.tune_down_step).max(s.tune_floor);
                config.risk_tolerance = (config.risk_tolerance - s.tune_down_step).max(s.tune_floor);
            }
            tracing::debug!(phase = %phase, average, aggression = config.aggression, "phase tuned");
        }
    }

    /// Seconds until the clock alone would advance the phase.
    pub fn time_remaining(&self, now: f32) -> Option<f32> {
        let end = match self.phase {
            MatchPhase::Early => self.settings.mid_start,
            MatchPhase::Mid => self.settings.late_start,
            MatchPhase::Late => self.settings.overtime_start,
            MatchPhase::Overtime => return None,
        };
        Some((end - now).max(0.0))
    }

    pub fn is_transition_imminent(&self, now: f32, threshold: f32) -> bool {
        self.time_remaining(now).is_some_and(|t| t <= threshold)
    }

    pub fn phase_started(&self) -> f32 {
        self.phase_started
    }
}

fn is_damage_spell(card: Card, catalog: &CardCatalog) -> bool {
    catalog.has_role(card, CardRole::Spell)
        && !matches!(card, Card::Freeze | Card::Rage | Card::Tornado)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_drives_phases_forward() {
        let mut c = PhaseController::new(PhaseSettings::default());
        let health = GoalHealth::default();
        assert_eq!(c.update(10.0, &health, 0.0), None);
        let t = c.update(61.0, &health, 0.0).unwrap();
        assert_eq!((t.from, t.to), (MatchPhase::Early, MatchPhase::Mid));
        assert!((c.config().aggression - 0.8).abs() < 1e-5);
        assert_eq!(c.update(30.0, &health, 0.0), None);
        assert_eq!(c.phase(), MatchPhase::Mid);
    }

    #[test]
    fn low_health_forces_late_and_very_low_overtime() {
        let mut c = PhaseController::new(PhaseSettings::default());
        let mut health = GoalHealth::default();
        health.enemy_left = 0.25;
        c.update(5.0, &health, 0.0);
        assert_eq!(c.phase(), MatchPhase::Late);
        health.own_right = 0.05;
        c.update(6.0, &health, 0.0);
        assert_eq!(c.phase(), MatchPhase::Overtime);
        assert_eq!(c.config().aggression, 1.0);
        assert_eq!(c.config().risk_tolerance, 1.0);
    }

    #[test]
    fn sustained_advantage_promotes_to_mid() {
        let mut c = PhaseController::new(PhaseSettings::default());
        let health = GoalHealth::default();
        for i in 0..4 {
            c.update(i as f32, &health, 4.0);
            assert_eq!(c.phase(), MatchPhase::Early);
        }
        c.update(5.0, &health, 4.0);
        assert_eq!(c.phase(), MatchPhase::Mid);
    }

    #[test]
    fn poor_performance_backs_off() {
        let mut c = PhaseController::new(PhaseSettings::default());
        for _ in 0..9 {
            c.record_performance(0.2);
        }
        c.optimize();
        assert!((c.config().aggression - 0.3).abs() < 1e-5);
        c.record_performance(0.2);
        c.optimize();
        assert!((c.config().aggression - 0.2).abs() < 1e-5);
        assert!((c.config().risk_tolerance - 0.1).abs() < 1e-5);
    }

    #[test]
    fn tuning_steps_follow_settings() {
        let settings = PhaseSettings {
            min_samples: 1,
            tune_down_step: 0.05,
            ..PhaseSettings::default()
        };
        let mut c = PhaseController::new(settings);
        let before = c.config().aggression;
        c.record_performance(0.1);
        c.optimize();
        assert!((c.config().aggression - (before - 0.05)).abs() < 1e-5);
    }

    #[test]
    fn risky_actions_wait_for_a_tolerant_phase() {
        let mut c = PhaseController::new(PhaseSettings::default());
        assert!(c.should_execute_action(PhaseAction::AggressiveCombo, 0.1));
        assert!(!c.should_execute_action(PhaseAction::AggressiveCombo, 0.5));
        c.update(61.0, &GoalHealth::default(), 0.0);
        assert!(c.should_execute_action(PhaseAction::AggressiveCombo, 0.5));
    }

    #[test]
    fn outcome_score_caps_damage_bonus() {
        assert!((PhaseController::outcome_score(true, 5000) - 1.0).abs() < 1e-6);
        assert!((PhaseController::outcome_score(false, 100) - 0.3).abs() < 1e-6);
    }
}
