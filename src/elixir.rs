use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardCatalog, ELIXIR_CAP};
use crate::config::ElixirConfig;

/// Coarse bucket of the current elixir bar.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ElixirState {
    Critical,
    Low,
    Medium,
    High,
    Full,
}

impl ElixirState {
    pub fn from_amount(elixir: f32) -> Self {
        if elixir <= 2.0 {
            ElixirState::Critical
        } else if elixir <= 5.0 {
            ElixirState::Low
        } else if elixir <= 8.0 {
            ElixirState::Medium
        } else if elixir < ELIXIR_CAP {
            ElixirState::High
        } else {
            ElixirState::Full
        }
    }
}

/// Why spending on a card would be worthwhile, highest first.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum SpendingPriority {
    CriticalDefense,
    HighValueAttack,
    EfficientDefense,
    ModerateAttack,
    CyclePlay,
    LuxuryPlay,
}

/// Value assessment for spending on one affordable card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElixirOpportunity {
    pub card: Card,
    pub cost: u8,
    pub priority: SpendingPriority,
    pub expected_value: f32,
    pub timing_score: f32,
    pub risk_level: f32,
    pub recommended: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElixirAnalysis {
    pub current: f32,
    pub state: ElixirState,
    pub opponent_estimate: f32,
    pub advantage: f32,
    pub should_conserve: bool,
    pub should_spend: bool,
    pub optimal_spending: f32,
    /// Sorted by expected value, best first.
    pub opportunities: Vec<ElixirOpportunity>,
}

impl ElixirAnalysis {
    pub fn opportunity(&self, card: Card) -> Option<&ElixirOpportunity> {
        self.opportunities.iter().find(|o| o.card == card)
    }
}

/// Guess at what the opponent can afford next.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentPlayKind {
    ForcedWait,
    Cheap,
    Medium,
    ExpensiveCombo,
    Unknown,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpponentPlayPrediction {
    pub kind: OpponentPlayKind,
    pub confidence: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElixirForecast {
    pub seconds_ahead: f32,
    pub own: f32,
    pub opponent: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub card: Card,
    pub cost: u8,
    pub timestamp: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyStats {
    pub total_spent: u32,
    pub total_plays: usize,
    pub average_cost: f32,
    pub leak_count: u32,
    pub efficiency_score: f32,
    pub success_rate: Option<f32>,
}

/// Tracks both elixir bars and judges when spending pays off.
#[derive(Clone, Debug)]
pub struct ElixirOptimizer {
    config: ElixirConfig,
    opponent_estimate: f32,
    last_update: Option<f32>,
    double_elixir: bool,
    was_full: bool,
    leak_count: u32,
    spend_history: VecDeque<SpendRecord>,
    opponent_spend: VecDeque<(f32, u8)>,
    successes: u32,
    outcomes: u32,
}

impl ElixirOptimizer {
    pub fn new(config: ElixirConfig) -> Self {
        Self {
            opponent_estimate: config.opponent_initial,
            config,
            last_update: None,
            double_elixir: false,
            was_full: false,
            leak_count: 0,
            spend_history: VecDeque::new(),
            opponent_spend: VecDeque::new(),
            successes: 0,
            outcomes: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    pub fn regen_rate(&self, now: f32) -> f32 {
        if now >= self.config.double_elixir_time {
            self.config.regen_rate * 2.0
        } else {
            self.config.regen_rate
        }
    }

    pub fn is_double_elixir(&self) -> bool {
        self.double_elixir
    }

    pub fn opponent_estimate(&self) -> f32 {
        self.opponent_estimate
    }

    /// Advances the opponent estimate to `now` and tracks leak episodes.
    ///
    /// The opponent regenerates at the rate in force at `now`. Time going
    /// backwards only re-anchors the clock.
    pub fn tick(&mut self, now: f32, own_resource: f32) {
        if let Some(last) = self.last_update {
            let elapsed = now - last;
            if elapsed > 0.0 {
                self.opponent_estimate =
                    (self.opponent_estimate + elapsed * self.regen_rate(now)).clamp(0.0, ELIXIR_CAP);
            }
        }
        self.last_update = Some(now);
        if !self.double_elixir && now >= self.config.double_elixir_time {
            self.double_elixir = true;
            tracing::info!(time = now, "double elixir active");
        }

        let full = own_resource >= ELIXIR_CAP;
        if full && !self.was_full {
            self.leak_count += 1;
        }
        self.was_full = full;
    }

    /// Deducts a newly observed opposing play from the estimate.
    pub fn observe_opponent_spend(&mut self, cost: u8, now: f32) {
        self.opponent_estimate = (self.opponent_estimate - f32::from(cost)).clamp(0.0, ELIXIR_CAP);
        self.opponent_spend.push_back((now, cost));
        while self.opponent_spend.len() > self.config.history_len {
            self.opponent_spend.pop_front();
        }
    }

    /// Elixir the opponent committed in the trailing `window` seconds.
    pub fn opponent_recent_spend(&self, now: f32, window: f32) -> f32 {
        self.opponent_spend
            .iter()
            .filter(|(t, _)| now - *t <= window)
            .map(|(_, cost)| f32::from(*cost))
            .sum()
    }

    pub fn analyze(
        &self,
        resource: f32,
        playable: &[Card],
        catalog: &CardCatalog,
    ) -> ElixirAnalysis {
        let advantage = resource - self.opponent_estimate;
        let mut opportunities: Vec<ElixirOpportunity> = playable
            .iter()
            .copied()
            .filter(|card| catalog.affordable(*card, resource))
            .map(|card| self.assess(card, catalog.cost(card), resource, advantage))
            .collect();
        opportunities.sort_by(|a, b| {
            b.expected_value
                .partial_cmp(&a.expected_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ElixirAnalysis {
            current: resource,
            state: ElixirState::from_amount(resource),
            opponent_estimate: self.opponent_estimate,
            advantage,
            should_conserve: self.should_conserve(resource, advantage),
            should_spend: self.should_spend(resource, advantage),
            optimal_spending: self.optimal_spending(resource, advantage),
            opportunities,
        }
    }

    pub fn should_conserve(&self, resource: f32, advantage: f32) -> bool {
        resource <= self.config.conserve_at_or_below || advantage <= -self.config.advantage_threshold
    }

    pub fn should_spend(&self, resource: f32, advantage: f32) -> bool {
        resource >= ELIXIR_CAP
            || advantage >= self.config.advantage_threshold
            || resource >= self.config.spend_at_or_above
    }

    pub fn optimal_spending(&self, resource: f32, advantage: f32) -> f32 {
        if resource >= ELIXIR_CAP {
            ELIXIR_CAP
        } else if advantage >= self.config.advantage_threshold {
            (resource - 2.0).min(8.0).max(0.0)
        } else if resource >= self.config.spend_at_or_above {
            (resource - 1.0).min(7.0)
        } else {
            (resource - 3.0).max(0.0)
        }
    }

    pub fn is_critical_defense(&self, card: Card) -> bool {
        self.config.critical_defense.contains(&card)
    }

    pub fn is_high_value_attack(&self, card: Card) -> bool {
        self.config.high_value_attack.contains(&card)
    }

    fn assess(&self, card: Card, cost: u8, resource: f32, advantage: f32) -> ElixirOpportunity {
        let priority = self.spending_priority(card, cost, advantage);
        let timing_score = self.timing_score(cost, resource);
        let expected_value = self.expected_value(card, cost, advantage) * timing_score;
        let recommended = priority == SpendingPriority::CriticalDefense
            || expected_value >= self.config.recommend_value
            || (priority == SpendingPriority::CyclePlay
                && expected_value >= self.config.cycle_recommend_value);
        ElixirOpportunity {
            card,
            cost,
            priority,
            expected_value,
            timing_score,
            risk_level: self.risk_level(cost, resource),
            recommended,
        }
    }

    pub fn spending_priority(&self, card: Card, cost: u8, advantage: f32) -> SpendingPriority {
        let c = &self.config;
        if self.is_critical_defense(card) {
            SpendingPriority::CriticalDefense
        } else if advantage >= c.high_value_advantage && self.is_high_value_attack(card) {
            SpendingPriority::HighValueAttack
        } else if c.efficient_defense.contains(&card) {
            SpendingPriority::EfficientDefense
        } else if c.moderate_attack.contains(&card) {
            SpendingPriority::ModerateAttack
        } else if cost <= c.cheap_cost {
            SpendingPriority::CyclePlay
        } else {
            SpendingPriority::LuxuryPlay
        }
    }

    /// Efficiency × advantage × role, before the timing multiplier.
    pub fn expected_value(&self, card: Card, cost: u8, advantage: f32) -> f32 {
        let c = &self.config;
        let mut value = 1.0;
        if cost <= c.cheap_cost {
            value *= c.cheap_value;
        } else if cost >= c.expensive_cost {
            value *= c.expensive_value;
        }
        if advantage >= c.advantage_threshold {
            value *= c.ahead_value;
        } else if advantage <= -c.advantage_threshold {
            value *= c.behind_value;
        }
        if self.is_critical_defense(card) {
            value *= c.critical_defense_value;
        } else if self.is_high_value_attack(card) {
            value *= c.high_value_attack_value;
        }
        value
    }

    pub fn timing_score(&self, cost: u8, resource: f32) -> f32 {
        let c = &self.config;
        if cost <= c.cheap_cost && resource <= c.cheap_timing_at_or_below {
            c.cheap_timing
        } else if cost >= c.heavy_cost && resource >= c.heavy_timing_at_or_above {
            c.heavy_timing
        } else {
            1.0
        }
    }

    pub fn risk_level(&self, cost: u8, resource: f32) -> f32 {
        let c = &self.config;
        let mut risk = c.base_risk;
        if cost >= c.expensive_cost {
            risk += c.expensive_risk;
        } else if cost <= c.cheap_cost {
            risk -= c.cheap_risk;
        }
        if resource <= c.low_bank {
            risk += c.low_bank_risk;
        }
        risk.clamp(0.0, 1.0)
    }

    /// Cheapest affordable card when the bar is about to overflow.
    pub fn leak_prevention(
        &self,
        resource: f32,
        playable: &[Card],
        catalog: &CardCatalog,
    ) -> Option<Card> {
        if resource < ELIXIR_CAP - self.config.leak_margin {
            return None;
        }
        playable
            .iter()
            .copied()
            .filter(|card| catalog.affordable(*card, resource))
            .min_by_key(|card| catalog.cost(*card))
    }

    pub fn record_spending(&mut self, card: Card, cost: u8, timestamp: f32) {
        self.spend_history.push_back(SpendRecord {
            card,
            cost,
            timestamp,
        });
        while self.spend_history.len() > self.config.history_len {
            self.spend_history.pop_front();
        }
    }

    pub fn record_outcome(&mut self, success: bool) {
        self.outcomes += 1;
        if success {
            self.successes += 1;
        }
    }

    pub fn spend_history(&self) -> impl Iterator<Item = &SpendRecord> {
        self.spend_history.iter()
    }

    pub fn efficiency_stats(&self) -> Option<EfficiencyStats> {
        if self.spend_history.is_empty() {
            return None;
        }
        let total_spent: u32 = self.spend_history.iter().map(|r| u32::from(r.cost)).sum();
        let total_plays = self.spend_history.len();
        let average_cost = total_spent as f32 / total_plays as f32;
        let cost_score = (1.0 - (average_cost - 4.0) / 4.0).max(0.0);
        let leak_penalty = (self.leak_count as f32 / 3.0).min(1.0);
        Some(EfficiencyStats {
            total_spent,
            total_plays,
            average_cost,
            leak_count: self.leak_count,
            efficiency_score: (cost_score - leak_penalty).max(0.0),
            success_rate: (self.outcomes > 0)
                .then(|| self.successes as f32 / self.outcomes as f32),
        })
    }

    pub fn leak_count(&self) -> u32 {
        self.leak_count
    }

    pub fn predict_opponent_next_play(&self) -> OpponentPlayPrediction {
        let e = self.opponent_estimate;
        let (kind, confidence) = if e <= 2.0 {
            (OpponentPlayKind::ForcedWait, 0.8)
        } else if e <= 4.0 {
            (OpponentPlayKind::Cheap, 0.7)
        } else if e <= 6.0 {
            (OpponentPlayKind::Medium, 0.6)
        } else if e >= 8.0 {
            (OpponentPlayKind::ExpensiveCombo, 0.8)
        } else {
            (OpponentPlayKind::Unknown, 0.3)
        };
        OpponentPlayPrediction { kind, confidence }
    }

    /// Whether the opponent is low enough that a push is hard to answer.
    pub fn counter_attack_moment(&self) -> (bool, f32) {
        let e = self.opponent_estimate;
        let confidence = if e <= 3.0 {
            0.9
        } else if e <= 5.0 {
            0.7
        } else {
            0.3
        };
        (e <= 5.0, confidence)
    }

    /// Projects both bars forward assuming no further spending.
    pub fn forecast(&self, now: f32, own: f32, seconds_ahead: f32) -> ElixirForecast {
        let rate = self.regen_rate(now + seconds_ahead);
        let gain = rate * seconds_ahead.max(0.0);
        ElixirForecast {
            seconds_ahead,
            own: (own + gain).min(ELIXIR_CAP),
            opponent: (self.opponent_estimate + gain).min(ELIXIR_CAP),
        }
    }
}
