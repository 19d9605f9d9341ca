use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::analysis::{MatchMode, StateAnalysis, ThreatLevel};
use crate::card::{Card, ELIXIR_CAP};
use crate::config::ComboConfig;
use crate::state::Tile;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboKind {
    TankSupport,
    QuickCycle,
    SpellBait,
    CounterPush,
    BuildingSiege,
    AirSwarm,
}

/// Named placement rule for a combo card.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionRule {
    BehindKingTower,
    Bridge,
    BehindGiant,
    BehindGiantWhenCrossing,
    InFrontOfHog,
    OffensivePosition,
    DefensivePosition,
    SameLaneAsLava,
    Default,
}

impl PositionRule {
    pub fn tile(self) -> Tile {
        match self {
            PositionRule::BehindKingTower => Tile::new(9, 4),
            PositionRule::Bridge => Tile::new(9, 7),
            PositionRule::BehindGiant => Tile::new(9, 6),
            PositionRule::BehindGiantWhenCrossing => Tile::new(9, 8),
            PositionRule::InFrontOfHog => Tile::new(9, 8),
            PositionRule::OffensivePosition => Tile::new(9, 10),
            PositionRule::DefensivePosition => Tile::new(9, 5),
            PositionRule::SameLaneAsLava => Tile::new(9, 6),
            PositionRule::Default => Tile::new(9, 7),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessCondition {
    EnemyLowElixir,
    EnemyNoTanks,
    CrossesBridge(Card),
    /// Only observable while the combo runs.
    SupportBehind(Card),
}

impl SuccessCondition {
    fn score(self, analysis: &StateAnalysis) -> f32 {
        match self {
            SuccessCondition::EnemyLowElixir => {
                if analysis.opponent_deficit >= 3 { 1.0 } else { 0.0 }
            }
            SuccessCondition::EnemyNoTanks => {
                let tanks = [Card::Giant, Card::Golem, Card::Pekka];
                let has_tank = analysis
                    .threats
                    .iter()
                    .any(|t| t.card.is_some_and(|c| tanks.contains(&c)));
                if has_tank { 0.0 } else { 1.0 }
            }
            SuccessCondition::CrossesBridge(_) => 0.5,
            SuccessCondition::SupportBehind(_) => 0.0,
        }
    }
}

/// Static description of a multi-card sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComboDefinition {
    pub name: String,
    pub kind: ComboKind,
    pub primary: Card,
    pub supports: Vec<Card>,
    pub min_elixir: f32,
    pub max_elixir: f32,
    /// Seconds between consecutive cards.
    pub delay: f32,
    pub positions: Vec<(Card, PositionRule)>,
    pub conditions: Vec<SuccessCondition>,
    pub priority: u8,
}

impl ComboDefinition {
    pub fn position_rule(&self, card: Card) -> PositionRule {
        self.positions
            .iter()
            .find(|(c, _)| *c == card)
            .map(|(_, rule)| *rule)
            .unwrap_or(PositionRule::Default)
    }

    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        std::iter::once(self.primary).chain(self.supports.iter().copied())
    }
}

/// Immutable set of known combos.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComboCatalog {
    combos: Vec<ComboDefinition>,
}

impl ComboCatalog {
    pub fn new(combos: Vec<ComboDefinition>) -> Self {
        Self { combos }
    }

    pub fn combos(&self) -> &[ComboDefinition] {
        &self.combos
    }

    /// Combos whose primary and at least one support are in the deck, by priority.
    pub fn available_for(&self, deck: &[Card]) -> ComboCatalog {
        let mut combos: Vec<ComboDefinition> = self
            .combos
            .iter()
            .filter(|c| deck.contains(&c.primary) && c.supports.iter().any(|s| deck.contains(s)))
            .cloned()
            .collect();
        combos.sort_by(|a, b| b.priority.cmp(&a.priority));
        ComboCatalog { combos }
    }
}

impl Default for ComboCatalog {
    fn default() -> Self {
        use Card::*;
        use PositionRule::*;
        let combo = |name: &str,
                     kind,
                     primary,
                     supports: Vec<Card>,
                     window: (f32, f32),
                     delay,
                     positions: Vec<(Card, PositionRule)>,
                     conditions: Vec<SuccessCondition>,
                     priority| ComboDefinition {
            name: name.to_string(),
            kind,
            primary,
            supports,
            min_elixir: window.0,
            max_elixir: window.1,
            delay,
            positions,
            conditions,
            priority,
        };
        Self::new(vec![
            combo(
                "Giant Musketeer",
                ComboKind::TankSupport,
                Giant,
                vec![Musketeer],
                (9.0, 10.0),
                2.0,
                vec![(Giant, BehindKingTower), (Musketeer, BehindGiantWhenCrossing)],
                vec![
                    SuccessCondition::CrossesBridge(Giant),
                    SuccessCondition::SupportBehind(Musketeer),
                ],
                8,
            ),
            combo(
                "Giant Bomber",
                ComboKind::TankSupport,
                Giant,
                vec![Bomber],
                (8.0, 10.0),
                1.5,
                vec![(Giant, BehindKingTower), (Bomber, BehindGiant)],
                vec![SuccessCondition::CrossesBridge(Giant)],
                7,
            ),
            combo(
                "Hog Ice Spirit",
                ComboKind::QuickCycle,
                HogRider,
                vec![IceSpirit],
                (6.0, 8.0),
                0.5,
                vec![(HogRider, Bridge), (IceSpirit, InFrontOfHog)],
                vec![SuccessCondition::EnemyLowElixir],
                9,
            ),
            combo(
                "Golem Night Witch",
                ComboKind::TankSupport,
                Golem,
                vec![NightWitch, BabyDragon],
                (12.0, 15.0),
                3.0,
                vec![
                    (Golem, BehindKingTower),
                    (NightWitch, BehindGiant),
                    (BabyDragon, BehindGiant),
                ],
                vec![SuccessCondition::CrossesBridge(Golem)],
                6,
            ),
            combo(
                "X-Bow Tesla",
                ComboKind::BuildingSiege,
                XBow,
                vec![Tesla],
                (9.0, 10.0),
                1.0,
                vec![(XBow, OffensivePosition), (Tesla, DefensivePosition)],
                vec![SuccessCondition::EnemyNoTanks],
                7,
            ),
            combo(
                "LavaLoon",
                ComboKind::AirSwarm,
                LavaHound,
                vec![Balloon],
                (12.0, 15.0),
                4.0,
                vec![(LavaHound, BehindKingTower), (Balloon, SameLaneAsLava)],
                vec![SuccessCondition::CrossesBridge(LavaHound)],
                8,
            ),
        ])
    }
}

/// A combo in progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveCombo {
    pub id: u64,
    pub definition: ComboDefinition,
    pub cards_played: Vec<Card>,
    pub started_at: f32,
    pub expected_next: Option<Card>,
    /// Earliest time the expected card may be played.
    pub deadline: f32,
    pub complete: bool,
    pub success_probability: f32,
}

impl ActiveCombo {
    /// Cards this combo still needs, including the expected one.
    pub fn remaining_cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.definition
            .cards()
            .filter(|c| !self.cards_played.contains(c))
    }
}

/// One due card of an active combo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComboStep {
    pub combo_id: u64,
    pub combo_name: String,
    pub card: Card,
    pub rule: PositionRule,
    pub tile: Tile,
    pub is_last: bool,
}

/// Picks combos, tracks the ones in flight and emits their steps on time.
#[derive(Clone, Debug)]
pub struct ComboCoordinator {
    config: ComboConfig,
    available: ComboCatalog,
    active: Vec<ActiveCombo>,
    history: VecDeque<String>,
    next_id: u64,
}

impl ComboCoordinator {
    pub fn new(config: ComboConfig, catalog: &ComboCatalog, deck: &[Card]) -> Self {
        Self {
            config,
            available: catalog.available_for(deck),
            active: Vec::new(),
            history: VecDeque::new(),
            next_id: 0,
        }
    }

    pub fn available(&self) -> &[ComboDefinition] {
        self.available.combos()
    }

    pub fn active(&self) -> &[ActiveCombo] {
        &self.active
    }

    pub fn has_active_combo(&self) -> bool {
        self.active.iter().any(|c| !c.complete)
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn reset(&mut self) {
        self.active.clear();
        self.history.clear();
    }

    /// Viability of `combo` in [0, 1].
    pub fn score(&self, combo: &ComboDefinition, analysis: &StateAnalysis, hand: &[Card]) -> f32 {
        if !hand.contains(&combo.primary) || !combo.supports.iter().any(|s| hand.contains(s)) {
            return 0.0;
        }
        let resource = analysis.own_resource;
        // A window that starts past the cap is entered from a full bar.
        if resource < combo.min_elixir.min(ELIXIR_CAP) {
            return 0.0;
        }
        let mut score = 0.3 + 0.2;
        if resource >= combo.max_elixir {
            score += 0.1;
        }

        score += match combo.kind {
            ComboKind::CounterPush if analysis.opponent_deficit >= 4 => 0.3,
            ComboKind::TankSupport
                if matches!(analysis.mode, MatchMode::Neutral | MatchMode::Attack) =>
            {
                0.2
            }
            ComboKind::QuickCycle if analysis.opponent_deficit >= 2 => 0.4,
            _ => 0.0,
        };

        let ratio = if combo.conditions.is_empty() {
            1.0
        } else {
            let met: f32 = combo.conditions.iter().map(|c| c.score(analysis)).sum();
            met / combo.conditions.len() as f32
        };
        score += 0.2 * ratio;

        let recent = self.config.recent_history;
        if self
            .history
            .iter()
            .rev()
            .take(recent)
            .any(|name| *name == combo.name)
        {
            score *= self.config.repeat_penalty;
        }
        score.min(1.0)
    }

    /// Best startable combo, if any clears the threshold.
    pub fn evaluate(&self, analysis: &StateAnalysis, hand: &[Card]) -> Option<(ComboDefinition, f32)> {
        if analysis.highest_threat_level() >= ThreatLevel::High {
            return None;
        }
        let committed = self.committed_cards();
        let mut best: Option<(&ComboDefinition, f32)> = None;
        for combo in self.available.combos() {
            if combo.cards().any(|c| committed.contains(&c)) {
                continue;
            }
            let score = self.score(combo, analysis, hand);
            if score < self.config.start_threshold {
                continue;
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((combo, score));
            }
        }
        best.map(|(combo, score)| (combo.clone(), score))
    }

    pub fn start(&mut self, definition: ComboDefinition, now: f32) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        tracing::info!(combo = %definition.name, id, time = now, "combo started");
        self.active.push(ActiveCombo {
            id,
            expected_next: Some(definition.primary),
            definition,
            cards_played: Vec::new(),
            started_at: now,
            deadline: now,
            complete: false,
            success_probability: 0.8,
        });
        id
    }

    /// The first due step without advancing any state.
    pub fn peek_next(&self, now: f32) -> Option<ComboStep> {
        self.active
            .iter()
            .filter(|c| !c.complete && now >= c.deadline)
            .find_map(|combo| {
                let card = combo.expected_next?;
                let rule = combo.definition.position_rule(card);
                let remaining = combo.remaining_cards().count();
                Some(ComboStep {
                    combo_id: combo.id,
                    combo_name: combo.definition.name.clone(),
                    card,
                    rule,
                    tile: rule.tile(),
                    is_last: remaining <= 1,
                })
            })
    }

    /// Returns the due step and advances its combo as if the card were played.
    pub fn get_next_combo_action(&mut self, now: f32) -> Option<ComboStep> {
        let step = self.peek_next(now)?;
        self.mark_played(step.combo_id, step.card, now);
        Some(step)
    }

    /// Advances the combo `combo_id` after `card` was played at `now`.
    pub fn mark_played(&mut self, combo_id: u64, card: Card, now: f32) {
        let Some(combo) = self.active.iter_mut().find(|c| c.id == combo_id && !c.complete) else {
            return;
        };
        if !combo.cards_played.contains(&card) {
            combo.cards_played.push(card);
        }
        let next = combo
            .definition
            .supports
            .iter()
            .copied()
            .find(|c| !combo.cards_played.contains(c));
        match next {
            Some(next) => {
                combo.expected_next = Some(next);
                combo.deadline = now + combo.definition.delay;
            }
            None => {
                combo.expected_next = None;
                combo.complete = true;
                tracing::info!(combo = %combo.definition.name, id = combo_id, "combo complete");
                self.history.push_back(combo.definition.name.clone());
                while self.history.len() > self.config.recent_history.max(1) * 4 {
                    self.history.pop_front();
                }
            }
        }
    }

    pub fn cleanup_completed(&mut self) {
        self.active.retain(|c| !c.complete);
    }

    /// Drops combos whose due step has waited longer than the stale timeout.
    pub fn abandon_stale(&mut self, now: f32) -> Vec<String> {
        let stale_after = self.config.stale_after;
        let mut dropped = Vec::new();
        self.active.retain(|c| {
            let stale = !c.complete && now - c.deadline > stale_after;
            if stale {
                tracing::info!(combo = %c.definition.name, id = c.id, "combo abandoned");
                dropped.push(c.definition.name.clone());
            }
            !stale
        });
        dropped
    }

    /// Cards reserved by combos in flight.
    pub fn committed_cards(&self) -> BTreeSet<Card> {
        self.active
            .iter()
            .filter(|c| !c.complete)
            .flat_map(|c| c.remaining_cards())
            .collect()
    }

    pub fn priority_boost(&self, card: Card) -> f32 {
        for combo in self.active.iter().filter(|c| !c.complete) {
            if combo.expected_next == Some(card) {
                return 2.0;
            }
            if combo.definition.supports.contains(&card) {
                return 1.5;
            }
        }
        1.0
    }
}
