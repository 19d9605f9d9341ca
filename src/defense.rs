use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::analysis::{ThreatInfo, ThreatLevel};
use crate::card::{Card, CardCatalog, CardRole};
use crate::config::{ArenaConfig, DefenseConfig};
use crate::state::Tile;

/// Broad shape of an opposing threat.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatClass {
    HeavyTank,
    FastWinCondition,
    AirWinCondition,
    GroundSwarm,
    AirSwarm,
    RangedSupport,
    SplashSupport,
    AirTank,
    AirSupport,
    Unknown,
}

impl ThreatClass {
    /// Class and base priority (1..=10) of an opposing card.
    pub fn classify(card: Option<Card>) -> (ThreatClass, f32) {
        use ThreatClass::*;
        let Some(card) = card else {
            return (Unknown, 5.0);
        };
        match card {
            Card::Giant | Card::Pekka | Card::ElectroGiant => (HeavyTank, 8.0),
            Card::Golem => (HeavyTank, 9.0),
            Card::MegaKnight => (HeavyTank, 7.0),
            Card::HogRider => (FastWinCondition, 9.0),
            Card::RamRider => (FastWinCondition, 8.0),
            Card::Balloon => (AirWinCondition, 9.0),
            Card::SkeletonArmy | Card::Barbarians => (GroundSwarm, 6.0),
            Card::GoblinGang => (GroundSwarm, 5.0),
            Card::MinionHorde => (AirSwarm, 7.0),
            Card::Musketeer => (RangedSupport, 6.0),
            Card::ElectroWizard => (RangedSupport, 7.0),
            Card::Wizard => (SplashSupport, 7.0),
            Card::LavaHound => (AirTank, 8.0),
            Card::BabyDragon => (AirSupport, 6.0),
            _ => (Unknown, 5.0),
        }
    }

    pub fn defense_category(self) -> DefenseCategory {
        match self {
            ThreatClass::HeavyTank => DefenseCategory::TankKiller,
            ThreatClass::FastWinCondition => DefenseCategory::BuildingDefense,
            ThreatClass::AirWinCondition
            | ThreatClass::AirSwarm
            | ThreatClass::AirTank
            | ThreatClass::AirSupport => DefenseCategory::AirDefense,
            ThreatClass::GroundSwarm => DefenseCategory::AreaDamage,
            ThreatClass::RangedSupport | ThreatClass::SplashSupport | ThreatClass::Unknown => {
                DefenseCategory::SingleTarget
            }
        }
    }
}

/// What kind of answer a defending card provides.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseCategory {
    SingleTarget,
    AreaDamage,
    AirDefense,
    TankKiller,
    BuildingDefense,
    SpellDefense,
}

impl DefenseCategory {
    pub fn of(card: Card) -> &'static [DefenseCategory] {
        use DefenseCategory::*;
        match card {
            Card::InfernoTower => &[TankKiller, BuildingDefense],
            Card::InfernoDragon => &[TankKiller, AirDefense],
            Card::MiniPekka => &[TankKiller, SingleTarget],
            Card::Bomber | Card::Valkyrie => &[AreaDamage],
            Card::Wizard | Card::BabyDragon => &[AreaDamage, AirDefense],
            Card::Musketeer | Card::Archers => &[AirDefense, SingleTarget],
            Card::Tesla => &[AirDefense, BuildingDefense],
            Card::Cannon | Card::Tombstone => &[BuildingDefense],
            Card::BombTower => &[BuildingDefense, AreaDamage],
            Card::Arrows => &[SpellDefense, AirDefense],
            Card::Fireball | Card::TheLog => &[SpellDefense, AreaDamage],
            Card::Zap => &[SpellDefense],
            _ => &[SingleTarget],
        }
    }
}

/// Seeded per-threat counters with their prior effectiveness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CounterTable {
    counters: HashMap<Card, Vec<(Card, f32)>>,
}

impl CounterTable {
    pub fn new(counters: HashMap<Card, Vec<(Card, f32)>>) -> Self {
        Self { counters }
    }

    pub fn counters_for(&self, threat: Card) -> &[(Card, f32)] {
        self.counters.get(&threat).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn prior(&self, threat: Card, counter: Card) -> Option<f32> {
        self.counters_for(threat)
            .iter()
            .find(|(c, _)| *c == counter)
            .map(|(_, e)| *e)
    }
}

impl Default for CounterTable {
    fn default() -> Self {
        use Card::*;
        let entries: [(Card, &[(Card, f32)]); 11] = [
            (
                Giant,
                &[(InfernoTower, 0.9), (MiniPekka, 0.8), (Pekka, 0.85), (Cannon, 0.6), (Tesla, 0.7)],
            ),
            (
                Golem,
                &[(InfernoTower, 0.95), (Pekka, 0.9), (MiniPekka, 0.7), (InfernoDragon, 0.8)],
            ),
            (
                Pekka,
                &[(SkeletonArmy, 0.8), (MinionHorde, 0.85), (InfernoTower, 0.9), (InfernoDragon, 0.8)],
            ),
            (
                HogRider,
                &[(Cannon, 0.9), (Tesla, 0.85), (Tombstone, 0.8), (MiniPekka, 0.7), (Valkyrie, 0.6)],
            ),
            (
                Balloon,
                &[(Musketeer, 0.9), (Archers, 0.8), (Tesla, 0.85), (InfernoTower, 0.7), (Minions, 0.75)],
            ),
            (
                LavaHound,
                &[(Musketeer, 0.8), (Archers, 0.7), (Tesla, 0.75), (InfernoDragon, 0.6)],
            ),
            (
                MinionHorde,
                &[(Arrows, 0.95), (Zap, 0.8), (Fireball, 0.9), (Wizard, 0.85)],
            ),
            (
                SkeletonArmy,
                &[(Zap, 0.95), (TheLog, 0.9), (Arrows, 0.85), (Valkyrie, 0.8)],
            ),
            (
                GoblinGang,
                &[(Zap, 0.9), (TheLog, 0.95), (Arrows, 0.8), (Valkyrie, 0.75)],
            ),
            (XBow, &[(Rocket, 0.9), (Lightning, 0.85), (Giant, 0.8), (Golem, 0.75)]),
            (Mortar, &[(Rocket, 0.85), (Miner, 0.8), (HogRider, 0.75)]),
        ];
        Self::new(
            entries
                .into_iter()
                .map(|(threat, counters)| (threat, counters.to_vec()))
                .collect(),
        )
    }
}

/// Planned answer to the primary threat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefenseResponse {
    pub threat: Option<Card>,
    pub threat_class: ThreatClass,
    /// Base priority scaled by proximity, capped at 10.
    pub urgency: f32,
    pub category: DefenseCategory,
    pub primary: Card,
    pub secondary: Option<Card>,
    pub positions: Vec<(Card, Tile)>,
    /// Delay in seconds after the response starts, per card.
    pub timing: Vec<(Card, f32)>,
    pub expected_effectiveness: f32,
    pub total_cost: u16,
    pub requires_immediate_response: bool,
}

impl DefenseResponse {
    pub fn position_of(&self, card: Card) -> Option<Tile> {
        self.positions.iter().find(|(c, _)| *c == card).map(|(_, t)| *t)
    }
}

const SWARM_INDICATORS: [Card; 8] = [
    Card::SkeletonArmy,
    Card::Skeletons,
    Card::GoblinGang,
    Card::Goblins,
    Card::SpearGoblins,
    Card::MinionHorde,
    Card::Minions,
    Card::Bats,
];

/// Chooses defending cards and learns which counters work.
#[derive(Clone, Debug)]
pub struct DefensePlanner {
    config: DefenseConfig,
    arena: ArenaConfig,
    counters: CounterTable,
    learned: HashMap<(Card, Card), f32>,
}

impl DefensePlanner {
    pub fn new(config: DefenseConfig, arena: ArenaConfig, counters: CounterTable) -> Self {
        Self {
            config,
            arena,
            counters,
            learned: HashMap::new(),
        }
    }

    /// Current belief in `counter` against `threat`: learned value, else the
    /// seeded prior.
    pub fn effectiveness(&self, threat: Card, counter: Card) -> Option<f32> {
        self.learned
            .get(&(threat, counter))
            .copied()
            .or_else(|| self.counters.prior(threat, counter))
    }

    /// Moves the belief toward the observed outcome. Unknown pairs start at 0.5.
    pub fn record_outcome(&mut self, threat: Card, counter: Card, success: bool) -> f32 {
        let current = self.effectiveness(threat, counter).unwrap_or(0.5);
        let outcome = if success { 1.0 } else { 0.0 };
        let rate = self.config.learning_rate;
        let updated = (1.0 - rate) * current + rate * outcome;
        self.learned.insert((threat, counter), updated);
        tracing::debug!(%threat, %counter, success, effectiveness = updated, "defense outcome");
        updated
    }

    pub fn urgency(&self, base_priority: f32, distance: f32) -> f32 {
        let c = &self.config;
        let multiplier = if distance <= c.close_distance {
            c.close_urgency
        } else if distance <= c.near_distance {
            c.near_urgency
        } else if distance >= c.distant_distance {
            c.distant_urgency
        } else {
            1.0
        };
        (base_priority * multiplier).min(c.max_urgency)
    }

    pub fn should_use_spell_defense(&self, threats: &[ThreatInfo]) -> bool {
        let small = threats
            .iter()
            .filter(|t| t.level <= ThreatLevel::Medium)
            .count();
        small >= self.config.spell_threat_count
            || threats
                .iter()
                .any(|t| t.card.is_some_and(|c| SWARM_INDICATORS.contains(&c)))
    }

    /// Plans a response to the first threat using the given hand cards.
    ///
    /// `hand` should already exclude cards reserved elsewhere; every chosen
    /// card is affordable and the pair together fits in `resource`.
    pub fn plan(
        &self,
        threats: &[ThreatInfo],
        hand: &[Card],
        resource: f32,
        catalog: &CardCatalog,
    ) -> Option<DefenseResponse> {
        let threat = threats.first()?;
        let (threat_class, base_priority) = ThreatClass::classify(threat.card);
        let urgency = self.urgency(base_priority, threat.distance_to_goal);
        let category = threat_class.defense_category();
        let spell_ok = self.should_use_spell_defense(threats);

        let affordable: Vec<Card> = hand
            .iter()
            .copied()
            .filter(|c| catalog.affordable(*c, resource))
            .collect();
        let matches = |card: &Card| {
            let kinds = DefenseCategory::of(*card);
            kinds.contains(&category) || (spell_ok && kinds.contains(&DefenseCategory::SpellDefense))
        };
        let mut suitable: Vec<Card> = affordable.iter().copied().filter(matches).collect();
        if suitable.is_empty() {
            suitable = affordable
                .iter()
                .copied()
                .filter(|c| {
                    catalog.has_role(*c, CardRole::Defense) || catalog.has_role(*c, CardRole::Building)
                })
                .collect();
        }
        if suitable.is_empty() {
            return None;
        }

        let score = |card: Card| {
            let effectiveness = threat
                .card
                .and_then(|t| self.effectiveness(t, card))
                .unwrap_or_else(|| self.estimate(category, base_priority, card, 0));
            effectiveness * (1.0 - f32::from(catalog.cost(card)) / 10.0)
        };
        let mut ranked: Vec<(Card, f32)> = suitable.into_iter().map(|c| (c, score(c))).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let primary = ranked[0].0;
        let primary_cost = u16::from(catalog.cost(primary));
        let secondary = ranked.iter().skip(1).map(|(c, _)| *c).find(|c| {
            f32::from(primary_cost + u16::from(catalog.cost(*c))) <= resource + f32::EPSILON
        });

        let c = &self.config;
        let left = self.arena.is_left_lane(threat.position);
        let primary_tile = match (catalog.has_role(primary, CardRole::Building), left) {
            (true, true) => c.building_left,
            (true, false) => c.building_right,
            (false, true) => c.troop_left,
            (false, false) => c.troop_right,
        };
        let mut positions = vec![(primary, primary_tile)];
        let mut timing = vec![(primary, 0.0)];
        let requires_immediate_response = urgency >= c.immediate_urgency;
        let base_delay = if requires_immediate_response {
            self.config.urgent_secondary_delay
        } else {
            self.config.secondary_delay
        };
        for (i, card) in secondary.iter().enumerate() {
            let offset = i as i32;
            let tile = if left {
                Tile::new(c.secondary_left.x + offset, c.secondary_left.y)
            } else {
                Tile::new(c.secondary_right.x - offset, c.secondary_right.y)
            };
            positions.push((*card, tile));
            timing.push((*card, base_delay + i as f32 * self.config.extra_card_delay));
        }

        let total_cost = primary_cost + secondary.map(|s| u16::from(catalog.cost(s))).unwrap_or(0);
        Some(DefenseResponse {
            threat: threat.card,
            threat_class,
            urgency,
            category,
            primary,
            secondary,
            positions,
            timing,
            expected_effectiveness: self.estimate(
                category,
                base_priority,
                primary,
                usize::from(secondary.is_some()),
            ),
            total_cost,
            requires_immediate_response,
        })
    }

    /// Cheapest affordable win condition to follow a successful defense.
    pub fn counter_attack_opportunity(
        &self,
        successful_defense: bool,
        remaining: f32,
        deck: &[Card],
        catalog: &CardCatalog,
    ) -> Option<Card> {
        if !successful_defense || remaining < self.config.counter_attack_min_elixir {
            return None;
        }
        deck.iter()
            .copied()
            .filter(|c| catalog.has_role(*c, CardRole::WinCondition) && catalog.affordable(*c, remaining))
            .min_by_key(|c| catalog.cost(*c))
    }

    /// Threat/counter pairs with learned values.
    pub fn learned_pairs(&self) -> BTreeSet<(Card, Card)> {
        self.learned.keys().copied().collect()
    }

    /// Heuristic effectiveness when no learned or seeded value exists.
    fn estimate(&self, category: DefenseCategory, base_priority: f32, card: Card, secondaries: usize) -> f32 {
        let c = &self.config;
        let mut value = c.base_effectiveness;
        if DefenseCategory::of(card).contains(&category) {
            value += c.category_match_bonus;
        }
        value += c.secondary_bonus * secondaries as f32;
        if base_priority >= c.dangerous_threat_priority {
            value -= c.dangerous_threat_penalty;
        }
        f32::min(value, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> DefensePlanner {
        DefensePlanner::new(
            DefenseConfig::default(),
            ArenaConfig::default(),
            CounterTable::default(),
        )
    }

    #[test]
    fn outcome_moves_toward_observation() {
        let mut p = planner();
        let before = p.effectiveness(Card::Giant, Card::Cannon).unwrap();
        let after = p.record_outcome(Card::Giant, Card::Cannon, true);
        assert!(after > before);
        assert!((after - (0.8 * 0.6 + 0.2)).abs() < 1e-5);
        let after_fail = p.record_outcome(Card::Giant, Card::Cannon, false);
        assert!(after_fail < after);
    }

    #[test]
    fn unknown_pair_starts_neutral() {
        let mut p = planner();
        assert_eq!(p.effectiveness(Card::Knight, Card::Zap), None);
        let e = p.record_outcome(Card::Knight, Card::Zap, false);
        assert!((e - 0.4).abs() < 1e-5);
    }

    #[test]
    fn urgency_scales_with_distance() {
        let p = planner();
        assert_eq!(p.urgency(8.0, 2.0), 10.0);
        assert!((p.urgency(5.0, 5.0) - 6.0).abs() < 1e-5);
        assert!((p.urgency(5.0, 13.0) - 3.5).abs() < 1e-5);
    }
}
