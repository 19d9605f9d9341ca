use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardCatalog};
use crate::config::{AnalysisConfig, ArenaConfig};
use crate::deck::Deck;
use crate::state::{MatchSnapshot, Tile};

/// Urgency of a single opposing unit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    fn escalate(self) -> Self {
        match self {
            ThreatLevel::None => ThreatLevel::None,
            ThreatLevel::Low => ThreatLevel::Medium,
            ThreatLevel::Medium => ThreatLevel::High,
            ThreatLevel::High | ThreatLevel::Critical => ThreatLevel::Critical,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Left,
    Right,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Left => f.write_str("left"),
            Lane::Right => f.write_str("right"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreatInfo {
    pub card: Option<Card>,
    pub position: Tile,
    pub level: ThreatLevel,
    pub distance_to_goal: f32,
    pub targeting_goal: bool,
    pub requires_immediate_response: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpportunityInfo {
    pub lane: Lane,
    pub opponent_deficit: u8,
    pub defenses_down: bool,
    pub recommended_cards: Vec<Card>,
    pub confidence: f32,
}

/// Overall posture for the current cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    EmergencyDefense,
    ActiveDefense,
    Attack,
    ForcedAttack,
    Neutral,
}

/// Coarse advice derived from threats and opportunities.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedStrategy {
    DefendAgainst(Option<Card>),
    AttackLane(Lane),
    CycleCards,
    WaitAndReact,
}

impl fmt::Display for RecommendedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendedStrategy::DefendAgainst(Some(card)) => {
                write!(f, "defend against {card}")
            }
            RecommendedStrategy::DefendAgainst(None) => f.write_str("defend against unknown unit"),
            RecommendedStrategy::AttackLane(lane) => write!(f, "attack {lane} lane"),
            RecommendedStrategy::CycleCards => f.write_str("cycle cards"),
            RecommendedStrategy::WaitAndReact => f.write_str("wait and react"),
        }
    }
}

/// Per-cycle interpretation of a snapshot. Never cached across cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateAnalysis {
    pub threats: Vec<ThreatInfo>,
    pub opportunities: Vec<OpportunityInfo>,
    pub mode: MatchMode,
    pub own_resource: f32,
    pub opponent_deficit: u8,
    pub should_defend: bool,
    pub should_attack: bool,
    pub recommended_strategy: RecommendedStrategy,
}

impl StateAnalysis {
    pub fn primary_threat(&self) -> Option<&ThreatInfo> {
        self.threats.first()
    }

    pub fn best_opportunity(&self) -> Option<&OpportunityInfo> {
        self.opportunities.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    pub fn highest_threat_level(&self) -> ThreatLevel {
        self.primary_threat()
            .map(|t| t.level)
            .unwrap_or(ThreatLevel::None)
    }
}

/// Turns raw snapshots into threats, opportunities and a match mode.
#[derive(Clone, Debug)]
pub struct MatchAnalyzer {
    config: AnalysisConfig,
    arena: ArenaConfig,
}

impl MatchAnalyzer {
    pub fn new(config: AnalysisConfig, arena: ArenaConfig) -> Self {
        Self { config, arena }
    }

    pub fn analyze(
        &self,
        snapshot: &MatchSnapshot,
        deck: &Deck,
        catalog: &CardCatalog,
    ) -> StateAnalysis {
        let resource = snapshot.resource();

        let mut threats: Vec<ThreatInfo> = snapshot
            .opposing_units
            .iter()
            .filter_map(|unit| {
                let distance = self.arena.distance_to_goal(unit.tile);
                let high_priority = unit.card.is_some_and(|c| catalog.is_high_priority(c));
                let level = self.threat_level(distance, high_priority);
                if level == ThreatLevel::None {
                    return None;
                }
                Some(ThreatInfo {
                    card: unit.card,
                    position: unit.tile,
                    level,
                    distance_to_goal: distance,
                    targeting_goal: unit.tile.y >= self.arena.own_side_y,
                    requires_immediate_response: level >= ThreatLevel::High,
                })
            })
            .collect();
        // Stable: equal levels keep detector order.
        threats.sort_by(|a, b| b.level.cmp(&a.level));

        let opponent_deficit = self.opponent_deficit(snapshot.opposing_units.len());

        let mut opportunities = Vec::new();
        if opponent_deficit >= self.config.opportunity_deficit {
            if let Some(win_condition) = deck.primary_win_condition() {
                let lane = if snapshot.opposing_units.is_empty()
                    || snapshot
                        .opposing_units
                        .iter()
                        .any(|u| self.arena.is_left_lane(u.tile))
                {
                    Lane::Right
                } else {
                    Lane::Left
                };
                opportunities.push(OpportunityInfo {
                    lane,
                    opponent_deficit,
                    defenses_down: snapshot.opposing_units.is_empty(),
                    recommended_cards: vec![win_condition],
                    confidence: (f32::from(opponent_deficit) / 6.0).min(0.9),
                });
            }
        }

        let highest = threats
            .first()
            .map(|t| t.level)
            .unwrap_or(ThreatLevel::None);
        let mode = if highest == ThreatLevel::Critical {
            MatchMode::EmergencyDefense
        } else if highest == ThreatLevel::High {
            MatchMode::ActiveDefense
        } else if !opportunities.is_empty() && resource >= self.config.attack_resource {
            MatchMode::Attack
        } else if resource >= self.config.forced_attack_resource {
            MatchMode::ForcedAttack
        } else {
            MatchMode::Neutral
        };

        let recommended_strategy = match threats.first() {
            Some(threat) if threat.level >= ThreatLevel::High => {
                RecommendedStrategy::DefendAgainst(threat.card)
            }
            _ => match opportunities.first() {
                Some(opp) if resource >= self.config.attack_lane_resource => {
                    RecommendedStrategy::AttackLane(opp.lane)
                }
                _ if resource >= self.config.forced_attack_resource => {
                    RecommendedStrategy::CycleCards
                }
                _ => RecommendedStrategy::WaitAndReact,
            },
        };

        StateAnalysis {
            should_defend: threats.iter().any(|t| t.level >= ThreatLevel::Medium),
            should_attack: !opportunities.is_empty()
                && opponent_deficit >= self.config.should_attack_deficit,
            threats,
            opportunities,
            mode,
            own_resource: resource,
            opponent_deficit,
            recommended_strategy,
        }
    }

    /// Distance band, escalated one level for high-priority identities.
    pub fn threat_level(&self, distance: f32, high_priority: bool) -> ThreatLevel {
        let base = if distance <= self.config.near_distance {
            ThreatLevel::High
        } else if distance <= self.config.mid_distance {
            ThreatLevel::Medium
        } else if distance <= self.config.far_distance {
            ThreatLevel::Low
        } else {
            ThreatLevel::None
        };
        if high_priority { base.escalate() } else { base }
    }

    /// Board-occupancy proxy for how much the opponent has recently spent.
    pub fn opponent_deficit(&self, units: usize) -> u8 {
        match units {
            0 => self.config.deficit_no_units,
            1 => self.config.deficit_one_unit,
            _ => self.config.deficit_crowded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> MatchAnalyzer {
        MatchAnalyzer::new(AnalysisConfig::default(), ArenaConfig::default())
    }

    #[test]
    fn bands_escalate_for_high_priority() {
        let a = analyzer();
        assert_eq!(a.threat_level(2.0, false), ThreatLevel::High);
        assert_eq!(a.threat_level(2.0, true), ThreatLevel::Critical);
        assert_eq!(a.threat_level(5.0, true), ThreatLevel::High);
        assert_eq!(a.threat_level(8.0, false), ThreatLevel::Low);
        assert_eq!(a.threat_level(8.0, true), ThreatLevel::Medium);
        assert_eq!(a.threat_level(12.0, true), ThreatLevel::None);
    }

    #[test]
    fn deficit_proxy_tracks_occupancy() {
        let a = analyzer();
        assert_eq!(a.opponent_deficit(0), 6);
        assert_eq!(a.opponent_deficit(1), 3);
        assert_eq!(a.opponent_deficit(5), 1);
    }
}
