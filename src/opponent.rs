use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::{Card, DECK_SIZE};
use crate::config::OpponentConfig;
use crate::state::Tile;

/// Whether a play pushed toward us or answered something on their side.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayContext {
    Attack,
    Defense,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpponentPlay {
    pub card: Option<Card>,
    pub tile: Tile,
    pub cost: u8,
    pub time: f32,
    pub context: PlayContext,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStyle {
    Aggressive,
    Defensive,
    Cycle,
    Heavy,
    Unknown,
}

impl PlayStyle {
    /// How we should lean against this style.
    pub fn recommended_response(self) -> &'static str {
        match self {
            PlayStyle::Aggressive => "defensive_counter",
            PlayStyle::Defensive => "aggressive_pressure",
            PlayStyle::Heavy => "cycle_pressure",
            PlayStyle::Cycle => "heavy_push",
            PlayStyle::Unknown => "balanced",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    GiantBeatdown,
    HogCycle,
    GolemBeatdown,
    PekkaBridgeSpam,
    LavaHound,
    SpellBait,
    XBow,
}

impl Archetype {
    pub const ALL: [Archetype; 7] = [
        Archetype::GiantBeatdown,
        Archetype::HogCycle,
        Archetype::GolemBeatdown,
        Archetype::PekkaBridgeSpam,
        Archetype::LavaHound,
        Archetype::SpellBait,
        Archetype::XBow,
    ];

    /// Cards whose presence identifies the archetype.
    pub fn indicators(self) -> [Card; 3] {
        match self {
            Archetype::GiantBeatdown => [Card::Giant, Card::Musketeer, Card::Bomber],
            Archetype::HogCycle => [Card::HogRider, Card::IceSpirit, Card::Cannon],
            Archetype::GolemBeatdown => [Card::Golem, Card::NightWitch, Card::BabyDragon],
            Archetype::PekkaBridgeSpam => [Card::Pekka, Card::BattleRam, Card::Bandit],
            Archetype::LavaHound => [Card::LavaHound, Card::Balloon, Card::Minions],
            Archetype::SpellBait => [Card::GoblinBarrel, Card::Princess, Card::Knight],
            Archetype::XBow => [Card::XBow, Card::Tesla, Card::Archers],
        }
    }

    /// Typical core of a deck of this archetype.
    pub fn template(self) -> [Card; 4] {
        let [a, b, c] = self.indicators();
        let fourth = match self {
            Archetype::GiantBeatdown => Card::Arrows,
            Archetype::HogCycle => Card::Archers,
            Archetype::GolemBeatdown => Card::Lightning,
            Archetype::PekkaBridgeSpam => Card::Zap,
            Archetype::LavaHound => Card::Tombstone,
            Archetype::SpellBait => Card::Rocket,
            Archetype::XBow => Card::TheLog,
        };
        [a, b, c, fourth]
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Archetype::GiantBeatdown => "giant beatdown",
            Archetype::HogCycle => "hog cycle",
            Archetype::GolemBeatdown => "golem beatdown",
            Archetype::PekkaBridgeSpam => "pekka bridge spam",
            Archetype::LavaHound => "lava hound",
            Archetype::SpellBait => "spell bait",
            Archetype::XBow => "x-bow",
        };
        f.write_str(name)
    }
}

/// Response tag attached to a mined sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterStrategy {
    HeavyDefense,
    FastCounter,
    AirDefense,
    BalancedResponse,
}

impl CounterStrategy {
    pub fn for_sequence(cards: &[Card]) -> Self {
        let any = |set: &[Card]| cards.iter().any(|c| set.contains(c));
        if any(&[Card::Giant, Card::Golem, Card::Pekka]) {
            CounterStrategy::HeavyDefense
        } else if any(&[Card::HogRider, Card::RamRider]) {
            CounterStrategy::FastCounter
        } else if any(&[Card::Balloon, Card::LavaHound]) {
            CounterStrategy::AirDefense
        } else {
            CounterStrategy::BalancedResponse
        }
    }
}

/// A run of cards the opponent has played more than once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequencePattern {
    pub cards: Vec<Card>,
    pub frequency: usize,
    /// Mean seconds from first to last card of the run.
    pub typical_timing: f32,
    pub counter_strategy: CounterStrategy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardPrediction {
    pub card: Card,
    pub confidence: f32,
    /// Index of the card in the last detected cycle, if any.
    pub cycle_position: Option<usize>,
    pub expected_next_play: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehaviorMetrics {
    pub aggressiveness: f32,
    pub patience: f32,
    pub adaptation: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpponentSummary {
    pub total_plays: usize,
    pub cards_seen: Vec<Card>,
    pub archetype: Option<Archetype>,
    pub archetype_confidence: f32,
    pub play_style: PlayStyle,
    pub average_cost: f32,
    pub cycle_length: Option<usize>,
    pub patterns: usize,
    pub behavior: BehaviorMetrics,
}

/// Everything learned about the opponent during one match.
#[derive(Clone, Debug)]
pub struct OpponentMemory {
    config: OpponentConfig,
    plays: VecDeque<OpponentPlay>,
    window: VecDeque<Card>,
    seen: BTreeSet<Card>,
    last_seen: HashMap<Card, f32>,
    play_times: HashMap<Card, Vec<f32>>,
    frequencies: BTreeMap<Card, usize>,
    cooccurrence: HashMap<Card, BTreeSet<Card>>,
    cycle_length: Option<usize>,
    cycle_pattern: Vec<Card>,
    patterns: Vec<SequencePattern>,
    total_plays: usize,
    attack_plays: usize,
    total_cost: u32,
    play_style: PlayStyle,
}

impl OpponentMemory {
    pub fn new(config: OpponentConfig) -> Self {
        Self {
            config,
            plays: VecDeque::new(),
            window: VecDeque::new(),
            seen: BTreeSet::new(),
            last_seen: HashMap::new(),
            play_times: HashMap::new(),
            frequencies: BTreeMap::new(),
            cooccurrence: HashMap::new(),
            cycle_length: None,
            cycle_pattern: Vec::new(),
            patterns: Vec::new(),
            total_plays: 0,
            attack_plays: 0,
            total_cost: 0,
            play_style: PlayStyle::Unknown,
        }
    }

    /// Clears everything. Only called between matches.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Records one opposing play. `cost` of `None` uses the configured default.
    pub fn record_play(
        &mut self,
        card: Option<Card>,
        tile: Tile,
        cost: Option<u8>,
        time: f32,
        context: PlayContext,
    ) {
        let cost = cost.unwrap_or(self.config.default_cost);

        if let Some(card) = card {
            for earlier in self.plays.iter().rev() {
                if time - earlier.time > self.config.cooccurrence_seconds {
                    break;
                }
                if let Some(other) = earlier.card.filter(|other| *other != card) {
                    self.cooccurrence.entry(other).or_default().insert(card);
                    self.cooccurrence.entry(card).or_default().insert(other);
                }
            }
            self.seen.insert(card);
            self.last_seen.insert(card, time);
            self.play_times.entry(card).or_default().push(time);
            *self.frequencies.entry(card).or_insert(0) += 1;

            self.window.push_back(card);
            while self.window.len() > self.config.window {
                self.window.pop_front();
            }
            self.detect_cycle();
        }

        self.total_plays += 1;
        self.total_cost += u32::from(cost);
        if context == PlayContext::Attack {
            self.attack_plays += 1;
        }
        self.update_play_style();

        self.plays.push_back(OpponentPlay {
            card,
            tile,
            cost,
            time,
            context,
        });
        while self.plays.len() > self.config.log_len {
            self.plays.pop_front();
        }
        tracing::debug!(card = ?card, cost, time, ?context, "opponent play recorded");
    }

    /// Looks for the shortest run of length k in 1..=4 that repeats at the
    /// tail of the window.
    fn detect_cycle(&mut self) {
        let cards: Vec<Card> = self.window.iter().copied().collect();
        for k in 1..=4 {
            if cards.len() < 2 * k {
                break;
            }
            let recent = &cards[cards.len() - k..];
            let previous = &cards[cards.len() - 2 * k..cards.len() - k];
            if recent == previous {
                self.cycle_length = Some(k);
                self.cycle_pattern = cards.clone();
                return;
            }
        }
    }

    fn update_play_style(&mut self) {
        if self.total_plays < self.config.min_style_plays {
            return;
        }
        let aggressive_ratio = self.attack_plays as f32 / self.total_plays as f32;
        let average_cost = self.average_cost();
        self.play_style = if aggressive_ratio > 0.7 {
            PlayStyle::Aggressive
        } else if aggressive_ratio < 0.3 {
            PlayStyle::Defensive
        } else if average_cost > 4.5 {
            PlayStyle::Heavy
        } else if average_cost < 3.0 {
            PlayStyle::Cycle
        } else {
            PlayStyle::Unknown
        };
    }

    pub fn plays(&self) -> impl Iterator<Item = &OpponentPlay> {
        self.plays.iter()
    }

    pub fn total_plays(&self) -> usize {
        self.total_plays
    }

    pub fn cards_seen(&self) -> &BTreeSet<Card> {
        &self.seen
    }

    pub fn has_seen(&self, card: Card) -> bool {
        self.seen.contains(&card)
    }

    pub fn cards_not_seen(&self) -> impl Iterator<Item = Card> + '_ {
        Card::ALL.iter().copied().filter(|c| !self.seen.contains(c))
    }

    pub fn frequency(&self, card: Card) -> usize {
        self.frequencies.get(&card).copied().unwrap_or(0)
    }

    pub fn last_seen(&self, card: Card) -> Option<f32> {
        self.last_seen.get(&card).copied()
    }

    pub fn cycle_length(&self) -> Option<usize> {
        self.cycle_length
    }

    pub fn play_style(&self) -> PlayStyle {
        self.play_style
    }

    pub fn patterns(&self) -> &[SequencePattern] {
        &self.patterns
    }

    pub fn average_cost(&self) -> f32 {
        if self.total_plays == 0 {
            0.0
        } else {
            self.total_cost as f32 / self.total_plays as f32
        }
    }

    /// Archetype with the most indicator cards seen, requiring at least two.
    pub fn archetype(&self) -> Option<Archetype> {
        let mut best = None;
        let mut best_score = 0;
        for archetype in Archetype::ALL {
            let score = archetype
                .indicators()
                .iter()
                .filter(|c| self.seen.contains(c))
                .count();
            if score > best_score {
                best_score = score;
                best = Some(archetype);
            }
        }
        if best_score >= 2 { best } else { None }
    }

    pub fn archetype_confidence(&self) -> f32 {
        let coverage = self.seen.len().min(DECK_SIZE) as f32 / DECK_SIZE as f32;
        let known = if self.archetype().is_some() { 0.3 } else { 0.0 };
        (0.7 * coverage + known).min(1.0)
    }

    /// When `card` is next expected, from its average replay interval.
    pub fn expected_next_play(&self, card: Card, now: f32) -> f32 {
        match self.play_times.get(&card) {
            Some(times) if times.len() >= 2 => {
                let span = times[times.len() - 1] - times[0];
                let interval = span / (times.len() - 1) as f32;
                times[times.len() - 1] + interval
            }
            _ => now + self.config.full_cycle_seconds,
        }
    }

    fn cycle_position(&self, card: Card) -> Option<usize> {
        self.cycle_pattern.iter().position(|c| *c == card)
    }

    /// Unseen cards expected from the archetype template, best first.
    pub fn predict_missing_cards(&self, now: f32) -> Vec<CardPrediction> {
        let Some(archetype) = self.archetype() else {
            return Vec::new();
        };
        let coverage = self.seen.len().min(DECK_SIZE) as f32 / DECK_SIZE as f32;
        let mut predictions: Vec<CardPrediction> = archetype
            .template()
            .iter()
            .copied()
            .filter(|card| !self.seen.contains(card))
            .map(|card| {
                let mut confidence = 0.3 + 0.3 + 0.2 * coverage;
                let cooccurs = self
                    .seen
                    .iter()
                    .any(|seen| self.cooccurrence.get(seen).is_some_and(|set| set.contains(&card)));
                if cooccurs {
                    confidence += 0.2;
                }
                CardPrediction {
                    card,
                    confidence: confidence.min(0.95),
                    cycle_position: self.cycle_position(card),
                    expected_next_play: self.expected_next_play(card, now),
                }
            })
            .collect();
        sort_predictions(&mut predictions);
        predictions.truncate(DECK_SIZE.saturating_sub(self.seen.len()));
        predictions
    }

    /// Seen cards not among the last four plays, ranked by how likely they
    /// come next given usage, rest time and the opponent's elixir.
    pub fn predict_next_plays(
        &self,
        now: f32,
        opponent_elixir: f32,
        cost_of: impl Fn(Card) -> u8,
    ) -> Vec<CardPrediction> {
        let recent: Vec<Card> = self.window.iter().rev().take(4).copied().collect();
        let identified: usize = self.frequencies.values().sum();
        let mut predictions: Vec<CardPrediction> = self
            .seen
            .iter()
            .copied()
            .filter(|card| !recent.contains(card))
            .map(|card| {
                let mut confidence = 0.3;
                if identified > 0 {
                    confidence += self.frequency(card) as f32 / identified as f32 * 0.4;
                }
                if self
                    .last_seen(card)
                    .is_some_and(|t| now - t > self.config.unseen_bonus_after)
                {
                    confidence += 0.3;
                }
                if opponent_elixir >= f32::from(cost_of(card)) {
                    confidence += 0.2;
                }
                CardPrediction {
                    card,
                    confidence: confidence.min(0.95),
                    cycle_position: self.cycle_position(card),
                    expected_next_play: self.expected_next_play(card, now),
                }
            })
            .collect();
        sort_predictions(&mut predictions);
        predictions
    }

    /// Mines runs of 2 to 4 identified cards that occur at least twice.
    pub fn analyze_patterns(&mut self) {
        let sequence: Vec<(Card, f32)> = self
            .plays
            .iter()
            .filter_map(|p| p.card.map(|c| (c, p.time)))
            .collect();
        let mut runs: BTreeMap<Vec<Card>, (usize, f32)> = BTreeMap::new();
        for len in self.config.pattern_min_len..=self.config.pattern_max_len {
            if len == 0 || sequence.len() < len {
                continue;
            }
            for window in sequence.windows(len) {
                let cards: Vec<Card> = window.iter().map(|(c, _)| *c).collect();
                let duration = window[len - 1].1 - window[0].1;
                let entry = runs.entry(cards).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += duration;
            }
        }
        self.patterns = runs
            .into_iter()
            .filter(|(_, (count, _))| *count >= 2)
            .map(|(cards, (frequency, total))| SequencePattern {
                counter_strategy: CounterStrategy::for_sequence(&cards),
                typical_timing: total / frequency as f32,
                cards,
                frequency,
            })
            .collect();
        self.patterns
            .sort_by(|a, b| b.frequency.cmp(&a.frequency).then(b.cards.len().cmp(&a.cards.len())));
    }

    pub fn behavior(&self) -> BehaviorMetrics {
        let aggressiveness = if self.total_plays > 0 {
            self.attack_plays as f32 / self.total_plays as f32
        } else {
            0.0
        };

        let patience = if self.plays.len() >= 2 {
            let first = self.plays[0].time;
            let last = self.plays[self.plays.len() - 1].time;
            let average = (last - first) / (self.plays.len() - 1) as f32;
            (average / 10.0).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let adaptation = if self.plays.len() >= 10 {
            let mid = self.plays.len() / 2;
            let first: BTreeSet<Card> = self.plays.iter().take(mid).filter_map(|p| p.card).collect();
            let second: BTreeSet<Card> = self.plays.iter().skip(mid).filter_map(|p| p.card).collect();
            let union = first.union(&second).count();
            if union > 0 {
                1.0 - first.intersection(&second).count() as f32 / union as f32
            } else {
                0.0
            }
        } else {
            0.0
        };

        BehaviorMetrics {
            aggressiveness,
            patience,
            adaptation,
        }
    }

    pub fn summary(&self) -> OpponentSummary {
        OpponentSummary {
            total_plays: self.total_plays,
            cards_seen: self.seen.iter().copied().collect(),
            archetype: self.archetype(),
            archetype_confidence: self.archetype_confidence(),
            play_style: self.play_style,
            average_cost: self.average_cost(),
            cycle_length: self.cycle_length,
            patterns: self.patterns.len(),
            behavior: self.behavior(),
        }
    }
}

fn sort_predictions(predictions: &mut [CardPrediction]) {
    predictions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> OpponentMemory {
        OpponentMemory::new(OpponentConfig::default())
    }

    fn play(memory: &mut OpponentMemory, card: Card, time: f32) {
        memory.record_play(Some(card), Tile::new(9, 5), None, time, PlayContext::Attack);
    }

    #[test]
    fn detects_single_card_repeat_as_cycle() {
        let mut m = memory();
        play(&mut m, Card::Knight, 1.0);
        assert_eq!(m.cycle_length(), None);
        play(&mut m, Card::Knight, 2.0);
        assert_eq!(m.cycle_length(), Some(1));
    }

    #[test]
    fn detects_two_card_cycle() {
        let mut m = memory();
        for (i, card) in [Card::HogRider, Card::Zap, Card::HogRider, Card::Zap]
            .into_iter()
            .enumerate()
        {
            play(&mut m, card, i as f32);
        }
        assert_eq!(m.cycle_length(), Some(2));
    }

    #[test]
    fn archetype_needs_two_indicators() {
        let mut m = memory();
        play(&mut m, Card::Giant, 1.0);
        assert_eq!(m.archetype(), None);
        play(&mut m, Card::Musketeer, 3.0);
        assert_eq!(m.archetype(), Some(Archetype::GiantBeatdown));
        assert!((m.archetype_confidence() - (0.7 * 2.0 / 8.0 + 0.3)).abs() < 1e-5);
    }

    #[test]
    fn missing_cards_come_from_template() {
        let mut m = memory();
        play(&mut m, Card::HogRider, 1.0);
        play(&mut m, Card::IceSpirit, 2.0);
        let predictions = m.predict_missing_cards(3.0);
        let cards: Vec<Card> = predictions.iter().map(|p| p.card).collect();
        assert_eq!(cards.len(), 2);
        assert!(cards.contains(&Card::Cannon));
        assert!(cards.contains(&Card::Archers));
        let expected = 0.3 + 0.3 + 0.2 * 2.0 / 8.0;
        assert!((predictions[0].confidence - expected).abs() < 1e-5);
        assert_eq!(predictions[0].expected_next_play, 33.0);
    }

    #[test]
    fn style_waits_for_five_plays() {
        let mut m = memory();
        for i in 0..4 {
            play(&mut m, Card::Goblins, i as f32);
        }
        assert_eq!(m.play_style(), PlayStyle::Unknown);
        play(&mut m, Card::Goblins, 5.0);
        assert_eq!(m.play_style(), PlayStyle::Aggressive);
    }

    #[test]
    fn repeated_runs_become_patterns() {
        let mut m = memory();
        let seq = [Card::Giant, Card::Musketeer, Card::Zap, Card::Giant, Card::Musketeer];
        for (i, card) in seq.into_iter().enumerate() {
            play(&mut m, card, i as f32 * 2.0);
        }
        m.analyze_patterns();
        let giant_musk = m
            .patterns()
            .iter()
            .find(|p| p.cards == vec![Card::Giant, Card::Musketeer])
            .unwrap();
        assert_eq!(giant_musk.frequency, 2);
        assert_eq!(giant_musk.counter_strategy, CounterStrategy::HeavyDefense);
        assert!((giant_musk.typical_timing - 2.0).abs() < 1e-5);
    }
}
