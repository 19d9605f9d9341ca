//! Integration of every decision component into one per-cycle call.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::action::{ActionKind, ActionRecommendation, Category, TaggedRecommendation};
use crate::analysis::{MatchAnalyzer, MatchMode, StateAnalysis, ThreatLevel};
use crate::card::{Card, CardCatalog, CardRole};
use crate::combo::{ComboCatalog, ComboCoordinator, ComboDefinition};
use crate::config::EngineConfig;
use crate::deck::Deck;
use crate::defense::{CounterTable, DefensePlanner};
use crate::elixir::{ElixirAnalysis, ElixirOptimizer};
use crate::error::EngineError;
use crate::opponent::{OpponentMemory, PlayContext};
use crate::phase::{PhaseController, PlayIntent, TimingKind};
use crate::schedule::{Scheduler, Task};
use crate::scoring::{ActionScorer, ScoringContext};
use crate::state::{MatchSnapshot, OpposingUnit, Tile};

/// Wires deck, configuration and the static tables into a [`DecisionEngine`].
pub struct EngineBuilder {
    deck: Vec<Card>,
    config: EngineConfig,
    catalog: CardCatalog,
    counters: CounterTable,
    combos: ComboCatalog,
}

impl EngineBuilder {
    pub fn new(deck: Vec<Card>) -> Self {
        Self {
            deck,
            config: EngineConfig::default(),
            catalog: CardCatalog::default(),
            counters: CounterTable::default(),
            combos: ComboCatalog::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: CardCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_counters(mut self, counters: CounterTable) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_combos(mut self, combos: ComboCatalog) -> Self {
        self.combos = combos;
        self
    }

    pub fn build(self) -> Result<DecisionEngine, EngineError> {
        DecisionEngine::from_builder(self)
    }
}

/// What the engine last told the caller to do, kept for outcome feedback.
#[derive(Clone, Debug)]
struct Decision {
    category: Category,
    kind: ActionKind,
    card: Option<Card>,
    threat: Option<Card>,
    at: f32,
}

#[derive(Clone, Debug)]
struct CachedDecision {
    snapshot: MatchSnapshot,
    at: f32,
    recommendation: ActionRecommendation,
}

/// A combo the combo track proposes to start if it wins this cycle.
struct PendingCombo {
    definition: ComboDefinition,
    recommendation: ActionRecommendation,
}

/// Strategic decision engine. One instance per match session; call
/// [`DecisionEngine::reset_match`] between matches.
pub struct DecisionEngine {
    config: EngineConfig,
    catalog: CardCatalog,
    deck: Deck,
    analyzer: MatchAnalyzer,
    elixir: ElixirOptimizer,
    opponent: OpponentMemory,
    combos: ComboCoordinator,
    defense: DefensePlanner,
    phase: PhaseController,
    scorer: ActionScorer,
    scheduler: Scheduler,
    weights: BTreeMap<Category, f32>,
    results: BTreeMap<Category, VecDeque<bool>>,
    board: Vec<OpposingUnit>,
    cache: Option<CachedDecision>,
    last_decision: Option<Decision>,
    last_tank_at: Option<f32>,
    successful_defense_at: Option<f32>,
}

impl DecisionEngine {
    pub fn builder(deck: Vec<Card>) -> EngineBuilder {
        EngineBuilder::new(deck)
    }

    fn from_builder(builder: EngineBuilder) -> Result<Self, EngineError> {
        let EngineBuilder {
            deck,
            config,
            catalog,
            counters,
            combos,
        } = builder;
        config.validate()?;
        let deck = Deck::new(deck, &catalog)?;
        tracing::info!(strategy = ?deck.strategy(), primary = ?deck.primary_win_condition(), "deck classified");

        let i = &config.integration;
        let scheduler = Scheduler::new()
            .with_task(Task::CategoryWeights, i.weight_interval)
            .with_task(Task::OpponentPatterns, i.opponent_analysis_interval)
            .with_task(Task::PhaseTuning, i.phase_tuning_interval);

        Ok(Self {
            analyzer: MatchAnalyzer::new(config.analysis.clone(), config.arena.clone()),
            elixir: ElixirOptimizer::new(config.elixir.clone()),
            opponent: OpponentMemory::new(config.opponent.clone()),
            combos: ComboCoordinator::new(config.combo.clone(), &combos, deck.cards()),
            defense: DefensePlanner::new(config.defense.clone(), config.arena.clone(), counters),
            phase: PhaseController::new(config.phase.clone()),
            scorer: ActionScorer::new(config.arena.clone(), config.scoring.clone()),
            scheduler,
            weights: Category::ALL.iter().map(|c| (*c, 1.0)).collect(),
            results: BTreeMap::new(),
            board: Vec::new(),
            cache: None,
            last_decision: None,
            last_tank_at: None,
            successful_defense_at: None,
            config,
            catalog,
            deck,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn phase(&self) -> &PhaseController {
        &self.phase
    }

    pub fn elixir(&self) -> &ElixirOptimizer {
        &self.elixir
    }

    pub fn opponent(&self) -> &OpponentMemory {
        &self.opponent
    }

    pub fn combos(&self) -> &ComboCoordinator {
        &self.combos
    }

    pub fn defense(&self) -> &DefensePlanner {
        &self.defense
    }

    pub fn category_weight(&self, category: Category) -> f32 {
        self.weights.get(&category).copied().unwrap_or(1.0)
    }

    /// Runs the analyzer alone. Does not touch any learned state.
    pub fn analyze(&self, snapshot: &MatchSnapshot) -> StateAnalysis {
        self.analyzer.analyze(snapshot, &self.deck, &self.catalog)
    }

    /// Deck cards with a known answer to what the opponent is likely to
    /// play next, judged from opponent memory at `now`.
    pub fn expected_counters(&self, now: f32) -> BTreeSet<Card> {
        let s = &self.config.scoring;
        let mut predicted = self.opponent.predict_next_plays(
            now,
            self.elixir.opponent_estimate(),
            |c| self.catalog.cost(c),
        );
        predicted.extend(self.opponent.predict_missing_cards(now));
        predicted.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        predicted
            .iter()
            .filter(|p| p.confidence >= s.prediction_confidence)
            .take(s.predictions_considered)
            .flat_map(|p| {
                self.deck
                    .cards()
                    .iter()
                    .copied()
                    .filter(move |c| self.defense.effectiveness(p.card, *c).is_some())
            })
            .collect()
    }

    /// Clears per-match state. Learned counter effectiveness and category
    /// weights carry over to the next match.
    pub fn reset_match(&mut self) {
        self.elixir.reset();
        self.opponent.reset();
        self.combos.reset();
        self.phase.reset();
        self.scheduler.reset();
        self.results.clear();
        self.board.clear();
        self.cache = None;
        self.last_decision = None;
        self.last_tank_at = None;
        self.successful_defense_at = None;
    }

    /// Records an opposing play detected directly by the caller.
    pub fn observe_opponent_play(&mut self, card: Option<Card>, tile: Tile, time: f32) {
        let cost = card.map(|c| self.catalog.cost(c));
        let context = if tile.y >= self.config.arena.own_side_y {
            PlayContext::Attack
        } else {
            PlayContext::Defense
        };
        self.opponent.record_play(card, tile, cost, time, context);
        self.elixir
            .observe_opponent_spend(self.catalog.cost_or_default(card), time);
        self.cache = None;
    }

    /// Feedback on the most recent recommendation.
    pub fn record_outcome(&mut self, success: bool, damage_dealt: u32) {
        self.elixir.record_outcome(success);
        self.phase
            .record_performance(PhaseController::outcome_score(success, damage_dealt));

        let Some(decision) = self.last_decision.take() else {
            return;
        };
        let window = self.config.integration.outcome_window.max(1);
        let results = self.results.entry(decision.category).or_default();
        results.push_back(success);
        while results.len() > window {
            results.pop_front();
        }

        if decision.kind == ActionKind::Defend {
            if let (Some(threat), Some(counter)) = (decision.threat, decision.card) {
                let value = self.defense.record_outcome(threat, counter, success);
                tracing::debug!(%threat, %counter, value, "counter effectiveness updated");
            }
            if success {
                self.successful_defense_at = Some(decision.at);
            }
        }
    }

    /// One decision cycle. Never fails; with nothing worth doing it returns
    /// an explicit low-confidence wait.
    pub fn recommend(&mut self, snapshot: &MatchSnapshot) -> ActionRecommendation {
        let now = snapshot.now();
        if let Some(cached) = &self.cache {
            let age = now - cached.at;
            if age >= 0.0
                && age < self.config.integration.cache_ttl
                && same_observation(&cached.snapshot, snapshot)
            {
                return cached.recommendation.clone();
            }
        }

        let resource = snapshot.resource();
        self.observe_board(snapshot, now);
        self.elixir.tick(now, resource);
        let advantage = resource - self.elixir.opponent_estimate();
        self.phase.update(now, &snapshot.goal_health, advantage);
        self.run_periodic(now);
        self.combos.abandon_stale(now);
        self.combos.cleanup_completed();

        let analysis = self.analyze(snapshot);
        let (recommendation, decision) = self.decide(snapshot, &analysis, now);

        if let Some(card) = recommendation.card {
            self.elixir.record_spending(card, self.catalog.cost(card), now);
            if self.catalog.has_role(card, CardRole::Tank) {
                self.last_tank_at = Some(now);
            }
        }
        self.last_decision = Some(decision);
        tracing::debug!(
            kind = ?recommendation.kind,
            card = ?recommendation.card,
            confidence = recommendation.confidence,
            priority = recommendation.priority,
            "recommendation"
        );
        self.cache = Some(CachedDecision {
            snapshot: snapshot.clone(),
            at: now,
            recommendation: recommendation.clone(),
        });
        recommendation
    }

    /// Diffs visible identities against the previous cycle and records each
    /// newly appeared unit as an opposing play.
    fn observe_board(&mut self, snapshot: &MatchSnapshot, now: f32) {
        let mut previous: BTreeMap<Option<Card>, usize> = BTreeMap::new();
        for unit in &self.board {
            *previous.entry(unit.card).or_insert(0) += 1;
        }
        let mut fresh = Vec::new();
        for unit in &snapshot.opposing_units {
            match previous.get_mut(&unit.card) {
                Some(count) if *count > 0 => *count -= 1,
                _ => fresh.push(unit.clone()),
            }
        }
        for unit in fresh {
            self.observe_opponent_play(unit.card, unit.tile, now);
        }
        self.board = snapshot.opposing_units.clone();
    }

    fn run_periodic(&mut self, now: f32) {
        if self.scheduler.due(Task::CategoryWeights, now) {
            self.tune_weights();
        }
        if self.scheduler.due(Task::OpponentPatterns, now) {
            self.opponent.analyze_patterns();
        }
        if self.scheduler.due(Task::PhaseTuning, now) {
            self.phase.optimize();
        }
    }

    fn tune_weights(&mut self) {
        let i = &self.config.integration;
        for (category, results) in &self.results {
            if results.len() < i.weight_min_samples.max(1) {
                continue;
            }
            let rate = results.iter().filter(|r| **r).count() as f32 / results.len() as f32;
            let weight = self.weights.entry(*category).or_insert(1.0);
            if rate > i.weight_raise_above {
                *weight = (*weight + i.weight_step).min(i.weight_max);
            } else if rate < i.weight_lower_below {
                *weight = (*weight - i.weight_step).max(i.weight_min);
            }
            tracing::debug!(?category, rate, weight = *weight, "category weight tuned");
        }
    }

    fn decide(
        &mut self,
        snapshot: &MatchSnapshot,
        analysis: &StateAnalysis,
        now: f32,
    ) -> (ActionRecommendation, Decision) {
        let resource = analysis.own_resource;
        let committed = self.combos.committed_cards();
        let free: Vec<Card> = snapshot
            .playable_cards()
            .map(|(_, card)| card)
            .filter(|card| !committed.contains(card) && self.catalog.affordable(*card, resource))
            .collect();

        let i = self.config.integration.clone();
        let defense = self.defense_track(snapshot, analysis, &free);
        if let Some((tagged, threat)) = &defense {
            if analysis.highest_threat_level() == ThreatLevel::Critical {
                let rec = self.finish(tagged.clone());
                return (rec, decision(tagged, *threat, now));
            }
        }

        if let Some(step) = self.combos.peek_next(now) {
            if snapshot.is_playable(step.card) && self.catalog.affordable(step.card, resource) {
                if let Some(step) = self.combos.get_next_combo_action(now) {
                    let tagged = TaggedRecommendation {
                        category: Category::ComboTiming,
                        recommendation: ActionRecommendation::new(
                            ActionKind::Combo,
                            step.card,
                            snapshot.legalize(step.tile),
                        )
                        .with_priority(i.combo_step.priority)
                        .with_confidence(i.combo_step.confidence)
                        .with_reason(format!("{} step: {}", step.combo_name, step.card)),
                    };
                    let rec = self.finish(tagged.clone());
                    return (rec, decision(&tagged, None, now));
                }
            }
        }

        let mut tracks: Vec<TaggedRecommendation> = Vec::new();
        let mut threat_card = None;
        if let Some((tagged, threat)) = defense {
            threat_card = threat;
            tracks.push(tagged);
        }
        tracks.extend(self.attack_track(snapshot, analysis, &free, now));
        let pending = self.combo_track(snapshot, analysis, &free);
        if let Some(pending) = &pending {
            tracks.push(TaggedRecommendation {
                category: Category::ComboTiming,
                recommendation: pending.recommendation.clone(),
            });
        }
        tracks.extend(self.resource_track(snapshot, analysis, &free));
        tracks.extend(self.positioning_track(snapshot, analysis, &free, now));
        let elixir = self.elixir.analyze(resource, &free, &self.catalog);
        tracks.extend(self.scoring_track(snapshot, analysis, &elixir, &committed, now));

        for tagged in &mut tracks {
            let weight = self.category_weight(tagged.category);
            let rec = &mut tagged.recommendation;
            rec.confidence = (rec.confidence * weight).clamp(0.0, 1.0);
        }
        tracks.sort_by(|a, b| {
            let (a, b) = (&a.recommendation, &b.recommendation);
            b.priority.cmp(&a.priority).then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });

        let Some(best) = tracks.into_iter().next() else {
            let wait = ActionRecommendation::wait(i.idle.confidence, i.idle.priority, i.fallback_delay)
                .with_reason("nothing worth playing");
            let tagged = TaggedRecommendation {
                category: Category::GeneralScoring,
                recommendation: wait,
            };
            let rec = tagged.recommendation.clone();
            return (rec, decision(&tagged, None, now));
        };

        if best.recommendation.kind == ActionKind::Combo {
            if let Some(pending) = pending {
                let id = self.combos.start(pending.definition.clone(), now);
                self.combos.mark_played(id, pending.definition.primary, now);
            }
        }
        let threat = if best.recommendation.kind == ActionKind::Defend {
            threat_card
        } else {
            None
        };
        let rec = self.finish(best.clone());
        (rec, decision(&best, threat, now))
    }

    /// Phase adjustment of the winning recommendation.
    fn finish(&self, tagged: TaggedRecommendation) -> ActionRecommendation {
        let mut rec = tagged.recommendation;
        let aggression = self.phase.config().aggression;
        match rec.kind {
            ActionKind::Attack | ActionKind::Combo => {
                rec.confidence = (rec.confidence * aggression).min(1.0);
            }
            ActionKind::Defend => {
                rec.confidence = (rec.confidence * (2.0 - aggression)).min(1.0);
            }
            _ => {}
        }
        let timing = match rec.kind {
            ActionKind::Combo => TimingKind::Combo,
            ActionKind::Defend => TimingKind::DefensiveReaction,
            _ if rec.card.is_some_and(|c| self.catalog.has_role(c, CardRole::Spell)) => {
                TimingKind::Spell
            }
            _ => TimingKind::Other,
        };
        rec.timing_delay = (rec.timing_delay * self.phase.timing_modifier(timing)).max(0.0);
        rec
    }

    fn defense_track(
        &self,
        snapshot: &MatchSnapshot,
        analysis: &StateAnalysis,
        free: &[Card],
    ) -> Option<(TaggedRecommendation, Option<Card>)> {
        if !analysis.should_defend {
            return None;
        }
        let response = self
            .defense
            .plan(&analysis.threats, free, analysis.own_resource, &self.catalog)?;
        let priority = match analysis.highest_threat_level() {
            ThreatLevel::Critical => 5,
            ThreatLevel::High => 4,
            _ => 3,
        };
        let tile = response
            .position_of(response.primary)
            .unwrap_or_else(|| self.scorer.role_position(response.primary, analysis, &self.catalog));
        let threat_name = response
            .threat
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown unit".to_string());
        let mut rec = ActionRecommendation::new(ActionKind::Defend, response.primary, snapshot.legalize(tile))
            .with_priority(priority)
            .with_confidence(response.expected_effectiveness)
            .with_reason(format!(
                "defend {threat_name} ({:?}, urgency {:.1})",
                response.threat_class, response.urgency
            ));
        if let Some(secondary) = response.secondary {
            rec = rec.with_reason(format!("follow up with {secondary}"));
        }
        if !response.requires_immediate_response {
            rec = rec
                .with_delay(self.config.defense.measured_response_delay)
                .with_reason("let the threat come closer");
        }
        Some((
            TaggedRecommendation {
                category: Category::Defense,
                recommendation: rec,
            },
            response.threat,
        ))
    }

    fn attack_track(
        &mut self,
        snapshot: &MatchSnapshot,
        analysis: &StateAnalysis,
        free: &[Card],
        now: f32,
    ) -> Option<TaggedRecommendation> {
        let i = &self.config.integration;
        if let Some(at) = self.successful_defense_at {
            if now - at <= i.counter_push_window && now >= at {
                if let Some(card) = self.defense.counter_attack_opportunity(
                    true,
                    analysis.own_resource,
                    free,
                    &self.catalog,
                ) {
                    self.successful_defense_at = None;
                    let tile = self.scorer.role_position(card, analysis, &self.catalog);
                    return Some(TaggedRecommendation {
                        category: Category::Attack,
                        recommendation: ActionRecommendation::new(ActionKind::Attack, card, snapshot.legalize(tile))
                            .with_priority(i.counter_push.priority)
                            .with_confidence(i.counter_push.confidence)
                            .with_reason("counter-push after a successful defense"),
                    });
                }
            } else {
                self.successful_defense_at = None;
            }
        }

        if analysis.mode == MatchMode::ForcedAttack {
            let spent = self.elixir.opponent_recent_spend(now, i.forced_push_lookback);
            if !self.deck.should_play_aggressive(analysis.own_resource, spent) {
                return None;
            }
            let card = free
                .iter()
                .copied()
                .find(|c| self.catalog.has_role(*c, CardRole::WinCondition))?;
            let tile = self.scorer.role_position(card, analysis, &self.catalog);
            return Some(TaggedRecommendation {
                category: Category::Attack,
                recommendation: ActionRecommendation::new(ActionKind::Attack, card, snapshot.legalize(tile))
                    .with_priority(i.forced_push.priority)
                    .with_confidence(i.forced_push.confidence)
                    .with_reason(format!("opponent committed {spent:.0} elixir recently")),
            });
        }
        if analysis.mode != MatchMode::Attack {
            return None;
        }
        let opportunity = analysis.best_opportunity()?;
        let card = opportunity
            .recommended_cards
            .iter()
            .copied()
            .find(|c| free.contains(c))
            .or_else(|| {
                free.iter()
                    .copied()
                    .find(|c| self.catalog.has_role(*c, CardRole::WinCondition))
            })?;
        let tile = self.scorer.role_position(card, analysis, &self.catalog);
        let value = self
            .phase
            .card_value_modifier(card, PlayIntent::Attack, &self.catalog);
        Some(TaggedRecommendation {
            category: Category::Attack,
            recommendation: ActionRecommendation::new(ActionKind::Attack, card, snapshot.legalize(tile))
                .with_priority(i.attack_priority)
                .with_confidence(opportunity.confidence * value.min(1.2))
                .with_reason(format!(
                    "opponent deficit {} in {} lane",
                    opportunity.opponent_deficit, opportunity.lane
                )),
        })
    }

    fn combo_track(
        &self,
        snapshot: &MatchSnapshot,
        analysis: &StateAnalysis,
        free: &[Card],
    ) -> Option<PendingCombo> {
        let (definition, score) = self.combos.evaluate(analysis, free)?;
        let primary = definition.primary;
        if !free.contains(&primary) {
            return None;
        }
        // Weighted by phase, never vetoed by it.
        let value = self
            .phase
            .card_value_modifier(primary, PlayIntent::Attack, &self.catalog);
        let confidence = score * value.min(1.2) * self.phase.config().card_values.combo;
        let tile = definition.position_rule(primary).tile();
        let recommendation = ActionRecommendation::new(ActionKind::Combo, primary, snapshot.legalize(tile))
            .with_priority(self.config.integration.combo_start_priority)
            .with_confidence(confidence)
            .with_reason(format!("start {}", definition.name))
            .with_reason(format!("{} phase", self.phase.phase()));
        Some(PendingCombo {
            definition,
            recommendation,
        })
    }

    fn resource_track(
        &self,
        snapshot: &MatchSnapshot,
        analysis: &StateAnalysis,
        free: &[Card],
    ) -> Option<TaggedRecommendation> {
        let i = &self.config.integration;
        let resource = analysis.own_resource;
        if let Some(card) = self.elixir.leak_prevention(resource, free, &self.catalog) {
            let tile = self.scorer.role_position(card, analysis, &self.catalog);
            return Some(TaggedRecommendation {
                category: Category::Resource,
                recommendation: ActionRecommendation::new(ActionKind::Cycle, card, snapshot.legalize(tile))
                    .with_priority(i.leak.priority)
                    .with_confidence(i.leak.confidence)
                    .with_reason(format!("elixir at {resource:.1}, cycle {card} to avoid leaking")),
            });
        }
        let advantage = resource - self.elixir.opponent_estimate();
        if self.elixir.should_conserve(resource, advantage) && analysis.highest_threat_level() < ThreatLevel::Medium {
            return Some(TaggedRecommendation {
                category: Category::Resource,
                recommendation: ActionRecommendation::wait(i.conserve.confidence, i.conserve.priority, i.fallback_delay)
                    .with_reason(format!("conserve elixir ({resource:.1}, advantage {advantage:+.1})")),
            });
        }
        None
    }

    fn positioning_track(
        &self,
        snapshot: &MatchSnapshot,
        analysis: &StateAnalysis,
        free: &[Card],
        now: f32,
    ) -> Option<TaggedRecommendation> {
        let i = &self.config.integration;
        let at = self.last_tank_at?;
        if now < at || now - at > i.support_window {
            return None;
        }
        if analysis.highest_threat_level() >= ThreatLevel::High {
            return None;
        }
        let support = self
            .deck
            .support_cards()
            .iter()
            .copied()
            .find(|c| free.contains(c))?;
        let value = self
            .phase
            .card_value_modifier(support, PlayIntent::Attack, &self.catalog);
        Some(TaggedRecommendation {
            category: Category::Positioning,
            recommendation: ActionRecommendation::new(ActionKind::Play, support, snapshot.legalize(i.support_tile))
                .with_priority(i.support.priority)
                .with_confidence(i.support.confidence * value.min(1.5))
                .with_reason(format!("support the tank with {support}"))
                .with_reason(format!("{} phase", self.phase.phase())),
        })
    }

    fn scoring_track(
        &self,
        snapshot: &MatchSnapshot,
        analysis: &StateAnalysis,
        elixir: &ElixirAnalysis,
        committed: &BTreeSet<Card>,
        now: f32,
    ) -> Option<TaggedRecommendation> {
        let expected_counters = self.expected_counters(now);
        let ctx = ScoringContext {
            snapshot,
            analysis,
            deck: &self.deck,
            catalog: &self.catalog,
            phase: &self.phase,
            combos: &self.combos,
            elixir,
            opponent_style: self.opponent.play_style(),
            expected_counters: &expected_counters,
        };
        let candidates: Vec<_> = self
            .scorer
            .candidates(&ctx)
            .into_iter()
            .filter(|c| !committed.contains(&c.card))
            .collect();
        let (best, score) = self.scorer.rank(&candidates, &ctx).into_iter().next()?;
        if score <= 0.0 {
            return None;
        }
        let mut rec = ActionRecommendation::new(ActionKind::Play, best.card, best.tile)
            .with_priority(self.config.integration.scoring_priority)
            .with_confidence(score / self.scorer.config().max_base_score)
            .with_reason(format!("best scored placement ({score:.2})"))
            .with_reason(format!("strategy: {}", analysis.recommended_strategy));
        if let Some(archetype) = self.opponent.archetype() {
            rec = rec.with_reason(format!("opponent looks like {archetype}"));
        }
        Some(TaggedRecommendation {
            category: Category::GeneralScoring,
            recommendation: rec,
        })
    }
}

fn decision(tagged: &TaggedRecommendation, threat: Option<Card>, at: f32) -> Decision {
    Decision {
        category: tagged.category,
        kind: tagged.recommendation.kind,
        card: tagged.recommendation.card,
        threat,
        at,
    }
}

/// Equality of everything but the clock.
fn same_observation(a: &MatchSnapshot, b: &MatchSnapshot) -> bool {
    a.own_resource == b.own_resource
        && a.own_hand == b.own_hand
        && a.own_playable_indices == b.own_playable_indices
        && a.opposing_units == b.opposing_units
        && a.goal_health == b.goal_health
        && a.legal_tiles == b.legal_tiles
}
