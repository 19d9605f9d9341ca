use std::collections::BTreeSet;

use proptest::prelude::*;

use elixirbot::analysis::{Lane, OpportunityInfo, RecommendedStrategy};
use elixirbot::combo::ComboCatalog;
use elixirbot::config::{ArenaConfig, ComboConfig, ElixirConfig, PhaseSettings, ScoringConfig};
use elixirbot::opponent::PlayStyle;
use elixirbot::scoring::{ActionScorer, ScoringContext};
use elixirbot::{
    Candidate, Card, CardCatalog, ComboCoordinator, DecisionEngine, Deck, ElixirOptimizer,
    MatchMode, MatchSnapshot, OpposingUnit, PhaseController, StateAnalysis, Tile,
};

const OPPONENT_POOL: [Card; 6] = [
    Card::HogRider,
    Card::Giant,
    Card::SkeletonArmy,
    Card::Balloon,
    Card::Musketeer,
    Card::MinionHorde,
];

fn giant_deck() -> Vec<Card> {
    vec![
        Card::Giant,
        Card::Musketeer,
        Card::MiniPekka,
        Card::Fireball,
        Card::Zap,
        Card::Knight,
        Card::Archers,
        Card::Cannon,
    ]
}

fn units() -> impl Strategy<Value = Vec<OpposingUnit>> {
    prop::collection::vec((0i32..18, 0i32..32, prop::option::of(0usize..OPPONENT_POOL.len())), 0..5)
        .prop_map(|raw| {
            raw.into_iter()
                .map(|(x, y, card)| match card {
                    Some(i) => OpposingUnit::new(OPPONENT_POOL[i], Tile::new(x, y)),
                    None => OpposingUnit::unknown(Tile::new(x, y)),
                })
                .collect()
        })
}

fn tile() -> impl Strategy<Value = Tile> {
    (0i32..18, 0i32..32).prop_map(|(x, y)| Tile::new(x, y))
}

fn analysis_for_deficit(deficit: u8, resource: f32) -> StateAnalysis {
    let should_attack = deficit >= 4;
    let opportunities = if should_attack {
        vec![OpportunityInfo {
            lane: Lane::Left,
            opponent_deficit: deficit,
            defenses_down: false,
            recommended_cards: vec![Card::Giant],
            confidence: (f32::from(deficit) / 6.0).min(0.9),
        }]
    } else {
        Vec::new()
    };
    StateAnalysis {
        threats: Vec::new(),
        opportunities,
        mode: MatchMode::Neutral,
        own_resource: resource,
        opponent_deficit: deficit,
        should_defend: false,
        should_attack,
        recommended_strategy: RecommendedStrategy::WaitAndReact,
    }
}

proptest! {
    /// A placed card never costs more than the resource on hand.
    #[test]
    fn recommendations_stay_affordable(
        hand in Just(giant_deck()).prop_shuffle(),
        resource in 0.0f32..=10.0,
        time in 0.0f32..300.0,
        opposing in units(),
        legal in prop::collection::vec(tile(), 0..6),
    ) {
        let mut engine = DecisionEngine::builder(giant_deck()).build().unwrap();
        let hand: Vec<Card> = hand.into_iter().take(4).collect();
        let snapshot = MatchSnapshot {
            elapsed_time: time,
            own_resource: resource,
            own_playable_indices: (0..hand.len()).collect(),
            own_hand: hand.clone(),
            opposing_units: opposing,
            legal_tiles: legal.clone(),
            ..MatchSnapshot::default()
        };
        let rec = engine.recommend(&snapshot);
        if let Some(card) = rec.card {
            prop_assert!(hand.contains(&card));
            prop_assert!(f32::from(engine.catalog().cost(card)) <= resource);
            let position = rec.position;
            prop_assert!(position.is_some());
            if !legal.is_empty() {
                prop_assert!(position.is_some_and(|p| legal.contains(&p)));
            }
        }
        prop_assert!((0.0..=1.0).contains(&rec.confidence));
        prop_assert!((1..=5).contains(&rec.priority));
    }

    /// A bigger opponent deficit never makes the win condition less attractive.
    #[test]
    fn win_condition_score_grows_with_deficit(
        low in 0u8..8,
        step in 0u8..4,
        resource in 5.0f32..=10.0,
        at in tile(),
    ) {
        let catalog = CardCatalog::default();
        let deck = Deck::new(giant_deck(), &catalog).unwrap();
        let phase = PhaseController::new(PhaseSettings::default());
        let combos = ComboCoordinator::new(ComboConfig::default(), &ComboCatalog::default(), deck.cards());
        let snapshot = MatchSnapshot {
            own_resource: resource,
            own_hand: vec![Card::Giant],
            own_playable_indices: vec![0],
            ..MatchSnapshot::default()
        };
        let elixir = ElixirOptimizer::new(ElixirConfig::default()).analyze(resource, &[Card::Giant], &catalog);
        let expected_counters = BTreeSet::new();
        let scorer = ActionScorer::new(ArenaConfig::default(), ScoringConfig::default());
        let candidate = Candidate { card: Card::Giant, hand_index: 0, tile: at };

        let score_at = |deficit: u8| {
            let analysis = analysis_for_deficit(deficit, resource);
            let ctx = ScoringContext {
                snapshot: &snapshot,
                analysis: &analysis,
                deck: &deck,
                catalog: &catalog,
                phase: &phase,
                combos: &combos,
                elixir: &elixir,
                opponent_style: PlayStyle::Unknown,
                expected_counters: &expected_counters,
            };
            scorer.score(&candidate, &ctx).unwrap()
        };
        prop_assert!(score_at(low + step) + 1e-6 >= score_at(low));
    }
}
