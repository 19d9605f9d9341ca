use elixirbot::analysis::{MatchMode, RecommendedStrategy, StateAnalysis, ThreatInfo, ThreatLevel};
use elixirbot::combo::{ComboCatalog, ComboCoordinator, PositionRule};
use elixirbot::config::ComboConfig;
use elixirbot::{Card, Tile};

fn hog_deck() -> Vec<Card> {
    vec![
        Card::HogRider,
        Card::IceSpirit,
        Card::Musketeer,
        Card::Cannon,
        Card::Fireball,
        Card::TheLog,
        Card::Skeletons,
        Card::IceGolem,
    ]
}

fn analysis(resource: f32, deficit: u8) -> StateAnalysis {
    StateAnalysis {
        threats: Vec::new(),
        opportunities: Vec::new(),
        mode: MatchMode::Neutral,
        own_resource: resource,
        opponent_deficit: deficit,
        should_defend: false,
        should_attack: false,
        recommended_strategy: RecommendedStrategy::WaitAndReact,
    }
}

fn coordinator() -> ComboCoordinator {
    ComboCoordinator::new(ComboConfig::default(), &ComboCatalog::default(), &hog_deck())
}

#[test]
fn only_combos_in_the_deck_are_available() {
    let combos = coordinator();
    let names: Vec<&str> = combos.available().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Hog Ice Spirit"]);
}

#[test]
fn scoring_needs_primary_support_and_elixir() {
    let combos = coordinator();
    let def = combos.available()[0].clone();
    let hand = [Card::HogRider, Card::IceSpirit, Card::Cannon, Card::TheLog];

    assert_eq!(combos.score(&def, &analysis(7.0, 3), &[Card::HogRider, Card::Cannon]), 0.0);
    assert_eq!(combos.score(&def, &analysis(5.0, 3), &hand), 0.0);

    // 0.3 + 0.2 for the window, +0.4 quick cycle, +0.2 condition met.
    let score = combos.score(&def, &analysis(7.0, 3), &hand);
    assert!((score - 1.0).abs() < 1e-5, "score was {score}");

    // Deficit 1: no quick-cycle bonus, condition unmet.
    let score = combos.score(&def, &analysis(8.0, 1), &hand);
    assert!((score - 0.6).abs() < 1e-5, "score was {score}");
}

#[test]
fn no_combo_starts_under_a_high_threat() {
    let combos = coordinator();
    let hand = [Card::HogRider, Card::IceSpirit];
    let mut threatened = analysis(8.0, 3);
    threatened.threats.push(ThreatInfo {
        card: Some(Card::Giant),
        position: Tile::new(4, 9),
        level: ThreatLevel::High,
        distance_to_goal: 5.0,
        targeting_goal: true,
        requires_immediate_response: true,
    });
    assert!(combos.evaluate(&threatened, &hand).is_none());
    assert!(combos.evaluate(&analysis(8.0, 3), &hand).is_some());
}

#[test]
fn steps_are_released_at_their_deadline() {
    let mut combos = coordinator();
    let hand = [Card::HogRider, Card::IceSpirit];
    let (def, _) = combos.evaluate(&analysis(7.0, 3), &hand).expect("combo viable");
    let id = combos.start(def, 10.0);

    let first = combos.get_next_combo_action(10.0).expect("primary due at once");
    assert_eq!(first.card, Card::HogRider);
    assert_eq!(first.rule, PositionRule::Bridge);
    assert_eq!(first.tile, Tile::new(9, 7));
    assert!(!first.is_last);

    assert!(combos.committed_cards().contains(&Card::IceSpirit));
    assert!(!combos.committed_cards().contains(&Card::HogRider));
    assert!(combos.get_next_combo_action(10.2).is_none());
    assert_eq!(combos.active()[0].expected_next, Some(Card::IceSpirit));
    assert_eq!(combos.priority_boost(Card::IceSpirit), 2.0);

    let second = combos.get_next_combo_action(10.5).expect("support due after delay");
    assert_eq!(second.card, Card::IceSpirit);
    assert_eq!(second.combo_id, id);
    assert!(second.is_last);
    assert!(combos.active()[0].complete);
    assert!(!combos.has_active_combo());
    assert_eq!(combos.history().collect::<Vec<_>>(), vec!["Hog Ice Spirit"]);

    combos.cleanup_completed();
    assert!(combos.active().is_empty());
    assert_eq!(combos.priority_boost(Card::IceSpirit), 1.0);
}

#[test]
fn repeated_combos_are_penalized() {
    let mut combos = coordinator();
    let hand = [Card::HogRider, Card::IceSpirit];
    let def = combos.available()[0].clone();
    let fresh = combos.score(&def, &analysis(8.0, 1), &hand);
    let id = combos.start(def.clone(), 0.0);
    combos.mark_played(id, Card::HogRider, 0.0);
    combos.mark_played(id, Card::IceSpirit, 1.0);
    let repeat = combos.score(&def, &analysis(8.0, 1), &hand);
    assert!((repeat - fresh * 0.7).abs() < 1e-5);
}

#[test]
fn stale_combos_are_abandoned() {
    let mut combos = coordinator();
    let def = combos.available()[0].clone();
    let id = combos.start(def, 0.0);
    combos.mark_played(id, Card::HogRider, 0.0);
    assert!(combos.abandon_stale(5.0).is_empty());
    assert_eq!(combos.abandon_stale(20.0), vec!["Hog Ice Spirit".to_string()]);
    assert!(combos.active().is_empty());
}

#[test]
fn quick_cycle_window_counts_elixir_cap() {
    let combos = coordinator();
    let def = combos.available()[0].clone();
    let hand = [Card::HogRider, Card::IceSpirit];
    // Deficit 2 earns the quick-cycle bonus, the 8-elixir cap adds 0.1.
    let score = combos.score(&def, &analysis(8.0, 2), &hand);
    assert!((score - 1.0).abs() < 1e-5);
}
