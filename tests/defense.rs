use elixirbot::analysis::{ThreatInfo, ThreatLevel};
use elixirbot::config::{ArenaConfig, DefenseConfig};
use elixirbot::defense::{DefenseCategory, ThreatClass};
use elixirbot::{Card, CardCatalog, CounterTable, DefensePlanner, Tile};

fn planner() -> DefensePlanner {
    DefensePlanner::new(
        DefenseConfig::default(),
        ArenaConfig::default(),
        CounterTable::default(),
    )
}

fn threat(card: Option<Card>, position: Tile, level: ThreatLevel, distance: f32) -> ThreatInfo {
    ThreatInfo {
        card,
        position,
        level,
        distance_to_goal: distance,
        targeting_goal: true,
        requires_immediate_response: level >= ThreatLevel::High,
    }
}

#[test]
fn hog_at_the_goal_gets_building_and_backup() {
    let catalog = CardCatalog::default();
    let threats = [threat(Some(Card::HogRider), Tile::new(3, 9), ThreatLevel::Critical, 2.0)];
    let hand = [Card::Cannon, Card::Tesla, Card::Knight, Card::Musketeer];

    let plan = planner()
        .plan(&threats, &hand, 7.0, &catalog)
        .expect("a building answers a hog");
    assert_eq!(plan.threat_class, ThreatClass::FastWinCondition);
    assert_eq!(plan.category, DefenseCategory::BuildingDefense);
    assert_eq!(plan.primary, Card::Cannon);
    assert_eq!(plan.secondary, Some(Card::Tesla));
    assert_eq!(plan.total_cost, 7);
    assert_eq!(plan.urgency, 10.0);
    assert!(plan.requires_immediate_response);
    assert_eq!(plan.position_of(Card::Cannon), Some(Tile::new(6, 9)));
    assert_eq!(plan.position_of(Card::Tesla), Some(Tile::new(8, 10)));
    assert_eq!(plan.timing, vec![(Card::Cannon, 0.0), (Card::Tesla, 1.0)]);
    assert!((plan.expected_effectiveness - 0.9).abs() < 1e-5);
}

#[test]
fn secondary_needs_room_for_both_cards() {
    let catalog = CardCatalog::default();
    let threats = [threat(Some(Card::HogRider), Tile::new(3, 9), ThreatLevel::Critical, 2.0)];
    let hand = [Card::Cannon, Card::Tesla];
    let plan = planner()
        .plan(&threats, &hand, 6.0, &catalog)
        .expect("cannon alone is affordable");
    assert_eq!(plan.primary, Card::Cannon);
    assert_eq!(plan.secondary, None);
    assert_eq!(plan.total_cost, 3);
}

#[test]
fn placement_mirrors_the_threatened_lane() {
    let catalog = CardCatalog::default();
    let threats = [threat(Some(Card::HogRider), Tile::new(15, 9), ThreatLevel::High, 5.0)];
    let hand = [Card::Cannon, Card::Tesla];
    let plan = planner()
        .plan(&threats, &hand, 10.0, &catalog)
        .expect("plan");
    assert_eq!(plan.position_of(Card::Cannon), Some(Tile::new(12, 9)));
    assert_eq!(plan.position_of(Card::Tesla), Some(Tile::new(10, 10)));
}

#[test]
fn several_small_threats_allow_spells() {
    let catalog = CardCatalog::default();
    let small: Vec<ThreatInfo> = [(6, 8), (7, 8), (8, 8)]
        .into_iter()
        .map(|(x, y)| threat(None, Tile::new(x, y), ThreatLevel::Low, 7.0))
        .collect();
    let hand = [Card::Zap, Card::Cannon];

    let p = planner();
    assert!(p.should_use_spell_defense(&small));
    let plan = p.plan(&small, &hand, 10.0, &catalog).expect("plan");
    assert_eq!(plan.primary, Card::Zap);

    let single = &small[..1];
    assert!(!p.should_use_spell_defense(single));
    let plan = p.plan(single, &hand, 10.0, &catalog).expect("plan");
    assert_eq!(plan.primary, Card::Cannon, "falls back to a defensive role");
}

#[test]
fn swarm_alone_allows_spells() {
    let threats = [threat(Some(Card::SkeletonArmy), Tile::new(4, 9), ThreatLevel::High, 5.0)];
    assert!(planner().should_use_spell_defense(&threats));
}

#[test]
fn no_plan_without_a_defensive_card() {
    let catalog = CardCatalog::default();
    let threats = [threat(Some(Card::Giant), Tile::new(4, 9), ThreatLevel::High, 5.0)];
    assert!(planner()
        .plan(&threats, &[Card::Fireball, Card::Zap], 10.0, &catalog)
        .is_none());
    assert!(planner().plan(&[], &[Card::Cannon], 10.0, &catalog).is_none());
}

#[test]
fn counter_attack_picks_cheapest_win_condition() {
    let catalog = CardCatalog::default();
    let deck = [
        Card::Giant,
        Card::HogRider,
        Card::Musketeer,
        Card::Cannon,
        Card::Fireball,
        Card::Zap,
        Card::Knight,
        Card::Archers,
    ];
    let p = planner();
    assert_eq!(
        p.counter_attack_opportunity(true, 5.0, &deck, &catalog),
        Some(Card::HogRider)
    );
    assert_eq!(p.counter_attack_opportunity(true, 3.0, &deck, &catalog), None);
    assert_eq!(p.counter_attack_opportunity(false, 9.0, &deck, &catalog), None);
}

#[test]
fn failures_lower_the_seeded_prior() {
    let mut p = planner();
    assert_eq!(p.effectiveness(Card::HogRider, Card::Cannon), Some(0.9));
    let updated = p.record_outcome(Card::HogRider, Card::Cannon, false);
    assert!((updated - 0.72).abs() < 1e-5);
    assert!(p.learned_pairs().contains(&(Card::HogRider, Card::Cannon)));
}

#[test]
fn costly_pairs_sum_without_wrapping() {
    let catalog = CardCatalog::default()
        .with_cost(Card::Cannon, 200)
        .with_cost(Card::Tesla, 150);
    let threats = [threat(Some(Card::HogRider), Tile::new(3, 9), ThreatLevel::Critical, 2.0)];
    let plan = planner()
        .plan(&threats, &[Card::Cannon, Card::Tesla], 400.0, &catalog)
        .expect("both buildings fit the bar");
    assert!(plan.secondary.is_some());
    assert_eq!(plan.total_cost, 350);

    let tight = planner()
        .plan(&threats, &[Card::Cannon, Card::Tesla], 300.0, &catalog)
        .expect("one building fits the bar");
    assert_eq!(tight.secondary, None);
}

#[test]
fn placement_and_urgency_follow_config() {
    let catalog = CardCatalog::default();
    let config = DefenseConfig {
        building_left: Tile::new(5, 12),
        immediate_urgency: 11.0,
        ..DefenseConfig::default()
    };
    let p = DefensePlanner::new(config, ArenaConfig::default(), CounterTable::default());
    let threats = [threat(Some(Card::HogRider), Tile::new(3, 9), ThreatLevel::Critical, 2.0)];
    let plan = p.plan(&threats, &[Card::Cannon], 7.0, &catalog).expect("plan");
    assert_eq!(plan.position_of(Card::Cannon), Some(Tile::new(5, 12)));
    assert!(!plan.requires_immediate_response);
}
