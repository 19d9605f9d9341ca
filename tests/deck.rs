use elixirbot::card::CardRole;
use elixirbot::{Card, CardCatalog, Deck, DeckError, Strategy};

fn deck(cards: [Card; 8]) -> Result<Deck, DeckError> {
    Deck::new(cards.to_vec(), &CardCatalog::default())
}

#[test]
fn classifies_common_archetypes() -> Result<(), DeckError> {
    use Card::*;
    let cases = [
        (
            [HogRider, Giant, Musketeer, Fireball, Zap, Knight, Archers, Cannon],
            Strategy::DualWinCondition,
        ),
        (
            [Golem, Knight, NightWitch, BabyDragon, Lightning, Zap, Tornado, MegaMinion],
            Strategy::HeavyTank,
        ),
        (
            [HogRider, IceSpirit, Skeletons, TheLog, Cannon, Musketeer, Fireball, IceGolem],
            Strategy::Cycle,
        ),
        (
            [GoblinBarrel, Princess, GoblinGang, Knight, InfernoTower, Rocket, TheLog, Zap],
            Strategy::SpellBait,
        ),
        (
            [Miner, Tesla, InfernoTower, Valkyrie, Bomber, Musketeer, Poison, Guards],
            Strategy::Defensive,
        ),
        (
            [Giant, Musketeer, MiniPekka, Fireball, Zap, Archers, Cannon, Wizard],
            Strategy::Balanced,
        ),
    ];
    for (cards, expected) in cases {
        assert_eq!(deck(cards)?.strategy(), expected, "{cards:?}");
    }
    Ok(())
}

#[test]
fn dual_win_condition_prefers_the_tank() -> Result<(), DeckError> {
    use Card::*;
    let d = deck([HogRider, Giant, Musketeer, Fireball, Zap, Knight, Archers, Cannon])?;
    assert_eq!(d.primary_win_condition(), Some(Giant));
    assert_eq!(d.role_count(CardRole::WinCondition), 2);
    Ok(())
}

#[test]
fn deck_without_win_condition_has_no_primary() -> Result<(), DeckError> {
    use Card::*;
    let d = deck([Knight, Musketeer, Valkyrie, Fireball, Zap, Archers, Cannon, Wizard])?;
    assert!(!d.has_win_condition());
    assert_eq!(d.primary_win_condition(), None);
    Ok(())
}

#[test]
fn average_cost_and_support() -> Result<(), DeckError> {
    use Card::*;
    let d = deck([Giant, Musketeer, MiniPekka, Fireball, Zap, Archers, Cannon, Wizard])?;
    assert!((d.average_cost(&CardCatalog::default()) - 3.75).abs() < 1e-5);
    assert!(d.support_cards().contains(&Musketeer));
    assert!(d.support_cards().contains(&MiniPekka));
    assert!(!d.support_cards().contains(&Giant));
    Ok(())
}

#[test]
fn aggression_thresholds_follow_strategy() -> Result<(), DeckError> {
    use Card::*;
    let cycle = deck([HogRider, IceSpirit, Skeletons, TheLog, Cannon, Musketeer, Fireball, IceGolem])?;
    assert!(cycle.should_play_aggressive(6.0, 8.0));
    assert!(!cycle.should_play_aggressive(5.5, 8.0));
    assert!(!cycle.should_play_aggressive(6.0, 7.0));

    let heavy = deck([Golem, Knight, NightWitch, BabyDragon, Lightning, Zap, Tornado, MegaMinion])?;
    assert!(!heavy.should_play_aggressive(9.0, 9.0));
    assert!(heavy.should_play_aggressive(8.0, 10.0));
    Ok(())
}

#[test]
fn defensive_priority_by_strategy() -> Result<(), DeckError> {
    use Card::*;
    let cycle = deck([HogRider, IceSpirit, Skeletons, TheLog, Cannon, Musketeer, Fireball, IceGolem])?;
    assert_eq!(
        cycle.defensive_priority(),
        [CardRole::Cycle, CardRole::Defense, CardRole::Swarm]
    );
    let heavy = deck([Golem, Knight, NightWitch, BabyDragon, Lightning, Zap, Tornado, MegaMinion])?;
    assert_eq!(
        heavy.defensive_priority(),
        [CardRole::Defense, CardRole::Building, CardRole::Swarm]
    );
    Ok(())
}
