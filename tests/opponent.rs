use elixirbot::OpponentMemory;
use elixirbot::config::OpponentConfig;
use elixirbot::opponent::{PlayContext, PlayStyle};
use elixirbot::{Card, Tile};

const OPENING: [Card; 6] = [
    Card::Giant,
    Card::Musketeer,
    Card::Zap,
    Card::Knight,
    Card::Archers,
    Card::Fireball,
];

fn record(memory: &mut OpponentMemory, cards: &[Card], start: f32, context: impl Fn(usize) -> PlayContext) {
    for (i, card) in cards.iter().enumerate() {
        memory.record_play(
            Some(*card),
            Tile::new(9, 4),
            Some(card.base_cost()),
            start + i as f32 * 2.0,
            context(i),
        );
    }
}

#[test]
fn next_plays_skip_recent_cards() {
    let mut memory = OpponentMemory::new(OpponentConfig::default());
    record(&mut memory, &OPENING, 1.0, |_| PlayContext::Attack);

    let predictions = memory.predict_next_plays(30.0, 4.5, Card::base_cost);
    let cards: Vec<Card> = predictions.iter().map(|p| p.card).collect();
    assert_eq!(cards, vec![Card::Musketeer, Card::Giant]);

    // Usage share 1/6, long unseen, and affordable at 4.5 elixir.
    let expected = 0.3 + 0.4 / 6.0 + 0.3 + 0.2;
    assert!((predictions[0].confidence - expected).abs() < 1e-5);
    assert!((predictions[1].confidence - (expected - 0.2)).abs() < 1e-5);
    assert_eq!(predictions[0].cycle_position, None);
    assert_eq!(predictions[0].expected_next_play, 60.0);
}

#[test]
fn replay_interval_predicts_next_appearance() {
    let mut memory = OpponentMemory::new(OpponentConfig::default());
    for time in [2.0, 12.0, 22.0] {
        memory.record_play(Some(Card::HogRider), Tile::new(3, 6), None, time, PlayContext::Attack);
    }
    assert_eq!(memory.expected_next_play(Card::HogRider, 25.0), 32.0);
    assert_eq!(memory.frequency(Card::HogRider), 3);
    assert_eq!(memory.last_seen(Card::HogRider), Some(22.0));
}

#[test]
fn behavior_tracks_pressure_and_tempo() {
    let mut memory = OpponentMemory::new(OpponentConfig::default());
    record(&mut memory, &OPENING, 1.0, |i| {
        if i < 3 { PlayContext::Attack } else { PlayContext::Defense }
    });
    let behavior = memory.behavior();
    assert!((behavior.aggressiveness - 0.5).abs() < 1e-5);
    assert!((behavior.patience - 0.2).abs() < 1e-5);
    assert_eq!(behavior.adaptation, 0.0);
    assert_eq!(memory.play_style(), PlayStyle::Unknown);
}

#[test]
fn switching_decks_reads_as_adaptation() {
    let mut memory = OpponentMemory::new(OpponentConfig::default());
    record(
        &mut memory,
        &[Card::Giant, Card::Musketeer, Card::Zap, Card::Knight, Card::Archers],
        0.0,
        |_| PlayContext::Attack,
    );
    record(
        &mut memory,
        &[Card::HogRider, Card::IceSpirit, Card::Cannon, Card::Fireball, Card::Skeletons],
        10.0,
        |_| PlayContext::Attack,
    );
    assert!((memory.behavior().adaptation - 1.0).abs() < 1e-5);
}

#[test]
fn summary_counts_unknown_plays() {
    let mut memory = OpponentMemory::new(OpponentConfig::default());
    record(&mut memory, &OPENING[..2], 1.0, |_| PlayContext::Attack);
    memory.record_play(None, Tile::new(14, 3), None, 8.0, PlayContext::Defense);

    let summary = memory.summary();
    assert_eq!(summary.total_plays, 3);
    assert_eq!(summary.cards_seen.len(), 2);
    assert!((summary.average_cost - (5.0 + 4.0 + 4.0) / 3.0).abs() < 1e-5);
    assert_eq!(summary.archetype, memory.archetype());
    assert_eq!(summary.patterns, 0);
    assert_eq!(memory.cards_not_seen().count(), Card::ALL.len() - 2);

    memory.reset();
    assert_eq!(memory.summary().total_plays, 0);
}
