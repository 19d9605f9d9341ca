use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardCatalog, CardRole, DECK_SIZE};
use crate::error::DeckError;

/// Overall game plan derived from the role makeup of a loadout.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    DualWinCondition,
    HeavyTank,
    Cycle,
    SpellBait,
    Defensive,
    Balanced,
}

/// Preferred order when a deck carries several win conditions.
const PRIMARY_PREFERENCE: [Card; 4] = [Card::Golem, Card::ElectroGiant, Card::Giant, Card::RoyalGiant];

/// A validated loadout of eight distinct cards and its one-time classification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
    role_counts: BTreeMap<CardRole, usize>,
    strategy: Strategy,
    primary_win_condition: Option<Card>,
    support_cards: Vec<Card>,
}

impl Deck {
    pub fn new(cards: Vec<Card>, catalog: &CardCatalog) -> Result<Self, DeckError> {
        if cards.len() != DECK_SIZE {
            return Err(DeckError::WrongSize {
                expected: DECK_SIZE,
                actual: cards.len(),
            });
        }
        let mut seen = HashSet::with_capacity(DECK_SIZE);
        for card in &cards {
            if !seen.insert(*card) {
                return Err(DeckError::DuplicateCard(*card));
            }
        }

        let mut role_counts = BTreeMap::new();
        for card in &cards {
            for role in catalog.roles(*card) {
                *role_counts.entry(*role).or_insert(0) += 1;
            }
        }
        let count = |role| role_counts.get(&role).copied().unwrap_or(0);

        let strategy = if count(CardRole::WinCondition) >= 2 {
            Strategy::DualWinCondition
        } else if count(CardRole::Tank) >= 2 {
            Strategy::HeavyTank
        } else if count(CardRole::Cycle) >= 4 {
            Strategy::Cycle
        } else if count(CardRole::Spell) >= 3 {
            Strategy::SpellBait
        } else if count(CardRole::Defense) >= 4 {
            Strategy::Defensive
        } else {
            Strategy::Balanced
        };

        let win_conditions: Vec<Card> = cards
            .iter()
            .copied()
            .filter(|card| catalog.has_role(*card, CardRole::WinCondition))
            .collect();
        let primary_win_condition = PRIMARY_PREFERENCE
            .iter()
            .copied()
            .find(|card| win_conditions.contains(card))
            .or_else(|| win_conditions.first().copied());

        let support_cards = cards
            .iter()
            .copied()
            .filter(|card| catalog.has_role(*card, CardRole::Support))
            .collect();

        Ok(Self {
            cards,
            role_counts,
            strategy,
            primary_win_condition,
            support_cards,
        })
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn primary_win_condition(&self) -> Option<Card> {
        self.primary_win_condition
    }

    pub fn support_cards(&self) -> &[Card] {
        &self.support_cards
    }

    pub fn role_count(&self, role: CardRole) -> usize {
        self.role_counts.get(&role).copied().unwrap_or(0)
    }

    pub fn has_win_condition(&self) -> bool {
        self.primary_win_condition.is_some()
    }

    /// Average elixir cost of the loadout.
    pub fn average_cost(&self, catalog: &CardCatalog) -> f32 {
        let total: u32 = self.cards.iter().map(|c| u32::from(catalog.cost(*c))).sum();
        total as f32 / self.cards.len() as f32
    }

    /// Whether the current economy justifies committing to a push.
    ///
    /// `enemy_spent` is the elixir the opponent has recently committed; a
    /// heavy commitment on their side opens a window for us.
    pub fn should_play_aggressive(&self, elixir: f32, enemy_spent: f32) -> bool {
        let (min_elixir, min_spent) = match self.strategy {
            Strategy::Cycle => (6.0, 8.0),
            Strategy::HeavyTank => (8.0, 10.0),
            // Defensive decks only push from a full bar.
            Strategy::Defensive => (10.0, 12.0),
            _ => (7.0, 8.0),
        };
        elixir >= min_elixir && enemy_spent >= min_spent
    }

    /// Roles to reach for first when defending.
    pub fn defensive_priority(&self) -> [CardRole; 3] {
        match self.strategy {
            Strategy::Cycle => [CardRole::Cycle, CardRole::Defense, CardRole::Swarm],
            Strategy::HeavyTank => [CardRole::Defense, CardRole::Building, CardRole::Swarm],
            _ => [CardRole::Defense, CardRole::Swarm, CardRole::Support],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CardCatalog {
        CardCatalog::default()
    }

    #[test]
    fn rejects_wrong_size() {
        let err = Deck::new(vec![Card::Giant, Card::Knight], &catalog()).unwrap_err();
        assert_eq!(
            err,
            DeckError::WrongSize {
                expected: 8,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_duplicates() {
        let cards = vec![
            Card::Giant,
            Card::Giant,
            Card::Knight,
            Card::Archers,
            Card::Zap,
            Card::Fireball,
            Card::Musketeer,
            Card::Cannon,
        ];
        let err = Deck::new(cards, &catalog()).unwrap_err();
        assert_eq!(err, DeckError::DuplicateCard(Card::Giant));
    }

    #[test]
    fn golem_preferred_as_primary() {
        let cards = vec![
            Card::HogRider,
            Card::Golem,
            Card::NightWitch,
            Card::BabyDragon,
            Card::Zap,
            Card::Lightning,
            Card::MegaMinion,
            Card::Tornado,
        ];
        let deck = Deck::new(cards, &catalog()).unwrap();
        assert_eq!(deck.primary_win_condition(), Some(Card::Golem));
        assert_eq!(deck.strategy(), Strategy::DualWinCondition);
    }
}
