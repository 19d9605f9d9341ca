use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownCard;

/// Maximum elixir a player can bank.
pub const ELIXIR_CAP: f32 = 10.0;
/// Number of cards in a loadout.
pub const DECK_SIZE: usize = 8;
/// Cost assumed for identities the catalog does not know.
pub const DEFAULT_CARD_COST: u8 = 4;

/// Identity of a playable card.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Card {
    Archers,
    Arrows,
    BabyDragon,
    Balloon,
    Bandit,
    BarbarianHut,
    Barbarians,
    BattleHealer,
    BattleRam,
    Bats,
    BombTower,
    Bomber,
    Bowler,
    Cannon,
    CannonCart,
    DarkPrince,
    DartGoblin,
    ElectroGiant,
    ElectroSpirit,
    ElectroWizard,
    ElixirCollector,
    Fireball,
    Freeze,
    Furnace,
    Giant,
    GiantSkeleton,
    GoblinBarrel,
    GoblinGang,
    GoblinGiant,
    GoblinHut,
    Goblins,
    Golem,
    Guards,
    HealSpirit,
    HogRider,
    IceGolem,
    IceSpirit,
    IceWizard,
    InfernoDragon,
    InfernoTower,
    Knight,
    LavaHound,
    Lightning,
    LittlePrince,
    MagicArcher,
    MegaKnight,
    MegaMinion,
    Miner,
    MiniPekka,
    MinionHorde,
    Minions,
    Mortar,
    Musketeer,
    NightWitch,
    Pekka,
    Poison,
    Prince,
    Princess,
    Rage,
    RamRider,
    Rocket,
    RoyalGhost,
    RoyalGiant,
    RoyalHogs,
    SkeletonArmy,
    Skeletons,
    Sparky,
    SpearGoblins,
    Tesla,
    TheLog,
    Tombstone,
    Tornado,
    Valkyrie,
    Wizard,
    XBow,
    Zap,
}

/// Strategic role a card can fill. A card may hold several at once.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardRole {
    WinCondition,
    Tank,
    Support,
    Defense,
    Spell,
    Swarm,
    AntiAir,
    Building,
    Cycle,
}

impl CardRole {
    pub const ALL: [CardRole; 9] = [
        CardRole::WinCondition,
        CardRole::Tank,
        CardRole::Support,
        CardRole::Defense,
        CardRole::Spell,
        CardRole::Swarm,
        CardRole::AntiAir,
        CardRole::Building,
        CardRole::Cycle,
    ];
}

impl Card {
    pub const ALL: [Card; 76] = [
        Card::Archers,
        Card::Arrows,
        Card::BabyDragon,
        Card::Balloon,
        Card::Bandit,
        Card::BarbarianHut,
        Card::Barbarians,
        Card::BattleHealer,
        Card::BattleRam,
        Card::Bats,
        Card::BombTower,
        Card::Bomber,
        Card::Bowler,
        Card::Cannon,
        Card::CannonCart,
        Card::DarkPrince,
        Card::DartGoblin,
        Card::ElectroGiant,
        Card::ElectroSpirit,
        Card::ElectroWizard,
        Card::ElixirCollector,
        Card::Fireball,
        Card::Freeze,
        Card::Furnace,
        Card::Giant,
        Card::GiantSkeleton,
        Card::GoblinBarrel,
        Card::GoblinGang,
        Card::GoblinGiant,
        Card::GoblinHut,
        Card::Goblins,
        Card::Golem,
        Card::Guards,
        Card::HealSpirit,
        Card::HogRider,
        Card::IceGolem,
        Card::IceSpirit,
        Card::IceWizard,
        Card::InfernoDragon,
        Card::InfernoTower,
        Card::Knight,
        Card::LavaHound,
        Card::Lightning,
        Card::LittlePrince,
        Card::MagicArcher,
        Card::MegaKnight,
        Card::MegaMinion,
        Card::Miner,
        Card::MiniPekka,
        Card::MinionHorde,
        Card::Minions,
        Card::Mortar,
        Card::Musketeer,
        Card::NightWitch,
        Card::Pekka,
        Card::Poison,
        Card::Prince,
        Card::Princess,
        Card::Rage,
        Card::RamRider,
        Card::Rocket,
        Card::RoyalGhost,
        Card::RoyalGiant,
        Card::RoyalHogs,
        Card::SkeletonArmy,
        Card::Skeletons,
        Card::Sparky,
        Card::SpearGoblins,
        Card::Tesla,
        Card::TheLog,
        Card::Tombstone,
        Card::Tornado,
        Card::Valkyrie,
        Card::Wizard,
        Card::XBow,
        Card::Zap,
    ];

    /// Base elixir cost.
    pub fn base_cost(self) -> u8 {
        use Card::*;
        match self {
            HealSpirit | IceSpirit | ElectroSpirit | Skeletons => 1,
            Bats | Goblins | IceGolem | Rage | SpearGoblins | TheLog | Zap => 2,
            Archers | Arrows | Bandit | Bomber | DartGoblin | GoblinBarrel | GoblinGang
            | Guards | IceWizard | Knight | LittlePrince | MegaMinion | Miner | Minions
            | Princess | RoyalGhost | SkeletonArmy | Tombstone | Tornado | Cannon => 3,
            BabyDragon | BattleHealer | BattleRam | BombTower | DarkPrince | ElectroWizard
            | Fireball | Freeze | Furnace | HogRider | InfernoDragon | MagicArcher | MiniPekka
            | Mortar | Musketeer | NightWitch | Poison | Tesla | Valkyrie => 4,
            Balloon | Barbarians | Bowler | CannonCart | Giant | GoblinHut | InfernoTower
            | MinionHorde | Prince | RamRider | RoyalHogs | Wizard => 5,
            ElixirCollector | GiantSkeleton | GoblinGiant | Lightning | Rocket | RoyalGiant
            | Sparky | XBow => 6,
            BarbarianHut | LavaHound | MegaKnight | Pekka => 7,
            ElectroGiant | Golem => 8,
        }
    }

    /// Strategic roles. Unlisted cards act as plain support.
    pub fn default_roles(self) -> &'static [CardRole] {
        use Card::*;
        use CardRole::*;
        match self {
            Giant | RoyalGiant | Golem | Pekka | MegaKnight | ElectroGiant | LavaHound
            | GoblinGiant => &[WinCondition, Tank],
            HogRider | Balloon | RamRider | RoyalHogs | GoblinBarrel | Miner | BattleRam => {
                &[WinCondition]
            }
            XBow | Mortar => &[WinCondition, Building],
            Prince => &[WinCondition, Support],
            Sparky => &[WinCondition, Support],
            Musketeer | Wizard | BabyDragon | ElectroWizard | Princess | DartGoblin => {
                &[Support, AntiAir]
            }
            Archers => &[Support, AntiAir, Cycle],
            IceWizard => &[Support, Defense],
            MagicArcher | NightWitch | BattleHealer | LittlePrince | Bowler | CannonCart => {
                &[Support]
            }
            Cannon | Tombstone => &[Defense, Building, Cycle],
            Tesla => &[Defense, Building, AntiAir],
            InfernoTower | BombTower | BarbarianHut | GoblinHut | Furnace => &[Defense, Building],
            ElixirCollector => &[Building],
            Fireball | Poison | Lightning | Rocket | Freeze | Rage => &[Spell],
            Arrows | Zap | TheLog => &[Spell, Cycle],
            Tornado => &[Spell, Defense],
            Goblins | Bats | SpearGoblins => &[Swarm, Cycle],
            SkeletonArmy | Barbarians | Guards | GoblinGang => &[Swarm, Defense],
            MinionHorde | Minions => &[Swarm, AntiAir],
            Skeletons | IceSpirit | HealSpirit | ElectroSpirit => &[Cycle],
            IceGolem => &[Tank, Cycle],
            Knight => &[Tank, Cycle],
            Valkyrie | GiantSkeleton => &[Tank, Defense],
            MiniPekka | DarkPrince | Bandit | RoyalGhost => &[Defense, Support],
            InfernoDragon | MegaMinion => &[Defense, AntiAir],
            Bomber => &[Support, Defense],
        }
    }

    /// Detector-facing snake_case name.
    pub fn name(self) -> &'static str {
        use Card::*;
        match self {
            Archers => "archers",
            Arrows => "arrows",
            BabyDragon => "baby_dragon",
            Balloon => "balloon",
            Bandit => "bandit",
            BarbarianHut => "barbarian_hut",
            Barbarians => "barbarians",
            BattleHealer => "battle_healer",
            BattleRam => "battle_ram",
            Bats => "bats",
            BombTower => "bomb_tower",
            Bomber => "bomber",
            Bowler => "bowler",
            Cannon => "cannon",
            CannonCart => "cannon_cart",
            DarkPrince => "dark_prince",
            DartGoblin => "dart_goblin",
            ElectroGiant => "electro_giant",
            ElectroSpirit => "electro_spirit",
            ElectroWizard => "electro_wizard",
            ElixirCollector => "elixir_collector",
            Fireball => "fireball",
            Freeze => "freeze",
            Furnace => "furnace",
            Giant => "giant",
            GiantSkeleton => "giant_skeleton",
            GoblinBarrel => "goblin_barrel",
            GoblinGang => "goblin_gang",
            GoblinGiant => "goblin_giant",
            GoblinHut => "goblin_hut",
            Goblins => "goblins",
            Golem => "golem",
            Guards => "guards",
            HealSpirit => "heal_spirit",
            HogRider => "hog_rider",
            IceGolem => "ice_golem",
            IceSpirit => "ice_spirit",
            IceWizard => "ice_wizard",
            InfernoDragon => "inferno_dragon",
            InfernoTower => "inferno_tower",
            Knight => "knight",
            LavaHound => "lava_hound",
            Lightning => "lightning",
            LittlePrince => "little_prince",
            MagicArcher => "magic_archer",
            MegaKnight => "mega_knight",
            MegaMinion => "mega_minion",
            Miner => "miner",
            MiniPekka => "mini_pekka",
            MinionHorde => "minion_horde",
            Minions => "minions",
            Mortar => "mortar",
            Musketeer => "musketeer",
            NightWitch => "night_witch",
            Pekka => "pekka",
            Poison => "poison",
            Prince => "prince",
            Princess => "princess",
            Rage => "rage",
            RamRider => "ram_rider",
            Rocket => "rocket",
            RoyalGhost => "royal_ghost",
            RoyalGiant => "royal_giant",
            RoyalHogs => "royal_hogs",
            SkeletonArmy => "skeleton_army",
            Skeletons => "skeletons",
            Sparky => "sparky",
            SpearGoblins => "spear_goblins",
            Tesla => "tesla",
            TheLog => "the_log",
            Tombstone => "tombstone",
            Tornado => "tornado",
            Valkyrie => "valkyrie",
            Wizard => "wizard",
            XBow => "x_bow",
            Zap => "zap",
        }
    }

    /// Looks up a card by detector name. Accepts spaces, dashes and any casing.
    pub fn from_name(name: &str) -> Option<Card> {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        let normalized = match normalized.as_str() {
            "minipekka" => "mini_pekka",
            "xbow" => "x_bow",
            "log" => "the_log",
            other => other,
        };
        Card::ALL.iter().copied().find(|card| card.name() == normalized)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Card {
    type Err = UnknownCard;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Card::from_name(s).ok_or_else(|| UnknownCard(s.to_string()))
    }
}

/// Immutable card lookup tables shared by every component of one engine.
///
/// Built once with [`CardCatalog::default`] and optionally patched with
/// overrides before the engine is constructed. Nothing mutates it afterwards.
#[derive(Clone, Debug)]
pub struct CardCatalog {
    cost_overrides: HashMap<Card, u8>,
    role_overrides: HashMap<Card, Vec<CardRole>>,
    high_priority: HashSet<Card>,
    unknown_cost: u8,
}

impl Default for CardCatalog {
    fn default() -> Self {
        Self {
            cost_overrides: HashMap::new(),
            role_overrides: HashMap::new(),
            high_priority: DEFAULT_HIGH_PRIORITY.iter().copied().collect(),
            unknown_cost: DEFAULT_CARD_COST,
        }
    }
}

/// Tanks and fast win conditions that escalate threat bands by one level.
pub const DEFAULT_HIGH_PRIORITY: [Card; 9] = [
    Card::Giant,
    Card::Golem,
    Card::HogRider,
    Card::RoyalGiant,
    Card::Pekka,
    Card::ElectroGiant,
    Card::GoblinGiant,
    Card::RamRider,
    Card::Balloon,
];

impl CardCatalog {
    pub fn with_cost(mut self, card: Card, cost: u8) -> Self {
        self.cost_overrides.insert(card, cost);
        self
    }

    pub fn with_roles(mut self, card: Card, roles: Vec<CardRole>) -> Self {
        self.role_overrides.insert(card, roles);
        self
    }

    pub fn with_high_priority(mut self, cards: impl IntoIterator<Item = Card>) -> Self {
        self.high_priority = cards.into_iter().collect();
        self
    }

    pub fn cost(&self, card: Card) -> u8 {
        self.cost_overrides
            .get(&card)
            .copied()
            .unwrap_or_else(|| card.base_cost())
    }

    /// Cost for a possibly unidentified unit.
    pub fn cost_or_default(&self, card: Option<Card>) -> u8 {
        card.map(|c| self.cost(c)).unwrap_or(self.unknown_cost)
    }

    pub fn roles(&self, card: Card) -> &[CardRole] {
        match self.role_overrides.get(&card) {
            Some(roles) => roles.as_slice(),
            None => card.default_roles(),
        }
    }

    pub fn has_role(&self, card: Card, role: CardRole) -> bool {
        self.roles(card).contains(&role)
    }

    pub fn is_high_priority(&self, card: Card) -> bool {
        self.high_priority.contains(&card)
    }

    pub fn cards_with_role(&self, role: CardRole) -> Vec<Card> {
        Card::ALL
            .iter()
            .copied()
            .filter(|card| self.has_role(*card, role))
            .collect()
    }

    /// Whether the card can be paid for with the given (fractional) elixir.
    #[inline]
    pub fn affordable(&self, card: Card, elixir: f32) -> bool {
        f32::from(self.cost(card)) <= elixir + f32::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_lookup() {
        for card in Card::ALL {
            assert_eq!(Card::from_name(card.name()), Some(card));
        }
        assert_eq!(Card::from_name("Hog Rider"), Some(Card::HogRider));
        assert_eq!(Card::from_name("MiniPekka"), Some(Card::MiniPekka));
        assert_eq!(Card::from_name("dragon"), None);
    }

    #[test]
    fn parsing_an_unknown_name_reports_it() {
        assert_eq!("hog rider".parse::<Card>(), Ok(Card::HogRider));
        let err = "dragon".parse::<Card>().unwrap_err();
        assert_eq!(err, UnknownCard("dragon".to_string()));
        assert_eq!(err.to_string(), "unknown card name: dragon");
    }

    #[test]
    fn every_card_has_roles_and_sane_cost() {
        let catalog = CardCatalog::default();
        for card in Card::ALL {
            assert!(!catalog.roles(card).is_empty(), "{card} has no roles");
            assert!((1..=9).contains(&catalog.cost(card)), "{card} cost out of range");
        }
    }

    #[test]
    fn overrides_take_precedence() {
        let catalog = CardCatalog::default()
            .with_cost(Card::ElectroGiant, 7)
            .with_roles(Card::Knight, vec![CardRole::Defense]);
        assert_eq!(catalog.cost(Card::ElectroGiant), 7);
        assert!(catalog.has_role(Card::Knight, CardRole::Defense));
        assert!(!catalog.has_role(Card::Knight, CardRole::Tank));
        assert_eq!(catalog.cost_or_default(None), DEFAULT_CARD_COST);
    }
}
