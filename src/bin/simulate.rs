use std::collections::VecDeque;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use elixirbot::{
    Advisor, Card, CardCatalog, DecisionEngine, ELIXIR_CAP, EngineConfig, EngineError,
    MatchSnapshot, OpposingUnit, RandomAdvisor, Tile, describe_recommendation, render_opponent, render_snapshot,
};

const DEFAULT_SEED: u64 = 0xE11C_5EED;
const DEFAULT_DECK: &str = "giant,musketeer,mini_pekka,fireball,zap,knight,archers,cannon";
const HAND_SIZE: usize = 4;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AdvisorKind {
    Engine,
    Random,
}

#[derive(Parser, Debug)]
#[command(
    name = "simulate",
    about = "Feed a synthetic match into an advisor and print its decisions."
)]
struct Args {
    /// RNG seed for the synthetic opponent
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Match length in seconds
    #[arg(short, long, default_value_t = 180.0)]
    duration: f32,

    /// Seconds between decision cycles
    #[arg(long, default_value_t = 0.5)]
    step: f32,

    /// Comma separated list of 8 cards
    #[arg(long, default_value = DEFAULT_DECK)]
    deck: String,

    #[arg(short, long, value_enum, default_value_t = AdvisorKind::Engine)]
    advisor: AdvisorKind,

    /// Optional JSON file overriding engine constants
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the analyzed snapshot before every placement
    #[arg(short, long)]
    visualize: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    if args.step <= 0.0 {
        return Err("step must be positive".into());
    }
    let deck = parse_deck(&args.deck)?;
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let analyzer = build_analyzer(&deck, &config)?;
    let mut sim = Simulation::new(deck.clone(), StdRng::seed_from_u64(args.seed));
    println!(
        "Simulating {:.0}s with the {:?} advisor (seed {}).\n",
        args.duration, args.advisor, args.seed
    );
    match args.advisor {
        AdvisorKind::Engine => {
            let mut engine = DecisionEngine::builder(deck).with_config(config).build()?;
            drive(&mut engine, &mut sim, &analyzer, &args);
            print!("{}", render_opponent(&engine.opponent().summary()));
        }
        AdvisorKind::Random => {
            let mut advisor = RandomAdvisor::new(StdRng::seed_from_u64(args.seed.wrapping_add(1)))
                .with_arena(config.arena.clone());
            drive(&mut advisor, &mut sim, &analyzer, &args);
        }
    }
    Ok(())
}

/// Engine used only to render analyses, under the advisor's configuration.
fn build_analyzer(deck: &[Card], config: &EngineConfig) -> Result<DecisionEngine, EngineError> {
    DecisionEngine::builder(deck.to_vec())
        .with_config(config.clone())
        .build()
}

fn drive<A: Advisor>(advisor: &mut A, sim: &mut Simulation, analyzer: &DecisionEngine, args: &Args) {
    let mut placements = 0usize;
    while sim.time < args.duration {
        let snapshot = sim.snapshot();
        let rec = advisor.advise(&snapshot);
        if let (Some(card), Some(tile)) = (rec.card, rec.position) {
            if args.visualize {
                print!("{}", render_snapshot(&snapshot, &analyzer.analyze(&snapshot)));
            }
            println!("[{:>6.1}s] {}", sim.time, describe_recommendation(&rec));
            if let Some(cleared) = sim.play(card, tile) {
                advisor.record_outcome(cleared > 0, cleared * 150);
                placements += 1;
            }
        }
        sim.advance(args.step);
    }
    println!(
        "\n{placements} placements, {} enemy units reached a goal.",
        sim.leaks
    );
}

fn parse_deck(list: &str) -> Result<Vec<Card>, Box<dyn Error>> {
    let cards = list
        .split(',')
        .map(|name| name.trim().parse::<Card>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cards)
}

/// Toy arena: enemy units walk straight down toward our goals and are
/// removed by any of our placements close enough to them.
struct Simulation {
    rng: StdRng,
    catalog: CardCatalog,
    queue: VecDeque<Card>,
    hand: Vec<Card>,
    elixir: f32,
    time: f32,
    units: Vec<OpposingUnit>,
    opponent_pool: Vec<Card>,
    next_spawn: f32,
    leaks: usize,
}

impl Simulation {
    fn new(deck: Vec<Card>, mut rng: StdRng) -> Self {
        let mut queue: VecDeque<Card> = deck.iter().copied().collect();
        queue.make_contiguous().shuffle(&mut rng);
        let hand = (0..HAND_SIZE).filter_map(|_| queue.pop_front()).collect();
        Self {
            next_spawn: rng.gen_range(3.0..8.0),
            rng,
            catalog: CardCatalog::default(),
            queue,
            hand,
            elixir: 5.0,
            time: 0.0,
            units: Vec::new(),
            opponent_pool: vec![
                Card::HogRider,
                Card::Giant,
                Card::Musketeer,
                Card::Valkyrie,
                Card::Fireball,
                Card::Skeletons,
                Card::IceSpirit,
                Card::Cannon,
            ],
            leaks: 0,
        }
    }

    fn snapshot(&self) -> MatchSnapshot {
        let playable = self
            .hand
            .iter()
            .enumerate()
            .filter(|(_, card)| self.catalog.affordable(**card, self.elixir))
            .map(|(idx, _)| idx)
            .collect();
        MatchSnapshot {
            elapsed_time: self.time,
            own_resource: self.elixir,
            own_hand: self.hand.clone(),
            own_playable_indices: playable,
            opposing_units: self.units.clone(),
            ..MatchSnapshot::default()
        }
    }

    /// Plays `card` at `tile` and returns how many enemy units it cleared.
    fn play(&mut self, card: Card, tile: Tile) -> Option<u32> {
        let idx = self.hand.iter().position(|c| *c == card)?;
        let cost = f32::from(self.catalog.cost(card));
        if cost > self.elixir {
            return None;
        }
        self.elixir -= cost;
        self.hand.remove(idx);
        self.queue.push_back(card);
        if let Some(next) = self.queue.pop_front() {
            self.hand.push(next);
        }
        let before = self.units.len();
        self.units.retain(|unit| unit.tile.distance(tile) > 4.0);
        Some((before - self.units.len()) as u32)
    }

    fn advance(&mut self, dt: f32) {
        let rate = if self.time >= 120.0 { 2.0 } else { 1.0 };
        self.elixir = (self.elixir + rate * dt).min(ELIXIR_CAP);
        self.time += dt;

        for unit in &mut self.units {
            if self.rng.gen_bool(f64::from(dt.min(1.0))) {
                unit.tile.y += 1;
            }
        }
        let before = self.units.len();
        self.units.retain(|unit| unit.tile.y < 14);
        self.leaks += before - self.units.len();

        if self.time >= self.next_spawn {
            if let Some(card) = self.opponent_pool.choose(&mut self.rng).copied() {
                let x = if self.rng.gen_bool(0.5) { 3 } else { 15 };
                let tile = Tile::new(x, self.rng.gen_range(2..8));
                self.units.push(OpposingUnit::new(card, tile));
            }
            self.next_spawn = self.time + self.rng.gen_range(4.0..10.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_sees_the_loaded_config() -> Result<(), Box<dyn Error>> {
        let deck = parse_deck(DEFAULT_DECK)?;
        let mut config = EngineConfig::default();
        config.analysis.far_distance = 20.0;
        let analyzer = build_analyzer(&deck, &config)?;
        assert_eq!(analyzer.config(), &config);

        let snapshot = MatchSnapshot {
            own_resource: 5.0,
            opposing_units: vec![OpposingUnit::new(Card::Knight, Tile::new(9, 2))],
            ..MatchSnapshot::default()
        };
        assert_eq!(analyzer.analyze(&snapshot).threats.len(), 1);
        let default_analyzer = build_analyzer(&deck, &EngineConfig::default())?;
        assert!(default_analyzer.analyze(&snapshot).threats.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_deck_names_are_rejected() {
        let err = parse_deck("giant,dragon").unwrap_err();
        assert_eq!(err.to_string(), "unknown card name: dragon");
    }
}
