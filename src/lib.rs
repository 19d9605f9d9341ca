//! Strategic decision engine for a real-time elixir card game agent.

pub mod action;
pub mod advisor;
pub mod analysis;
pub mod card;
pub mod combo;
pub mod config;
pub mod deck;
pub mod defense;
pub mod elixir;
pub mod engine;
pub mod error;
pub mod opponent;
pub mod phase;
pub mod schedule;
pub mod scoring;
pub mod state;
pub mod visualize;

pub use crate::action::{ActionKind, ActionRecommendation, Candidate, Category};
pub use crate::advisor::{Advisor, RandomAdvisor};
pub use crate::analysis::{MatchAnalyzer, MatchMode, StateAnalysis, ThreatInfo, ThreatLevel};
pub use crate::card::{Card, CardCatalog, CardRole, ELIXIR_CAP};
pub use crate::combo::{ComboCatalog, ComboCoordinator, ComboDefinition};
pub use crate::config::EngineConfig;
pub use crate::deck::{Deck, Strategy};
pub use crate::defense::{CounterTable, DefensePlanner, DefenseResponse};
pub use crate::elixir::{ElixirAnalysis, ElixirOptimizer};
pub use crate::engine::{DecisionEngine, EngineBuilder};
pub use crate::error::{DeckError, EngineError, ScoringError, UnknownCard};
pub use crate::opponent::{OpponentMemory, OpponentSummary};
pub use crate::phase::{MatchPhase, PhaseController};
pub use crate::schedule::Scheduler;
pub use crate::state::{GoalHealth, MatchSnapshot, OpposingUnit, Tile};
pub use crate::visualize::{
    DescribeOptions, VisualOptions, describe_recommendation, render_opponent, render_snapshot,
};
