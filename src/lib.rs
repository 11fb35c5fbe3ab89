//! Automated settler placement and terrain-improvement planning for
//! turn-based strategy AIs.
//!
//! The crate decides, for each settler-class unit of an AI player, where
//! to found the next settlement or which terrain improvement to work on,
//! and drives the unit there. The host game is consumed through the
//! collaborator traits in [`world`]; an offline [`grid::GridWorld`]
//! implements the same seams for native testing and benchmarking.
//!
//! A typical integration keeps one [`SettlerAdvisor`] per AI player plus a
//! shared [`TileReservationLedger`], and calls
//! [`SettlerAdvisor::run_turn`] once per game turn.

mod agent;
mod cache;
pub mod constants;
mod context;
mod frontier;
pub mod grid;
mod improve;
mod ledger;
mod planner;
mod score;
mod tile;
mod world;

pub use agent::{FounderWant, PassReport, SettlerAdvisor, SettlerTask};
pub use cache::{TileValueCache, TileValueEntry};
pub use context::{EnRouteClaim, PlanningContext};
pub use frontier::FrontierSearch;
pub use improve::{ImprovementEvaluator, ImprovementTarget};
pub use ledger::TileReservationLedger;
pub use planner::{PlacementPlan, PlacementPlanner};
pub use score::{amortize, weight_outputs, BestTile, PlacementCandidate};
pub use tile::Tile;
pub use world::{
    radius_tiles, Activity, BoatSpec, CityId, CityProbe, ContinentId, ExtraId, FrontierStep,
    GameAdapter, GovernmentId, Handicaps, MoveOutcome, MovementMode, OutputKind, PathProvider,
    PlayerId, UnitCommands, UnitId, UnitSpec, WorkOption, WorkerRequest, WorldModel,
};
