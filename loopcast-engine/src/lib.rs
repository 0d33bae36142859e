//! Loopcast Forecasting Engine
//!
//! Platform-agnostic cost forecasting for idle-game action plans. Given an
//! ordered list of (action, repeat-count) entries, a declarative rule
//! catalog, and a host snapshot, the engine simulates every tick without
//! running the game itself and reports per-entry resource deltas,
//! affordability, level-ups, and aggregate mana/time totals. This crate
//! provides all forecast mechanics without UI or platform-specific
//! dependencies.

pub mod catalog;
pub mod constants;
pub mod forecast;
pub mod host;
pub mod numbers;
pub mod prediction;
mod progress;
pub mod report;
pub mod snapshot;
pub mod state;

// Re-export commonly used types
pub use catalog::{
    ActionKind, ActionRule, Catalog, CatalogError, LoopCtx, LoopEffects, LoopRule, SegmentCap,
    StartGate, StatWeights, UpkeepReserve,
};
pub use constants::{
    BUFF_DILATION, RESOURCE_MANA, RESOURCE_TOWN, SKILL_CHRONOMANCY, TEAM_UPKEEP_PER_MEMBER,
};
pub use forecast::{ForecastError, Forecaster, PlanEntry, plan_from_json, simulate};
pub use host::{
    DilationBand, DilationTable, DungeonFloor, HostContext, HostContextBuilder, HostError,
};
pub use prediction::Prediction;
pub use report::{EntryReport, Forecast, LevelDelta, LevelDeltaSet};
pub use snapshot::{Observation, Snapshot};
pub use state::{Progression, SimState};
