//! Domain types for the two-week plant production scheduler: parameters,
//! lines, orders, capability/changeover/initial-state tables, and the
//! arena-index newtypes (`LineIdx`, `OrderIdx`) used everywhere downstream
//! instead of direct references, since lines and orders refer to each other
//! cyclically (orders via capability, lines via initial-SKU-equals-produced-
//! SKU).
//!
//! This crate has no I/O and no solver dependency: it holds data, not
//! behavior beyond small table lookups.

pub mod error;
pub mod ids;
pub mod model;
pub mod output;
pub mod time;

pub use error::{ScheduleError, ScheduleResult};
pub use ids::{LineIdx, OrderIdx};
pub use model::{
    Capability, ChangeoverEntry, ChangeoverWeights, Data, Downtime, InitialState, Line,
    ObjectiveMode, ObjectiveWeights, Order, Params, RunPhase, TrialInfo, CLEAN, WEEK0_END_H,
    WEEK0_FILL_START_H, WEEK1_START_H,
};
pub use output::{
    CipWindowRow, NextInitialStateRow, ProducedVsBoundsRow, ScheduleRow, SolveStatus, SolverKpis,
    SolverProgress, SolverSolutionPoint, SolverStage,
};
