//! Shapes shared between the producer (`sched-algo`'s extractor and
//! orchestrator) and the writer (`sched-io`'s atomic output writers), so
//! the two crates never need to depend on each other.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub line_id: i64,
    pub line_name: String,
    pub order_id: String,
    pub sku: String,
    pub start_hour: i64,
    pub end_hour: i64,
    pub run_hours: i64,
    pub start_dt: NaiveDateTime,
    pub end_dt: NaiveDateTime,
    pub is_trial: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducedVsBoundsRow {
    pub order_id: String,
    pub sku: String,
    pub qty_min: f64,
    pub qty_max: f64,
    pub produced: f64,
    pub in_bounds: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipWindowRow {
    pub line_id: i64,
    pub line_name: String,
    pub start_hour: i64,
    pub end_hour: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextInitialStateRow {
    pub line_id: i64,
    pub initial_sku: String,
    pub available_from_hour: i64,
    pub long_shutdown_flag: bool,
    pub long_shutdown_extra_setup_hours: i64,
    pub carryover_run_hours_since_last_cip_at_t0: i64,
    pub last_cip_end_datetime: Option<NaiveDateTime>,
}

/// Status string reported in the KPI file: `OPTIMAL`, `FEASIBLE`,
/// `INFEASIBLE`, `UNKNOWN`, or `ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
    Error,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unknown => "UNKNOWN",
            SolveStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverKpis {
    pub phase: String,
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub best_bound: Option<f64>,
    pub wall_time_secs: f64,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverStage {
    pub id: String,
    pub label: String,
    pub status: String,
    pub detail: String,
    pub ts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSolutionPoint {
    pub wall_time: f64,
    pub objective: f64,
    pub label: String,
}

/// One push from the solver's progress-callback trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverProgress {
    pub stages: Vec<SolverStage>,
    pub solutions: Vec<SolverSolutionPoint>,
    pub solver_stats: serde_json::Value,
    pub data_summary: serde_json::Value,
}

impl Default for SolverProgress {
    fn default() -> Self {
        SolverProgress {
            stages: Vec::new(),
            solutions: Vec::new(),
            solver_stats: serde_json::json!({}),
            data_summary: serde_json::json!({}),
        }
    }
}
