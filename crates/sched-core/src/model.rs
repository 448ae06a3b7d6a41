use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::LineIdx;

/// `CLEAN` sentinel: an initial SKU meaning "no inherited state".
pub const CLEAN: &str = "CLEAN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveMode {
    Balanced,
    MinChangeovers,
    SpreadLoad,
}

impl Default for ObjectiveMode {
    fn default() -> Self {
        ObjectiveMode::Balanced
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Sanity1,
    Sanity3,
    Full,
}

impl Default for RunPhase {
    fn default() -> Self {
        RunPhase::Full
    }
}

/// Weighted terms of the multi-objective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub makespan: f64,
    pub changeover: f64,
    pub cip_defer: f64,
    pub idle: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectiveWeights {
            makespan: 1.0,
            changeover: 100.0,
            cip_defer: 1.0,
            idle: 0.0,
        }
    }
}

/// Per-machine-type weighted changeover cost terms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChangeoverWeights {
    pub base: f64,
    pub topload: f64,
    pub ttp: f64,
    pub ffs: f64,
    pub casepacker: f64,
    pub conv_to_org: f64,
    pub cinnamon: f64,
    pub added_flavor: f64,
}

impl Default for ChangeoverWeights {
    fn default() -> Self {
        ChangeoverWeights {
            base: 1.0,
            topload: 1.0,
            ttp: 1.0,
            ffs: 1.0,
            casepacker: 1.0,
            conv_to_org: 1.0,
            cinnamon: 1.0,
            added_flavor: 1.0,
        }
    }
}

/// All scalar knobs. Threaded explicitly through the
/// builder and orchestrator rather than held as module-level global state.
#[derive(Debug, Clone)]
pub struct Params {
    pub horizon_h: i64,
    pub cip_interval_h: i64,
    pub cip_duration_h: i64,
    pub min_run_hours: i64,
    pub min_run_pct_of_qty: f64,
    pub max_lines_per_order: usize,
    pub long_shutdown_default_extra_h: i64,
    pub planning_start_date: NaiveDateTime,
    pub allow_week1_in_week0: bool,
    pub objective: ObjectiveWeights,
    pub changeover_weights: ChangeoverWeights,
    pub objective_mode: ObjectiveMode,
    pub phase: RunPhase,
    pub relax_demand: bool,
    pub ignore_changeovers: bool,
    pub maximize_production: bool,
    pub num_workers: usize,
    pub time_limit_secs: u64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            horizon_h: 336,
            cip_interval_h: 120,
            cip_duration_h: 6,
            min_run_hours: 4,
            min_run_pct_of_qty: 0.5,
            max_lines_per_order: 3,
            long_shutdown_default_extra_h: 4,
            planning_start_date: NaiveDateTime::UNIX_EPOCH,
            allow_week1_in_week0: true,
            objective: ObjectiveWeights::default(),
            changeover_weights: ChangeoverWeights::default(),
            objective_mode: ObjectiveMode::Balanced,
            phase: RunPhase::Full,
            relax_demand: false,
            ignore_changeovers: false,
            maximize_production: false,
            num_workers: 8,
            time_limit_secs: 120,
        }
    }
}

/// Week-0/Week-1 horizon split.
pub const WEEK0_END_H: i64 = 167;
pub const WEEK1_START_H: i64 = 168;
/// Hour at which a Week-1 order may be pulled into Week-0 when
/// `allow_week1_in_week0` holds.
pub const WEEK0_FILL_START_H: i64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub line_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capability {
    pub capable: bool,
    pub base_rate_kgph: f64,
}

/// Per-(from,to) SKU changeover cost. Absence from
/// the table means zero setup.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChangeoverEntry {
    pub setup_hours: f64,
    pub ttp: i64,
    pub ffs: i64,
    pub topload: i64,
    pub casepacker: i64,
    pub conv_to_org: i64,
    pub cinn_to_non: i64,
    pub added_flavors: i64,
}

#[derive(Debug, Clone)]
pub struct TrialInfo {
    pub pinned_line: LineIdx,
    pub start_hour: i64,
    pub end_hour: Option<i64>,
    pub run_hours: Option<i64>,
    pub target_kgs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: String,
    pub sku: String,
    pub due_start: i64,
    pub due_end: i64,
    pub qty_min: f64,
    pub qty_max: f64,
    pub priority: i64,
    pub trial: Option<TrialInfo>,
}

impl Order {
    pub fn is_trial(&self) -> bool {
        self.trial.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct InitialState {
    /// `None` means the `CLEAN` sentinel: no inherited state.
    pub initial_sku: Option<String>,
    pub available_from_hour: i64,
    pub long_shutdown_flag: bool,
    pub long_shutdown_extra_h: i64,
    pub carryover_h_since_last_cip: i64,
    pub last_cip_end_wallclock: Option<NaiveDateTime>,
}

impl Default for InitialState {
    fn default() -> Self {
        InitialState {
            initial_sku: None,
            available_from_hour: 0,
            long_shutdown_flag: false,
            long_shutdown_extra_h: 0,
            carryover_h_since_last_cip: 0,
            last_cip_end_wallclock: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Downtime {
    pub line: LineIdx,
    pub start_hour: i64,
    pub end_hour: i64,
}

/// The realized inputs for one run: lines, lookup tables, and the merged
/// (demand + trial) order list.
#[derive(Debug, Clone, Default)]
pub struct Data {
    pub lines: Vec<Line>,
    pub capabilities: HashMap<(LineIdx, String), Capability>,
    pub rate_overrides: HashMap<(LineIdx, u32), f64>,
    pub cip_hrs_overrides: HashMap<LineIdx, i64>,
    pub changeovers: HashMap<(String, String), ChangeoverEntry>,
    pub initial_states: HashMap<LineIdx, InitialState>,
    pub downtimes: Vec<Downtime>,
    pub orders: Vec<Order>,
}

impl Data {
    pub fn line_idx_by_id(&self, line_id: i64) -> Option<LineIdx> {
        self.lines
            .iter()
            .position(|l| l.line_id == line_id)
            .map(LineIdx::new)
    }

    pub fn line_idx_by_name(&self, name: &str) -> Option<LineIdx> {
        self.lines.iter().position(|l| l.name == name).map(LineIdx::new)
    }

    pub fn capability(&self, line: LineIdx, sku: &str) -> Option<&Capability> {
        self.capabilities.get(&(line, sku.to_string()))
    }

    pub fn changeover(&self, from_sku: &str, to_sku: &str) -> ChangeoverEntry {
        if from_sku == to_sku {
            return ChangeoverEntry::default();
        }
        self.changeovers
            .get(&(from_sku.to_string(), to_sku.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn initial_state(&self, line: LineIdx) -> InitialState {
        self.initial_states.get(&line).cloned().unwrap_or_default()
    }

    pub fn cip_interval_h(&self, params: &Params, line: LineIdx) -> i64 {
        self.cip_hrs_overrides
            .get(&line)
            .copied()
            .unwrap_or(params.cip_interval_h)
    }

    pub fn downtimes_for(&self, line: LineIdx) -> impl Iterator<Item = &Downtime> {
        self.downtimes.iter().filter(move |d| d.line == line)
    }
}
