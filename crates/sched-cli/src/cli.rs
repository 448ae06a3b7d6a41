use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Sanity1,
    Sanity3,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectiveArg {
    Balanced,
    MinChangeovers,
    SpreadLoad,
}

/// Two-week production scheduler: reads the input tables from `--data-dir`,
/// solves, and writes the output tables back into the same directory.
#[derive(Parser, Debug)]
#[command(name = "plant-scheduler", author, version, about, long_about = None)]
pub struct Cli {
    /// Input/output directory holding the CSV tables and, on completion,
    /// the written schedule/KPI files.
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Scoped sanity run or a full two-week solve.
    #[arg(long, value_enum, default_value_t = PhaseArg::Full)]
    pub phase: PhaseArg,

    /// Wall-clock solver budget in seconds.
    #[arg(long)]
    pub time_limit: Option<u64>,

    /// Treat every order's qty_min as 0 (demand lower bounds become slack).
    #[arg(long)]
    pub relax_demand: bool,

    /// Drop changeover setup time entirely.
    #[arg(long)]
    pub ignore_changeovers: bool,

    /// Only run the pre-solve reporters; never invokes the solver.
    #[arg(long)]
    pub diagnose: bool,

    #[arg(long)]
    pub max_lines_per_order: Option<usize>,

    #[arg(long)]
    pub min_run_hours: Option<i64>,

    /// Keep Week-1-due orders out of the Week-0 solve even when they would
    /// otherwise fit in its fill window.
    #[arg(long)]
    pub no_week1_in_week0: bool,

    /// Overrides the initial-state table path (defaults to
    /// `<data-dir>/initial_states.csv`).
    #[arg(long)]
    pub initial_states: Option<PathBuf>,

    /// Runs the Week-0 / Week-1 orchestrator instead of a single solve.
    #[arg(long)]
    pub two_phase: bool,

    #[arg(long, value_enum)]
    pub objective: Option<ObjectiveArg>,

    /// Runs the post-solve auditor against the written output tables.
    #[arg(long)]
    pub validate: bool,

    /// Seeds initial states from the previous run's `next_initial_states`
    /// output in `--data-dir`, if present. Implies `--two-phase`.
    #[arg(long)]
    pub rolling: bool,

    /// TOML file supplying default parameters; CLI flags override it.
    #[arg(long)]
    pub config: Option<PathBuf>,
}
