mod cli;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Parser;
use cli::{Cli, ObjectiveArg, PhaseArg};
use sched_algo::{
    build_and_solve, derive_initial_states, extract_cip_windows, extract_produced_vs_bounds,
    extract_schedule, run_two_phase, Auditor, AccumulatingSink, AvailableFromMode, BoundsAuditor,
    CapacityReporter, ModelStatus, Reporter, ScheduleOutputs, SolverConfig,
};
use sched_core::{
    ChangeoverWeights, Data, ObjectiveMode, ObjectiveWeights, OrderIdx, Params, RunPhase,
    ScheduleError, ScheduleResult, SolveStatus, SolverKpis,
};
use sched_io::config::{self, SchedulerConfig};
use sched_io::{input, output};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_phase(arg: PhaseArg) -> RunPhase {
    match arg {
        PhaseArg::Sanity1 => RunPhase::Sanity1,
        PhaseArg::Sanity3 => RunPhase::Sanity3,
        PhaseArg::Full => RunPhase::Full,
    }
}

fn resolve_objective(arg: ObjectiveArg) -> ObjectiveMode {
    match arg {
        ObjectiveArg::Balanced => ObjectiveMode::Balanced,
        ObjectiveArg::MinChangeovers => ObjectiveMode::MinChangeovers,
        ObjectiveArg::SpreadLoad => ObjectiveMode::SpreadLoad,
    }
}

/// Builds `Params` from the loaded TOML config, then lets individual CLI
/// flags override single fields.
fn build_params(cli: &Cli, config: &SchedulerConfig, anchor: NaiveDateTime) -> Params {
    let params = Params {
        horizon_h: 336,
        cip_interval_h: config.cip.interval_h,
        cip_duration_h: config.cip.duration_h,
        min_run_hours: cli.min_run_hours.unwrap_or(config.scheduler.min_run_hours),
        max_lines_per_order: cli
            .max_lines_per_order
            .unwrap_or(config.scheduler.max_lines_per_order),
        planning_start_date: anchor,
        allow_week1_in_week0: !cli.no_week1_in_week0,
        objective: ObjectiveWeights {
            makespan: config.objective.makespan_weight,
            changeover: config.objective.changeover_weight,
            cip_defer: config.objective.cip_defer_weight,
            idle: config.objective.idle_weight,
        },
        changeover_weights: ChangeoverWeights {
            base: config.changeover.base_changeover_weight,
            topload: config.changeover.topload_weight,
            ttp: config.changeover.ttp_weight,
            ffs: config.changeover.ffs_weight,
            casepacker: config.changeover.casepacker_weight,
            conv_to_org: config.objective.co_conv_org_weight,
            cinnamon: config.objective.co_cinn_weight,
            added_flavor: config.objective.co_flavor_weight,
        },
        objective_mode: cli.objective.map(resolve_objective).unwrap_or_default(),
        phase: resolve_phase(cli.phase),
        relax_demand: cli.relax_demand,
        ignore_changeovers: cli.ignore_changeovers,
        maximize_production: false,
        num_workers: num_cpus::get().min(8),
        time_limit_secs: cli.time_limit.unwrap_or(config.scheduler.time_limit),
    };
    params
}

fn load_data(cli: &Cli, params: &Params) -> ScheduleResult<Data> {
    let dir = &cli.data_dir;
    let mut data = Data::default();

    input::load_capabilities(
        &mut data,
        &dir.join("capabilities_rates.csv"),
        optional_path(dir, "line_rates.csv").as_deref(),
        optional_path(dir, "line_cip_hrs.csv").as_deref(),
    )?;
    input::load_changeovers(&mut data, &dir.join("changeovers.csv"))?;

    let initial_states_path = initial_states_path(cli);
    if initial_states_path.exists() {
        input::load_initial_states(&mut data, &initial_states_path)?;
    }

    input::load_downtimes(&mut data, &dir.join("downtimes.csv"))?;
    input::load_demand_plan(&mut data, &dir.join("demand_plan.csv"))?;

    let trials_path = dir.join("trials.csv");
    if trials_path.exists() {
        input::load_trials(&mut data, &trials_path, params.planning_start_date)?;
    }

    if params.relax_demand {
        for order in &mut data.orders {
            order.qty_min = 0.0;
        }
    }

    Ok(data)
}

fn optional_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let path = dir.join(name);
    path.exists().then_some(path)
}

/// `--rolling` auto-seeds from the prior run's `next_initial_states.csv`
/// when present, falling back to `--initial-states` or the plain input
/// table.
fn initial_states_path(cli: &Cli) -> PathBuf {
    if cli.rolling {
        let rolled = cli.data_dir.join("next_initial_states.csv");
        if rolled.exists() {
            return rolled;
        }
    }
    cli.initial_states
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("initial_states.csv"))
}

fn write_kpis(dir: &Path, kpis: &[SolverKpis]) -> ScheduleResult<()> {
    output::write_solver_kpis(&dir.join("solver_kpis.txt"), kpis)
}

fn run(cli: &Cli) -> ScheduleResult<()> {
    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => SchedulerConfig::default(),
    };

    let anchor = NaiveDateTime::parse_from_str(&config.scheduler.planning_start_date, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| ScheduleError::Input(format!("planning_start_date: {e}")))?;

    let params = build_params(cli, &config, anchor);
    let data = load_data(cli, &params)?;

    if cli.diagnose {
        let findings = CapacityReporter {
            max_lines_per_order: params.max_lines_per_order,
        }
        .report(&data);
        for finding in &findings {
            info!(severity = ?finding.severity, "{}", finding.message);
        }
        write_kpis(
            &cli.data_dir,
            &[SolverKpis {
                phase: "diagnose".to_string(),
                status: SolveStatus::Optimal,
                objective: None,
                best_bound: None,
                wall_time_secs: 0.0,
                summary: Some(format!("{} finding(s)", findings.len())),
            }],
        )?;
        return Ok(());
    }

    let solver_config = SolverConfig {
        num_workers: params.num_workers,
        time_limit_secs: params.time_limit_secs,
    };
    let mut sink = AccumulatingSink::default();

    let (schedule, produced_vs_bounds, cip_windows, next_initial_states, kpis) =
        if cli.two_phase || cli.rolling {
            let outcome = run_two_phase(&params, &data, &solver_config, &mut sink)?;
            let mut kpis = vec![outcome.week0_kpis];
            if let Some(week1) = outcome.week1_kpis {
                kpis.push(week1);
            }
            (
                outcome.schedule,
                outcome.produced_vs_bounds,
                outcome.cip_windows,
                outcome.next_initial_states,
                kpis,
            )
        } else {
            let order_idxs: Vec<OrderIdx> = (0..data.orders.len()).map(OrderIdx::new).collect();
            let output = build_and_solve(&params, &data, &order_idxs, &solver_config, &mut sink)?;

            let kpi = SolverKpis {
                phase: "full".to_string(),
                status: match output.status {
                    ModelStatus::Optimal => SolveStatus::Optimal,
                    ModelStatus::Feasible => SolveStatus::Feasible,
                    ModelStatus::Infeasible => SolveStatus::Infeasible,
                    ModelStatus::Unknown => SolveStatus::Unknown,
                },
                objective: output.objective,
                best_bound: None,
                wall_time_secs: 0.0,
                summary: None,
            };

            if output.status == ModelStatus::Infeasible {
                write_kpis(&cli.data_dir, &[kpi])?;
                warn!("solve reported infeasible; no schedule written");
                return Ok(());
            }

            let schedule = extract_schedule(&data, &output, anchor, 0);
            let produced = extract_produced_vs_bounds(&data, &output, &order_idxs);
            let cips = extract_cip_windows(&data, &output, &schedule, params.cip_interval_h, params.cip_duration_h);
            let next_states = derive_initial_states(
                &data,
                &schedule,
                &cips,
                anchor,
                params.cip_interval_h,
                AvailableFromMode::Zero,
            );
            (schedule, produced, cips, next_states, vec![kpi])
        };

    output::write_schedule(&cli.data_dir.join("schedule.csv"), &schedule)?;
    output::write_produced_vs_bounds(&cli.data_dir.join("produced_vs_bounds.csv"), &produced_vs_bounds)?;
    output::write_cip_windows(&cli.data_dir.join("cip_windows.csv"), &cip_windows)?;
    output::write_next_initial_states(&cli.data_dir.join("next_initial_states.csv"), &next_initial_states)?;
    output::write_solver_progress(&cli.data_dir.join("solver_progress.json"), &sink.progress)?;
    write_kpis(&cli.data_dir, &kpis)?;

    if cli.validate || config.scheduler.validate {
        let outputs = ScheduleOutputs {
            schedule: &schedule,
            produced_vs_bounds: &produced_vs_bounds,
            cip_windows: &cip_windows,
        };
        let findings = BoundsAuditor.audit(&data, &outputs);
        for finding in &findings {
            warn!(severity = ?finding.severity, "{}", finding.message);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        error!("{err:?}");
        let log_path = cli.data_dir.join("error.log");
        let _ = std::fs::write(&log_path, format!("{err:?}\n"));
        eprintln!("Status: ERROR — {err}");
        std::process::exit(1);
    }
}
