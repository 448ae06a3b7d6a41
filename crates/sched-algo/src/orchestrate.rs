//! Runs Week-0 then Week-1, threading line-end state between phases.

use sched_core::{
    CipWindowRow, Data, NextInitialStateRow, ObjectiveMode, OrderIdx, Params, ProducedVsBoundsRow,
    ScheduleRow, SolveStatus, SolverKpis, WEEK0_END_H, WEEK1_START_H,
};

use crate::carry::{derive_initial_states, AvailableFromMode};
use crate::extract::{extract_cip_windows, extract_produced_vs_bounds, extract_schedule};
use crate::model::{build_and_solve, ModelStatus};
use crate::solve::{ProgressSink, SolverConfig};

pub struct TwoPhaseOutcome {
    pub schedule: Vec<ScheduleRow>,
    pub produced_vs_bounds: Vec<ProducedVsBoundsRow>,
    pub cip_windows: Vec<CipWindowRow>,
    pub next_initial_states: Vec<NextInitialStateRow>,
    pub week0_kpis: SolverKpis,
    pub week1_kpis: Option<SolverKpis>,
}

fn model_status_to_solve_status(status: &ModelStatus) -> SolveStatus {
    match status {
        ModelStatus::Optimal => SolveStatus::Optimal,
        ModelStatus::Feasible => SolveStatus::Feasible,
        ModelStatus::Infeasible => SolveStatus::Infeasible,
        ModelStatus::Unknown => SolveStatus::Unknown,
    }
}

fn trial_spans_boundary(data: &Data, oidx: OrderIdx) -> bool {
    let order = &data.orders[oidx.value()];
    match &order.trial {
        Some(trial) => {
            let end = trial
                .end_hour
                .or(trial.run_hours.map(|r| trial.start_hour + r))
                .unwrap_or(trial.start_hour);
            trial.start_hour < WEEK1_START_H && end > WEEK0_END_H
        }
        None => false,
    }
}

/// Step 1: build `P0` (`H = 168`, `allow_week1_in_week0 = false`) and solve
/// only orders with `due_end ≤ 167`.
fn week0_order_idxs(data: &Data) -> Vec<OrderIdx> {
    data.orders
        .iter()
        .enumerate()
        .filter(|(_, o)| o.due_end <= WEEK0_END_H)
        .map(|(i, _)| OrderIdx::new(i))
        .collect()
}

/// Step 4: Week-1 solves over orders with `due_start ≥ 168` plus any trial
/// spanning the boundary, with `due_start` reset to 0 for non-trials
/// (line-availability, not due-window, guards the real start).
fn week1_order_idxs(data: &Data) -> Vec<OrderIdx> {
    data.orders
        .iter()
        .enumerate()
        .filter(|(i, o)| o.due_start >= WEEK1_START_H || trial_spans_boundary(data, OrderIdx::new(*i)))
        .map(|(i, _)| OrderIdx::new(i))
        .collect()
}

fn reset_week1_due_starts(data: &Data, order_idxs: &[OrderIdx]) -> Data {
    let mut week1 = data.clone();
    for &oidx in order_idxs {
        let order = &mut week1.orders[oidx.value()];
        if order.trial.is_none() {
            order.due_start = 0;
        }
    }
    week1
}

/// Runs the full two-phase sequence. Returns Week-0's
/// output alone (with Week-1's status marked infeasible) if Week-1 fails;
/// propagates an error only if Week-0 itself fails to solve.
pub fn run_two_phase(
    base_params: &Params,
    data: &Data,
    config: &SolverConfig,
    sink: &mut dyn ProgressSink,
) -> sched_core::ScheduleResult<TwoPhaseOutcome> {
    let mut p0 = base_params.clone();
    p0.horizon_h = WEEK0_END_H + 1;
    p0.allow_week1_in_week0 = false;

    let week0_orders = week0_order_idxs(data);
    let week0_output = build_and_solve(&p0, data, &week0_orders, config, sink)?;

    if week0_output.status == ModelStatus::Infeasible {
        return Ok(TwoPhaseOutcome {
            schedule: Vec::new(),
            produced_vs_bounds: Vec::new(),
            cip_windows: Vec::new(),
            next_initial_states: Vec::new(),
            week0_kpis: SolverKpis {
                phase: "week0".to_string(),
                status: SolveStatus::Infeasible,
                objective: None,
                best_bound: None,
                wall_time_secs: 0.0,
                summary: Some("week-0 infeasible; orchestration stopped".to_string()),
            },
            week1_kpis: None,
        });
    }

    let week0_schedule = extract_schedule(data, &week0_output, p0.planning_start_date, 0);
    let week0_produced = extract_produced_vs_bounds(data, &week0_output, &week0_orders);
    let week0_cips = extract_cip_windows(data, &week0_output, &week0_schedule, p0.cip_interval_h, p0.cip_duration_h);

    let week0_kpis = SolverKpis {
        phase: "week0".to_string(),
        status: model_status_to_solve_status(&week0_output.status),
        objective: week0_output.objective,
        best_bound: None,
        wall_time_secs: 0.0,
        summary: None,
    };

    // Step 3: derive week1_initial_states with the schedule-tail
    // `available_from` (not the final zeroed form used for rolling seeds).
    let week1_initial_states = derive_initial_states(
        data,
        &week0_schedule,
        &week0_cips,
        p0.planning_start_date,
        p0.cip_interval_h,
        AvailableFromMode::ScheduleTail,
    );

    let mut week1_data = data.clone();
    for (i, row) in week1_initial_states.iter().enumerate() {
        let lidx = sched_core::LineIdx::new(i);
        week1_data.initial_states.insert(
            lidx,
            sched_core::InitialState {
                initial_sku: if row.initial_sku == sched_core::CLEAN { None } else { Some(row.initial_sku.clone()) },
                available_from_hour: row.available_from_hour,
                long_shutdown_flag: row.long_shutdown_flag,
                long_shutdown_extra_h: row.long_shutdown_extra_setup_hours,
                carryover_h_since_last_cip: row.carryover_run_hours_since_last_cip_at_t0,
                last_cip_end_wallclock: row.last_cip_end_datetime,
            },
        );
    }

    let week1_orders = week1_order_idxs(data);
    let week1_data = reset_week1_due_starts(&week1_data, &week1_orders);

    let mut p1 = base_params.clone();
    p1.horizon_h = base_params.horizon_h.max(WEEK0_END_H + 1);
    p1.maximize_production = true;
    p1.objective_mode = ObjectiveMode::Balanced;

    let week1_output = build_and_solve(&p1, &week1_data, &week1_orders, config, sink)?;

    if week1_output.status == ModelStatus::Infeasible {
        let next_initial_states = derive_initial_states(
            data,
            &week0_schedule,
            &week0_cips,
            p0.planning_start_date,
            p0.cip_interval_h,
            AvailableFromMode::Zero,
        );
        return Ok(TwoPhaseOutcome {
            schedule: week0_schedule,
            produced_vs_bounds: week0_produced,
            cip_windows: week0_cips,
            next_initial_states,
            week0_kpis,
            week1_kpis: Some(SolverKpis {
                phase: "week1".to_string(),
                status: SolveStatus::Infeasible,
                objective: None,
                best_bound: None,
                wall_time_secs: 0.0,
                summary: Some("week-1 infeasible; week-0 output stands alone".to_string()),
            }),
        });
    }

    let week1_schedule = extract_schedule(&week1_data, &week1_output, p1.planning_start_date, 0);
    let week1_produced = extract_produced_vs_bounds(&week1_data, &week1_output, &week1_orders);
    let week1_cips = extract_cip_windows(
        &week1_data,
        &week1_output,
        &week1_schedule,
        p1.cip_interval_h,
        p1.cip_duration_h,
    );

    let mut schedule = week0_schedule;
    schedule.extend(week1_schedule);
    schedule.sort_by(|a, b| (a.line_id, a.start_hour).cmp(&(b.line_id, b.start_hour)));

    let mut produced_vs_bounds = week0_produced;
    produced_vs_bounds.extend(week1_produced);

    let mut cip_windows = week0_cips;
    cip_windows.extend(week1_cips);
    cip_windows.sort_by(|a, b| (a.line_id, a.start_hour).cmp(&(b.line_id, b.start_hour)));

    let next_initial_states = derive_initial_states(
        data,
        &schedule,
        &cip_windows,
        p0.planning_start_date,
        p0.cip_interval_h,
        AvailableFromMode::Zero,
    );

    let week1_kpis = Some(SolverKpis {
        phase: "week1".to_string(),
        status: model_status_to_solve_status(&week1_output.status),
        objective: week1_output.objective,
        best_bound: None,
        wall_time_secs: 0.0,
        summary: None,
    });

    Ok(TwoPhaseOutcome {
        schedule,
        produced_vs_bounds,
        cip_windows,
        next_initial_states,
        week0_kpis,
        week1_kpis,
    })
}
