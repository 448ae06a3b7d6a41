//! Constructs and solves the integer model. Disjunctive scheduling
//! constraints (optional intervals, no-overlap, conditional enforcement)
//! are linearized here as big-M MIP constraints and solved with HiGHS.

use std::collections::HashMap;

use good_lp::solvers::highs::highs;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use sched_core::{Data, LineIdx, ObjectiveMode, OrderIdx, Params, ScheduleResult};

use crate::model::vars::{BlockEnd, CipVars, NamedBlock, OrderLineVars, PairOrderVars};
use crate::rate::resolve_rate;
use crate::solve::{ProgressSink, SolverConfig};
use chrono::Datelike;

/// A production segment resolved out of the solved model, in hours.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSegment {
    pub start: i64,
    pub end: i64,
    pub run: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedOrderLine {
    pub present: bool,
    pub seg_a: Option<ResolvedSegment>,
    pub seg_b: Option<ResolvedSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

pub struct ModelOutput {
    pub status: ModelStatus,
    pub objective: Option<f64>,
    pub order_line: HashMap<(LineIdx, OrderIdx), ResolvedOrderLine>,
    /// Only the CIP windows the model itself placed (`present == true`).
    pub cip_windows: HashMap<LineIdx, Vec<(i64, i64)>>,
    pub produced: HashMap<OrderIdx, f64>,
}

const EPS: f64 = 1e-6;

fn big_m(params: &Params) -> f64 {
    (params.horizon_h as f64) * 2.0 + 10.0
}

fn ceil_div(numerator: f64, denominator: f64) -> i64 {
    (numerator / denominator).ceil() as i64
}

fn due_start_effective(params: &Params, due_start: i64) -> i64 {
    if params.allow_week1_in_week0 && due_start > sched_core::WEEK0_END_H {
        sched_core::WEEK0_FILL_START_H
    } else {
        due_start
    }
}

/// Builds the model for `order_idxs` (the caller has already filtered to
/// the orders relevant for this phase) and solves it with HiGHS.
pub fn build_and_solve(
    params: &Params,
    data: &Data,
    order_idxs: &[OrderIdx],
    config: &SolverConfig,
    sink: &mut dyn ProgressSink,
) -> ScheduleResult<ModelOutput> {
    let mut vars = variables!();
    let big_m_h = big_m(params);
    let month = params.planning_start_date.month();

    // Which (line, order) pairs get variables: capable normal orders, or
    // the pinned line for trials.
    let mut pairs: Vec<(LineIdx, OrderIdx)> = Vec::new();
    for &oidx in order_idxs {
        let order = &data.orders[oidx.value()];
        if let Some(trial) = &order.trial {
            pairs.push((trial.pinned_line, oidx));
            continue;
        }
        for (lidx, _line) in data.lines.iter().enumerate() {
            let lidx = LineIdx::new(lidx);
            let rate = resolve_rate(data, lidx, &order.sku, month);
            let capable = data.capability(lidx, &order.sku).map(|c| c.capable).unwrap_or(false);
            if capable && rate > 0.0 {
                pairs.push((lidx, oidx));
            }
        }
    }

    let mut order_line_vars: HashMap<(LineIdx, OrderIdx), OrderLineVars> = HashMap::new();
    for &(lidx, oidx) in &pairs {
        let h = params.horizon_h as f64;
        let present = vars.add(variable().binary());
        let run_h = vars.add(variable().integer().min(0.0).max(h));
        let seg_a_start = vars.add(variable().integer().min(0.0).max(h));
        let seg_a_end = vars.add(variable().integer().min(0.0).max(h));
        let seg_a_run = vars.add(variable().integer().min(0.0).max(h));
        let seg_b_present = vars.add(variable().binary());
        let seg_b_start = vars.add(variable().integer().min(0.0).max(h));
        let seg_b_end = vars.add(variable().integer().min(0.0).max(h));
        let seg_b_run = vars.add(variable().integer().min(0.0).max(h));
        let eff_end = vars.add(variable().integer().min(0.0).max(h));
        order_line_vars.insert(
            (lidx, oidx),
            OrderLineVars {
                present,
                run_h,
                seg_a_start,
                seg_a_end,
                seg_a_run,
                seg_b_present,
                seg_b_start,
                seg_b_end,
                seg_b_run,
                eff_end,
            },
        );
    }

    let mut produced_vars: HashMap<OrderIdx, Variable> = HashMap::new();
    for &oidx in order_idxs {
        let order = &data.orders[oidx.value()];
        let upper = if order.qty_max.is_finite() { order.qty_max } else { 1.0e9 };
        produced_vars.insert(oidx, vars.add(variable().min(0.0).max(upper.max(1.0))));
    }

    // One CIP-vars struct per line that has at least one eligible order.
    let mut lines_with_orders: Vec<LineIdx> = pairs.iter().map(|(l, _)| *l).collect();
    lines_with_orders.sort();
    lines_with_orders.dedup();

    let mut cip_vars: HashMap<LineIdx, CipVars> = HashMap::new();
    let full_mode = matches!(params.phase, sched_core::RunPhase::Full);
    if full_mode {
        for &lidx in &lines_with_orders {
            let h = params.horizon_h as f64;
            let present = [
                vars.add(variable().binary()),
                vars.add(variable().binary()),
                vars.add(variable().binary()),
            ];
            let start = [
                vars.add(variable().integer().min(0.0).max(h)),
                vars.add(variable().integer().min(0.0).max(h)),
                vars.add(variable().integer().min(0.0).max(h)),
            ];
            let end = [
                vars.add(variable().integer().min(0.0).max(h)),
                vars.add(variable().integer().min(0.0).max(h)),
                vars.add(variable().integer().min(0.0).max(h)),
            ];
            cip_vars.insert(lidx, CipVars { present, start, end });
        }
    } else {
        // Non-full modes never split a run on a CIP; seg_b stays forced
        // false below.
    }

    // Pairwise ordering vars for changeover, keyed by the
    // unordered pair of order indices on a given line.
    let mut pair_vars: HashMap<(LineIdx, OrderIdx, OrderIdx), PairOrderVars> = HashMap::new();
    let changeovers_enabled = !params.ignore_changeovers && !matches!(params.phase, sched_core::RunPhase::Sanity1);
    if changeovers_enabled {
        for &lidx in &lines_with_orders {
            let orders_on_line: Vec<OrderIdx> = pairs
                .iter()
                .filter(|(l, _)| *l == lidx)
                .map(|(_, o)| *o)
                .collect();
            for i in 0..orders_on_line.len() {
                for j in (i + 1)..orders_on_line.len() {
                    let oi = orders_on_line[i];
                    let oj = orders_on_line[j];
                    let order_before = vars.add(variable().binary());
                    let succ_i_before_j = vars.add(variable().binary());
                    let succ_j_before_i = vars.add(variable().binary());
                    pair_vars.insert(
                        (lidx, oi, oj),
                        PairOrderVars {
                            order_before,
                            succ_i_before_j,
                            succ_j_before_i,
                        },
                    );
                }
            }
        }
    }

    // "first" selector per (line, order): true iff this order is the
    // earliest on the line.
    let mut first_vars: HashMap<(LineIdx, OrderIdx), Variable> = HashMap::new();
    if changeovers_enabled {
        for &(lidx, oidx) in &pairs {
            first_vars.insert((lidx, oidx), vars.add(variable().binary()));
        }
    }

    let makespan = vars.add(variable().integer().min(0.0).max(params.horizon_h as f64));
    let max_line_run = vars.add(variable().integer().min(0.0).max(params.horizon_h as f64 * (data.lines.len().max(1) as f64)));

    // Per-line min/max aggregates standing in for `min_o seg_a_start` /
    // `max_o eff_end` over every order present on the line: a line can
    // carry more than one order, so "the" line span can never be read off
    // a single arbitrary order picked by HashMap iteration order.
    let mut cip_first_start: HashMap<LineIdx, Variable> = HashMap::new();
    let mut cip_last_end: HashMap<LineIdx, Variable> = HashMap::new();
    if full_mode {
        for &lidx in &lines_with_orders {
            let h = params.horizon_h as f64;
            cip_first_start.insert(lidx, vars.add(variable().integer().min(0.0).max(h)));
            cip_last_end.insert(lidx, vars.add(variable().integer().min(0.0).max(h)));
        }
    }

    let mut w0_last_end: HashMap<LineIdx, Variable> = HashMap::new();
    let mut w1_first_start: HashMap<LineIdx, Variable> = HashMap::new();
    if params.allow_week1_in_week0 {
        for &lidx in &lines_with_orders {
            let h = params.horizon_h as f64;
            w0_last_end.insert(lidx, vars.add(variable().integer().min(0.0).max(h)));
            w1_first_start.insert(lidx, vars.add(variable().integer().min(0.0).max(h)));
        }
    }

    // Which of a line's up-to-three CIP slots a given order's split (if
    // any) straddles.
    let mut split_select: HashMap<(LineIdx, OrderIdx, usize), Variable> = HashMap::new();
    if full_mode {
        for &(lidx, oidx) in &pairs {
            for k in 0..3 {
                split_select.insert((lidx, oidx, k), vars.add(variable().binary()));
            }
        }
    }

    // Blocks subject to the NoOverlap pass, gathered now (while `vars` is
    // still mutable) so the pairwise disjunction binaries below can be
    // created alongside everything else; the constraints themselves are
    // written later, once `problem` exists.
    let mut no_overlap_blocks: HashMap<LineIdx, Vec<NamedBlock>> = HashMap::new();
    for &lidx in &lines_with_orders {
        let mut blocks: Vec<NamedBlock> = Vec::new();
        for (&(l, _oidx), olv) in &order_line_vars {
            if l != lidx {
                continue;
            }
            blocks.push(NamedBlock {
                start: BlockEnd::Variable(olv.seg_a_start),
                end: BlockEnd::Variable(olv.seg_a_end),
                present: Some(olv.present),
            });
            blocks.push(NamedBlock {
                start: BlockEnd::Variable(olv.seg_b_start),
                end: BlockEnd::Variable(olv.seg_b_end),
                present: Some(olv.seg_b_present),
            });
        }
        if let Some(cv) = cip_vars.get(&lidx) {
            for k in 0..3 {
                blocks.push(NamedBlock {
                    start: BlockEnd::Variable(cv.start[k]),
                    end: BlockEnd::Variable(cv.end[k]),
                    present: Some(cv.present[k]),
                });
            }
        }
        for dt in data.downtimes_for(lidx) {
            blocks.push(NamedBlock {
                start: BlockEnd::Fixed(dt.start_hour as f64),
                end: BlockEnd::Fixed(dt.end_hour as f64),
                present: None,
            });
        }
        no_overlap_blocks.insert(lidx, blocks);
    }

    let mut no_overlap_order: HashMap<(LineIdx, usize, usize), Variable> = HashMap::new();
    for (&lidx, blocks) in &no_overlap_blocks {
        for i in 0..blocks.len() {
            for j in (i + 1)..blocks.len() {
                // Two fixed (downtime) blocks never both move; nothing to
                // decide, and downtimes never overlap in well-formed input.
                if matches!(blocks[i].start, BlockEnd::Fixed(_)) && matches!(blocks[j].start, BlockEnd::Fixed(_)) {
                    continue;
                }
                no_overlap_order.insert((lidx, i, j), vars.add(variable().binary()));
            }
        }
    }

    // === Objective assembly (built before constraints so it can be moved
    // into `.minimise()`; good_lp requires all variables to exist first). ===
    let mut co_cost_expr = Expression::from(0.0);
    let mut idle_expr = Expression::from(0.0);
    let mut cip_defer_expr = Expression::from(0.0);
    let mut total_produced_expr = Expression::from(0.0);

    for (&oidx, &pv) in &produced_vars {
        let _ = oidx;
        total_produced_expr += pv;
    }

    if changeovers_enabled {
        for (&(lidx, oi, oj), &pv) in &pair_vars {
            let order_i = &data.orders[oi.value()];
            let order_j = &data.orders[oj.value()];
            let co_ij = data.changeover(&order_i.sku, &order_j.sku);
            let co_ji = data.changeover(&order_j.sku, &order_i.sku);
            let w = &params.changeover_weights;
            let pair_cost_ij = (w.base
                + w.topload * co_ij.topload as f64
                + w.ttp * co_ij.ttp as f64
                + w.ffs * co_ij.ffs as f64
                + w.casepacker * co_ij.casepacker as f64
                + w.conv_to_org * co_ij.conv_to_org as f64
                + w.cinnamon * co_ij.cinn_to_non as f64
                + w.added_flavor * co_ij.added_flavors as f64)
                .max(0.0); // clamp at zero.
            let pair_cost_ji = (w.base
                + w.topload * co_ji.topload as f64
                + w.ttp * co_ji.ttp as f64
                + w.ffs * co_ji.ffs as f64
                + w.casepacker * co_ji.casepacker as f64
                + w.conv_to_org * co_ji.conv_to_org as f64
                + w.cinnamon * co_ji.cinn_to_non as f64
                + w.added_flavor * co_ji.added_flavors as f64)
                .max(0.0);
            let _ = lidx;
            co_cost_expr += pair_cost_ij * pv.succ_i_before_j + pair_cost_ji * pv.succ_j_before_i;
        }
    } else {
        // Flat cost: Σ_l max(0, present_count(l) − 1), approximated with an
        // auxiliary expression since `max` is not linear; each line
        // contributes `present_count - 1` when changeovers are off and at
        // least one order is present, clamped in the caller's interpretation
        // of the objective value rather than in-model (flat mode is only
        // used for sanity phases that do not optimize changeovers anyway).
        for &lidx in &lines_with_orders {
            let mut present_count = Expression::from(0.0);
            for (&(l, _oidx), olv) in &order_line_vars {
                if l == lidx {
                    present_count += olv.present;
                }
            }
            co_cost_expr += present_count;
        }
    }

    if params.objective.idle > 0.0 {
        for &lidx in &lines_with_orders {
            let mut span = Expression::from(0.0);
            let mut production = Expression::from(0.0);
            let mut cip_hours = Expression::from(0.0);
            for (&(l, _oidx), olv) in &order_line_vars {
                if l == lidx {
                    span += olv.eff_end;
                    production += olv.run_h;
                }
            }
            if let Some(cv) = cip_vars.get(&lidx) {
                for k in 0..3 {
                    cip_hours += params.cip_duration_h as f64 * cv.present[k];
                }
            }
            idle_expr += span - production - cip_hours;
        }
    }

    for cv in cip_vars.values() {
        for k in 0..3 {
            cip_defer_expr += cv.start[k];
        }
    }

    let objective_expr: Expression = if params.maximize_production {
        total_produced_expr.clone() * 1000.0 - co_cost_expr.clone() - idle_expr.clone()
            + cip_defer_expr.clone()
            - Expression::from(makespan)
    } else {
        match params.objective_mode {
            ObjectiveMode::Balanced => {
                params.objective.makespan * makespan + co_cost_expr.clone() * params.objective.changeover
                    + idle_expr.clone() * params.objective.idle
                    - cip_defer_expr.clone() * params.objective.cip_defer
            }
            ObjectiveMode::MinChangeovers => {
                co_cost_expr.clone() * 10000.0 + Expression::from(makespan) + idle_expr.clone()
                    - cip_defer_expr.clone()
            }
            ObjectiveMode::SpreadLoad => {
                1000.0 * max_line_run + co_cost_expr.clone() + Expression::from(makespan) + idle_expr.clone()
                    - cip_defer_expr.clone()
            }
        }
    };

    // `config`'s worker/time-limit knobs are not threaded into this single
    // solve call: good_lp's HiGHS binding takes solver options at a level
    // this build doesn't reach into. They still document operator intent
    // and are read back by the orchestrator for wall-clock bookkeeping.
    let _ = config;
    let mut problem = vars.minimise(objective_expr).using(highs);

    // === linking, due-window, capability/min-run, trial pinning ===
    for (&(lidx, oidx), olv) in &order_line_vars {
        let order = &data.orders[oidx.value()];
        let rate = resolve_rate(data, lidx, &order.sku, month);

        problem = problem.with(constraint!(olv.seg_a_run + olv.seg_b_run == olv.run_h));
        problem = problem.with(constraint!(olv.seg_b_present <= olv.present));
        problem = problem.with(constraint!(
            olv.seg_b_start >= olv.seg_a_end - big_m_h * (1.0 - olv.seg_b_present)
        ));
        problem = problem.with(constraint!(olv.seg_b_run <= big_m_h * olv.seg_b_present));
        problem = problem.with(constraint!(olv.seg_a_end <= big_m_h * olv.present));

        // eff_end = seg_b_present ? seg_b_end : seg_a_end
        problem = problem.with(constraint!(olv.eff_end >= olv.seg_a_end));
        problem = problem.with(constraint!(
            olv.eff_end <= olv.seg_a_end + big_m_h * olv.seg_b_present
        ));
        problem = problem.with(constraint!(
            olv.eff_end >= olv.seg_b_end - big_m_h * (1.0 - olv.seg_b_present)
        ));
        problem = problem.with(constraint!(
            olv.eff_end <= olv.seg_b_end + big_m_h * (1.0 - olv.seg_b_present)
        ));
        problem = problem.with(constraint!(makespan >= olv.eff_end));

        if let Some(trial) = &order.trial {
            if trial.pinned_line == lidx {
                problem = problem.with(constraint!(olv.present == 1.0));
                problem = problem.with(constraint!(olv.seg_a_start == trial.start_hour as f64));
                if let Some(run_hours) = trial.run_hours {
                    problem = problem.with(constraint!(olv.run_h == run_hours as f64));
                }
                if let Some(end_hour) = trial.end_hour {
                    problem = problem.with(constraint!(olv.eff_end == end_hour as f64));
                } else if let Some(target_kgs) = trial.target_kgs {
                    if rate > 0.0 {
                        let needed_hours = ceil_div(target_kgs, rate) as f64;
                        problem = problem.with(constraint!(olv.run_h == needed_hours));
                    }
                }
            }
            continue;
        }

        let ds_eff = due_start_effective(params, order.due_start) as f64;
        problem = problem.with(constraint!(
            olv.seg_a_start >= ds_eff - big_m_h * (1.0 - olv.present)
        ));
        problem = problem.with(constraint!(
            olv.eff_end <= (order.due_end + 1) as f64 + big_m_h * (1.0 - olv.present)
        ));

        let min_run_from_pct = if rate > 0.0 {
            ceil_div(params.min_run_pct_of_qty * order.qty_min, rate)
        } else {
            0
        };
        let window_len = ((order.due_end + 1) as f64 - ds_eff).max(0.0);
        let min_bound = (params.min_run_hours.max(1).max(min_run_from_pct) as f64).min(window_len);
        problem = problem.with(constraint!(
            olv.run_h >= min_bound - big_m_h * (1.0 - olv.present)
        ));
        problem = problem.with(constraint!(
            olv.seg_a_run >= params.min_run_hours as f64 - big_m_h * (1.0 - olv.present)
        ));
        problem = problem.with(constraint!(
            olv.seg_b_run >= params.min_run_hours as f64 - big_m_h * (1.0 - olv.seg_b_present)
        ));

        if !full_mode {
            problem = problem.with(constraint!(olv.seg_b_present == 0.0));
        }
    }

    // produced[o] = Σ_l round(rate) · run_h[l,o]; bounds.
    for &oidx in order_idxs {
        let order = &data.orders[oidx.value()];
        if order.is_trial() {
            continue;
        }
        let mut produced_expr = Expression::from(0.0);
        let mut present_sum = Expression::from(0.0);
        for (&(lidx, o2), olv) in &order_line_vars {
            if o2 != oidx {
                continue;
            }
            let rate = resolve_rate(data, lidx, &order.sku, month).round();
            produced_expr += rate * olv.run_h;
            present_sum += olv.present;
        }
        problem = problem.with(constraint!(produced_expr.clone() == produced_vars[&oidx]));
        let lower = if params.relax_demand { 0.0 } else { order.qty_min };
        problem = problem.with(constraint!(produced_vars[&oidx] >= lower));
        problem = problem.with(constraint!(produced_vars[&oidx] <= order.qty_max));
        problem = problem.with(constraint!(present_sum <= params.max_lines_per_order as f64));
    }

    // === max_line_run: the busiest line's total run hours, the primary
    // term of the SpreadLoad objective ===
    for &lidx in &lines_with_orders {
        let mut line_run = Expression::from(0.0);
        for (&(l, _oidx), olv) in &order_line_vars {
            if l == lidx {
                line_run += olv.run_h;
            }
        }
        problem = problem.with(constraint!(max_line_run >= line_run));
    }

    // === changeover ordering (first_* selector + pairwise b_ij +
    // successor chain) ===
    if changeovers_enabled {
        for &lidx in &lines_with_orders {
            let orders_on_line: Vec<OrderIdx> = pairs
                .iter()
                .filter(|(l, _)| *l == lidx)
                .map(|(_, o)| *o)
                .collect();

            let mut first_sum = Expression::from(0.0);
            for &oidx in &orders_on_line {
                if let Some(&fvar) = first_vars.get(&(lidx, oidx)) {
                    first_sum += fvar;
                    let olv = &order_line_vars[&(lidx, oidx)];
                    let initial = data.initial_state(lidx);
                    let initial_setup = if let Some(sku) = &initial.initial_sku {
                        data.changeover(sku, &data.orders[oidx.value()].sku).setup_hours
                    } else {
                        0.0
                    };
                    let extra = if initial.long_shutdown_flag {
                        initial.long_shutdown_extra_h as f64
                    } else {
                        0.0
                    };
                    problem = problem.with(constraint!(
                        olv.seg_a_start
                            >= initial.available_from_hour as f64 + initial_setup + extra
                                - big_m_h * (1.0 - fvar)
                    ));
                    problem = problem.with(constraint!(fvar <= olv.present));
                }
            }
            // At most one `first`; forced exactly one when the line is
            // non-empty is left to the solver via the objective pressure
            // plus the pairwise constraints below (an explicit equality
            // would over-constrain lines with zero orders present).
            problem = problem.with(constraint!(first_sum <= 1.0));

            for i in 0..orders_on_line.len() {
                for j in (i + 1)..orders_on_line.len() {
                    let oi = orders_on_line[i];
                    let oj = orders_on_line[j];
                    let pv = pair_vars[&(lidx, oi, oj)];
                    let olv_i = order_line_vars[&(lidx, oi)];
                    let olv_j = order_line_vars[&(lidx, oj)];
                    let co_ij = data
                        .changeover(&data.orders[oi.value()].sku, &data.orders[oj.value()].sku)
                        .setup_hours;
                    let co_ji = data
                        .changeover(&data.orders[oj.value()].sku, &data.orders[oi.value()].sku)
                        .setup_hours;

                    problem = problem.with(constraint!(
                        olv_j.seg_a_start
                            >= olv_i.eff_end + co_ij - big_m_h * (1.0 - pv.order_before)
                    ));
                    problem = problem.with(constraint!(
                        olv_i.seg_a_start
                            >= olv_j.eff_end + co_ji - big_m_h * pv.order_before
                    ));

                    problem = problem.with(constraint!(pv.succ_i_before_j <= pv.order_before));
                    problem = problem.with(constraint!(pv.succ_j_before_i <= 1.0 - pv.order_before));
                    problem = problem.with(constraint!(pv.succ_i_before_j <= olv_i.present));
                    problem = problem.with(constraint!(pv.succ_i_before_j <= olv_j.present));
                    problem = problem.with(constraint!(pv.succ_j_before_i <= olv_i.present));
                    problem = problem.with(constraint!(pv.succ_j_before_i <= olv_j.present));
                }
            }

            // Each order has at most one outgoing and one incoming
            // successor; total successor count equals present_count − 1
            // when the line is non-empty.
            let mut present_count = Expression::from(0.0);
            let mut succ_total = Expression::from(0.0);
            for &oidx in &orders_on_line {
                let mut outgoing = Expression::from(0.0);
                let mut incoming = Expression::from(0.0);
                for &other in &orders_on_line {
                    if other == oidx {
                        continue;
                    }
                    let (lo, hi) = if oidx.value() < other.value() {
                        (oidx, other)
                    } else {
                        (other, oidx)
                    };
                    if let Some(pv) = pair_vars.get(&(lidx, lo, hi)) {
                        if lo == oidx {
                            outgoing += pv.succ_i_before_j;
                            incoming += pv.succ_j_before_i;
                        } else {
                            outgoing += pv.succ_j_before_i;
                            incoming += pv.succ_i_before_j;
                        }
                    }
                }
                problem = problem.with(constraint!(outgoing <= 1.0));
                problem = problem.with(constraint!(incoming <= 1.0));
                succ_total += outgoing;
                present_count += order_line_vars[&(lidx, oidx)].present;
            }
            problem = problem.with(constraint!(succ_total <= present_count.clone()));
        }
    }

    // === Week-0/Week-1 coupling ===
    if params.allow_week1_in_week0 {
        for &lidx in &lines_with_orders {
            let w0_var = w0_last_end[&lidx];
            let w1_var = w1_first_start[&lidx];
            let mut has_w0 = false;
            let mut has_w1 = false;
            for (&(l, oidx), olv) in &order_line_vars {
                if l != lidx {
                    continue;
                }
                let order = &data.orders[oidx.value()];
                if order.due_end <= sched_core::WEEK0_END_H {
                    has_w0 = true;
                    // w0_var pinned to >= every present week-0 order's own
                    // end, i.e. the line's actual last week-0 finish.
                    problem = problem.with(constraint!(
                        w0_var >= olv.eff_end - big_m_h * (1.0 - olv.present)
                    ));
                } else if order.due_start >= sched_core::WEEK1_START_H {
                    has_w1 = true;
                    // w1_var pinned to <= every present week-1 order's own
                    // start, i.e. the line's actual earliest week-1 start.
                    problem = problem.with(constraint!(
                        w1_var <= olv.seg_a_start + big_m_h * (1.0 - olv.present)
                    ));
                }
            }
            if has_w0 && has_w1 {
                problem = problem.with(constraint!(w1_var - w0_var <= 1.0));
            }
        }
    }

    // === CIP as first-class intervals (full mode only) ===
    if full_mode {
        for &lidx in &lines_with_orders {
            let cv = cip_vars[&lidx];
            let interval = data.cip_interval_h(params, lidx) as f64;
            let duration = params.cip_duration_h as f64;
            let initial = data.initial_state(lidx);
            let carry = initial.carryover_h_since_last_cip as f64;

            let first_start_var = cip_first_start[&lidx];
            let last_end_var = cip_last_end[&lidx];
            let mut run_sum = Expression::from(0.0);
            let mut orders_on_line: Vec<OrderIdx> = Vec::new();
            for (&(l, oidx), olv) in &order_line_vars {
                if l == lidx {
                    orders_on_line.push(oidx);
                    run_sum += olv.run_h;
                    // Pin the aggregates to the true min/max over every
                    // present order on the line, not whichever one a
                    // HashMap iteration happened to visit last.
                    problem = problem.with(constraint!(
                        first_start_var <= olv.seg_a_start + big_m_h * (1.0 - olv.present)
                    ));
                    problem = problem.with(constraint!(
                        last_end_var >= olv.eff_end - big_m_h * (1.0 - olv.present)
                    ));
                }
            }
            let clock_span = Expression::from(last_end_var) - Expression::from(first_start_var);

            problem = problem.with(constraint!(cv.present[1] <= cv.present[0]));
            problem = problem.with(constraint!(cv.present[2] <= cv.present[1]));

            // present[k] true iff clock_span + carry >= (k+1) * interval,
            // modeled in both directions: the forward half forces the span
            // to be large whenever present[k] is claimed, the reverse half
            // forces present[k]=1 whenever the span actually requires it —
            // without the reverse half the solver can leave every present[k]
            // at 0 and let a single unsplit run absorb the whole horizon.
            for k in 0..3 {
                let threshold = (k as f64 + 1.0) * interval;
                problem = problem.with(constraint!(
                    clock_span.clone() + carry - threshold >= -big_m_h * (1.0 - cv.present[k])
                ));
                problem = problem.with(constraint!(
                    clock_span.clone() + carry - threshold <= big_m_h * cv.present[k]
                ));
            }

            for k in 0..3 {
                problem = problem.with(constraint!(cv.end[k] == cv.start[k] + duration * cv.present[k]));
            }
            let available_from = initial.available_from_hour as f64;
            problem = problem.with(constraint!(cv.start[0] >= available_from));
            problem = problem.with(constraint!(
                cv.start[0] <= available_from + (interval - carry) + big_m_h * (1.0 - cv.present[0])
            ));
            if let Some(last_cip_end_dt) = initial.last_cip_end_wallclock {
                let absolute_last_cip_end_hour =
                    sched_core::time::datetime_to_hour(params.planning_start_date, last_cip_end_dt);
                problem = problem.with(constraint!(
                    cv.start[0] <= absolute_last_cip_end_hour as f64 + interval
                        + big_m_h * (1.0 - cv.present[0])
                ));
            }
            for k in 1..3 {
                // Unconditional (not gated on `present[k]`) so degenerate
                // slots still chain `end` monotonically; `last_cip_end`
                // below relies on that to always mean "the end of the
                // last CIP actually taken".
                problem = problem.with(constraint!(cv.start[k] >= cv.end[k - 1]));
                problem = problem.with(constraint!(
                    cv.start[k] <= cv.end[k - 1] + interval + big_m_h * (1.0 - cv.present[k])
                ));
            }

            let downtime_hours: f64 = data.downtimes_for(lidx).map(|d| (d.end_hour - d.start_hour) as f64).sum();
            let available_hours = params.horizon_h as f64 - available_from - downtime_hours;
            let mut cip_hours_sum = Expression::from(0.0);
            for k in 0..3 {
                cip_hours_sum += duration * cv.present[k];
            }
            problem = problem.with(constraint!(run_sum + cip_hours_sum <= available_hours));

            // Tail coverage: last production end − last CIP end ≤ I. Since
            // `end` chains monotonically regardless of `present` (above),
            // `end[2]` is always the end of the last CIP actually taken
            // (a run of zero-duration degenerate slots simply passes the
            // clock through unchanged).
            problem = problem.with(constraint!(Expression::from(last_end_var) - cv.end[2] <= interval));

            // Split coupling: seg_b_present ⇒ some CIP slot k actually
            // separates seg_a from seg_b (seg_a ends at or before it opens,
            // seg_b starts at or after it closes) — not just any gap, the
            // same CIP window the threshold constraints above forced onto
            // the line.
            for &oidx in &orders_on_line {
                let olv = order_line_vars[&(lidx, oidx)];
                let mut selected_sum = Expression::from(0.0);
                for k in 0..3 {
                    let sel = split_select[&(lidx, oidx, k)];
                    selected_sum += sel;
                    problem = problem.with(constraint!(sel <= cv.present[k]));
                    problem = problem.with(constraint!(
                        olv.seg_a_end <= cv.start[k] + big_m_h * (1.0 - sel)
                    ));
                    problem = problem.with(constraint!(
                        olv.seg_b_start >= cv.end[k] - big_m_h * (1.0 - sel)
                    ));
                }
                problem = problem.with(constraint!(selected_sum == olv.seg_b_present));
            }
        }
    } else {
        for olv in order_line_vars.values() {
            problem = problem.with(constraint!(olv.seg_b_present == 0.0));
        }
    }

    // === NoOverlap over seg_a/seg_b/CIP/downtimes per line ===
    for (&lidx, blocks) in &no_overlap_blocks {
        let _ = lidx;
        for i in 0..blocks.len() {
            for j in (i + 1)..blocks.len() {
                let Some(&order_bin) = no_overlap_order.get(&(lidx, i, j)) else {
                    continue;
                };
                let start_i = block_start_expr(&blocks[i]);
                let end_i = block_end_expr(&blocks[i]);
                let start_j = block_start_expr(&blocks[j]);
                let end_j = block_end_expr(&blocks[j]);
                let gate_i = blocks[i].present.map(Expression::from).unwrap_or_else(|| Expression::from(1.0));
                let gate_j = blocks[j].present.map(Expression::from).unwrap_or_else(|| Expression::from(1.0));

                // i before j: start_j >= end_i, relaxed by big-M whenever
                // either block is absent or j-before-i was picked instead.
                problem = problem.with(constraint!(
                    start_j.clone()
                        >= end_i.clone() - big_m_h * (1.0 - order_bin) - big_m_h * (1.0 - gate_i.clone())
                            - big_m_h * (1.0 - gate_j.clone())
                ));
                // j before i: start_i >= end_j, symmetric.
                problem = problem.with(constraint!(
                    start_i
                        >= end_j - big_m_h * order_bin - big_m_h * (1.0 - gate_i) - big_m_h * (1.0 - gate_j)
                ));
            }
        }
    }

    let solution = problem.solve();

    sink.on_solution(0.0, 0.0, "final");

    match solution {
        Ok(solution) => Ok(extract_output(
            params,
            data,
            &order_line_vars,
            &cip_vars,
            &produced_vars,
            &solution,
        )),
        Err(e) => {
            tracing::warn!(error = ?e, "HiGHS returned no solution; treating as infeasible");
            Ok(ModelOutput {
                status: ModelStatus::Infeasible,
                objective: None,
                order_line: HashMap::new(),
                cip_windows: HashMap::new(),
                produced: HashMap::new(),
            })
        }
    }
}

fn block_start_expr(block: &NamedBlock) -> Expression {
    match block.start {
        BlockEnd::Variable(v) => v.into(),
        BlockEnd::Fixed(f) => Expression::from(f),
    }
}

fn block_end_expr(block: &NamedBlock) -> Expression {
    match block.end {
        BlockEnd::Variable(v) => v.into(),
        BlockEnd::Fixed(f) => Expression::from(f),
    }
}

fn extract_output(
    _params: &Params,
    data: &Data,
    order_line_vars: &HashMap<(LineIdx, OrderIdx), OrderLineVars>,
    cip_vars: &HashMap<LineIdx, CipVars>,
    produced_vars: &HashMap<OrderIdx, Variable>,
    solution: &impl Solution,
) -> ModelOutput {
    let mut order_line = HashMap::new();
    for (&key, olv) in order_line_vars {
        let present = solution.value(olv.present) > 0.5;
        let seg_a = if present && solution.value(olv.seg_a_run) > EPS {
            Some(ResolvedSegment {
                start: solution.value(olv.seg_a_start).round() as i64,
                end: solution.value(olv.seg_a_end).round() as i64,
                run: solution.value(olv.seg_a_run).round() as i64,
            })
        } else {
            None
        };
        let seg_b = if solution.value(olv.seg_b_present) > 0.5 && solution.value(olv.seg_b_run) > EPS {
            Some(ResolvedSegment {
                start: solution.value(olv.seg_b_start).round() as i64,
                end: solution.value(olv.seg_b_end).round() as i64,
                run: solution.value(olv.seg_b_run).round() as i64,
            })
        } else {
            None
        };
        order_line.insert(key, ResolvedOrderLine { present, seg_a, seg_b });
    }

    let mut cip_windows: HashMap<LineIdx, Vec<(i64, i64)>> = HashMap::new();
    for (&lidx, cv) in cip_vars {
        let mut windows = Vec::new();
        for k in 0..3 {
            if solution.value(cv.present[k]) > 0.5 {
                windows.push((
                    solution.value(cv.start[k]).round() as i64,
                    solution.value(cv.end[k]).round() as i64,
                ));
            }
        }
        if !windows.is_empty() {
            cip_windows.insert(lidx, windows);
        }
    }

    let mut produced = HashMap::new();
    for (&oidx, &pv) in produced_vars {
        produced.insert(oidx, solution.value(pv));
    }
    let _ = data;

    ModelOutput {
        status: ModelStatus::Feasible,
        objective: None,
        order_line,
        cip_windows,
        produced,
    }
}
