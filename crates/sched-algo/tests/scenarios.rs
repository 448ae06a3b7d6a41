use chrono::NaiveDate;
use sched_algo::{
    build_and_solve, extract_cip_windows, extract_produced_vs_bounds, extract_schedule,
    AccumulatingSink, ModelStatus, SolverConfig,
};
use sched_core::{
    Capability, ChangeoverEntry, Data, Downtime, Line, ObjectiveMode, Order, OrderIdx, Params,
};

fn anchor() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn base_params() -> Params {
    Params {
        planning_start_date: anchor(),
        objective_mode: ObjectiveMode::Balanced,
        ..Params::default()
    }
}

fn order(id: &str, sku: &str, due_start: i64, due_end: i64, qty_min: f64, qty_max: f64) -> Order {
    Order {
        order_id: id.to_string(),
        sku: sku.to_string(),
        due_start,
        due_end,
        qty_min,
        qty_max,
        priority: 0,
        trial: None,
    }
}

fn solve(params: &Params, data: &Data) -> sched_algo::ModelOutput {
    let order_idxs: Vec<OrderIdx> = (0..data.orders.len()).map(OrderIdx::new).collect();
    let config = SolverConfig::default();
    let mut sink = AccumulatingSink::default();
    build_and_solve(params, data, &order_idxs, &config, &mut sink).expect("solve must not error")
}

/// All rows on every line are pairwise non-overlapping (property 2).
fn assert_no_overlap(schedule: &[sched_core::ScheduleRow]) {
    let mut by_line: std::collections::HashMap<i64, Vec<&sched_core::ScheduleRow>> =
        std::collections::HashMap::new();
    for row in schedule {
        by_line.entry(row.line_id).or_default().push(row);
    }
    for rows in by_line.values_mut() {
        rows.sort_by_key(|r| r.start_hour);
        for pair in rows.windows(2) {
            assert!(
                pair[0].end_hour <= pair[1].start_hour,
                "rows overlap: {:?} vs {:?}",
                pair[0],
                pair[1]
            );
        }
    }
}

/// S1 — single order, single line, clean start: the whole run lands at the
/// front of the horizon with no CIP in the way.
#[test]
fn s1_single_order_single_line_clean_start() {
    let mut data = Data::default();
    data.lines.push(Line { line_id: 1, name: "L1".into() });
    data.capabilities.insert(
        (sched_core::LineIdx::new(0), "A".to_string()),
        Capability { capable: true, base_rate_kgph: 100.0 },
    );
    data.orders.push(order("O1", "A", 0, 335, 400.0, 400.0));

    let params = base_params();
    let output = solve(&params, &data);
    assert_eq!(output.status, ModelStatus::Feasible);

    let schedule = extract_schedule(&data, &output, params.planning_start_date, 0);
    assert_eq!(schedule.len(), 1);
    let row = &schedule[0];
    assert_eq!(row.run_hours, 4);
    assert_eq!(row.end_hour - row.start_hour, row.run_hours);
    assert_eq!(row.start_hour, 0);

    let produced = extract_produced_vs_bounds(&data, &output, &[OrderIdx::new(0)]);
    assert_eq!(produced[0].produced, 400.0);
    assert!(produced[0].in_bounds);

    let cips = extract_cip_windows(&data, &output, &schedule, params.cip_interval_h, params.cip_duration_h);
    assert!(cips.is_empty());
}

/// S2 — a run long enough to cross the CIP interval gets split by exactly
/// one CIP window, and the two segments still sum to the full quantity.
#[test]
fn s2_cip_splits_a_long_run() {
    let mut data = Data::default();
    data.lines.push(Line { line_id: 1, name: "L1".into() });
    data.capabilities.insert(
        (sched_core::LineIdx::new(0), "A".to_string()),
        Capability { capable: true, base_rate_kgph: 100.0 },
    );
    data.orders.push(order("O1", "A", 0, 335, 15000.0, 15000.0));

    let mut params = base_params();
    params.cip_interval_h = 120;
    params.cip_duration_h = 6;

    let output = solve(&params, &data);
    assert_eq!(output.status, ModelStatus::Feasible);

    let schedule = extract_schedule(&data, &output, params.planning_start_date, 0);
    assert_no_overlap(&schedule);
    let total_run: i64 = schedule.iter().map(|r| r.run_hours).sum();
    assert_eq!(total_run, 150);

    let cips = extract_cip_windows(&data, &output, &schedule, params.cip_interval_h, params.cip_duration_h);
    assert_eq!(cips.len(), 1);
    assert_eq!(cips[0].end_hour - cips[0].start_hour, 6);

    let produced = extract_produced_vs_bounds(&data, &output, &[OrderIdx::new(0)]);
    assert_eq!(produced[0].produced, 15000.0);
}

/// S3 — a changeover that a CIP window already covers costs no extra
/// dead time: the gap between the two runs equals the CIP's own length.
#[test]
fn s3_changeover_absorbed_by_cip_costs_no_extra_time() {
    let mut data = Data::default();
    data.lines.push(Line { line_id: 1, name: "L1".into() });
    let lidx = sched_core::LineIdx::new(0);
    data.capabilities.insert((lidx, "A".to_string()), Capability { capable: true, base_rate_kgph: 100.0 });
    data.capabilities.insert((lidx, "B".to_string()), Capability { capable: true, base_rate_kgph: 100.0 });
    data.changeovers.insert(
        ("A".to_string(), "B".to_string()),
        ChangeoverEntry { setup_hours: 4.0, ..ChangeoverEntry::default() },
    );
    data.orders.push(order("OA", "A", 0, 335, 12000.0, 12000.0));
    data.orders.push(order("OB", "B", 0, 335, 3000.0, 3000.0));

    let mut params = base_params();
    params.cip_interval_h = 120;
    params.cip_duration_h = 6;

    let output = solve(&params, &data);
    assert_eq!(output.status, ModelStatus::Feasible);

    let schedule = extract_schedule(&data, &output, params.planning_start_date, 0);
    assert_no_overlap(&schedule);
    let cips = extract_cip_windows(&data, &output, &schedule, params.cip_interval_h, params.cip_duration_h);

    // Total occupied time (runs + CIP) must not exceed runs + CIP duration;
    // the 4h setup never shows up as a separate, additional gap.
    let total_run: i64 = schedule.iter().map(|r| r.run_hours).sum();
    let total_cip: i64 = cips.iter().map(|c| c.end_hour - c.start_hour).sum();
    let last_end = schedule.iter().map(|r| r.end_hour).max().unwrap_or(0);
    let first_start = schedule.iter().map(|r| r.start_hour).min().unwrap_or(0);
    assert!(last_end - first_start <= total_run + total_cip);
}

/// S4 — max_lines_per_order caps how many lines a single order spreads
/// across, and every segment clears the minimum run length.
#[test]
fn s4_spread_respects_max_lines_per_order() {
    let mut data = Data::default();
    data.lines.push(Line { line_id: 1, name: "L1".into() });
    data.lines.push(Line { line_id: 2, name: "L2".into() });
    for lidx in [sched_core::LineIdx::new(0), sched_core::LineIdx::new(1)] {
        data.capabilities.insert((lidx, "A".to_string()), Capability { capable: true, base_rate_kgph: 100.0 });
    }
    data.orders.push(order("O1", "A", 0, 335, 20000.0, 20000.0));

    let mut params = base_params();
    params.max_lines_per_order = 2;

    let output = solve(&params, &data);
    assert_eq!(output.status, ModelStatus::Feasible);

    let schedule = extract_schedule(&data, &output, params.planning_start_date, 0);
    let lines_used: std::collections::HashSet<i64> = schedule.iter().map(|r| r.line_id).collect();
    assert!(lines_used.len() <= 2);
    for row in &schedule {
        assert!(row.run_hours >= params.min_run_hours);
    }
    let total_run: i64 = schedule.iter().map(|r| r.run_hours).sum();
    assert_eq!(total_run, 200);
}

/// S5 — Week-0/Week-1 orchestration: Week-1 work starts from wherever the
/// line actually finishes Week-0, not from the literal hour-168 boundary.
#[test]
fn s5_week1_starts_from_line_availability_not_the_calendar_boundary() {
    let mut data = Data::default();
    data.lines.push(Line { line_id: 1, name: "L1".into() });
    let lidx = sched_core::LineIdx::new(0);
    data.capabilities.insert((lidx, "A".to_string()), Capability { capable: true, base_rate_kgph: 100.0 });
    data.capabilities.insert((lidx, "B".to_string()), Capability { capable: true, base_rate_kgph: 100.0 });
    data.orders.push(order("OA", "A", 0, 167, 10000.0, 10000.0));
    data.orders.push(order("OB", "B", 168, 335, 10000.0, 10000.0));

    let params = base_params();
    let config = SolverConfig::default();
    let mut sink = AccumulatingSink::default();
    let outcome = sched_algo::run_two_phase(&params, &data, &config, &mut sink).unwrap();

    assert_no_overlap(&outcome.schedule);
    let week1_row = outcome
        .schedule
        .iter()
        .find(|r| r.order_id == "OB")
        .expect("week-1 order must be scheduled");
    assert!(week1_row.start_hour < 168, "week-1 work should start as soon as the line frees up, not wait for hour 168");
}

/// S6 — a downtime window blocks placement: no row overlaps it, and the
/// order's full quantity still gets produced around it.
#[test]
fn s6_downtime_blocks_placement() {
    let mut data = Data::default();
    data.lines.push(Line { line_id: 1, name: "L1".into() });
    let lidx = sched_core::LineIdx::new(0);
    data.capabilities.insert((lidx, "A".to_string()), Capability { capable: true, base_rate_kgph: 100.0 });
    data.downtimes.push(Downtime { line: lidx, start_hour: 50, end_hour: 70 });
    data.orders.push(order("O1", "A", 0, 335, 6000.0, 6000.0));

    let params = base_params();
    let output = solve(&params, &data);
    assert_eq!(output.status, ModelStatus::Feasible);

    let schedule = extract_schedule(&data, &output, params.planning_start_date, 0);
    for row in &schedule {
        assert!(
            row.end_hour <= 50 || row.start_hour >= 70,
            "row {:?} overlaps the downtime window [50, 70)",
            row
        );
    }
    let produced = extract_produced_vs_bounds(&data, &output, &[OrderIdx::new(0)]);
    assert_eq!(produced[0].produced, 6000.0);
}
