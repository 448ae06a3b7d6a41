//! Derives next-horizon initial line states from a solved schedule.

use chrono::NaiveDateTime;
use sched_core::{CipWindowRow, Data, LineIdx, NextInitialStateRow, ScheduleRow, CLEAN};

/// Whether `available_from` should reflect the literal schedule tail
/// (used when stitching Week-0 into Week-1) or be reset to zero (used for
/// the final rolling-horizon seed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailableFromMode {
    ScheduleTail,
    Zero,
}

pub fn derive_initial_states(
    data: &Data,
    schedule: &[ScheduleRow],
    cip_windows: &[CipWindowRow],
    anchor: NaiveDateTime,
    interval_h: i64,
    mode: AvailableFromMode,
) -> Vec<NextInitialStateRow> {
    data.lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let lidx = LineIdx::new(i);
            let line_rows: Vec<&ScheduleRow> = schedule.iter().filter(|r| r.line_id == line.line_id).collect();
            let line_cips: Vec<&CipWindowRow> = cip_windows.iter().filter(|c| c.line_id == line.line_id).collect();

            let last_row = line_rows.iter().max_by_key(|r| r.end_hour);
            let initial_sku = last_row.map(|r| r.sku.clone()).unwrap_or_else(|| CLEAN.to_string());
            let last_production_end = last_row.map(|r| r.end_hour).unwrap_or(0);

            let last_cip = line_cips.iter().max_by_key(|c| c.end_hour);
            let last_cip_end_hour = last_cip.map(|c| c.end_hour).unwrap_or(0);

            let hours_since_cip = (last_production_end - last_cip_end_hour).max(0);
            let carryover = hours_since_cip.clamp(0, (interval_h - 1).max(0));

            let available_from_hour = match mode {
                AvailableFromMode::ScheduleTail => last_production_end.max(last_cip_end_hour),
                AvailableFromMode::Zero => 0,
            };

            let initial = data.initial_state(lidx);
            NextInitialStateRow {
                line_id: line.line_id,
                initial_sku,
                available_from_hour,
                long_shutdown_flag: false,
                long_shutdown_extra_setup_hours: initial.long_shutdown_extra_h,
                carryover_run_hours_since_last_cip_at_t0: carryover,
                last_cip_end_datetime: last_cip.map(|c| sched_core::time::hour_to_datetime(anchor, c.end_hour)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sched_core::Line;

    fn anchor() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(6, 0, 0).unwrap()
    }

    #[test]
    fn carries_latest_sku_and_clamps_carryover() {
        let mut data = Data::default();
        data.lines.push(Line { line_id: 1, name: "L1".into() });
        let schedule = vec![ScheduleRow {
            line_id: 1,
            line_name: "L1".into(),
            order_id: "O1".into(),
            sku: "A".into(),
            start_hour: 0,
            end_hour: 130,
            run_hours: 130,
            start_dt: anchor(),
            end_dt: anchor(),
            is_trial: false,
        }];
        let rows = derive_initial_states(&data, &schedule, &[], anchor(), 120, AvailableFromMode::ScheduleTail);
        assert_eq!(rows[0].initial_sku, "A");
        assert_eq!(rows[0].carryover_run_hours_since_last_cip_at_t0, 119);
        assert_eq!(rows[0].available_from_hour, 130);
    }

    #[test]
    fn clean_line_with_no_production() {
        let mut data = Data::default();
        data.lines.push(Line { line_id: 2, name: "L2".into() });
        let rows = derive_initial_states(&data, &[], &[], anchor(), 120, AvailableFromMode::Zero);
        assert_eq!(rows[0].initial_sku, CLEAN);
        assert_eq!(rows[0].available_from_hour, 0);
    }
}
