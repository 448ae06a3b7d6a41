use std::path::Path;

use sched_core::{
    CipWindowRow, NextInitialStateRow, ProducedVsBoundsRow, ScheduleResult, ScheduleRow,
    SolverKpis, SolverProgress,
};

use crate::atomic::write_atomic;

fn write_csv_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> ScheduleResult<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    write_atomic(path, &bytes)
}

pub fn write_schedule(path: &Path, rows: &[ScheduleRow]) -> ScheduleResult<()> {
    write_csv_rows(path, rows)
}

pub fn write_produced_vs_bounds(path: &Path, rows: &[ProducedVsBoundsRow]) -> ScheduleResult<()> {
    write_csv_rows(path, rows)
}

pub fn write_cip_windows(path: &Path, rows: &[CipWindowRow]) -> ScheduleResult<()> {
    write_csv_rows(path, rows)
}

pub fn write_next_initial_states(path: &Path, rows: &[NextInitialStateRow]) -> ScheduleResult<()> {
    write_csv_rows(path, rows)
}

/// Plain-text KPI file: one status line plus an optional summary.
pub fn write_solver_kpis(path: &Path, kpis: &[SolverKpis]) -> ScheduleResult<()> {
    let mut text = String::new();
    for kpi in kpis {
        text.push_str(&format!("phase={} status={}", kpi.phase, kpi.status));
        if let Some(obj) = kpi.objective {
            text.push_str(&format!(" objective={obj}"));
        }
        if let Some(bound) = kpi.best_bound {
            text.push_str(&format!(" best_bound={bound}"));
        }
        text.push_str(&format!(" wall_time_secs={:.2}", kpi.wall_time_secs));
        text.push('\n');
        if let Some(summary) = &kpi.summary {
            text.push_str(summary);
            text.push('\n');
        }
    }
    write_atomic(path, text.as_bytes())
}

pub fn write_solver_progress(path: &Path, progress: &SolverProgress) -> ScheduleResult<()> {
    let bytes = serde_json::to_vec_pretty(progress)?;
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sched_core::SolveStatus;

    fn dt(hour: i64) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::hours(hour)
    }

    #[test]
    fn writes_schedule_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.csv");
        let rows = vec![ScheduleRow {
            line_id: 1,
            line_name: "L1".into(),
            order_id: "O1".into(),
            sku: "A".into(),
            start_hour: 0,
            end_hour: 4,
            run_hours: 4,
            start_dt: dt(0),
            end_dt: dt(4),
            is_trial: false,
        }];
        write_schedule(&path, &rows).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("O1"));
        assert!(contents.contains("L1"));
    }

    #[test]
    fn writes_kpis_as_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver_kpis.txt");
        let kpis = vec![SolverKpis {
            phase: "week0".into(),
            status: SolveStatus::Optimal,
            objective: Some(12.0),
            best_bound: Some(12.0),
            wall_time_secs: 1.5,
            summary: None,
        }];
        write_solver_kpis(&path, &kpis).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("status=OPTIMAL"));
        assert!(contents.contains("phase=week0"));
    }

    #[test]
    fn writes_progress_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver_progress.json");
        let progress = SolverProgress::default();
        write_solver_progress(&path, &progress).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"stages\""));
    }
}
