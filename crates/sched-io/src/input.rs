//! CSV ingestion for the seven input tables: one loader per table, each
//! tolerant of optional columns and reporting the exact row and column
//! name on a parse failure. Covers the percentage-vs-direct demand bounds
//! split, the `order_id` auto-generation rule, and the `CLEAN` sentinel.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;
use sched_core::{
    ChangeoverEntry, Data, Downtime, InitialState, Line, ScheduleError, ScheduleResult, TrialInfo,
    CLEAN,
};

/// One parsed CSV table: header name → column index, plus the raw rows.
struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

fn read_table(path: &Path) -> ScheduleResult<Table> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_string(), i))
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?);
    }
    Ok(Table { columns, rows })
}

impl Table {
    fn get<'a>(&self, row: &'a StringRecord, column: &str) -> Option<&'a str> {
        self.columns
            .get(column)
            .and_then(|&idx| row.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn require<'a>(&self, row: &'a StringRecord, column: &str, table_name: &str, row_no: usize) -> ScheduleResult<&'a str> {
        self.get(row, column).ok_or_else(|| {
            ScheduleError::Input(format!(
                "{table_name} row {row_no}: missing required column `{column}`"
            ))
        })
    }
}

fn parse_int(table_name: &str, row_no: usize, column: &str, raw: &str) -> ScheduleResult<i64> {
    raw.parse::<f64>().map(|v| v.round() as i64).map_err(|_| {
        ScheduleError::Input(format!(
            "{table_name} row {row_no}: `{column}` = `{raw}` is not a number"
        ))
    })
}

fn parse_float(table_name: &str, row_no: usize, column: &str, raw: &str) -> ScheduleResult<f64> {
    raw.parse::<f64>().map_err(|_| {
        ScheduleError::Input(format!(
            "{table_name} row {row_no}: `{column}` = `{raw}` is not a number"
        ))
    })
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "True" | "TRUE" | "yes")
}

fn parse_datetime(table_name: &str, row_no: usize, column: &str, raw: &str) -> ScheduleResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map_err(|_| {
        ScheduleError::Input(format!(
            "{table_name} row {row_no}: `{column}` = `{raw}` is not a parseable datetime"
        ))
    })
}

/// Loads `capabilities_rates.csv` (and registers every distinct line it
/// mentions), `line_rates.csv` (optional), and `line_cip_hrs.csv`
/// (optional) into `data`.
pub fn load_capabilities(
    data: &mut Data,
    capabilities_path: &Path,
    line_rates_path: Option<&Path>,
    line_cip_hrs_path: Option<&Path>,
) -> ScheduleResult<()> {
    let table = read_table(capabilities_path)?;
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 2; // header is row 1
        let line_id = parse_int("capabilities_rates", row_no, "line_id", table.require(row, "line_id", "capabilities_rates", row_no)?)?;
        let line_name = table.require(row, "line_name", "capabilities_rates", row_no)?.to_string();
        let sku = table.require(row, "sku", "capabilities_rates", row_no)?.to_string();
        let capable = parse_bool(table.require(row, "capable", "capabilities_rates", row_no)?);
        let rate = parse_float(
            "capabilities_rates",
            row_no,
            "calc_rate_kgph",
            table.require(row, "calc_rate_kgph", "capabilities_rates", row_no)?,
        )?;

        let line_idx = match data.line_idx_by_id(line_id) {
            Some(idx) => idx,
            None => {
                data.lines.push(Line { line_id, name: line_name });
                sched_core::LineIdx::new(data.lines.len() - 1)
            }
        };
        data.capabilities.insert(
            (line_idx, sku),
            sched_core::Capability {
                capable,
                base_rate_kgph: rate,
            },
        );
    }

    if let Some(path) = line_rates_path {
        let table = read_table(path)?;
        for (i, row) in table.rows.iter().enumerate() {
            let row_no = i + 2;
            let line_id = parse_int("line_rates", row_no, "line_id", table.require(row, "line_id", "line_rates", row_no)?)?;
            let month = parse_int("line_rates", row_no, "Month", table.require(row, "Month", "line_rates", row_no)?)? as u32;
            let rate = parse_float("line_rates", row_no, "rate_kgph", table.require(row, "rate_kgph", "line_rates", row_no)?)?;
            if let Some(line_idx) = data.line_idx_by_id(line_id) {
                data.rate_overrides.insert((line_idx, month), rate);
            }
        }
    }

    if let Some(path) = line_cip_hrs_path {
        let table = read_table(path)?;
        for (i, row) in table.rows.iter().enumerate() {
            let row_no = i + 2;
            let line_id = parse_int("line_cip_hrs", row_no, "line_id", table.require(row, "line_id", "line_cip_hrs", row_no)?)?;
            let hrs = parse_int("line_cip_hrs", row_no, "max_cip_hrs", table.require(row, "max_cip_hrs", "line_cip_hrs", row_no)?)?;
            if let Some(line_idx) = data.line_idx_by_id(line_id) {
                data.cip_hrs_overrides.insert(line_idx, hrs);
            }
        }
    }

    Ok(())
}

pub fn load_changeovers(data: &mut Data, path: &Path) -> ScheduleResult<()> {
    let table = read_table(path)?;
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 2;
        let from_sku = table.require(row, "from_sku", "changeovers", row_no)?.to_string();
        let to_sku = table.require(row, "to_sku", "changeovers", row_no)?.to_string();
        let setup_hours = parse_float(
            "changeovers",
            row_no,
            "setup_hours",
            table.require(row, "setup_hours", "changeovers", row_no)?,
        )?;
        let int_col = |col: &str| -> ScheduleResult<i64> {
            match table.get(row, col) {
                Some(raw) => parse_int("changeovers", row_no, col, raw),
                None => Ok(0),
            }
        };
        data.changeovers.insert(
            (from_sku, to_sku),
            ChangeoverEntry {
                setup_hours,
                ttp: int_col("ttp_change")?,
                ffs: int_col("ffs_change")?,
                topload: int_col("topload_change")?,
                casepacker: int_col("casepacker_change")?,
                conv_to_org: int_col("conv_to_org_change")?,
                cinn_to_non: int_col("cinn_to_non")?,
                added_flavors: int_col("added_flavors")?,
            },
        );
    }
    Ok(())
}

pub fn load_initial_states(data: &mut Data, path: &Path) -> ScheduleResult<()> {
    let table = read_table(path)?;
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 2;
        let line_id = parse_int("initial_states", row_no, "line_id", table.require(row, "line_id", "initial_states", row_no)?)?;
        let Some(line_idx) = data.line_idx_by_id(line_id) else {
            return Err(ScheduleError::Input(format!(
                "initial_states row {row_no}: unknown line_id {line_id}"
            )));
        };
        let initial_sku_raw = table.get(row, "initial_sku").unwrap_or(CLEAN);
        let initial_sku = if initial_sku_raw.eq_ignore_ascii_case(CLEAN) {
            None
        } else {
            Some(initial_sku_raw.to_string())
        };
        let available_from_hour = match table.get(row, "available_from_hour") {
            Some(raw) => parse_int("initial_states", row_no, "available_from_hour", raw)?,
            None => 0,
        };
        let long_shutdown_flag = table
            .get(row, "long_shutdown_flag")
            .map(parse_bool)
            .unwrap_or(false);
        let long_shutdown_extra_h = match table.get(row, "long_shutdown_extra_setup_hours") {
            Some(raw) => parse_int("initial_states", row_no, "long_shutdown_extra_setup_hours", raw)?,
            None => 0,
        };
        let carryover_h_since_last_cip = match table.get(row, "carryover_run_hours_since_last_cip_at_t0") {
            Some(raw) => parse_int(
                "initial_states",
                row_no,
                "carryover_run_hours_since_last_cip_at_t0",
                raw,
            )?,
            None => 0,
        };
        let last_cip_end_wallclock = match table.get(row, "last_cip_end_datetime") {
            Some(raw) => Some(parse_datetime("initial_states", row_no, "last_cip_end_datetime", raw)?),
            None => None,
        };
        data.initial_states.insert(
            line_idx,
            InitialState {
                initial_sku,
                available_from_hour,
                long_shutdown_flag,
                long_shutdown_extra_h,
                carryover_h_since_last_cip,
                last_cip_end_wallclock,
            },
        );
    }
    Ok(())
}

pub fn load_downtimes(data: &mut Data, path: &Path) -> ScheduleResult<()> {
    let table = read_table(path)?;
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 2;
        let line_id = parse_int("downtimes", row_no, "line_id", table.require(row, "line_id", "downtimes", row_no)?)?;
        let Some(line_idx) = data.line_idx_by_id(line_id) else {
            return Err(ScheduleError::Input(format!(
                "downtimes row {row_no}: unknown line_id {line_id}"
            )));
        };
        let start_hour = parse_int("downtimes", row_no, "start_hour", table.require(row, "start_hour", "downtimes", row_no)?)?;
        let end_hour = parse_int("downtimes", row_no, "end_hour", table.require(row, "end_hour", "downtimes", row_no)?)?;
        data.downtimes.push(Downtime {
            line: line_idx,
            start_hour,
            end_hour,
        });
    }
    Ok(())
}

/// Parses `demand_plan.csv` into orders. Quantity bounds come from either
/// `(qty_target, lower_pct, upper_pct)` or direct `(qty_min, qty_max)`,
/// erroring when neither is present. `order_id`, when absent, is
/// auto-generated as `W{week_index}-{sku}`.
pub fn load_demand_plan(data: &mut Data, path: &Path) -> ScheduleResult<()> {
    let table = read_table(path)?;
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 2;
        let sku = table.require(row, "sku", "demand_plan", row_no)?.to_string();
        let due_start = parse_int("demand_plan", row_no, "due_start_hour", table.require(row, "due_start_hour", "demand_plan", row_no)?)?;
        let due_end = parse_int("demand_plan", row_no, "due_end_hour", table.require(row, "due_end_hour", "demand_plan", row_no)?)?;
        let priority = match table.get(row, "priority") {
            Some(raw) => parse_int("demand_plan", row_no, "priority", raw)?,
            None => 0,
        };
        let week_index = match table.get(row, "week_index") {
            Some(raw) => parse_int("demand_plan", row_no, "week_index", raw)?,
            None => 0,
        };

        let (qty_min, qty_max) = if let (Some(min_raw), Some(max_raw)) =
            (table.get(row, "qty_min"), table.get(row, "qty_max"))
        {
            (
                parse_float("demand_plan", row_no, "qty_min", min_raw)?,
                parse_float("demand_plan", row_no, "qty_max", max_raw)?,
            )
        } else if let Some(target_raw) = table.get(row, "qty_target") {
            let target = parse_float("demand_plan", row_no, "qty_target", target_raw)?;
            let lower_pct = match table.get(row, "lower_pct") {
                Some(raw) => parse_float("demand_plan", row_no, "lower_pct", raw)?,
                None => 0.0,
            };
            let upper_pct = match table.get(row, "upper_pct") {
                Some(raw) => parse_float("demand_plan", row_no, "upper_pct", raw)?,
                None => 0.0,
            };
            (target * (1.0 - lower_pct), target * (1.0 + upper_pct))
        } else {
            return Err(ScheduleError::Input(format!(
                "demand_plan row {row_no}: must supply either (qty_min, qty_max) or (qty_target, lower_pct, upper_pct)"
            )));
        };

        let order_id = table
            .get(row, "order_id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("W{week_index}-{sku}"));

        data.orders.push(sched_core::Order {
            order_id,
            sku,
            due_start,
            due_end,
            qty_min,
            qty_max,
            priority,
            trial: None,
        });
    }
    Ok(())
}

/// Parses `trials.csv`. Trial order ids are synthesized as `TRIAL-{n}` in
/// file order. Hours are derived from datetimes relative to `anchor`.
pub fn load_trials(
    data: &mut Data,
    path: &Path,
    anchor: NaiveDateTime,
) -> ScheduleResult<()> {
    let table = read_table(path)?;
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 2;
        let line_name = table.require(row, "line_name", "trials", row_no)?;
        let Some(line_idx) = data.line_idx_by_name(line_name) else {
            return Err(ScheduleError::Input(format!(
                "trials row {row_no}: unknown line_name `{line_name}`"
            )));
        };
        let sku = table.require(row, "sku", "trials", row_no)?.to_string();
        let start_dt = parse_datetime(
            "trials",
            row_no,
            "start_datetime",
            table.require(row, "start_datetime", "trials", row_no)?,
        )?;
        let start_hour = sched_core::time::datetime_to_hour(anchor, start_dt);

        let end_hour = match table.get(row, "end_datetime") {
            Some(raw) => Some(sched_core::time::datetime_to_hour(
                anchor,
                parse_datetime("trials", row_no, "end_datetime", raw)?,
            )),
            None => None,
        };
        let target_kgs = match table.get(row, "target_kgs") {
            Some(raw) => Some(parse_float("trials", row_no, "target_kgs", raw)?),
            None => None,
        };
        if end_hour.is_none() && target_kgs.is_none() {
            return Err(ScheduleError::Input(format!(
                "trials row {row_no}: must supply end_datetime or target_kgs"
            )));
        }

        let order_id = format!("TRIAL-{}", i + 1);
        data.orders.push(sched_core::Order {
            order_id,
            sku,
            due_start: start_hour,
            due_end: end_hour.unwrap_or(start_hour),
            qty_min: 0.0,
            qty_max: target_kgs.unwrap_or(f64::MAX),
            priority: 0,
            trial: Some(TrialInfo {
                pinned_line: line_idx,
                start_hour,
                end_hour,
                run_hours: None,
                target_kgs,
            }),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_capabilities_and_registers_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "capabilities_rates.csv",
            "line_id,line_name,sku,capable,calc_rate_kgph\n1,L1,A,1,100\n1,L1,B,0,0\n",
        );
        let mut data = Data::default();
        load_capabilities(&mut data, &path, None, None).unwrap();
        assert_eq!(data.lines.len(), 1);
        let line_idx = data.line_idx_by_id(1).unwrap();
        assert!(data.capability(line_idx, "A").unwrap().capable);
        assert!(!data.capability(line_idx, "B").unwrap().capable);
    }

    #[test]
    fn demand_plan_direct_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "demand_plan.csv",
            "order_id,sku,due_start_hour,due_end_hour,qty_min,qty_max,priority\nO1,A,0,335,400,400,1\n",
        );
        let mut data = Data::default();
        load_demand_plan(&mut data, &path).unwrap();
        assert_eq!(data.orders.len(), 1);
        assert_eq!(data.orders[0].qty_min, 400.0);
        assert_eq!(data.orders[0].order_id, "O1");
    }

    #[test]
    fn demand_plan_percentage_bounds_and_autogenerated_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "demand_plan.csv",
            "sku,due_start_hour,due_end_hour,qty_target,lower_pct,upper_pct,week_index\nA,0,167,1000,0.1,0.1,0\n",
        );
        let mut data = Data::default();
        load_demand_plan(&mut data, &path).unwrap();
        assert_eq!(data.orders[0].order_id, "W0-A");
        assert_eq!(data.orders[0].qty_min, 900.0);
        assert_eq!(data.orders[0].qty_max, 1100.0);
    }

    #[test]
    fn demand_plan_missing_both_bound_styles_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "demand_plan.csv",
            "sku,due_start_hour,due_end_hour\nA,0,167\n",
        );
        let mut data = Data::default();
        let err = load_demand_plan(&mut data, &path).unwrap_err();
        assert!(err.to_string().contains("qty_min"));
    }

    #[test]
    fn initial_states_clean_sentinel_becomes_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "initial_states.csv",
            "line_id,initial_sku,available_from_hour,long_shutdown_flag,long_shutdown_extra_setup_hours,carryover_run_hours_since_last_cip_at_t0\n1,CLEAN,0,0,0,0\n",
        );
        let mut data = Data::default();
        data.lines.push(Line { line_id: 1, name: "L1".into() });
        load_initial_states(&mut data, &path).unwrap();
        let state = data.initial_state(sched_core::LineIdx::new(0));
        assert!(state.initial_sku.is_none());
    }

    #[test]
    fn trials_derive_hours_from_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "trials.csv",
            "line_name,sku,start_datetime,target_kgs\nL1,Z,2026-01-03 06:00:00,500\n",
        );
        let mut data = Data::default();
        data.lines.push(Line { line_id: 1, name: "L1".into() });
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        load_trials(&mut data, &path, anchor).unwrap();
        assert_eq!(data.orders.len(), 1);
        assert_eq!(data.orders[0].due_start, 48);
        assert!(data.orders[0].is_trial());
    }
}
