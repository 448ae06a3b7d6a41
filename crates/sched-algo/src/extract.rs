//! Converts a solved model into the shared output row types.

use chrono::NaiveDateTime;
use sched_core::{CipWindowRow, Data, LineIdx, OrderIdx, ProducedVsBoundsRow, ScheduleRow};

use crate::cip::{place_cip_windows, ProductionSegment};
use crate::model::ModelOutput;

/// `hour_offset` is added to every emitted hour column; callers stitching
/// Week-1 output onto Week-0 pass a non-zero offset, everyone else passes 0.
pub fn extract_schedule(
    data: &Data,
    output: &ModelOutput,
    anchor: NaiveDateTime,
    hour_offset: i64,
) -> Vec<ScheduleRow> {
    let mut rows = Vec::new();
    for (&(lidx, oidx), resolved) in &output.order_line {
        if !resolved.present {
            continue;
        }
        let order = &data.orders[oidx.value()];
        let line = &data.lines[lidx.value()];
        let mut push_segment = |start: i64, end: i64, run: i64| {
            rows.push(ScheduleRow {
                line_id: line.line_id,
                line_name: line.name.clone(),
                order_id: order.order_id.clone(),
                sku: order.sku.clone(),
                start_hour: start + hour_offset,
                end_hour: end + hour_offset,
                run_hours: run,
                start_dt: sched_core::time::hour_to_datetime(anchor, start + hour_offset),
                end_dt: sched_core::time::hour_to_datetime(anchor, end + hour_offset),
                is_trial: order.is_trial(),
            });
        };
        if let Some(seg) = resolved.seg_a {
            if seg.run > 0 {
                push_segment(seg.start, seg.end, seg.run);
            }
        }
        if let Some(seg) = resolved.seg_b {
            if seg.run > 0 {
                push_segment(seg.start, seg.end, seg.run);
            }
        }
    }
    rows.sort_by(|a, b| (a.line_id, a.start_hour).cmp(&(b.line_id, b.start_hour)));
    rows
}

pub fn extract_produced_vs_bounds(
    data: &Data,
    output: &ModelOutput,
    order_idxs: &[OrderIdx],
) -> Vec<ProducedVsBoundsRow> {
    order_idxs
        .iter()
        .filter_map(|&oidx| {
            let order = &data.orders[oidx.value()];
            if order.is_trial() {
                return None;
            }
            let produced = output.produced.get(&oidx).copied().unwrap_or(0.0);
            Some(ProducedVsBoundsRow {
                order_id: order.order_id.clone(),
                sku: order.sku.clone(),
                produced,
                qty_min: order.qty_min,
                qty_max: order.qty_max,
                in_bounds: produced >= order.qty_min && produced <= order.qty_max,
            })
        })
        .collect()
}

/// Extracts CIP windows from the model's own interval variables when
/// present; otherwise reconstructs per-line production segments from
/// `schedule` and runs the fallback placer.
pub fn extract_cip_windows(
    data: &Data,
    output: &ModelOutput,
    schedule: &[ScheduleRow],
    cip_interval_h: i64,
    cip_duration_h: i64,
) -> Vec<CipWindowRow> {
    let mut rows = Vec::new();
    let mut lines_covered_by_model = std::collections::HashSet::new();

    for (&lidx, windows) in &output.cip_windows {
        lines_covered_by_model.insert(lidx);
        let line = &data.lines[lidx.value()];
        for w in windows {
            rows.push(CipWindowRow {
                line_id: line.line_id,
                line_name: line.name.clone(),
                start_hour: w.0,
                end_hour: w.1,
            });
        }
    }

    for lidx in data.lines.iter().enumerate().map(|(i, _)| LineIdx::new(i)) {
        if lines_covered_by_model.contains(&lidx) {
            continue;
        }
        let line = &data.lines[lidx.value()];
        let mut segs: Vec<ProductionSegment> = Vec::new();
        let mut skus: Vec<String> = Vec::new();
        for row in schedule.iter().filter(|r| r.line_id == line.line_id) {
            let sku_idx = match skus.iter().position(|s| s == &row.sku) {
                Some(i) => i,
                None => {
                    skus.push(row.sku.clone());
                    skus.len() - 1
                }
            };
            segs.push(ProductionSegment {
                start: row.start_hour,
                end: row.end_hour,
                sku_idx,
            });
        }
        if segs.is_empty() {
            continue;
        }
        segs.sort_by_key(|s| s.start);
        let carry = data.initial_state(lidx).carryover_h_since_last_cip;
        let interval = data.cip_hrs_overrides.get(&lidx).copied().unwrap_or(cip_interval_h);
        let windows = place_cip_windows(data, lidx, &segs, &skus, carry, interval, cip_duration_h);
        for w in windows {
            rows.push(CipWindowRow {
                line_id: line.line_id,
                line_name: line.name.clone(),
                start_hour: w.start,
                end_hour: w.end,
            });
        }
    }

    rows.sort_by_key(|r| (r.line_id, r.start_hour));
    rows
}
