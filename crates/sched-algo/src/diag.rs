//! Stub seams for the pre-solve reporter and the out-of-band post-solve
//! auditor. Neither touches the solver; both read plain data and report
//! findings without altering anything.

use sched_core::{CipWindowRow, Data, ProducedVsBoundsRow, ScheduleRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

/// The written output tables, as read back by an auditor.
pub struct ScheduleOutputs<'a> {
    pub schedule: &'a [ScheduleRow],
    pub produced_vs_bounds: &'a [ProducedVsBoundsRow],
    pub cip_windows: &'a [CipWindowRow],
}

pub trait Reporter {
    fn report(&self, data: &Data) -> Vec<Finding>;
}

pub trait Auditor {
    fn audit(&self, data: &Data, outputs: &ScheduleOutputs<'_>) -> Vec<Finding>;
}

/// Flags lines with zero capable orders, orders with no capable line, and
/// orders whose `qty_min` cannot be met by `max_lines_per_order` lines'
/// combined capacity within the order's due window.
pub struct CapacityReporter {
    pub max_lines_per_order: usize,
}

impl Reporter for CapacityReporter {
    fn report(&self, data: &Data) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (i, line) in data.lines.iter().enumerate() {
            let lidx = sched_core::LineIdx::new(i);
            let has_capable_order = data.orders.iter().any(|o| {
                data.capability(lidx, &o.sku).map(|c| c.capable).unwrap_or(false)
            });
            if !has_capable_order {
                findings.push(Finding {
                    severity: Severity::Warning,
                    message: format!("line {} ({}) has no capable order in this run", line.line_id, line.name),
                });
            }
        }

        for order in &data.orders {
            let mut capable_lines = Vec::new();
            let mut best_rate_sum = 0.0;
            for (i, _line) in data.lines.iter().enumerate() {
                let lidx = sched_core::LineIdx::new(i);
                if let Some(cap) = data.capability(lidx, &order.sku) {
                    if cap.capable && cap.base_rate_kgph > 0.0 {
                        capable_lines.push(lidx);
                        best_rate_sum += cap.base_rate_kgph;
                    }
                }
            }
            if capable_lines.is_empty() {
                findings.push(Finding {
                    severity: Severity::Error,
                    message: format!("order {} (sku {}) has no capable line", order.order_id, order.sku),
                });
                continue;
            }
            let window_hours = (order.due_end - order.due_start + 1).max(0) as f64;
            let effective_lines = capable_lines.len().min(self.max_lines_per_order) as f64;
            let achievable = if capable_lines.is_empty() {
                0.0
            } else {
                (best_rate_sum / capable_lines.len() as f64) * effective_lines * window_hours
            };
            if achievable < order.qty_min {
                findings.push(Finding {
                    severity: Severity::Warning,
                    message: format!(
                        "order {} qty_min {} may exceed achievable capacity ~{:.0} across {} capable line(s) within its window",
                        order.order_id, order.qty_min, achievable, capable_lines.len()
                    ),
                });
            }
        }

        findings
    }
}

/// Reads back the written output tables and flags bound violations or
/// overlapping segments on a line — independent of whatever the solver
/// itself believed it produced.
pub struct BoundsAuditor;

impl Auditor for BoundsAuditor {
    fn audit(&self, _data: &Data, outputs: &ScheduleOutputs<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();

        for row in outputs.produced_vs_bounds {
            if !row.in_bounds {
                findings.push(Finding {
                    severity: Severity::Error,
                    message: format!(
                        "order {} produced {} outside [{}, {}]",
                        row.order_id, row.produced, row.qty_min, row.qty_max
                    ),
                });
            }
        }

        let mut by_line: std::collections::HashMap<i64, Vec<&ScheduleRow>> = std::collections::HashMap::new();
        for row in outputs.schedule {
            by_line.entry(row.line_id).or_default().push(row);
        }
        for (line_id, mut rows) in by_line {
            rows.sort_by_key(|r| r.start_hour);
            for pair in rows.windows(2) {
                if pair[0].end_hour > pair[1].start_hour {
                    findings.push(Finding {
                        severity: Severity::Error,
                        message: format!(
                            "line {line_id}: order {} (ends {}) overlaps order {} (starts {})",
                            pair[0].order_id, pair[0].end_hour, pair[1].order_id, pair[1].start_hour
                        ),
                    });
                }
            }
        }

        for window in outputs.cip_windows {
            if window.end_hour < window.start_hour {
                findings.push(Finding {
                    severity: Severity::Error,
                    message: format!(
                        "line {}: cip window ends ({}) before it starts ({})",
                        window.line_id, window.end_hour, window.start_hour
                    ),
                });
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::{Capability, Line, Order};

    fn order(id: &str, sku: &str, due_start: i64, due_end: i64, qty_min: f64) -> Order {
        Order {
            order_id: id.to_string(),
            sku: sku.to_string(),
            due_start,
            due_end,
            qty_min,
            qty_max: qty_min * 2.0,
            priority: 0,
            trial: None,
        }
    }

    #[test]
    fn flags_order_with_no_capable_line() {
        let mut data = Data::default();
        data.lines.push(Line { line_id: 1, name: "L1".into() });
        data.orders.push(order("O1", "Z", 0, 335, 100.0));
        let findings = CapacityReporter { max_lines_per_order: 3 }.report(&data);
        assert!(findings.iter().any(|f| f.severity == Severity::Error));
    }

    #[test]
    fn quiet_when_capacity_is_ample() {
        let mut data = Data::default();
        data.lines.push(Line { line_id: 1, name: "L1".into() });
        data.capabilities.insert(
            (sched_core::LineIdx::new(0), "A".to_string()),
            Capability { capable: true, base_rate_kgph: 1000.0 },
        );
        data.orders.push(order("O1", "A", 0, 335, 100.0));
        let findings = CapacityReporter { max_lines_per_order: 3 }.report(&data);
        assert!(findings.iter().all(|f| f.severity != Severity::Error));
    }

    fn schedule_row(line_id: i64, order_id: &str, start: i64, end: i64) -> ScheduleRow {
        let dt = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        ScheduleRow {
            line_id,
            line_name: "L".into(),
            order_id: order_id.to_string(),
            sku: "A".into(),
            start_hour: start,
            end_hour: end,
            run_hours: end - start,
            start_dt: dt,
            end_dt: dt,
            is_trial: false,
        }
    }

    #[test]
    fn bounds_auditor_flags_overlap_and_out_of_bounds() {
        let data = Data::default();
        let schedule = vec![schedule_row(1, "O1", 0, 10), schedule_row(1, "O2", 5, 20)];
        let produced = vec![ProducedVsBoundsRow {
            order_id: "O1".into(),
            sku: "A".into(),
            qty_min: 100.0,
            qty_max: 200.0,
            produced: 50.0,
            in_bounds: false,
        }];
        let outputs = ScheduleOutputs {
            schedule: &schedule,
            produced_vs_bounds: &produced,
            cip_windows: &[],
        };
        let findings = BoundsAuditor.audit(&data, &outputs);
        assert!(findings.iter().any(|f| f.message.contains("overlaps")));
        assert!(findings.iter().any(|f| f.message.contains("outside")));
    }

    #[test]
    fn bounds_auditor_quiet_on_clean_output() {
        let data = Data::default();
        let schedule = vec![schedule_row(1, "O1", 0, 10), schedule_row(1, "O2", 10, 20)];
        let produced = vec![ProducedVsBoundsRow {
            order_id: "O1".into(),
            sku: "A".into(),
            qty_min: 10.0,
            qty_max: 200.0,
            produced: 50.0,
            in_bounds: true,
        }];
        let outputs = ScheduleOutputs {
            schedule: &schedule,
            produced_vs_bounds: &produced,
            cip_windows: &[],
        };
        let findings = BoundsAuditor.audit(&data, &outputs);
        assert!(findings.is_empty());
    }
}
