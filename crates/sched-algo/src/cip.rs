//! Greedy post-solve CIP placement, used when the model did not materialize
//! CIP intervals itself (non-full run modes).

use sched_core::{ChangeoverEntry, Data, LineIdx};

/// One produced segment on a line, in hours, ordered by `start`.
#[derive(Debug, Clone, Copy)]
pub struct ProductionSegment {
    pub start: i64,
    pub end: i64,
    pub sku_idx: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipWindow {
    pub start: i64,
    pub end: i64,
}

struct Gap {
    start: i64,
    len: i64,
    cumulative_before: i64,
    setup_hours: i64,
}

/// Places CIP windows into the gaps between `segments` on one line.
/// `skus[i]` names the SKU of `segments[i]`; `setup_hours_for` looks up the
/// changeover duration between consecutive SKUs.
pub fn place_cip_windows(
    data: &Data,
    line: LineIdx,
    segments: &[ProductionSegment],
    skus: &[String],
    carry_h: i64,
    interval_h: i64,
    duration_h: i64,
) -> Vec<CipWindow> {
    if segments.is_empty() || interval_h <= 0 {
        return Vec::new();
    }

    let total_run_hours: i64 = segments.iter().map(|s| s.end - s.start).sum();
    let needed = ((total_run_hours + carry_h) / interval_h).max(0);
    if needed == 0 {
        return Vec::new();
    }

    let mut gaps: Vec<Gap> = Vec::new();
    let mut cumulative = 0i64;
    for window in segments.windows(2) {
        let (prev, next) = (window[0], window[1]);
        cumulative += prev.end - prev.start;
        let entry: ChangeoverEntry = if prev.sku_idx == next.sku_idx {
            ChangeoverEntry::default()
        } else {
            data.changeover(&skus[prev.sku_idx], &skus[next.sku_idx])
        };
        gaps.push(Gap {
            start: prev.end,
            len: (next.start - prev.end).max(0),
            cumulative_before: cumulative,
            setup_hours: entry.setup_hours.round() as i64,
        });
    }

    let mut windows = Vec::new();
    let mut gap_cursor = 0usize;
    for k in 1..=needed {
        let threshold = k * interval_h - carry_h;
        let mut placed = false;
        while gap_cursor < gaps.len() {
            let gap = &gaps[gap_cursor];
            let effective_len = duration_h.max(gap.setup_hours);
            if gap.cumulative_before >= threshold && gap.len >= effective_len {
                windows.push(CipWindow {
                    start: gap.start,
                    end: gap.start + effective_len,
                });
                gap_cursor += 1;
                placed = true;
                break;
            }
            gap_cursor += 1;
        }
        if !placed {
            tracing::warn!(
                line = %line,
                cip_index = k,
                "no gap fits required CIP; skipping placement (validation should catch this)"
            );
        }
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::Line;

    fn line_fixture() -> (Data, LineIdx) {
        let mut data = Data::default();
        data.lines.push(Line { line_id: 1, name: "L1".into() });
        (data, LineIdx::new(0))
    }

    #[test]
    fn no_cip_needed_when_total_run_under_interval() {
        let (data, line) = line_fixture();
        let segs = [ProductionSegment { start: 0, end: 10, sku_idx: 0 }];
        let windows = place_cip_windows(&data, line, &segs, &["A".to_string()], 0, 120, 6);
        assert!(windows.is_empty());
    }

    #[test]
    fn places_one_cip_in_first_viable_gap() {
        let (data, line) = line_fixture();
        let skus = vec!["A".to_string(), "B".to_string()];
        let segs = [
            ProductionSegment { start: 0, end: 100, sku_idx: 0 },
            ProductionSegment { start: 110, end: 140, sku_idx: 1 },
        ];
        let windows = place_cip_windows(&data, line, &segs, &skus, 0, 100, 6);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, 100);
        assert_eq!(windows[0].end, 106);
    }

    #[test]
    fn skips_silently_when_no_gap_fits() {
        let (data, line) = line_fixture();
        let skus = vec!["A".to_string(), "B".to_string()];
        let segs = [
            ProductionSegment { start: 0, end: 100, sku_idx: 0 },
            ProductionSegment { start: 101, end: 140, sku_idx: 1 },
        ];
        let windows = place_cip_windows(&data, line, &segs, &skus, 0, 100, 6);
        assert!(windows.is_empty());
    }
}
