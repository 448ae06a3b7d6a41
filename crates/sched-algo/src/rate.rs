use sched_core::{Data, LineIdx};

/// Resolves the effective production rate for `(line, sku)` in the given
/// calendar month. A per-line monthly override wins when one is
/// configured for that month; otherwise falls back to the base capability
/// rate. Rates are returned even for non-capable pairs so trials can look
/// them up; a missing base-capability entry resolves to `0.0`, which the
/// model builder treats as "not capable" uniformly.
pub fn resolve_rate(data: &Data, line: LineIdx, sku: &str, month: u32) -> f64 {
    if let Some(&override_rate) = data.rate_overrides.get(&(line, month)) {
        return override_rate;
    }
    data.capability(line, sku)
        .map(|cap| cap.base_rate_kgph)
        .unwrap_or(0.0)
}

/// Whether `(line, sku)` can produce at all: capable flag set and a
/// strictly positive resolved rate.
pub fn is_capable(data: &Data, line: LineIdx, sku: &str, month: u32) -> bool {
    let capable_flag = data.capability(line, sku).map(|c| c.capable).unwrap_or(false);
    capable_flag && resolve_rate(data, line, sku, month) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::{Capability, Line};

    fn fixture() -> Data {
        let mut data = Data::default();
        data.lines.push(Line { line_id: 1, name: "L1".into() });
        let l1 = LineIdx::new(0);
        data.capabilities.insert(
            (l1, "A".to_string()),
            Capability { capable: true, base_rate_kgph: 100.0 },
        );
        data
    }

    #[test]
    fn base_rate_used_without_override() {
        let data = fixture();
        let rate = resolve_rate(&data, LineIdx::new(0), "A", 3);
        assert_eq!(rate, 100.0);
    }

    #[test]
    fn monthly_override_wins() {
        let mut data = fixture();
        data.rate_overrides.insert((LineIdx::new(0), 3), 120.0);
        assert_eq!(resolve_rate(&data, LineIdx::new(0), "A", 3), 120.0);
        assert_eq!(resolve_rate(&data, LineIdx::new(0), "A", 4), 100.0);
    }

    #[test]
    fn missing_capability_is_zero_rate() {
        let data = fixture();
        assert_eq!(resolve_rate(&data, LineIdx::new(0), "Z", 3), 0.0);
        assert!(!is_capable(&data, LineIdx::new(0), "Z", 3));
    }

    #[test]
    fn zero_rate_capable_flag_is_still_incapable() {
        let mut data = fixture();
        data.capabilities.insert(
            (LineIdx::new(0), "B".to_string()),
            Capability { capable: true, base_rate_kgph: 0.0 },
        );
        assert!(!is_capable(&data, LineIdx::new(0), "B", 3));
    }
}
