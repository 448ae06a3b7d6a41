use chrono::{Duration, NaiveDateTime};

/// Converts an hour offset from the planning anchor to a wall-clock
/// datetime.
pub fn hour_to_datetime(anchor: NaiveDateTime, hour: i64) -> NaiveDateTime {
    anchor + Duration::hours(hour)
}

/// Inverse of [`hour_to_datetime`], rounding down to the containing hour.
pub fn datetime_to_hour(anchor: NaiveDateTime, dt: NaiveDateTime) -> i64 {
    (dt - anchor).num_hours()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn round_trips_through_hour_offset() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let dt = hour_to_datetime(anchor, 50);
        assert_eq!(datetime_to_hour(anchor, dt), 50);
    }
}
