use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Minutes of lead-in before the nominal class start that already count
pub fn lead_in() -> Duration {
    Duration::minutes(10)
}

/// Minutes after the nominal start before a join counts as late
pub fn grace_period() -> Duration {
    Duration::minutes(10)
}

/// Interval of time attendance is measured over for one class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Denominator for the attendance percentage
    pub class_duration: Duration,
}

impl ClassWindow {
    /// Window for a class nominally starting at `nominal_start`.
    ///
    /// The window opens `lead_in()` early. Without an override it closes
    /// `default_duration` after the nominal start and the percentage is taken
    /// against `default_duration`. An early stop closes it at `end_override`
    /// and the percentage is taken against the whole opened window.
    pub fn new(
        nominal_start: DateTime<Utc>,
        end_override: Option<DateTime<Utc>>,
        default_duration: Duration,
    ) -> Self {
        let start = nominal_start - lead_in();
        match end_override {
            Some(end) => Self {
                start,
                end,
                class_duration: end - start,
            },
            None => Self {
                start,
                end: nominal_start + default_duration,
                class_duration: default_duration,
            },
        }
    }

    /// Window for the occurrence of the class nearest to `now`.
    ///
    /// Only the time of day of the stored class start is kept. The class is
    /// placed on the day before, the day of, or the day after `now`, picking
    /// whichever nominal start is closest, so a class running across
    /// midnight keeps the same window on both sides of it.
    pub fn nearest(
        class_start: DateTime<Utc>,
        end_override: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        default_duration: Duration,
    ) -> Self {
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(class_start.time()));
        let nominal = [today - Duration::days(1), today, today + Duration::days(1)]
            .into_iter()
            .min_by_key(|candidate| (*candidate - now).num_seconds().abs())
            .unwrap_or(today);
        Self::new(nominal, end_override, default_duration)
    }

    /// Day whose sheet column this class is written to
    pub fn day(&self) -> NaiveDate {
        self.nominal_start().date_naive()
    }

    pub fn nominal_start(&self) -> DateTime<Utc> {
        self.start + lead_in()
    }

    /// Joins strictly after this instant are late
    pub fn grace_boundary(&self) -> DateTime<Utc> {
        self.start + lead_in() + grace_period()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    #[test]
    fn test_default_window() {
        let window = ClassWindow::new(at(8, 45), None, Duration::minutes(90));
        assert_eq!(window.start, at(8, 35));
        assert_eq!(window.end, at(10, 15));
        assert_eq!(window.class_duration, Duration::minutes(90));
        assert_eq!(window.grace_boundary(), at(8, 55));
        assert_eq!(window.nominal_start(), at(8, 45));
    }

    #[test]
    fn test_early_stop_window() {
        let window = ClassWindow::new(at(8, 45), Some(at(9, 55)), Duration::minutes(90));
        assert_eq!(window.end, at(9, 55));
        assert_eq!(window.class_duration, Duration::minutes(80));
    }

    #[test]
    fn test_window_is_moved_to_today() {
        let stored = Utc.with_ymd_and_hms(2024, 1, 1, 1, 28, 30).unwrap();
        let window = ClassWindow::nearest(stored, None, at(0, 30), Duration::minutes(90));
        assert_eq!(
            window.nominal_start(),
            Utc.with_ymd_and_hms(2024, 5, 6, 1, 28, 30).unwrap()
        );
        assert_eq!(window.day(), NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
    }

    #[test]
    fn test_window_across_midnight_stays_on_class_day() {
        // 07:10 at UTC+7 minus the correction
        let stored = at(23, 53);
        let before = ClassWindow::nearest(stored, None, at(23, 59), Duration::minutes(90));
        let after_midnight = ClassWindow::nearest(
            stored,
            None,
            Utc.with_ymd_and_hms(2024, 5, 7, 0, 30, 0).unwrap(),
            Duration::minutes(90),
        );

        assert_eq!(before, after_midnight);
        assert_eq!(after_midnight.start, at(23, 43));
        assert_eq!(after_midnight.end, Utc.with_ymd_and_hms(2024, 5, 7, 1, 23, 0).unwrap());
        assert_eq!(after_midnight.day(), NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
    }

    #[test]
    fn test_upcoming_class_uses_its_own_day() {
        let stored = Utc.with_ymd_and_hms(2024, 5, 1, 1, 45, 0).unwrap();
        let window = ClassWindow::nearest(stored, None, at(1, 0), Duration::minutes(90));
        assert_eq!(window.nominal_start(), at(1, 45));
    }
}
