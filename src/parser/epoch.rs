use time::{Duration, OffsetDateTime};

const SECONDS_PER_DAY: f64 = 86_400.0;
// 1960-01-01 relative to the Unix epoch.
const SAS_EPOCH_OFFSET_SECONDS: i64 = -3653 * 86_400;

/// Returns the instant `days` days after 1960-01-01 00:00 UTC.
///
/// Negative values land before the epoch and fractional values carry the
/// time of day. Returns `None` for non-finite input or results outside the
/// range `time` can represent.
#[must_use]
pub fn sas_epoch_to_date(days: f64) -> Option<OffsetDateTime> {
    sas_seconds_to_datetime(days * SECONDS_PER_DAY)
}

/// Returns the instant `seconds` seconds after 1960-01-01 00:00 UTC.
#[must_use]
pub fn sas_seconds_to_datetime(seconds: f64) -> Option<OffsetDateTime> {
    let delta = Duration::checked_seconds_f64(seconds)?;
    let total = Duration::seconds(SAS_EPOCH_OFFSET_SECONDS).checked_add(delta)?;
    OffsetDateTime::UNIX_EPOCH.checked_add(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month, Time};

    fn date(year: i32, month: Month, day: u8) -> Date {
        Date::from_calendar_date(year, month, day).unwrap()
    }

    #[test]
    fn epoch_day_zero_is_first_of_january_1960() {
        let value = sas_epoch_to_date(0.0).unwrap();
        assert_eq!(value.date(), date(1960, Month::January, 1));
        assert_eq!(value.time(), Time::MIDNIGHT);
    }

    #[test]
    fn epoch_day_one_is_next_day() {
        assert_eq!(
            sas_epoch_to_date(1.0).unwrap().date(),
            date(1960, Month::January, 2)
        );
    }

    #[test]
    fn negative_days_precede_epoch() {
        assert_eq!(
            sas_epoch_to_date(-1.0).unwrap().date(),
            date(1959, Month::December, 31)
        );
    }

    #[test]
    fn fractional_days_keep_time_of_day() {
        let value = sas_epoch_to_date(1.5).unwrap();
        assert_eq!(value.date(), date(1960, Month::January, 2));
        assert_eq!(value.time(), Time::from_hms(12, 0, 0).unwrap());
    }

    #[test]
    fn known_modern_date() {
        // 2000-01-01 is day 14610 in SAS.
        assert_eq!(
            sas_epoch_to_date(14_610.0).unwrap().date(),
            date(2000, Month::January, 1)
        );
    }

    #[test]
    fn conversion_is_monotonic() {
        let samples = [-400.25, -1.0, 0.0, 0.5, 1.0, 365.0, 20_000.75];
        let converted: Vec<_> = samples
            .iter()
            .map(|&days| sas_epoch_to_date(days).unwrap())
            .collect();
        assert!(converted.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn non_finite_input_has_no_date() {
        assert!(sas_epoch_to_date(f64::NAN).is_none());
        assert!(sas_epoch_to_date(f64::INFINITY).is_none());
    }
}
