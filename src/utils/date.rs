//! Due date helpers.
//!
//! Due dates travel through the app as UTC epoch milliseconds and are shown to
//! the user as `dd/MM/yyyy`. Only the calendar day matters; the time of day is
//! dropped on display.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

const DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Format a due date for display.
///
/// `None` stays `None`. Timestamps outside chrono's range are clamped to the
/// nearest representable instant instead of failing.
pub fn format_due_date(epoch_millis: Option<i64>) -> Option<String> {
    epoch_millis.map(|millis| to_utc(millis).format(DISPLAY_FORMAT).to_string())
}

/// Calendar day (UTC) of an epoch-millis timestamp
pub fn millis_to_date(epoch_millis: i64) -> NaiveDate {
    to_utc(epoch_millis).date_naive()
}

/// UTC midnight of the given day, in epoch milliseconds
pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

fn to_utc(epoch_millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_millis).unwrap_or(if epoch_millis < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Parse user-typed due date input relative to today (UTC).
///
/// Supports:
/// - "today", "tomorrow"
/// - "in 3d", "in 2w"
/// - "DD/MM/YYYY" (the display format)
/// - "YYYY-MM-DD"
pub fn parse_due_input(input: &str) -> Option<i64> {
    parse_due_input_at(input, Utc::now().date_naive())
}

pub fn parse_due_input_at(input: &str, today: NaiveDate) -> Option<i64> {
    let s = input.trim().to_lowercase();

    let date = match s.as_str() {
        "today" => Some(today),
        "tomorrow" => today.succ_opt(),
        _ => None,
    };
    if let Some(date) = date {
        return Some(date_to_millis(date));
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let count = |suffix: char| rest.strip_suffix(suffix).and_then(|n| n.trim().parse::<i64>().ok());
        let offset = count('d')
            .and_then(Duration::try_days)
            .or_else(|| count('w').and_then(Duration::try_weeks));
        // Offsets past chrono's calendar range are rejected, not wrapped
        return offset
            .and_then(|offset| today.checked_add_signed(offset))
            .map(date_to_millis);
    }

    NaiveDate::parse_from_str(&s, DISPLAY_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .ok()
        .map(date_to_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use regex::Regex;

    // 2024-03-05T00:00:00Z
    const MARCH_5_2024: i64 = 1_709_596_800_000;

    #[test]
    fn test_none_formats_to_none() {
        assert_eq!(format_due_date(None), None);
    }

    #[test]
    fn test_format_zero_pads_day_and_month() {
        assert_eq!(format_due_date(Some(MARCH_5_2024)).as_deref(), Some("05/03/2024"));
    }

    #[test]
    fn test_epoch_zero() {
        assert_eq!(format_due_date(Some(0)).as_deref(), Some("01/01/1970"));
    }

    #[test]
    fn test_time_of_day_is_dropped() {
        let late_evening = MARCH_5_2024 + 23 * 3_600_000 + 59 * 60_000;
        assert_eq!(
            format_due_date(Some(MARCH_5_2024)),
            format_due_date(Some(late_evening))
        );
        assert_eq!(
            format_due_date(Some(late_evening + 60_000)).as_deref(),
            Some("06/03/2024")
        );
    }

    #[test]
    fn test_out_of_range_does_not_panic() {
        assert!(format_due_date(Some(i64::MAX)).is_some());
        assert!(format_due_date(Some(i64::MIN)).is_some());
    }

    #[test]
    fn test_date_millis_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(date_to_millis(date), MARCH_5_2024);
        assert_eq!(millis_to_date(MARCH_5_2024 + 1_000), date);
    }

    #[test]
    fn test_parse_due_input() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_due_input_at("today", today), Some(MARCH_5_2024));
        assert_eq!(
            parse_due_input_at("Tomorrow", today),
            Some(MARCH_5_2024 + 86_400_000)
        );
        assert_eq!(
            parse_due_input_at("in 2w", today),
            Some(MARCH_5_2024 + 14 * 86_400_000)
        );
        assert_eq!(parse_due_input_at("05/03/2024", today), Some(MARCH_5_2024));
        assert_eq!(parse_due_input_at("2024-03-05", today), Some(MARCH_5_2024));
        assert_eq!(parse_due_input_at("in a while", today), None);
        assert_eq!(parse_due_input_at("31/02/2024", today), None);
        assert_eq!(parse_due_input_at("in 99999999999999d", today), None);
    }

    proptest! {
        #[test]
        fn prop_formatted_date_shape(millis in 0i64..=253_402_300_799_000i64) {
            let re = Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap();
            let formatted = format_due_date(Some(millis)).unwrap();
            prop_assert!(re.is_match(&formatted), "unexpected format: {}", formatted);
        }

        #[test]
        fn prop_format_then_parse_is_same_day(millis in 0i64..=253_402_300_799_000i64) {
            let formatted = format_due_date(Some(millis)).unwrap();
            let parsed = parse_due_input(&formatted).unwrap();
            prop_assert_eq!(millis_to_date(parsed), millis_to_date(millis));
        }
    }
}
