//! Cell-level parsing for dataset rows
//!
//! Sources come from spreadsheets exported by hand, so every parser here is
//! permissive: a cell that cannot be read degrades to `None` rather than
//! failing the whole file.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const TIME_FORMATS: [&str; 6] = [
    "%H:%M:%S",
    "%H:%M",
    "%H:%M:%S%.f",
    "%I:%M:%S %p",
    "%I:%M %p",
    "%I:%M%p",
];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Trimmed cell contents, `None` for blank cells
pub fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Parse a calendar date, accepting full date-times as well
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = non_blank(raw)?;

    for format in &DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    parse_datetime(value).map(|dt| dt.date())
}

/// Parse a time of day.
///
/// Accepts 24-hour and 12-hour clock strings, full date-times (the date is
/// discarded) and spreadsheet day-fractions such as `0.9792`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let value = non_blank(raw)?;

    for format in &TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(value, format) {
            return Some(time);
        }
    }

    if let Some(dt) = parse_datetime(value) {
        return Some(dt.time());
    }

    parse_day_fraction(value)
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

fn parse_day_fraction(value: &str) -> Option<NaiveTime> {
    let fraction: f64 = value.parse().ok()?;
    if !(0.0..1.0).contains(&fraction) {
        return None;
    }

    let seconds = (fraction * SECONDS_PER_DAY).round() as u32;
    // 0.99999.. rounds up to midnight of the next day
    let seconds = seconds.min(SECONDS_PER_DAY as u32 - 1);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

/// Parse a biometric reading; blank, unparseable or non-finite cells are absent
pub fn parse_metric_value(raw: &str) -> Option<f64> {
    non_blank(raw)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Outcome of reading one threshold bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundCell {
    Absent,
    Value(f64),
    Invalid,
}

/// Parse a threshold bound. Blank and `NaN` cells are absent bounds.
pub fn parse_bound(raw: &str) -> BoundCell {
    match non_blank(raw) {
        None => BoundCell::Absent,
        Some(value) => match value.parse::<f64>() {
            Ok(v) if v.is_nan() => BoundCell::Absent,
            Ok(v) => BoundCell::Value(v),
            Err(_) => BoundCell::Invalid,
        },
    }
}

/// Parse an age in whole years; spreadsheets often store `24.0`
pub fn parse_age(raw: &str) -> Option<u16> {
    let value = non_blank(raw)?;
    if let Ok(age) = value.parse::<u16>() {
        return Some(age);
    }

    let age = value.parse::<f64>().ok()?;
    if age.is_finite() && age >= 0.0 && age.fract() == 0.0 && age <= u16::MAX as f64 {
        Some(age as u16)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 3).unwrap();
        assert_eq!(parse_date("2025-04-03"), Some(expected));
        assert_eq!(parse_date(" 2025/04/03 "), Some(expected));
        assert_eq!(parse_date("04/03/2025"), Some(expected));
        assert_eq!(parse_date("2025-04-03 00:00:00"), Some(expected));
        assert_eq!(parse_date("2025-04-03T06:30:00"), Some(expected));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_time_clock_strings() {
        assert_eq!(parse_time("23:45:00"), Some(hm(23, 45)));
        assert_eq!(parse_time("23:45"), Some(hm(23, 45)));
        assert_eq!(parse_time("11:45 PM"), Some(hm(23, 45)));
        assert_eq!(parse_time("6:30 am"), Some(hm(6, 30)));
        assert_eq!(parse_time("2025-04-03 22:15:00"), Some(hm(22, 15)));
    }

    #[test]
    fn test_parse_time_day_fraction() {
        assert_eq!(parse_time("0.5"), Some(hm(12, 0)));
        assert_eq!(parse_time("0.9791666667"), Some(hm(23, 30)));
        assert_eq!(parse_time("1.5"), None);
        assert_eq!(parse_time("-0.2"), None);
    }

    #[test]
    fn test_parse_time_degrades() {
        assert_eq!(parse_time("late"), None);
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("   "), None);
    }

    #[test]
    fn test_parse_metric_value() {
        assert_eq!(parse_metric_value("52.5"), Some(52.5));
        assert_eq!(parse_metric_value(" 60 "), Some(60.0));
        assert_eq!(parse_metric_value(""), None);
        assert_eq!(parse_metric_value("n/a"), None);
        assert_eq!(parse_metric_value("NaN"), None);
        assert_eq!(parse_metric_value("inf"), None);
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound(""), BoundCell::Absent);
        assert_eq!(parse_bound("nan"), BoundCell::Absent);
        assert_eq!(parse_bound("36.2"), BoundCell::Value(36.2));
        assert_eq!(parse_bound("high"), BoundCell::Invalid);
    }

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age("24"), Some(24));
        assert_eq!(parse_age("24.0"), Some(24));
        assert_eq!(parse_age("24.5"), None);
        assert_eq!(parse_age("twenty"), None);
        assert_eq!(parse_age("-3"), None);
    }
}
