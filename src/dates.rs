//! Date helpers for formatting and calendar arithmetic.
//!
//! Every instant is a `DateTime<Utc>` and every calendar day a `NaiveDate`.
//! Days are UTC calendar days throughout the crate.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeDelta, Utc};

/// Milliseconds in one day.
pub const MS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// Milliseconds in one week.
pub const MS_PER_WEEK: i64 = MS_PER_DAY * 7;

/// Calendar arithmetic shared by instants and plain dates.
///
/// Month arithmetic clamps to the last day of the target month
/// (Jan 31 + 1 month = Feb 28/29).
pub trait CalendarExt: Sized + Copy {
    fn add_days(self, days: i64) -> Self;

    fn add_months(self, months: i32) -> Self;

    fn add_weeks(self, weeks: i64) -> Self {
        self.add_days(weeks.saturating_mul(7))
    }

    fn add_years(self, years: i32) -> Self {
        self.add_months(years.saturating_mul(12))
    }
}

impl CalendarExt for NaiveDate {
    fn add_days(self, days: i64) -> Self {
        TimeDelta::try_days(days)
            .and_then(|d| self.checked_add_signed(d))
            .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
    }

    fn add_months(self, months: i32) -> Self {
        let shifted = if months >= 0 {
            self.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.unwrap_or(if months < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
    }
}

impl CalendarExt for DateTime<Utc> {
    fn add_days(self, days: i64) -> Self {
        TimeDelta::try_days(days)
            .and_then(|d| self.checked_add_signed(d))
            .unwrap_or(if days < 0 { DateTime::<Utc>::MIN_UTC } else { DateTime::<Utc>::MAX_UTC })
    }

    fn add_months(self, months: i32) -> Self {
        let shifted = if months >= 0 {
            self.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.unwrap_or(if months < 0 { DateTime::<Utc>::MIN_UTC } else { DateTime::<Utc>::MAX_UTC })
    }
}

/// Midnight (UTC) at the start of `date`.
pub fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// The calendar day an instant falls on.
pub fn day_of(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Short US-style date, e.g. `Jan 5, 2024`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Full weekday name, e.g. `Monday`.
pub fn day_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Abbreviated weekday name, e.g. `Mon`.
pub fn short_day_name(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// Full month name, e.g. `January`.
pub fn month_name(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

pub fn is_today(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    day_of(instant) == day_of(now)
}

pub fn is_future(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant > now
}

pub fn is_past(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant < now
}

/// Week of the year, counting the partial first week as week 1.
pub fn week_number(date: NaiveDate) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(date.year(), 1, 1) else {
        return 1;
    };
    let past_days = date.ordinal0();
    let offset = first.weekday().num_days_from_sunday();
    (past_days + offset + 1).div_ceil(7)
}

/// Human phrasing of the distance between `instant` and `now`.
///
/// The distance is rounded up to whole days, so anything under a day
/// away (but not exactly now) reads as tomorrow/yesterday.
pub fn format_relative_time(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (instant - now).num_milliseconds().unsigned_abs();
    let day = MS_PER_DAY as u64;
    let diff_days = diff_ms.div_ceil(day);
    let ahead = instant > now;

    let phrase = |count: u64, unit: &str| {
        let plural = if count == 1 { "" } else { "s" };
        let direction = if ahead { "from now" } else { "ago" };
        format!("{count} {unit}{plural} {direction}")
    };

    match diff_days {
        0 => "Today".to_string(),
        1 => (if ahead { "Tomorrow" } else { "Yesterday" }).to_string(),
        2..=6 => phrase(diff_days, "day"),
        7..=29 => phrase(diff_days / 7, "week"),
        30..=364 => phrase(diff_days / 30, "month"),
        _ => phrase(diff_days / 365, "year"),
    }
}

/// Serde adapter for an optional calendar date at the JSON boundary.
///
/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (the date part in UTC
/// is kept); always writes `YYYY-MM-DD`.
pub mod iso_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    }

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 date: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn format_date_us_short() {
        assert_eq!(format_date(date(2024, 1, 5)), "Jan 5, 2024");
        assert_eq!(format_date(date(2023, 12, 25)), "Dec 25, 2023");
    }

    #[test]
    fn names() {
        assert_eq!(day_name(date(2024, 1, 1)), "Monday");
        assert_eq!(short_day_name(date(2024, 1, 7)), "Sun");
        assert_eq!(month_name(date(2024, 3, 9)), "March");
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(date(2024, 1, 31).add_months(1), date(2024, 2, 29));
        assert_eq!(date(2023, 1, 31).add_months(1), date(2023, 2, 28));
        assert_eq!(date(2024, 3, 15).add_months(-3), date(2023, 12, 15));
    }

    #[test]
    fn add_days_weeks_years() {
        assert_eq!(date(2024, 2, 28).add_days(2), date(2024, 3, 1));
        assert_eq!(date(2024, 1, 1).add_weeks(2), date(2024, 1, 15));
        assert_eq!(date(2024, 2, 29).add_years(1), date(2025, 2, 28));
        assert_eq!(at(2024, 1, 1, 9).add_days(-1), at(2023, 12, 31, 9));
    }

    #[test]
    fn today_past_future() {
        let now = at(2024, 6, 1, 12);
        assert!(is_today(at(2024, 6, 1, 1), now));
        assert!(!is_today(at(2024, 5, 31, 23), now));
        assert!(is_future(at(2024, 6, 2, 0), now));
        assert!(is_past(at(2024, 6, 1, 11), now));
    }

    #[test]
    fn week_number_counts_partial_first_week() {
        // 2023-01-01 was a Sunday.
        assert_eq!(week_number(date(2023, 1, 1)), 1);
        assert_eq!(week_number(date(2023, 1, 7)), 1);
        assert_eq!(week_number(date(2023, 1, 8)), 2);
        // 2024-01-01 was a Monday; the 6th is a Saturday in week 1.
        assert_eq!(week_number(date(2024, 1, 6)), 1);
        assert_eq!(week_number(date(2024, 1, 7)), 2);
    }

    #[test]
    fn relative_time_phrases() {
        let now = at(2024, 6, 15, 12);
        assert_eq!(format_relative_time(now, now), "Today");
        assert_eq!(format_relative_time(at(2024, 6, 16, 12), now), "Tomorrow");
        assert_eq!(format_relative_time(at(2024, 6, 14, 12), now), "Yesterday");
        assert_eq!(format_relative_time(at(2024, 6, 18, 12), now), "3 days from now");
        assert_eq!(format_relative_time(at(2024, 6, 1, 12), now), "2 weeks ago");
        assert_eq!(format_relative_time(at(2024, 8, 14, 12), now), "2 months from now");
        assert_eq!(format_relative_time(at(2022, 6, 15, 12), now), "2 years ago");
        assert_eq!(format_relative_time(at(2024, 6, 22, 12), now), "1 week from now");
    }

    #[test]
    fn relative_time_rounds_partial_days_up() {
        let now = at(2024, 6, 15, 12);
        assert_eq!(format_relative_time(at(2024, 6, 15, 13), now), "Tomorrow");
    }

    #[test]
    fn iso_date_parse_accepts_both_forms() {
        assert_eq!(iso_date::parse("1990-05-01"), Some(date(1990, 5, 1)));
        assert_eq!(
            iso_date::parse("1990-05-01T00:00:00.000Z"),
            Some(date(1990, 5, 1))
        );
        assert_eq!(iso_date::parse("May 1st"), None);
    }

    #[test]
    fn start_of_is_midnight() {
        assert_eq!(start_of(date(2024, 6, 1)), at(2024, 6, 1, 0));
        assert_eq!(day_of(at(2024, 6, 1, 23)), date(2024, 6, 1));
    }
}
