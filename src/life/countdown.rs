//! Life countdown — calendar breakdown of the time left in the assumed lifespan.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::dates::{CalendarExt, start_of};
use crate::profile::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LifeCountdown {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl LifeCountdown {
    /// Time left until the profile's lifespan ends, zero without a birthdate.
    pub fn for_profile(profile: &UserProfile, now: DateTime<Utc>) -> Self {
        match end_of_life(profile) {
            Some(end) => Self::until(end, now),
            None => Self::default(),
        }
    }

    /// Calendar difference from `now` to `end`; zero once `end` has passed.
    pub fn until(end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if end <= now {
            return Self::default();
        }

        let mut years = end.year() - now.year();
        if now.add_years(years) > end {
            years -= 1;
        }
        let anchor = now.add_years(years);

        let mut months =
            (end.year() - anchor.year()) * 12 + end.month() as i32 - anchor.month() as i32;
        if anchor.add_months(months) > end {
            months -= 1;
        }
        let anchor = anchor.add_months(months);

        let rest = end - anchor;
        Self {
            years: years.max(0) as u32,
            months: months.max(0) as u32,
            days: rest.num_days().max(0) as u32,
            hours: (rest.num_hours() % 24).max(0) as u32,
            minutes: (rest.num_minutes() % 60).max(0) as u32,
            seconds: (rest.num_seconds() % 60).max(0) as u32,
        }
    }

    pub fn is_over(&self) -> bool {
        *self == Self::default()
    }
}

/// Birthdate plus life expectancy, if a birthdate is set.
pub fn end_of_life(profile: &UserProfile) -> Option<DateTime<Utc>> {
    let birthdate = profile.birthdate?;
    Some(start_of(birthdate).add_years(profile.life_expectancy() as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn breaks_down_calendar_units() {
        let countdown = LifeCountdown::until(at(2074, 3, 20, 12, 30, 15), at(2024, 1, 15, 10, 0, 0));
        assert_eq!(
            countdown,
            LifeCountdown {
                years: 50,
                months: 2,
                days: 5,
                hours: 2,
                minutes: 30,
                seconds: 15,
            }
        );
    }

    #[test]
    fn borrows_a_year_when_anniversary_not_reached() {
        let countdown = LifeCountdown::until(at(2030, 1, 10, 0, 0, 0), at(2024, 6, 1, 0, 0, 0));
        assert_eq!(countdown.years, 5);
        assert_eq!(countdown.months, 7);
        assert_eq!(countdown.days, 9);
    }

    #[test]
    fn zero_once_passed() {
        let countdown = LifeCountdown::until(at(2000, 1, 1, 0, 0, 0), at(2024, 1, 1, 0, 0, 0));
        assert!(countdown.is_over());
    }

    #[test]
    fn profile_end_of_life() {
        let profile = UserProfile::new("Ada", NaiveDate::from_ymd_opt(1990, 5, 1))
            .with_life_expectancy(80);
        assert_eq!(end_of_life(&profile), Some(at(2070, 5, 1, 0, 0, 0)));

        let countdown = LifeCountdown::for_profile(&profile, at(2070, 4, 30, 23, 59, 0));
        assert_eq!(countdown.minutes, 1);
        assert_eq!(countdown.days, 0);
    }

    #[test]
    fn no_birthdate_is_zero() {
        let countdown = LifeCountdown::for_profile(&UserProfile::default(), Utc::now());
        assert!(countdown.is_over());
    }
}
