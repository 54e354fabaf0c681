use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::LoadError;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Number of months offered in the month picker, starting with the current one.
pub const MONTH_OPTIONS: usize = 18;

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// A calendar month, labelled `"November 2026"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthSelection {
    year: i32,
    month: u32,
}

/// The dates a load asks the availability endpoint for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub start: NaiveDate,
    pub days: u32,
}

impl MonthSelection {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((MIN_YEAR..=MAX_YEAR).contains(&year) && (1..=12).contains(&month))
            .then_some(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year().clamp(MIN_YEAR, MAX_YEAR),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    /// 1-based month number.
    pub fn month(self) -> u32 {
        self.month
    }

    pub fn name(self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    pub fn label(self) -> String {
        format!("{} {}", self.name(), self.year)
    }

    /// Moves by whole months, wrapping across years. Saturates at the supported range.
    pub fn shift(self, delta: i32) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month - 1) + i64::from(delta);
        let min = i64::from(MIN_YEAR) * 12;
        let max = i64::from(MAX_YEAR) * 12 + 11;
        let index = index.clamp(min, max);
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn days_in_month(self) -> u32 {
        match self.month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            _ if is_leap_year(self.year) => 29,
            _ => 28,
        }
    }

    pub fn date(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    /// The fetch window for this month as seen from `today`.
    ///
    /// Future months cover every day. The current month starts tomorrow; when today is
    /// the last day nothing is left and the month counts as past.
    pub fn window(self, today: NaiveDate) -> Result<DayWindow, LoadError> {
        let current = Self::containing(today);
        if self < current {
            return Err(LoadError::PastMonth);
        }

        let dim = self.days_in_month();
        let (start_day, days) = if self == current {
            (today.day() + 1, dim - today.day())
        } else {
            (1, dim)
        };

        if days == 0 {
            return Err(LoadError::PastMonth);
        }

        let start = self.date(start_day).ok_or(LoadError::PastMonth)?;
        Ok(DayWindow { start, days })
    }
}

impl DayWindow {
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.days as usize)
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(i64::from(self.days.saturating_sub(1)))
    }
}

impl fmt::Display for MonthSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.year)
    }
}

/// Accepts `"November 2026"` (case-insensitive) or `"2026-11"`.
impl FromStr for MonthSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some((y, m)) = s.split_once('-') {
            let year = y.trim().parse::<i32>().context("invalid year")?;
            let month = m.trim().parse::<u32>().context("invalid month")?;
            return Self::new(year, month)
                .with_context(|| format!("month out of range: {s:?}"));
        }

        let mut parts = s.split_whitespace();
        let (Some(name), Some(year), None) = (parts.next(), parts.next(), parts.next()) else {
            anyhow::bail!("expected \"<Month> <YYYY>\" or \"YYYY-MM\", got {s:?}");
        };
        let month = MONTH_NAMES
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name))
            .with_context(|| format!("unknown month name {name:?}"))?;
        let year = year.parse::<i32>().context("invalid year")?;
        Self::new(year, month as u32 + 1).with_context(|| format!("month out of range: {s:?}"))
    }
}

/// The month picker: `count` consecutive months starting with the one containing `today`.
pub fn month_options(today: NaiveDate, count: usize) -> Vec<MonthSelection> {
    let first = MonthSelection::containing(today);
    (0..count as i32).map(|i| first.shift(i)).collect()
}

/// Two-letter English weekday used in the calendar header.
pub fn weekday_abbrev(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Mo",
        Weekday::Tue => "Tu",
        Weekday::Wed => "We",
        Weekday::Thu => "Th",
        Weekday::Fri => "Fr",
        Weekday::Sat => "Sa",
        Weekday::Sun => "Su",
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn month(y: i32, m: u32) -> MonthSelection {
        MonthSelection::new(y, m).unwrap()
    }

    #[test]
    fn parses_labels_and_iso_months() {
        assert_eq!("November 2026".parse::<MonthSelection>().unwrap(), month(2026, 11));
        assert_eq!("  march 2027 ".parse::<MonthSelection>().unwrap(), month(2027, 3));
        assert_eq!("2026-02".parse::<MonthSelection>().unwrap(), month(2026, 2));
        assert!("Smarch 2026".parse::<MonthSelection>().is_err());
        assert!("2026-13".parse::<MonthSelection>().is_err());
        assert!("November".parse::<MonthSelection>().is_err());
    }

    #[test]
    fn label_round_trips_through_display() {
        let m = month(2026, 10);
        assert_eq!(m.label(), "October 2026");
        assert_eq!(m.to_string().parse::<MonthSelection>().unwrap(), m);
    }

    #[test]
    fn shift_wraps_years() {
        assert_eq!(month(2026, 12).shift(1), month(2027, 1));
        assert_eq!(month(2026, 1).shift(-1), month(2025, 12));
        assert_eq!(month(2026, 10).shift(17), month(2028, 3));
        assert_eq!(month(2026, 10).shift(-22), month(2024, 12));
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(month(2024, 2).days_in_month(), 29);
        assert_eq!(month(2026, 2).days_in_month(), 28);
        assert_eq!(month(2000, 2).days_in_month(), 29);
        assert_eq!(month(1900, 2).days_in_month(), 28);
        assert_eq!(month(2026, 11).days_in_month(), 30);
    }

    #[test]
    fn past_month_is_rejected() {
        let today = d(2026, 10, 19);
        assert_eq!(month(2026, 9).window(today), Err(LoadError::PastMonth));
        assert_eq!(month(2025, 12).window(today), Err(LoadError::PastMonth));
    }

    #[test]
    fn current_month_starts_tomorrow() {
        let today = d(2026, 10, 19);
        let w = month(2026, 10).window(today).unwrap();
        assert_eq!(w.start, d(2026, 10, 20));
        assert_eq!(w.days, 12);
        assert_eq!(w.end(), d(2026, 10, 31));
        assert_eq!(w.dates().count(), 12);
    }

    #[test]
    fn last_day_of_month_leaves_nothing() {
        assert_eq!(
            month(2026, 10).window(d(2026, 10, 31)),
            Err(LoadError::PastMonth)
        );
        let w = month(2026, 10).window(d(2026, 10, 30)).unwrap();
        assert_eq!((w.start, w.days), (d(2026, 10, 31), 1));
    }

    #[test]
    fn future_month_covers_every_day() {
        let w = month(2027, 2).window(d(2026, 10, 19)).unwrap();
        assert_eq!(w.start, d(2027, 2, 1));
        assert_eq!(w.days, 28);
        let dates: Vec<_> = w.dates().collect();
        assert_eq!(dates.first(), Some(&d(2027, 2, 1)));
        assert_eq!(dates.last(), Some(&d(2027, 2, 28)));
    }

    #[test]
    fn eighteen_month_picker() {
        let opts = month_options(d(2026, 10, 19), MONTH_OPTIONS);
        assert_eq!(opts.len(), 18);
        assert_eq!(opts[0], month(2026, 10));
        assert_eq!(opts[3], month(2027, 1));
        assert_eq!(opts[17], month(2028, 3));
    }

    #[test]
    fn weekday_abbreviations() {
        // 2026-10-19 is a Monday.
        assert_eq!(weekday_abbrev(d(2026, 10, 19)), "Mo");
        assert_eq!(weekday_abbrev(d(2026, 10, 25)), "Su");
    }
}
