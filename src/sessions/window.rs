use std::fmt::Display;

use anyhow::{Result, bail};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use clap::ValueEnum;
use now::DateTimeNow;

use crate::utils::time::{end_of_day, start_of_day};

use super::entities::TimeRange;

/// Named windows a user can select. Windows always consist of whole days in owner's time zone.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum WindowPreset {
    Today,
    Yesterday,
    #[value(name = "last-7-days")]
    Last7Days,
    #[value(name = "last-30-days")]
    Last30Days,
    ThisWeek,
    ThisMonth,
    LastMonth,
}

impl Display for WindowPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowPreset::Today => write!(f, "today"),
            WindowPreset::Yesterday => write!(f, "yesterday"),
            WindowPreset::Last7Days => write!(f, "last-7-days"),
            WindowPreset::Last30Days => write!(f, "last-30-days"),
            WindowPreset::ThisWeek => write!(f, "this-week"),
            WindowPreset::ThisMonth => write!(f, "this-month"),
            WindowPreset::LastMonth => write!(f, "last-month"),
        }
    }
}

impl WindowPreset {
    /// Resolves the preset relatively to `now`.
    pub fn resolve<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> TimeRange {
        let local = now.with_timezone(tz);
        let today = local.date_naive();
        let (first, last) = match self {
            WindowPreset::Today => (today, today),
            WindowPreset::Yesterday => {
                let yesterday = today.pred_opt().unwrap_or(today);
                (yesterday, yesterday)
            }
            WindowPreset::Last7Days => (today - Duration::days(6), today),
            WindowPreset::Last30Days => (today - Duration::days(29), today),
            WindowPreset::ThisWeek => {
                let first = local.beginning_of_week().date_naive();
                (first, first + Duration::days(6))
            }
            WindowPreset::ThisMonth => month_bounds(today),
            WindowPreset::LastMonth => {
                month_bounds(today.checked_sub_months(Months::new(1)).unwrap_or(today))
            }
        };
        days_window(first, last, tz)
    }
}

fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|v| v.pred_opt())
        .unwrap_or(first);
    (first, last)
}

/// Window from the start of `first` to the last second of `last`.
pub fn days_window<Tz: TimeZone>(first: NaiveDate, last: NaiveDate, tz: &Tz) -> TimeRange {
    TimeRange {
        start: start_of_day(first, tz).to_utc(),
        end: end_of_day(last, tz).to_utc(),
    }
}

/// Normalizes an explicit selection to whole days.
pub fn custom_window<Tz: TimeZone>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: &Tz,
) -> Result<TimeRange> {
    if start > end {
        bail!("Start of the range {start} is after its end {end}");
    }
    Ok(days_window(
        start.with_timezone(tz).date_naive(),
        end.with_timezone(tz).date_naive(),
        tz,
    ))
}
