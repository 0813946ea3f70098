use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::sessions::{
    entities::TimeRange,
    window::{WindowPreset, custom_window},
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

pub const DATE_EXAMPLES: &str =
    "Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\"";

/// Selection of days used by reporting commands.
#[derive(Debug, Clone, clap::Args)]
pub struct WindowArgs {
    #[arg(
        long,
        value_enum,
        conflicts_with_all = ["start", "end"],
        help = "Named range of days. Defaults to the last 7 days"
    )]
    preset: Option<WindowPreset>,
    #[arg(long = "start", short, help = format!("First day of the range. {DATE_EXAMPLES}"))]
    start: Option<String>,
    #[arg(long = "end", short, help = format!("Last day of the range. {DATE_EXAMPLES}"))]
    end: Option<String>,
}

/// Number of days shown when only an end of the range is given.
const DEFAULT_DAYS: i64 = 7;

impl WindowArgs {
    pub fn preset(preset: WindowPreset) -> Self {
        Self {
            preset: Some(preset),
            start: None,
            end: None,
        }
    }

    /// Resolves the selection into a window of whole days in `tz`.
    pub fn resolve<Tz: TimeZone>(
        &self,
        now: DateTime<Utc>,
        tz: &Tz,
        date_style: DateStyle,
    ) -> Result<TimeRange>
    where
        Tz::Offset: Copy,
    {
        if self.start.is_none() && self.end.is_none() {
            return Ok(self
                .preset
                .unwrap_or(WindowPreset::Last7Days)
                .resolve(now, tz));
        }

        let end = match &self.end {
            Some(v) => parse_date(v, now, tz, date_style)?,
            None => now,
        };
        let start = match &self.start {
            Some(v) => parse_date(v, now, tz, date_style)?,
            None => end - Duration::days(DEFAULT_DAYS - 1),
        };
        custom_window(start, end, tz).map_err(|e| {
            Args::command()
                .error(clap::error::ErrorKind::ValueValidation, e.to_string())
                .into()
        })
    }
}

/// Parses human readable dates relatively to `now`.
pub fn parse_date<Tz: TimeZone>(
    value: &str,
    now: DateTime<Utc>,
    tz: &Tz,
    date_style: DateStyle,
) -> Result<DateTime<Utc>>
where
    Tz::Offset: Copy,
{
    match parse_date_string(value, now.with_timezone(tz), date_style.into()) {
        Ok(v) => Ok(v.to_utc()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date \"{value}\": {e}"),
            )
            .into()),
    }
}
