use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::{instrument, trace};

use crate::utils::time::{TIME_UNIT, date_range};

use super::{
    entities::{TimeRange, WorkRecord},
    error::AggregationError,
};

/// Accumulates durations together with a duration-weighted mean of focus levels. Values are kept
/// at full precision; rounding is left to whoever prints them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightedScore {
    duration: Duration,
    score: Option<f64>,
}

impl WeightedScore {
    pub fn add(&mut self, duration: Duration, score: f64) {
        let previous = self.duration.num_seconds() as f64;
        let added = duration.num_seconds() as f64;
        self.score = match self.score {
            Some(current) if previous > 0. && previous + added > 0. => {
                Some((current * previous + score * added) / (previous + added))
            }
            _ => Some(score),
        };
        self.duration += duration;
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Weighted score. Nothing is reported while accumulated duration is zero.
    pub fn score(&self) -> Option<f64> {
        self.score.filter(|_| !self.duration.is_zero())
    }
}

/// Aggregated values of the previous period, attached to the day with the same offset from the
/// end of the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayComparison {
    pub calendar_date: NaiveDate,
    #[serde(with = "duration_ser")]
    pub total_duration: Duration,
    pub weighted_quality_score: Option<f64>,
}

/// Single calendar day (in owner's time zone) of an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub calendar_date: NaiveDate,
    #[serde(with = "duration_ser")]
    pub total_duration: Duration,
    pub weighted_quality_score: Option<f64>,
    pub session_count: usize,
    pub is_current_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<DayComparison>,
}

impl DayBucket {
    fn new(calendar_date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            calendar_date,
            total_duration: Duration::zero(),
            weighted_quality_score: None,
            session_count: 0,
            is_current_day: calendar_date == today,
            comparison: None,
        }
    }

    pub fn comparison_calendar_date(&self) -> Option<NaiveDate> {
        self.comparison.as_ref().map(|v| v.calendar_date)
    }
}

/// Local calendar dates covered by `window`, validating its bounds.
pub(crate) fn window_dates<Tz: TimeZone>(
    window: &TimeRange,
    tz: &Tz,
) -> Result<(NaiveDate, NaiveDate), AggregationError> {
    if window.start > window.end {
        return Err(AggregationError::InvalidWindow {
            start: window.start,
            end: window.end,
        });
    }
    Ok((
        window.start.with_timezone(tz).date_naive(),
        window.end.with_timezone(tz).date_naive(),
    ))
}

/// Records attributed to a day inside `[first, last]`. Records belong to the local calendar day
/// of their start, which is the same as normalizing the window to full days.
pub(crate) fn records_in_days<'a, Tz: TimeZone>(
    records: &'a [WorkRecord],
    first: NaiveDate,
    last: NaiveDate,
    tz: &'a Tz,
) -> impl Iterator<Item = (NaiveDate, &'a WorkRecord)> + 'a {
    records.iter().filter_map(move |record| {
        let date = record.range.start.with_timezone(tz).date_naive();
        (first <= date && date <= last).then_some((date, record))
    })
}

/// Groups `records` by day over `window` in the time zone `tz`.
///
/// Every day of the window gets a bucket even when no record falls into it. The bucket matching
/// `now` is marked as current. With `include_comparison` the period of the same length right
/// before the window is aggregated too and attached day by day, aligned by the offset from the
/// end of each period. Previous days that have no counterpart are dropped.
#[instrument(skip(records, tz))]
pub fn aggregate<Tz: TimeZone>(
    records: &[WorkRecord],
    window: &TimeRange,
    tz: &Tz,
    now: DateTime<Utc>,
    include_comparison: bool,
) -> Result<Vec<DayBucket>, AggregationError> {
    let mut buckets = aggregate_days(records, window, tz, now)?;

    if include_comparison {
        let previous = previous_period(window)?;
        trace!("Previous period {} {}", previous.start, previous.end);
        let previous_buckets = aggregate_days(records, &previous, tz, now)?;

        // Both sequences are aligned on their last day.
        for (current, previous) in buckets.iter_mut().rev().zip(previous_buckets.into_iter().rev())
        {
            current.comparison = Some(DayComparison {
                calendar_date: previous.calendar_date,
                total_duration: previous.total_duration,
                weighted_quality_score: previous.weighted_quality_score,
            });
        }
    }

    Ok(buckets)
}

/// Period of the same length as `window` that ends right before it.
fn previous_period(window: &TimeRange) -> Result<TimeRange, AggregationError> {
    window
        .start
        .checked_sub_signed(TIME_UNIT)
        .and_then(|end| {
            end.checked_sub_signed(window.end - window.start)
                .map(|start| TimeRange { start, end })
        })
        .ok_or(AggregationError::ComparisonOutOfRange {
            start: window.start,
            end: window.end,
        })
}

fn aggregate_days<Tz: TimeZone>(
    records: &[WorkRecord],
    window: &TimeRange,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Result<Vec<DayBucket>, AggregationError> {
    let (first, last) = window_dates(window, tz)?;
    let today = now.with_timezone(tz).date_naive();

    let mut buckets = date_range(first, last)
        .map(|day| (DayBucket::new(day, today), WeightedScore::default()))
        .collect::<Vec<_>>();

    for (date, record) in records_in_days(records, first, last, tz) {
        let index = (date - first).num_days() as usize;
        let (bucket, weighted) = &mut buckets[index];
        weighted.add(record.duration(), *record.quality_score);
        bucket.session_count += 1;
    }

    Ok(buckets
        .into_iter()
        .map(|(bucket, weighted)| DayBucket {
            total_duration: weighted.duration(),
            weighted_quality_score: weighted.score(),
            ..bucket
        })
        .collect())
}

pub(crate) mod duration_ser {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }
}
