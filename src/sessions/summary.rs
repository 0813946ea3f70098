use chrono::Duration;
use serde::Serialize;

use super::aggregation::{DayBucket, WeightedScore, duration_ser};

/// Totals of a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodTotals {
    #[serde(with = "duration_ser")]
    pub total_duration: Duration,
    pub weighted_quality_score: Option<f64>,
    pub active_days: usize,
    pub days: usize,
}

impl PeriodTotals {
    fn collect(values: impl IntoIterator<Item = (Duration, Option<f64>)>) -> Self {
        let mut weighted = WeightedScore::default();
        let mut active_days = 0;
        let mut days = 0;
        for (duration, score) in values {
            days += 1;
            if !duration.is_zero() {
                active_days += 1;
            }
            if let Some(score) = score {
                weighted.add(duration, score);
            }
        }
        Self {
            total_duration: weighted.duration(),
            weighted_quality_score: weighted.score(),
            active_days,
            days,
        }
    }

    pub fn daily_average(&self) -> Duration {
        if self.days == 0 {
            Duration::zero()
        } else {
            self.total_duration / self.days as i32
        }
    }
}

/// Summary of an aggregated window with optional comparison against the previous period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub current: PeriodTotals,
    pub session_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PeriodTotals>,
}

impl PeriodSummary {
    /// Previous period totals only include days that were attached to a bucket.
    pub fn from_buckets(buckets: &[DayBucket]) -> Self {
        let current = PeriodTotals::collect(
            buckets
                .iter()
                .map(|v| (v.total_duration, v.weighted_quality_score)),
        );
        let has_comparison = buckets.iter().any(|v| v.comparison.is_some());
        let previous = has_comparison.then(|| {
            PeriodTotals::collect(
                buckets
                    .iter()
                    .filter_map(|v| v.comparison.as_ref())
                    .map(|v| (v.total_duration, v.weighted_quality_score)),
            )
        });

        Self {
            current,
            session_count: buckets.iter().map(|v| v.session_count).sum(),
            previous,
        }
    }

    /// Relative change of focus time compared to the previous period, in percent. There is no
    /// change to report if the previous period has no focus time.
    pub fn duration_change(&self) -> Option<f64> {
        let previous = self.previous?.total_duration.num_seconds();
        if previous == 0 {
            return None;
        }
        let current = self.current.total_duration.num_seconds();
        Some((current - previous) as f64 / previous as f64 * 100.)
    }

    /// Absolute change of the weighted focus level.
    pub fn score_change(&self) -> Option<f64> {
        let previous = self.previous?.weighted_quality_score?;
        Some(self.current.weighted_quality_score? - previous)
    }
}
