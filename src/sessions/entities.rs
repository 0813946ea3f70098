use std::{fmt::Display, ops::Deref, str::FromStr, sync::Arc};

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open range of time `[start, end)`. A well formed range has `start < end`, which is
/// enforced by [TimeRange::new_opt]. Fields stay public because records coming from storage are
/// already validated.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone, Copy, Hash)]
pub struct TimeRange {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new_opt(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Two ranges overlap if they share any instant. Touching ranges (one ends exactly when the
    /// other starts) don't overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Splits a range into 2 halves, 1 before split, 1 after.
    pub fn split_by(self, split: DateTime<Utc>) -> (Option<TimeRange>, Option<TimeRange>) {
        if split <= self.start {
            (None, Some(self))
        } else if split >= self.end {
            (Some(self), None)
        } else {
            (
                Some(TimeRange {
                    start: self.start,
                    end: split,
                }),
                Some(TimeRange {
                    start: split,
                    end: self.end,
                }),
            )
        }
    }
}

/// Self reported focus level of a session. Always within `[1, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct QualityScore(f64);

impl QualityScore {
    pub const MIN: f64 = 1.;
    pub const MAX: f64 = 10.;

    pub fn new_opt(value: f64) -> Option<QualityScore> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(QualityScore(value))
        } else {
            None
        }
    }
}

impl Display for QualityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QualityScore {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = s.trim().parse::<f64>()?;
        QualityScore::new_opt(v).ok_or_else(|| anyhow!("Focus level {s} is outside of 1..=10"))
    }
}

impl TryFrom<f64> for QualityScore {
    type Error = anyhow::Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        QualityScore::new_opt(value)
            .ok_or_else(|| anyhow!("Focus level {value} is outside of 1..=10"))
    }
}

impl From<QualityScore> for f64 {
    fn from(value: QualityScore) -> Self {
        value.0
    }
}

impl Deref for QualityScore {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A single logged work session. Belongs to exactly one owner.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct WorkRecord {
    pub id: Arc<str>,
    pub owner_id: Arc<str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Arc<str>>,
    #[serde(flatten)]
    pub range: TimeRange,
    pub quality_score: QualityScore,
}

impl WorkRecord {
    /// Creates a record with a freshly generated id.
    pub fn new(
        owner_id: Arc<str>,
        project: Option<Arc<str>>,
        range: TimeRange,
        quality_score: QualityScore,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string().into(),
            owner_id,
            project,
            range,
            quality_score,
        }
    }

    pub fn duration(&self) -> Duration {
        self.range.duration()
    }

    pub fn with_range(self, range: TimeRange) -> Self {
        Self { range, ..self }
    }

    pub fn with_quality_score(self, quality_score: QualityScore) -> Self {
        Self {
            quality_score,
            ..self
        }
    }

    pub fn with_project(self, project: Option<Arc<str>>) -> Self {
        Self { project, ..self }
    }
}
