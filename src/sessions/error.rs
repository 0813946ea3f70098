use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("window start {start} is after window end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("period before window {start} - {end} is out of the supported range")]
    ComparisonOutOfRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}
