use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use serde::Serialize;
use tracing::instrument;

use super::{
    aggregation::{WeightedScore, duration_ser, records_in_days, window_dates},
    entities::{TimeRange, WorkRecord},
    error::AggregationError,
};

/// Focus time that happened during a certain hour of a day, summed over all days of a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    #[serde(with = "duration_ser")]
    pub total_duration: Duration,
    pub weighted_quality_score: Option<f64>,
}

/// Returns start of the local hour following `moment`.
fn next_hour_start<Tz: TimeZone>(moment: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = moment.with_timezone(tz);
    let into_hour = Duration::seconds(local.minute() as i64 * 60 + local.second() as i64)
        + Duration::nanoseconds(local.nanosecond() as i64);
    moment - into_hour + Duration::hours(1)
}

/// Distributes sessions over the 24 hours of a day. Selection of sessions is the same as in
/// [aggregate](super::aggregation::aggregate). Sessions crossing an hour boundary are split, so
/// that each hour only receives the time actually spent in it.
#[instrument(skip(records, tz))]
pub fn hourly_distribution<Tz: TimeZone>(
    records: &[WorkRecord],
    window: &TimeRange,
    tz: &Tz,
) -> Result<Vec<HourBucket>, AggregationError> {
    let (first, last) = window_dates(window, tz)?;
    let mut hours = [WeightedScore::default(); 24];

    for (_, record) in records_in_days(records, first, last, tz) {
        let mut rest = Some(record.range);
        while let Some(range) = rest {
            let (piece, after) = range.split_by(next_hour_start(range.start, tz));
            if let Some(piece) = piece {
                let hour = piece.start.with_timezone(tz).hour() as usize;
                hours[hour].add(piece.duration(), *record.quality_score);
            }
            rest = after;
        }
    }

    Ok(hours
        .iter()
        .enumerate()
        .map(|(hour, weighted)| HourBucket {
            hour: hour as u32,
            total_duration: weighted.duration(),
            weighted_quality_score: weighted.score(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;

    use crate::{
        sessions::entities::{QualityScore, TimeRange, WorkRecord},
        utils::time::{end_of_day, start_of_day},
    };

    use super::hourly_distribution;

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &TEST_DATE.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap()),
        )
    }

    fn record(start: DateTime<Utc>, end: DateTime<Utc>, score: f64) -> WorkRecord {
        WorkRecord {
            id: format!("{start}").into(),
            owner_id: "owner".into(),
            project: None,
            range: TimeRange::new_opt(start, end).unwrap(),
            quality_score: QualityScore::new_opt(score).unwrap(),
        }
    }

    #[test]
    fn test_hourly_split() -> anyhow::Result<()> {
        let records = [
            record(at(9, 30), at(11, 15), 6.),
            record(at(10, 0), at(10, 20), 9.),
        ];
        let window = TimeRange {
            start: start_of_day(TEST_DATE, &Utc).to_utc(),
            end: end_of_day(TEST_DATE, &Utc).to_utc(),
        };

        let hours = hourly_distribution(&records, &window, &Utc)?;

        assert_eq!(hours.len(), 24);
        assert_eq!(hours[9].total_duration, Duration::minutes(30));
        assert_eq!(hours[9].weighted_quality_score, Some(6.));
        assert_eq!(hours[10].total_duration, Duration::minutes(80));
        let expected = (60. * 6. + 20. * 9.) / 80.;
        assert!((hours[10].weighted_quality_score.unwrap() - expected).abs() < 1e-9);
        assert_eq!(hours[11].total_duration, Duration::minutes(15));
        assert!(hours[12].total_duration.is_zero());
        assert_eq!(hours[12].weighted_quality_score, None);

        let total = hours
            .iter()
            .fold(Duration::zero(), |ac, next| ac + next.total_duration);
        assert_eq!(total, Duration::minutes(105 + 20));
        Ok(())
    }

    #[test]
    fn test_hourly_respects_half_hour_offsets() -> anyhow::Result<()> {
        // 04:00 UTC is 09:30 in India, so a 04:00-05:00 session spans 2 local hours.
        let records = [record(at(4, 0), at(5, 0), 5.)];
        let window = TimeRange {
            start: start_of_day(TEST_DATE, &Kolkata).to_utc(),
            end: end_of_day(TEST_DATE, &Kolkata).to_utc(),
        };

        let hours = hourly_distribution(&records, &window, &Kolkata)?;

        assert_eq!(hours[9].total_duration, Duration::minutes(30));
        assert_eq!(hours[10].total_duration, Duration::minutes(30));
        Ok(())
    }
}
