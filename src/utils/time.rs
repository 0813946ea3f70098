use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};

/// Smallest step used by window arithmetic. Instants are stored with second precision.
pub const TIME_UNIT: Duration = Duration::seconds(1);

/// Returns the first instant of `date` in `tz`. If midnight doesn't exist (DST gap) the first
/// instant after the gap is used.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(v) => v,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            // Gaps are at most a few hours long, so walking forward by the hour finds a valid time.
            (1..=24)
                .map(|hours| midnight + Duration::hours(hours))
                .find_map(|v| tz.from_local_datetime(&v).earliest())
                .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
        }
    }
}

/// Returns the last instant (with second precision) of `date` in `tz`.
pub fn end_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    match date.succ_opt() {
        Some(next) => start_of_day(next, tz) - TIME_UNIT,
        None => start_of_day(date, tz) + Duration::days(1) - TIME_UNIT,
    }
}

/// Iterates over dates between start (inclusive) and end (inclusive).
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Timelike};
    use chrono_tz::{America::Sao_Paulo, Europe::Kyiv};

    use super::{date_range, end_of_day, start_of_day};

    #[test]
    fn test_day_bounds_with_offset() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let start = start_of_day(date, &Kyiv);
        let end = end_of_day(date, &Kyiv);
        assert_eq!(start.naive_local().time(), NaiveTime::MIN);
        assert_eq!(
            end.naive_local().time(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap()
        );
        // Kyiv is UTC+3 in summer
        assert_eq!(start.to_utc().hour(), 21);
        assert_eq!((end - start).num_seconds(), 24 * 60 * 60 - 1);
    }

    #[test]
    fn test_start_of_day_in_dst_gap() {
        // Sao Paulo skipped midnight when it still observed DST.
        let date = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap();
        let start = start_of_day(date, &Sao_Paulo);
        assert_eq!(start.date_naive(), date);
        assert_eq!(start.naive_local().time().hour(), 1);
    }

    #[test]
    fn test_date_range_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let days = date_range(start, end).collect::<Vec<_>>();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], start);
        assert_eq!(days[3], end);
        assert_eq!(date_range(end, start).count(), 0);
    }
}
