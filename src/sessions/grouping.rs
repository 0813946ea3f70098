use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone};

use super::entities::WorkRecord;

/// Groups records by the local calendar date of their start. Days are ordered ascending and
/// records inside of a day by their start.
pub fn group_by_date<'a, Tz: TimeZone>(
    records: impl IntoIterator<Item = &'a WorkRecord>,
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<&'a WorkRecord>> {
    let mut groups = BTreeMap::<NaiveDate, Vec<&'a WorkRecord>>::new();
    for record in records {
        groups
            .entry(record.range.start.with_timezone(tz).date_naive())
            .or_default()
            .push(record);
    }
    for day in groups.values_mut() {
        day.sort_by_key(|v| v.range.start);
    }
    groups
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use chrono_tz::Asia::Tokyo;

    use crate::sessions::entities::{QualityScore, TimeRange, WorkRecord};

    use super::group_by_date;

    #[test]
    fn test_group_by_local_date() {
        let day = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let at = |hour: u32| {
            Utc.from_utc_datetime(&day.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap()))
        };
        let record = |id: &str, hour: u32| WorkRecord {
            id: id.into(),
            owner_id: "owner".into(),
            project: None,
            range: TimeRange::new_opt(at(hour), at(hour) + Duration::minutes(30)).unwrap(),
            quality_score: QualityScore::new_opt(5.).unwrap(),
        };
        // 16:00 UTC is already the next day in Tokyo.
        let records = [record("late", 16), record("b", 10), record("a", 2)];

        let groups = group_by_date(&records, &Tokyo);

        assert_eq!(groups.len(), 2);
        let first = &groups[&day];
        assert_eq!(first.iter().map(|v| &*v.id).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(groups[&day.succ_opt().unwrap()].len(), 1);
    }
}
