use super::entities::{TimeRange, WorkRecord};

/// Returns true if `candidate` shares any instant with one of `existing`. Ranges are half-open, so
/// a session ending at 10:00 doesn't conflict with one starting at 10:00.
///
/// Malformed ranges (`start >= end`) are not checked here. When editing a record, the caller has
/// to remove the previous version of that record from `existing` (see [excluding]).
pub fn has_overlap<'a>(
    candidate: &TimeRange,
    existing: impl IntoIterator<Item = &'a TimeRange>,
) -> bool {
    existing.into_iter().any(|range| candidate.overlaps(range))
}

/// Returns every record that conflicts with `candidate`. Used for explaining why a save was
/// rejected.
pub fn find_conflicts<'a>(
    candidate: &TimeRange,
    records: impl IntoIterator<Item = &'a WorkRecord>,
) -> Vec<&'a WorkRecord> {
    records
        .into_iter()
        .filter(|record| candidate.overlaps(&record.range))
        .collect()
}

/// Drops the record with `id`, so that an edited record isn't compared with its own old version.
pub fn excluding<'a>(
    records: impl IntoIterator<Item = &'a WorkRecord>,
    id: &'a str,
) -> impl Iterator<Item = &'a WorkRecord> {
    records.into_iter().filter(move |record| &*record.id != id)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    use crate::sessions::entities::{QualityScore, TimeRange, WorkRecord};

    use super::{excluding, find_conflicts, has_overlap};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
        Utc.from_utc_datetime(
            &TEST_DATE.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap()),
        )
    }

    fn range(from: (u32, u32), to: (u32, u32)) -> TimeRange {
        TimeRange::new_opt(at(from.0, from.1), at(to.0, to.1)).unwrap()
    }

    fn record(id: &str, range: TimeRange) -> WorkRecord {
        WorkRecord {
            id: id.into(),
            owner_id: "owner".into(),
            project: None,
            range,
            quality_score: QualityScore::new_opt(5.).unwrap(),
        }
    }

    #[test]
    fn test_empty_existing() {
        assert!(!has_overlap(&range((9, 0), (10, 0)), []));
    }

    #[test]
    fn test_identical_range() {
        let existing = [range((8, 0), (8, 30)), range((9, 0), (10, 0))];
        for value in &existing {
            assert!(has_overlap(value, &existing));
        }
    }

    #[test]
    fn test_abutting_ranges() {
        let existing = [range((9, 0), (10, 0))];
        assert!(!has_overlap(&range((10, 0), (11, 0)), &existing));
        assert!(!has_overlap(&range((8, 0), (9, 0)), &existing));
    }

    #[test]
    fn test_same_start() {
        let existing = [range((9, 0), (10, 0))];
        assert!(has_overlap(&range((9, 0), (9, 15)), &existing));
    }

    #[test]
    fn test_contained_and_partial() {
        let existing = [range((9, 0), (11, 0))];
        assert!(has_overlap(&range((10, 0), (10, 30)), &existing));
        assert!(has_overlap(&range((8, 0), (12, 0)), &existing));
        assert!(has_overlap(&range((10, 30), (11, 30)), &existing));
        assert!(has_overlap(&range((8, 30), (9, 1)), &existing));
    }

    #[test]
    fn test_disjoint() {
        let existing = [range((9, 0), (10, 0)), range((13, 0), (14, 0))];
        assert!(!has_overlap(&range((11, 0), (12, 0)), &existing));
        assert!(has_overlap(&range((11, 0), (13, 30)), &existing));
    }

    #[test]
    fn test_edit_excludes_itself() {
        let records = [
            record("a", range((9, 0), (10, 0))),
            record("b", range((10, 0), (11, 0))),
        ];
        let edited = range((9, 15), (10, 0));

        let all = find_conflicts(&edited, &records);
        assert_eq!(all.len(), 1);
        assert_eq!(&*all[0].id, "a");

        let others = find_conflicts(&edited, excluding(&records, "a"));
        assert!(others.is_empty());

        let moved_into_b = range((9, 30), (10, 30));
        let conflicts = find_conflicts(&moved_into_b, excluding(&records, "a"));
        assert_eq!(
            conflicts.iter().map(|v| &*v.id).collect::<Vec<_>>(),
            vec!["b"]
        );
    }
}
