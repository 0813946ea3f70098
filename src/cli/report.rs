use std::fmt::Display;

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{Duration, TimeZone};
use clap::Parser;
use serde::Serialize;

use crate::{
    sessions::{
        aggregation::{DayBucket, aggregate},
        entities::WorkRecord,
        hourly::{HourBucket, hourly_distribution},
        summary::PeriodSummary,
    },
    storage::record_storage::RecordStorage,
    utils::percentage::{Percentage, duration_percentage},
};

use super::{OwnerContext, dates::WindowArgs};

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[command(flatten)]
    window: WindowArgs,
    #[arg(
        short,
        long,
        help = "Compare every day with the matching day of the previous period of the same length"
    )]
    compare: bool,
    #[arg(long, help = "Only include sessions of a project")]
    project: Option<String>,
    #[arg(long, help = "Print the report as json")]
    json: bool,
}

#[derive(Debug, Parser)]
pub struct HoursCommand {
    #[command(flatten)]
    window: WindowArgs,
    #[arg(long, help = "Only include sessions of a project")]
    project: Option<String>,
    #[arg(
        short = 'p',
        long = "percentage",
        help = "Hide hours with a smaller share of focus time",
        default_value_t = Percentage::ZERO
    )]
    min_percentage: Percentage,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub days: Vec<DayBucket>,
    pub summary: PeriodSummary,
}

fn project_records(records: Vec<WorkRecord>, project: Option<&str>) -> Vec<WorkRecord> {
    match project {
        Some(project) => records
            .into_iter()
            .filter(|v| v.project.as_deref() == Some(project))
            .collect(),
        None => records,
    }
}

/// Builds daily report of focus time for owner of `context`.
pub async fn build_report<S: RecordStorage, Tz: TimeZone>(
    context: &OwnerContext<S, Tz>,
    window: &WindowArgs,
    compare: bool,
    project: Option<&str>,
) -> Result<Report>
where
    Tz::Offset: Copy,
{
    let now = context.clock.time();
    let window = window.resolve(now, &context.tz, context.date_style)?;
    let records = project_records(
        context.storage.get_records_for(&context.owner).await?,
        project,
    );

    let days = aggregate(&records, &window, &context.tz, now, compare)?;
    let summary = PeriodSummary::from_buckets(&days);
    Ok(Report { days, summary })
}

pub async fn build_hours<S: RecordStorage, Tz: TimeZone>(
    context: &OwnerContext<S, Tz>,
    window: &WindowArgs,
    project: Option<&str>,
) -> Result<Vec<HourBucket>>
where
    Tz::Offset: Copy,
{
    let window = window.resolve(context.clock.time(), &context.tz, context.date_style)?;
    let records = project_records(
        context.storage.get_records_for(&context.owner).await?,
        project,
    );
    Ok(hourly_distribution(&records, &window, &context.tz)?)
}

pub async fn process_report_command<S: RecordStorage, Tz: TimeZone>(
    ReportCommand {
        window,
        compare,
        project,
        json,
    }: ReportCommand,
    context: &OwnerContext<S, Tz>,
) -> Result<()>
where
    Tz::Offset: Copy + Display,
{
    let report = build_report(context, &window, compare, project.as_deref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for day in &report.days {
        let date = day.calendar_date.format("%a %x").to_string();
        let date = if day.is_current_day {
            Style::new().bold().paint(date).to_string()
        } else {
            date
        };
        let mut line = format!(
            "{date}\t{}\t{}\t{}",
            format_duration(day.total_duration),
            format_score(day.weighted_quality_score),
            day.session_count
        );
        if let Some(comparison) = &day.comparison {
            line += &format!(
                "\t| {}\t{}\t{}",
                comparison.calendar_date.format("%a %x"),
                format_duration(comparison.total_duration),
                format_score(comparison.weighted_quality_score),
            );
        }
        println!("{line}");
    }

    let summary = &report.summary;
    println!();
    println!(
        "Total\t{}\tfocus {}\t{} sessions\t{}/{} active days\t{} per day",
        format_duration(summary.current.total_duration),
        format_score(summary.current.weighted_quality_score),
        summary.session_count,
        summary.current.active_days,
        summary.current.days,
        format_duration(summary.current.daily_average()),
    );
    if let Some(previous) = &summary.previous {
        println!(
            "Previous\t{}\tfocus {}\t{}/{} active days\t{}\t{}",
            format_duration(previous.total_duration),
            format_score(previous.weighted_quality_score),
            previous.active_days,
            previous.days,
            format_change(summary.duration_change(), "%"),
            format_change(summary.score_change(), " focus"),
        );
    }
    Ok(())
}

pub async fn process_hours_command<S: RecordStorage, Tz: TimeZone>(
    HoursCommand {
        window,
        project,
        min_percentage,
    }: HoursCommand,
    context: &OwnerContext<S, Tz>,
) -> Result<()>
where
    Tz::Offset: Copy,
{
    let hours = build_hours(context, &window, project.as_deref()).await?;
    let total = hours
        .iter()
        .fold(Duration::zero(), |ac, next| ac + next.total_duration);

    for hour in hours {
        let share = duration_percentage(hour.total_duration, total);
        if hour.total_duration.is_zero() || share < min_percentage {
            continue;
        }
        println!(
            "{:02}:00\t{}\t{}\t{}",
            hour.hour,
            share,
            format_duration(hour.total_duration),
            format_score(hour.weighted_quality_score),
        );
    }
    Ok(())
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!("{}h{}m", v.num_hours(), v.num_minutes() % 60)
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".into(), |v| format!("{v:.1}"))
}

fn format_change(change: Option<f64>, unit: &str) -> String {
    match change {
        Some(v) if v > 0. => Colour::Green.paint(format!("+{v:.1}{unit}")).to_string(),
        Some(v) if v < 0. => Colour::Red.paint(format!("{v:.1}{unit}")).to_string(),
        Some(_) => format!("0{unit}"),
        None => "-".into(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        cli::{
            OwnerContext,
            dates::{DateStyle, WindowArgs},
        },
        sessions::{
            entities::{QualityScore, TimeRange, WorkRecord},
            window::WindowPreset,
        },
        storage::record_storage::{RecordStorage, RecordStorageImpl},
        utils::clock::MockClock,
    };

    use super::{build_hours, build_report, format_duration};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap()),
        )
    }

    async fn context_with_records(
        storage: RecordStorageImpl,
    ) -> Result<OwnerContext<RecordStorageImpl, Utc>> {
        let sessions = [
            (1, 9, 2, 8., Some("a")),
            (1, 13, 1, 5., None),
            (10, 9, 1, 6., Some("a")),
            (14, 20, 3, 9., Some("b")),
        ];
        for (day, hour, hours, score, project) in sessions {
            let start = at(day, hour);
            storage
                .append(&WorkRecord::new(
                    "owner".into(),
                    project.map(Into::into),
                    TimeRange::new_opt(start, start + Duration::hours(hours)).unwrap(),
                    QualityScore::new_opt(score).unwrap(),
                ))
                .await?;
        }

        let mut clock = MockClock::new();
        clock.expect_time().returning(|| at(14, 23));
        Ok(OwnerContext {
            storage,
            owner: "owner".into(),
            tz: Utc,
            date_style: DateStyle::Uk,
            clock: Box::new(clock),
        })
    }

    #[tokio::test]
    async fn test_report_with_comparison() -> Result<()> {
        let dir = tempdir()?;
        let context = context_with_records(RecordStorageImpl::new(dir.path().to_owned())?).await?;

        let report = build_report(
            &context,
            &WindowArgs::preset(WindowPreset::Last7Days),
            true,
            None,
        )
        .await?;

        assert_eq!(report.days.len(), 7);
        assert!(report.days[6].is_current_day);
        assert_eq!(report.days[6].total_duration, Duration::hours(3));
        assert_eq!(report.summary.current.total_duration, Duration::hours(4));
        assert_eq!(report.summary.session_count, 2);

        let previous = report.summary.previous.unwrap();
        // Jan 1 is the first day of the previous period and aligns with Jan 8.
        assert_eq!(report.days[0].comparison_calendar_date(), Some(at(1, 0).date_naive()));
        assert_eq!(previous.total_duration, Duration::hours(3));
        assert!((previous.weighted_quality_score.unwrap() - 7.).abs() < 1e-9);
        assert!((report.summary.duration_change().unwrap() - 100. / 3.).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_report_for_project() -> Result<()> {
        let dir = tempdir()?;
        let context = context_with_records(RecordStorageImpl::new(dir.path().to_owned())?).await?;

        let report = build_report(
            &context,
            &WindowArgs::preset(WindowPreset::Last30Days),
            false,
            Some("a"),
        )
        .await?;

        assert_eq!(report.days.len(), 30);
        assert_eq!(report.summary.current.total_duration, Duration::hours(3));
        assert_eq!(report.summary.current.active_days, 2);
        assert!(report.summary.previous.is_none());

        let json = serde_json::to_value(&report)?;
        assert_eq!(json["summary"]["current"]["total_duration"], 3 * 60 * 60);
        Ok(())
    }

    #[tokio::test]
    async fn test_hours() -> Result<()> {
        let dir = tempdir()?;
        let context = context_with_records(RecordStorageImpl::new(dir.path().to_owned())?).await?;

        let hours = build_hours(
            &context,
            &WindowArgs::preset(WindowPreset::Last30Days),
            None,
        )
        .await?;

        assert_eq!(hours[9].total_duration, Duration::hours(2));
        assert!((hours[9].weighted_quality_score.unwrap() - 7.).abs() < 1e-9);
        assert_eq!(hours[20].total_duration, Duration::hours(1));
        assert_eq!(hours[23].total_duration, Duration::zero());
        Ok(())
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(125)), "2m5s");
        assert_eq!(format_duration(Duration::minutes(185)), "3h5m");
    }
}
