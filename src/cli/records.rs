use std::{fmt::Display, sync::Arc};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use tracing::{debug, info};

use crate::{
    sessions::{
        entities::{QualityScore, TimeRange, WorkRecord},
        grouping::group_by_date,
        overlap::{excluding, find_conflicts, has_overlap},
    },
    storage::record_storage::RecordStorage,
};

use super::{
    OwnerContext,
    dates::{DATE_EXAMPLES, WindowArgs, parse_date},
    report::format_duration,
};

#[derive(Debug, Parser)]
pub struct RecordCommand {
    #[arg(long, short, help = format!("Start of the session. {DATE_EXAMPLES}"))]
    start: String,
    #[arg(long, short, help = format!("End of the session. {DATE_EXAMPLES}"))]
    end: String,
    #[arg(long, visible_alias = "focus", help = "Focus level from 1 to 10")]
    score: QualityScore,
    #[arg(long, help = "Project the session belongs to")]
    project: Option<String>,
}

#[derive(Debug, Parser)]
pub struct EditCommand {
    #[arg(help = "Id of the session")]
    id: String,
    #[arg(long, short, help = format!("New start of the session. {DATE_EXAMPLES}"))]
    start: Option<String>,
    #[arg(long, short, help = format!("New end of the session. {DATE_EXAMPLES}"))]
    end: Option<String>,
    #[arg(long, visible_alias = "focus", help = "New focus level from 1 to 10")]
    score: Option<QualityScore>,
    #[arg(long, help = "New project of the session", conflicts_with = "no_project")]
    project: Option<String>,
    #[arg(long, help = "Detach the session from its project")]
    no_project: bool,
}

/// Changes applied to a record during editing. Missing values are left as they are.
#[derive(Debug, Default)]
pub struct RecordChanges {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub quality_score: Option<QualityScore>,
    pub project: Option<Option<Arc<str>>>,
}

fn describe<Tz: TimeZone>(record: &WorkRecord, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    format!(
        "{} {} - {}\t{}\tfocus {}\t{}",
        record.id,
        record.range.start.with_timezone(tz).format("%x %H:%M"),
        record.range.end.with_timezone(tz).format("%H:%M"),
        format_duration(record.duration()),
        record.quality_score,
        record.project.as_deref().unwrap_or("-"),
    )
}

/// Builds an error explaining which sessions are in the way of `range`.
fn conflict_error<'a, Tz: TimeZone>(
    range: &TimeRange,
    others: impl IntoIterator<Item = &'a WorkRecord>,
    tz: &Tz,
) -> anyhow::Error
where
    Tz::Offset: Display,
{
    let conflicts = find_conflicts(range, others)
        .into_iter()
        .map(|v| format!("  {}", describe(v, tz)))
        .collect::<Vec<_>>();
    anyhow!(
        "Session overlaps with {} existing session(s):\n{}",
        conflicts.len(),
        conflicts.join("\n")
    )
}

/// Saves a new session unless it overlaps with one of owner's sessions.
pub async fn add_record<S: RecordStorage, Tz: TimeZone>(
    context: &OwnerContext<S, Tz>,
    range: TimeRange,
    quality_score: QualityScore,
    project: Option<Arc<str>>,
) -> Result<WorkRecord>
where
    Tz::Offset: Display,
{
    let records = context.storage.get_records_for(&context.owner).await?;
    if has_overlap(&range, records.iter().map(|v| &v.range)) {
        return Err(conflict_error(&range, &records, &context.tz));
    }

    let record = WorkRecord::new(context.owner.clone(), project, range, quality_score);
    context.storage.append(&record).await?;
    info!("Added session {}", record.id);
    Ok(record)
}

/// Applies `changes` to a session. The session's previous version doesn't take part in the
/// overlap check.
pub async fn edit_record<S: RecordStorage, Tz: TimeZone>(
    context: &OwnerContext<S, Tz>,
    id: &str,
    changes: RecordChanges,
) -> Result<WorkRecord>
where
    Tz::Offset: Display,
{
    let records = context.storage.get_records_for(&context.owner).await?;
    let Some(previous) = records.iter().find(|v| &*v.id == id) else {
        bail!("There is no session {id}");
    };

    let start = changes.start.unwrap_or(previous.range.start);
    let end = changes.end.unwrap_or(previous.range.end);
    let Some(range) = TimeRange::new_opt(start, end) else {
        bail!("Start of a session {start} has to be before its end {end}");
    };

    let others = excluding(&records, id).collect::<Vec<_>>();
    if has_overlap(&range, others.iter().map(|v| &v.range)) {
        return Err(conflict_error(&range, others, &context.tz));
    }

    let mut updated = previous.clone().with_range(range);
    if let Some(quality_score) = changes.quality_score {
        updated = updated.with_quality_score(quality_score);
    }
    if let Some(project) = changes.project {
        updated = updated.with_project(project);
    }

    if !context.storage.replace(&updated).await? {
        bail!("Session {id} was removed while editing");
    }
    debug!("Edited session {id}");
    Ok(updated)
}

pub async fn remove_record<S: RecordStorage, Tz: TimeZone>(
    context: &OwnerContext<S, Tz>,
    id: &str,
) -> Result<()> {
    if !context.storage.remove(&context.owner, id).await? {
        bail!("There is no session {id}");
    }
    Ok(())
}

pub async fn process_add_command<S: RecordStorage, Tz: TimeZone>(
    RecordCommand {
        start,
        end,
        score,
        project,
    }: RecordCommand,
    context: &OwnerContext<S, Tz>,
) -> Result<()>
where
    Tz::Offset: Copy + Display,
{
    let now = context.clock.time();
    let start = parse_date(&start, now, &context.tz, context.date_style)?;
    let end = parse_date(&end, now, &context.tz, context.date_style)?;
    let Some(range) = TimeRange::new_opt(start, end) else {
        bail!("Start of a session {start} has to be before its end {end}");
    };

    let record = add_record(context, range, score, project.map(Into::into)).await?;
    println!("Added {}", describe(&record, &context.tz));
    Ok(())
}

pub async fn process_edit_command<S: RecordStorage, Tz: TimeZone>(
    EditCommand {
        id,
        start,
        end,
        score,
        project,
        no_project,
    }: EditCommand,
    context: &OwnerContext<S, Tz>,
) -> Result<()>
where
    Tz::Offset: Copy + Display,
{
    let now = context.clock.time();
    let changes = RecordChanges {
        start: start
            .map(|v| parse_date(&v, now, &context.tz, context.date_style))
            .transpose()?,
        end: end
            .map(|v| parse_date(&v, now, &context.tz, context.date_style))
            .transpose()?,
        quality_score: score,
        project: if no_project {
            Some(None)
        } else {
            project.map(|v| Some(v.into()))
        },
    };

    let record = edit_record(context, &id, changes).await?;
    println!("Updated {}", describe(&record, &context.tz));
    Ok(())
}

pub async fn process_list_command<S: RecordStorage, Tz: TimeZone>(
    window: WindowArgs,
    project: Option<String>,
    context: &OwnerContext<S, Tz>,
) -> Result<()>
where
    Tz::Offset: Copy + Display,
{
    let window = window.resolve(context.clock.time(), &context.tz, context.date_style)?;
    let records = context.storage.get_records_for(&context.owner).await?;
    let records = records
        .iter()
        .filter(|v| project.is_none() || v.project.as_deref() == project.as_deref());
    let first = window.start.with_timezone(&context.tz).date_naive();
    let last = window.end.with_timezone(&context.tz).date_naive();

    for (day, sessions) in group_by_date(records, &context.tz).range(first..=last) {
        println!("{}", day.format("%x"));
        for session in sessions {
            println!("  {}", describe(session, &context.tz));
        }
        println!();
    }
    Ok(())
}
