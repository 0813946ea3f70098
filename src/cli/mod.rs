pub mod dates;
pub mod records;
pub mod report;

use std::{fmt::Display, path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use dates::{DateStyle, WindowArgs};
use records::{EditCommand, RecordCommand};
use report::{HoursCommand, ReportCommand};
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    storage::record_storage::{RecordStorage, RecordStorageImpl},
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{CLI_PREFIX, LoggingOptions, enable_logging},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Focuslog", version, long_about = None)]
#[command(
    about = "Application for logging work sessions and analyzing focus time",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "FOCUSLOG_OWNER",
        default_value = "default",
        help = "Owner of the sessions"
    )]
    owner: String,
    #[arg(
        long,
        global = true,
        env = "FOCUSLOG_TZ",
        help = "IANA time zone of the owner, e.g. \"Europe/Kyiv\". Defaults to the system time zone"
    )]
    tz: Option<chrono_tz::Tz>,
    #[arg(
        long,
        global = true,
        default_value_t = DateStyle::Uk,
        help = "Date order used during parsing. Uk is day/month/year, Us is month/day/year"
    )]
    date_style: DateStyle,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Log a new work session")]
    Add {
        #[command(flatten)]
        command: RecordCommand,
    },
    #[command(about = "Change an existing work session")]
    Edit {
        #[command(flatten)]
        command: EditCommand,
    },
    #[command(about = "Remove a work session")]
    Remove {
        #[arg(help = "Id of the session")]
        id: String,
    },
    #[command(about = "List sessions grouped by day")]
    List {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, help = "Only show sessions of a project")]
        project: Option<String>,
    },
    #[command(about = "Display focus time per day")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Display focus time per hour of a day")]
    Hours {
        #[command(flatten)]
        command: HoursCommand,
    },
}

/// Everything a command needs to know about the person it runs for.
pub struct OwnerContext<S, Tz: TimeZone> {
    pub storage: S,
    pub owner: Arc<str>,
    pub tz: Tz,
    pub date_style: DateStyle,
    pub clock: Box<dyn Clock>,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let application_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    enable_logging(
        &application_dir,
        LoggingOptions {
            prefix: CLI_PREFIX,
            level: logging_level,
            show_std: args.log,
        },
    )?;
    debug!("Running {:?} for {}", args.commands, args.owner);

    let storage = RecordStorageImpl::new(application_dir.join("records"))?;
    let owner: Arc<str> = args.owner.into();

    match args.tz {
        Some(tz) => {
            let context = OwnerContext {
                storage,
                owner,
                tz,
                date_style: args.date_style,
                clock: Box::new(DefaultClock),
            };
            run_command(args.commands, &context).await
        }
        None => {
            let context = OwnerContext {
                storage,
                owner,
                tz: Local,
                date_style: args.date_style,
                clock: Box::new(DefaultClock),
            };
            run_command(args.commands, &context).await
        }
    }
}

async fn run_command<S: RecordStorage, Tz: TimeZone>(
    commands: Commands,
    context: &OwnerContext<S, Tz>,
) -> Result<()>
where
    Tz::Offset: Copy + Display,
{
    match commands {
        Commands::Add { command } => records::process_add_command(command, context).await,
        Commands::Edit { command } => records::process_edit_command(command, context).await,
        Commands::Remove { id } => {
            records::remove_record(context, &id).await?;
            println!("Removed {id}");
            Ok(())
        }
        Commands::List { window, project } => {
            records::process_list_command(window, project, context).await
        }
        Commands::Report { command } => report::process_report_command(command, context).await,
        Commands::Hours { command } => report::process_hours_command(command, context).await,
    }
}
