use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use taskdeck_shared::{TaskDraft, TaskPatch, iso_date};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "taskdeck: paginated, searchable task table over a REST task API"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "taskdeckrc", global = true)]
    pub taskdeckrc: Option<PathBuf>,

    /// Base URL of the task API, e.g. http://localhost:5000
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print one page of the task table
    List(ListArgs),
    /// Create a task
    Add(AddArgs),
    /// Update fields of a task
    Edit(EditArgs),
    /// Delete a task
    Delete(DeleteArgs),
    /// Interactive table (default)
    Shell,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(short = 's', long = "search")]
    pub search: Option<String>,

    #[arg(short = 'p', long = "page", default_value_t = 1)]
    pub page: usize,

    #[arg(long = "page-size")]
    pub page_size: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(long = "assigned-to")]
    pub assigned_to: String,

    #[arg(long = "status")]
    pub status: String,

    #[arg(long = "due", value_parser = parse_date)]
    pub due: Option<NaiveDate>,

    #[arg(long = "priority")]
    pub priority: String,

    #[arg(long = "comment", action = ArgAction::Append)]
    pub comments: Vec<String>,
}

impl AddArgs {
    pub fn into_draft(self) -> TaskDraft {
        TaskDraft {
            assigned_to: self.assigned_to,
            status: self.status,
            due_date: self.due,
            priority: self.priority,
            comments: self.comments,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(long = "assigned-to")]
    pub assigned_to: Option<String>,

    #[arg(long = "status")]
    pub status: Option<String>,

    #[arg(long = "due", value_parser = parse_date)]
    pub due: Option<NaiveDate>,

    #[arg(long = "priority")]
    pub priority: Option<String>,

    /// Replaces all comments; repeat for several
    #[arg(long = "comment", action = ArgAction::Append)]
    pub comments: Vec<String>,

    /// Drop every comment
    #[arg(long = "clear-comments", conflicts_with = "comments")]
    pub clear_comments: bool,
}

impl EditArgs {
    pub fn to_patch(&self) -> TaskPatch {
        let comments = if self.clear_comments {
            Some(vec![])
        } else if self.comments.is_empty() {
            None
        } else {
            Some(self.comments.clone())
        };

        TaskPatch {
            assigned_to: self.assigned_to.clone(),
            status: self.status.clone(),
            due_date: self.due,
            priority: self.priority.clone(),
            comments,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub id: String,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    iso_date::parse(raw)
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
