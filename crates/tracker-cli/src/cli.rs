use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
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
    name = "tracker",
    version,
    about = "Project tracker: tasks, notes and status columns"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override a config key for this run (repeatable)
    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "trackerrc", global = true)]
    pub trackerrc: Option<PathBuf>,

    /// Directory holding the task file
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task
    Add(AddArgs),
    /// Change a task's title, deadline or status
    Edit(EditArgs),
    /// Delete a task and its notes
    Delete(DeleteArgs),
    /// Show the three status columns
    List(ListArgs),
    /// Show task counts per status
    Stats,
    /// Show one task with its notes
    Show(ShowArgs),
    /// Add or delete notes
    #[command(subcommand)]
    Note(NoteCommand),
    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,

    /// YYYY-MM-DD, today, tomorrow, a weekday or a month (default: today)
    #[arg(short = 'd', long)]
    pub deadline: Option<String>,

    #[arg(short = 's', long)]
    pub status: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Task id or unique id prefix
    pub id: String,

    #[arg(short = 't', long)]
    pub title: Option<String>,

    #[arg(short = 'd', long)]
    pub deadline: Option<String>,

    #[arg(short = 's', long)]
    pub status: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive title filter
    #[arg(short = 's', long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum NoteCommand {
    /// Add a note to a task
    Add(NoteAddArgs),
    /// Delete a note from a task
    Delete(NoteDeleteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct NoteAddArgs {
    pub task_id: String,

    #[arg(required = true, num_args = 1..)]
    pub content: Vec<String>,

    /// The day the note is about (default: today)
    #[arg(short = 'd', long)]
    pub date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NoteDeleteArgs {
    pub task_id: String,

    pub note_id: String,

    #[arg(short = 'y', long)]
    pub yes: bool,
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
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
