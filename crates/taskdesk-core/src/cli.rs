use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::settings::Theme;
use crate::task::{DEFAULT_CATEGORY, Priority, Status};
use crate::views::{CategoryFilter, SortKey, StatusFilter};

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
    name = "taskdesk",
    version,
    about = "Personal task desk with a local account, comments, subtasks and themes",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override a config key, e.g. --rc color=off. May be repeated.
    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Config file to read instead of $TASKDESKRC or ~/.taskdeskrc.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the stored JSON documents.
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account and log in.
    Register {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        password: String,
        #[arg(long = "confirm-password", default_value = "")]
        confirm_password: String,
    },

    /// Log in with email and password.
    Login {
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        password: String,
    },

    /// End the current session.
    Logout,

    /// Show the logged in user.
    Whoami,

    /// Check that an email belongs to the stored session.
    ForgotPassword {
        #[arg(long, default_value = "")]
        email: String,
    },

    /// Edit the current account.
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Task counts, high priority work and recently completed tasks.
    Dashboard,

    /// List the categories in use.
    Categories,

    #[command(subcommand)]
    Task(TaskCommand),

    #[command(subcommand)]
    Comment(CommentCommand),

    #[command(subcommand)]
    Subtask(SubtaskCommand),

    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Change name and email.
    Update {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Change the password.
    Password {
        #[arg(long, default_value = "")]
        current: String,
        #[arg(long = "new", default_value = "")]
        new_password: String,
        #[arg(long, default_value = "")]
        confirm: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct NewTaskArgs {
    pub title: Option<String>,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Due date as YYYY-MM-DD.
    #[arg(long, default_value = "")]
    pub due: String,
    #[arg(long, value_enum, default_value_t = Priority::Medium)]
    pub priority: Priority,
    #[arg(long, default_value = DEFAULT_CATEGORY)]
    pub category: String,
    /// Tag to attach. May be repeated.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditTaskArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, value_enum)]
    pub status: Option<Status>,
    #[arg(long = "tag")]
    pub add_tags: Vec<String>,
    #[arg(long = "untag")]
    pub remove_tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// all | pending | in_progress | completed
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,
    /// all, or one category name.
    #[arg(long, default_value = "all")]
    pub category: CategoryFilter,
    /// Defaults to the list.sort config key.
    #[arg(long, value_enum)]
    pub sort: Option<SortKey>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Create a task.
    Add(NewTaskArgs),
    /// Change fields of a task.
    Edit(EditTaskArgs),
    /// Filter and sort tasks.
    List(ListArgs),
    /// Task details with comments and subtasks.
    Show { id: String },
    /// Set the status of a task.
    Status {
        id: String,
        #[arg(value_enum)]
        status: Status,
    },
    /// Delete a task. Its comments and subtasks stay.
    Delete { id: String },
    /// Attach a tag.
    Tag { id: String, tag: String },
    /// Detach a tag.
    Untag { id: String, tag: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CommentCommand {
    Add { task_id: String, text: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubtaskCommand {
    Add { task_id: String, title: String },
    Done { id: String },
    Undone { id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    Show,
    /// Set the theme, or flip it when none is given.
    Theme {
        #[arg(value_enum)]
        theme: Option<Theme>,
    },
    ToggleNotifications,
    Language { code: String },
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

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = GlobalCli::try_parse_from([
            "taskdesk", "task", "list", "--status", "completed", "--category", "Work", "-vv",
            "--rc", "color=off",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "color");
        match cli.command {
            Command::Task(TaskCommand::List(args)) => {
                assert_eq!(args.status, StatusFilter::Only(Status::Completed));
                assert_eq!(args.category, CategoryFilter::Only("Work".to_string()));
                assert!(args.sort.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_without_title_still_parses() {
        let cli = GlobalCli::try_parse_from(["taskdesk", "task", "add", "--priority", "high"])
            .unwrap();
        match cli.command {
            Command::Task(TaskCommand::Add(args)) => {
                assert!(args.title.is_none());
                assert_eq!(args.priority, Priority::High);
                assert_eq!(args.category, DEFAULT_CATEGORY);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn status_accepts_snake_case() {
        let cli =
            GlobalCli::try_parse_from(["taskdesk", "task", "status", "17", "in_progress"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Task(TaskCommand::Status {
                status: Status::InProgress,
                ..
            })
        ));
    }
}
