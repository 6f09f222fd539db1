use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use focusflow_shared::TaskId;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::query::StatusFilter;

pub const PASSWORD_ENV: &str = "FOCUSFLOW_PASSWORD";

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

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
    name = "focusflow",
    version,
    about = "FocusFlow: terminal client for the FocusFlow task API",
    disable_help_subcommand = true
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

    #[arg(long = "rcfile", global = true)]
    pub rcfile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account.
    Register(CredentialArgs),
    /// Sign in and store the session tokens.
    Login(CredentialArgs),
    /// Forget the stored session.
    Logout,
    /// List tasks matching a search and status filter.
    List(ListArgs),
    /// Add a task.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Flip a task between pending and completed.
    Toggle { id: TaskId },
    /// Change a task's title and/or remarks.
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Show one task with its remarks.
    Show { id: TaskId },
    /// Delete a task after confirmation.
    Delete {
        id: TaskId,
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Print completion counts.
    Stats(ListArgs),
    /// Interactive dashboard.
    Shell,
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(short = 's', long)]
    pub search: Option<String>,

    #[arg(long, default_value = "all", value_parser = parse_status_filter)]
    pub status: StatusFilter,
}

fn parse_status_filter(s: &str) -> Result<StatusFilter, String> {
    s.parse::<StatusFilter>().map_err(|e| e.to_string())
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
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of argv.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
