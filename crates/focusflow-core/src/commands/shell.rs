use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use focusflow_shared::TaskId;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

use super::{AppContext, is_affirmative, user_facing};
use crate::api::HttpApi;
use crate::controller::{DELETE_PROMPT, TaskListController};
use crate::query::StatusFilter;
use crate::render::format_stats;

type Controller = TaskListController<Arc<HttpApi>>;
type Input = Lines<BufReader<Stdin>>;

const HELP: &str = "\
commands:
  search [text]                 filter by text (applied after you stop typing)
  filter all|completed|pending  filter by status
  add <title>                   add a task
  toggle <id>                   flip done/pending
  edit <id> <title> [| remarks] change title and remarks
  view <id>                     show details
  close                         close details / edit
  delete <id>                   delete after confirmation
  list                          refresh now
  stats                         progress counts
  help                          this text
  quit                          leave";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Empty,
    Search(String),
    Filter(StatusFilter),
    Add(String),
    Toggle(TaskId),
    Edit {
        id: TaskId,
        title: String,
        remarks: Option<String>,
    },
    View(TaskId),
    Close,
    Delete(TaskId),
    List,
    Stats,
    Help,
    Quit,
}

fn parse_id(raw: &str) -> Result<TaskId, String> {
    raw.trim()
        .parse::<TaskId>()
        .map_err(|_| format!("expected a task id, got '{}'", raw.trim()))
}

fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ShellCommand::Empty);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "search" | "s" => ShellCommand::Search(rest.to_string()),
        "filter" | "f" => ShellCommand::Filter(rest.parse().map_err(|e| format!("{e}"))?),
        "add" | "a" => ShellCommand::Add(rest.to_string()),
        "toggle" | "t" | "done" => ShellCommand::Toggle(parse_id(rest)?),
        "edit" | "e" => {
            let (id, body) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: edit <id> <title> [| remarks]".to_string())?;
            let (title, remarks) = match body.split_once('|') {
                Some((title, remarks)) => (title.trim(), Some(remarks.trim().to_string())),
                None => (body.trim(), None),
            };
            ShellCommand::Edit {
                id: parse_id(id)?,
                title: title.to_string(),
                remarks,
            }
        }
        "view" | "v" | "show" => ShellCommand::View(parse_id(rest)?),
        "close" => ShellCommand::Close,
        "delete" | "rm" => ShellCommand::Delete(parse_id(rest)?),
        "list" | "ls" | "refresh" => ShellCommand::List,
        "stats" => ShellCommand::Stats,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}'; type help")),
    };
    Ok(cmd)
}

fn prompt() {
    let mut out = io::stdout().lock();
    let _ = write!(out, "focusflow> ");
    let _ = out.flush();
}

fn render_dashboard(ctx: &AppContext, ctl: &Controller) -> anyhow::Result<()> {
    println!();
    ctx.renderer.print_query(&ctl.query())?;
    ctx.renderer.print_task_table(&ctl.tasks())?;
    ctx.renderer.print_stats(&ctl.stats())?;
    Ok(())
}

async fn execute(
    ctx: &AppContext,
    ctl: &Controller,
    input: &mut Input,
    cmd: ShellCommand,
) -> anyhow::Result<()> {
    match cmd {
        ShellCommand::Empty | ShellCommand::Quit => {}
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Search(text) => ctl.set_search_text(text),
        ShellCommand::Filter(filter) => ctl.set_status_filter(filter).await.map_err(user_facing)?,
        ShellCommand::Add(title) => {
            ctl.set_draft_title(title);
            ctl.submit_draft().await.map_err(user_facing)?;
        }
        ShellCommand::Toggle(id) => {
            let task = ctl.find(id).ok_or_else(|| anyhow!("no task with id {id} in view"))?;
            ctl.toggle_completion(&task).await.map_err(user_facing)?;
        }
        ShellCommand::Edit { id, title, remarks } => {
            let task = ctl.find(id).ok_or_else(|| anyhow!("no task with id {id} in view"))?;
            ctl.select_for_edit(&task);
            ctl.set_edit_title(title);
            if let Some(remarks) = remarks {
                ctl.set_edit_remarks(remarks);
            }
            if let Err(err) = ctl.save_edit().await {
                ctl.clear_edit();
                return Err(user_facing(err));
            }
        }
        ShellCommand::View(id) => {
            let task = ctl.find(id).ok_or_else(|| anyhow!("no task with id {id} in view"))?;
            ctl.select_for_view(&task);
            if let Some(viewing) = ctl.viewing() {
                ctx.renderer.print_task_details(&viewing)?;
            }
        }
        ShellCommand::Close => ctl.clear_selection(),
        ShellCommand::Delete(id) => {
            print!("{DELETE_PROMPT} [y/N] ");
            io::stdout().flush()?;
            let answer = input
                .next_line()
                .await
                .context("failed reading confirmation")?
                .unwrap_or_default();
            let confirmed = is_affirmative(&answer);
            if !ctl
                .delete_task(id, &|_: &str| confirmed)
                .await
                .map_err(user_facing)?
            {
                println!("Kept task {id}.");
            }
        }
        ShellCommand::List => ctl.refresh().await.map_err(user_facing)?,
        ShellCommand::Stats => println!("{}", format_stats(&ctl.stats())),
    }
    Ok(())
}

/// Line-mode dashboard. Re-renders whenever the controller applies a new snapshot.
pub(super) async fn run(ctx: &AppContext, ctl: Controller) -> anyhow::Result<()> {
    info!("starting interactive shell");
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();
    let mut updates = ctl.subscribe();

    println!("{HELP}");
    if let Err(err) = ctl.refresh().await {
        eprintln!("error: {:#}", user_facing(err));
    }

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line.context("failed reading stdin")? else {
                    debug!("stdin closed");
                    break;
                };
                match parse_line(&line) {
                    Ok(ShellCommand::Quit) => break,
                    Ok(cmd) => {
                        if let Err(err) = execute(ctx, &ctl, &mut input, cmd).await {
                            eprintln!("error: {err:#}");
                        }
                    }
                    Err(msg) => eprintln!("{msg}"),
                }
                prompt();
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                updates.borrow_and_update();
                render_dashboard(ctx, &ctl)?;
                prompt();
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    ctl.shutdown();
    info!("interactive shell closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_including_empty() {
        assert_eq!(
            parse_line("search buy milk"),
            Ok(ShellCommand::Search("buy milk".to_string()))
        );
        assert_eq!(parse_line("search"), Ok(ShellCommand::Search(String::new())));
        assert_eq!(parse_line("   "), Ok(ShellCommand::Empty));
    }

    #[test]
    fn parses_filter_and_ids() {
        assert_eq!(
            parse_line("filter Pending"),
            Ok(ShellCommand::Filter(StatusFilter::Pending))
        );
        assert!(parse_line("filter soon").is_err());
        assert_eq!(parse_line("toggle 4"), Ok(ShellCommand::Toggle(4)));
        assert!(parse_line("delete x").is_err());
    }

    #[test]
    fn parses_edit_with_and_without_remarks() {
        assert_eq!(
            parse_line("edit 1 New title | blocked on review"),
            Ok(ShellCommand::Edit {
                id: 1,
                title: "New title".to_string(),
                remarks: Some("blocked on review".to_string()),
            })
        );
        assert_eq!(
            parse_line("edit 2 Just title"),
            Ok(ShellCommand::Edit {
                id: 2,
                title: "Just title".to_string(),
                remarks: None,
            })
        );
        assert!(parse_line("edit 3").is_err());
    }

    #[test]
    fn unknown_verbs_are_rejected() {
        assert!(parse_line("frobnicate 1").is_err());
        assert_eq!(parse_line("QUIT"), Ok(ShellCommand::Quit));
    }
}
