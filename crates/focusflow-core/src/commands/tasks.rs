use std::sync::Arc;

use anyhow::anyhow;
use focusflow_shared::{TaskDto, TaskId};
use tracing::instrument;

use super::{AppContext, prompt_yes_no, user_facing};
use crate::api::HttpApi;
use crate::cli::ListArgs;
use crate::controller::TaskListController;
use crate::query::Query;
use crate::render::format_stats;

type Controller = TaskListController<Arc<HttpApi>>;

async fn load(ctl: &Controller, query: Query) -> anyhow::Result<()> {
    ctl.set_query(query);
    ctl.refresh().await.map_err(user_facing)
}

async fn load_task(ctl: &Controller, id: TaskId) -> anyhow::Result<TaskDto> {
    load(ctl, Query::default()).await?;
    ctl.find(id).ok_or_else(|| anyhow!("no task with id {id}"))
}

fn query_from(args: ListArgs) -> Query {
    Query {
        search_text: args.search.unwrap_or_default(),
        status_filter: args.status,
    }
}

#[instrument(skip(ctx, ctl))]
pub(super) async fn list(ctx: &AppContext, ctl: &Controller, args: ListArgs) -> anyhow::Result<()> {
    load(ctl, query_from(args)).await?;
    ctx.renderer.print_task_table(&ctl.tasks())?;
    ctx.renderer.print_stats(&ctl.stats())?;
    Ok(())
}

#[instrument(skip(ctx, ctl))]
pub(super) async fn stats(ctx: &AppContext, ctl: &Controller, args: ListArgs) -> anyhow::Result<()> {
    load(ctl, query_from(args)).await?;
    ctx.renderer.print_stats(&ctl.stats())?;
    Ok(())
}

#[instrument(skip(_ctx, ctl, title))]
pub(super) async fn add(_ctx: &AppContext, ctl: &Controller, title: &str) -> anyhow::Result<()> {
    let created = ctl.add_task(title).await.map_err(user_facing)?;
    println!("Created task {}: {}", created.id, created.title);
    report_refresh_problem(ctl);
    Ok(())
}

#[instrument(skip(_ctx, ctl))]
pub(super) async fn toggle(_ctx: &AppContext, ctl: &Controller, id: TaskId) -> anyhow::Result<()> {
    let task = load_task(ctl, id).await?;
    let updated = ctl.toggle_completion(&task).await.map_err(user_facing)?;
    println!(
        "Task {} is now {}.",
        updated.id,
        updated.status_label().to_ascii_lowercase()
    );
    println!("{}", format_stats(&ctl.stats()));
    Ok(())
}

#[instrument(skip(_ctx, ctl, title, remarks))]
pub(super) async fn edit(
    _ctx: &AppContext,
    ctl: &Controller,
    id: TaskId,
    title: Option<String>,
    remarks: Option<String>,
) -> anyhow::Result<()> {
    if title.is_none() && remarks.is_none() {
        return Err(anyhow!("nothing to change; pass --title and/or --remarks"));
    }

    let task = load_task(ctl, id).await?;
    ctl.select_for_edit(&task);
    if let Some(title) = title {
        ctl.set_edit_title(title);
    }
    if let Some(remarks) = remarks {
        ctl.set_edit_remarks(remarks);
    }
    let updated = ctl.save_edit().await.map_err(user_facing)?;
    println!("Updated task {}.", updated.id);
    Ok(())
}

#[instrument(skip(ctx, ctl))]
pub(super) async fn show(ctx: &AppContext, ctl: &Controller, id: TaskId) -> anyhow::Result<()> {
    let task = load_task(ctl, id).await?;
    ctl.select_for_view(&task);
    if let Some(viewing) = ctl.viewing() {
        ctx.renderer.print_task_details(&viewing)?;
    }
    Ok(())
}

#[instrument(skip(_ctx, ctl))]
pub(super) async fn delete(
    _ctx: &AppContext,
    ctl: &Controller,
    id: TaskId,
    yes: bool,
) -> anyhow::Result<()> {
    let confirm = |prompt: &str| yes || prompt_yes_no(prompt);
    if ctl.delete_task(id, &confirm).await.map_err(user_facing)? {
        println!("Deleted task {id}.");
        report_refresh_problem(ctl);
    } else {
        println!("Kept task {id}.");
    }
    Ok(())
}

fn report_refresh_problem(ctl: &Controller) {
    if let Some(err) = ctl.last_error() {
        eprintln!("warning: task list may be out of date: {err}");
    }
}
