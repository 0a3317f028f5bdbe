use std::io::{self, Write};

use anyhow::{Context, anyhow, bail};
use chrono::{Local, NaiveDate};
use taskdeck_shared::TaskId;
use tokio::io::BufReader;
use tracing::{debug, info, instrument};

use crate::board::TaskBoard;
use crate::cli::{AddArgs, Command, DeleteArgs, EditArgs, ListArgs};
use crate::client::TaskStore;
use crate::pagination::PageSize;
use crate::render::Renderer;
use crate::shell;
use crate::view::TableEvent;

/// Runs one subcommand against `board`. No subcommand means the
/// interactive shell.
#[instrument(skip(board, renderer, command))]
pub async fn dispatch<S: TaskStore>(
    board: &TaskBoard<S>,
    renderer: &Renderer,
    command: Option<Command>,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    match command.unwrap_or(Command::Shell) {
        Command::Shell => {
            let input = BufReader::new(tokio::io::stdin());
            shell::run(board, renderer, input, io::stdout(), today).await
        }
        other => execute(board, renderer, other, io::stdout(), today).await,
    }
}

/// Runs a one-shot subcommand, writing its output to `out`.
pub async fn execute<S: TaskStore, W: Write>(
    board: &TaskBoard<S>,
    renderer: &Renderer,
    command: Command,
    mut out: W,
    today: NaiveDate,
) -> anyhow::Result<()> {
    debug!(?command, "executing command");
    match command {
        Command::List(args) => cmd_list(board, renderer, args, &mut out, today).await,
        Command::Add(args) => cmd_add(board, renderer, args, &mut out).await,
        Command::Edit(args) => cmd_edit(board, renderer, args, &mut out).await,
        Command::Delete(args) => cmd_delete(board, args, &mut out).await,
        Command::Shell => bail!("the shell cannot be nested"),
    }
}

async fn cmd_list<S: TaskStore, W: Write>(
    board: &TaskBoard<S>,
    renderer: &Renderer,
    args: ListArgs,
    out: &mut W,
    today: NaiveDate,
) -> anyhow::Result<()> {
    load_or_bail(board).await?;

    if let Some(raw) = args.page_size {
        let size = PageSize::try_from(raw).context("invalid --page-size")?;
        board.dispatch(TableEvent::PageSizeChanged(size));
    }
    if let Some(query) = args.search {
        board.dispatch(TableEvent::QueryChanged(query));
    }
    board.dispatch(TableEvent::GoToPage(args.page));

    renderer.write_table(out, &board.table(), today)
}

async fn cmd_add<S: TaskStore, W: Write>(
    board: &TaskBoard<S>,
    renderer: &Renderer,
    args: AddArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    board.dispatch(TableEvent::OpenCreate);
    if !board.submit_create(args.into_draft()).await {
        return Err(failure(board, "create failed"));
    }

    let table = board.table();
    let created = table
        .tasks()
        .as_slice()
        .last()
        .ok_or_else(|| anyhow!("created task missing from the table"))?;
    info!(id = %created.id, "created task");
    writeln!(out, "Created task {}.", created.id)?;
    renderer.write_task_info(out, created)
}

async fn cmd_edit<S: TaskStore, W: Write>(
    board: &TaskBoard<S>,
    renderer: &Renderer,
    args: EditArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let patch = args.to_patch();
    if patch.is_empty() {
        bail!("nothing to change; pass at least one field");
    }

    load_or_bail(board).await?;
    let id = TaskId::new(args.id);
    board.dispatch(TableEvent::OpenEdit(id.clone()));
    if board.table().ui().edit_target() != Some(&id) {
        bail!("no task with id {id}");
    }

    if !board.submit_edit(patch).await {
        return Err(failure(board, "update failed"));
    }

    let table = board.table();
    let updated = table
        .tasks()
        .get(&id)
        .ok_or_else(|| anyhow!("updated task {id} missing from the table"))?;
    info!(id = %id, "updated task");
    writeln!(out, "Updated task {id}.")?;
    renderer.write_task_info(out, updated)
}

async fn cmd_delete<S: TaskStore, W: Write>(
    board: &TaskBoard<S>,
    args: DeleteArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    load_or_bail(board).await?;
    let id = TaskId::new(args.id);
    board.dispatch(TableEvent::OpenDelete(id.clone()));
    if board.table().ui().delete_target() != Some(&id) {
        bail!("no task with id {id}");
    }

    if !board.confirm_delete().await {
        return Err(failure(board, "delete failed"));
    }

    info!(id = %id, "deleted task");
    writeln!(out, "Deleted task {id}.")?;
    Ok(())
}

async fn load_or_bail<S: TaskStore>(board: &TaskBoard<S>) -> anyhow::Result<()> {
    if board.load().await {
        return Ok(());
    }
    Err(failure(board, "could not load tasks"))
}

fn failure<S: TaskStore>(board: &TaskBoard<S>, fallback: &str) -> anyhow::Error {
    let table = board.table();
    let message = table
        .notice()
        .or_else(|| table.error())
        .unwrap_or(fallback);
    anyhow!("{message}")
}
