use std::io::Write;

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use taskdeck_shared::{TaskDraft, TaskId, TaskPatch, iso_date};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, instrument, warn};

use crate::board::TaskBoard;
use crate::client::TaskStore;
use crate::pagination::{PageNav, PageSize};
use crate::render::Renderer;
use crate::view::TableEvent;

const PROMPT: &str = "taskdeck> ";

const HELP: &str = "\
search TEXT      filter by assignee, status, priority or comment
clear            drop the search
size N           rows per page (5, 10, 20)
first | prev | next | last
refresh          reload from the server
new              open the create form
add FIELDS       create a task
actions ROW      toggle the action menu of a row
edit ROW         open the edit form for a row
save FIELDS      send changes for the task being edited
delete ROW       ask to delete a row
yes | no         answer the delete confirmation
cancel           close the open form
help | quit

FIELDS: key=value; key=value
keys: assignedTo, status, due (YYYY-MM-DD), priority, comments (comma separated)";

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "search", "clear", "size", "first", "prev", "next", "last", "refresh", "new", "add",
        "actions", "edit", "save", "delete", "yes", "no", "cancel", "help", "quit",
    ]
}

/// Exact names win; otherwise a unique prefix selects the command.
pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Search(String),
    Clear,
    Size(PageSize),
    Nav(PageNav),
    Refresh,
    New,
    Add(TaskDraft),
    Actions(usize),
    Edit(usize),
    Save(TaskPatch),
    Delete(usize),
    Yes,
    No,
    Cancel,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<ShellCommand>> {
    let line = line.trim_start().trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest),
        None => (line, ""),
    };
    let known = known_command_names();
    let name = expand_command_abbrev(head, &known)
        .ok_or_else(|| anyhow!("unknown or ambiguous command: {head} (try help)"))?;

    let command = match name {
        "search" => ShellCommand::Search(rest.to_string()),
        "clear" => ShellCommand::Clear,
        "size" => ShellCommand::Size(
            rest.parse::<PageSize>()
                .context("size expects 5, 10 or 20")?,
        ),
        "first" => ShellCommand::Nav(PageNav::First),
        "prev" => ShellCommand::Nav(PageNav::Previous),
        "next" => ShellCommand::Nav(PageNav::Next),
        "last" => ShellCommand::Nav(PageNav::Last),
        "refresh" => ShellCommand::Refresh,
        "new" => ShellCommand::New,
        "add" => ShellCommand::Add(draft_from_fields(rest)?),
        "actions" => ShellCommand::Actions(parse_row(rest)?),
        "edit" => ShellCommand::Edit(parse_row(rest)?),
        "save" => ShellCommand::Save(patch_from_fields(rest)?),
        "delete" => ShellCommand::Delete(parse_row(rest)?),
        "yes" => ShellCommand::Yes,
        "no" => ShellCommand::No,
        "cancel" => ShellCommand::Cancel,
        "help" => ShellCommand::Help,
        "quit" => ShellCommand::Quit,
        other => bail!("unhandled command: {other}"),
    };
    Ok(Some(command))
}

fn parse_row(raw: &str) -> anyhow::Result<usize> {
    let raw = raw.trim();
    let row: usize = raw
        .parse()
        .with_context(|| format!("expected a row number, got {raw:?}"))?;
    if row == 0 {
        bail!("rows are numbered from 1");
    }
    Ok(row)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AssignedTo,
    Status,
    Due,
    Priority,
    Comments,
}

impl Field {
    fn parse(key: &str) -> anyhow::Result<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "assignedto" | "assigned_to" | "assigned" => Ok(Self::AssignedTo),
            "status" => Ok(Self::Status),
            "due" | "duedate" | "due_date" => Ok(Self::Due),
            "priority" => Ok(Self::Priority),
            "comments" | "comment" => Ok(Self::Comments),
            other => bail!("unknown field: {other}"),
        }
    }
}

/// Splits `key=value; key=value` into typed pairs.
pub fn parse_fields(raw: &str) -> anyhow::Result<Vec<(Field, String)>> {
    let mut out = Vec::new();
    for part in raw.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got: {part}"))?;
        out.push((Field::parse(key)?, value.trim().to_string()));
    }
    Ok(out)
}

fn split_comments(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_due(raw: &str) -> anyhow::Result<Option<NaiveDate>> {
    if raw.is_empty() {
        return Ok(None);
    }
    iso_date::parse(raw).map(Some).map_err(|e| anyhow!(e))
}

pub fn draft_from_fields(raw: &str) -> anyhow::Result<TaskDraft> {
    let mut draft = TaskDraft::default();
    for (field, value) in parse_fields(raw)? {
        match field {
            Field::AssignedTo => draft.assigned_to = value,
            Field::Status => draft.status = value,
            Field::Due => draft.due_date = parse_due(&value)?,
            Field::Priority => draft.priority = value,
            Field::Comments => draft.comments = split_comments(&value),
        }
    }
    Ok(draft)
}

pub fn patch_from_fields(raw: &str) -> anyhow::Result<TaskPatch> {
    let mut patch = TaskPatch::default();
    for (field, value) in parse_fields(raw)? {
        match field {
            Field::AssignedTo => patch.assigned_to = Some(value),
            Field::Status => patch.status = Some(value),
            Field::Due => patch.due_date = parse_due(&value)?,
            Field::Priority => patch.priority = Some(value),
            Field::Comments => patch.comments = Some(split_comments(&value)),
        }
    }
    if patch.is_empty() {
        bail!("save needs at least one key=value");
    }
    Ok(patch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Reads commands from `input` until `quit` or end of input, redrawing
/// the table after each one.
#[instrument(skip_all)]
pub async fn run<S, R, W>(
    board: &TaskBoard<S>,
    renderer: &Renderer,
    input: R,
    mut out: W,
    today: NaiveDate,
) -> anyhow::Result<()>
where
    S: TaskStore,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    info!("starting shell");
    board.load().await;
    renderer.write_table(&mut out, &board.table(), today)?;

    let mut lines = input.lines();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            debug!("end of input");
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(out, "{err:#}")?;
                continue;
            }
        };

        match command {
            ShellCommand::Help => {
                writeln!(out, "{HELP}")?;
                continue;
            }
            command => {
                if execute(board, command, &mut out).await? == Flow::Quit {
                    break;
                }
            }
        }
        renderer.write_table(&mut out, &board.table(), today)?;
    }

    board.unmount();
    info!("shell closed");
    Ok(())
}

/// Applies one shell command to the board.
pub async fn execute<S: TaskStore, W: Write>(
    board: &TaskBoard<S>,
    command: ShellCommand,
    mut out: W,
) -> anyhow::Result<Flow> {
    debug!(?command, "shell command");
    match command {
        ShellCommand::Search(text) => {
            board.dispatch(TableEvent::QueryChanged(text));
        }
        ShellCommand::Clear => {
            board.dispatch(TableEvent::QueryChanged(String::new()));
        }
        ShellCommand::Size(size) => {
            board.dispatch(TableEvent::PageSizeChanged(size));
        }
        ShellCommand::Nav(nav) => {
            board.dispatch(TableEvent::Navigate(nav));
        }
        ShellCommand::Refresh => {
            board.refresh().await;
        }
        ShellCommand::New => {
            board.dispatch(TableEvent::OpenCreate);
        }
        ShellCommand::Add(draft) => {
            board.dispatch(TableEvent::OpenCreate);
            if board.submit_create(draft).await {
                writeln!(out, "Task created.")?;
            }
        }
        ShellCommand::Actions(row) => {
            if let Some(id) = row_id(board, row, &mut out)? {
                board.dispatch(TableEvent::ToggleActions(id));
            }
        }
        ShellCommand::Edit(row) => {
            if let Some(id) = row_id(board, row, &mut out)? {
                board.dispatch(TableEvent::OpenEdit(id));
            }
        }
        ShellCommand::Save(patch) => {
            if board.table().ui().edit_target().is_none() {
                writeln!(out, "No task is being edited; use edit ROW first.")?;
            } else if board.submit_edit(patch).await {
                writeln!(out, "Task updated.")?;
            }
        }
        ShellCommand::Delete(row) => {
            if let Some(id) = row_id(board, row, &mut out)? {
                board.dispatch(TableEvent::OpenDelete(id));
            }
        }
        ShellCommand::Yes => {
            if board.table().ui().delete_target().is_none() {
                writeln!(out, "Nothing to confirm.")?;
            } else if board.confirm_delete().await {
                writeln!(out, "Task deleted.")?;
            }
        }
        ShellCommand::No | ShellCommand::Cancel => {
            board.dispatch(TableEvent::CloseModal);
            board.dispatch(TableEvent::DismissNotice);
        }
        ShellCommand::Help => writeln!(out, "{HELP}")?,
        ShellCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn row_id<S: TaskStore, W: Write>(
    board: &TaskBoard<S>,
    row: usize,
    out: &mut W,
) -> anyhow::Result<Option<TaskId>> {
    let table = board.table();
    let page = table.page();
    match page.row(row) {
        Some(task) => Ok(Some(task.id.clone())),
        None => {
            warn!(row, shown = page.rows.len(), "row not on this page");
            writeln!(out, "No row {row} on this page.")?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use taskdeck_shared::Task;

    use super::*;
    use crate::memory::MemoryTaskStore;
    use crate::ui_state::Modal;

    fn seeded(count: usize) -> Vec<Task> {
        (1..=count)
            .map(|id| {
                TaskDraft {
                    assigned_to: format!("user-{id}"),
                    status: "Open".to_string(),
                    priority: "Low".to_string(),
                    ..TaskDraft::default()
                }
                .into_task(TaskId::new(id.to_string()))
            })
            .collect()
    }

    #[test]
    fn abbreviations_expand_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("s", &known), None);
        assert_eq!(expand_command_abbrev("no", &known), Some("no"));
        assert_eq!(expand_command_abbrev("sea", &known), Some("search"));
        assert_eq!(expand_command_abbrev("q", &known), Some("quit"));
        assert_eq!(expand_command_abbrev("x", &known), None);
    }

    #[test]
    fn search_keeps_text_verbatim() {
        assert_eq!(
            parse_command("search  Ana Lee ").expect("parse"),
            Some(ShellCommand::Search(" Ana Lee ".to_string()))
        );
        assert_eq!(
            parse_command("search").expect("parse"),
            Some(ShellCommand::Search(String::new()))
        );
        assert_eq!(parse_command("   ").expect("parse"), None);
    }

    #[test]
    fn parses_rows_sizes_and_navigation() {
        assert_eq!(
            parse_command("delete 3").expect("parse"),
            Some(ShellCommand::Delete(3))
        );
        assert_eq!(
            parse_command("size 20").expect("parse"),
            Some(ShellCommand::Size(PageSize::try_from(20).expect("size")))
        );
        assert_eq!(
            parse_command("prev").expect("parse"),
            Some(ShellCommand::Nav(PageNav::Previous))
        );
        assert!(parse_command("size 7").is_err());
        assert!(parse_command("edit 0").is_err());
        assert!(parse_command("edit two").is_err());
    }

    #[test]
    fn fields_build_drafts_and_patches() {
        let draft = draft_from_fields(
            "assignedTo=Ana; status=Open; due=2024-08-01; priority=High; comments=a, b,",
        )
        .expect("draft");
        assert_eq!(draft.assigned_to, "Ana");
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2024, 8, 1));
        assert_eq!(draft.comments, ["a", "b"]);

        let patch = patch_from_fields("status = Done").expect("patch");
        assert_eq!(patch.status.as_deref(), Some("Done"));
        assert!(patch.priority.is_none());

        assert!(patch_from_fields("").is_err());
        assert!(draft_from_fields("owner=Ana").is_err());
        assert!(draft_from_fields("due=soon").is_err());
        assert!(draft_from_fields("status").is_err());
    }

    #[tokio::test]
    async fn edit_row_then_save_updates_task() {
        let board = TaskBoard::new(MemoryTaskStore::with_tasks(seeded(3)));
        board.load().await;

        let mut out = Vec::new();
        execute(&board, ShellCommand::Edit(2), &mut out).await.expect("edit");
        assert_eq!(board.table().ui().edit_target(), Some(&TaskId::from("2")));

        let patch = patch_from_fields("priority=Urgent").expect("patch");
        execute(&board, ShellCommand::Save(patch), &mut out).await.expect("save");
        assert_eq!(board.table().ui().modal(), &Modal::Closed);
        assert_eq!(board.store().snapshot()[1].priority, "Urgent");
        assert!(String::from_utf8(out).expect("utf8").contains("Task updated."));
    }

    #[tokio::test]
    async fn rows_outside_the_page_are_reported() {
        let board = TaskBoard::new(MemoryTaskStore::with_tasks(seeded(2)));
        board.load().await;

        let mut out = Vec::new();
        execute(&board, ShellCommand::Delete(5), &mut out).await.expect("delete");
        assert_eq!(board.table().ui().modal(), &Modal::Closed);
        assert!(String::from_utf8(out).expect("utf8").contains("No row 5"));
    }

    #[tokio::test]
    async fn scripted_session_deletes_and_quits() {
        let board = TaskBoard::new(MemoryTaskStore::with_tasks(seeded(12)));
        let script = "next\nactions 1\ndelete 1\nyes\nbogus\nquit\nnext\n";
        let mut out = Vec::new();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");

        run(&board, &Renderer::plain(), script.as_bytes(), &mut out, today)
            .await
            .expect("run");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Page 2 of 2 | 10 per page | 12 of 12 tasks"));
        assert!(text.contains("row 1 actions: [edit 1] [delete 1]"));
        assert!(text.contains("Delete task 11? yes/no"));
        assert!(text.contains("Task deleted."));
        assert!(text.contains("unknown or ambiguous command: bogus"));
        assert_eq!(board.store().snapshot().len(), 11);
        assert!(!board.table().is_mounted());
    }
}
