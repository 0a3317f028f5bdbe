use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use taskdeck_shared::Task;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::ui_state::Modal;
use crate::view::TaskTable;

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()? && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Writes the status line, the current page of the table, the pager
    /// footer, and whatever modal is open.
    #[tracing::instrument(skip(self, out, table, today))]
    pub fn write_table<W: Write>(
        &self,
        mut out: W,
        table: &TaskTable,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if table.is_loading() {
            writeln!(out, "{}", self.paint("Loading...", "36"))?;
        }
        if let Some(error) = table.error() {
            writeln!(out, "{}", self.paint(&format!("error: {error}"), "31"))?;
        }
        if let Some(notice) = table.notice() {
            writeln!(out, "{}", self.paint(&format!("notice: {notice}"), "33"))?;
        }
        if !table.query().is_empty() {
            writeln!(out, "search: {:?}", table.query().as_str())?;
        }

        let page = table.page();
        let headers = vec![
            "#".to_string(),
            "ID".to_string(),
            "Assigned To".to_string(),
            "Status".to_string(),
            "Due Date".to_string(),
            "Priority".to_string(),
            "Comments".to_string(),
        ];

        let mut rows = Vec::with_capacity(page.rows.len());
        let mut action_rows = Vec::new();
        for (idx, task) in page.rows.iter().enumerate() {
            rows.push(self.task_row(idx + 1, task, today));
            if table.ui().is_dropdown_open(&task.id) {
                action_rows.push(idx + 1);
            }
        }

        write_table(&mut out, headers, rows)?;

        for row in action_rows {
            writeln!(out, "row {row} actions: [edit {row}] [delete {row}]")?;
        }

        writeln!(
            out,
            "Page {} of {} | {} per page | {} of {} tasks",
            page.number,
            page.total_pages,
            page.size,
            page.matching,
            page.total_tasks
        )?;

        match table.ui().modal() {
            Modal::Closed => {}
            Modal::Create => writeln!(out, "New task: add key=value; ... (or cancel)")?,
            Modal::Edit(id) => {
                let who = table
                    .editing_task()
                    .map(|task| task.assigned_to.as_str())
                    .unwrap_or("?");
                writeln!(
                    out,
                    "Editing task {id} ({who}): save key=value; ... (or cancel)"
                )?;
            }
            Modal::ConfirmDelete(id) => {
                writeln!(
                    out,
                    "{}",
                    self.paint(&format!("Delete task {id}? yes/no"), "31")
                )?;
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, out, task))]
    pub fn write_task_info<W: Write>(&self, mut out: W, task: &Task) -> anyhow::Result<()> {
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "assigned to {}", task.assigned_to)?;
        writeln!(out, "status      {}", task.status)?;
        writeln!(out, "due date    {}", format_due(task.due_date))?;
        writeln!(out, "priority    {}", task.priority)?;
        for comment in &task.comments {
            writeln!(out, "comment     {comment}")?;
        }
        Ok(())
    }

    fn task_row(&self, row: usize, task: &Task, today: NaiveDate) -> Vec<String> {
        let due = format_due(task.due_date);
        let due = match task.due_date {
            Some(date) if date < today => self.paint(&due, "31"),
            _ => due,
        };

        vec![
            self.paint(&row.to_string(), "33"),
            task.id.to_string(),
            task.assigned_to.clone(),
            task.status.clone(),
            due,
            task.priority.clone(),
            task.comments.join(", "),
        ]
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn format_due(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DUE_DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
