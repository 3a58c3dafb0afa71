use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, NaiveDate, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::settings::{Settings, Theme};
use crate::task::{Comment, Priority, Status, Subtask, Task};
use crate::user::User;
use crate::views::StatusCounts;

/// ANSI SGR codes for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    accent: &'static str,
    danger: &'static str,
    warn: &'static str,
    ok: &'static str,
    info: &'static str,
    muted: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                accent: "33",
                danger: "31",
                warn: "33",
                ok: "32",
                info: "34",
                muted: "2",
            },
            Theme::Dark => Self {
                accent: "93",
                danger: "91",
                warn: "93",
                ok: "92",
                info: "96",
                muted: "37",
            },
        }
    }
}

pub struct Renderer {
    color: bool,
    palette: Palette,
    out: Box<dyn Write>,
}

impl Renderer {
    pub fn new(cfg: &Config, theme: Theme) -> anyhow::Result<Self> {
        let color = color_setting(cfg)? && io::stdout().is_terminal();
        Ok(Self {
            color,
            palette: Palette::for_theme(theme),
            out: Box::new(io::stdout()),
        })
    }

    /// Renders into `out` instead of stdout. Colour follows the `color` key
    /// alone.
    pub fn with_writer<W: Write + 'static>(
        cfg: &Config,
        theme: Theme,
        out: W,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            color: color_setting(cfg)?,
            palette: Palette::for_theme(theme),
            out: Box::new(out),
        })
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.palette = Palette::for_theme(theme);
    }

    pub fn message(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks, today))]
    pub fn print_task_table(&mut self, tasks: &[&Task], today: NaiveDate) -> anyhow::Result<()> {
        if tasks.is_empty() {
            return self.message("No tasks.");
        }

        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Priority".to_string(),
            "Status".to_string(),
            "Category".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let overdue =
                task.status != Status::Completed && task.due().is_some_and(|due| due < today);
            let due = if overdue {
                self.paint(&task.due_date, self.palette.danger)
            } else {
                task.due_date.clone()
            };

            let tags = task
                .tags
                .iter()
                .map(|tag| format!("+{tag}"))
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(vec![
                self.paint(&task.id, self.palette.accent),
                due,
                self.priority(task.priority),
                self.status(task.status),
                task.category.clone(),
                task.title.clone(),
                tags,
            ]);
        }

        write_table(&mut self.out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task, comments, subtasks), fields(id = %task.id))]
    pub fn print_task_detail(
        &mut self,
        task: &Task,
        comments: &[&Comment],
        subtasks: &[&Subtask],
    ) -> anyhow::Result<()> {
        let id = self.paint(&task.id, self.palette.accent);
        let status = self.status(task.status);
        let priority = self.priority(task.priority);

        writeln!(self.out, "id          {id}")?;
        writeln!(self.out, "title       {}", task.title)?;
        if !task.description.is_empty() {
            writeln!(self.out, "description {}", task.description)?;
        }
        writeln!(self.out, "status      {status}")?;
        writeln!(self.out, "priority    {priority}")?;
        writeln!(self.out, "category    {}", task.category)?;
        if !task.due_date.is_empty() {
            writeln!(self.out, "due         {}", task.due_date)?;
        }
        if !task.tags.is_empty() {
            writeln!(self.out, "tags        {}", task.tags.join(", "))?;
        }
        if let Some(assignee) = &task.assigned_to {
            writeln!(self.out, "assigned    {assignee}")?;
        }
        writeln!(self.out, "created     {}", local_time(task.created_at))?;
        writeln!(self.out, "updated     {}", local_time(task.updated_at))?;

        let done = subtasks.iter().filter(|s| s.completed).count();
        writeln!(self.out)?;
        writeln!(self.out, "Subtasks ({done}/{})", subtasks.len())?;
        for subtask in subtasks {
            let mark = if subtask.completed {
                self.paint("[x]", self.palette.ok)
            } else {
                "[ ]".to_string()
            };
            let sid = self.paint(&subtask.id, self.palette.muted);
            writeln!(self.out, "  {mark} {} ({sid})", subtask.title)?;
        }

        writeln!(self.out)?;
        writeln!(self.out, "Comments ({})", comments.len())?;
        for comment in comments {
            let meta = self.paint(
                &format!(
                    "{} {} ({})",
                    comment.author,
                    local_time(comment.created_at),
                    comment.id
                ),
                self.palette.muted,
            );
            writeln!(self.out, "  {meta}")?;
            writeln!(self.out, "    {}", comment.text)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_dashboard(
        &mut self,
        user: &User,
        counts: StatusCounts,
        priority: &[&Task],
        completed: &[&Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(self.out, "Welcome, {}", user.name)?;
        writeln!(self.out)?;

        let total = self.paint(&counts.total.to_string(), self.palette.accent);
        writeln!(self.out, "Total        {total}")?;
        for status in Status::ALL {
            let label = format!("{:<12}", status.label());
            let count = self.status_paint(status, &counts.get(status).to_string());
            writeln!(self.out, "{label} {count}")?;
        }

        writeln!(self.out)?;
        writeln!(self.out, "High priority")?;
        self.print_task_table(priority, today)?;

        writeln!(self.out)?;
        writeln!(self.out, "Completed")?;
        self.print_task_table(completed, today)
    }

    pub fn print_user(&mut self, user: &User) -> anyhow::Result<()> {
        writeln!(self.out, "id     {}", user.id)?;
        writeln!(self.out, "name   {}", user.name)?;
        writeln!(self.out, "email  {}", user.email)?;
        Ok(())
    }

    pub fn print_settings(&mut self, settings: &Settings) -> anyhow::Result<()> {
        let notifications = if settings.notifications { "on" } else { "off" };
        writeln!(self.out, "theme          {}", settings.theme)?;
        writeln!(self.out, "notifications  {notifications}")?;
        writeln!(self.out, "language       {}", settings.language)?;
        Ok(())
    }

    pub fn print_categories(&mut self, categories: &[&str]) -> anyhow::Result<()> {
        for category in categories {
            writeln!(self.out, "{category}")?;
        }
        Ok(())
    }

    fn status(&self, status: Status) -> String {
        self.status_paint(status, status.as_str())
    }

    fn status_paint(&self, status: Status, text: &str) -> String {
        let code = match status {
            Status::Pending => self.palette.muted,
            Status::InProgress => self.palette.info,
            Status::Completed => self.palette.ok,
        };
        self.paint(text, code)
    }

    fn priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => self.palette.danger,
            Priority::Medium => self.palette.warn,
            Priority::Low => self.palette.ok,
        };
        self.paint(priority.as_str(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn color_setting(cfg: &Config) -> anyhow::Result<bool> {
    let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
    match color_cfg.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        other => Err(anyhow!("invalid color setting: {other}")),
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
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

    for (header, width) in headers.iter().zip(widths.iter().copied()) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in widths.iter().copied() {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(widths.iter().copied()) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
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
