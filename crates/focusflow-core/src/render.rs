use std::io::{self, IsTerminal, Write};

use focusflow_shared::TaskDto;
use unicode_width::UnicodeWidthStr;

use crate::query::Query;
use crate::stats::DerivedStats;

pub const NO_REMARKS_TEXT: &str = "No remarks provided for this task.";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&self, tasks: &[TaskDto]) -> anyhow::Result<()> {
        self.write_task_table(io::stdout().lock(), tasks)
    }

    pub fn write_task_table<W: Write>(&self, mut out: W, tasks: &[TaskDto]) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Title".to_string(),
            "Note".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let id = self.paint(&task.id.to_string(), "33");
                let done = if task.status {
                    self.paint("[x]", "34")
                } else {
                    "[ ]".to_string()
                };
                let title = if task.status {
                    self.paint(&task.title, "90")
                } else {
                    task.title.clone()
                };
                let note = if task.has_remarks() && !task.status {
                    self.paint("has remarks", "33")
                } else {
                    String::new()
                };
                vec![id, done, title, note]
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    pub fn print_task_details(&self, task: &TaskDto) -> anyhow::Result<()> {
        self.write_task_details(io::stdout().lock(), task)
    }

    pub fn write_task_details<W: Write>(&self, mut out: W, task: &TaskDto) -> anyhow::Result<()> {
        let status = if task.status {
            self.paint(task.status_label(), "34")
        } else {
            self.paint(task.status_label(), "31")
        };
        writeln!(out, "id       {}", task.id)?;
        writeln!(out, "title    {}", task.title)?;
        writeln!(out, "status   {status}")?;
        let remarks = task
            .remarks
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(NO_REMARKS_TEXT);
        writeln!(out, "remarks  {remarks}")?;
        Ok(())
    }

    pub fn print_stats(&self, stats: &DerivedStats) -> anyhow::Result<()> {
        writeln!(io::stdout().lock(), "{}", format_stats(stats))?;
        Ok(())
    }

    pub fn print_query(&self, query: &Query) -> anyhow::Result<()> {
        let search = if query.search_text.is_empty() {
            "-".to_string()
        } else {
            format!("\"{}\"", query.search_text)
        };
        writeln!(
            io::stdout().lock(),
            "filter: {}  search: {search}",
            query.status_filter
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn format_stats(stats: &DerivedStats) -> String {
    format!(
        "{} done, {} left ({}%)",
        stats.completed, stats.pending, stats.completion_percentage
    )
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

    let mut line = String::new();
    for idx in 0..column_count {
        line.push_str(&format!("{:width$} ", headers[idx], width = widths[idx]));
    }
    writeln!(writer, "{}", line.trim_end())?;

    line.clear();
    for width in &widths {
        line.push_str(&format!("{:-<width$} ", "", width = width));
    }
    writeln!(writer, "{}", line.trim_end())?;

    for row in rows {
        line.clear();
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            line.push_str(cell);
            line.push_str(&" ".repeat(padding));
            line.push(' ');
        }
        writeln!(writer, "{}", line.trim_end())?;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn render_table(tasks: &[TaskDto]) -> String {
        let mut buf = Vec::new();
        Renderer::plain()
            .write_task_table(&mut buf, tasks)
            .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn table_marks_done_and_remarks() {
        let tasks = vec![
            TaskDto {
                id: 1,
                title: "Buy milk".to_string(),
                status: false,
                remarks: Some("store closed".to_string()),
            },
            TaskDto {
                id: 12,
                title: "Ship release".to_string(),
                status: true,
                remarks: Some("done anyway".to_string()),
            },
        ];
        let out = render_table(&tasks);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ID Done Title        Note");
        assert_eq!(lines[2], "1  [ ]  Buy milk     has remarks");
        assert_eq!(lines[3], "12 [x]  Ship release");
    }

    #[test]
    fn wide_titles_keep_columns_aligned() {
        let tasks = vec![
            TaskDto {
                id: 1,
                title: "日本語".to_string(),
                status: false,
                remarks: None,
            },
            TaskDto {
                id: 2,
                title: "abc".to_string(),
                status: false,
                remarks: None,
            },
        ];
        let out = render_table(&tasks);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[2], "1  [ ]  日本語");
        assert_eq!(lines[3], "2  [ ]  abc");
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(render_table(&[]), "No tasks.\n");
    }

    #[test]
    fn details_fall_back_when_remarks_missing() {
        let mut buf = Vec::new();
        let task = TaskDto {
            id: 3,
            title: "Plan".to_string(),
            status: false,
            remarks: Some("  ".to_string()),
        };
        Renderer::plain()
            .write_task_details(&mut buf, &task)
            .expect("render");
        let out = String::from_utf8(buf).expect("utf8");
        assert!(out.contains("status   Pending"));
        assert!(out.contains(NO_REMARKS_TEXT));
    }

    #[test]
    fn stats_line() {
        let stats = DerivedStats {
            completed: 1,
            pending: 1,
            completion_percentage: 50,
        };
        assert_eq!(format_stats(&stats), "1 done, 1 left (50%)");
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[33m12\x1b[0m"), "12");
    }
}
