use serde::Serialize;

use crate::completion::{day_stats, is_accomplished, DayStats};
use crate::datetime::{day_key, day_label, long_date, today_label, Language};
use crate::grouping::DateGroup;
use crate::models::Task;

/// One day's end-of-day report. The webview renders the on-screen DOM from
/// this structure; `render_html`/`render_text` produce the clipboard
/// representations from the same partition and statistics, so the three
/// renderings cannot drift apart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Report {
    pub title: String,
    /// Wire form of the group's date key (`YYYY-MM-DD`), absent for the
    /// "No Date" group.
    pub key: Option<String>,
    pub label: String,
    pub stats: DayStats,
    pub accomplished: Vec<Task>,
    pub outstanding: Vec<Task>,
}

pub fn build_report(group: &DateGroup, today: chrono::NaiveDate, language: Language) -> Report {
    let label = day_label(group.day, today, language);
    let title = match group.day {
        // "Today" alone is ambiguous once the report is exported, so the
        // title carries the concrete date as well.
        Some(day) if label == today_label(language) => {
            format!("End of Day Report: {label} - {}", long_date(day, language))
        }
        _ => format!("End of Day Report: {label}"),
    };

    let mut accomplished = Vec::new();
    let mut outstanding = Vec::new();
    for task in &group.tasks {
        if is_accomplished(task) {
            accomplished.push(task.clone());
        } else {
            outstanding.push(task.clone());
        }
    }

    Report {
        title,
        key: group.day.map(day_key),
        label,
        stats: day_stats(&group.tasks),
        accomplished,
        outstanding,
    }
}

fn stats_line(stats: &DayStats) -> String {
    format!(
        "Tasks: {}/{} | Subtasks: {}/{} | Completion: {:.0}%",
        stats.completed_tasks,
        stats.total_tasks,
        stats.completed_subtasks,
        stats.total_subtasks,
        stats.completion_rate
    )
}

/// Plain-text rendering (markdown-flavored), used as the clipboard
/// `text/plain` alternate.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", report.title));
    out.push_str(&stats_line(&report.stats));
    out.push_str("\n\n");

    let mut write_section = |title: &str, tasks: &[Task]| {
        out.push_str(&format!("## {title}\n\n"));
        if tasks.is_empty() {
            out.push_str("_Empty_\n\n");
            return;
        }
        for task in tasks {
            let box_mark = if is_accomplished(task) { "x" } else { " " };
            out.push_str(&format!("- [{box_mark}] {}\n", task.title));
            if !task.subtasks.is_empty() {
                out.push_str("  - subtasks:\n");
                for subtask in &task.subtasks {
                    let s_mark = if subtask.completed { "x" } else { " " };
                    out.push_str(&format!("    - [{s_mark}] {}\n", subtask.title));
                }
            }
            if let Some(notes) = &task.notes {
                let notes = notes.replace("\r\n", "\n").replace('\n', " ");
                if !notes.trim().is_empty() {
                    out.push_str(&format!("  - notes: {notes}\n"));
                }
            }
            if !task.urls.is_empty() {
                let links = task
                    .urls
                    .iter()
                    .map(|link| link.value.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&format!("  - links: {links}\n"));
            }
        }
        out.push('\n');
    };

    write_section("Accomplishments", &report.accomplished);
    write_section("Outstanding Items", &report.outstanding);

    out
}

fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// HTML-document rendering, used as the clipboard `text/html` part.
pub fn render_html(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>");
    out.push_str(&html_escape(&report.title));
    out.push_str("</title></head>\n<body>\n");
    out.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.title)));
    out.push_str(&format!(
        "<p class=\"stats\">{}</p>\n",
        html_escape(&stats_line(&report.stats))
    ));

    let mut write_section = |title: &str, tasks: &[Task]| {
        out.push_str(&format!("<h2>{}</h2>\n", html_escape(title)));
        if tasks.is_empty() {
            out.push_str("<p><em>Empty</em></p>\n");
            return;
        }
        out.push_str("<ul>\n");
        for task in tasks {
            let glyph = if is_accomplished(task) { "✔" } else { "☐" };
            out.push_str(&format!(
                "<li>{glyph} <strong>{}</strong>\n",
                html_escape(&task.title)
            ));
            if !task.subtasks.is_empty() {
                out.push_str("<ul class=\"subtasks\">\n");
                for subtask in &task.subtasks {
                    let title = html_escape(&subtask.title);
                    if subtask.completed {
                        out.push_str(&format!("<li>✔ <s>{title}</s></li>\n"));
                    } else {
                        out.push_str(&format!("<li>☐ {title}</li>\n"));
                    }
                }
                out.push_str("</ul>\n");
            }
            if let Some(notes) = &task.notes {
                if !notes.trim().is_empty() {
                    out.push_str(&format!(
                        "<p class=\"notes\">{}</p>\n",
                        html_escape(notes)
                    ));
                }
            }
            if !task.urls.is_empty() {
                out.push_str("<ul class=\"links\">\n");
                for link in &task.urls {
                    let value = html_escape(&link.value);
                    out.push_str(&format!("<li><a href=\"{value}\">{value}</a></li>\n"));
                }
                out.push_str("</ul>\n");
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ul>\n");
    };

    write_section("Accomplishments", &report.accomplished);
    write_section("Outstanding Items", &report.outstanding);

    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{Status, Subtask, Task, TaskLink};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn subtask(id: &str, title: &str, completed: bool) -> Subtask {
        Subtask {
            id: id.to_string(),
            title: title.to_string(),
            completed,
        }
    }

    fn make_task(id: &str, status: Status) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            status,
            created_at: 1,
            updated_at: 1,
            completed_at: match status {
                Status::Completed => Some(1),
                _ => None,
            },
            due_date: None,
            notes: None,
            urls: Vec::new(),
            subtasks: Vec::new(),
        }
    }

    fn example_group(day: NaiveDate) -> DateGroup {
        let a = make_task("a", Status::Completed);
        let mut b = make_task("b", Status::Current);
        b.subtasks = vec![subtask("s1", "first", true), subtask("s2", "second", false)];
        b.notes = Some("waiting on review".to_string());
        b.urls = vec![TaskLink {
            id: "l1".to_string(),
            value: "https://example.com/pr/1".to_string(),
        }];
        let c = make_task("c", Status::Pending);
        DateGroup {
            day: Some(day),
            tasks: vec![a, b, c],
        }
    }

    #[test]
    fn report_partition_and_stats_match_worked_example() {
        let day = date(2024, 6, 1);
        let report = build_report(&example_group(day), date(2024, 6, 10), Language::En);

        assert_eq!(report.title, "End of Day Report: June 1, 2024");
        assert_eq!(report.key.as_deref(), Some("2024-06-01"));
        let accomplished: Vec<&str> =
            report.accomplished.iter().map(|t| t.id.as_str()).collect();
        let outstanding: Vec<&str> = report.outstanding.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(accomplished, vec!["a"]);
        assert_eq!(outstanding, vec!["b", "c"]);

        assert_eq!(report.stats.total_tasks, 3);
        assert_eq!(report.stats.completed_tasks, 1);
        assert_eq!(report.stats.total_subtasks, 2);
        assert_eq!(report.stats.completed_subtasks, 1);
        assert_eq!(report.stats.completion_rate, 50.0);
    }

    #[test]
    fn partition_covers_the_group_without_duplicates() {
        let day = date(2024, 6, 1);
        let group = example_group(day);
        let report = build_report(&group, date(2024, 6, 10), Language::En);

        let mut ids: Vec<&str> = report
            .accomplished
            .iter()
            .chain(report.outstanding.iter())
            .map(|t| t.id.as_str())
            .collect();
        ids.sort();
        let mut expected: Vec<&str> = group.tasks.iter().map(|t| t.id.as_str()).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn title_for_today_carries_the_long_date() {
        let today = date(2024, 6, 1);
        let report = build_report(&example_group(today), today, Language::En);
        assert_eq!(report.title, "End of Day Report: Today - June 1, 2024");
        assert_eq!(report.label, "Today");

        let no_date = DateGroup {
            day: None,
            tasks: vec![make_task("a", Status::Current)],
        };
        let report = build_report(&no_date, today, Language::En);
        assert_eq!(report.title, "End of Day Report: No Date");
        assert_eq!(report.key, None);
    }

    #[test]
    fn text_rendering_lists_sections_and_details() {
        let day = date(2024, 6, 1);
        let report = build_report(&example_group(day), date(2024, 6, 10), Language::En);
        let text = render_text(&report);

        assert!(text.starts_with("# End of Day Report: June 1, 2024\n"));
        assert!(text.contains("Tasks: 1/3 | Subtasks: 1/2 | Completion: 50%"));
        assert!(text.contains("## Accomplishments\n\n- [x] task-a\n"));
        assert!(text.contains("## Outstanding Items\n\n- [ ] task-b\n"));
        assert!(text.contains("    - [x] first\n"));
        assert!(text.contains("    - [ ] second\n"));
        assert!(text.contains("  - notes: waiting on review\n"));
        assert!(text.contains("  - links: https://example.com/pr/1\n"));
    }

    #[test]
    fn html_rendering_matches_text_on_membership_and_order() {
        let day = date(2024, 6, 1);
        let report = build_report(&example_group(day), date(2024, 6, 10), Language::En);
        let html = render_html(&report);
        let text = render_text(&report);

        assert!(html.contains("<h1>End of Day Report: June 1, 2024</h1>"));
        assert!(html.contains("Tasks: 1/3 | Subtasks: 1/2 | Completion: 50%"));
        assert!(html.contains("<s>first</s>"));
        assert!(html.contains("<li>☐ second</li>"));
        assert!(html.contains("<a href=\"https://example.com/pr/1\""));

        // Same section order in both renderings.
        for doc in [&html, &text] {
            let acc = doc.find("Accomplishments").unwrap();
            let out = doc.find("Outstanding Items").unwrap();
            let a = doc.find("task-a").unwrap();
            let b = doc.find("task-b").unwrap();
            let c = doc.find("task-c").unwrap();
            assert!(acc < a && a < out && out < b && b < c);
        }
    }

    #[test]
    fn html_rendering_escapes_markup() {
        let mut task = make_task("a", Status::Completed);
        task.title = "Ship <v2> & \"final\"".to_string();
        let group = DateGroup {
            day: Some(date(2024, 6, 1)),
            tasks: vec![task],
        };
        let report = build_report(&group, date(2024, 6, 10), Language::En);
        let html = render_html(&report);
        assert!(html.contains("Ship &lt;v2&gt; &amp; &quot;final&quot;"));
        assert!(!html.contains("<v2>"));
    }

    #[test]
    fn empty_group_renders_empty_sections_and_zero_rate() {
        let group = DateGroup {
            day: Some(date(2024, 6, 1)),
            tasks: Vec::new(),
        };
        let report = build_report(&group, date(2024, 6, 10), Language::En);
        assert_eq!(report.stats.completion_rate, 0.0);

        let text = render_text(&report);
        assert!(text.contains("## Accomplishments\n\n_Empty_"));
        assert!(text.contains("## Outstanding Items\n\n_Empty_"));

        let html = render_html(&report);
        assert!(html.contains("<p><em>Empty</em></p>"));
    }
}
