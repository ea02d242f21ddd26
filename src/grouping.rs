use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::datetime::day_of;
use crate::models::{Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Current,
    Completed,
    Pending,
}

/// One calendar-day section of the task list. `day == None` is the
/// "No Date" sentinel group, which always sorts last.
#[derive(Debug, Clone)]
pub struct DateGroup {
    pub day: Option<NaiveDate>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TabCounts {
    pub current: usize,
    pub completed: usize,
    pub pending: usize,
}

fn completed_day(task: &Task) -> Option<NaiveDate> {
    task.completed_at.and_then(day_of)
}

fn due_day(task: &Task) -> Option<NaiveDate> {
    task.due_date.and_then(day_of)
}

/// Tab membership. Tasks completed today stay on the current tab; the
/// completed tab only shows earlier days.
pub fn in_tab(task: &Task, tab: Tab, today: NaiveDate) -> bool {
    match tab {
        Tab::Current => {
            task.status == Status::Current
                || (task.status == Status::Completed && completed_day(task) == Some(today))
        }
        Tab::Completed => {
            task.status == Status::Completed && completed_day(task) != Some(today)
        }
        Tab::Pending => task.status == Status::Pending,
    }
}

/// Counts for the tab bar, computed over the full collection with the same
/// membership predicates as the filter itself.
pub fn tab_counts(tasks: &[Task], today: NaiveDate) -> TabCounts {
    TabCounts {
        current: tasks
            .iter()
            .filter(|t| in_tab(t, Tab::Current, today))
            .count(),
        completed: tasks
            .iter()
            .filter(|t| in_tab(t, Tab::Completed, today))
            .count(),
        pending: tasks
            .iter()
            .filter(|t| in_tab(t, Tab::Pending, today))
            .count(),
    }
}

/// Case-insensitive substring match against title and notes. A blank query
/// matches everything.
pub fn matches_search(task: &Task, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    if task.title.to_lowercase().contains(&query) {
        return true;
    }
    task.notes
        .as_deref()
        .map(|notes| notes.to_lowercase().contains(&query))
        .unwrap_or(false)
}

/// Filters the collection down to one tab (plus optional search), partitions
/// it into date-keyed groups and orders both the groups and the tasks within
/// each group. Pure: the input collection is never mutated.
pub fn group_tasks(
    tasks: &[Task],
    tab: Tab,
    search: Option<&str>,
    today: NaiveDate,
) -> Vec<DateGroup> {
    let mut dated: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
    let mut undated: Vec<Task> = Vec::new();

    for task in tasks {
        if !in_tab(task, tab, today) {
            continue;
        }
        if let Some(query) = search {
            if !matches_search(task, query) {
                continue;
            }
        }
        // The completed tab groups by completion day, the others by due day.
        let key = match tab {
            Tab::Completed => completed_day(task),
            _ => due_day(task),
        };
        match key {
            Some(day) => dated.entry(day).or_default().push(task.clone()),
            None => undated.push(task.clone()),
        }
    }

    let mut groups: Vec<DateGroup> = dated
        .into_iter()
        .rev()
        .map(|(day, tasks)| DateGroup {
            day: Some(day),
            tasks,
        })
        .collect();
    if !undated.is_empty() {
        groups.push(DateGroup {
            day: None,
            tasks: undated,
        });
    }

    for group in &mut groups {
        sort_within_group(&mut group.tasks, tab);
    }
    groups
}

fn sort_within_group(tasks: &mut [Task], tab: Tab) {
    match tab {
        // Most recently completed first; a missing timestamp sorts as
        // earliest.
        Tab::Completed => {
            tasks.sort_by_key(|t| std::cmp::Reverse(t.completed_at.unwrap_or(i64::MIN)));
        }
        // Dated tasks first by due date ascending, then undated by creation
        // descending. The sort is stable beyond these keys.
        _ => {
            tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => b.created_at.cmp(&a.created_at),
            });
        }
    }
}
