use serde::Serialize;

use crate::models::{Status, Subtask, Task, TaskPatch, Timestamp};

/// A task counts as accomplished for reporting when all of its subtasks are
/// completed, or — only when it has no subtasks — when its own status is
/// completed. The subtask aggregate is authoritative over the status flag.
pub fn is_accomplished(task: &Task) -> bool {
    if task.subtasks.is_empty() {
        task.status == Status::Completed
    } else {
        task.subtasks.iter().all(|subtask| subtask.completed)
    }
}

/// Completion units of one task: a task with subtasks is N completable items,
/// a task without subtasks is a single item. Returns (done, total).
pub fn task_units(task: &Task) -> (usize, usize) {
    if task.subtasks.is_empty() {
        let done = usize::from(task.status == Status::Completed);
        (done, 1)
    } else {
        let done = task
            .subtasks
            .iter()
            .filter(|subtask| subtask.completed)
            .count();
        (done, task.subtasks.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DayStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub total_subtasks: usize,
    pub completed_subtasks: usize,
    pub completion_rate: f64,
}

/// Statistics over one day's task group, used by both the progress UI and
/// the end-of-day report.
pub fn day_stats(tasks: &[Task]) -> DayStats {
    let mut total_subtasks = 0;
    let mut completed_subtasks = 0;
    let mut done_units = 0;
    let mut total_units = 0;

    for task in tasks {
        total_subtasks += task.subtasks.len();
        completed_subtasks += task
            .subtasks
            .iter()
            .filter(|subtask| subtask.completed)
            .count();
        let (done, total) = task_units(task);
        done_units += done;
        total_units += total;
    }

    let completion_rate = if total_units == 0 {
        0.0
    } else {
        100.0 * done_units as f64 / total_units as f64
    };

    DayStats {
        total_tasks: tasks.len(),
        completed_tasks: tasks.iter().filter(|task| is_accomplished(task)).count(),
        total_subtasks,
        completed_subtasks,
        completion_rate,
    }
}

/// Reducer for the task-level checkbox: the new checked state cascades to
/// every subtask, and status/completed_at follow. Deterministic, with no
/// memory of prior state beyond the fields it sets.
pub fn toggle_task(task: &Task, checked: bool, now: Timestamp) -> TaskPatch {
    let subtasks: Vec<Subtask> = task
        .subtasks
        .iter()
        .cloned()
        .map(|mut subtask| {
            subtask.completed = checked;
            subtask
        })
        .collect();

    TaskPatch {
        status: Some(if checked {
            Status::Completed
        } else {
            Status::Current
        }),
        completed_at: Some(if checked { Some(now) } else { None }),
        subtasks: Some(subtasks),
        ..TaskPatch::default()
    }
}

/// Reducer for a single subtask checkbox: flips the subtask, then recomputes
/// the parent — completed only when every subtask is completed, otherwise
/// back to current with completed_at cleared. Returns `None` when the
/// subtask id does not exist on the task.
pub fn toggle_subtask(
    task: &Task,
    subtask_id: &str,
    completed: bool,
    now: Timestamp,
) -> Option<TaskPatch> {
    if !task.subtasks.iter().any(|subtask| subtask.id == subtask_id) {
        return None;
    }

    let subtasks: Vec<Subtask> = task
        .subtasks
        .iter()
        .cloned()
        .map(|mut subtask| {
            if subtask.id == subtask_id {
                subtask.completed = completed;
            }
            subtask
        })
        .collect();

    let all_done = subtasks.iter().all(|subtask| subtask.completed);

    Some(TaskPatch {
        status: Some(if all_done {
            Status::Completed
        } else {
            Status::Current
        }),
        completed_at: Some(if all_done { Some(now) } else { None }),
        subtasks: Some(subtasks),
        ..TaskPatch::default()
    })
}
