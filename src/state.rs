use std::sync::{Arc, Mutex};

use crate::models::{Settings, SettingsFile, Status, Task, TaskPatch, TasksFile, Timestamp};

const SCHEMA_VERSION: u32 = 1;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(tasks: Vec<Task>, settings: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppData {
                tasks,
                settings,
                export_in_flight: false,
            })),
        }
    }

    pub fn tasks_file(&self) -> TasksFile {
        let guard = self.inner.lock().expect("state poisoned");
        TasksFile {
            schema_version: SCHEMA_VERSION,
            tasks: guard.tasks.clone(),
        }
    }

    pub fn settings_file(&self) -> SettingsFile {
        let guard = self.inner.lock().expect("state poisoned");
        SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: guard.settings.clone(),
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.clone()
    }

    pub fn add_task(&self, task: Task) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks.push(task);
    }

    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks = tasks;
    }

    pub fn update_task(&self, task: Task) {
        let mut guard = self.inner.lock().expect("state poisoned");
        if let Some(existing) = guard.tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = task;
        }
    }

    /// Merges a partial update into the task. Identity and creation
    /// timestamp are untouchable; `completed_at` is re-synced with the
    /// resulting status so the invariant holds no matter what the patch
    /// carried. Returns the updated task.
    pub fn apply_patch(&self, task_id: &str, patch: TaskPatch, now: Timestamp) -> Option<Task> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let task = guard.tasks.iter_mut().find(|t| t.id == task_id)?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(completed_at) = patch.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(notes) = patch.notes {
            task.notes = notes;
        }
        if let Some(urls) = patch.urls {
            task.urls = urls;
        }
        if let Some(subtasks) = patch.subtasks {
            task.subtasks = subtasks;
        }

        match task.status {
            Status::Completed => {
                if task.completed_at.is_none() {
                    task.completed_at = Some(now);
                }
            }
            _ => task.completed_at = None,
        }
        task.updated_at = now;
        Some(task.clone())
    }

    /// Clones a task under a fresh identity: new id and timestamps, status
    /// reset to current, subtask completion cleared.
    pub fn duplicate_task(&self, task_id: &str, now: Timestamp) -> Option<Task> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let source = guard.tasks.iter().find(|t| t.id == task_id)?;

        let mut copy = source.clone();
        copy.id = format!("{}-{}", source.id, now);
        copy.status = Status::Current;
        copy.created_at = now;
        copy.updated_at = now;
        copy.completed_at = None;
        for (index, subtask) in copy.subtasks.iter_mut().enumerate() {
            subtask.id = format!("{}-s{}", copy.id, index);
            subtask.completed = false;
        }
        for (index, link) in copy.urls.iter_mut().enumerate() {
            link.id = format!("{}-l{}", copy.id, index);
        }

        guard.tasks.push(copy.clone());
        Some(copy)
    }

    pub fn remove_task(&self, task_id: &str) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks.retain(|task| task.id != task_id);
    }

    pub fn settings(&self) -> Settings {
        let guard = self.inner.lock().expect("state poisoned");
        guard.settings.clone()
    }

    pub fn update_settings(&self, settings: Settings) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.settings = settings;
    }

    /// Claims the single export slot. Returns false while another export is
    /// in flight; callers must pair a successful claim with `end_export`.
    pub fn begin_export(&self) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        if guard.export_in_flight {
            return false;
        }
        guard.export_in_flight = true;
        true
    }

    pub fn end_export(&self) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.export_in_flight = false;
    }

    pub fn export_in_flight(&self) -> bool {
        let guard = self.inner.lock().expect("state poisoned");
        guard.export_in_flight
    }
}

#[derive(Debug)]
struct AppData {
    tasks: Vec<Task>,
    settings: Settings,
    export_in_flight: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Subtask, TaskLink};

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

    #[test]
    fn tasks_file_and_settings_file_include_schema_version() {
        let state = AppState::new(Vec::new(), Settings::default());
        let tasks_file = state.tasks_file();
        assert_eq!(tasks_file.schema_version, SCHEMA_VERSION);
        assert_eq!(tasks_file.tasks.len(), 0);

        let settings_file = state.settings_file();
        assert_eq!(settings_file.schema_version, SCHEMA_VERSION);
        assert_eq!(settings_file.settings.theme, Settings::default().theme);
    }

    #[test]
    fn add_update_replace_and_remove_tasks() {
        let state = AppState::new(Vec::new(), Settings::default());
        state.add_task(make_task("a", Status::Current));
        assert_eq!(state.tasks().len(), 1);

        let mut updated = make_task("a", Status::Current);
        updated.title = "updated".to_string();
        state.update_task(updated);
        assert_eq!(state.tasks()[0].title, "updated");

        // Updating a non-existent task is a no-op.
        state.update_task(make_task("missing", Status::Current));
        assert_eq!(state.tasks().len(), 1);

        state.replace_tasks(vec![make_task("x", Status::Pending)]);
        assert_eq!(state.tasks().len(), 1);
        assert_eq!(state.tasks()[0].id, "x");

        state.remove_task("x");
        assert!(state.tasks().is_empty());
    }

    #[test]
    fn apply_patch_merges_fields_and_keeps_the_invariant() {
        let mut task = make_task("a", Status::Current);
        task.subtasks = vec![Subtask {
            id: "s1".to_string(),
            title: "one".to_string(),
            completed: false,
        }];
        let state = AppState::new(vec![task], Settings::default());

        let patch = TaskPatch {
            title: Some("renamed".to_string()),
            due_date: Some(Some(1717200000)),
            ..TaskPatch::default()
        };
        let updated = state.apply_patch("a", patch, 500).expect("task exists");
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.due_date, Some(1717200000));
        assert_eq!(updated.updated_at, 500);
        assert_eq!(updated.created_at, 1);
        assert_eq!(updated.completed_at, None);

        // Status completed without a timestamp gets one stamped.
        let patch = TaskPatch {
            status: Some(Status::Completed),
            ..TaskPatch::default()
        };
        let updated = state.apply_patch("a", patch, 600).expect("task exists");
        assert_eq!(updated.completed_at, Some(600));

        // Leaving completed keeps the invariant by clearing the timestamp.
        let patch = TaskPatch {
            status: Some(Status::Pending),
            ..TaskPatch::default()
        };
        let updated = state.apply_patch("a", patch, 700).expect("task exists");
        assert_eq!(updated.completed_at, None);

        // Explicit null clears a clearable field.
        let patch = TaskPatch {
            due_date: Some(None),
            ..TaskPatch::default()
        };
        let updated = state.apply_patch("a", patch, 800).expect("task exists");
        assert_eq!(updated.due_date, None);

        assert!(state.apply_patch("missing", TaskPatch::default(), 1).is_none());
    }

    #[test]
    fn duplicate_resets_completion_under_a_fresh_identity() {
        let mut task = make_task("a", Status::Completed);
        task.notes = Some("context".to_string());
        task.due_date = Some(1717200000);
        task.subtasks = vec![
            Subtask {
                id: "s1".to_string(),
                title: "one".to_string(),
                completed: true,
            },
            Subtask {
                id: "s2".to_string(),
                title: "two".to_string(),
                completed: false,
            },
        ];
        task.urls = vec![TaskLink {
            id: "l1".to_string(),
            value: "https://example.com".to_string(),
        }];
        let state = AppState::new(vec![task], Settings::default());

        let copy = state.duplicate_task("a", 900).expect("task exists");
        assert_eq!(copy.id, "a-900");
        assert_eq!(copy.title, "task-a");
        assert_eq!(copy.status, Status::Current);
        assert_eq!(copy.completed_at, None);
        assert_eq!(copy.created_at, 900);
        assert_eq!(copy.due_date, Some(1717200000));
        assert_eq!(copy.notes.as_deref(), Some("context"));
        assert_eq!(copy.subtasks.len(), 2);
        assert!(copy.subtasks.iter().all(|s| !s.completed));
        assert!(copy.subtasks.iter().all(|s| s.id.starts_with("a-900-s")));
        assert_eq!(copy.urls[0].value, "https://example.com");
        assert_eq!(state.tasks().len(), 2);

        assert!(state.duplicate_task("missing", 1).is_none());
    }

    #[test]
    fn export_guard_admits_one_export_at_a_time() {
        let state = AppState::new(Vec::new(), Settings::default());
        assert!(!state.export_in_flight());
        assert!(state.begin_export());
        assert!(state.export_in_flight());
        assert!(!state.begin_export());
        state.end_export();
        assert!(!state.export_in_flight());
        assert!(state.begin_export());
    }

    #[test]
    fn update_settings_replaces_previous_value() {
        let state = AppState::new(Vec::new(), Settings::default());
        let mut next = Settings::default();
        next.theme = "dark".to_string();
        state.update_settings(next);
        assert_eq!(state.settings().theme, "dark");
    }
}
