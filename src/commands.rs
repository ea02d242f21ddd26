use chrono::Utc;
use std::path::PathBuf;

use crate::completion::{self, DayStats};
use crate::datetime::{self, parse_day_key, resolve_language};
use crate::events::StatePayload;
#[cfg(all(feature = "app", not(test)))]
use crate::events::EVENT_STATE_UPDATED;
use crate::export::{self, clipboard_payload, pdf_file_name, ExportError};
use crate::grouping::{group_tasks, Tab, TabCounts};
use crate::models::{Settings, Task, TaskPatch};
use crate::report::{build_report, Report};
use crate::state::AppState;
use crate::storage::{Storage, StorageError};

#[cfg(all(feature = "app", not(test)))]
use tauri::{AppHandle, Emitter, Manager, Runtime, State};
#[cfg(all(feature = "app", not(test)))]
use tauri_plugin_clipboard_manager::ClipboardExt;
#[cfg(all(feature = "app", not(test)))]
use tauri_plugin_notification::NotificationExt;

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Host services a command needs: data directory resolution, event emission,
/// user notifications, clipboard access. Production uses the Tauri app
/// handle; tests substitute a recording fake.
pub trait CommandCtx {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError>;
    fn emit_state_updated(&self, payload: StatePayload);
    fn notify(&self, title: &str, body: &str);
    fn clipboard_write(&self, html: &str, text: &str) -> Result<(), String>;
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn persist(ctx: &impl CommandCtx, state: &AppState) -> Result<(), StorageError> {
    let root = ctx.app_data_dir()?;
    let storage = Storage::new(root);
    storage.ensure_dirs()?;
    storage.save_tasks(&state.tasks_file())?;
    storage.save_settings(&state.settings_file())?;
    let payload = StatePayload {
        tasks: state.tasks(),
        settings: state.settings(),
    };
    ctx.emit_state_updated(payload);
    Ok(())
}

#[cfg(all(feature = "app", not(test)))]
struct TauriCommandCtx<'a, R: Runtime> {
    app: &'a AppHandle<R>,
}

#[cfg(all(feature = "app", not(test)))]
impl<R: Runtime> CommandCtx for TauriCommandCtx<'_, R> {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError> {
        self.app
            .path()
            .app_data_dir()
            .map_err(|err| StorageError::Io(std::io::Error::other(err.to_string())))
    }

    fn emit_state_updated(&self, payload: StatePayload) {
        let _ = self.app.emit(EVENT_STATE_UPDATED, payload);
    }

    fn notify(&self, title: &str, body: &str) {
        let _ = self
            .app
            .notification()
            .builder()
            .title(title)
            .body(body)
            .show();
    }

    fn clipboard_write(&self, html: &str, text: &str) -> Result<(), String> {
        // One write carrying both representations; the paste target picks.
        self.app
            .clipboard()
            .write_html(html.to_string(), Some(text.to_string()))
            .map_err(|err| err.to_string())
    }
}

pub fn load_state_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
) -> CommandResult<(Vec<Task>, Settings)> {
    let root = match ctx.app_data_dir() {
        Ok(path) => path,
        Err(e) => return err(&format!("app_data_dir error: {e}")),
    };
    let storage = Storage::new(root);
    if let Err(error) = storage.ensure_dirs() {
        return err(&format!("storage error: {error:?}"));
    }
    let tasks = storage
        .load_tasks()
        .map(|data| data.tasks)
        .unwrap_or_default();
    let settings = storage
        .load_settings()
        .map(|data| data.settings)
        .unwrap_or_else(|_| Settings::default());
    state.replace_tasks(tasks.clone());
    state.update_settings(settings.clone());
    ok((tasks, settings))
}

pub fn create_task_impl(ctx: &impl CommandCtx, state: &AppState, task: Task) -> CommandResult<Task> {
    state.add_task(task.clone());
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(task)
}

pub fn update_task_impl(ctx: &impl CommandCtx, state: &AppState, task: Task) -> CommandResult<Task> {
    state.update_task(task.clone());
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(task)
}

pub fn apply_task_update_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
    patch: TaskPatch,
) -> CommandResult<Task> {
    let now = Utc::now().timestamp();
    let updated = match state.apply_patch(&task_id, patch, now) {
        Some(task) => task,
        None => return err("task not found"),
    };
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(updated)
}

pub fn delete_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
) -> CommandResult<bool> {
    state.remove_task(&task_id);
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(true)
}

pub fn duplicate_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
) -> CommandResult<Task> {
    let now = Utc::now().timestamp();
    let copy = match state.duplicate_task(&task_id, now) {
        Some(task) => task,
        None => return err("task not found"),
    };
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(copy)
}

pub fn set_task_checked_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
    checked: bool,
) -> CommandResult<Task> {
    let now = Utc::now().timestamp();
    let task = match state.tasks().into_iter().find(|t| t.id == task_id) {
        Some(task) => task,
        None => return err("task not found"),
    };
    let patch = completion::toggle_task(&task, checked, now);
    let updated = match state.apply_patch(&task_id, patch, now) {
        Some(task) => task,
        None => return err("task not found"),
    };
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(updated)
}

pub fn set_subtask_checked_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
    subtask_id: String,
    completed: bool,
) -> CommandResult<Task> {
    let now = Utc::now().timestamp();
    let task = match state.tasks().into_iter().find(|t| t.id == task_id) {
        Some(task) => task,
        None => return err("task not found"),
    };
    let patch = match completion::toggle_subtask(&task, &subtask_id, completed, now) {
        Some(patch) => patch,
        None => return err("subtask not found"),
    };
    let updated = match state.apply_patch(&task_id, patch, now) {
        Some(task) => task,
        None => return err("task not found"),
    };
    if let Err(error) = persist(ctx, state) {
        return err(&format!("storage error: {error:?}"));
    }
    ok(updated)
}

pub fn update_settings_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    mut settings: Settings,
) -> CommandResult<Settings> {
    let previous = state.settings();

    // Normalize user input so tests/production behave the same and the
    // persisted config is stable.
    let language = settings.language.trim().to_lowercase();
    settings.language = match language.as_str() {
        "auto" | "zh" | "en" => language.clone(),
        _ => Settings::default().language,
    };
    let theme = settings.theme.trim().to_lowercase();
    settings.theme = match theme.as_str() {
        "light" | "dark" => theme.clone(),
        _ => Settings::default().theme,
    };

    state.update_settings(settings.clone());
    if let Err(error) = persist(ctx, state) {
        // Roll back in-memory settings to keep the running app consistent.
        state.update_settings(previous);
        return err(&format!("storage error: {error:?}"));
    }
    ok(settings)
}

/// One date-keyed section of the task list as the webview consumes it.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupPayload {
    pub key: Option<String>,
    pub label: String,
    pub stats: DayStats,
    pub tasks: Vec<Task>,
}

pub fn grouped_tasks_impl(
    state: &AppState,
    tab: Tab,
    search: Option<String>,
) -> CommandResult<Vec<GroupPayload>> {
    let today = datetime::today();
    let language = resolve_language(&state.settings().language);
    let groups = group_tasks(&state.tasks(), tab, search.as_deref(), today);
    ok(groups
        .into_iter()
        .map(|group| GroupPayload {
            key: group.day.map(datetime::day_key),
            label: datetime::day_label(group.day, today, language),
            stats: completion::day_stats(&group.tasks),
            tasks: group.tasks,
        })
        .collect())
}

pub fn tab_counts_impl(state: &AppState) -> CommandResult<TabCounts> {
    ok(crate::grouping::tab_counts(&state.tasks(), datetime::today()))
}

fn find_report(state: &AppState, tab: Tab, key: Option<&str>) -> Result<Report, String> {
    let today = datetime::today();
    let day = match key {
        Some(raw) => {
            Some(parse_day_key(raw).ok_or_else(|| format!("invalid date key: {raw}"))?)
        }
        None => None,
    };
    let language = resolve_language(&state.settings().language);
    let groups = group_tasks(&state.tasks(), tab, None, today);
    let group = groups
        .into_iter()
        .find(|group| group.day == day)
        .ok_or_else(|| "no tasks for that day".to_string())?;
    Ok(build_report(&group, today, language))
}

pub fn day_report_impl(
    state: &AppState,
    tab: Tab,
    key: Option<String>,
) -> CommandResult<Report> {
    match find_report(state, tab, key.as_deref()) {
        Ok(report) => ok(report),
        Err(message) => err(&message),
    }
}

pub fn copy_report_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    tab: Tab,
    key: Option<String>,
) -> CommandResult<bool> {
    let report = match find_report(state, tab, key.as_deref()) {
        Ok(report) => report,
        Err(message) => return err(&message),
    };

    let payload = clipboard_payload(&report);
    match ctx.clipboard_write(&payload.html, &payload.text) {
        Ok(()) => {
            log::info!("report copied to clipboard: {}", report.title);
            ctx.notify("Report copied", &report.title);
            ok(true)
        }
        Err(message) => {
            let error = ExportError::Clipboard(message);
            log::warn!("clipboard export failed: {error}");
            ctx.notify("Copy failed", &error.to_string());
            err(&error.to_string())
        }
    }
}

pub fn export_report_pdf_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    tab: Tab,
    key: Option<String>,
    png_bytes: Vec<u8>,
) -> CommandResult<String> {
    if !state.begin_export() {
        return err("an export is already in progress");
    }

    let result = (|| -> Result<PathBuf, String> {
        let report = find_report(state, tab, key.as_deref())?;
        let root = ctx
            .app_data_dir()
            .map_err(|error| format!("app_data_dir error: {error}"))?;
        let storage = Storage::new(root);
        storage
            .ensure_dirs()
            .map_err(|error| format!("storage error: {error:?}"))?;
        let path = storage
            .exports_dir()
            .join(pdf_file_name(report.key.as_deref(), &report.label));
        export::write_report_pdf(&png_bytes, &report.title, &path)
            .map_err(|error| error.to_string())?;
        Ok(path)
    })();

    // The guard must clear on every path; a failed export must not leave
    // the export actions disabled.
    state.end_export();

    match result {
        Ok(path) => {
            let path = path.to_string_lossy().to_string();
            log::info!("report exported: {path}");
            ctx.notify("Report exported", &path);
            ok(path)
        }
        Err(message) => {
            log::warn!("pdf export failed: {message}");
            ctx.notify("Export failed", &message);
            err(&message)
        }
    }
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn load_state(app: AppHandle, state: State<AppState>) -> CommandResult<(Vec<Task>, Settings)> {
    let ctx = TauriCommandCtx { app: &app };
    load_state_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn create_task(app: AppHandle, state: State<AppState>, task: Task) -> CommandResult<Task> {
    let ctx = TauriCommandCtx { app: &app };
    create_task_impl(&ctx, state.inner(), task)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn update_task(app: AppHandle, state: State<AppState>, task: Task) -> CommandResult<Task> {
    let ctx = TauriCommandCtx { app: &app };
    update_task_impl(&ctx, state.inner(), task)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn apply_task_update(
    app: AppHandle,
    state: State<AppState>,
    task_id: String,
    patch: TaskPatch,
) -> CommandResult<Task> {
    let ctx = TauriCommandCtx { app: &app };
    apply_task_update_impl(&ctx, state.inner(), task_id, patch)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn delete_task(app: AppHandle, state: State<AppState>, task_id: String) -> CommandResult<bool> {
    let ctx = TauriCommandCtx { app: &app };
    delete_task_impl(&ctx, state.inner(), task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn duplicate_task(
    app: AppHandle,
    state: State<AppState>,
    task_id: String,
) -> CommandResult<Task> {
    let ctx = TauriCommandCtx { app: &app };
    duplicate_task_impl(&ctx, state.inner(), task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn set_task_checked(
    app: AppHandle,
    state: State<AppState>,
    task_id: String,
    checked: bool,
) -> CommandResult<Task> {
    let ctx = TauriCommandCtx { app: &app };
    set_task_checked_impl(&ctx, state.inner(), task_id, checked)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn set_subtask_checked(
    app: AppHandle,
    state: State<AppState>,
    task_id: String,
    subtask_id: String,
    completed: bool,
) -> CommandResult<Task> {
    let ctx = TauriCommandCtx { app: &app };
    set_subtask_checked_impl(&ctx, state.inner(), task_id, subtask_id, completed)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn update_settings(
    app: AppHandle,
    state: State<AppState>,
    settings: Settings,
) -> CommandResult<Settings> {
    let ctx = TauriCommandCtx { app: &app };
    update_settings_impl(&ctx, state.inner(), settings)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn grouped_tasks(
    state: State<AppState>,
    tab: Tab,
    search: Option<String>,
) -> CommandResult<Vec<GroupPayload>> {
    grouped_tasks_impl(state.inner(), tab, search)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn tab_counts(state: State<AppState>) -> CommandResult<TabCounts> {
    tab_counts_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn day_report(
    state: State<AppState>,
    tab: Tab,
    key: Option<String>,
) -> CommandResult<Report> {
    day_report_impl(state.inner(), tab, key)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn copy_report_to_clipboard(
    app: AppHandle,
    state: State<AppState>,
    tab: Tab,
    key: Option<String>,
) -> CommandResult<bool> {
    let ctx = TauriCommandCtx { app: &app };
    copy_report_impl(&ctx, state.inner(), tab, key)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn export_report_pdf(
    app: AppHandle,
    state: State<AppState>,
    tab: Tab,
    key: Option<String>,
    png_bytes: Vec<u8>,
) -> CommandResult<String> {
    let ctx = TauriCommandCtx { app: &app };
    export_report_pdf_impl(&ctx, state.inner(), tab, key, png_bytes)
}
