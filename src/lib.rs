// Learn more about Tauri commands at https://tauri.app/develop/calling-rust/
pub mod commands;
pub mod completion;
pub mod datetime;
pub mod events;
pub mod export;
pub mod grouping;
pub mod logging;
pub mod models;
pub mod report;
pub mod state;
pub mod storage;

#[cfg(all(feature = "app", not(test)))]
use tauri::Manager;

#[cfg(all(feature = "app", not(test)))]
use crate::commands::*;
#[cfg(all(feature = "app", not(test)))]
use crate::state::AppState;
#[cfg(all(feature = "app", not(test)))]
use crate::storage::Storage;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
#[cfg(all(feature = "app", not(test)))]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_notification::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            if let Err(error) = logging::init_logging(&data_dir) {
                eprintln!("logger init failed: {error}");
            }

            let storage = Storage::new(data_dir);
            storage.ensure_dirs()?;

            let tasks = storage
                .load_tasks()
                .map(|data| data.tasks)
                .unwrap_or_default();
            let settings = storage
                .load_settings()
                .map(|data| data.settings)
                .unwrap_or_default();

            let state = AppState::new(tasks, settings);
            app.manage(state);

            log::info!("setup complete");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            load_state,
            create_task,
            update_task,
            apply_task_update,
            delete_task,
            duplicate_task,
            set_task_checked,
            set_subtask_checked,
            grouped_tasks,
            tab_counts,
            day_report,
            copy_report_to_clipboard,
            export_report_pdf,
            update_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
