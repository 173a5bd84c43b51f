pub mod api;
pub mod session;
pub mod settings;
pub mod share;
pub mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_dialog::DialogExt;

use api::http::HttpBackend;
use api::{FileStats, HealthStatus, StoryKind, StoryRecord};
use session::{AudioOutcome, SessionManager, SessionSnapshot, View};
use settings::Settings;
use upload::SelectedImage;

/// Payload emitted on `audio:download` events once a fire-and-forget
/// download settles.
#[derive(Clone, Serialize)]
struct DownloadPayload {
    status: String, // "saved" or "error"
    path: Option<String>,
    message: Option<String>,
}

fn emit_session(app: &AppHandle, manager: &SessionManager) {
    let _ = app.emit("session:changed", manager.snapshot());
}

/// Open the native file picker, filtered to the accepted image formats.
/// Returns `None` when the user cancels — that is not an error.
#[tauri::command]
async fn pick_image(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
) -> Result<Option<SelectedImage>, String> {
    let dialog_app = app.clone();
    let picked = tauri::async_runtime::spawn_blocking(move || {
        dialog_app
            .dialog()
            .file()
            .add_filter("Images", &upload::ALLOWED_EXTENSIONS)
            .blocking_pick_file()
    })
    .await
    .map_err(|e| e.to_string())?;

    let Some(file) = picked else {
        return Ok(None);
    };
    let path = file.into_path().map_err(|e| e.to_string())?;
    let selected = manager
        .select_image(&path)
        .map_err(|violations| violations.join("\n"))?;
    emit_session(&app, &manager);
    Ok(Some(selected))
}

/// Select an image from a drop (the webview's drop event delivers native
/// paths). A drop carrying more than one file is rejected outright, with
/// one message per file.
#[tauri::command]
async fn select_image(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
    paths: Vec<String>,
) -> Result<SelectedImage, String> {
    let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
    let path = upload::single_dropped_file(&paths).map_err(|violations| violations.join("\n"))?;
    let selected = manager
        .select_image(path)
        .map_err(|violations| violations.join("\n"))?;
    emit_session(&app, &manager);
    Ok(selected)
}

#[tauri::command]
async fn clear_selected_image(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
) -> Result<(), String> {
    manager.clear_selected();
    emit_session(&app, &manager);
    Ok(())
}

#[tauri::command]
async fn set_story_kind(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
    kind: StoryKind,
) -> Result<(), String> {
    manager.set_kind(kind).map_err(|e| e.to_string())?;
    emit_session(&app, &manager);
    Ok(())
}

/// Upload the pending image and switch to the story screen on success.
#[tauri::command]
async fn upload_selected(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
) -> Result<StoryRecord, String> {
    let result = manager.upload().await.map_err(|e| e.to_string());
    emit_session(&app, &manager);
    result
}

/// Narrate the active story. Reuse-only: a second call returns the existing
/// record without a network request.
#[tauri::command]
async fn generate_story_audio(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
) -> Result<AudioOutcome, String> {
    let result = manager.generate_audio().await.map_err(|e| e.to_string());
    emit_session(&app, &manager);
    result
}

#[tauri::command]
async fn create_another(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
) -> Result<View, String> {
    let view = manager.create_another();
    emit_session(&app, &manager);
    Ok(view)
}

#[tauri::command]
async fn navigate_to(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
    view: View,
) -> Result<View, String> {
    let view = manager.navigate_to(view).map_err(|e| e.to_string())?;
    emit_session(&app, &manager);
    Ok(view)
}

#[tauri::command]
async fn session_snapshot(
    manager: State<'_, Arc<SessionManager>>,
) -> Result<SessionSnapshot, String> {
    Ok(manager.snapshot())
}

/// Clipboard fallback for the share affordance: `title\n\ncontent`.
#[tauri::command]
async fn copy_story_to_clipboard(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
) -> Result<(), String> {
    let story = manager
        .active_story()
        .ok_or_else(|| "No story to share".to_string())?;
    app.clipboard()
        .write_text(share::share_text(&story))
        .map_err(|e| e.to_string())?;
    log::info!("Story {} copied to clipboard", story.id);
    Ok(())
}

/// Fire-and-forget download of the generated narration into the user's
/// Downloads directory. The outcome arrives as an `audio:download` event.
#[tauri::command]
async fn download_audio(
    app: AppHandle,
    manager: State<'_, Arc<SessionManager>>,
) -> Result<(), String> {
    let audio = manager
        .active_audio()
        .ok_or_else(|| "No audio generated yet".to_string())?;
    let dest = share::download_destination(&audio.audio_filename).map_err(|e| e.to_string())?;
    let backend = manager.backend();

    tauri::async_runtime::spawn(async move {
        let payload = match backend.fetch_audio(&audio.audio_filename).await {
            Ok(bytes) => match tokio::fs::write(&dest, &bytes).await {
                Ok(()) => {
                    log::info!("Audio saved to {}", dest.display());
                    DownloadPayload {
                        status: "saved".into(),
                        path: Some(dest.display().to_string()),
                        message: None,
                    }
                }
                Err(e) => {
                    log::error!("Failed to write {}: {}", dest.display(), e);
                    DownloadPayload {
                        status: "error".into(),
                        path: None,
                        message: Some(e.to_string()),
                    }
                }
            },
            Err(e) => {
                log::error!("Audio download failed: {}", e);
                DownloadPayload {
                    status: "error".into(),
                    path: None,
                    message: Some(e.to_string()),
                }
            }
        };
        let _ = app.emit("audio:download", payload);
    });

    Ok(())
}

/// Show a downloaded file in the system file manager.
#[tauri::command]
async fn reveal_download(path: String) -> Result<(), String> {
    tauri_plugin_opener::reveal_item_in_dir(&path).map_err(|e| e.to_string())
}

/// Remove a narration file on the backend.
#[tauri::command]
async fn delete_audio_file(
    manager: State<'_, Arc<SessionManager>>,
    filename: String,
) -> Result<Value, String> {
    manager
        .backend()
        .delete_audio(&filename)
        .await
        .map_err(|e| e.to_string())
}

// Status probes. A dead or slow backend must never break the UI, so these
// log and return None instead of erroring.

#[tauri::command]
async fn get_health(
    manager: State<'_, Arc<SessionManager>>,
) -> Result<Option<HealthStatus>, String> {
    match manager.backend().health().await {
        Ok(health) => Ok(Some(health)),
        Err(e) => {
            log::warn!("Health probe failed: {}", e);
            Ok(None)
        }
    }
}

#[tauri::command]
async fn get_upload_status(
    manager: State<'_, Arc<SessionManager>>,
) -> Result<Option<Value>, String> {
    match manager.backend().upload_status().await {
        Ok(status) => Ok(Some(status)),
        Err(e) => {
            log::warn!("Upload status probe failed: {}", e);
            Ok(None)
        }
    }
}

#[tauri::command]
async fn get_tts_status(
    manager: State<'_, Arc<SessionManager>>,
) -> Result<Option<Value>, String> {
    match manager.backend().tts_status().await {
        Ok(status) => Ok(Some(status)),
        Err(e) => {
            log::warn!("TTS status probe failed: {}", e);
            Ok(None)
        }
    }
}

#[tauri::command]
async fn get_file_stats(
    manager: State<'_, Arc<SessionManager>>,
) -> Result<Option<FileStats>, String> {
    match manager.backend().file_stats().await {
        Ok(stats) => Ok(Some(stats)),
        Err(e) => {
            log::warn!("File stats probe failed: {}", e);
            Ok(None)
        }
    }
}

// Pure URL composition — no network call ever.

#[tauri::command]
fn get_image_url(manager: State<'_, Arc<SessionManager>>, filename: String) -> String {
    manager.backend().image_url(&filename)
}

#[tauri::command]
fn get_audio_url(manager: State<'_, Arc<SessionManager>>, filename: String) -> String {
    manager.backend().audio_url(&filename)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            let settings = Settings::load_from_app(app.handle()).unwrap_or_else(|e| {
                log::warn!("Could not load settings ({}), using defaults", e);
                Settings::default()
            });
            let backend = HttpBackend::new(&settings.backend_url)?;
            log::info!("StoryLens ready (backend: {})", backend.base_url());
            app.manage(Arc::new(SessionManager::new(Arc::new(backend))));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            pick_image,
            select_image,
            clear_selected_image,
            set_story_kind,
            upload_selected,
            generate_story_audio,
            create_another,
            navigate_to,
            session_snapshot,
            copy_story_to_clipboard,
            download_audio,
            reveal_download,
            delete_audio_file,
            get_health,
            get_upload_status,
            get_tts_status,
            get_file_stats,
            get_image_url,
            get_audio_url,
            settings::save_settings,
            settings::load_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
