use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tauri::Manager;

/// Environment override for the backend base URL. Beats both the persisted
/// file and the built-in default.
const BASE_URL_ENV: &str = "STORYLENS_API_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub backend_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

fn config_path(app: &tauri::AppHandle) -> Result<PathBuf, String> {
    let dir = app.path().app_config_dir().map_err(|e| e.to_string())?;
    fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    Ok(dir.join("settings.toml"))
}

impl Settings {
    /// Settings from the environment, when the override is set.
    fn from_env() -> Option<Self> {
        std::env::var(BASE_URL_ENV)
            .ok()
            .map(|backend_url| Self { backend_url })
    }

    /// Load settings: environment override first, then the persisted file,
    /// then the default.
    pub fn load_from_app(app: &tauri::AppHandle) -> Result<Self, String> {
        if let Some(settings) = Self::from_env() {
            log::info!("Backend URL taken from {}", BASE_URL_ENV);
            return Ok(settings);
        }
        let path = config_path(app)?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| e.to_string())?;
        toml::from_str(&content).map_err(|e| e.to_string())
    }
}

#[tauri::command]
pub async fn save_settings(app: tauri::AppHandle, settings: Settings) -> Result<(), String> {
    let path = config_path(&app)?;
    let content = toml::to_string_pretty(&settings).map_err(|e| e.to_string())?;
    fs::write(&path, content).map_err(|e| e.to_string())?;
    log::info!("Settings saved to {}", path.display());
    Ok(())
}

#[tauri::command]
pub async fn load_settings(app: tauri::AppHandle) -> Result<Settings, String> {
    Settings::load_from_app(&app)
}
