use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::backend::{DEFAULT_BACKEND_URL, DEFAULT_BACKEND_WORKERS};
use crate::outline::DEFAULT_OUTLINE_INDENT;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "estimator";

/// Where backend failures are surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDisplay {
    /// Log file only
    #[default]
    Log,
    /// Log file plus a transient notification in the UI
    Notify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_backend_workers")]
    pub backend_workers: usize,

    /// Drop responses that arrive after a newer request of the same kind
    #[serde(default)]
    pub discard_stale_responses: bool,

    #[serde(default)]
    pub error_display: ErrorDisplay,

    #[serde(default = "default_outline_indent")]
    pub outline_indent: u16,

    #[serde(default = "default_pdf_scale")]
    pub pdf_scale: f32,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_backend_workers() -> usize {
    DEFAULT_BACKEND_WORKERS
}

fn default_outline_indent() -> u16 {
    DEFAULT_OUTLINE_INDENT
}

fn default_pdf_scale() -> f32 {
    1.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            backend_workers: default_backend_workers(),
            discard_stale_responses: false,
            error_display: ErrorDisplay::default(),
            outline_indent: default_outline_indent(),
            pdf_scale: default_pdf_scale(),
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from the config directory, writing defaults if the file is missing
pub fn load_settings() {
    let Some(path) = config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    load_settings_from_path(&path);
}

pub fn load_settings_from_path(path: &Path) {
    if !path.exists() {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, path);
        }
        return;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                sanitize(&mut settings);

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

fn sanitize(settings: &mut Settings) {
    if settings.backend_workers == 0 {
        warn!("backend_workers must be at least 1, using 1");
        settings.backend_workers = 1;
    }
    if settings.request_timeout_secs == 0 {
        warn!(
            "request_timeout_secs must be positive, using {}",
            default_request_timeout_secs()
        );
        settings.request_timeout_secs = default_request_timeout_secs();
    }
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let body = match serde_yaml::to_string(settings) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, format!("{SETTINGS_HEADER}{body}")) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = r#"# Estimator settings
#
# backend_url              measurement service base URL
# request_timeout_secs     per-request timeout
# backend_workers          concurrent requests to the backend
# discard_stale_responses  drop replies superseded by a newer request
# error_display            log | notify
# outline_indent           spaces per table-of-contents level
# pdf_scale                initial page zoom

"#;

/// Snapshot of the active settings
pub fn get_settings() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}
