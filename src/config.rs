use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "LabStat";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const SETTINGS_FILE: &str = "settings.json";
pub const MAPPING_FILE: &str = "mapping.json";
pub const DEFAULT_MAPPING_RESOURCE: &str = "resources/mapping.json";

pub const DEFAULT_AUDIT_FILE: &str = "export/DeletedSuspects.csv";
pub const DEFAULT_EXPORT_DIR: &str = "export";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "labstat=info"
}

pub fn verbose_log_filter() -> &'static str {
    "labstat=debug"
}

/// ~/LabStat/ on all platforms, or ./LabStat when no home is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn settings_path() -> PathBuf {
    app_data_dir().join(SETTINGS_FILE)
}

/// Bundled resource next to the executable, else relative to the working
/// directory.
pub fn resource_path(relative: &str) -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(relative)));
    match beside_exe {
        Some(path) if path.exists() => path,
        _ => PathBuf::from(relative),
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Empty means "not configured".
    pub database_path: String,
    pub audit_file: String,
    pub export_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            audit_file: DEFAULT_AUDIT_FILE.to_string(),
            export_dir: DEFAULT_EXPORT_DIR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub exclude_analytes: BTreeSet<String>,
}

/// User settings persisted as `settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub filters: FilterSettings,
}

impl Settings {
    /// Missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Replace the excluded analytes; blanks are dropped.
    pub fn set_excluded_analytes<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filters.exclude_analytes = items
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

/// Resolve a configured path; relative entries are taken against `base`.
pub fn resolve_against(base: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
