use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::offline::PopulationStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "scenestealer";
const APP_CONFIG_FILE: &str = "config.json";
const DEFAULT_EXTERNAL_PRESET_DIR: &str = "presets";
const DEFAULT_BUILTIN_PRESET_DIR: &str = "apps/web/presets";
const DEFAULT_SITE_ROOT: &str = "apps/web";

/// Where presets are looked up, in priority order external then built-in.
#[derive(Debug, Clone, Deserialize)]
pub struct PresetDirs {
    #[serde(default = "default_external_dir")]
    pub external: PathBuf,
    #[serde(default = "default_builtin_dir")]
    pub builtin: PathBuf,
}

impl Default for PresetDirs {
    fn default() -> Self {
        Self {
            external: default_external_dir(),
            builtin: default_builtin_dir(),
        }
    }
}

fn default_external_dir() -> PathBuf {
    PathBuf::from(DEFAULT_EXTERNAL_PRESET_DIR)
}

fn default_builtin_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUILTIN_PRESET_DIR)
}

/// Overrides for the offline manifest; unset fields keep the built-in manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfflineConfig {
    #[serde(default)]
    pub cache_prefix: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub assets: Option<Vec<String>>,
    #[serde(default)]
    pub navigation_fallback: Option<String>,
    #[serde(default)]
    pub strategy: Option<PopulationStrategy>,
}

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub preset_dirs: PresetDirs,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub site_root: Option<PathBuf>,
    #[serde(default)]
    pub offline: OfflineConfig,
    #[serde(default)]
    pub notifications: bool,
}

impl AppConfig {
    pub fn site_root(&self) -> PathBuf {
        self.site_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SITE_ROOT))
    }

    /// Configured data directory, else the XDG data directory.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(data_dir)
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

pub fn load_app_config_from(path: &Path) -> AppConfig {
    if !path.exists() {
        tracing::debug!(?path, "config file missing; using defaults");
        return AppConfig::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(path) => load_app_config_from(&path),
        Err(_) => AppConfig::default(),
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    xdg_root(xdg_config_home, home, ".config")
}

/// `$XDG_DATA_HOME/scenestealer`, falling back to `~/.local/share/scenestealer`.
pub fn data_dir() -> Option<PathBuf> {
    let xdg_data_home = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    data_dir_with(xdg_data_home.as_deref(), home.as_deref()).ok()
}

pub(crate) fn data_dir_with(
    xdg_data_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = xdg_root(xdg_data_home, home, ".local/share")?;
    path.push(APP_DIR);
    Ok(path)
}

fn xdg_root(
    xdg_home: Option<&Path>,
    home: Option<&Path>,
    home_fallback: &str,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(home_fallback))
}
