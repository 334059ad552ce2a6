use crate::activity::retention::{DEFAULT_BURST_PERCENT, DEFAULT_MAX_RETAINED};
use crate::common::error::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InspectorConfig {
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
    #[serde(default = "default_burst_percent")]
    pub burst_allowance_percent: u32,
    #[serde(default)]
    pub start_paused: bool,
    #[serde(default = "default_true")]
    pub show_successful: bool,
    #[serde(default = "default_true")]
    pub show_timeouts: bool,
    #[serde(default)]
    pub verbose_logging: bool,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_max_retained() -> usize {
    DEFAULT_MAX_RETAINED
}

fn default_burst_percent() -> u32 {
    DEFAULT_BURST_PERCENT
}

fn default_true() -> bool {
    true
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            max_retained: default_max_retained(),
            burst_allowance_percent: default_burst_percent(),
            start_paused: false,
            show_successful: true,
            show_timeouts: true,
            verbose_logging: false,
            log_dir: None,
        }
    }
}

/// `<user config dir>/netscope/config.json`
pub fn default_config_path() -> Result<PathBuf, AppError> {
    let base = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Failed to resolve config directory".to_string()))?;
    Ok(base.join("netscope").join("config.json"))
}

/// Load the config at `path`, falling back to defaults if absent or unreadable as JSON.
pub fn load_config(path: &Path) -> Result<InspectorConfig, AppError> {
    if !path.exists() {
        return Ok(InspectorConfig::default());
    }

    let content = fs::read_to_string(path)?;

    match serde_json::from_str::<InspectorConfig>(&content) {
        Ok(config) => Ok(config),
        Err(e) => {
            log::warn!(
                "[Config] Failed to parse {}, using defaults: {}",
                path.display(),
                e
            );
            Ok(InspectorConfig::default())
        }
    }
}

pub fn save_config(path: &Path, config: &InspectorConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;
    log::info!("[Config] Saved configuration to {}", path.display());
    Ok(())
}
