/// Runtime configuration handed over by the background script
use serde::{Deserialize, Serialize};

/// Tunables for the sync engine.
///
/// Every field has a default so the background script may pass `undefined`,
/// `{}` or any subset of keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Quiet period after the last change event before an auto-save runs
    pub debounce_ms: u32,
    pub max_title_chars: usize,
    pub max_device_name_chars: usize,
    pub log_level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            debounce_ms: 2000,
            max_title_chars: 100,
            max_device_name_chars: 32,
            log_level: "info".to_string(),
        }
    }
}

impl SyncConfig {
    /// Parsed log level, falling back to `Info` for anything unrecognised
    pub fn level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }
}
