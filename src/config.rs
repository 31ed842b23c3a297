//! Session configuration.
//!
//! Read from a JSON file whose keys mirror the fields in camelCase; every
//! key is optional.
//!
//! ```json
//! { "editEnabled": true, "autosaveQuietMs": 3000, "scrollbackLines": 1000, "shell": "sh" }
//! ```

use crate::alert::{Alert, AlertSink};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_QUIET_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// When false the session is read-only.
    pub edit_enabled: bool,
    pub autosave_quiet_ms: u64,
    pub scrollback_lines: usize,
    /// Interpreter used by the local runner.
    pub shell: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            edit_enabled: true,
            autosave_quiet_ms: DEFAULT_QUIET_MS,
            scrollback_lines: crate::terminal::DEFAULT_SCROLLBACK,
            shell: String::from("sh"),
        }
    }
}

impl Config {
    /// Defaults with editing disabled; used when no config can be obtained.
    pub fn read_only() -> Self {
        Self {
            edit_enabled: false,
            ..Self::default()
        }
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_ms)
    }

    pub fn from_json(text: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Invalid {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: origin.clone(),
            source,
        })?;
        let config = Self::from_json(&text, &origin)?;
        debug!(path = %origin, edit_enabled = config.edit_enabled, "loaded config");
        Ok(config)
    }

    /// Loads `path`, or alerts and falls back to [`Config::read_only`].
    pub fn load_or_read_only(path: impl AsRef<Path>, alerts: &dyn AlertSink) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "config unavailable, editing disabled");
                alerts.alert(Alert::warning(err.to_string()));
                Self::read_only()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{MemoryAlerts, Severity};

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json(r#"{"editEnabled": false}"#, "inline").unwrap();
        assert!(!config.edit_enabled);
        assert_eq!(config.autosave_quiet_ms, DEFAULT_QUIET_MS);
        assert_eq!(config.shell, "sh");
    }

    #[test]
    fn test_invalid_json() {
        let err = Config::from_json("{", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_missing_file_falls_back_read_only() {
        let alerts = MemoryAlerts::new();
        let config = Config::load_or_read_only("/nonexistent/config.json", &alerts);
        assert_eq!(config, Config::read_only());
        assert_eq!(alerts.alerts()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"autosaveQuietMs": 10, "shell": "bash"}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.quiet_period(), Duration::from_millis(10));
        assert_eq!(config.shell, "bash");
        assert!(config.edit_enabled);
    }
}
