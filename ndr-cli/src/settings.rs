//! Command-line settings
//!
//! Stored as `settings.json` in the user's config directory. Flags given on
//! the command line take precedence over anything in the file.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use ndr_transport::ConnectionMode;
use serde::{Deserialize, Serialize};

/// How to reach the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    Tcp,
    Udp,
    Serial,
    /// In-process virtual radio
    Sim,
}

impl LinkMode {
    /// Transport to open; `None` for the virtual radio
    pub fn connection_mode(self) -> Option<ConnectionMode> {
        match self {
            LinkMode::Tcp => Some(ConnectionMode::Tcp),
            LinkMode::Udp => Some(ConnectionMode::Udp),
            LinkMode::Serial => Some(ConnectionMode::Serial),
            LinkMode::Sim => None,
        }
    }
}

impl From<ConnectionMode> for LinkMode {
    fn from(mode: ConnectionMode) -> Self {
        match mode {
            ConnectionMode::Tcp => LinkMode::Tcp,
            ConnectionMode::Udp => LinkMode::Udp,
            ConnectionMode::Serial => LinkMode::Serial,
        }
    }
}

/// Saved settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Radio model name
    pub model: String,
    /// Link kind; the model's usual link when unset
    pub mode: Option<LinkMode>,
    /// Host name, address or serial device
    pub host: String,
    /// Port, or baud rate for serial links; the model's usual port when unset
    pub port: Option<u32>,
    /// Reply timeout in milliseconds
    pub timeout_ms: u64,
    /// Default log level for the project crates
    pub log_level: String,
    /// Append log output to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "NDR308".to_string(),
            mode: None,
            host: "192.168.0.10".to_string(),
            port: None,
            timeout_ms: 2000,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for ndr
    /// Uses $XDG_CONFIG_HOME/ndr, falls back to ~/.config/ndr
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("ndr"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("ndr"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the default location
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&text).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), String> {
        let path =
            Self::settings_path().ok_or_else(|| "Could not determine settings path".to_string())?;
        self.save_to(&path)
    }

    /// Save settings to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"model": "NDR358", "mode": "udp"}"#).unwrap();
        assert_eq!(settings.model, "NDR358");
        assert_eq!(settings.mode, Some(LinkMode::Udp));
        assert_eq!(settings.timeout_ms, 2000);
        assert_eq!(settings.port, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("ndr-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        let settings = Settings {
            mode: Some(LinkMode::Sim),
            port: Some(8617),
            log_file: Some(PathBuf::from("/tmp/ndr.log")),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load_from(Path::new("/nonexistent/ndr/settings.json")).unwrap_err();
        assert!(err.contains("Failed to read"));
    }

    #[test]
    fn test_link_mode_mapping() {
        assert_eq!(LinkMode::Sim.connection_mode(), None);
        assert_eq!(LinkMode::Serial.connection_mode(), Some(ConnectionMode::Serial));
        assert_eq!(LinkMode::from(ConnectionMode::Udp), LinkMode::Udp);
    }
}
