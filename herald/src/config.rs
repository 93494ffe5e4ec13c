//! Daemon configuration.

use std::path::PathBuf;

use herald_delivery::SchedulerConfig;
use serde::{Deserialize, Serialize};

/// Control socket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Path of the Unix domain socket the control server binds
    #[serde(default = "default_socket")]
    pub socket: String,
}

fn default_socket() -> String {
    herald_control::DEFAULT_CONTROL_SOCKET.to_string()
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
        }
    }
}

/// Delivery-log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// CSV file every send attempt is appended to
    #[serde(default = "default_journal_path")]
    pub path: PathBuf,
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("./send_log.csv")
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: default_journal_path(),
        }
    }
}

/// Top-level daemon configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl HeraldConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document is not valid TOML or contains
    /// unknown value types.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Locate the configuration file using the following precedence:
    /// 1. `HERALD_CONFIG` environment variable
    /// 2. ./herald.config.toml (current working directory)
    /// 3. /etc/herald/herald.config.toml (system-wide config)
    ///
    /// # Errors
    ///
    /// Returns an error when `HERALD_CONFIG` points at a missing file or
    /// no candidate exists.
    pub fn find_config_file() -> anyhow::Result<PathBuf> {
        if let Ok(env_path) = std::env::var("HERALD_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Ok(path);
            }
            anyhow::bail!(
                "HERALD_CONFIG points to non-existent file: {}",
                path.display()
            );
        }

        let default_paths = vec![
            PathBuf::from("./herald.config.toml"),
            PathBuf::from("/etc/herald/herald.config.toml"),
        ];

        for path in &default_paths {
            if path.exists() {
                return Ok(path.clone());
            }
        }

        let paths_tried = default_paths
            .iter()
            .map(|p| format!("  - {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n");

        anyhow::bail!(
            "No configuration file found. Tried:\n  - HERALD_CONFIG environment variable\n{paths_tried}"
        )
    }

    /// Load configuration from the discovered file.
    ///
    /// # Errors
    ///
    /// Returns an error when no file is found or it fails to parse.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::find_config_file()?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
        })?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = HeraldConfig::from_toml("").unwrap();
        assert_eq!(config.control.socket, herald_control::DEFAULT_CONTROL_SOCKET);
        assert_eq!(config.journal.path, PathBuf::from("./send_log.csv"));
        assert!((config.scheduler.send_gap_secs - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sections_override_defaults() {
        let config = HeraldConfig::from_toml(
            r#"
            [scheduler]
            send_gap_secs = 1.5
            send_timeout_secs = 10
            operator = "ops@example.com"

            [control]
            socket = "/run/herald/control.sock"

            [journal]
            path = "/var/log/herald/send_log.csv"
            "#,
        )
        .unwrap();

        assert!((config.scheduler.send_gap_secs - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.scheduler.send_timeout_secs, 10);
        assert_eq!(
            config.scheduler.operator.as_deref(),
            Some("ops@example.com")
        );
        assert_eq!(config.control.socket, "/run/herald/control.sock");
        assert_eq!(
            config.journal.path,
            PathBuf::from("/var/log/herald/send_log.csv")
        );
    }
}
