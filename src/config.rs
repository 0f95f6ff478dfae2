use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CanvasError;
use crate::model::DayBucketing;
use crate::scm::HostKeyPolicy;

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - Linux: $XDG_CONFIG_HOME/commit-canvas or ~/.config/commit-canvas
    /// - macOS: ~/Library/Application Support/commit-canvas
    /// - Windows: %APPDATA%\commit-canvas
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join("commit-canvas"))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join("commit-canvas"))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home
                .join("Library")
                .join("Application Support")
                .join("commit-canvas"))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join("commit-canvas"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(".commit-canvas"))
        }
    }

    /// Get the engine config file path (config.toml)
    pub fn engine_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the log file path
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("commit-canvas.log"))
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;
        Ok(config_dir)
    }
}

/// Limits, in seconds, for the external steps of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub clone_secs: u64,
    pub push_secs: u64,
    pub rewrite_secs: u64,
    /// Everything else: config, add, commit, log, reset.
    pub local_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            clone_secs: 60,
            push_secs: 120,
            rewrite_secs: 300,
            local_secs: 30,
        }
    }
}

impl Timeouts {
    /// Reject a zero limit, which would fail every step immediately.
    pub fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("clone", self.clone_secs),
            ("push", self.push_secs),
            ("rewrite", self.rewrite_secs),
            ("local", self.local_secs),
        ] {
            if secs == 0 {
                return Err(CanvasError::validation(format!(
                    "{name} timeout must be at least 1 second"
                ))
                .into());
            }
        }
        Ok(())
    }

    pub fn clone_limit(&self) -> Duration {
        Duration::from_secs(self.clone_secs)
    }

    pub fn push_limit(&self) -> Duration {
        Duration::from_secs(self.push_secs)
    }

    pub fn rewrite_limit(&self) -> Duration {
        Duration::from_secs(self.rewrite_secs)
    }

    pub fn local_limit(&self) -> Duration {
        Duration::from_secs(self.local_secs)
    }
}

/// Engine settings shared by every operation.
///
/// Never holds the authentication secret; that is supplied per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Branch to publish to. Detected from the clone when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_branch: Option<String>,

    pub host_key_policy: HostKeyPolicy,

    pub day_bucketing: DayBucketing,

    /// Tracked file appended to once per synthetic commit
    pub marker_file: String,

    pub commit_message: String,

    /// File written into the single commit that replaces an emptied history
    pub placeholder_file: String,

    pub placeholder_content: String,

    pub placeholder_message: String,

    /// Identity used for the placeholder commit
    pub placeholder_author_name: String,

    pub placeholder_author_email: String,

    /// Prefix for workspace directory names; a random suffix is always added
    pub workspace_prefix: String,

    pub timeouts: Timeouts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            primary_branch: None,
            host_key_policy: HostKeyPolicy::default(),
            day_bucketing: DayBucketing::default(),
            marker_file: "contributions.txt".to_string(),
            commit_message: "contribution".to_string(),
            placeholder_file: "README.md".to_string(),
            placeholder_content: "# Contributions\n".to_string(),
            placeholder_message: "reset".to_string(),
            placeholder_author_name: "commit-canvas".to_string(),
            placeholder_author_email: "commit-canvas@localhost".to_string(),
            workspace_prefix: "commit-canvas-".to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&ConfigManager::engine_config_path()?)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: EngineConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        config
            .timeouts
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&ConfigManager::engine_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Print the configuration in a human-readable form
    pub fn show(&self) {
        println!("{}", "Current configuration:".bold());
        println!(
            "  Primary branch: {}",
            self.primary_branch
                .as_deref()
                .unwrap_or("(detected from remote)")
        );
        println!("  Host key policy: {}", self.host_key_policy);
        println!("  Day bucketing: {}", self.day_bucketing);
        println!("  Marker file: {}", self.marker_file);
        println!("  Commit message: {}", self.commit_message);
        println!("  Placeholder file: {}", self.placeholder_file);
        println!(
            "  Timeouts: clone {}s, push {}s, rewrite {}s, local {}s",
            self.timeouts.clone_secs,
            self.timeouts.push_secs,
            self.timeouts.rewrite_secs,
            self.timeouts.local_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths() {
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(config_dir.to_string_lossy().contains("commit-canvas"));

        let config_path = ConfigManager::engine_config_path().unwrap();
        assert!(config_path.to_string_lossy().ends_with("config.toml"));

        let log = ConfigManager::log_file_path().unwrap();
        assert!(log.to_string_lossy().contains("commit-canvas.log"));
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_xdg_config_home_respected() {
        let previous = std::env::var("XDG_CONFIG_HOME").ok();
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-xdg-config");
        let config_dir = ConfigManager::config_dir().unwrap();
        assert_eq!(config_dir, PathBuf::from("/tmp/test-xdg-config/commit-canvas"));
        match previous {
            Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::load_from(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "primary_branch = \"trunk\"\nhost_key_policy = \"strict\"\n\n[timeouts]\npush_secs = 5\n",
        )
        .unwrap();

        let config = EngineConfig::load_from(&path).unwrap();
        assert_eq!(config.primary_branch.as_deref(), Some("trunk"));
        assert_eq!(config.host_key_policy, HostKeyPolicy::Strict);
        assert_eq!(config.timeouts.push_secs, 5);
        assert_eq!(config.timeouts.clone_secs, 60);
        assert_eq!(config.marker_file, "contributions.txt");
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let config = EngineConfig {
            primary_branch: Some("main".to_string()),
            day_bucketing: DayBucketing::Author,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(EngineConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "host_key_policy = \"sometimes\"\n").unwrap();

        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.clone_limit(), Duration::from_secs(60));
        assert_eq!(timeouts.push_limit(), Duration::from_secs(120));
        assert_eq!(timeouts.rewrite_limit(), Duration::from_secs(300));
    }

    #[test]
    fn test_zero_timeout_in_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[timeouts]\nrewrite_secs = 0\n").unwrap();

        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(matches!(
            crate::error::classify(&err),
            Some(CanvasError::Validation(_))
        ));
        assert!(format!("{err:#}").contains("rewrite timeout must be at least 1 second"));
    }
}
