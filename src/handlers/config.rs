//! Configuration command handlers

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::{ConfigManager, EngineConfig};
use crate::error::CanvasError;
use crate::model::DayBucketing;
use crate::scm::HostKeyPolicy;

/// Settings changed through `config --set-*` flags. `None` leaves a value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigChanges {
    pub primary_branch: Option<String>,
    pub host_key_policy: Option<HostKeyPolicy>,
    pub day_bucketing: Option<DayBucketing>,
    pub marker_file: Option<String>,
    pub commit_message: Option<String>,
    pub clone_timeout: Option<u64>,
    pub push_timeout: Option<u64>,
    pub rewrite_timeout: Option<u64>,
}

impl ConfigChanges {
    pub fn is_empty(&self) -> bool {
        self.primary_branch.is_none()
            && self.host_key_policy.is_none()
            && self.day_bucketing.is_none()
            && self.marker_file.is_none()
            && self.commit_message.is_none()
            && self.clone_timeout.is_none()
            && self.push_timeout.is_none()
            && self.rewrite_timeout.is_none()
    }

    /// Apply to `config`, returning one description per change.
    ///
    /// A zero timeout is rejected before anything is changed.
    pub fn apply(self, config: &mut EngineConfig) -> Result<Vec<String>> {
        for (name, secs) in [
            ("clone", self.clone_timeout),
            ("push", self.push_timeout),
            ("rewrite", self.rewrite_timeout),
        ] {
            if secs == Some(0) {
                return Err(CanvasError::validation(format!(
                    "{name} timeout must be at least 1 second"
                ))
                .into());
            }
        }

        let mut applied = Vec::new();

        if let Some(branch) = self.primary_branch {
            // An empty value goes back to detection.
            if branch.trim().is_empty() {
                config.primary_branch = None;
                applied.push("primary_branch unset".to_string());
            } else {
                applied.push(format!("primary_branch = {branch}"));
                config.primary_branch = Some(branch);
            }
        }
        if let Some(policy) = self.host_key_policy {
            config.host_key_policy = policy;
            applied.push(format!("host_key_policy = {policy}"));
        }
        if let Some(bucketing) = self.day_bucketing {
            config.day_bucketing = bucketing;
            applied.push(format!("day_bucketing = {bucketing}"));
        }
        if let Some(file) = self.marker_file {
            applied.push(format!("marker_file = {file}"));
            config.marker_file = file;
        }
        if let Some(message) = self.commit_message {
            applied.push(format!("commit_message = {message}"));
            config.commit_message = message;
        }
        if let Some(secs) = self.clone_timeout {
            config.timeouts.clone_secs = secs;
            applied.push(format!("clone timeout = {secs}s"));
        }
        if let Some(secs) = self.push_timeout {
            config.timeouts.push_secs = secs;
            applied.push(format!("push timeout = {secs}s"));
        }
        if let Some(secs) = self.rewrite_timeout {
            config.timeouts.rewrite_secs = secs;
            applied.push(format!("rewrite timeout = {secs}s"));
        }

        Ok(applied)
    }
}

/// Handle `config --show`
pub fn handle_config_show(config: &EngineConfig) -> Result<()> {
    config.show();
    println!();
    println!(
        "  Config file: {}",
        ConfigManager::engine_config_path()?.display().to_string().dimmed()
    );
    Ok(())
}

/// Handle `config --set-*`
pub fn handle_config_set(changes: ConfigChanges) -> Result<()> {
    set_in(&ConfigManager::engine_config_path()?, changes)
}

fn set_in(path: &Path, changes: ConfigChanges) -> Result<()> {
    if changes.is_empty() {
        println!("{}", "No settings given. Configuration unchanged.".yellow());
        return Ok(());
    }

    let mut config = EngineConfig::load_from(path).context("Failed to load current configuration")?;
    let applied = changes.apply(&mut config)?;
    config.save_to(path).context("Failed to save configuration")?;

    for line in applied {
        println!("  {} {}", "✓".green(), line);
    }
    println!("\n{} Configuration saved", "✓".green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_persists_changes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        set_in(
            &path,
            ConfigChanges {
                primary_branch: Some("trunk".to_string()),
                host_key_policy: Some(HostKeyPolicy::Strict),
                rewrite_timeout: Some(900),
                ..Default::default()
            },
        )
        .unwrap();

        let saved = EngineConfig::load_from(&path).unwrap();
        assert_eq!(saved.primary_branch.as_deref(), Some("trunk"));
        assert_eq!(saved.host_key_policy, HostKeyPolicy::Strict);
        assert_eq!(saved.timeouts.rewrite_secs, 900);
        assert_eq!(saved.marker_file, EngineConfig::default().marker_file);
    }

    #[test]
    fn test_empty_branch_returns_to_detection() {
        let mut config = EngineConfig {
            primary_branch: Some("trunk".to_string()),
            ..Default::default()
        };
        let applied = ConfigChanges {
            primary_branch: Some(String::new()),
            ..Default::default()
        }
        .apply(&mut config)
        .unwrap();

        assert_eq!(config.primary_branch, None);
        assert_eq!(applied, vec!["primary_branch unset".to_string()]);
    }

    #[test]
    fn test_no_changes_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        set_in(&path, ConfigChanges::default()).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = EngineConfig::default();
        let err = ConfigChanges {
            primary_branch: Some("trunk".to_string()),
            push_timeout: Some(0),
            ..Default::default()
        }
        .apply(&mut config)
        .unwrap_err();

        assert!(matches!(
            crate::error::classify(&err),
            Some(CanvasError::Validation(_))
        ));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_zero_timeout_is_not_saved() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let err = set_in(
            &path,
            ConfigChanges {
                clone_timeout: Some(0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("clone timeout must be at least 1 second"));
        assert!(!path.exists());
    }
}
