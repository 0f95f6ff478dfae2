//! Command handler modules
//!
//! One module per CLI subcommand, plus the input helpers they share.

pub mod config;
pub mod delete;
pub mod fetch;
pub mod generate;

pub use config::{handle_config_set, handle_config_show, ConfigChanges};
pub use delete::{handle_delete, Selection};
pub use fetch::handle_fetch;
pub use generate::handle_generate;

use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::CanvasError;
use crate::model::ContributionMap;

/// Environment variable holding the private key when no key file is given
pub const SECRET_ENV: &str = "COMMIT_CANVAS_SSH_KEY";

/// Whether prompts can be shown
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)
}

/// Resolve the SSH private key: the key file when given, else the environment.
pub fn load_secret(key_file: Option<&Path>) -> Result<String> {
    if let Some(path) = key_file {
        let secret = fs::read_to_string(path)
            .with_context(|| format!("Failed to read SSH key file: {}", path.display()))?;
        if secret.trim().is_empty() {
            return Err(
                CanvasError::validation(format!("SSH key file {} is empty", path.display())).into(),
            );
        }
        return Ok(secret);
    }

    match std::env::var(SECRET_ENV) {
        Ok(secret) if !secret.trim().is_empty() => Ok(secret),
        _ => Err(CanvasError::validation(format!(
            "no SSH key given: pass --ssh-key <path> or set {SECRET_ENV}"
        ))
        .into()),
    }
}

/// Read a contribution map from a JSON file, or from stdin when `source` is `-`.
pub fn read_contributions(source: &Path) -> Result<ContributionMap> {
    let raw = if source == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read contributions from stdin")?;
        buffer
    } else {
        fs::read_to_string(source)
            .with_context(|| format!("Failed to read contributions: {}", source.display()))?
    };

    ContributionMap::from_json_str(&raw)
}
