//! Delete command handler
//!
//! Asks for confirmation when running interactively, since the remote branch
//! is force-pushed and the removed commits cannot be recovered from it.

use anyhow::{Context, Result};
use colored::Colorize;
use inquire::Confirm;

use crate::config::EngineConfig;
use crate::engine::{self, RemoteTarget};
use crate::error::CanvasError;
use crate::logger;
use crate::model::{parse_deletion_set, DeletionSet};

use super::is_interactive;

/// Which dates a delete run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Dates(DeletionSet),
    All,
}

impl Selection {
    /// Build a selection from the raw `--date` values and the `--all` flag.
    pub fn from_args(dates: &[String], all: bool) -> Result<Self> {
        match (all, dates.is_empty()) {
            (true, true) => Ok(Selection::All),
            (true, false) => {
                Err(CanvasError::validation("--all cannot be combined with --date").into())
            }
            (false, true) => {
                Err(CanvasError::validation("select at least one --date, or pass --all").into())
            }
            (false, false) => Ok(Selection::Dates(parse_deletion_set(dates)?)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Selection::All => "every date in the history".to_string(),
            Selection::Dates(dates) => dates
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Handle delete command
pub fn handle_delete(
    target: &RemoteTarget,
    selection: &Selection,
    config: &EngineConfig,
    assume_yes: bool,
    json: bool,
) -> Result<()> {
    if !assume_yes && is_interactive() {
        println!(
            "{} {}",
            "Deleting commits on:".yellow().bold(),
            selection.describe()
        );
        let confirm = Confirm::new("Rewrite and force-push the remote history?")
            .with_default(false)
            .with_help_message("Removed commits cannot be restored from the remote")
            .prompt()
            .context("Failed to get confirmation")?;

        if !confirm {
            println!("\n{}", "Delete cancelled.".yellow());
            return Ok(());
        }
    }

    let outcome = match selection {
        Selection::All => engine::delete_all(target, config),
        Selection::Dates(dates) => engine::delete(target, dates, config),
    }
    .context("Delete failed")?;

    logger::log_to_file(&format!(
        "delete {} ({}): {} commits",
        engine::redact_url(target.url()),
        selection.describe(),
        outcome.deleted_commits
    ))
    .ok();

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.deleted_commits == 0 {
        println!("{}", "No commits matched; the remote is unchanged".dimmed());
    } else {
        println!(
            "{} Deleted {} commits",
            "✓".green(),
            outcome.deleted_commits.to_string().bold()
        );
    }

    Ok(())
}
