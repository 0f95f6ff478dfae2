//! Publishing local history to the remote.
//!
//! Known limitation: a rewrite that succeeds locally but fails to publish
//! leaves the new history only in the workspace, which is discarded with it.
//! The remote keeps its previous history. Nothing here retries; the caller
//! re-runs the whole operation from a fresh clone.

use anyhow::{anyhow, Context, Result};
use std::fs;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::CanvasError;
use crate::model::Identity;
use crate::scm::GitRepo;

/// Branch to publish to: configured, else the remote's HEAD, else the checked-out branch.
pub fn primary_branch(repo: &GitRepo, config: &EngineConfig) -> Result<String> {
    if let Some(branch) = config
        .primary_branch
        .as_deref()
        .filter(|b| !b.trim().is_empty())
    {
        return Ok(branch.trim().to_string());
    }
    if let Some(branch) = repo.remote_head_branch()? {
        log::debug!("Primary branch from origin/HEAD: {branch}");
        return Ok(branch);
    }
    repo.current_branch()?
        .ok_or_else(|| anyhow!("Cannot determine the primary branch: HEAD is detached and origin/HEAD is unset"))
}

/// Resolve the primary branch and make it the checked-out branch of the clone.
///
/// Everything after this reads, rewrites and publishes that one branch. A
/// configured branch missing from a non-empty remote is rejected rather than
/// created.
pub fn checkout_primary(repo: &GitRepo, config: &EngineConfig) -> Result<String> {
    let branch = primary_branch(repo, config)?;
    if !repo.is_valid_branch_name(&branch)? {
        return Err(CanvasError::validation(format!("'{branch}' is not a valid branch name")).into());
    }
    if repo.current_branch()?.as_deref() == Some(branch.as_str()) {
        return Ok(branch);
    }

    if repo.remote_branch_exists(&branch)? {
        repo.checkout_remote_branch(&branch)?;
    } else if !repo.has_commits()? {
        repo.switch_unborn(&branch)?;
    } else {
        return Err(CanvasError::validation(format!(
            "branch '{branch}' does not exist on the remote"
        ))
        .into());
    }
    log::info!("Working on branch {branch}");
    Ok(branch)
}

fn refspec(branch: &str) -> String {
    format!("HEAD:refs/heads/{branch}")
}

/// Fast-forward publish of HEAD onto `branch`.
pub fn push(repo: &GitRepo, branch: &str) -> Result<()> {
    log::info!("Pushing to origin/{branch}");
    repo.push(&refspec(branch), false)
}

/// Forced publish of a rewritten HEAD onto `branch`.
pub fn force_push(repo: &GitRepo, branch: &str) -> Result<()> {
    log::info!("Force-pushing rewritten history to origin/{branch}");
    repo.push(&refspec(branch), true).inspect_err(|_| {
        log::warn!("Publish failed; the rewritten history is discarded and the remote is unchanged");
    })
}

/// Replace the remote `branch` with a single placeholder commit.
pub fn reset_remote(repo: &GitRepo, branch: &str, config: &EngineConfig) -> Result<()> {
    let scratch = format!("canvas-reset-{}", &Uuid::new_v4().simple().to_string()[..8]);
    log::info!("Replacing origin/{branch} with a single placeholder commit");

    repo.checkout_orphan(&scratch)?;
    repo.remove_all_tracked()?;

    let placeholder = repo.workdir().join(&config.placeholder_file);
    fs::write(&placeholder, &config.placeholder_content).with_context(|| {
        format!("Failed to write placeholder {}", placeholder.display())
    })?;
    repo.stage_all()?;

    let identity = Identity::new(
        config.placeholder_author_name.clone(),
        config.placeholder_author_email.clone(),
    );
    repo.commit_as(&config.placeholder_message, &identity, None)?;

    repo.push(&format!("refs/heads/{scratch}:refs/heads/{branch}"), true)
        .inspect_err(|_| {
            log::warn!("Reset publish failed; the remote is unchanged");
        })
}
