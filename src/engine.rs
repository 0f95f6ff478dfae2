//! The three canvas operations: generate, fetch and delete.
//!
//! Each operation validates its input, then runs strictly in sequence:
//! acquire a workspace, clone, inspect or mutate, optionally publish, release.
//! The workspace is released on every path. Nothing is shared between
//! operations, so independent operations may run concurrently.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::fmt;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::CanvasError;
use crate::model::{
    ContributionMap, DeleteOutcome, DeletionSet, FetchOutcome, GenerateOutcome, Identity,
};
use crate::rewrite::{self, RewriteKind};
use crate::scm::{ssh_command, GitRepo};
use crate::workspace::Workspace;
use crate::{publish, scan, synth};

/// Remote repository address and the secret that unlocks it.
#[derive(Clone)]
pub struct RemoteTarget {
    url: String,
    secret: String,
}

impl RemoteTarget {
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        RemoteTarget {
            url: url.into(),
            secret: secret.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(CanvasError::validation("repository address is required").into());
        }
        if self.secret.trim().is_empty() {
            return Err(CanvasError::validation("authentication secret is required").into());
        }
        Ok(())
    }
}

impl fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("url", &redact_url(&self.url))
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Hide credentials embedded in an http(s) address.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    if !scheme.starts_with("http") {
        return url.to_string();
    }
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    match authority.rsplit_once('@') {
        Some((_, host)) => format!("{scheme}://***@{host}/{path}"),
        None => url.to_string(),
    }
}

fn validate_author(author: &Identity) -> Result<()> {
    if author.name.trim().is_empty() {
        return Err(CanvasError::validation("author name is required").into());
    }
    if author.email.trim().is_empty() {
        return Err(CanvasError::validation("author email is required").into());
    }
    Ok(())
}

/// Run `work` against a fresh clone of `target` with the primary branch
/// checked out, releasing the workspace afterwards.
fn with_clone<T>(
    target: &RemoteTarget,
    config: &EngineConfig,
    operation: &str,
    work: impl FnOnce(&GitRepo, &str) -> Result<T>,
) -> Result<T> {
    let op_id = Uuid::new_v4().simple().to_string();
    let op_id = &op_id[..8];
    log::info!("[{op_id}] {operation}: cloning {}", redact_url(&target.url));

    let workspace = Workspace::acquire(&config.workspace_prefix, &target.secret)?;
    let result = (|| {
        let ssh = ssh_command(workspace.key_path(), config.host_key_policy);
        let repo = GitRepo::clone_from(
            &target.url,
            &workspace.clone_dir(),
            Some(ssh),
            config.timeouts.clone(),
        )?;
        let branch = publish::checkout_primary(&repo, config)?;
        work(&repo, &branch)
    })();

    if let Err(e) = workspace.release() {
        log::warn!("[{op_id}] Workspace cleanup failed: {e:#}");
    }
    match &result {
        Ok(_) => log::info!("[{op_id}] {operation}: done"),
        Err(e) => log::error!("[{op_id}] {operation} failed: {e:#}"),
    }
    result
}

/// Paint `contributions` into the remote history as `author`.
pub fn generate(
    target: &RemoteTarget,
    author: &Identity,
    contributions: &ContributionMap,
    config: &EngineConfig,
) -> Result<GenerateOutcome> {
    generate_with(
        target,
        author,
        contributions,
        config,
        Utc::now().date_naive(),
        &mut rand::thread_rng(),
    )
}

/// [`generate`] with an explicit "today" and random source.
pub fn generate_with<R: Rng + ?Sized>(
    target: &RemoteTarget,
    author: &Identity,
    contributions: &ContributionMap,
    config: &EngineConfig,
    today: NaiveDate,
    rng: &mut R,
) -> Result<GenerateOutcome> {
    target.validate()?;
    validate_author(author)?;
    if contributions.is_empty() {
        return Err(CanvasError::validation("no contributions to generate").into());
    }

    let plan = synth::plan_commits(contributions, today, rng);
    if plan.is_empty() {
        log::info!("No contributions on or before {today}; nothing to publish");
        return Ok(GenerateOutcome { total_commits: 0 });
    }
    log::info!(
        "Planned {} commits across {} days",
        plan.total(),
        plan.per_date.len()
    );

    with_clone(target, config, "generate", |repo, branch| {
        repo.set_identity(author)?;
        let total = synth::apply_plan(repo, &plan, author, config)?;
        publish::push(repo, branch)?;
        Ok(GenerateOutcome {
            total_commits: total,
        })
    })
}

/// Commit counts per day of the remote history.
pub fn fetch(target: &RemoteTarget, config: &EngineConfig) -> Result<FetchOutcome> {
    target.validate()?;

    with_clone(target, config, "fetch", |repo, _branch| {
        Ok(FetchOutcome {
            contributions: scan::scan_history(repo, config.day_bucketing)?,
        })
    })
}

/// Remove every commit authored on a date in `dates` and republish.
///
/// An empty set is a no-op and never touches the remote.
pub fn delete(
    target: &RemoteTarget,
    dates: &DeletionSet,
    config: &EngineConfig,
) -> Result<DeleteOutcome> {
    target.validate()?;
    if dates.is_empty() {
        log::info!("No dates selected; nothing to delete");
        return Ok(DeleteOutcome { deleted_commits: 0 });
    }

    with_clone(target, config, "delete", |repo, branch| {
        delete_in(repo, branch, dates, config)
    })
}

/// Remove every commit on every date present in the remote history.
pub fn delete_all(target: &RemoteTarget, config: &EngineConfig) -> Result<DeleteOutcome> {
    target.validate()?;

    with_clone(target, config, "delete-all", |repo, branch| {
        let dates: DeletionSet = scan::scan_history(repo, config.day_bucketing)?
            .into_keys()
            .collect();
        if dates.is_empty() {
            return Ok(DeleteOutcome { deleted_commits: 0 });
        }
        delete_in(repo, branch, &dates, config)
    })
}

fn delete_in(
    repo: &GitRepo,
    branch: &str,
    dates: &DeletionSet,
    config: &EngineConfig,
) -> Result<DeleteOutcome> {
    let outcome = rewrite::rewrite_excluding(
        repo,
        dates,
        config.day_bucketing,
        config.timeouts.rewrite_limit(),
    )?;

    match outcome.kind {
        RewriteKind::Unchanged => {}
        RewriteKind::Rebuilt => publish::force_push(repo, branch)?,
        RewriteKind::Emptied => publish::reset_remote(repo, branch, config)?,
    }

    Ok(DeleteOutcome {
        deleted_commits: outcome.deleted(),
    })
}
