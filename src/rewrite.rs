//! Selective history rewrite.
//!
//! Commits authored on any date of a deletion set are dropped; every other
//! commit is recreated with its original tree, identities, timestamps and
//! message on a parent chain that skips the dropped ones. Commits whose parent
//! chain is unaffected keep their ids.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::error::CanvasError;
use crate::model::{DayBucketing, DeletionSet, ExistingCommit};
use crate::scm::{CommitRecord, GitRepo};

/// What a rewrite did to the local history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteKind {
    /// Nothing matched; history untouched
    Unchanged,
    /// Some commits dropped, the rest rebuilt
    Rebuilt,
    /// Every commit matched; the caller must reset the remote
    Emptied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub kind: RewriteKind,
    pub before: u32,
    pub after: u32,
}

impl RewriteOutcome {
    pub fn deleted(&self) -> u32 {
        self.before.saturating_sub(self.after)
    }
}

/// Ids of commits whose authorship day is in `dates`.
pub fn select_targets(
    commits: &[ExistingCommit],
    dates: &DeletionSet,
    bucketing: DayBucketing,
) -> HashSet<String> {
    commits
        .iter()
        .filter(|commit| dates.contains(&bucketing.day_of(&commit.authored)))
        .map(|commit| commit.id.clone())
        .collect()
}

/// Rebuild `records` (parents before children) without `targets`.
///
/// `create` recreates one retained commit on the given parents and returns its
/// new id. Returns the new id of `head`, or `None` when nothing survives.
pub fn rebuild_without<F>(
    records: &[CommitRecord],
    targets: &HashSet<String>,
    head: &str,
    mut create: F,
) -> Result<Option<String>>
where
    F: FnMut(&CommitRecord, &[String]) -> Result<String>,
{
    // Old id -> ids standing in for it in the new history.
    let mut mapped: HashMap<&str, Vec<String>> = HashMap::with_capacity(records.len());

    for record in records {
        let mut parents: Vec<String> = Vec::with_capacity(record.parents.len());
        for parent in &record.parents {
            let replacements = match mapped.get(parent.as_str()) {
                Some(ids) => ids.clone(),
                None => vec![parent.clone()],
            };
            for id in replacements {
                if !parents.contains(&id) {
                    parents.push(id);
                }
            }
        }

        let stand_in = if targets.contains(&record.id) {
            parents
        } else if parents == record.parents {
            vec![record.id.clone()]
        } else {
            vec![create(record, &parents)?]
        };
        mapped.insert(record.id.as_str(), stand_in);
    }

    let tip = mapped.get(head).and_then(|ids| ids.first().cloned());
    if let Some(ids) = mapped.get(head) {
        if ids.len() > 1 {
            log::warn!(
                "Dropped tip merged {} lines of history; keeping the first",
                ids.len()
            );
        }
    }
    Ok(tip)
}

/// Time left of `limit` since `started`; a transport error once it is used up.
fn remaining(started: Instant, limit: Duration) -> Result<Duration> {
    let elapsed = started.elapsed();
    if elapsed >= limit {
        return Err(CanvasError::transport(format!(
            "history rewrite timed out after {}s",
            limit.as_secs()
        ))
        .into());
    }
    Ok(limit - elapsed)
}

/// Drop every commit authored on a date in `dates` from the checked-out branch.
///
/// `limit` bounds the whole rewrite, from reading the history to the last
/// recreated commit.
///
/// When every commit matches, the local history is left as is and the outcome
/// is [`RewriteKind::Emptied`]; the caller publishes a fresh root instead.
pub fn rewrite_excluding(
    repo: &GitRepo,
    dates: &DeletionSet,
    bucketing: DayBucketing,
    limit: Duration,
) -> Result<RewriteOutcome> {
    let started = Instant::now();
    if !repo.has_commits()? {
        log::info!("History is empty; nothing to delete");
        return Ok(RewriteOutcome {
            kind: RewriteKind::Unchanged,
            before: 0,
            after: 0,
        });
    }

    let before = repo.commit_count()?;
    let commits = repo.authored_commits()?;
    let targets = select_targets(&commits, dates, bucketing);
    log::info!(
        "{} of {} commits fall on the {} selected dates",
        targets.len(),
        before,
        dates.len()
    );

    if targets.is_empty() {
        return Ok(RewriteOutcome {
            kind: RewriteKind::Unchanged,
            before,
            after: before,
        });
    }

    if targets.len() as u32 >= before {
        return Ok(RewriteOutcome {
            kind: RewriteKind::Emptied,
            before,
            after: 0,
        });
    }

    let records = repo.commits_for_rewrite(remaining(started, limit)?)?;
    let head = repo.head_id()?;

    let tip = rebuild_without(&records, &targets, &head, |record, parents| {
        remaining(started, limit)?;
        repo.commit_tree(record, parents)
    })?;

    let Some(tip) = tip else {
        return Err(CanvasError::verification("no commit survived the rebuild").into());
    };
    repo.reset_hard(&tip)?;

    let after = repo.commit_count().map_err(|e| {
        CanvasError::verification(format!("commit count after rewrite unavailable: {e:#}"))
    })?;
    if after > before {
        return Err(CanvasError::verification(format!(
            "history grew from {before} to {after} commits"
        ))
        .into());
    }
    if (before - after) as usize != targets.len() {
        log::warn!(
            "Expected to drop {} commits but history shrank by {}",
            targets.len(),
            before - after
        );
    }

    log::info!("Rewrote history: {before} -> {after} commits");
    Ok(RewriteOutcome {
        kind: RewriteKind::Rebuilt,
        before,
        after,
    })
}
