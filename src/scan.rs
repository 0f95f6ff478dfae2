//! Commit counts per calendar day of an existing history.

use anyhow::Result;

use crate::model::{ContributionCounts, DayBucketing, ExistingCommit};
use crate::scm::GitRepo;

/// Bucket commits by the calendar day of their authorship timestamp.
pub fn count_by_day<'a, I>(commits: I, bucketing: DayBucketing) -> ContributionCounts
where
    I: IntoIterator<Item = &'a ExistingCommit>,
{
    let mut counts = ContributionCounts::new();
    for commit in commits {
        *counts.entry(bucketing.day_of(&commit.authored)).or_insert(0) += 1;
    }
    counts
}

/// Scan the current line of history. A repository without commits yields an empty map.
pub fn scan_history(repo: &GitRepo, bucketing: DayBucketing) -> Result<ContributionCounts> {
    if !repo.has_commits()? {
        log::info!("History is empty");
        return Ok(ContributionCounts::new());
    }

    let commits = repo.authored_commits()?;
    let counts = count_by_day(&commits, bucketing);
    log::info!(
        "Scanned {} commits across {} days",
        commits.len(),
        counts.len()
    );
    Ok(counts)
}
