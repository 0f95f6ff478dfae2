//! Turning a contribution map into backdated commits.
//!
//! Planning is pure: it draws per-date commit counts and times of day from a
//! caller-supplied RNG. Applying a plan appends one marker line per commit so
//! every commit changes content, then commits with both timestamps forced.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;

use crate::config::EngineConfig;
use crate::model::{ContributionMap, Identity};
use crate::scm::GitRepo;

/// First second of the working-hours window
pub const WINDOW_START_SECS: u32 = 9 * 3600;
/// Last second of the working-hours window (22:59:59)
pub const WINDOW_END_SECS: u32 = 23 * 3600 - 1;

/// One commit to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticCommit {
    pub when: NaiveDateTime,
    /// Global running number, starting at 1
    pub sequence: u32,
}

impl SyntheticCommit {
    pub fn marker_line(&self) -> String {
        format!(
            "{} contribution #{}",
            self.when.format("%Y-%m-%dT%H:%M:%S"),
            self.sequence
        )
    }

    /// Timestamp handed to git, pinned to UTC.
    pub fn git_timestamp(&self) -> String {
        format!("{}+00:00", self.when.format("%Y-%m-%dT%H:%M:%S"))
    }
}

/// Ordered commits for a contribution map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPlan {
    pub commits: Vec<SyntheticCommit>,
    pub per_date: BTreeMap<NaiveDate, u32>,
}

impl CommitPlan {
    pub fn total(&self) -> u32 {
        self.commits.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

/// Draw a time of day uniformly within [09:00:00, 22:59:59].
pub fn draw_time_of_day<R: Rng + ?Sized>(rng: &mut R) -> NaiveTime {
    let secs = rng.gen_range(WINDOW_START_SECS..=WINDOW_END_SECS);
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN)
}

/// Draw commits for every date up to and including `today`, ascending.
pub fn plan_commits<R: Rng + ?Sized>(
    contributions: &ContributionMap,
    today: NaiveDate,
    rng: &mut R,
) -> CommitPlan {
    let mut plan = CommitPlan::default();
    let mut sequence = 0;

    for (date, level) in contributions.iter().filter(|(date, _)| *date <= today) {
        let Some(range) = level.commit_range() else {
            continue;
        };
        let count = rng.gen_range(range);
        for _ in 0..count {
            sequence += 1;
            plan.commits.push(SyntheticCommit {
                when: date.and_time(draw_time_of_day(rng)),
                sequence,
            });
        }
        plan.per_date.insert(date, count);
    }

    plan
}

/// Write `plan` into the repository as commits by `author`. Returns the number created.
pub fn apply_plan(
    repo: &GitRepo,
    plan: &CommitPlan,
    author: &Identity,
    config: &EngineConfig,
) -> Result<u32> {
    let marker = repo.workdir().join(&config.marker_file);

    for commit in &plan.commits {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&marker)
            .with_context(|| format!("Failed to open marker file {}", marker.display()))?;
        writeln!(file, "{}", commit.marker_line()).context("Failed to append to marker file")?;
        drop(file);

        repo.stage_all()?;
        repo.commit_as(&config.commit_message, author, Some(&commit.git_timestamp()))
            .with_context(|| format!("Failed to create commit #{}", commit.sequence))?;

        log::trace!("Created commit #{} at {}", commit.sequence, commit.when);
    }

    Ok(plan.total())
}
