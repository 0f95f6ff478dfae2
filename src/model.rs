//! Input and output data of the three canvas operations.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

use crate::error::CanvasError;

/// Canonical calendar date format used for every map key
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a canonical `YYYY-MM-DD` date, rejecting unpadded or partial forms.
pub fn parse_canonical_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let parsed = NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok();
    match parsed {
        Some(date) if date.format(DATE_FORMAT).to_string() == trimmed => Ok(date),
        _ => Err(CanvasError::validation(format!(
            "'{raw}' is not a canonical YYYY-MM-DD date"
        ))
        .into()),
    }
}

/// Intensity a date should be painted with.
///
/// Levels 1 through 4 map to a commit count range; anything else paints nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub u8);

impl Level {
    /// Closed range of commits a date at this level receives
    pub fn commit_range(self) -> Option<RangeInclusive<u32>> {
        match self.0 {
            1 => Some(1..=2),
            2 => Some(3..=4),
            3 => Some(5..=6),
            4 => Some(7..=10),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        self.commit_range().is_some()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display level for an observed commit count (inverse of [`Level::commit_range`]).
pub fn level_for_count(count: u32) -> Level {
    match count {
        0 => Level(0),
        1..=2 => Level(1),
        3..=4 => Level(2),
        5..=6 => Level(3),
        _ => Level(4),
    }
}

/// Date to intensity mapping, always iterated in ascending date order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContributionMap(BTreeMap<NaiveDate, Level>);

impl ContributionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{ "YYYY-MM-DD": level }`.
    ///
    /// Level 0 entries are dropped. Levels that do not fit a byte are kept as
    /// an inactive level so they paint nothing.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, i64> = serde_json::from_str(json)
            .map_err(|e| CanvasError::validation(format!("contributions are not valid JSON: {e}")))
            .context("Failed to read contribution map")?;

        let mut map = ContributionMap::new();
        for (key, value) in raw {
            let date = parse_canonical_date(&key)?;
            if value == 0 {
                continue;
            }
            let level = u8::try_from(value).map(Level).unwrap_or(Level(u8::MAX));
            if !level.is_active() {
                log::warn!("Level {value} for {date} is outside 1-4; it will paint nothing");
            }
            map.insert(date, level);
        }

        Ok(map)
    }

    pub fn insert(&mut self, date: NaiveDate, level: Level) -> Option<Level> {
        self.0.insert(date, level)
    }

    pub fn get(&self, date: &NaiveDate) -> Option<Level> {
        self.0.get(date).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Level)> + '_ {
        self.0.iter().map(|(date, level)| (*date, *level))
    }
}

impl FromIterator<(NaiveDate, Level)> for ContributionMap {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Level)>>(iter: I) -> Self {
        ContributionMap(iter.into_iter().collect())
    }
}

/// Dates whose commits should be removed
pub type DeletionSet = BTreeSet<NaiveDate>;

/// Parse a list of canonical date strings into a deletion set.
pub fn parse_deletion_set<S: AsRef<str>>(raw: &[S]) -> Result<DeletionSet> {
    raw.iter()
        .map(|date| parse_canonical_date(date.as_ref()))
        .collect()
}

/// Observed commits per calendar day
pub type ContributionCounts = BTreeMap<NaiveDate, u32>;

/// How a commit's authorship timestamp is turned into a calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DayBucketing {
    /// The UTC calendar day
    #[default]
    Utc,
    /// The calendar day in the author's own recorded offset
    Author,
}

impl DayBucketing {
    pub fn day_of(self, authored: &DateTime<FixedOffset>) -> NaiveDate {
        match self {
            DayBucketing::Utc => authored.with_timezone(&Utc).date_naive(),
            DayBucketing::Author => authored.date_naive(),
        }
    }
}

impl fmt::Display for DayBucketing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayBucketing::Utc => write!(f, "utc"),
            DayBucketing::Author => write!(f, "author"),
        }
    }
}

/// A commit already present in the history being inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingCommit {
    pub id: String,
    pub authored: DateTime<FixedOffset>,
}

/// Name and email a commit is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Identity {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Result of `generate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutcome {
    pub total_commits: u32,
}

/// Result of `fetch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub contributions: ContributionCounts,
}

impl FetchOutcome {
    /// Counts folded back into display levels
    pub fn levels(&self) -> BTreeMap<NaiveDate, Level> {
        self.contributions
            .iter()
            .map(|(date, count)| (*date, level_for_count(*count)))
            .collect()
    }
}

/// Result of `delete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted_commits: u32,
}
