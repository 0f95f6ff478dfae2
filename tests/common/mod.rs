//! Shared fixtures: a local bare repository standing in for the remote.

#![allow(dead_code)]

use chrono::{DateTime, FixedOffset};
use commit_canvas::config::{EngineConfig, Timeouts};
use commit_canvas::engine::RemoteTarget;
use commit_canvas::model::Identity;
use commit_canvas::scm::GitRepo;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct Remote {
    _temp: TempDir,
    pub bare: PathBuf,
}

impl Remote {
    /// Empty bare repository whose HEAD names `main`.
    pub fn new() -> Self {
        Self::with_head("main")
    }

    /// Empty bare repository whose HEAD names `branch`.
    pub fn with_head(branch: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let bare = temp.path().join("canvas.git");
        git(&["init", "--bare", "--quiet", bare.to_str().unwrap()], temp.path());
        git(&["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")], &bare);
        Remote { _temp: temp, bare }
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.bare.display())
    }

    /// Any non-empty secret works; file:// never consults SSH.
    pub fn target(&self) -> RemoteTarget {
        RemoteTarget::new(self.url(), "unused-key")
    }

    /// Push one commit per `(message, timestamp)` onto `main`.
    pub fn seed(&self, commits: &[(&str, &str)]) {
        self.seed_on("main", commits);
    }

    /// Push commits onto `branch`, starting from its current tip if it exists.
    pub fn seed_on(&self, branch: &str, commits: &[(&str, &str)]) {
        let scratch = TempDir::new().unwrap();
        let dest = scratch.path().join("seed");
        let repo = GitRepo::clone_from(&self.url(), &dest, None, Timeouts::default()).unwrap();
        let who = Identity::new("Seeder", "seeder@example.com");
        repo.set_identity(&who).unwrap();
        if repo.remote_branch_exists(branch).unwrap() {
            repo.checkout_remote_branch(branch).unwrap();
        } else if repo.has_commits().unwrap() {
            // A fresh branch on a non-empty remote gets unrelated history.
            repo.checkout_orphan(branch).unwrap();
            repo.remove_all_tracked().unwrap();
        } else {
            repo.switch_unborn(branch).unwrap();
        }

        for (message, stamp) in commits {
            fs::write(dest.join(format!("{message}.txt")), message).unwrap();
            repo.stage_all().unwrap();
            repo.commit_as(message, &who, Some(stamp)).unwrap();
        }
        repo.push(&format!("HEAD:refs/heads/{branch}"), false).unwrap();
    }

    /// Commit id at the tip of `main`, `None` while the branch is unborn.
    pub fn tip(&self) -> Option<String> {
        self.tip_of("main")
    }

    pub fn tip_of(&self, branch: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(&self.bare)
            .output()
            .unwrap();
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// `(subject, author date)` of every commit on `main`, oldest first.
    pub fn log(&self) -> Vec<(String, DateTime<FixedOffset>)> {
        self.log_of("main")
    }

    pub fn log_of(&self, branch: &str) -> Vec<(String, DateTime<FixedOffset>)> {
        if self.tip_of(branch).is_none() {
            return Vec::new();
        }
        let reference = format!("refs/heads/{branch}");
        let output = Command::new("git")
            .args(["log", "--reverse", "--format=%s%x1f%aI", &reference])
            .current_dir(&self.bare)
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| {
                let (subject, date) = line.split_once('\u{1f}').unwrap();
                (
                    subject.to_string(),
                    DateTime::parse_from_rfc3339(date).unwrap(),
                )
            })
            .collect()
    }

    /// Content of `path` at the tip of `main`.
    pub fn show(&self, path: &str) -> String {
        let output = Command::new("git")
            .args(["show", &format!("refs/heads/main:{path}")])
            .current_dir(&self.bare)
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn branches(&self) -> Vec<String> {
        let output = Command::new("git")
            .args(["for-each-ref", "--format=%(refname:short)", "refs/heads"])
            .current_dir(&self.bare)
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Config pinned to `main` with a workspace prefix unique to the test.
pub fn config(prefix: &str) -> EngineConfig {
    EngineConfig {
        primary_branch: Some("main".to_string()),
        workspace_prefix: format!("{prefix}-{}-", uuid::Uuid::new_v4().simple()),
        ..Default::default()
    }
}

/// Workspaces left behind in the temp dir for `config`.
pub fn leftover_workspaces(config: &EngineConfig) -> Vec<PathBuf> {
    fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(&config.workspace_prefix)
        })
        .map(|entry| entry.path())
        .collect()
}

/// Whether cloning an empty repository adopts the remote's unborn HEAD (git 2.31+).
pub fn clone_keeps_unborn_head() -> bool {
    let Ok(output) = Command::new("git").arg("--version").output() else {
        return false;
    };
    let text = String::from_utf8_lossy(&output.stdout);
    let mut parts = text
        .split_whitespace()
        .nth(2)
        .unwrap_or("")
        .split('.')
        .map(|part| part.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    (major, minor) >= (2, 31)
}

fn git(args: &[&str], dir: &Path) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}
