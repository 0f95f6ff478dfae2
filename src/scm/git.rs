//! Git backend driving the `git` executable.

use anyhow::{anyhow, bail, Context, Result};
use chrono::DateTime;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::command::{run_bounded, Captured};
use crate::config::Timeouts;
use crate::error::CanvasError;
use crate::model::{ExistingCommit, Identity};

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// Everything needed to recreate a commit on a different parent chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    pub parents: Vec<String>,
    pub tree: String,
    pub author_name: String,
    pub author_email: String,
    /// `<unix-seconds> <offset>` exactly as stored
    pub author_date: String,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: String,
    pub message: String,
}

/// A cloned or local repository operated on through the git CLI.
pub struct GitRepo {
    workdir: PathBuf,
    ssh_command: Option<String>,
    timeouts: Timeouts,
}

/// Check whether the git executable is available.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git_command(ssh_command: Option<&str>) -> Command {
    let mut command = Command::new("git");
    command.env("GIT_TERMINAL_PROMPT", "0");
    if let Some(ssh) = ssh_command {
        command.env("GIT_SSH_COMMAND", ssh);
    }
    command
}

impl GitRepo {
    /// Clone `url` into `dest`.
    ///
    /// Failures are transport errors carrying git's stderr.
    pub fn clone_from(
        url: &str,
        dest: &Path,
        ssh_command: Option<String>,
        timeouts: Timeouts,
    ) -> Result<Self> {
        let mut command = git_command(ssh_command.as_deref());
        command.arg("clone").arg("--quiet").arg("--").arg(url).arg(dest);

        let captured = run_bounded(command, None, timeouts.clone_limit(), "git clone")?;
        if !captured.status.success() {
            return Err(CanvasError::transport(format!(
                "git clone failed: {}",
                captured.stderr_text()
            ))
            .into());
        }

        Ok(GitRepo {
            workdir: dest.to_path_buf(),
            ssh_command,
            timeouts,
        })
    }

    /// Open an existing working tree.
    pub fn open(path: &Path, timeouts: Timeouts) -> Result<Self> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if !path.join(".git").exists() {
            bail!(
                "Not a git repository: '{}' (no .git directory)",
                path.display()
            );
        }

        Ok(GitRepo {
            workdir: path,
            ssh_command: None,
            timeouts,
        })
    }

    /// Initialize a new repository whose unborn branch is `branch`.
    pub fn init(path: &Path, branch: &str) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory '{}'", path.display()))?;

        let timeouts = Timeouts::default();
        let mut command = git_command(None);
        command.args(["init", "--quiet"]).current_dir(path);
        let captured = run_bounded(command, None, timeouts.local_limit(), "git init")?;
        if !captured.status.success() {
            bail!("git init failed: {}", captured.stderr_text());
        }

        let repo = Self::open(path, timeouts)?;
        let head = format!("refs/heads/{branch}");
        repo.run(&["symbolic-ref", "HEAD", &head])?;
        Ok(repo)
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command(&self) -> Command {
        let mut command = git_command(self.ssh_command.as_deref());
        command.current_dir(&self.workdir);
        command
    }

    fn exec(
        &self,
        args: &[&str],
        envs: &[(&str, &str)],
        input: Option<&[u8]>,
        limit: Duration,
    ) -> Result<Captured> {
        let mut command = self.command();
        command.args(args);
        for (key, value) in envs {
            command.env(key, value);
        }
        let label = format!("git {}", args.first().copied().unwrap_or_default());
        run_bounded(command, input, limit, &label)
    }

    fn run_with(
        &self,
        args: &[&str],
        envs: &[(&str, &str)],
        input: Option<&[u8]>,
        limit: Duration,
    ) -> Result<String> {
        let captured = self.exec(args, envs, input, limit)?;
        if !captured.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                captured.stderr_text()
            ));
        }
        Ok(captured.stdout_text())
    }

    /// Run a local git step and return trimmed stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        self.run_with(args, &[], None, self.timeouts.local_limit())
    }

    fn succeeds(&self, args: &[&str]) -> Result<Option<String>> {
        let captured = self.exec(args, &[], None, self.timeouts.local_limit())?;
        Ok(captured.status.success().then(|| captured.stdout_text()))
    }

    /// Set the repository-local author identity.
    pub fn set_identity(&self, identity: &Identity) -> Result<()> {
        self.run(&["config", "user.name", &identity.name])?;
        self.run(&["config", "user.email", &identity.email])?;
        Ok(())
    }

    pub fn stage_all(&self) -> Result<()> {
        self.run(&["add", "-A"])?;
        Ok(())
    }

    /// Commit the index as `identity`, optionally forcing both timestamps to `when`.
    pub fn commit_as(&self, message: &str, identity: &Identity, when: Option<&str>) -> Result<()> {
        let mut envs = vec![
            ("GIT_AUTHOR_NAME", identity.name.as_str()),
            ("GIT_AUTHOR_EMAIL", identity.email.as_str()),
            ("GIT_COMMITTER_NAME", identity.name.as_str()),
            ("GIT_COMMITTER_EMAIL", identity.email.as_str()),
        ];
        if let Some(when) = when {
            envs.push(("GIT_AUTHOR_DATE", when));
            envs.push(("GIT_COMMITTER_DATE", when));
        }

        self.run_with(
            &["commit", "--quiet", "--no-verify", "--no-gpg-sign", "-m", message],
            &envs,
            None,
            self.timeouts.local_limit(),
        )
        .context("Failed to create commit")?;
        Ok(())
    }

    pub fn has_commits(&self) -> Result<bool> {
        Ok(self
            .succeeds(&["rev-parse", "--verify", "--quiet", "HEAD^{commit}"])?
            .is_some())
    }

    pub fn head_id(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"])
    }

    /// Number of commits reachable from HEAD
    pub fn commit_count(&self) -> Result<u32> {
        let raw = self.run(&["rev-list", "--count", "HEAD"])?;
        raw.trim()
            .parse()
            .with_context(|| format!("Unexpected commit count output: '{raw}'"))
    }

    /// Identifier and authorship timestamp of every commit reachable from HEAD.
    pub fn authored_commits(&self) -> Result<Vec<ExistingCommit>> {
        let raw = self.run(&["log", "--format=%H %aI", "HEAD"])?;

        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let (id, iso) = line
                    .split_once(' ')
                    .ok_or_else(|| anyhow!("Unexpected log line: '{line}'"))?;
                let authored = DateTime::parse_from_rfc3339(iso.trim())
                    .with_context(|| format!("Unparseable author date '{iso}' on {id}"))?;
                Ok(ExistingCommit {
                    id: id.to_string(),
                    authored,
                })
            })
            .collect()
    }

    /// Full records of every commit reachable from HEAD, parents before children.
    pub fn commits_for_rewrite(&self, limit: Duration) -> Result<Vec<CommitRecord>> {
        let format = "--format=%H%x1f%P%x1f%T%x1f%an%x1f%ae%x1f%ad%x1f%cn%x1f%ce%x1f%cd%x1f%B%x1e";
        let captured = self.exec(
            &["log", "--topo-order", "--reverse", "--date=raw", format, "HEAD"],
            &[],
            None,
            limit,
        )?;
        if !captured.status.success() {
            bail!("git log failed: {}", captured.stderr_text());
        }

        parse_commit_records(&String::from_utf8_lossy(&captured.stdout))
    }

    /// Recreate `record` with new parents; returns the new commit id.
    pub fn commit_tree(&self, record: &CommitRecord, parents: &[String]) -> Result<String> {
        let mut args = vec!["commit-tree", "--no-gpg-sign"];
        for parent in parents {
            args.push("-p");
            args.push(parent);
        }
        args.extend(["-F", "-", record.tree.as_str()]);

        let envs = [
            ("GIT_AUTHOR_NAME", record.author_name.as_str()),
            ("GIT_AUTHOR_EMAIL", record.author_email.as_str()),
            ("GIT_AUTHOR_DATE", record.author_date.as_str()),
            ("GIT_COMMITTER_NAME", record.committer_name.as_str()),
            ("GIT_COMMITTER_EMAIL", record.committer_email.as_str()),
            ("GIT_COMMITTER_DATE", record.committer_date.as_str()),
        ];

        let id = self
            .run_with(
                &args,
                &envs,
                Some(record.message.as_bytes()),
                self.timeouts.local_limit(),
            )
            .with_context(|| format!("Failed to recreate commit {}", record.id))?;
        Ok(id.trim().to_string())
    }

    /// Move the current branch and working tree to `target`.
    pub fn reset_hard(&self, target: &str) -> Result<()> {
        self.run(&["reset", "--hard", "--quiet", target])?;
        Ok(())
    }

    /// Name of the checked-out branch; `None` when HEAD is detached.
    pub fn current_branch(&self) -> Result<Option<String>> {
        Ok(self
            .succeeds(&["symbolic-ref", "--short", "--quiet", "HEAD"])?
            .filter(|name| !name.is_empty()))
    }

    /// Branch the remote's HEAD points at, if the clone recorded one.
    pub fn remote_head_branch(&self) -> Result<Option<String>> {
        Ok(self
            .succeeds(&[
                "symbolic-ref",
                "--short",
                "--quiet",
                "refs/remotes/origin/HEAD",
            ])?
            .and_then(|name| name.strip_prefix("origin/").map(str::to_string))
            .filter(|name| !name.is_empty()))
    }

    /// Whether `name` is acceptable as a branch name.
    pub fn is_valid_branch_name(&self, name: &str) -> Result<bool> {
        Ok(self
            .succeeds(&["check-ref-format", "--branch", name])?
            .is_some())
    }

    /// Whether the clone saw `branch` on origin.
    pub fn remote_branch_exists(&self, branch: &str) -> Result<bool> {
        let remote_ref = format!("refs/remotes/origin/{branch}");
        Ok(self
            .succeeds(&["rev-parse", "--verify", "--quiet", &remote_ref])?
            .is_some())
    }

    /// Check out `branch` at the commit origin has for it.
    pub fn checkout_remote_branch(&self, branch: &str) -> Result<()> {
        let remote_ref = format!("refs/remotes/origin/{branch}");
        self.run(&["checkout", "--quiet", "-B", branch, &remote_ref])?;
        Ok(())
    }

    /// Point an unborn HEAD at `branch`.
    pub fn switch_unborn(&self, branch: &str) -> Result<()> {
        let head = format!("refs/heads/{branch}");
        self.run(&["symbolic-ref", "HEAD", &head])?;
        Ok(())
    }

    /// Switch to a new branch with no history, keeping the index.
    pub fn checkout_orphan(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", "--orphan", branch])?;
        Ok(())
    }

    /// Remove every tracked file from the index and working tree.
    pub fn remove_all_tracked(&self) -> Result<()> {
        self.run(&["rm", "-r", "-f", "--quiet", "--ignore-unmatch", "--", "."])?;
        Ok(())
    }

    /// Push `refspec` to origin; rejections and auth failures are transport errors.
    pub fn push(&self, refspec: &str, force: bool) -> Result<()> {
        let mut args = vec!["push", "--quiet"];
        if force {
            args.push("--force");
        }
        args.extend(["origin", refspec]);

        let captured = self.exec(&args, &[], None, self.timeouts.push_limit())?;
        if !captured.status.success() {
            return Err(CanvasError::transport(format!(
                "git push failed: {}",
                captured.stderr_text()
            ))
            .into());
        }
        Ok(())
    }
}

/// Parse the `%x1f`-separated, `%x1e`-terminated records of `commits_for_rewrite`.
pub(crate) fn parse_commit_records(raw: &str) -> Result<Vec<CommitRecord>> {
    raw.split(RECORD_SEP)
        .map(|chunk| chunk.trim_start_matches('\n'))
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| {
            let fields: Vec<&str> = chunk.splitn(10, FIELD_SEP).collect();
            if fields.len() != 10 {
                bail!("Malformed commit record: expected 10 fields, got {}", fields.len());
            }
            Ok(CommitRecord {
                id: fields[0].to_string(),
                parents: fields[1].split_whitespace().map(str::to_string).collect(),
                tree: fields[2].to_string(),
                author_name: fields[3].to_string(),
                author_email: fields[4].to_string(),
                author_date: fields[5].to_string(),
                committer_name: fields[6].to_string(),
                committer_email: fields[7].to_string(),
                committer_date: fields[8].to_string(),
                message: fields[9].to_string(),
            })
        })
        .collect()
}
