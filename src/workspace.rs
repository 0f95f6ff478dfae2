//! Ephemeral per-operation workspace.
//!
//! A workspace is a uniquely named temporary directory holding the credential
//! file and, next to it, the clone. It is removed when the workspace is
//! released or dropped, so every exit path of an operation cleans up, including
//! early returns on error and unwinding.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CLONE_DIR: &str = "repo";
const KEY_FILE: &str = "credential";

/// Directory and credential owned by exactly one in-flight operation.
#[derive(Debug)]
pub struct Workspace {
    root: TempDir,
    key_path: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace under the system temp directory.
    pub fn acquire(prefix: &str, secret: &str) -> Result<Self> {
        Self::acquire_in(&std::env::temp_dir(), prefix, secret)
    }

    /// Create a fresh workspace under `parent`.
    ///
    /// The directory is owner-only and the credential file is mode 0600 before
    /// any content is written to it.
    pub fn acquire_in(parent: &Path, prefix: &str, secret: &str) -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .with_context(|| {
                format!("Failed to create workspace under {}", parent.display())
            })?;
        restrict_permissions(root.path(), 0o700)?;

        let key_path = root.path().join(KEY_FILE);
        write_private(&key_path, secret)?;

        log::debug!("Acquired workspace {}", root.path().display());
        Ok(Workspace { root, key_path })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Where the repository is cloned; does not exist until the clone runs.
    pub fn clone_dir(&self) -> PathBuf {
        self.root.path().join(CLONE_DIR)
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Remove the credential and the clone, reporting failures.
    pub fn release(self) -> Result<()> {
        let path = self.root.path().to_path_buf();
        // Credential first, so it is gone even if the tree removal fails.
        if self.key_path.exists() {
            fs::remove_file(&self.key_path).with_context(|| {
                format!("Failed to remove credential in {}", path.display())
            })?;
        }
        self.root
            .close()
            .with_context(|| format!("Failed to remove workspace {}", path.display()))?;
        log::debug!("Released workspace {}", path.display());
        Ok(())
    }
}

fn write_private(path: &Path, secret: &str) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create credential file {}", path.display()))?;
    restrict_permissions(path, 0o600)?;

    // ssh refuses keys without a trailing newline.
    writeln!(file, "{}", secret.trim()).context("Failed to write credential file")?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
