//! Bounded execution of external commands.
//!
//! Every argument is passed as a discrete argv entry; nothing here goes through
//! a shell. A step that outlives its limit is killed and reported as a
//! transport failure.

use anyhow::{anyhow, Context, Result};
use std::io::{self, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::error::CanvasError;

/// Captured result of a finished command
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Captured {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim_end().to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

/// Wait for a reader thread; a missing stream reads as empty.
fn collect_output(
    handle: Option<JoinHandle<io::Result<Vec<u8>>>>,
    stream: &str,
    label: &str,
) -> Result<Vec<u8>> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    handle
        .join()
        .map_err(|_| anyhow!("{stream} reader of '{label}' panicked"))?
        .with_context(|| format!("Failed to read {stream} of '{label}'"))
}

/// Run `command` to completion within `limit`, optionally feeding `input` on stdin.
///
/// `label` names the step in errors; it must not contain secrets.
/// A non-zero exit is not an error here; callers decide what it means.
pub fn run_bounded(
    mut command: Command,
    input: Option<&[u8]>,
    limit: Duration,
    label: &str,
) -> Result<Captured> {
    command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to run '{label}'"))?;

    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    if let Some(bytes) = input {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin of '{label}' was not captured"))?;
        stdin
            .write_all(bytes)
            .with_context(|| format!("Failed to write input to '{label}'"))?;
    }

    let status = match child
        .wait_timeout(limit)
        .with_context(|| format!("Failed to wait for '{label}'"))?
    {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            log::warn!("'{label}' exceeded {}s and was killed", limit.as_secs());
            return Err(CanvasError::transport(format!(
                "'{label}' timed out after {}s",
                limit.as_secs()
            ))
            .into());
        }
    };

    let stdout = collect_output(stdout, "stdout", label)?;
    let stderr = collect_output(stderr, "stderr", label)?;

    Ok(Captured {
        status,
        stdout,
        stderr,
    })
}
