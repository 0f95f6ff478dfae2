//! Git access layer.
//!
//! Wraps the `git` executable with argument-array invocations, per-step
//! timeouts and SSH key transport.

pub mod command;
mod git;
pub mod ssh;

pub use git::{git_available, CommitRecord, GitRepo};
pub use ssh::{ssh_command, HostKeyPolicy};
