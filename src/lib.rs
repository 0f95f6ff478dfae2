//! # commit-canvas
//!
//! Paint a contribution calendar by synthesizing and selectively rewriting the
//! history of a remote git repository.
//!
//! ## Overview
//!
//! Every operation works on a fresh clone in a private, throwaway workspace:
//!
//! - **Generate**: for each dated intensity level, create a random number of
//!   backdated commits and push them to the primary branch
//! - **Fetch**: count commits per calendar day of the existing history
//! - **Delete**: remove every commit authored on chosen days, rebuild the rest
//!   of the history around them and force-push the result
//!
//! ## Architecture
//!
//! - Data model and configuration ([`model`], [`config`], [`error`])
//! - Workspace and credential handling ([`workspace`])
//! - Git plumbing ([`scm`])
//! - History synthesis, scanning and rewriting ([`synth`], [`scan`], [`rewrite`])
//! - Publishing and operation sequencing ([`publish`], [`engine`])
//! - Command-line surface ([`handlers`], [`logger`])

/// Platform configuration directory and `config.toml` handling.
pub mod config;

/// Operation sequencing for generate, fetch and delete.
///
/// Validates input, acquires a workspace, clones, runs the operation and
/// releases the workspace on every exit path.
pub mod engine;

/// Error taxonomy (validation, transport, verification) and exit codes.
pub mod error;

/// Command handlers behind the CLI subcommands.
pub mod handlers;

/// Console and file logging with size-based rotation.
pub mod logger;

/// Contribution maps, intensity levels, deletion sets and operation outcomes.
pub mod model;

/// Pushing and force-pushing to the primary branch, and resetting an emptied history.
pub mod publish;

/// Removal of commits by authored date and rebuilding of the surviving graph.
pub mod rewrite;

/// Per-day commit counts of an existing history.
pub mod scan;

/// Git command-line plumbing with bounded execution and SSH wiring.
pub mod scm;

/// Planning and applying backdated commits.
pub mod synth;

/// Private temporary directories holding the clone and the credential.
pub mod workspace;
