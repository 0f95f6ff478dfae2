//! Fetch command handler

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::EngineConfig;
use crate::engine::{self, RemoteTarget};
use crate::logger;
use crate::model::FetchOutcome;

/// Handle fetch command
pub fn handle_fetch(target: &RemoteTarget, config: &EngineConfig, json: bool) -> Result<()> {
    let outcome = engine::fetch(target, config).context("Fetch failed")?;

    logger::log_to_file(&format!(
        "fetch {}: {} days",
        engine::redact_url(target.url()),
        outcome.contributions.len()
    ))
    .ok();

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_counts(&outcome);
    }

    Ok(())
}

fn print_counts(outcome: &FetchOutcome) {
    if outcome.contributions.is_empty() {
        println!("{}", "History is empty".dimmed());
        return;
    }

    println!("{}", "Contributions".cyan().bold());
    println!("{}", "=".repeat(32).cyan());
    for row in count_rows(outcome) {
        println!("{row}");
    }
    let total: u32 = outcome.contributions.values().sum();
    println!();
    println!(
        "{} commits across {} days",
        total.to_string().bold(),
        outcome.contributions.len()
    );
}

/// One line per day: date, commit count and a bar as long as the level.
fn count_rows(outcome: &FetchOutcome) -> Vec<String> {
    outcome
        .levels()
        .into_iter()
        .map(|(date, level)| {
            format!(
                "  {}  {:>4}  {}",
                date,
                outcome.contributions[&date],
                "■".repeat(level.0 as usize).green()
            )
        })
        .collect()
}
