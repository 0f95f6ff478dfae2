//! Generate command handler

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;

use crate::config::EngineConfig;
use crate::engine::{self, RemoteTarget};
use crate::logger;
use crate::model::{ContributionMap, GenerateOutcome, Identity};
use crate::synth::{self, CommitPlan};

/// Handle generate command
///
/// With `dry_run` the commits are only planned and summarized; nothing is
/// cloned or pushed.
pub fn handle_generate(
    target: &RemoteTarget,
    author: &Identity,
    contributions: &ContributionMap,
    config: &EngineConfig,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    if dry_run {
        let plan = synth::plan_commits(
            contributions,
            Utc::now().date_naive(),
            &mut rand::thread_rng(),
        );
        let outcome = GenerateOutcome {
            total_commits: plan.total(),
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            print_plan(&plan);
        }
        return Ok(());
    }

    if !json {
        println!(
            "{}",
            format!(
                "Painting {} days into {}...",
                contributions.len(),
                engine::redact_url(target.url())
            )
            .cyan()
        );
    }

    let outcome = engine::generate(target, author, contributions, config)
        .context("Generate failed")?;

    logger::log_to_file(&format!(
        "generate {}: {} commits",
        engine::redact_url(target.url()),
        outcome.total_commits
    ))
    .ok();

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.total_commits == 0 {
        println!("{}", "No dates on or before today; nothing was pushed".yellow());
    } else {
        println!(
            "{} Pushed {} commits",
            "✓".green(),
            outcome.total_commits.to_string().bold()
        );
    }

    Ok(())
}

fn print_plan(plan: &CommitPlan) {
    println!("{}", "Generate (dry run)".cyan().bold());
    if plan.is_empty() {
        println!("{}", "No dates on or before today".dimmed());
        return;
    }
    for (date, count) in &plan.per_date {
        println!("  {}  {:>2} commits", date, count);
    }
    println!();
    println!(
        "{} {} commits would be pushed",
        "✓".green(),
        plan.total()
    );
}
