use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use commit_canvas::config::EngineConfig;
use commit_canvas::engine::RemoteTarget;
use commit_canvas::error::exit_code_for;
use commit_canvas::handlers::{self, ConfigChanges, Selection};
use commit_canvas::logger;
use commit_canvas::model::{DayBucketing, Identity};
use commit_canvas::scm::HostKeyPolicy;

#[derive(Parser)]
#[command(name = "commit-canvas")]
#[command(about = "Paint a contribution calendar by synthesizing and rewriting git history", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RemoteArgs {
    /// Repository address (e.g. git@github.com:me/canvas.git)
    #[arg(short, long, env = "COMMIT_CANVAS_REPO")]
    repo: String,

    /// SSH private key file (default: the COMMIT_CANVAS_SSH_KEY environment variable)
    #[arg(long)]
    ssh_key: Option<PathBuf>,
}

impl RemoteArgs {
    fn target(&self) -> Result<RemoteTarget> {
        let secret = handlers::load_secret(self.ssh_key.as_deref())?;
        Ok(RemoteTarget::new(self.repo.clone(), secret))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create backdated commits for a contribution map and push them
    Generate {
        #[command(flatten)]
        remote: RemoteArgs,

        /// JSON file of {"YYYY-MM-DD": level}, or - for stdin
        #[arg(short, long)]
        contributions: PathBuf,

        /// Author name for the new commits
        #[arg(long, env = "COMMIT_CANVAS_AUTHOR_NAME")]
        author_name: String,

        /// Author email for the new commits
        #[arg(long, env = "COMMIT_CANVAS_AUTHOR_EMAIL")]
        author_email: String,

        /// Plan the commits without cloning or pushing
        #[arg(long)]
        dry_run: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count commits per day of the remote history
    Fetch {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove all commits on the given days and force-push the rewritten history
    Delete {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Day to clear (YYYY-MM-DD); repeatable
        #[arg(short, long = "date")]
        dates: Vec<String>,

        /// Clear every day present in the history
        #[arg(long)]
        all: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Branch to publish to (empty to detect from the remote)
        #[arg(long)]
        set_primary_branch: Option<String>,

        /// Host key verification for SSH remotes
        #[arg(long, value_enum)]
        set_host_key_policy: Option<HostKeyPolicy>,

        /// How commit timestamps map to calendar days
        #[arg(long, value_enum)]
        set_day_bucketing: Option<DayBucketing>,

        /// File appended to by each generated commit
        #[arg(long)]
        set_marker_file: Option<String>,

        /// Message of each generated commit
        #[arg(long)]
        set_commit_message: Option<String>,

        /// Clone timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        set_clone_timeout: Option<u64>,

        /// Push timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        set_push_timeout: Option<u64>,

        /// Rewrite timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        set_rewrite_timeout: Option<u64>,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate {
            remote,
            contributions,
            author_name,
            author_email,
            dry_run,
            json,
        } => {
            let config = EngineConfig::load()?;
            let map = handlers::read_contributions(&contributions)?;
            let author = Identity::new(author_name, author_email);
            let target = if dry_run {
                RemoteTarget::new(remote.repo.clone(), String::new())
            } else {
                remote.target()?
            };
            handlers::handle_generate(&target, &author, &map, &config, dry_run, json)?;
        }
        Commands::Fetch { remote, json } => {
            let config = EngineConfig::load()?;
            handlers::handle_fetch(&remote.target()?, &config, json)?;
        }
        Commands::Delete {
            remote,
            dates,
            all,
            yes,
            json,
        } => {
            let selection = Selection::from_args(&dates, all)?;
            let config = EngineConfig::load()?;
            handlers::handle_delete(&remote.target()?, &selection, &config, yes, json)?;
        }
        Commands::Config {
            show,
            set_primary_branch,
            set_host_key_policy,
            set_day_bucketing,
            set_marker_file,
            set_commit_message,
            set_clone_timeout,
            set_push_timeout,
            set_rewrite_timeout,
        } => {
            let changes = ConfigChanges {
                primary_branch: set_primary_branch,
                host_key_policy: set_host_key_policy,
                day_bucketing: set_day_bucketing,
                marker_file: set_marker_file,
                commit_message: set_commit_message,
                clone_timeout: set_clone_timeout,
                push_timeout: set_push_timeout,
                rewrite_timeout: set_rewrite_timeout,
            };
            if show || changes.is_empty() {
                handlers::handle_config_show(&EngineConfig::load()?)?;
            } else {
                handlers::handle_config_set(changes)?;
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_logger() {
        eprintln!("{} logging disabled: {e:#}", "Warning:".yellow());
    }

    if let Err(err) = run(cli) {
        eprintln!("{} {err:#}", "Error:".red().bold());
        std::process::exit(exit_code_for(&err));
    }
}
