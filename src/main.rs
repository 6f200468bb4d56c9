use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

use mass_driver::orchestrator::DEFAULT_WORKERS;
use mass_driver::plugins::registry::PluginKind;

#[derive(Parser)]
#[command(name = "mass-driver")]
#[command(version, about = "Apply a change across many git repositories, then raise PRs")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an activity: clone, scan and patch repos, then create PRs
    Run(RunArgs),
    /// Check the status of given pull requests
    ReviewPr(ReviewArgs),
    /// Summarize a saved outcome, or explain a single repo of it
    View {
        /// Outcome JSON saved by `run --json-outfile`
        outcome: PathBuf,
        /// Explain this repo instead of summarizing
        #[arg(long)]
        repo_id: Option<String>,
        /// List repos under each outcome
        #[arg(long)]
        details: bool,
    },
    /// List available patch drivers
    Drivers {
        #[arg(long)]
        info: Option<String>,
    },
    /// List available forges
    Forges {
        #[arg(long)]
        info: Option<String>,
    },
    /// List available sources
    Sources {
        #[arg(long)]
        info: Option<String>,
    },
    /// List available scanners
    Scanners {
        #[arg(long)]
        info: Option<String>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Activity file (TOML)
    pub activity: PathBuf,

    /// Repo to process, overriding the activity's source (repeatable)
    #[arg(long = "repo-path")]
    pub repo_paths: Vec<String>,

    /// File of repos to process, one per line, overriding the activity's source
    #[arg(long)]
    pub repo_filelist: Option<PathBuf>,

    /// Process repos on a pool of worker threads
    #[arg(long, env = "MASS_DRIVER_PARALLEL")]
    pub parallel: bool,

    /// Worker threads for --parallel
    #[arg(long, env = "MASS_DRIVER_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Clone into a fresh temporary folder instead of the repo cache
    #[arg(long)]
    pub no_cache: bool,

    /// Repo cache folder
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Never stop for confirmation before or during the forge pass
    #[arg(long)]
    pub no_pause: bool,

    /// Save the outcome of the run as JSON
    #[arg(long)]
    pub json_outfile: Option<PathBuf>,

    /// List repos under each outcome in the summary
    #[arg(long)]
    pub details: bool,
}

#[derive(Args)]
pub struct ReviewArgs {
    /// Forge to query
    #[arg(long)]
    pub forge: String,

    /// TOML file holding the forge's configuration
    #[arg(long)]
    pub forge_config: Option<PathBuf>,

    /// PR URLs to review
    pub pr: Vec<String>,

    /// File of PR URLs, one per line
    #[arg(long)]
    pub pr_filelist: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mass_driver::logging::init_tracing(cli.verbose, cli.log_json);

    match &cli.command {
        Commands::Run(args) => cmd::cmd_run(args).await?,
        Commands::ReviewPr(args) => cmd::cmd_review(args)?,
        Commands::View {
            outcome,
            repo_id,
            details,
        } => cmd::cmd_view(outcome, repo_id.as_deref(), *details)?,
        Commands::Drivers { info } => cmd::cmd_plugins(PluginKind::Driver, info.as_deref())?,
        Commands::Forges { info } => cmd::cmd_plugins(PluginKind::Forge, info.as_deref())?,
        Commands::Sources { info } => cmd::cmd_plugins(PluginKind::Source, info.as_deref())?,
        Commands::Scanners { info } => cmd::cmd_plugins(PluginKind::Scanner, info.as_deref())?,
    }

    Ok(())
}
