//! OCI Resource Advisor CLI
//!
//! Runs utilization heuristics against configured OCI tenancies, or an
//! offline inventory snapshot, and prints the resulting recommendations.

mod commands;
mod config;
mod output;

use advisor_lib::AdvisorMetrics;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{inventory, profiles, run};
use output::{LogFormat, OutputFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// OCI Resource Advisor CLI
#[derive(Parser)]
#[command(name = "oci-advisor")]
#[command(author, version, about = "OCI Resource Advisor: utilization recommendations for OCI tenancies", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Offline inventory snapshot to use instead of the OCI APIs
    #[arg(long, env = "ADVISOR_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    /// Log output format
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long)]
    pub dump_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct ProfileArgs {
    /// Profile ID to evaluate (repeatable)
    #[arg(long = "profile", short, required = true)]
    pub profiles: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a heuristic, or `all`, and print its recommendations
    Run {
        /// Heuristic name (idle-compute, compute-rightsizing,
        /// compute-decommissioning, block-storage-rightsizing, unused-volume,
        /// old-snapshot, unused-load-balancer, bucket-auto-tiering,
        /// database-rightsizing) or `all`
        heuristic: run::Target,

        #[command(flatten)]
        profiles: ProfileArgs,
    },

    /// List the compartments visible to each profile
    Compartments {
        #[command(flatten)]
        profiles: ProfileArgs,
    },

    /// Count resources per object type for each profile
    Summary {
        #[command(flatten)]
        profiles: ProfileArgs,
    },

    /// List configured profiles
    Profiles,
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.verbose);

    let config = config::AdvisorConfig::load(cli.config.as_deref())?;
    debug!(profiles = config.profiles.len(), "Configuration loaded");

    let code = match cli.command {
        Commands::Profiles => {
            profiles::list_profiles(&config.profiles, cli.format)?;
            ExitCode::SUCCESS
        }
        Commands::Run { heuristic, profiles } => {
            let engine = commands::build_engine(&config, cli.snapshot.as_deref()).await?;
            run::run(&engine, heuristic, &profiles.profiles, cli.format).await?
        }
        Commands::Compartments { profiles } => {
            let engine = commands::build_engine(&config, cli.snapshot.as_deref()).await?;
            inventory::compartments(&engine, &profiles.profiles, cli.format).await?
        }
        Commands::Summary { profiles } => {
            let engine = commands::build_engine(&config, cli.snapshot.as_deref()).await?;
            inventory::summary(&engine, &profiles.profiles, cli.format).await?
        }
    };

    if cli.dump_metrics {
        eprint!("{}", AdvisorMetrics::new().encode_text());
    }

    Ok(code)
}
