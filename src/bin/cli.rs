//! Bounty Watch CLI
//!
//! Long-running entry point. With no arguments it monitors forever.

use std::path::PathBuf;

use bounty_watch::{
    config,
    error::Result,
    models::Config,
    pipeline::{Cycle, Monitor},
    services::{SnapshotFetcher, notifier_from_config, notifier::format_difference},
    storage,
};
use clap::{Parser, Subcommand};

/// Bounty Watch - bug-bounty change monitor
#[derive(Parser, Debug)]
#[command(
    name = "bounty-watch",
    version,
    about = "Watches bug-bounty listings for updates and new asset links"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "bounty-watch.toml", global = true)]
    config: PathBuf,

    /// Path to an environment file (default: ./.env)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Monitor forever (default)
    Run,

    /// Run a single cycle and exit
    Once,

    /// Validate configuration
    Validate,

    /// Show stored bounty state and latest differences
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Bounty Watch starting...");

    let config = match config::load_all(&cli.config, cli.env_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration invalid: {}", e);
            return Err(e);
        }
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let store = storage::connect(&config.store).await?;
            let fetcher = SnapshotFetcher::new(&config)?;
            let notifier = notifier_from_config(&config)?;

            let cycle = Cycle::new(&config, &fetcher, store.as_ref(), notifier.as_ref());
            Monitor::new(cycle).run_forever().await?;
        }

        Command::Once => {
            let store = storage::connect(&config.store).await?;
            let fetcher = SnapshotFetcher::new(&config)?;
            let notifier = notifier_from_config(&config)?;

            let report = Cycle::new(&config, &fetcher, store.as_ref(), notifier.as_ref())
                .run()
                .await?;
            log::info!(
                "Checked {} bounties, {} differences",
                report.bounty_count,
                report.difference_count
            );
        }

        Command::Validate => {
            log::info!("✓ Config OK: {}", describe(&config));
        }

        Command::Info => {
            let store = storage::connect(&config.store).await?;
            let tracked = store.count_bounties().await?;
            let differences = store.load_differences().await?;

            log::info!("Tracked bounties: {}", tracked);
            log::info!("Stored differences: {}", differences.len());
            for difference in &differences {
                log::info!("\n{}", format_difference(difference, &config.site).trim_end());
            }
        }
    }

    log::info!("Done!");

    Ok(())
}

fn describe(config: &Config) -> String {
    format!(
        "site {}, store {:?}, telegram {}, every {}s, new projects {:?}",
        config.site.base_url,
        config.store.backend,
        if config.telegram.is_enabled() { "on" } else { "off" },
        config.monitor.interval_secs,
        config.monitor.new_projects
    )
}
