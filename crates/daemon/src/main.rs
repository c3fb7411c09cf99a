// githerdd: continuous two-way synchronizer for one watched directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use githerd_daemon::config::Config;
use githerd_daemon::runtime::{self, SyncOptions};

#[derive(Parser)]
#[command(name = "githerdd", about = "Two-way git synchronizer with file watching")]
struct Cli {
    /// Directory to keep in sync (defaults to the configured one)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Seconds between sync cycles
    #[arg(short, long)]
    interval: Option<u64>,

    /// SSH key for git authentication
    #[arg(short = 'k', long)]
    ssh_key: Option<PathBuf>,

    /// Quit after the initial sync
    #[arg(short, long)]
    sync_once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    let home = dirs::home_dir().context("could not determine home directory")?;
    let hostname = whoami::fallible::hostname().context("unable to get hostname")?;

    let options = SyncOptions {
        dir: cli.dir.unwrap_or_else(|| config.sync_dir(&home)),
        interval: Duration::from_secs(cli.interval.unwrap_or(config.sync.interval_sec)),
        ssh_key: cli.ssh_key.or_else(|| config.ssh_key(&home)),
        remote: config.sync.remote.clone(),
        branch: config.sync.branch.clone(),
        hostname,
    };

    if cli.sync_once {
        tokio::task::spawn_blocking(move || runtime::sync_once(&options))
            .await
            .context("sync task panicked")?
    } else {
        runtime::run(options).await
    }
}
