// CLI subcommand dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use githerd_daemon::config::Config;

pub mod apply;
pub mod drift;
pub mod session;
pub mod snapshot;

#[derive(Subcommand)]
pub enum Command {
    /// Record this host's repository states into the shared state directory
    Snapshot(snapshot::SnapshotArgs),
    /// List drift between this host and its peers
    Drift(drift::DriftArgs),
    /// Pull repositories where a peer is strictly ahead
    Apply(apply::ApplyArgs),
    /// Run one coordinated synchronization session over stdin/stdout
    Session(session::SessionArgs),
}

pub fn run(cmd: Command) -> Result<()> {
    match cmd {
        Command::Snapshot(args) => snapshot::run(args),
        Command::Drift(args) => drift::run(args),
        Command::Apply(args) => apply::run(args),
        Command::Session(args) => session::run(args),
    }
}

/// Resolved host-level context shared by the fleet subcommands.
pub(crate) struct HostContext {
    pub home: PathBuf,
    pub hostname: String,
    pub state_dir: PathBuf,
    pub repos: Vec<PathBuf>,
}

pub(crate) fn host_context(hostname_override: Option<String>) -> Result<HostContext> {
    let config = Config::load();
    let home = dirs::home_dir().context("could not determine home directory")?;

    let hostname = match hostname_override {
        Some(name) => name,
        None => whoami::fallible::hostname().context("unable to get hostname")?,
    };

    let state_dir = config.state_dir(&home);
    let repos = config.expand_repos(&home).context("invalid repository pattern")?;

    Ok(HostContext { home, hostname, state_dir, repos })
}
