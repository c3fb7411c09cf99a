// `githerd snapshot`: record this host's repository states.

use anyhow::{Context, Result};
use clap::Args;

use githerd_common::statefile;
use githerd_daemon::git::worker::ProcessCommandExecutor;
use githerd_daemon::snapshot::snapshot_all;

use super::host_context;

#[derive(Args)]
pub struct SnapshotArgs {
    /// Record states under this name instead of the local hostname
    #[arg(long)]
    pub hostname: Option<String>,
}

pub fn run(args: SnapshotArgs) -> Result<()> {
    let ctx = host_context(args.hostname)?;

    let records = snapshot_all(&ProcessCommandExecutor, &ctx.repos, &ctx.home)?;
    statefile::write(&ctx.state_dir, &ctx.hostname, &records)
        .context("unable to write state file")?;

    Ok(())
}
