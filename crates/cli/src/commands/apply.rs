// `githerd apply`: pull auto-fixable drift, then refresh this host's table.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use githerd_common::statefile;
use githerd_daemon::drift::remediate;
use githerd_daemon::git::worker::ProcessCommandExecutor;
use githerd_daemon::snapshot::snapshot_all;

use super::{drift, host_context};

#[derive(Args)]
pub struct ApplyArgs {
    /// Remediate as this host instead of the local hostname
    #[arg(long)]
    pub hostname: Option<String>,
}

pub fn run(args: ApplyArgs) -> Result<()> {
    let ctx = host_context(args.hostname)?;
    let reports = drift::load_reports(&ctx)?;

    let outcome = remediate::apply(&ProcessCommandExecutor, &reports, &ctx.home);

    // Refresh the state file regardless of failures so it reflects what
    // was actually done.
    info!("capturing current state");
    let records = snapshot_all(&ProcessCommandExecutor, &ctx.repos, &ctx.home)?;
    statefile::write(&ctx.state_dir, &ctx.hostname, &records)
        .context("unable to write state file")?;

    outcome
}
