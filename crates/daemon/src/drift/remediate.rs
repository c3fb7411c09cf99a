// Mechanical remediation of auto-fixable drift reports.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use githerd_common::paths;

use super::detector::DriftReport;
use crate::git::worker::{CommandExecutor, GitWorker};

/// Pull every auto-fixable repository: stash if dirty, `pull --rebase`,
/// pop the stash.
///
/// Remediation is best-effort per repository: one repository's fault does
/// not prevent attempting the others, but the run as a whole fails if any
/// repository failed. Callers re-snapshot afterwards so the persisted table
/// reflects what was actually done.
pub fn apply<E: CommandExecutor + Clone>(
    executor: &E,
    reports: &[DriftReport],
    home: &Path,
) -> Result<()> {
    let mut failed = Vec::new();

    for report in reports.iter().filter(|report| report.can_auto) {
        info!(path = %report.path, "pulling");

        let repo = paths::to_absolute(&report.path, home);
        if let Err(error) = remediate_one(executor, &repo, report.clean) {
            warn!(path = %report.path, error = %error, "remediation failed");
            failed.push(report.path.clone());
        }
    }

    if !failed.is_empty() {
        bail!("remediation failed for: {}", failed.join(", "));
    }

    Ok(())
}

fn remediate_one<E: CommandExecutor + Clone>(
    executor: &E,
    repo: &Path,
    clean: bool,
) -> Result<()> {
    let worker = GitWorker::with_executor(repo, executor.clone());

    if !clean {
        worker.stash().context("unable to stash local changes")?;
    }

    worker.pull_rebase().context("unable to pull with rebase")?;

    if !clean {
        worker.stash_pop().context("unable to pop stashed changes")?;
    }

    Ok(())
}
