// Continuous sync runtime: initial sync, then watcher + scheduler.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::git::sync::{SyncEngine, SyncOutcome};
use crate::git::worker::GitWorker;
use crate::watcher::scheduler::SyncScheduler;
use crate::watcher::{trigger, DirWatcher};

/// Resolved settings for one sync engine instance.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub dir: PathBuf,
    pub interval: Duration,
    pub ssh_key: Option<PathBuf>,
    pub remote: String,
    pub branch: String,
    pub hostname: String,
}

fn build_engine(options: &SyncOptions) -> SyncEngine {
    let worker = GitWorker::new(&options.dir).with_ssh_key(options.ssh_key.clone());
    SyncEngine::new(
        worker,
        options.hostname.clone(),
        options.remote.clone(),
        options.branch.clone(),
    )
}

/// Run the continuous sync engine until the hosting process is killed.
///
/// Mutual exclusion over the working directory is structural: the initial
/// sync runs to completion before the watcher is armed, and the scheduler
/// thread takes ownership of the engine afterwards, so at most one task
/// ever runs git against the directory.
pub async fn run(options: SyncOptions) -> Result<()> {
    let dir = options.dir.clone();
    let interval = options.interval;
    let engine = build_engine(&options);

    // Initial foreground sync. Failures are logged, not fatal: the watcher
    // still arms and the next change retries.
    let engine = tokio::task::spawn_blocking(move || {
        info!(directory = %engine.worker().repo_path().display(), "synchronizing directory");
        match engine.sync() {
            Ok(SyncOutcome::Synced) => {}
            Ok(SyncOutcome::RejectedPush) => {
                warn!("initial push rejected by remote, will retry on next change");
            }
            Err(error) => {
                error!(error = %error, "unable to synchronize directory");
            }
        }
        engine
    })
    .await
    .context("initial sync task panicked")?;

    let (slot, triggers) = trigger::channel();
    let scheduler = SyncScheduler::new(engine, slot.clone(), interval);
    let scheduler_task = tokio::task::spawn_blocking(move || scheduler.run(triggers));

    let _watcher = DirWatcher::start(&dir, slot)?;
    info!(directory = %dir.display(), "watching for changes");

    scheduler_task.await.context("scheduler task panicked")?;
    Ok(())
}

/// One-shot mode: retry until the directory synchronizes cleanly, then
/// return so the process can exit 0.
pub fn sync_once(options: &SyncOptions) -> Result<()> {
    let engine = build_engine(options);
    info!(directory = %options.dir.display(), "synchronizing directory");

    loop {
        match engine.sync() {
            Ok(SyncOutcome::Synced) => return Ok(()),
            Ok(SyncOutcome::RejectedPush) => {
                warn!("push rejected by remote, retrying");
            }
            Err(error) => {
                error!(error = %error, "unable to synchronize directory, retrying");
            }
        }
    }
}
