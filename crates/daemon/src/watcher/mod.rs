// Filesystem change notifications → coalesced sync triggers.

pub mod scheduler;
pub mod trigger;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, trace};

use trigger::TriggerSlot;

/// Watches one directory and fires the shared trigger on every event.
///
/// The watch is non-recursive: changes inside nested directories are not
/// observed unless the platform backend reports them for the root. Event
/// details are irrelevant here: the sync pipeline re-reads the whole
/// working tree, so "something changed" is all the signal carries.
pub struct DirWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl DirWatcher {
    pub fn start(root: &Path, trigger: TriggerSlot) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to canonicalize watch root: {}", root.display()))?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                trace!(kind = ?event.kind, "filesystem event");
                trigger.fire();
            }
            Err(e) => {
                error!(error = %e, "file watcher error");
            }
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch directory: {}", root.display()))?;

        debug!(path = %root.display(), "file watcher started");

        Ok(Self { _watcher: watcher, root })
    }

    /// The canonicalized root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
