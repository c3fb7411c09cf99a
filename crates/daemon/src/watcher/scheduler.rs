// Single-owner sync loop.
//
// The scheduler owns the SyncEngine outright, so exactly one task ever runs
// git against the working directory: mutual exclusion by ownership, not by
// startup ordering. On failure the trigger is re-armed so the condition
// that caused it gets another attempt; the configured interval is a uniform
// cooldown after every run, not a backoff.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, trace};

use super::trigger::TriggerSlot;
use crate::git::sync::{SyncEngine, SyncOutcome};
use crate::git::worker::CommandExecutor;

pub struct SyncScheduler<E> {
    engine: SyncEngine<E>,
    trigger: TriggerSlot,
    interval: Duration,
}

impl<E: CommandExecutor> SyncScheduler<E> {
    pub fn new(engine: SyncEngine<E>, trigger: TriggerSlot, interval: Duration) -> Self {
        Self { engine, trigger, interval }
    }

    /// Consume triggers until the channel closes. Blocking; run this on a
    /// dedicated thread (`tokio::task::spawn_blocking`).
    pub fn run(self, mut triggers: mpsc::Receiver<()>) {
        while triggers.blocking_recv().is_some() {
            self.handle_trigger();

            if !self.interval.is_zero() {
                trace!(seconds = self.interval.as_secs(), "sleeping between syncs");
                std::thread::sleep(self.interval);
            }
        }
    }

    fn handle_trigger(&self) {
        match self.engine.sync() {
            Ok(SyncOutcome::Synced) => {}
            Ok(SyncOutcome::RejectedPush) => {
                // Expected under concurrent writers; the pull that the next
                // run performs resolves it, so retry quietly.
                trace!("push rejected, re-arming trigger");
                self.trigger.fire();
            }
            Err(error) => {
                error!(
                    error = %error,
                    directory = %self.engine.worker().repo_path().display(),
                    "unable to synchronize directory"
                );
                self.trigger.fire();
            }
        }
    }
}
