// Commit/fetch/merge/push pipeline for one working directory.
//
// Push rejection by a concurrent writer is a distinguished, retryable
// outcome, not a fault. Both classifications below rest on substring
// matching against git's human-readable output; the markers are pinned by
// tests so a git upgrade that rewords them fails loudly instead of being
// silently misclassified.

use tracing::{trace, warn};

use super::worker::{CommandExecutor, GitError, GitWorker, ProcessCommandExecutor};

/// Commit output marking a benign empty commit attempt.
const NOTHING_TO_COMMIT_MARKER: &str = "nothing to commit, working tree clean";

/// Push output marking a non-fast-forward rejection.
const PUSH_REJECTED_MARKER: &str = "[rejected]";

/// Result of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// All steps completed.
    Synced,
    /// The remote rejected a non-fast-forward push; a concurrent writer got
    /// there first. Safe to retry after the next pull.
    RejectedPush,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("unable to git add changes")]
    Add(#[source] GitError),

    #[error("unable to git commit changes")]
    Commit(#[source] GitError),

    #[error("unable to update remote")]
    Fetch(#[source] GitError),

    #[error("unable to merge remote changes")]
    Merge(#[source] GitError),

    #[error("unable to push changes")]
    Push(#[source] GitError),
}

/// Drives the sync pipeline for one repository.
///
/// Commit messages carry the host name so peers can attribute automatic
/// commits when histories interleave.
#[derive(Debug, Clone)]
pub struct SyncEngine<E = ProcessCommandExecutor> {
    worker: GitWorker<E>,
    hostname: String,
    remote: String,
    branch: String,
}

impl<E: CommandExecutor> SyncEngine<E> {
    pub fn new(worker: GitWorker<E>, hostname: String, remote: String, branch: String) -> Self {
        Self { worker, hostname, remote, branch }
    }

    pub fn worker(&self) -> &GitWorker<E> {
        &self.worker
    }

    /// Run the full pipeline once: stage, commit, fetch, merge, push.
    ///
    /// A merge with conflicts leaves the merge in progress and surfaces as a
    /// fault; the next run then fails at the commit step, which is the
    /// operator's cue to resolve by hand.
    pub fn sync(&self) -> Result<SyncOutcome, SyncError> {
        trace!(directory = %self.worker.repo_path().display(), "syncing directory");

        self.worker.add_all().map_err(SyncError::Add)?;
        self.commit_or_noop()?;
        self.worker.remote_update().map_err(SyncError::Fetch)?;
        self.worker.merge_no_commit(&self.upstream()).map_err(SyncError::Merge)?;

        match self.worker.push(&self.remote, &self.branch) {
            Ok(_) => Ok(SyncOutcome::Synced),
            Err(error) if error.output_contains(PUSH_REJECTED_MARKER) => {
                trace!(directory = %self.worker.repo_path().display(), "push rejected by remote");
                Ok(SyncOutcome::RejectedPush)
            }
            Err(error) => Err(SyncError::Push(error)),
        }
    }

    /// Fetch the remote and merge its tracking branch without committing.
    pub fn pull(&self) -> Result<(), SyncError> {
        self.worker.remote_update().map_err(SyncError::Fetch)?;
        self.worker.merge_no_commit(&self.upstream()).map_err(SyncError::Merge)?;
        Ok(())
    }

    /// Stage, commit, and push until the remote accepts the push.
    ///
    /// Each rejection is answered with a pull and another attempt. There is
    /// no retry bound or backoff: peers that keep winning the race keep the
    /// loop running until one attempt lands.
    pub fn push_with_retry(&self) -> Result<(), SyncError> {
        loop {
            self.worker.add_all().map_err(SyncError::Add)?;
            self.commit_or_noop()?;

            match self.worker.push(&self.remote, &self.branch) {
                Ok(_) => return Ok(()),
                Err(error) if error.output_contains(PUSH_REJECTED_MARKER) => {
                    trace!("push rejected, pulling before retry");
                    if let Err(error) = self.pull() {
                        warn!(error = %error, "unable to pull after rejected push");
                    }
                }
                Err(error) => return Err(SyncError::Push(error)),
            }
        }
    }

    /// Commit staged changes; an empty working tree is a no-op, not a fault.
    fn commit_or_noop(&self) -> Result<(), SyncError> {
        let message = format!("{}: automatic commit", self.hostname);
        match self.worker.commit(&message) {
            Ok(_) => Ok(()),
            Err(error) if error.output_contains(NOTHING_TO_COMMIT_MARKER) => {
                trace!("nothing to commit, working tree clean");
                Ok(())
            }
            Err(error) => Err(SyncError::Commit(error)),
        }
    }

    fn upstream(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }
}

#[cfg(test)]
mod tests {
    use super::super::worker::testing::{failed, ok_output, MockExecutor};
    use super::*;

    fn engine(mock: &MockExecutor) -> SyncEngine<MockExecutor> {
        SyncEngine::new(
            GitWorker::with_executor("/tmp/repo", mock.clone()),
            "hostA".to_string(),
            "origin".to_string(),
            "master".to_string(),
        )
    }

    // ── Full pipeline ──────────────────────────────────────────────

    #[test]
    fn sync_runs_pipeline_in_order() {
        let mock = MockExecutor::new(vec![
            ok_output(""),                      // add .
            ok_output("[master abc] sync\n"),   // commit
            ok_output(""),                      // remote update
            ok_output("Already up to date.\n"), // merge
            ok_output(""),                      // push
        ]);

        let outcome = engine(&mock).sync().expect("sync should succeed");
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(mock.subcommands(), vec!["add", "commit", "remote", "merge", "push"]);

        let calls = mock.calls();
        assert_eq!(calls[1].args, vec!["commit", "-m", "hostA: automatic commit"]);
        assert_eq!(calls[3].args, vec!["merge", "--no-commit", "origin/master"]);
        assert_eq!(calls[4].args, vec!["push", "origin", "master"]);
    }

    #[test]
    fn sync_with_clean_tree_treats_commit_as_noop() {
        // Scenario: no local changes, up-to-date remote. The failed commit
        // carries the no-op marker and the pipeline still completes.
        let mock = MockExecutor::new(vec![
            ok_output(""),
            failed(1, "nothing to commit, working tree clean\n", ""),
            ok_output(""),
            ok_output("Already up to date.\n"),
            ok_output("Everything up-to-date\n"),
        ]);

        let outcome = engine(&mock).sync().expect("noop commit should not fail sync");
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(mock.subcommands(), vec!["add", "commit", "remote", "merge", "push"]);
    }

    #[test]
    fn sync_propagates_real_commit_failure() {
        let mock = MockExecutor::new(vec![
            ok_output(""),
            failed(128, "", "fatal: unable to write new index file\n"),
        ]);

        let error = engine(&mock).sync().expect_err("commit failure should fail sync");
        assert!(matches!(error, SyncError::Commit(_)));
        assert_eq!(mock.subcommands(), vec!["add", "commit"]);
    }

    #[test]
    fn sync_fails_fast_on_merge_conflict() {
        let mock = MockExecutor::new(vec![
            ok_output(""),
            ok_output("[master abc] sync\n"),
            ok_output(""),
            failed(1, "", "CONFLICT (content): Merge conflict in notes.txt\n"),
        ]);

        let error = engine(&mock).sync().expect_err("conflicted merge should fail");
        assert!(matches!(error, SyncError::Merge(_)));
        // No push after a failed merge.
        assert_eq!(mock.subcommands(), vec!["add", "commit", "remote", "merge"]);
    }

    // ── Push classification ────────────────────────────────────────

    #[test]
    fn rejected_push_is_distinguished_outcome() {
        let mock = MockExecutor::new(vec![
            ok_output(""),
            ok_output("[master abc] sync\n"),
            ok_output(""),
            ok_output(""),
            failed(1, "", "! [rejected] master -> master (fetch first)\n"),
        ]);

        let outcome = engine(&mock).sync().expect("rejection is not an error");
        assert_eq!(outcome, SyncOutcome::RejectedPush);
    }

    #[test]
    fn other_push_failure_is_error() {
        let mock = MockExecutor::new(vec![
            ok_output(""),
            ok_output("[master abc] sync\n"),
            ok_output(""),
            ok_output(""),
            failed(128, "", "fatal: could not read from remote repository\n"),
        ]);

        let error = engine(&mock).sync().expect_err("unreachable remote should fail");
        assert!(matches!(error, SyncError::Push(_)));
    }

    // ── push_with_retry ────────────────────────────────────────────

    #[test]
    fn push_with_retry_pulls_once_per_rejection() {
        // Rejection-then-success double: exactly one extra pull (remote
        // update + merge) and one extra add/commit/push round.
        let mock = MockExecutor::new(vec![
            ok_output(""),                                              // add
            failed(1, "nothing to commit, working tree clean\n", ""),   // commit noop
            failed(1, "", "! [rejected] master -> master (fetch first)\n"), // push
            ok_output(""),                                              // remote update
            ok_output(""),                                              // merge
            ok_output(""),                                              // add
            failed(1, "nothing to commit, working tree clean\n", ""),   // commit noop
            ok_output(""),                                              // push
        ]);

        engine(&mock).push_with_retry().expect("second push should land");
        assert_eq!(
            mock.subcommands(),
            vec!["add", "commit", "push", "remote", "merge", "add", "commit", "push"]
        );
    }

    #[test]
    fn push_with_retry_terminates_on_first_success() {
        let mock = MockExecutor::new(vec![
            ok_output(""),
            ok_output("[master abc] sync\n"),
            ok_output(""),
        ]);

        engine(&mock).push_with_retry().expect("push should land first try");
        assert_eq!(mock.subcommands(), vec!["add", "commit", "push"]);
    }

    #[test]
    fn push_with_retry_fails_on_non_rejection_error() {
        let mock = MockExecutor::new(vec![
            ok_output(""),
            ok_output("[master abc] sync\n"),
            failed(128, "", "fatal: could not read from remote repository\n"),
        ]);

        let error = engine(&mock).push_with_retry().expect_err("hard failure should stop retry");
        assert!(matches!(error, SyncError::Push(_)));
    }

    // ── Marker pinning ─────────────────────────────────────────────

    #[test]
    fn classification_markers_match_current_git_wording() {
        // These literals come from git's porcelain output. If a git release
        // rewords either message, classification degrades to generic
        // failure; this test documents the exact strings relied upon.
        assert_eq!(NOTHING_TO_COMMIT_MARKER, "nothing to commit, working tree clean");
        assert_eq!(PUSH_REJECTED_MARKER, "[rejected]");
    }
}
