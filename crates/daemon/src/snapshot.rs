// Read-only state capture for one repository path.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::trace;

use githerd_common::paths;
use githerd_common::state::StateRecord;

use crate::git::worker::{CommandExecutor, GitWorker};

/// Capture the current state of the repository at `repo`.
///
/// A path without a `.git` directory is not a repository and yields `None`;
/// callers treat absence as "nothing to record", not a fault. Any git
/// failure on an actual repository is propagated; the caller decides
/// fatal-vs-skip policy.
pub fn snapshot_repo<E: CommandExecutor + Clone>(
    executor: &E,
    repo: &Path,
    home: &Path,
) -> Result<Option<StateRecord>> {
    if !repo.join(".git").exists() {
        trace!(path = %repo.display(), "not a git repository, skipping");
        return Ok(None);
    }

    let worker = GitWorker::with_executor(repo, executor.clone());

    let head = worker
        .head_ref_name()
        .with_context(|| format!("unable to resolve HEAD in {}", repo.display()))?
        .stdout
        .trim()
        .to_string();

    let hash = worker
        .head_hash()
        .with_context(|| format!("unable to resolve HEAD hash in {}", repo.display()))?
        .stdout
        .trim()
        .to_string();

    // `rev-list --count` is the cheap history-length query; enumerating the
    // commit graph instead gets asymptotically worse on long histories.
    let commits_raw = worker
        .rev_list_count()
        .with_context(|| format!("unable to count commits in {}", repo.display()))?;
    let commits: u64 = commits_raw
        .stdout
        .trim()
        .parse()
        .with_context(|| format!("unexpected rev-list output: {:?}", commits_raw.stdout))?;

    let status = worker
        .status_short()
        .with_context(|| format!("unable to read status of {}", repo.display()))?;
    let clean = status.stdout.trim().is_empty();

    Ok(Some(StateRecord {
        path: paths::to_portable(repo, home),
        head,
        hash,
        commits,
        clean,
    }))
}

/// Snapshot every repository path, skipping non-repositories.
pub fn snapshot_all<E: CommandExecutor + Clone>(
    executor: &E,
    repos: &[std::path::PathBuf],
    home: &Path,
) -> Result<Vec<StateRecord>> {
    let mut records = Vec::new();
    for repo in repos {
        if let Some(record) = snapshot_repo(executor, repo, home)? {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::worker::testing::{failed, ok_output, MockExecutor};
    use std::fs;
    use tempfile::TempDir;

    fn git_dir(tmp: &TempDir, name: &str) -> std::path::PathBuf {
        let repo = tmp.path().join(name);
        fs::create_dir_all(repo.join(".git")).unwrap();
        repo
    }

    #[test]
    fn non_repository_yields_none() {
        let tmp = TempDir::new().unwrap();
        let plain = tmp.path().join("plain");
        fs::create_dir_all(&plain).unwrap();

        let mock = MockExecutor::new(vec![]);
        let record = snapshot_repo(&mock, &plain, tmp.path()).unwrap();
        assert!(record.is_none());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn captures_head_count_and_cleanliness() {
        let tmp = TempDir::new().unwrap();
        let repo = git_dir(&tmp, "proj");

        let mock = MockExecutor::new(vec![
            ok_output("master\n"),
            ok_output("0fe3a2b9d4c1\n"),
            ok_output("42\n"),
            ok_output(""),
        ]);

        let record = snapshot_repo(&mock, &repo, tmp.path()).unwrap().unwrap();
        assert_eq!(record.path, "~/proj");
        assert_eq!(record.head, "master");
        assert_eq!(record.hash, "0fe3a2b9d4c1");
        assert_eq!(record.commits, 42);
        assert!(record.clean);

        assert_eq!(mock.subcommands(), vec!["rev-parse", "rev-parse", "rev-list", "status"]);
    }

    #[test]
    fn dirty_worktree_detected_from_status_output() {
        let tmp = TempDir::new().unwrap();
        let repo = git_dir(&tmp, "proj");

        let mock = MockExecutor::new(vec![
            ok_output("feature\n"),
            ok_output("abc\n"),
            ok_output("7\n"),
            ok_output(" M notes.txt\n?? scratch/\n"),
        ]);

        let record = snapshot_repo(&mock, &repo, tmp.path()).unwrap().unwrap();
        assert!(!record.clean);
        assert_eq!(record.head, "feature");
    }

    #[test]
    fn git_failure_propagates() {
        let tmp = TempDir::new().unwrap();
        let repo = git_dir(&tmp, "proj");

        let mock = MockExecutor::new(vec![failed(128, "", "fatal: not a git repository\n")]);
        let error = snapshot_repo(&mock, &repo, tmp.path()).expect_err("git fault should surface");
        assert!(error.to_string().contains("unable to resolve HEAD"));
    }

    #[test]
    fn snapshot_all_skips_non_repos_in_place() {
        let tmp = TempDir::new().unwrap();
        let repo_a = git_dir(&tmp, "a");
        let plain = tmp.path().join("plain");
        fs::create_dir_all(&plain).unwrap();
        let repo_b = git_dir(&tmp, "b");

        let mock = MockExecutor::new(vec![
            ok_output("master\n"),
            ok_output("aaa\n"),
            ok_output("1\n"),
            ok_output(""),
            ok_output("master\n"),
            ok_output("bbb\n"),
            ok_output("2\n"),
            ok_output(""),
        ]);

        let records =
            snapshot_all(&mock, &[repo_a, plain, repo_b], tmp.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "~/a");
        assert_eq!(records[1].path, "~/b");
    }
}
