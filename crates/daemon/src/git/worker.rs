use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    SpawnFailed { command: String, message: String },
    CommandFailed { command: String, code: Option<i32>, stdout: String, stderr: String },
}

impl GitError {
    /// Combined output of a failed command, for callers that pattern-match
    /// on git's diagnostics. Git splits messages between the two streams
    /// inconsistently across subcommands, so both are searched.
    pub fn output_contains(&self, marker: &str) -> bool {
        match self {
            GitError::SpawnFailed { .. } => false,
            GitError::CommandFailed { stdout, stderr, .. } => {
                stdout.contains(marker) || stderr.contains(marker)
            }
        }
    }
}

impl Display for GitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::SpawnFailed { command, message } => {
                write!(f, "failed to run `{command}`: {message}")
            }
            GitError::CommandFailed { command, code, stdout, stderr } => {
                let detail = if stderr.trim().is_empty() { stdout } else { stderr };
                write!(f, "`{command}` failed with code {:?}: {}", code, detail.trim())
            }
        }
    }
}

impl Error for GitError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        envs: &[(String, String)],
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        envs: &[(String, String)],
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .envs(envs.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs git subcommands against one working directory.
///
/// When an SSH key is configured, `GIT_SSH_COMMAND` is injected so fetch and
/// push authenticate with that key regardless of the ambient agent state.
#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    ssh_key: Option<PathBuf>,
    executor: E,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into(), ssh_key: None, executor: ProcessCommandExecutor }
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), ssh_key: None, executor }
    }

    pub fn with_ssh_key(mut self, key: Option<PathBuf>) -> Self {
        self.ssh_key = key;
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn status_short(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["status".to_string(), "--short".to_string()])
    }

    pub fn rev_list_count(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["rev-list".to_string(), "--count".to_string(), "HEAD".to_string()])
    }

    pub fn head_ref_name(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["rev-parse".to_string(), "--abbrev-ref".to_string(), "HEAD".to_string()])
    }

    pub fn head_hash(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["rev-parse".to_string(), "HEAD".to_string()])
    }

    pub fn add_all(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["add".to_string(), ".".to_string()])
    }

    pub fn commit(&self, message: &str) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["commit".to_string(), "-m".to_string(), message.to_string()])
    }

    pub fn remote_update(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["remote".to_string(), "update".to_string()])
    }

    pub fn merge_no_commit(&self, upstream: &str) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["merge".to_string(), "--no-commit".to_string(), upstream.to_string()])
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["push".to_string(), remote.to_string(), branch.to_string()])
    }

    pub fn pull_rebase(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["pull".to_string(), "--rebase".to_string()])
    }

    pub fn stash(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["stash".to_string()])
    }

    pub fn stash_pop(&self) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["stash".to_string(), "pop".to_string()])
    }

    fn run(&self, args: Vec<String>) -> Result<GitCommandOutput, GitError> {
        let command = format!("git {}", args.join(" "));

        let mut envs = Vec::new();
        if let Some(key) = &self.ssh_key {
            envs.push(("GIT_SSH_COMMAND".to_string(), format!("ssh -i {}", key.display())));
        }

        let result =
            self.executor.execute("git", &args, &self.repo_path, &envs).map_err(|error| {
                GitError::SpawnFailed { command: command.clone(), message: error.to_string() }
            })?;

        if result.success {
            return Ok(GitCommandOutput { stdout: result.stdout, stderr: result.stderr });
        }

        Err(GitError::CommandFailed {
            command,
            code: result.code,
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }
}
