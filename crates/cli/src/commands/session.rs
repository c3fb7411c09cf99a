// `githerd session`: one coordinated synchronization round.
//
// The process is spawned by a multiplexer that connects the stdin/stdout
// of every participant: each line written here is relayed to all nodes in
// emission order (including back to this process, tagged with this node's
// name). That ordered self-echoing broadcast is an assumed property of the
// environment; election correctness rests on it.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use githerd_daemon::config::Config;
use githerd_daemon::git::sync::SyncEngine;
use githerd_daemon::git::worker::GitWorker;
use githerd_daemon::session::{Outbound, SessionHandler, Step};

#[derive(Args)]
pub struct SessionArgs {
    /// Repository working directory for this session
    pub path: PathBuf,
}

pub fn run(args: SessionArgs) -> Result<()> {
    let config = Config::load();
    let home = dirs::home_dir().context("could not determine home directory")?;
    let hostname = whoami::fallible::hostname().context("unable to get hostname")?;

    let worker = GitWorker::new(&args.path).with_ssh_key(config.ssh_key(&home));
    let engine = SyncEngine::new(
        worker,
        hostname,
        config.sync.remote.clone(),
        config.sync.branch.clone(),
    );

    let mut handler = SessionHandler::new(engine);
    let mut out = StdoutBroadcast;

    for line in std::io::stdin().lines() {
        let line = line.context("unable to read control line")?;

        match handler.handle_line(&line, &mut out) {
            Ok(Step::Continue) => {}
            Ok(Step::Done(outcome)) => {
                info!(outcome = ?outcome, "session complete");
                return Ok(());
            }
            Err(error) => {
                // Best-effort notification so peers are not left waiting.
                if let Some(crash) = handler.crash_line() {
                    out.send(crash);
                }
                return Err(error).context("coordination session failed");
            }
        }
    }

    // The multiplexer closed the channel without a terminal command.
    Ok(())
}

/// Broadcasts control lines on stdout, flushing per line so the
/// multiplexer relays them immediately.
struct StdoutBroadcast;

impl Outbound for StdoutBroadcast {
    fn send(&mut self, line: String) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}
