// Coordinated synchronization session: leader election and propagation.
//
// One process instance participates in exactly one session, driven line by
// line through an external multiplexer. The channel contract is assumed,
// not enforced here: every broadcast reaches every participant in the
// sender's emission order, including the sender itself, and the multiplexer
// tags relayed commands with the sending node's name. Election rests
// entirely on that ordering guarantee: all nodes observe the same roster
// and the same token echoes, so all compute the same leader without a
// separate consensus round.
//
// The handler is synchronous and processes one control line at a time; git
// subprocess calls block it for their duration. Each process is spawned
// fresh per session and the host loop exits after one PUSH/PULL cycle, so
// there is no internal concurrency to manage.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, trace};
use uuid::Uuid;

use githerd_common::protocol::{
    broadcast_line, ControlMessage, ProtocolError, Verb, CMD_CRASH, CMD_PULL, CMD_PUSH,
    EPHEMERA_PREFIX,
};

use crate::git::sync::{SyncEngine, SyncError};
use crate::git::worker::{CommandExecutor, ProcessCommandExecutor};

/// Sink for outbound broadcast lines. The host loop writes them to the
/// multiplexer; tests collect them in a buffer.
pub trait Outbound {
    fn send(&mut self, line: String);
}

impl Outbound for Vec<String> {
    fn send(&mut self, line: String) {
        self.push(line);
    }
}

/// Role assigned when this process recognizes its own token echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

/// Terminal result of a session, reported to the host loop which performs
/// the actual process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    LeaderDone,
    FollowerDone,
}

/// Result of handling one control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done(Outcome),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("no nodes announced before election completed")]
    EmptyRoster,

    #[error("can't pull")]
    Pull(#[source] SyncError),

    #[error("can't push")]
    Push(#[source] SyncError),
}

/// Per-session protocol state machine.
///
/// States flow roster-collection → election-pending → leader/follower →
/// terminal. The session prefix is latched from the first observed message;
/// the roster accumulates `NODE` announcements in arrival order, and roster
/// position 0 is the leader candidate.
pub struct SessionHandler<E = ProcessCommandExecutor> {
    engine: SyncEngine<E>,
    prefix: Option<String>,
    roster: Vec<String>,
    ephemera: Option<String>,
    my_node: Option<String>,
    role: Option<Role>,
}

impl<E: CommandExecutor> SessionHandler<E> {
    pub fn new(engine: SyncEngine<E>) -> Self {
        Self {
            engine,
            prefix: None,
            roster: Vec::new(),
            ephemera: None,
            my_node: None,
            role: None,
        }
    }

    /// Process one control line, emitting any broadcasts through `out`.
    pub fn handle_line(&mut self, line: &str, out: &mut dyn Outbound) -> Result<Step, SessionError> {
        let message = ControlMessage::parse(line)?;

        if self.prefix.is_none() {
            self.prefix = Some(message.prefix.clone());
        }

        match message.verb {
            Verb::Start => {
                self.start(out);
                Ok(Step::Continue)
            }
            Verb::Node { name } => {
                trace!(node = %name, "roster announcement");
                self.roster.push(name);
                Ok(Step::Continue)
            }
            Verb::Sync { cmd, node, .. } => self.serve(&cmd, &node, out),
        }
    }

    /// Line to broadcast on a fault so peers are not left waiting forever.
    /// None until a first message has fixed the session prefix.
    pub fn crash_line(&self) -> Option<String> {
        self.prefix.as_deref().map(|prefix| broadcast_line(prefix, CMD_CRASH))
    }

    /// Begin the election: broadcast a token unique to this process
    /// instance. The echo of this token, tagged with a node name by the
    /// multiplexer, tells this process which roster entry it is.
    fn start(&mut self, out: &mut dyn Outbound) {
        let token = ephemera_token();
        self.broadcast(out, &format!("{EPHEMERA_PREFIX}{token}"));
        self.ephemera = Some(token);
    }

    fn serve(
        &mut self,
        cmd: &str,
        node: &str,
        out: &mut dyn Outbound,
    ) -> Result<Step, SessionError> {
        if let Some(value) = cmd.strip_prefix(EPHEMERA_PREFIX) {
            if self.ephemera.as_deref() == Some(value) {
                // Our own token came back: the tag is our node name.
                self.my_node = Some(node.to_string());

                let candidate = self.roster.first().ok_or(SessionError::EmptyRoster)?;
                if candidate == node {
                    debug!(node, "elected leader");
                    self.role = Some(Role::Leader);
                    self.lead(out)?;
                } else {
                    debug!(node, leader = %candidate, "following");
                    self.role = Some(Role::Follower);
                }
                return Ok(Step::Continue);
            }
        }

        // Suppress reprocessing of our own prior broadcasts.
        if self.my_node.as_deref() == Some(node) {
            return Ok(Step::Continue);
        }

        match cmd {
            CMD_PUSH => {
                // The leader pushed; reconcile, push our own changes along,
                // and tell the remaining nodes to pull.
                self.engine.pull().map_err(SessionError::Pull)?;
                self.engine.push_with_retry().map_err(SessionError::Push)?;
                self.broadcast(out, CMD_PULL);
                Ok(Step::Done(self.outcome()))
            }
            CMD_PULL => {
                self.engine.pull().map_err(SessionError::Pull)?;
                Ok(Step::Done(self.outcome()))
            }
            // Foreign tokens and peer CRASH notifications carry nothing
            // actionable for this node; the multiplexer owns session
            // teardown after a crash.
            _ => Ok(Step::Continue),
        }
    }

    fn lead(&mut self, out: &mut dyn Outbound) -> Result<(), SessionError> {
        info!("leading synchronization round");
        self.engine.push_with_retry().map_err(SessionError::Push)?;
        self.broadcast(out, CMD_PUSH);
        Ok(())
    }

    fn outcome(&self) -> Outcome {
        match self.role {
            Some(Role::Leader) => Outcome::LeaderDone,
            _ => Outcome::FollowerDone,
        }
    }

    fn broadcast(&self, out: &mut dyn Outbound, cmd: &str) {
        if let Some(prefix) = &self.prefix {
            out.send(broadcast_line(prefix, cmd));
        }
    }
}

/// A token unique to this process instance within the session: wall-clock
/// nanoseconds plus a random component.
fn ephemera_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    format!("{nanos}{}", Uuid::new_v4().simple())
}
