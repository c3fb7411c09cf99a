// Line-oriented control protocol for coordinated synchronization sessions.
//
// Sessions run under an external multiplexer that relays every broadcast
// line to every participant in sender order, including back to the sender
// itself. The first field of every line is an opaque session prefix; a
// process latches onto the first prefix it observes.
//
// Inbound:  `<prefix> START`
//           `<prefix> NODE <name>`
//           `<prefix> SYNC <cmd> <node> [<data>]`
// Outbound: `<prefix> SYNC <cmd>` with cmd one of EPHEMERA_<token>,
//           PUSH, PULL, CRASH.

use thiserror::Error;

/// Marker prefix for election-token commands.
pub const EPHEMERA_PREFIX: &str = "EPHEMERA_";

/// Leader's "remote updated, propagate" command.
pub const CMD_PUSH: &str = "PUSH";

/// Follower's "reconciled, remaining nodes pull" command.
pub const CMD_PULL: &str = "PULL";

/// Best-effort fault notification so peers do not wait forever.
pub const CMD_CRASH: &str = "CRASH";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid control line: {0:?}")]
    Invalid(String),

    #[error("control line {0:?}: expected more fields")]
    MissingFields(String),

    #[error("unexpected control verb in line: {0:?}")]
    UnknownVerb(String),
}

/// One parsed control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    /// Session prefix tying all messages of one session together.
    pub prefix: String,
    pub verb: Verb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// Begin the session: generate and broadcast an election token.
    Start,
    /// A node joined the roster.
    Node { name: String },
    /// A broadcast command, tagged with the node that relayed it.
    Sync { cmd: String, node: String, data: Option<String> },
}

impl ControlMessage {
    /// Parse one whitespace-separated control line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(ProtocolError::Invalid(line.to_string()));
        }

        let prefix = fields[0].to_string();
        let verb = match fields[1] {
            "START" => Verb::Start,
            "NODE" => match fields.get(2) {
                Some(name) => Verb::Node { name: (*name).to_string() },
                None => return Err(ProtocolError::MissingFields(line.to_string())),
            },
            "SYNC" => {
                if fields.len() < 4 {
                    return Err(ProtocolError::MissingFields(line.to_string()));
                }
                Verb::Sync {
                    cmd: fields[2].to_string(),
                    node: fields[3].to_string(),
                    data: fields.get(4).map(|field| (*field).to_string()),
                }
            }
            _ => return Err(ProtocolError::UnknownVerb(line.to_string())),
        };

        Ok(Self { prefix, verb })
    }
}

/// Render an outbound broadcast line: `<prefix> SYNC <cmd>`.
pub fn broadcast_line(prefix: &str, cmd: &str) -> String {
    format!("{prefix} SYNC {cmd}")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Parsing ────────────────────────────────────────────────────

    #[test]
    fn parses_start() {
        let msg = ControlMessage::parse("sess1 START").unwrap();
        assert_eq!(msg.prefix, "sess1");
        assert_eq!(msg.verb, Verb::Start);
    }

    #[test]
    fn parses_node() {
        let msg = ControlMessage::parse("sess1 NODE hostA").unwrap();
        assert_eq!(msg.verb, Verb::Node { name: "hostA".into() });
    }

    #[test]
    fn parses_sync_without_data() {
        let msg = ControlMessage::parse("sess1 SYNC PUSH hostA").unwrap();
        assert_eq!(
            msg.verb,
            Verb::Sync { cmd: "PUSH".into(), node: "hostA".into(), data: None }
        );
    }

    #[test]
    fn parses_sync_with_data() {
        let msg = ControlMessage::parse("sess1 SYNC EPHEMERA_17429 hostB extra").unwrap();
        assert_eq!(
            msg.verb,
            Verb::Sync {
                cmd: "EPHEMERA_17429".into(),
                node: "hostB".into(),
                data: Some("extra".into()),
            }
        );
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let msg = ControlMessage::parse("  sess1   NODE   hostA \n").unwrap();
        assert_eq!(msg.prefix, "sess1");
        assert_eq!(msg.verb, Verb::Node { name: "hostA".into() });
    }

    // ── Malformed lines ────────────────────────────────────────────

    #[test]
    fn rejects_short_lines() {
        assert_eq!(
            ControlMessage::parse("sess1"),
            Err(ProtocolError::Invalid("sess1".into()))
        );
        assert!(matches!(ControlMessage::parse(""), Err(ProtocolError::Invalid(_))));
    }

    #[test]
    fn rejects_node_without_name() {
        assert!(matches!(
            ControlMessage::parse("sess1 NODE"),
            Err(ProtocolError::MissingFields(_))
        ));
    }

    #[test]
    fn rejects_sync_without_node() {
        assert!(matches!(
            ControlMessage::parse("sess1 SYNC PUSH"),
            Err(ProtocolError::MissingFields(_))
        ));
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(matches!(
            ControlMessage::parse("sess1 HELLO world"),
            Err(ProtocolError::UnknownVerb(_))
        ));
    }

    // ── Output format ──────────────────────────────────────────────

    #[test]
    fn broadcast_line_format() {
        assert_eq!(broadcast_line("sess1", "PUSH"), "sess1 SYNC PUSH");
        assert_eq!(
            broadcast_line("sess1", "EPHEMERA_17429abc"),
            "sess1 SYNC EPHEMERA_17429abc"
        );
    }
}
