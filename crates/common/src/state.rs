// Per-repository state records, one table per host.

/// Snapshot of a single repository's state on one host.
///
/// `path` is stored home-relative (`~/...`) so records compare across hosts
/// with different home prefixes. `commits` counts commits reachable from
/// HEAD; it is a cheap proxy for history length, not proof of ancestry.
/// Records are immutable values; a new snapshot run supersedes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub path: String,
    pub head: String,
    pub hash: String,
    pub commits: u64,
    pub clean: bool,
}

/// One host's table of state records, in snapshot emission order.
pub type HostStateTable = Vec<StateRecord>;

/// Find the record for a repository path within a host's table.
pub fn find_record<'a>(table: &'a [StateRecord], path: &str) -> Option<&'a StateRecord> {
    table.iter().find(|record| record.path == path)
}
