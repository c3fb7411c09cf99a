// Cross-host drift comparison over snapshot tables.
//
// Pure: takes every host's table, emits reports for the local host's
// repositories. Peers are visited in sorted host order so reason ordering
// is reproducible for a fixed input; display and tests rely on that.

use std::collections::BTreeMap;

use githerd_common::state::{find_record, HostStateTable};

/// A detected discrepancy for one repository, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    /// Home-relative repository path.
    pub path: String,
    /// Human-readable reasons, in detection order.
    pub reasons: Vec<String>,
    /// Local working tree cleanliness at snapshot time.
    pub clean: bool,
    /// True only if some peer is strictly ahead by commit count, the one
    /// case a mechanical pull can resolve.
    pub can_auto: bool,
}

/// Compare the local host's table against every peer table.
///
/// Per repository: local dirtiness is reported first (and never makes the
/// report auto-fixable); a peer strictly ahead by commit count adds a
/// `+N commits` reason and marks the report auto-fixable; a peer on a
/// different head name adds a quoted head reason (branch divergence needs a
/// human, not a pull). A peer's own dirtiness is not actionable from here
/// and is not reported.
pub fn detect(local_host: &str, machines: &BTreeMap<String, HostStateTable>) -> Vec<DriftReport> {
    let Some(local_table) = machines.get(local_host) else {
        return Vec::new();
    };

    let mut reports = Vec::new();

    for current in local_table {
        let mut reasons = Vec::new();
        let mut can_auto = false;

        if !current.clean {
            reasons.push(format!("{local_host}: dirty"));
        }

        for (host, table) in machines {
            if host == local_host {
                continue;
            }

            let Some(other) = find_record(table, &current.path) else {
                continue;
            };

            if other.commits > current.commits {
                can_auto = true;
                reasons.push(format!("{host}: +{} commits", other.commits - current.commits));
            } else if other.head != current.head {
                reasons.push(format!("{host}: {:?}", other.head));
            }
        }

        if !reasons.is_empty() {
            reports.push(DriftReport {
                path: current.path.clone(),
                reasons,
                clean: current.clean,
                can_auto,
            });
        }
    }

    reports
}
