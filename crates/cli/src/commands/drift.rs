// `githerd drift`: list discrepancies against peer hosts.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Args;

use githerd_common::statefile;
use githerd_daemon::drift::detector::{detect, DriftReport};

use super::{host_context, HostContext};

#[derive(Args)]
pub struct DriftArgs {
    /// Compare as this host instead of the local hostname
    #[arg(long)]
    pub hostname: Option<String>,
}

pub fn run(args: DriftArgs) -> Result<()> {
    let ctx = host_context(args.hostname)?;
    let reports = load_reports(&ctx)?;
    print!("{}", render(&reports));
    Ok(())
}

/// Read every host's table from the state directory and detect drift for
/// the local host. An unreadable or malformed table is fatal.
pub(crate) fn load_reports(ctx: &HostContext) -> Result<Vec<DriftReport>> {
    let mut machines = BTreeMap::new();
    for host in
        statefile::list_hosts(&ctx.state_dir).context("unable to list state directory")?
    {
        let table = statefile::read(&ctx.state_dir, &host)
            .with_context(|| format!("unable to read state for host {host:?}"))?;
        machines.insert(host, table);
    }

    Ok(detect(&ctx.hostname, &machines))
}

/// Two-column listing, then the auto-fixable subset.
fn render(reports: &[DriftReport]) -> String {
    let width = reports.iter().map(|report| report.path.len()).max().unwrap_or(0);

    let mut out = String::new();
    for report in reports {
        out.push_str(&format!("{:<width$} {}\n", report.path, report.reasons.join(", ")));
    }

    if reports.iter().any(|report| report.can_auto) {
        out.push_str("\nCan automatically fix the following:\n");
        for report in reports.iter().filter(|report| report.can_auto) {
            out.push_str(&format!("{:<width$} {}\n", report.path, report.reasons.join(", ")));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(path: &str, reasons: Vec<&str>, can_auto: bool) -> DriftReport {
        DriftReport {
            path: path.into(),
            reasons: reasons.into_iter().map(String::from).collect(),
            clean: true,
            can_auto,
        }
    }

    #[test]
    fn render_aligns_paths_and_joins_reasons() {
        let reports = vec![
            report("~/proj", vec!["hostA: +2 commits"], true),
            report("~/dotfiles", vec!["localhost: dirty", "hostB: \"feature\""], false),
        ];

        let out = render(&reports);
        assert!(out.contains("~/proj     hostA: +2 commits\n"));
        assert!(out.contains("~/dotfiles localhost: dirty, hostB: \"feature\"\n"));
    }

    #[test]
    fn render_lists_auto_fixable_subset() {
        let reports = vec![
            report("~/proj", vec!["hostA: +2 commits"], true),
            report("~/notes", vec!["hostB: \"feature\""], false),
        ];

        let out = render(&reports);
        let fixable = out.split("Can automatically fix the following:").nth(1).unwrap();
        assert!(fixable.contains("~/proj"));
        assert!(!fixable.contains("~/notes"));
    }

    #[test]
    fn render_without_auto_fixable_omits_footer() {
        let reports = vec![report("~/notes", vec!["hostB: \"feature\""], false)];
        let out = render(&reports);
        assert!(!out.contains("Can automatically fix"));
    }

    #[test]
    fn render_empty_is_empty() {
        assert_eq!(render(&[]), "");
    }
}
