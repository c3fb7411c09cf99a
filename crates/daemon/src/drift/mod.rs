// Cross-host drift: detection over snapshot tables, mechanical remediation.

pub mod detector;
pub mod remediate;
