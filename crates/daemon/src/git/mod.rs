// Git subprocess plumbing: worker and the sync pipeline.

pub mod sync;
pub mod worker;
