pub mod context;
pub mod ledger;
pub mod queue;
pub mod replicate;

pub use context::RequestContext;
pub use ledger::{LedgerEntry, LedgerSnapshot, ReplicationLedger};
pub use queue::{IndexQueue, JobOptions, QueuedJob, RecordingQueue};
pub use replicate::ReplicationEngine;
