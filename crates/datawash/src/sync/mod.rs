//! Transport layer that keeps the dashboard in step with a running job.
//!
//! One channel per job: WebSocket push preferred, HTTP polling as the
//! fallback, the demo script as a third source behind the same seam.

pub mod channel;
pub mod probe;

pub use channel::{JobSyncChannel, SyncMessage, DEFAULT_POLL_INTERVAL};
pub use probe::{DemoStatusProbe, HttpStatusProbe, StatusProbe};
