pub mod chain;
pub mod filter;
pub mod service;
pub mod stats;

pub use chain::reconstruct_chain;
pub use filter::filter_traces;
pub use service::{AuditError, NewTrace, TraceService};
pub use stats::aggregate;
