pub mod entities;
pub mod interfaces;
pub mod sqlite;

pub use interfaces::{RecordError, TraceRecordRepository};
pub use sqlite::SqliteTraceRepository;
