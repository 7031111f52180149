// Domain Layer - Job identity, status records and connection settings

pub mod connection;
pub mod job;

// Re-exports
pub use connection::ConnectionOptions;
pub use job::{job_id_for, status_key, JobId, Status, STATUS_KEY_PREFIX};
