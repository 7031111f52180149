// Application Layer - Queue facade, dispatch loop and worker pool

pub mod backoff;
pub mod context;
mod dispatcher;
pub mod job;
pub mod processor;
pub mod queue;
pub mod status;
pub mod worker;

// Re-exports
pub use backoff::{BackoffDecision, BackoffPolicy};
pub use context::QueueContext;
pub use job::Job;
pub use processor::{processor_fn, ErrorHandler, Processor};
pub use queue::{Queue, QueueOptions, QueueStatus};
pub use status::StatusStore;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken};
