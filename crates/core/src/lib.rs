// goq Core - Queue Logic & Broker Port
// NO broker client dependencies: adapters live in their own crates

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{
    processor_fn, shutdown_channel, BackoffPolicy, ErrorHandler, Job, Processor, Queue,
    QueueContext, QueueOptions, QueueStatus, ShutdownSender, ShutdownToken,
};
pub use domain::{job_id_for, status_key, ConnectionOptions, JobId, Status};
pub use error::{GoqError, Result};
pub use port::{Broker, BrokerError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
