// Central Error Type for the Queue

use crate::domain::JobId;
use crate::port::BrokerError;
use thiserror::Error;

/// Queue-level error type
#[derive(Error, Debug)]
pub enum GoqError {
    #[error("Failed to queue status: no initialized client")]
    NoClient,

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Status not found for job {0}")]
    StatusNotFound(JobId),

    #[error("Failed to get status of job {id} : {source}")]
    StatusFetch {
        id: JobId,
        #[source]
        source: BrokerError,
    },

    #[error("Failed to unmarshal status of job {id} : {source}")]
    StatusDecode {
        id: JobId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Processor panicked on job {id}: {message}")]
    ProcessorPanicked { id: JobId, message: String },

    #[error("Circuit open after {failures} consecutive broker failures")]
    CircuitOpen { failures: u32 },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using GoqError
pub type Result<T> = std::result::Result<T, GoqError>;
