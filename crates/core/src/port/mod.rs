// Port Layer - Interfaces for external dependencies

pub mod broker;

// Re-exports
pub use broker::{Broker, BrokerError};
