// Queue Context - application-level owner of the shared broker handle

use crate::error::{GoqError, Result};
use crate::port::Broker;
use std::sync::{Arc, OnceLock};

/// Holds the one broker connection every `Queue` in the process shares.
///
/// Built once at startup and passed to each queue. Installing a second
/// broker is an error rather than a silent no-op.
#[derive(Default)]
pub struct QueueContext {
    broker: OnceLock<Arc<dyn Broker>>,
}

impl QueueContext {
    /// Context with no broker yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with `broker` already installed
    pub fn with_broker(broker: Arc<dyn Broker>) -> Self {
        let context = Self::new();
        let _ = context.broker.set(broker);
        context
    }

    /// Install the shared broker
    pub fn install(&self, broker: Arc<dyn Broker>) -> Result<()> {
        self.broker
            .set(broker)
            .map_err(|_| GoqError::Config("broker already installed in context".to_string()))
    }

    /// Shared broker, or `NoClient` if none was installed
    pub fn broker(&self) -> Result<Arc<dyn Broker>> {
        self.broker.get().cloned().ok_or(GoqError::NoClient)
    }

    pub fn is_connected(&self) -> bool {
        self.broker.get().is_some()
    }
}
