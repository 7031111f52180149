// Status Store - job identity -> {code, progress} via broker keys

use crate::domain::{status_key, Status};
use crate::error::{GoqError, Result};
use crate::port::Broker;
use std::sync::Arc;
use std::time::Duration;

/// Reads and writes status records under `goq:queue:job:status:<id>`
#[derive(Clone)]
pub struct StatusStore {
    broker: Arc<dyn Broker>,
    ttl: Option<Duration>,
}

impl StatusStore {
    /// `ttl` of `None` keeps records until they are purged externally
    pub fn new(broker: Arc<dyn Broker>, ttl: Option<Duration>) -> Self {
        Self { broker, ttl }
    }

    /// Overwrite the record of `id` (last writer wins)
    pub async fn save(&self, id: &str, status: &Status) -> Result<()> {
        let json = status.to_json()?;
        self.broker.set(&status_key(id), &json, self.ttl).await?;
        Ok(())
    }

    /// Read the record of `id`
    pub async fn load(&self, id: &str) -> Result<Status> {
        match self.broker.get(&status_key(id)).await? {
            Some(raw) => Ok(Status::from_json(&raw)?),
            None => Err(GoqError::StatusNotFound(id.to_string())),
        }
    }

    /// Same as `load`, with errors naming the job for the error handler
    pub(crate) async fn load_for_worker(&self, id: &str) -> Result<Status> {
        let raw = self
            .broker
            .get(&status_key(id))
            .await
            .map_err(|source| GoqError::StatusFetch {
                id: id.to_string(),
                source,
            })?
            .ok_or_else(|| GoqError::StatusNotFound(id.to_string()))?;

        Status::from_json(&raw).map_err(|source| GoqError::StatusDecode {
            id: id.to_string(),
            source,
        })
    }
}
