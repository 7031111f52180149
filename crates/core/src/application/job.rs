// Job handle given to the processor

use crate::application::status::StatusStore;
use crate::domain::{JobId, Status};
use crate::error::Result;
use serde::de::DeserializeOwned;

/// A dequeued job: identity, raw payload and its status record.
///
/// Lives for one processor invocation. Status changes are written through to
/// the broker immediately.
pub struct Job {
    id: JobId,
    payload: String,
    status: Status,
    store: StatusStore,
}

impl Job {
    pub(crate) fn new(id: JobId, payload: String, status: Status, store: StatusStore) -> Self {
        Self {
            id,
            payload,
            status,
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw payload as it was enqueued
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Decode the payload as JSON
    pub fn payload_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.payload)?)
    }

    /// In-memory status, as of the last load or update
    pub fn status(&self) -> Status {
        self.status
    }

    /// Record progress for this job.
    ///
    /// No concurrency control: jobs sharing an identity overwrite each other.
    pub async fn set_status(&mut self, code: u8, progress: u8) -> Result<()> {
        self.status = Status::new(code, progress);
        self.store.save(&self.id, &self.status).await
    }

    /// Reload the stored status, replacing the in-memory copy
    pub async fn get_status(&mut self) -> Result<Status> {
        self.status = self.store.load(&self.id).await?;
        Ok(self.status)
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job_id_for;
    use crate::error::GoqError;
    use crate::port::broker::mocks::MemoryBroker;
    use crate::port::Broker;
    use std::sync::Arc;

    fn job(payload: &str) -> (Arc<MemoryBroker>, Job) {
        let broker = Arc::new(MemoryBroker::new());
        let store = StatusStore::new(broker.clone(), None);
        let job = Job::new(
            job_id_for(payload),
            payload.to_string(),
            Status::default(),
            store,
        );
        (broker, job)
    }

    #[tokio::test]
    async fn test_set_then_get_status() {
        let (_, mut job) = job(r#"{"task":"resize"}"#);
        job.set_status(1, 100).await.unwrap();
        assert_eq!(job.status(), Status::new(1, 100));
        assert_eq!(job.get_status().await.unwrap(), Status::new(1, 100));
    }

    #[tokio::test]
    async fn test_get_status_replaces_in_memory_copy() {
        let (broker, mut job) = job("p");
        job.set_status(1, 10).await.unwrap();

        let key = crate::domain::status_key(job.id());
        broker
            .set(&key, r#"{"Code":2,"Progress":90}"#, None)
            .await
            .unwrap();

        assert_eq!(job.get_status().await.unwrap(), Status::new(2, 90));
        assert_eq!(job.status(), Status::new(2, 90));
    }

    #[tokio::test]
    async fn test_get_status_fails_when_absent_or_malformed() {
        let (broker, mut job) = job("p");
        assert!(matches!(
            job.get_status().await,
            Err(GoqError::StatusNotFound(_))
        ));

        let key = crate::domain::status_key(job.id());
        broker.set(&key, "garbage", None).await.unwrap();
        assert!(matches!(
            job.get_status().await,
            Err(GoqError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_payload_json() {
        let (_, job) = job(r#"{"task":"resize"}"#);
        let value: serde_json::Value = job.payload_json().unwrap();
        assert_eq!(value["task"], "resize");
    }
}
