// Enqueue Use Case

use crate::application::status::StatusStore;
use crate::domain::{job_id_for, JobId, Status};
use crate::error::Result;
use crate::port::Broker;
use tracing::{debug, warn};

/// Execute enqueue use case
///
/// # Arguments
///
/// * `broker` - Broker holding the list
/// * `store` - Status store for the initial record
/// * `queue_name` - Broker list name
/// * `payload` - Raw job payload
///
/// The push is not rolled back when status initialisation fails; the entry
/// stays queued and a worker will later report it as missing its status.
pub async fn execute(
    broker: &dyn Broker,
    store: &StatusStore,
    queue_name: &str,
    payload: &str,
) -> Result<JobId> {
    broker.push(queue_name, payload).await?;

    let id = job_id_for(payload);
    if let Err(e) = store.save(&id, &Status::default()).await {
        warn!(
            job_id = %id,
            queue = %queue_name,
            error = %e,
            "Status initialisation failed, queued entry has no status"
        );
        return Err(e);
    }

    debug!(job_id = %id, queue = %queue_name, "Job enqueued");
    Ok(id)
}
