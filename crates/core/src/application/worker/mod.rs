// Worker - drains the dispatch buffer and runs the processor

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{execute_guarded, execute_guarded_async, PanicGuardResult};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::job::Job;
use crate::application::processor::{ErrorHandler, Processor};
use crate::application::status::StatusStore;
use crate::domain::job_id_for;
use crate::error::GoqError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Receiving half of the dispatch buffer, shared by every worker
pub(crate) type SharedReceiver = Arc<Mutex<mpsc::Receiver<String>>>;

/// Hand an error to the user's handler without letting a panicking handler
/// take down the calling task
pub(crate) fn report(handler: &ErrorHandler, err: GoqError) {
    if let PanicGuardResult::Panicked(msg) = execute_guarded(AssertUnwindSafe(|| handler(err))) {
        error!(panic_msg = %msg, "Error handler panicked");
    }
}

/// One member of the worker pool
pub(crate) struct Worker {
    index: usize,
    receiver: SharedReceiver,
    store: StatusStore,
    processor: Arc<dyn Processor>,
    error_handler: ErrorHandler,
}

impl Worker {
    pub(crate) fn new(
        index: usize,
        receiver: SharedReceiver,
        store: StatusStore,
        processor: Arc<dyn Processor>,
        error_handler: ErrorHandler,
    ) -> Self {
        Self {
            index,
            receiver,
            store,
            processor,
            error_handler,
        }
    }

    /// Run until the buffer is closed and drained
    pub(crate) async fn run(self) {
        debug!(worker = self.index, "Worker started");
        loop {
            // Lock only for the receive so other workers can take the next payload
            let next = self.receiver.lock().await.recv().await;
            let Some(payload) = next else {
                break;
            };
            self.process_payload(payload).await;
        }
        debug!(worker = self.index, "Worker stopped");
    }

    /// Process one payload (returns true if the processor ran to completion)
    pub(crate) async fn process_payload(&self, payload: String) -> bool {
        let id = job_id_for(&payload);

        let status = match self.store.load_for_worker(&id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(worker = self.index, job_id = %id, error = %e, "Dropping job without usable status");
                report(&self.error_handler, e);
                return false;
            }
        };

        info!(worker = self.index, job_id = %id, status = %status, "Processing job");
        let job = Job::new(id.clone(), payload, status, self.store.clone());

        match execute_guarded_async(self.processor.process(job)).await {
            PanicGuardResult::Success(()) => {
                debug!(worker = self.index, job_id = %id, "Job processed");
                true
            }
            PanicGuardResult::Panicked(message) => {
                report(
                    &self.error_handler,
                    GoqError::ProcessorPanicked { id, message },
                );
                false
            }
        }
    }
}
