// Queue Facade - configuration, enqueue, run and introspection

pub mod enqueue;

use crate::application::backoff::BackoffPolicy;
use crate::application::context::QueueContext;
use crate::application::dispatcher::Dispatcher;
use crate::application::processor::{ErrorHandler, Processor};
use crate::application::status::StatusStore;
use crate::application::worker::constants::{DEFAULT_BUFFER_CAPACITY, DEFAULT_POP_TIMEOUT};
use crate::application::worker::{shutdown_channel, ShutdownToken, Worker};
use crate::domain::{JobId, Status};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Queue depth snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_length: u64,
}

/// Queue configuration, fixed once the queue is built
#[derive(Clone)]
pub struct QueueOptions {
    /// Worker count
    pub concurrency: u8,
    /// Broker list name
    pub queue_name: String,
    pub processor: Arc<dyn Processor>,
    pub error_handler: ErrorHandler,
    /// Dispatch buffer size (pending payloads)
    pub buffer_capacity: usize,
    /// `None` blocks on the broker forever; shutdown then abandons the pop
    /// and may lose one payload the broker already removed
    pub pop_timeout: Option<Duration>,
    pub backoff: BackoffPolicy,
    /// Expiry applied to status records, `None` keeps them forever
    pub status_ttl: Option<Duration>,
}

impl QueueOptions {
    pub fn new(
        queue_name: impl Into<String>,
        processor: Arc<dyn Processor>,
        error_handler: ErrorHandler,
    ) -> Self {
        Self {
            concurrency: 1,
            queue_name: queue_name.into(),
            processor,
            error_handler,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            pop_timeout: Some(DEFAULT_POP_TIMEOUT),
            backoff: BackoffPolicy::default(),
            status_ttl: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: u8) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_pop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pop_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_status_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.status_ttl = ttl;
        self
    }
}

/// Public entry point: producer and worker pool for one broker list
pub struct Queue {
    context: Arc<QueueContext>,
    options: QueueOptions,
}

impl Queue {
    /// Build a queue on a shared context. Nothing is validated here; a
    /// missing broker surfaces as `NoClient` on first use.
    pub fn new(context: Arc<QueueContext>, options: QueueOptions) -> Self {
        Self { context, options }
    }

    pub fn name(&self) -> &str {
        &self.options.queue_name
    }

    fn status_store(&self) -> Result<StatusStore> {
        Ok(StatusStore::new(
            self.context.broker()?,
            self.options.status_ttl,
        ))
    }

    /// Current length of the broker list
    pub async fn queue_status(&self) -> Result<QueueStatus> {
        let broker = self.context.broker()?;
        let queue_length = broker.len(&self.options.queue_name).await?;
        Ok(QueueStatus { queue_length })
    }

    /// Push a payload and initialise its status, returns job id
    pub async fn enqueue(&self, payload: &str) -> Result<JobId> {
        let broker = self.context.broker()?;
        let store = self.status_store()?;
        enqueue::execute(broker.as_ref(), &store, &self.options.queue_name, payload).await
    }

    /// Stored status of any job by id
    pub async fn job_status(&self, id: &str) -> Result<Status> {
        self.status_store()?.load(id).await
    }

    /// Run dispatcher and workers until `shutdown` fires.
    ///
    /// On shutdown the dispatcher stops popping, workers drain what is
    /// already buffered, then this returns.
    pub async fn run(&self, shutdown: ShutdownToken) -> Result<()> {
        let broker = self.context.broker()?;
        let store = self.status_store()?;

        let capacity = if self.options.buffer_capacity == 0 {
            warn!(queue = %self.options.queue_name, "Buffer capacity 0 is not allowed, using 1");
            1
        } else {
            self.options.buffer_capacity
        };
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        if self.options.concurrency == 0 {
            warn!(queue = %self.options.queue_name, "Concurrency is 0: payloads will only accumulate in the buffer");
        }

        let mut workers = JoinSet::new();
        for index in 0..self.options.concurrency {
            let worker = Worker::new(
                usize::from(index),
                Arc::clone(&receiver),
                store.clone(),
                Arc::clone(&self.options.processor),
                Arc::clone(&self.options.error_handler),
            );
            workers.spawn(worker.run());
        }
        info!(
            queue = %self.options.queue_name,
            concurrency = self.options.concurrency,
            capacity = capacity,
            "Queue running"
        );

        Dispatcher::new(
            broker,
            self.options.queue_name.clone(),
            self.options.pop_timeout,
            self.options.backoff.clone(),
            Arc::clone(&self.options.error_handler),
            sender,
        )
        .run(shutdown)
        .await;

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(queue = %self.options.queue_name, error = ?e, "Worker task failed");
            }
        }
        info!(queue = %self.options.queue_name, "Queue stopped");
        Ok(())
    }

    /// Run with no shutdown path
    pub async fn run_forever(&self) -> Result<()> {
        let (_never, shutdown) = shutdown_channel();
        self.run(shutdown).await
    }
}
