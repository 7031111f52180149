// Dispatcher - single blocking-pop loop feeding the worker buffer

use crate::application::backoff::{BackoffDecision, BackoffPolicy};
use crate::application::processor::ErrorHandler;
use crate::application::worker::{report, ShutdownToken};
use crate::error::GoqError;
use crate::port::Broker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Outcome of handing a payload to the buffer
enum Forward {
    Sent,
    Stopped,
}

/// Sole producer into the dispatch buffer.
///
/// List order is preserved into the buffer; workers may still finish out of
/// order.
pub(crate) struct Dispatcher {
    broker: Arc<dyn Broker>,
    queue_name: String,
    pop_timeout: Option<Duration>,
    backoff: BackoffPolicy,
    error_handler: ErrorHandler,
    sender: mpsc::Sender<String>,
}

impl Dispatcher {
    pub(crate) fn new(
        broker: Arc<dyn Broker>,
        queue_name: String,
        pop_timeout: Option<Duration>,
        backoff: BackoffPolicy,
        error_handler: ErrorHandler,
        sender: mpsc::Sender<String>,
    ) -> Self {
        Self {
            broker,
            queue_name,
            pop_timeout,
            backoff,
            error_handler,
            sender,
        }
    }

    /// Pop until shutdown. Dropping `self` on return closes the buffer.
    pub(crate) async fn run(self, mut shutdown: ShutdownToken) {
        info!(queue = %self.queue_name, "Dispatcher started");
        let mut failures: u32 = 0;

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            let popped = match self.pop_timeout {
                // A bounded pop is never abandoned mid-flight
                Some(_) => {
                    self.broker
                        .blocking_pop(&self.queue_name, self.pop_timeout)
                        .await
                }
                None => tokio::select! {
                    popped = self.broker.blocking_pop(&self.queue_name, None) => popped,
                    _ = shutdown.wait() => break,
                },
            };

            match popped {
                Ok(Some((_, payload))) => {
                    failures = 0;
                    if let Forward::Stopped = self.forward(payload, &mut shutdown).await {
                        break;
                    }
                }
                // Broker answered, so the failure streak is over
                Ok(None) => failures = 0,
                Err(e) => {
                    failures = failures.saturating_add(1);
                    warn!(queue = %self.queue_name, failures = %failures, error = %e, "Blocking pop failed");
                    report(&self.error_handler, GoqError::Broker(e));

                    let delay = match self.backoff.decide(failures) {
                        BackoffDecision::Retry(delay) => delay,
                        BackoffDecision::OpenCircuit(cooldown) => {
                            report(&self.error_handler, GoqError::CircuitOpen { failures });
                            failures = 0;
                            cooldown
                        }
                    };
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = sleep(delay) => {},
                            _ = shutdown.wait() => break,
                        }
                    }
                }
            }
        }

        info!(queue = %self.queue_name, "Dispatcher stopped");
    }

    /// Wait for buffer space, then send. Blocks while the buffer is full.
    async fn forward(&self, payload: String, shutdown: &mut ShutdownToken) -> Forward {
        let permit = tokio::select! {
            permit = self.sender.reserve() => permit,
            _ = shutdown.wait() => {
                self.requeue(payload).await;
                return Forward::Stopped;
            }
        };

        match permit {
            Ok(permit) => {
                permit.send(payload);
                Forward::Sent
            }
            Err(_) => {
                warn!(queue = %self.queue_name, "Worker pool gone, stopping dispatcher");
                self.requeue(payload).await;
                Forward::Stopped
            }
        }
    }

    /// Return a popped payload to the list head so it is next on restart
    async fn requeue(&self, payload: String) {
        match self.broker.push_front(&self.queue_name, &payload).await {
            Ok(()) => debug!(queue = %self.queue_name, "Returned undelivered payload to queue"),
            Err(e) => report(&self.error_handler, GoqError::Broker(e)),
        }
    }
}
