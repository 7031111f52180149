// Processor & error handler seams supplied by the application

use crate::application::job::Job;
use crate::error::GoqError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Callback receiving dispatcher and worker errors.
///
/// Must not block: it runs inline on the dispatcher and worker tasks.
pub type ErrorHandler = Arc<dyn Fn(GoqError) + Send + Sync>;

/// Application code run once per dequeued job
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, job: Job);
}

struct FnProcessor<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Processor for FnProcessor<F>
where
    F: Fn(Job) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn process(&self, job: Job) {
        (self.f)(job).await
    }
}

/// Wrap an async closure as a `Processor`
///
/// # Example
/// ```text
/// let processor = processor_fn(|mut job: Job| async move {
///     let _ = job.set_status(1, 100).await;
/// });
/// ```
pub fn processor_fn<F, Fut>(f: F) -> Arc<dyn Processor>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnProcessor { f })
}
