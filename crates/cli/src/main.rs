//! goq CLI - enqueue jobs, inspect queues and run a worker pool

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use goq_core::domain::connection::DEFAULT_ADDR;
use goq_core::{
    processor_fn, shutdown_channel, ConnectionOptions, ErrorHandler, Job, Queue, QueueContext,
    QueueOptions,
};
use goq_infra_redis::RedisBroker;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_QUEUE: &str = "goq:default";

#[derive(Parser)]
#[command(name = "goq")]
#[command(about = "Redis-backed job queue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Broker list holding the queue
    #[arg(long, global = true, env = "GOQ_QUEUE", default_value = DEFAULT_QUEUE)]
    queue: String,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Redis address (host:port)
    #[arg(long, global = true, env = "GOQ_REDIS_ADDR", default_value = DEFAULT_ADDR)]
    addr: String,

    /// Redis password
    #[arg(long, global = true, env = "GOQ_REDIS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Logical database index
    #[arg(long, global = true, env = "GOQ_REDIS_DB", default_value = "0")]
    db: i64,

    /// Retries for failed commands
    #[arg(long, global = true, env = "GOQ_MAX_RETRIES", default_value = "0")]
    max_retries: u32,

    /// Connections in the command pool
    #[arg(long, global = true, env = "GOQ_POOL_SIZE", default_value = "10")]
    pool_size: usize,

    /// Dial timeout in milliseconds
    #[arg(long, global = true, env = "GOQ_DIAL_TIMEOUT_MS", default_value = "5000")]
    dial_timeout_ms: u64,
}

impl ConnectionArgs {
    fn to_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            password: self.password.clone(),
            db: self.db,
            max_retries: self.max_retries,
            pool_size: self.pool_size,
            dial_timeout: Duration::from_millis(self.dial_timeout_ms),
            ..ConnectionOptions::new(self.addr.clone())
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue a job payload and print its id
    Enqueue {
        /// Payload, usually a JSON document
        payload: String,
    },

    /// Show the queue length
    Status,

    /// Show the status record of a job
    Job {
        /// Job id returned by enqueue
        id: String,
    },

    /// Run a worker pool until Ctrl+C
    Work {
        /// Number of workers
        #[arg(short, long, env = "GOQ_CONCURRENCY", default_value = "1")]
        concurrency: u8,

        /// Dispatch buffer capacity
        #[arg(long, default_value = "1000")]
        buffer: usize,

        /// Expire status records after this many seconds
        #[arg(long)]
        status_ttl_secs: Option<u64>,
    },
}

/// Initialize logging: pretty or JSON to stdout, plus an optional daily file
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("GOQ_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers = vec![match log_format.as_str() {
        // Production: JSON structured logging
        "json" => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        _ => fmt::layer().pretty().boxed(),
    }];

    let guard = match std::env::var("GOQ_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "goq.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().json().with_writer(writer).boxed());
            Some(guard)
        }
        Err(_) => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging();

    let options = cli.connection.to_options();
    let broker = RedisBroker::connect(&options)
        .await
        .with_context(|| format!("failed to connect to redis at {}", options.addr))?;
    let context = Arc::new(QueueContext::with_broker(Arc::new(broker)));

    match cli.command {
        Commands::Enqueue { payload } => {
            let queue = Queue::new(context, worker_options(&cli.queue, 1, 1000, None));
            let id = queue.enqueue(&payload).await.context("enqueue failed")?;
            println!("{}", id);
        }
        Commands::Status => {
            let queue = Queue::new(context, worker_options(&cli.queue, 1, 1000, None));
            let status = queue.queue_status().await.context("queue status failed")?;
            println!("{}", serde_json::to_string(&status)?);
        }
        Commands::Job { id } => {
            let queue = Queue::new(context, worker_options(&cli.queue, 1, 1000, None));
            let status = queue.job_status(&id).await.context("job status failed")?;
            println!("{}", serde_json::to_string(&status)?);
        }
        Commands::Work {
            concurrency,
            buffer,
            status_ttl_secs,
        } => {
            let ttl = status_ttl_secs.map(Duration::from_secs);
            let queue = Queue::new(
                context,
                worker_options(&cli.queue, concurrency, buffer, ttl),
            );

            let (shutdown_tx, shutdown_rx) = shutdown_channel();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received. Draining workers...");
                    shutdown_tx.shutdown();
                }
            });

            info!(queue = %queue.name(), concurrency = concurrency, "Worker pool ready");
            queue.run(shutdown_rx).await.context("worker pool failed")?;
            info!("Shutdown complete.");
        }
    }

    Ok(())
}

/// Queue options for the built-in processor: log the job, mark it done
fn worker_options(queue: &str, concurrency: u8, buffer: usize, ttl: Option<Duration>) -> QueueOptions {
    let processor = processor_fn(|mut job: Job| async move {
        info!(job_id = %job.id(), payload = %job.payload(), "Received job");
        if let Err(e) = job.set_status(1, 100).await {
            error!(job_id = %job.id(), error = %e, "Failed to mark job done");
        }
    });
    let error_handler: ErrorHandler = Arc::new(|e| error!(error = %e, "Queue error"));

    QueueOptions::new(queue, processor, error_handler)
        .with_concurrency(concurrency)
        .with_buffer_capacity(buffer)
        .with_status_ttl(ttl)
}
