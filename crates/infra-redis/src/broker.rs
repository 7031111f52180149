// Redis Broker Implementation

use crate::connection::{connection_info, map_redis_error};
use async_trait::async_trait;
use goq_core::port::{Broker, BrokerError};
use goq_core::{ConnectionOptions, GoqError, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Pause between command retries, multiplied by the attempt number
const RETRY_STEP: Duration = Duration::from_millis(50);

/// Smallest BLPOP timeout sent to the server (0 would mean "forever")
const MIN_POP_TIMEOUT_SECS: f64 = 0.01;

/// Broker backed by a Redis server.
///
/// Short commands round-robin over a fixed set of multiplexed connections.
/// Blocking pops each take a dedicated connection so a long BLPOP never
/// stalls status reads and writes pipelined behind it.
pub struct RedisBroker {
    client: Client,
    addr: String,
    connections: Vec<MultiplexedConnection>,
    next: AtomicUsize,
    blocking_idle: Mutex<Vec<MultiplexedConnection>>,
    max_retries: u32,
    dial_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl RedisBroker {
    /// Open the connection pool described by `options`
    pub async fn connect(options: &ConnectionOptions) -> Result<Self> {
        let client = Client::open(connection_info(options)?)
            .map_err(|e| GoqError::Config(format!("invalid redis settings: {}", e)))?;

        if let Some(idle) = options.idle_timeout {
            debug!(
                idle_timeout_ms = %idle.as_millis(),
                "Idle timeout not supported by multiplexed connections, ignoring"
            );
        }

        let pool_size = options.pool_size.max(1);
        let open_all = async {
            let mut connections = Vec::with_capacity(pool_size);
            for _ in 0..pool_size {
                connections.push(Self::open(&client, options.dial_timeout).await?);
            }
            Ok::<_, BrokerError>(connections)
        };
        let connections = timeout(options.pool_timeout, open_all)
            .await
            .map_err(|_| {
                BrokerError::Timeout(format!(
                    "opening {} connections to {} exceeded {:?}",
                    pool_size, options.addr, options.pool_timeout
                ))
            })??;

        info!(addr = %options.addr, db = options.db, pool_size = pool_size, "Connected to redis");

        Ok(Self {
            client,
            addr: options.addr.clone(),
            connections,
            next: AtomicUsize::new(0),
            blocking_idle: Mutex::new(Vec::new()),
            max_retries: options.max_retries,
            dial_timeout: options.dial_timeout,
            read_timeout: options.read_timeout,
            write_timeout: options.write_timeout,
        })
    }

    async fn open(
        client: &Client,
        dial_timeout: Duration,
    ) -> std::result::Result<MultiplexedConnection, BrokerError> {
        timeout(dial_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| BrokerError::Timeout(format!("dial exceeded {:?}", dial_timeout)))?
            .map_err(map_redis_error)
    }

    fn next_connection(&self) -> MultiplexedConnection {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[index].clone()
    }

    /// Run a short command with a deadline, retrying transient failures
    async fn command<T, F, Fut>(
        &self,
        op: &'static str,
        deadline: Duration,
        mut run: F,
    ) -> std::result::Result<T, BrokerError>
    where
        F: FnMut(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let result = match timeout(deadline, run(self.next_connection())).await {
                Ok(result) => result.map_err(map_redis_error),
                Err(_) => Err(BrokerError::Timeout(format!(
                    "{} exceeded {:?}",
                    op, deadline
                ))),
            };

            match result {
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    attempt += 1;
                    warn!(op = op, attempt = attempt, error = %e, "Retrying redis command");
                    sleep(RETRY_STEP * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn take_blocking_connection(
        &self,
    ) -> std::result::Result<MultiplexedConnection, BrokerError> {
        let idle = self
            .blocking_idle
            .lock()
            .map_err(|_| BrokerError::Connection("blocking pool lock poisoned".to_string()))?
            .pop();
        match idle {
            Some(conn) => Ok(conn),
            None => {
                debug!(addr = %self.addr, "Opening dedicated connection for blocking pop");
                Self::open(&self.client, self.dial_timeout).await
            }
        }
    }

    fn return_blocking_connection(&self, conn: MultiplexedConnection) {
        if let Ok(mut idle) = self.blocking_idle.lock() {
            idle.push(conn);
        }
    }
}

fn is_transient(err: &BrokerError) -> bool {
    matches!(err, BrokerError::Connection(_) | BrokerError::Timeout(_))
}

fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl Broker for RedisBroker {
    async fn push(&self, list: &str, value: &str) -> std::result::Result<(), BrokerError> {
        let _len: i64 = self
            .command("RPUSH", self.write_timeout, |mut conn| async move {
                conn.rpush(list, value).await
            })
            .await?;
        Ok(())
    }

    async fn push_front(&self, list: &str, value: &str) -> std::result::Result<(), BrokerError> {
        let _len: i64 = self
            .command("LPUSH", self.write_timeout, |mut conn| async move {
                conn.lpush(list, value).await
            })
            .await?;
        Ok(())
    }

    async fn blocking_pop(
        &self,
        list: &str,
        wait: Option<Duration>,
    ) -> std::result::Result<Option<(String, String)>, BrokerError> {
        let mut conn = self.take_blocking_connection().await?;
        let server_timeout = wait.map_or(0.0, |w| w.as_secs_f64().max(MIN_POP_TIMEOUT_SECS));

        let popped: RedisResult<Option<(String, String)>> = match wait {
            Some(w) => match timeout(w + self.read_timeout, conn.blpop(list, server_timeout)).await
            {
                Ok(result) => result,
                Err(_) => {
                    return Err(BrokerError::Timeout(format!(
                        "BLPOP reply not received within {:?}",
                        w + self.read_timeout
                    )))
                }
            },
            None => conn.blpop(list, server_timeout).await,
        };

        match popped {
            Ok(value) => {
                self.return_blocking_connection(conn);
                Ok(value)
            }
            // The connection is dropped rather than reused after a failure
            Err(e) => Err(map_redis_error(e)),
        }
    }

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, BrokerError> {
        self.command("GET", self.read_timeout, |mut conn| async move {
            conn.get(key).await
        })
        .await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), BrokerError> {
        self.command("SET", self.write_timeout, |mut conn| async move {
            match ttl {
                Some(ttl) => conn.set_ex(key, value, ttl_seconds(ttl)).await,
                None => conn.set(key, value).await,
            }
        })
        .await
    }

    async fn len(&self, list: &str) -> std::result::Result<u64, BrokerError> {
        let len: i64 = self
            .command("LLEN", self.read_timeout, |mut conn| async move {
                conn.llen(list).await
            })
            .await?;
        Ok(u64::try_from(len).unwrap_or(0))
    }
}

impl std::fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBroker")
            .field("addr", &self.addr)
            .field("pool_size", &self.connections.len())
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_rounds_up_to_whole_seconds() {
        assert_eq!(ttl_seconds(Duration::from_millis(1)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(2)), 2);
        assert_eq!(ttl_seconds(Duration::from_millis(2500)), 3);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&BrokerError::Timeout("t".into())));
        assert!(is_transient(&BrokerError::Connection("c".into())));
        assert!(!is_transient(&BrokerError::Command("x".into())));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_addr() {
        let result = RedisBroker::connect(&ConnectionOptions::new("nowhere")).await;
        assert!(matches!(result, Err(GoqError::Config(_))));
    }

    #[tokio::test]
    async fn test_connect_times_out_on_unreachable_host() {
        // TEST-NET-1 is never routed
        let options = ConnectionOptions {
            dial_timeout: Duration::from_millis(50),
            pool_timeout: Duration::from_millis(200),
            pool_size: 1,
            ..ConnectionOptions::new("192.0.2.1:6379")
        };
        let result = RedisBroker::connect(&options).await;
        assert!(matches!(result, Err(GoqError::Broker(_))));
    }
}
