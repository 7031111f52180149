// Broker Port (Interface)
// A remote list + key-value store: atomic push, blocking pop, get, set

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Broker errors
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

/// Broker trait
///
/// Every operation is individually atomic; goq never relies on multi-key
/// transactions. Implementations must be safe to share between the
/// dispatcher and all workers.
///
/// Implementations:
/// - RedisBroker (goq-infra-redis)
/// - mocks::MemoryBroker: in-process, for tests
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append `value` to the tail of `list`
    async fn push(&self, list: &str, value: &str) -> Result<(), BrokerError>;

    /// Prepend `value` to the head of `list`, so it is popped next
    async fn push_front(&self, list: &str, value: &str) -> Result<(), BrokerError>;

    /// Remove and return the head of `list`, waiting until one is available.
    ///
    /// Returns `(list, value)`, or `None` if `timeout` elapsed first.
    /// A `None` timeout waits forever.
    async fn blocking_pop(
        &self,
        list: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<(String, String)>, BrokerError>;

    /// Read a key, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>, BrokerError>;

    /// Upsert a key, optionally expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>)
        -> Result<(), BrokerError>;

    /// Current length of `list`
    async fn len(&self, list: &str) -> Result<u64, BrokerError>;
}

// ============================================================================
// In-memory Implementation for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct State {
        lists: HashMap<String, VecDeque<String>>,
        values: HashMap<String, String>,
        ttls: HashMap<String, Duration>,
    }

    /// In-process broker with fault injection.
    ///
    /// TTLs are recorded but keys never expire.
    #[derive(Default)]
    pub struct MemoryBroker {
        state: Mutex<State>,
        pushed: Notify,
        pop_faults: AtomicU32,
        get_faults: AtomicU32,
        set_faults: AtomicU32,
        pop_calls: AtomicUsize,
    }

    impl MemoryBroker {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the next `n` blocking pops with a connection error
        pub fn fail_next_pops(&self, n: u32) {
            self.pop_faults.store(n, Ordering::SeqCst);
        }

        /// Fail the next `n` gets with a connection error
        pub fn fail_next_gets(&self, n: u32) {
            self.get_faults.store(n, Ordering::SeqCst);
        }

        /// Fail the next `n` sets with a connection error
        pub fn fail_next_sets(&self, n: u32) {
            self.set_faults.store(n, Ordering::SeqCst);
        }

        /// Number of blocking pops that removed an element
        pub fn pop_calls(&self) -> usize {
            self.pop_calls.load(Ordering::SeqCst)
        }

        /// Snapshot of `list`, head first
        pub fn list(&self, list: &str) -> Vec<String> {
            self.lock()
                .lists
                .get(list)
                .map(|q| q.iter().cloned().collect())
                .unwrap_or_default()
        }

        /// TTL given by the last `set` of `key`, `None` if it was persistent
        pub fn ttl(&self, key: &str) -> Option<Duration> {
            self.lock().ttls.get(key).copied()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, State> {
            self.state.lock().expect("memory broker lock poisoned")
        }

        fn take_fault(counter: &AtomicU32) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn try_pop(&self, list: &str) -> Option<String> {
            let value = self.lock().lists.get_mut(list)?.pop_front()?;
            self.pop_calls.fetch_add(1, Ordering::SeqCst);
            Some(value)
        }

        async fn wait_pop(&self, list: &str) -> (String, String) {
            loop {
                let notified = self.pushed.notified();
                tokio::pin!(notified);
                // Register before checking so a concurrent push is not missed
                notified.as_mut().enable();
                if let Some(value) = self.try_pop(list) {
                    return (list.to_string(), value);
                }
                notified.await;
            }
        }
    }

    #[async_trait]
    impl Broker for MemoryBroker {
        async fn push(&self, list: &str, value: &str) -> Result<(), BrokerError> {
            self.lock()
                .lists
                .entry(list.to_string())
                .or_default()
                .push_back(value.to_string());
            self.pushed.notify_waiters();
            Ok(())
        }

        async fn push_front(&self, list: &str, value: &str) -> Result<(), BrokerError> {
            self.lock()
                .lists
                .entry(list.to_string())
                .or_default()
                .push_front(value.to_string());
            self.pushed.notify_waiters();
            Ok(())
        }

        async fn blocking_pop(
            &self,
            list: &str,
            timeout: Option<Duration>,
        ) -> Result<Option<(String, String)>, BrokerError> {
            if Self::take_fault(&self.pop_faults) {
                return Err(BrokerError::Connection("injected pop failure".to_string()));
            }
            match timeout {
                Some(limit) => Ok(tokio::time::timeout(limit, self.wait_pop(list)).await.ok()),
                None => Ok(Some(self.wait_pop(list).await)),
            }
        }

        async fn get(&self, key: &str) -> Result<Option<String>, BrokerError> {
            if Self::take_fault(&self.get_faults) {
                return Err(BrokerError::Connection("injected get failure".to_string()));
            }
            Ok(self.lock().values.get(key).cloned())
        }

        async fn set(
            &self,
            key: &str,
            value: &str,
            ttl: Option<Duration>,
        ) -> Result<(), BrokerError> {
            if Self::take_fault(&self.set_faults) {
                return Err(BrokerError::Connection("injected set failure".to_string()));
            }
            let mut state = self.lock();
            state.values.insert(key.to_string(), value.to_string());
            match ttl {
                Some(ttl) => state.ttls.insert(key.to_string(), ttl),
                None => state.ttls.remove(key),
            };
            Ok(())
        }

        async fn len(&self, list: &str) -> Result<u64, BrokerError> {
            Ok(self.lock().lists.get(list).map_or(0, |q| q.len() as u64))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::Arc;

        #[tokio::test]
        async fn test_push_pop_fifo() {
            let broker = MemoryBroker::new();
            broker.push("q", "a").await.unwrap();
            broker.push("q", "b").await.unwrap();
            assert_eq!(broker.len("q").await.unwrap(), 2);

            let first = broker.blocking_pop("q", None).await.unwrap();
            assert_eq!(first, Some(("q".to_string(), "a".to_string())));
            let second = broker.blocking_pop("q", None).await.unwrap();
            assert_eq!(second, Some(("q".to_string(), "b".to_string())));
            assert_eq!(broker.len("q").await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_push_front_is_popped_first() {
            let broker = MemoryBroker::new();
            broker.push("q", "b").await.unwrap();
            broker.push_front("q", "a").await.unwrap();
            assert_eq!(broker.list("q"), vec!["a".to_string(), "b".to_string()]);
        }

        #[tokio::test]
        async fn test_set_records_and_clears_ttl() {
            let broker = MemoryBroker::new();
            broker
                .set("k", "v", Some(Duration::from_secs(60)))
                .await
                .unwrap();
            assert_eq!(broker.ttl("k"), Some(Duration::from_secs(60)));

            broker.set("k", "v", None).await.unwrap();
            assert_eq!(broker.ttl("k"), None);
        }

        #[tokio::test]
        async fn test_pop_times_out_on_empty_list() {
            let broker = MemoryBroker::new();
            let popped = broker
                .blocking_pop("q", Some(Duration::from_millis(20)))
                .await
                .unwrap();
            assert!(popped.is_none());
        }

        #[tokio::test]
        async fn test_blocked_pop_wakes_on_push() {
            let broker = Arc::new(MemoryBroker::new());
            let waiter = {
                let broker = Arc::clone(&broker);
                tokio::spawn(async move { broker.blocking_pop("q", None).await })
            };
            tokio::time::sleep(Duration::from_millis(20)).await;
            broker.push("q", "late").await.unwrap();

            let popped = waiter.await.unwrap().unwrap();
            assert_eq!(popped, Some(("q".to_string(), "late".to_string())));
        }

        #[tokio::test]
        async fn test_injected_faults_are_consumed() {
            let broker = MemoryBroker::new();
            broker.fail_next_gets(1);
            assert!(broker.get("k").await.is_err());
            assert!(broker.get("k").await.unwrap().is_none());
        }
    }
}
