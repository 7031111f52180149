// Queue constants (no magic values)
use std::time::Duration;

/// Capacity of the dispatcher -> worker buffer (pending payloads)
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Blocking-pop timeout; bounds how long shutdown waits on an idle broker
pub const DEFAULT_POP_TIMEOUT: Duration = Duration::from_secs(1);

/// First backoff delay after a broker failure
pub const DEFAULT_BACKOFF_BASE_DELAY: Duration = Duration::from_millis(100);

/// Backoff ceiling
pub const DEFAULT_BACKOFF_MAX_DELAY: Duration = Duration::from_secs(30);

/// Backoff growth per consecutive failure
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Consecutive failures before the circuit opens
pub const DEFAULT_CIRCUIT_THRESHOLD: u32 = 10;

/// Pause while the circuit is open
pub const DEFAULT_CIRCUIT_COOLDOWN: Duration = Duration::from_secs(30);
