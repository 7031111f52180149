// Backoff policy for dispatcher broker failures
use crate::application::worker::constants::*;
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// What the dispatcher does after a failed pop
#[derive(Debug, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Sleep, then pop again
    Retry(Duration),
    /// Too many consecutive failures: report, sleep the cooldown, reset
    OpenCircuit(Duration),
}

/// Delay schedule for consecutive broker failures.
///
/// delay = min(base_delay * factor ^ (failures - 1), max_delay), with +/-10%
/// jitter when enabled. Reaching `circuit_threshold` opens the circuit for
/// `circuit_cooldown`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub jitter: bool,
    pub circuit_threshold: Option<u32>,
    pub circuit_cooldown: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BACKOFF_BASE_DELAY,
            max_delay: DEFAULT_BACKOFF_MAX_DELAY,
            factor: DEFAULT_BACKOFF_FACTOR,
            jitter: true,
            circuit_threshold: Some(DEFAULT_CIRCUIT_THRESHOLD),
            circuit_cooldown: DEFAULT_CIRCUIT_COOLDOWN,
        }
    }
}

impl BackoffPolicy {
    /// Retry immediately, never open the circuit
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1.0,
            jitter: false,
            circuit_threshold: None,
            circuit_cooldown: Duration::ZERO,
        }
    }

    /// Decide after the `failures`-th consecutive failure (1-based)
    pub fn decide(&self, failures: u32) -> BackoffDecision {
        if let Some(threshold) = self.circuit_threshold {
            if failures >= threshold {
                warn!(
                    failures = %failures,
                    cooldown_ms = %self.circuit_cooldown.as_millis(),
                    "Broker failure threshold reached, opening circuit"
                );
                return BackoffDecision::OpenCircuit(self.circuit_cooldown);
            }
        }
        BackoffDecision::Retry(self.delay_for(failures))
    }

    /// Backoff delay for the `failures`-th consecutive failure
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.factor.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());

        let jittered = if self.jitter && capped > 0.0 {
            // Spread retries of many clients hitting the same broker
            capped * rand::thread_rng().gen_range(0.9..=1.1)
        } else {
            capped
        };

        if jittered.is_finite() && jittered > 0.0 {
            Duration::from_secs_f64(jittered)
        } else {
            Duration::ZERO
        }
    }
}
