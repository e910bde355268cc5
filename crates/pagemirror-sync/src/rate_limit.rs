//! Throttling of source and destination calls
//!
//! The replicator and reconciler await [`Throttle::acquire`] before every
//! block operation and the orchestrator before every document. The
//! default [`TokenBucket`] refills at `operations_per_second` with room
//! for `burst` immediate calls, so the default of 11 ops/sec and a burst
//! of 1 spaces calls about 90 ms apart. [`Unthrottled`] never waits.

use std::time::Duration;

use pagemirror_core::config::RateLimitingConfig;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Gate awaited before each rate-limited operation
#[async_trait::async_trait]
pub trait Throttle: Send + Sync {
    /// Waits until one more operation may proceed
    async fn acquire(&self);
}

/// A throttle that never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

#[async_trait::async_trait]
impl Throttle for Unthrottled {
    async fn acquire(&self) {}
}

#[derive(Debug)]
struct BucketState {
    /// Fractional so refill stays smooth between calls
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket limiter shared by every stage of a run
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    /// Tokens added per second
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket
    ///
    /// # Arguments
    /// * `capacity` - Maximum burst; at least 1
    /// * `refill_rate` - Tokens added per second; must be positive
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitingConfig) -> Self {
        Self::new(config.burst, config.operations_per_second as f64)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn refill(state: &mut BucketState, refill_rate: f64, capacity: u32) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * refill_rate).min(capacity as f64);
            state.last_refill = now;
        }
    }

    /// Takes a token if one is available without waiting
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        Self::refill(&mut state, self.refill_rate, self.capacity);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until the next token becomes available
    pub async fn time_until_available(&self) -> Duration {
        let mut state = self.state.lock().await;
        Self::refill(&mut state, self.refill_rate, self.capacity);
        self.wait_for(&state)
    }

    fn wait_for(&self, state: &BucketState) -> Duration {
        if state.tokens >= 1.0 || self.refill_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate)
    }
}

#[async_trait::async_trait]
impl Throttle for TokenBucket {
    async fn acquire(&self) {
        // A non-positive rate would never refill; treat it as unlimited.
        if self.refill_rate <= 0.0 {
            return;
        }
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                Self::refill(&mut state, self.refill_rate, self.capacity);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                self.wait_for(&state)
            };
            trace!(wait_ms = wait.as_millis() as u64, "Throttled");
            tokio::time::sleep(wait).await;
        }
    }
}
