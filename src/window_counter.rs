use crate::{Config, ConfigError};
use parking_lot::RwLock;
use tokio::time::{Duration, Instant};

/// Tracks the sum of values added over a trailing window of
/// `bucket_count * bucket_duration`.
///
/// Values land in the bucket for the current time slice. When a write
/// observes that one or more whole slices have elapsed since the last
/// advance, the ring steps forward and every bucket it passes over is
/// zeroed. Reads compute the same advance but never apply it, so a counter
/// that has been idle for longer than its window reads as zero even though
/// its buckets are only physically cleared by the next write.
///
/// A `RollingCounter` may be shared freely between threads.
#[derive(Debug)]
pub struct RollingCounter {
    config: Config,
    state: RwLock<State>,
}

#[derive(Debug)]
struct State {
    buckets: Box<[Bucket]>,
    current: usize,
    last_advance: Instant,
}

/// The sum of everything added during one time slice.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct Bucket {
    value: f64,
}

// === impl RollingCounter ===

impl RollingCounter {
    /// Returns a counter with ten one-second buckets.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Returns a counter using the given `config`.
    ///
    /// # Panics
    ///
    /// If `config` has a bucket count or bucket duration of zero. Use
    /// [`RollingCounter::try_with_config`] to handle this as an error
    /// instead.
    pub fn with_config(config: Config) -> Self {
        match Self::try_with_config(config) {
            Ok(counter) => counter,
            Err(error) => panic!("invalid rolling counter config ({config:?}): {error}"),
        }
    }

    pub fn try_with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(
            bucket_count = config.bucket_count,
            bucket_duration = ?config.bucket_duration,
            "created rolling counter"
        );
        Ok(RollingCounter {
            config,
            state: RwLock::new(State::new(config.bucket_count, Instant::now())),
        })
    }

    /// Adds `value` to the bucket for the current time slice.
    ///
    /// Adding `0.0` returns immediately without advancing the window: buckets
    /// that have aged out stay in place until the next non-zero add, although
    /// [`sum`](Self::sum) already excludes them.
    pub fn add(&self, value: f64) {
        if value == 0.0 {
            return;
        }

        let now = Instant::now();
        let mut state = self.state.write();
        state.current_bucket(now, self.config.bucket_duration).value += value;
    }

    /// Returns the sum of all values added within the trailing window.
    ///
    /// This never mutates the counter.
    pub fn sum(&self) -> f64 {
        let now = Instant::now();
        self.state.read().sum(now, self.config.bucket_duration)
    }

    /// Zeroes every bucket and restarts the window at the current instant.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut state = self.state.write();
        state.buckets.fill(Bucket::default());
        state.current = 0;
        state.last_advance = now;
        tracing::trace!("rolling counter reset");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The trailing span summed by [`sum`](Self::sum).
    pub fn window(&self) -> Duration {
        self.config.window()
    }
}

impl Default for RollingCounter {
    fn default() -> Self {
        Self::new()
    }
}

// === impl State ===

impl State {
    fn new(bucket_count: usize, now: Instant) -> Self {
        State {
            buckets: vec![Bucket::default(); bucket_count].into_boxed_slice(),
            current: 0,
            last_advance: now,
        }
    }

    /// Advances the ring to the slice containing `now`, zeroing every bucket
    /// passed over, and returns the now-current bucket.
    fn current_bucket(&mut self, now: Instant, bucket_duration: Duration) -> &mut Bucket {
        let len = self.buckets.len();
        let elapsed = elapsed_slices(self.last_advance, now, bucket_duration);

        // still within the same slice, nothing to do.
        if elapsed == 0 {
            return &mut self.buckets[self.current];
        }

        // restarts from `now` rather than the slice boundary, so sub-slice
        // remainders are dropped.
        self.last_advance = now;

        let old = self.current;
        self.current = step(old, elapsed, len);

        // past `len` slices every bucket has already been visited once.
        let resets = clamp(elapsed, len);
        for i in 1..=resets {
            self.buckets[(old + i) % len].reset();
        }

        tracing::trace!(
            elapsed_slices = %elapsed,
            reset = resets,
            index = self.current,
            "advanced rolling window"
        );

        &mut self.buckets[self.current]
    }

    /// Sums the buckets still inside the window as of `now`, without applying
    /// the advance.
    fn sum(&self, now: Instant, bucket_duration: Duration) -> f64 {
        let len = self.buckets.len();
        let elapsed = elapsed_slices(self.last_advance, now, bucket_duration);
        let next = step(self.current, elapsed, len);
        let live = len - clamp(elapsed, len);

        (1..=live)
            .map(|i| self.buckets[(next + i) % len].value)
            .sum()
    }
}

// === impl Bucket ===

impl Bucket {
    fn reset(&mut self) {
        self.value = 0.0;
    }
}

/// The number of whole `bucket_duration`s between `since` and `now`.
#[inline]
fn elapsed_slices(since: Instant, now: Instant, bucket_duration: Duration) -> u128 {
    now.saturating_duration_since(since).as_nanos() / bucket_duration.as_nanos()
}

/// The index reached by moving `elapsed` slots forward from `index`.
#[inline]
fn step(index: usize, elapsed: u128, len: usize) -> usize {
    // `elapsed % len` is always less than `len`, so the cast is lossless.
    let offset = (elapsed % len as u128) as usize;
    (index + offset) % len
}

#[inline]
fn clamp(elapsed: u128, len: usize) -> usize {
    usize::try_from(elapsed).map_or(len, |elapsed| elapsed.min(len))
}
