//! A sliding-time-window accumulator.
//!
//! A [`RollingCounter`] tracks the sum of values added over a trailing time
//! window using a fixed ring of buckets, each covering one bucket duration.
//! Buckets that age out of the window are zeroed lazily, on the next write,
//! rather than by a background timer.
pub mod error;
mod window_counter;

pub use self::{
    error::ConfigError,
    window_counter::RollingCounter,
};
use tokio::time::Duration;

/// Configures a [`RollingCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// The number of buckets in the ring.
    pub bucket_count: usize,
    /// The width of the time slice covered by each bucket.
    pub bucket_duration: Duration,
}

// === impl Config ===

impl Config {
    pub const DEFAULT_BUCKET_COUNT: usize = 10;
    pub const DEFAULT_BUCKET_DURATION: Duration = Duration::from_secs(1);

    /// Overrides the width of each bucket.
    pub fn with_bucket_duration(self, bucket_duration: Duration) -> Self {
        Self {
            bucket_duration,
            ..self
        }
    }

    /// Overrides the number of buckets in the ring.
    pub fn with_bucket_count(self, bucket_count: usize) -> Self {
        Self {
            bucket_count,
            ..self
        }
    }

    /// The total span covered by all live buckets.
    pub fn window(&self) -> Duration {
        let count = u32::try_from(self.bucket_count).unwrap_or(u32::MAX);
        self.bucket_duration.saturating_mul(count)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_count == 0 {
            return Err(ConfigError::ZeroBucketCount);
        }
        if self.bucket_duration.is_zero() {
            return Err(ConfigError::ZeroBucketDuration);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_count: Self::DEFAULT_BUCKET_COUNT,
            bucket_duration: Self::DEFAULT_BUCKET_DURATION,
        }
    }
}
