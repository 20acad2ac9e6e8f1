/// Errors returned when a [`Config`](crate::Config) cannot back a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("bucket count must be greater than 0")]
    ZeroBucketCount,
    #[error("bucket duration must be greater than 0")]
    ZeroBucketDuration,
}
