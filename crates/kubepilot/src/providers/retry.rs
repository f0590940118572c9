//! Shared retry policy for chat completion providers.
//!
//! Transient failures (rate limits, 5xx, connect/timeout errors) back off
//! exponentially with jitter; terminal errors surface immediately.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Standard backoff for chat calls: 1s → 2s → 4s, 3 retries, with jitter.
pub fn chat_backoff() -> ExponentialBuilder {
    ExponentialBuilder::new()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(8))
        .with_factor(2.0)
        .with_jitter()
        .with_max_times(3)
}

/// Near-instant backoff so tests exercising the retry path stay fast.
#[cfg(test)]
pub fn test_backoff() -> ExponentialBuilder {
    ExponentialBuilder::new()
        .with_min_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(5))
        .with_max_times(3)
}
