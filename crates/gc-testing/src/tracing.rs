//! Evaluation tracing support.
//!
//! When the `tracing` feature is enabled, this module emits structured
//! spans and events for every evaluation. Without it the helpers compile to
//! nothing.

#[cfg(feature = "tracing")]
pub mod internal {
    use tracing::{span, Level};

    use crate::error::ConfigError;
    use crate::metrics::EvaluationMetrics;

    /// Span covering one evaluator call.
    pub fn evaluation_span(max_attempts: u32) -> span::Span {
        span!(Level::DEBUG, "reclaim_evaluation", max_attempts)
    }

    /// Log one force-and-check round.
    pub fn log_attempt(attempt: u32) {
        tracing::trace!(attempt, "collection_requested");
    }

    /// Log the result of an evaluation.
    pub fn log_outcome(metrics: &EvaluationMetrics) {
        tracing::debug!(
            achieved = metrics.achieved,
            attempts = metrics.attempts,
            elapsed_us = u64::try_from(metrics.elapsed.as_micros()).unwrap_or(u64::MAX),
            "evaluation_finished"
        );
    }

    /// Log an async evaluation abandoned through its cancellation token.
    pub fn log_cancelled(attempts: u32) {
        tracing::debug!(attempts, "evaluation_cancelled");
    }

    /// Log a malformed environment override.
    pub fn log_config_ignored(err: &ConfigError) {
        tracing::warn!(variable = err.variable, value = %err.value, "ignoring malformed override");
    }

    /// Log a sweep of the deferred test heap.
    pub fn log_sweep(swept: usize, still_retired: usize) {
        tracing::debug!(swept, still_retired, "heap_sweep");
    }
}

#[cfg(not(feature = "tracing"))]
pub mod internal {
    use crate::error::ConfigError;
    use crate::metrics::EvaluationMetrics;

    /// Stub function when tracing is disabled.
    #[inline]
    pub const fn log_attempt(_attempt: u32) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub const fn log_outcome(_metrics: &EvaluationMetrics) {}

    /// Stub function when tracing is disabled.
    #[inline]
    #[allow(dead_code)]
    pub const fn log_cancelled(_attempts: u32) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub const fn log_config_ignored(_err: &ConfigError) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub const fn log_sweep(_swept: usize, _still_retired: usize) {}
}

pub use internal::*;
