//! Retry budget configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Default number of force-and-check rounds when waiting for a target to be
/// reclaimed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Default suspension between rounds.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(2);

/// Default number of force-and-check rounds used when asserting that a
/// target is *not* reclaimable.
pub const DEFAULT_PRESENCE_ATTEMPTS: u32 = 1;

/// Overrides [`RetryPolicy::max_attempts`].
pub const ENV_MAX_ATTEMPTS: &str = "GC_TESTING_MAX_ATTEMPTS";
/// Overrides [`RetryPolicy::pause`], in milliseconds.
pub const ENV_PAUSE_MS: &str = "GC_TESTING_PAUSE_MS";
/// Overrides [`RetryPolicy::presence_attempts`].
pub const ENV_PRESENCE_ATTEMPTS: &str = "GC_TESTING_PRESENCE_ATTEMPTS";

/// How hard the evaluator tries before giving up.
///
/// Collectors give no hard guarantee about when an unreachable object is
/// actually reclaimed relative to a collection request. A larger budget
/// tolerates more scheduling jitter; a smaller one makes a genuine leak fail
/// faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rounds of "request collection, pause, re-check" performed when the
    /// expected outcome is that the target disappears.
    pub max_attempts: u32,
    /// Suspension after each collection request. `Duration::ZERO` yields
    /// instead of sleeping.
    pub pause: Duration,
    /// Rounds performed when the expected outcome is that the target stays.
    ///
    /// Zero checks once without requesting any collection.
    pub presence_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// The built-in policy, ignoring the environment.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pause: DEFAULT_PAUSE,
            presence_attempts: DEFAULT_PRESENCE_ATTEMPTS,
        }
    }

    /// Returns a copy with `max_attempts` replaced.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns a copy with `pause` replaced.
    #[must_use]
    pub const fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Returns a copy with `presence_attempts` replaced.
    #[must_use]
    pub const fn with_presence_attempts(mut self, presence_attempts: u32) -> Self {
        self.presence_attempts = presence_attempts;
        self
    }

    /// Upper bound on the time spent sleeping by one evaluation.
    #[must_use]
    pub fn max_pause_total(&self) -> Duration {
        self.pause.saturating_mul(self.max_attempts)
    }

    /// The built-in policy with any `GC_TESTING_*` environment overrides
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but is not a
    /// non-negative integer.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::new().overlay(|name| std::env::var(name).ok())
    }

    /// Like [`try_from_env`](Self::try_from_env), but falls back to the
    /// built-in policy when a variable is malformed.
    #[must_use]
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|err| {
            crate::tracing::log_config_ignored(&err);
            Self::new()
        })
    }

    fn overlay(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_MAX_ATTEMPTS) {
            self.max_attempts = parse_count(ENV_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_PAUSE_MS) {
            let millis = value.trim().parse::<u64>().map_err(|_| ConfigError {
                variable: ENV_PAUSE_MS,
                value: value.clone(),
            })?;
            self.pause = Duration::from_millis(millis);
        }
        if let Some(value) = lookup(ENV_PRESENCE_ATTEMPTS) {
            self.presence_attempts = parse_count(ENV_PRESENCE_ATTEMPTS, &value)?;
        }
        Ok(self)
    }
}

fn parse_count(variable: &'static str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError {
        variable,
        value: value.to_owned(),
    })
}
