//! Evaluation metrics and statistics.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Statistics from one evaluator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationMetrics {
    /// Whether the predicate ended up holding.
    pub achieved: bool,
    /// Number of times the predicate was evaluated.
    pub attempts: u32,
    /// Number of collection requests issued.
    pub collections_requested: u32,
    /// Wall-clock duration of the evaluation.
    pub elapsed: Duration,
}

impl Default for EvaluationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationMetrics {
    /// Create a new `EvaluationMetrics` with all fields set to zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            achieved: false,
            attempts: 0,
            collections_requested: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Whether the cheap path was taken: the first check already held.
    #[must_use]
    pub const fn was_immediate(&self) -> bool {
        self.achieved && self.collections_requested == 0
    }
}

/// Bookkeeping for an in-flight evaluation.
///
/// Shared by the blocking and async evaluators so both report identically.
#[derive(Debug)]
pub(crate) struct Recorder {
    started: Instant,
    metrics: EvaluationMetrics,
}

impl Recorder {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
            metrics: EvaluationMetrics::new(),
        }
    }

    /// A budget of `u32::MAX` rounds evaluates `u32::MAX + 1` times.
    pub(crate) fn checked(&mut self) {
        self.metrics.attempts = self.metrics.attempts.saturating_add(1);
    }

    pub(crate) fn collection_requested(&mut self) {
        self.metrics.collections_requested += 1;
        crate::tracing::log_attempt(self.metrics.collections_requested);
    }

    pub(crate) const fn collections_requested(&self) -> u32 {
        self.metrics.collections_requested
    }

    /// Seal the evaluation, publish its metrics and return the outcome.
    pub(crate) fn finish(mut self, achieved: bool) -> bool {
        self.metrics.achieved = achieved;
        self.metrics.elapsed = self.started.elapsed();
        record(&self.metrics);
        crate::tracing::log_outcome(&self.metrics);
        achieved
    }
}

thread_local! {
    static LAST_METRICS: Cell<EvaluationMetrics> = const { Cell::new(EvaluationMetrics::new()) };
}

/// Get the metrics of the most recent evaluation on this thread.
///
/// Returns all-zero metrics if no evaluation has run on this thread yet.
#[must_use]
pub fn last_evaluation_metrics() -> EvaluationMetrics {
    LAST_METRICS.with(Cell::get)
}

/// Process-level cumulative evaluation statistics.
#[derive(Debug)]
pub struct GlobalMetrics {
    evaluations: AtomicUsize,
    achieved: AtomicUsize,
    exhausted: AtomicUsize,
    collections_requested: AtomicUsize,
}

impl Default for GlobalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalMetrics {
    /// Create a new `GlobalMetrics` with all counters initialized to zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            evaluations: AtomicUsize::new(0),
            achieved: AtomicUsize::new(0),
            exhausted: AtomicUsize::new(0),
            collections_requested: AtomicUsize::new(0),
        }
    }

    /// Returns the total number of evaluations performed.
    #[inline]
    #[must_use]
    pub fn total_evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Returns the number of evaluations whose predicate held.
    #[inline]
    #[must_use]
    pub fn total_achieved(&self) -> usize {
        self.achieved.load(Ordering::Relaxed)
    }

    /// Returns the number of evaluations that ran out of budget.
    #[inline]
    #[must_use]
    pub fn total_exhausted(&self) -> usize {
        self.exhausted.load(Ordering::Relaxed)
    }

    /// Returns the total number of collection requests issued.
    #[inline]
    #[must_use]
    pub fn total_collections_requested(&self) -> usize {
        self.collections_requested.load(Ordering::Relaxed)
    }
}

static GLOBAL_METRICS: GlobalMetrics = GlobalMetrics::new();

/// Get the global cumulative evaluation metrics.
///
/// # Example
///
/// ```
/// use gc_testing::global_metrics;
///
/// let metrics = global_metrics();
/// println!("Evaluations so far: {}", metrics.total_evaluations());
/// ```
#[must_use]
pub fn global_metrics() -> &'static GlobalMetrics {
    &GLOBAL_METRICS
}

fn record(metrics: &EvaluationMetrics) {
    LAST_METRICS.with(|last| last.set(*metrics));

    GLOBAL_METRICS.evaluations.fetch_add(1, Ordering::Relaxed);
    if metrics.achieved {
        GLOBAL_METRICS.achieved.fetch_add(1, Ordering::Relaxed);
    } else {
        GLOBAL_METRICS.exhausted.fetch_add(1, Ordering::Relaxed);
    }
    GLOBAL_METRICS
        .collections_requested
        .fetch_add(metrics.collections_requested as usize, Ordering::Relaxed);
}
