//! GC-forcing predicate evaluator.
//!
//! Collectors give no promise about *when* an unreachable object is actually
//! reclaimed. A single check after a single collection request is flaky; an
//! unbounded wait hangs the test suite on a genuine leak. [`Reclaimer`] sits
//! in between: it re-checks a predicate after each of a bounded number of
//! collection requests.

use std::thread;
use std::time::Duration;

use crate::collector::{Collector, RefCounting};
use crate::config::RetryPolicy;
use crate::error::ReclaimError;
use crate::metrics::Recorder;

/// Drives a [`Collector`] until a predicate holds or the retry budget runs
/// out.
///
/// All reclaimability assertions are methods on this type. The blocking
/// evaluator suspends the calling thread between rounds; see
/// [`AsyncReclaimer`](crate::tokio::AsyncReclaimer) for the cooperative
/// variant.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use gc_testing::Reclaimer;
///
/// let reclaimer = Reclaimer::default();
/// let value = Arc::new(vec![1, 2, 3]);
/// let weak = Arc::downgrade(&value);
///
/// reclaimer.assert_target_only_reclaimable_after(&weak, || drop(value));
/// ```
#[derive(Debug, Clone)]
pub struct Reclaimer<C = RefCounting> {
    collector: C,
    policy: RetryPolicy,
}

impl Default for Reclaimer<RefCounting> {
    fn default() -> Self {
        Self::new(RefCounting)
    }
}

impl<C: Collector> Reclaimer<C> {
    /// Creates a reclaimer for `collector` using [`RetryPolicy::from_env`].
    #[must_use]
    pub fn new(collector: C) -> Self {
        Self::with_policy(collector, RetryPolicy::from_env())
    }

    /// Creates a reclaimer with an explicit policy.
    #[must_use]
    pub const fn with_policy(collector: C, policy: RetryPolicy) -> Self {
        Self { collector, policy }
    }

    /// The retry budget in use.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The collector being driven.
    #[must_use]
    pub const fn collector(&self) -> &C {
        &self.collector
    }

    /// Evaluates `predicate`, requesting collection and re-evaluating until
    /// it holds or [`RetryPolicy::max_attempts`] rounds have passed.
    ///
    /// If the predicate holds on the first evaluation no collection is
    /// requested. Returns the final value of the predicate; running out of
    /// budget is a normal `false` outcome.
    pub fn try_to_achieve(&self, predicate: impl FnMut() -> bool) -> bool {
        self.try_to_achieve_within(self.policy.max_attempts, predicate)
    }

    /// Like [`try_to_achieve`](Self::try_to_achieve), with an explicit
    /// number of rounds.
    pub fn try_to_achieve_within(&self, rounds: u32, mut predicate: impl FnMut() -> bool) -> bool {
        #[cfg(feature = "tracing")]
        let span = crate::tracing::evaluation_span(rounds);
        #[cfg(feature = "tracing")]
        let _entered = span.enter();

        let mut recorder = Recorder::start();
        recorder.checked();
        if predicate() {
            return recorder.finish(true);
        }

        while recorder.collections_requested() < rounds {
            self.collector.request_collection();
            recorder.collection_requested();
            suspend(self.policy.pause);

            recorder.checked();
            if predicate() {
                return recorder.finish(true);
            }
        }

        recorder.finish(false)
    }
}

/// Give a concurrent collector a chance to run.
fn suspend(pause: Duration) {
    if pause.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(pause);
    }
}

/// Turns a failed check into an assertion failure at the caller's location.
#[track_caller]
pub(crate) fn raise(result: Result<(), ReclaimError>) {
    if let Err(err) = result {
        panic!("{err}");
    }
}
