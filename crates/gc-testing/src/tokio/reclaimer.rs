use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::collector::{Collector, RefCounting};
use crate::config::RetryPolicy;
use crate::error::ReclaimError;
use crate::evaluator::{raise, Reclaimer};
use crate::group::{not_all_reclaimed, read_states, some_reclaimed, Aggregation};
use crate::metrics::Recorder;
use crate::weak::WeakHandle;

/// The cooperative counterpart of [`Reclaimer`].
///
/// Every operation has the same semantics as its blocking namesake, but the
/// pause between rounds suspends the current task instead of the thread,
/// which lets a collector running on the same runtime make progress.
/// Dropping one of the returned futures stops the evaluation at its next
/// suspension point.
#[derive(Debug, Clone)]
pub struct AsyncReclaimer<C = RefCounting> {
    inner: Reclaimer<C>,
}

impl Default for AsyncReclaimer<RefCounting> {
    fn default() -> Self {
        Self::from(Reclaimer::default())
    }
}

impl<C: Collector> From<Reclaimer<C>> for AsyncReclaimer<C> {
    fn from(inner: Reclaimer<C>) -> Self {
        Self { inner }
    }
}

impl<C: Collector> AsyncReclaimer<C> {
    /// Creates a reclaimer for `collector` using [`RetryPolicy::from_env`].
    #[must_use]
    pub fn new(collector: C) -> Self {
        Self::from(Reclaimer::new(collector))
    }

    /// Creates a reclaimer with an explicit policy.
    #[must_use]
    pub const fn with_policy(collector: C, policy: RetryPolicy) -> Self {
        Self {
            inner: Reclaimer::with_policy(collector, policy),
        }
    }

    /// The retry budget in use.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        self.inner.policy()
    }

    /// The blocking reclaimer sharing this collector and policy.
    #[must_use]
    pub const fn blocking(&self) -> &Reclaimer<C> {
        &self.inner
    }

    /// See [`Reclaimer::try_to_achieve`].
    pub async fn try_to_achieve(&self, predicate: impl FnMut() -> bool) -> bool {
        self.try_to_achieve_within(self.policy().max_attempts, predicate)
            .await
    }

    /// See [`Reclaimer::try_to_achieve_within`].
    pub async fn try_to_achieve_within(&self, rounds: u32, predicate: impl FnMut() -> bool) -> bool {
        // Without a token the evaluation cannot be cancelled from inside.
        self.instrumented(rounds, predicate, None)
            .await
            .unwrap_or(false)
    }

    /// Like [`try_to_achieve`](Self::try_to_achieve), but gives up as soon
    /// as `token` is cancelled.
    ///
    /// Returns `None` if cancelled before an outcome was reached.
    pub async fn try_to_achieve_cancellable(
        &self,
        predicate: impl FnMut() -> bool,
        token: &CancellationToken,
    ) -> Option<bool> {
        self.instrumented(self.policy().max_attempts, predicate, Some(token))
            .await
    }

    #[allow(clippy::let_and_return)]
    fn instrumented<'a>(
        &'a self,
        rounds: u32,
        predicate: impl FnMut() -> bool + 'a,
        token: Option<&'a CancellationToken>,
    ) -> impl Future<Output = Option<bool>> + 'a {
        let evaluation = self.evaluate(rounds, predicate, token);
        #[cfg(feature = "tracing")]
        let evaluation = ::tracing::Instrument::instrument(
            evaluation,
            crate::tracing::evaluation_span(rounds),
        );
        evaluation
    }

    async fn evaluate(
        &self,
        rounds: u32,
        mut predicate: impl FnMut() -> bool,
        token: Option<&CancellationToken>,
    ) -> Option<bool> {
        let mut recorder = Recorder::start();
        recorder.checked();
        if predicate() {
            return Some(recorder.finish(true));
        }

        while recorder.collections_requested() < rounds {
            self.inner.collector().request_collection();
            recorder.collection_requested();

            let pause = super::suspend(self.policy().pause);
            match token {
                Some(token) => {
                    if token.run_until_cancelled(pause).await.is_none() {
                        crate::tracing::log_cancelled(recorder.collections_requested());
                        return None;
                    }
                }
                None => pause.await,
            }

            recorder.checked();
            if predicate() {
                return Some(recorder.finish(true));
            }
        }

        Some(recorder.finish(false))
    }

    /// See [`Reclaimer::target_is_reclaimable`].
    pub async fn target_is_reclaimable<W: WeakHandle + ?Sized>(&self, weak: &W) -> bool {
        self.try_to_achieve(|| weak.is_reclaimed()).await
    }

    /// See [`Reclaimer::check_target_reclaimable`].
    ///
    /// # Errors
    ///
    /// [`ReclaimError::StillReachable`] if the target survived every round.
    pub async fn check_target_reclaimable<W: WeakHandle + ?Sized>(
        &self,
        weak: &W,
    ) -> Result<(), ReclaimError> {
        if self.target_is_reclaimable(weak).await {
            Ok(())
        } else {
            Err(ReclaimError::StillReachable)
        }
    }

    /// See [`Reclaimer::check_target_not_reclaimable`].
    ///
    /// # Errors
    ///
    /// [`ReclaimError::ReclaimedEarly`] if the target is gone.
    pub async fn check_target_not_reclaimable<W: WeakHandle + ?Sized>(
        &self,
        weak: &W,
    ) -> Result<(), ReclaimError> {
        let presence_attempts = self.policy().presence_attempts;
        if self
            .try_to_achieve_within(presence_attempts, || weak.is_reclaimed())
            .await
        {
            Err(ReclaimError::ReclaimedEarly)
        } else {
            Ok(())
        }
    }

    /// See [`Reclaimer::check_target_only_reclaimable_after`].
    ///
    /// # Errors
    ///
    /// [`ReclaimError::ReclaimedEarly`] before `block`,
    /// [`ReclaimError::StillReachable`] after it.
    pub async fn check_target_only_reclaimable_after<W: WeakHandle + ?Sized>(
        &self,
        weak: &W,
        block: impl FnOnce(),
    ) -> Result<(), ReclaimError> {
        self.check_target_not_reclaimable(weak).await?;
        block();
        self.check_target_reclaimable(weak).await
    }

    /// See [`Reclaimer::assert_target_reclaimable`].
    ///
    /// # Panics
    ///
    /// If the target is still reachable once the retry budget is exhausted.
    pub async fn assert_target_reclaimable<W: WeakHandle + ?Sized>(&self, weak: &W) {
        raise(self.check_target_reclaimable(weak).await);
    }

    /// See [`Reclaimer::assert_target_not_reclaimable`].
    ///
    /// # Panics
    ///
    /// If the target has been reclaimed.
    pub async fn assert_target_not_reclaimable<W: WeakHandle + ?Sized>(&self, weak: &W) {
        raise(self.check_target_not_reclaimable(weak).await);
    }

    /// See [`Reclaimer::assert_target_only_reclaimable_after`].
    ///
    /// # Panics
    ///
    /// If either half fails. When the first half fails `block` is not run.
    pub async fn assert_target_only_reclaimable_after<W: WeakHandle + ?Sized>(
        &self,
        weak: &W,
        block: impl FnOnce(),
    ) {
        raise(self.check_target_only_reclaimable_after(weak, block).await);
    }

    /// See [`Reclaimer::targets_reclaimable`].
    pub async fn targets_reclaimable<W: WeakHandle>(&self, refs: &[W], mode: Aggregation) -> bool {
        self.try_to_achieve(|| mode.holds(refs)).await
    }

    /// See [`Reclaimer::any_target_reclaimable`].
    pub async fn any_target_reclaimable<W: WeakHandle>(&self, refs: &[W]) -> bool {
        self.targets_reclaimable(refs, Aggregation::Any).await
    }

    /// See [`Reclaimer::all_targets_reclaimable`].
    pub async fn all_targets_reclaimable<W: WeakHandle>(&self, refs: &[W]) -> bool {
        self.targets_reclaimable(refs, Aggregation::All).await
    }

    /// See [`Reclaimer::check_all_targets_reclaimable`].
    ///
    /// # Errors
    ///
    /// [`ReclaimError::NotAllReclaimed`] naming the survivors.
    pub async fn check_all_targets_reclaimable<W: WeakHandle>(
        &self,
        refs: &[W],
    ) -> Result<(), ReclaimError> {
        let mut last = Vec::new();
        let reclaimed = self
            .try_to_achieve(|| {
                last = read_states(refs);
                Aggregation::All.holds_for(&last)
            })
            .await;
        if reclaimed {
            Ok(())
        } else {
            Err(not_all_reclaimed(&last))
        }
    }

    /// See [`Reclaimer::check_no_target_reclaimable`].
    ///
    /// # Errors
    ///
    /// [`ReclaimError::SomeReclaimed`] naming the reclaimed handles.
    pub async fn check_no_target_reclaimable<W: WeakHandle>(
        &self,
        refs: &[W],
    ) -> Result<(), ReclaimError> {
        let presence_attempts = self.policy().presence_attempts;
        let mut last = Vec::new();
        let any_reclaimed = self
            .try_to_achieve_within(presence_attempts, || {
                last = read_states(refs);
                Aggregation::Any.holds_for(&last)
            })
            .await;
        if any_reclaimed {
            Err(some_reclaimed(&last))
        } else {
            Ok(())
        }
    }

    /// See [`Reclaimer::check_targets_only_reclaimable_after`].
    ///
    /// # Errors
    ///
    /// [`ReclaimError::SomeReclaimed`] before `block`,
    /// [`ReclaimError::NotAllReclaimed`] after it.
    pub async fn check_targets_only_reclaimable_after<W: WeakHandle>(
        &self,
        refs: &[W],
        block: impl FnOnce(),
    ) -> Result<(), ReclaimError> {
        self.check_no_target_reclaimable(refs).await?;
        block();
        self.check_all_targets_reclaimable(refs).await
    }

    /// See [`Reclaimer::assert_all_targets_reclaimable`].
    ///
    /// # Panics
    ///
    /// If any target is still reachable once the retry budget is exhausted.
    pub async fn assert_all_targets_reclaimable<W: WeakHandle>(&self, refs: &[W]) {
        raise(self.check_all_targets_reclaimable(refs).await);
    }

    /// See [`Reclaimer::assert_no_target_reclaimable`].
    ///
    /// # Panics
    ///
    /// If any target has been reclaimed.
    pub async fn assert_no_target_reclaimable<W: WeakHandle>(&self, refs: &[W]) {
        raise(self.check_no_target_reclaimable(refs).await);
    }

    /// See [`Reclaimer::assert_targets_only_reclaimable_after`].
    ///
    /// # Panics
    ///
    /// If either half fails. When the first half fails `block` is not run.
    pub async fn assert_targets_only_reclaimable_after<W: WeakHandle>(
        &self,
        refs: &[W],
        block: impl FnOnce(),
    ) {
        raise(self.check_targets_only_reclaimable_after(refs, block).await);
    }
}
