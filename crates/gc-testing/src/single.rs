//! Reclaimability assertions about one weak handle.

use crate::collector::Collector;
use crate::error::ReclaimError;
use crate::evaluator::{raise, Reclaimer};
use crate::weak::WeakHandle;

impl<C: Collector> Reclaimer<C> {
    /// Returns whether the target of `weak` is reclaimed, if not already
    /// then after requesting collection within the retry budget.
    pub fn target_is_reclaimable<W: WeakHandle + ?Sized>(&self, weak: &W) -> bool {
        self.try_to_achieve(|| weak.is_reclaimed())
    }

    /// Checks that the target of `weak` is reclaimable.
    ///
    /// # Errors
    ///
    /// [`ReclaimError::StillReachable`] if the target survived every round.
    pub fn check_target_reclaimable<W: WeakHandle + ?Sized>(
        &self,
        weak: &W,
    ) -> Result<(), ReclaimError> {
        if self.target_is_reclaimable(weak) {
            Ok(())
        } else {
            Err(ReclaimError::StillReachable)
        }
    }

    /// Checks that the target of `weak` is not reclaimable.
    ///
    /// Only [`RetryPolicy::presence_attempts`](crate::RetryPolicy::presence_attempts)
    /// collection rounds are spent: the expected outcome is that nothing
    /// changes, so the full budget would only slow down passing tests.
    ///
    /// # Errors
    ///
    /// [`ReclaimError::ReclaimedEarly`] if the target is gone.
    pub fn check_target_not_reclaimable<W: WeakHandle + ?Sized>(
        &self,
        weak: &W,
    ) -> Result<(), ReclaimError> {
        if self.try_to_achieve_within(self.policy().presence_attempts, || weak.is_reclaimed()) {
            Err(ReclaimError::ReclaimedEarly)
        } else {
            Ok(())
        }
    }

    /// Checks that the target of `weak` survives until `block` runs and is
    /// reclaimable afterwards.
    ///
    /// `block` is not run if the target is already reclaimable.
    ///
    /// # Errors
    ///
    /// [`ReclaimError::ReclaimedEarly`] before `block`,
    /// [`ReclaimError::StillReachable`] after it.
    pub fn check_target_only_reclaimable_after<W: WeakHandle + ?Sized>(
        &self,
        weak: &W,
        block: impl FnOnce(),
    ) -> Result<(), ReclaimError> {
        self.check_target_not_reclaimable(weak)?;
        block();
        self.check_target_reclaimable(weak)
    }

    /// Asserts that the target of `weak` is reclaimable.
    ///
    /// Use it to verify that no strong references to the target are still
    /// being held.
    ///
    /// # Panics
    ///
    /// If the target is still reachable once the retry budget is exhausted.
    #[track_caller]
    pub fn assert_target_reclaimable<W: WeakHandle + ?Sized>(&self, weak: &W) {
        raise(self.check_target_reclaimable(weak));
    }

    /// Asserts that the target of `weak` is not reclaimable.
    ///
    /// Rarely needed for the logic of a test, but it helps make sure a test
    /// does not pass for the wrong reason.
    ///
    /// # Panics
    ///
    /// If the target has been reclaimed.
    #[track_caller]
    pub fn assert_target_not_reclaimable<W: WeakHandle + ?Sized>(&self, weak: &W) {
        raise(self.check_target_not_reclaimable(weak));
    }

    /// Runs `block`, asserting that the target of `weak` was not reclaimable
    /// before it and is reclaimable after it.
    ///
    /// # Panics
    ///
    /// If either half fails. When the first half fails `block` is not run.
    #[track_caller]
    pub fn assert_target_only_reclaimable_after<W: WeakHandle + ?Sized>(
        &self,
        weak: &W,
        block: impl FnOnce(),
    ) {
        raise(self.check_target_only_reclaimable_after(weak, block));
    }
}

#[cfg(test)]
mod tests {
    use crate::collector;
    use crate::config::RetryPolicy;
    use crate::error::ReclaimError;
    use crate::evaluator::Reclaimer;
    use crate::metrics::last_evaluation_metrics;
    use std::cell::Cell;
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    fn fleeting() -> Weak<u64> {
        Arc::downgrade(&Arc::new(7))
    }

    fn reclaimer() -> Reclaimer {
        Reclaimer::with_policy(
            collector::RefCounting,
            RetryPolicy::new()
                .with_max_attempts(3)
                .with_pause(Duration::ZERO),
        )
    }

    #[test]
    fn test_target_is_reclaimable() {
        assert!(reclaimer().target_is_reclaimable(&fleeting()));
    }

    #[test]
    fn test_target_is_not_reclaimable_deterministically() {
        let held = Arc::new(1_u64);
        let weak = Arc::downgrade(&held);
        let reclaimer = reclaimer();
        for _ in 0..5 {
            assert!(!reclaimer.target_is_reclaimable(&weak));
        }
    }

    #[test]
    fn test_check_results() {
        let held = Arc::new(1_u64);
        let stable = Arc::downgrade(&held);
        let reclaimer = reclaimer();

        assert_eq!(reclaimer.check_target_reclaimable(&fleeting()), Ok(()));
        assert_eq!(
            reclaimer.check_target_reclaimable(&stable),
            Err(ReclaimError::StillReachable)
        );
        assert_eq!(reclaimer.check_target_not_reclaimable(&stable), Ok(()));
        assert_eq!(
            reclaimer.check_target_not_reclaimable(&fleeting()),
            Err(ReclaimError::ReclaimedEarly)
        );
    }

    #[test]
    fn test_not_reclaimable_spends_only_presence_attempts() {
        let requests = Cell::new(0);
        let reclaimer = Reclaimer::with_policy(
            collector::from_fn(|| requests.set(requests.get() + 1)),
            RetryPolicy::new()
                .with_max_attempts(40)
                .with_presence_attempts(1)
                .with_pause(Duration::ZERO),
        );
        let held = Arc::new(());
        reclaimer.assert_target_not_reclaimable(&Arc::downgrade(&held));

        assert_eq!(requests.get(), 1);
        assert_eq!(last_evaluation_metrics().collections_requested, 1);
    }

    #[test]
    fn test_zero_presence_attempts_never_collects() {
        let requests = Cell::new(0);
        let reclaimer = Reclaimer::with_policy(
            collector::from_fn(|| requests.set(requests.get() + 1)),
            RetryPolicy::new()
                .with_presence_attempts(0)
                .with_pause(Duration::ZERO),
        );
        let held = Arc::new(());
        reclaimer.assert_target_not_reclaimable(&Arc::downgrade(&held));
        assert_eq!(requests.get(), 0);
    }

    #[test]
    fn test_only_after_skips_block_when_precondition_fails() {
        let mut ran = false;
        let result = reclaimer().check_target_only_reclaimable_after(&fleeting(), || ran = true);
        assert_eq!(result, Err(ReclaimError::ReclaimedEarly));
        assert!(!ran);
    }

    #[test]
    fn test_only_after_runs_block_before_postcondition() {
        let held = Arc::new(3_u64);
        let stable = Arc::downgrade(&held);
        let mut ran = false;
        let result = reclaimer().check_target_only_reclaimable_after(&stable, || ran = true);
        assert_eq!(result, Err(ReclaimError::StillReachable));
        assert!(ran);
    }

    #[test]
    fn test_only_after_succeeds_when_block_drops_target() {
        let held = Arc::new(3_u64);
        let weak = Arc::downgrade(&held);
        reclaimer().assert_target_only_reclaimable_after(&weak, move || drop(held));
    }

    #[test]
    #[should_panic(expected = "expected target to be reclaimable")]
    fn test_assert_reclaimable_panics_when_held() {
        let held = Arc::new(0_u8);
        reclaimer().assert_target_reclaimable(&Arc::downgrade(&held));
    }

    #[test]
    #[should_panic(expected = "expected target not to be reclaimable")]
    fn test_assert_not_reclaimable_panics_when_gone() {
        reclaimer().assert_target_not_reclaimable(&fleeting());
    }
}
