//! Reclaimability assertions about an ordered group of weak handles.
//!
//! An empty group is vacuously "all reclaimable" and "none reclaimable";
//! both assertions pass on it.

use crate::collector::Collector;
use crate::error::ReclaimError;
use crate::evaluator::{raise, Reclaimer};
use crate::weak::WeakHandle;

/// How the per-handle "is reclaimed" checks of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// At least one target is reclaimed.
    Any,
    /// Every target is reclaimed.
    All,
    /// No target is reclaimed.
    None,
}

impl Aggregation {
    /// Evaluates the aggregation over a snapshot of `refs`.
    pub fn holds<W: WeakHandle>(self, refs: &[W]) -> bool {
        self.holds_for(&read_states(refs))
    }

    /// Evaluates the aggregation over already-read reclaimed states.
    pub(crate) fn holds_for(self, states: &[bool]) -> bool {
        match self {
            Self::Any => states.iter().any(|&reclaimed| reclaimed),
            Self::All => states.iter().all(|&reclaimed| reclaimed),
            Self::None => !states.iter().any(|&reclaimed| reclaimed),
        }
    }
}

/// Reads every handle of `refs` once.
pub(crate) fn read_states<W: WeakHandle>(refs: &[W]) -> Vec<bool> {
    refs.iter().map(|weak| weak.is_reclaimed()).collect()
}

/// Indices of the states equal to `reclaimed`.
fn indices_where(states: &[bool], reclaimed: bool) -> Vec<usize> {
    states
        .iter()
        .enumerate()
        .filter(|&(_, &state)| state == reclaimed)
        .map(|(index, _)| index)
        .collect()
}

/// Built from the states the evaluator decided on, not from a fresh read.
pub(crate) fn not_all_reclaimed(states: &[bool]) -> ReclaimError {
    ReclaimError::NotAllReclaimed {
        retained: indices_where(states, false),
        total: states.len(),
    }
}

pub(crate) fn some_reclaimed(states: &[bool]) -> ReclaimError {
    ReclaimError::SomeReclaimed {
        reclaimed: indices_where(states, true),
        total: states.len(),
    }
}

impl<C: Collector> Reclaimer<C> {
    /// Runs the evaluator over `refs` combined with `mode`.
    pub fn targets_reclaimable<W: WeakHandle>(&self, refs: &[W], mode: Aggregation) -> bool {
        self.try_to_achieve(|| mode.holds(refs))
    }

    /// Returns whether at least one target of `refs` is reclaimable.
    pub fn any_target_reclaimable<W: WeakHandle>(&self, refs: &[W]) -> bool {
        self.targets_reclaimable(refs, Aggregation::Any)
    }

    /// Returns whether all targets of `refs` are reclaimable at the same
    /// time.
    pub fn all_targets_reclaimable<W: WeakHandle>(&self, refs: &[W]) -> bool {
        self.targets_reclaimable(refs, Aggregation::All)
    }

    /// Checks that every target of `refs` is reclaimable.
    ///
    /// # Errors
    ///
    /// [`ReclaimError::NotAllReclaimed`] naming the survivors.
    pub fn check_all_targets_reclaimable<W: WeakHandle>(
        &self,
        refs: &[W],
    ) -> Result<(), ReclaimError> {
        let mut last = Vec::new();
        let reclaimed = self.try_to_achieve(|| {
            last = read_states(refs);
            Aggregation::All.holds_for(&last)
        });
        if reclaimed {
            Ok(())
        } else {
            Err(not_all_reclaimed(&last))
        }
    }

    /// Checks that no target of `refs` is reclaimable, spending only
    /// [`RetryPolicy::presence_attempts`](crate::RetryPolicy::presence_attempts)
    /// rounds.
    ///
    /// # Errors
    ///
    /// [`ReclaimError::SomeReclaimed`] naming the reclaimed handles.
    pub fn check_no_target_reclaimable<W: WeakHandle>(
        &self,
        refs: &[W],
    ) -> Result<(), ReclaimError> {
        let presence_attempts = self.policy().presence_attempts;
        let mut last = Vec::new();
        let any_reclaimed = self.try_to_achieve_within(presence_attempts, || {
            last = read_states(refs);
            Aggregation::Any.holds_for(&last)
        });
        if any_reclaimed {
            Err(some_reclaimed(&last))
        } else {
            Ok(())
        }
    }

    /// Checks that no target of `refs` is reclaimable before `block` and
    /// all of them are after it.
    ///
    /// `block` is not run if the first check fails.
    ///
    /// # Errors
    ///
    /// [`ReclaimError::SomeReclaimed`] before `block`,
    /// [`ReclaimError::NotAllReclaimed`] after it.
    pub fn check_targets_only_reclaimable_after<W: WeakHandle>(
        &self,
        refs: &[W],
        block: impl FnOnce(),
    ) -> Result<(), ReclaimError> {
        self.check_no_target_reclaimable(refs)?;
        block();
        self.check_all_targets_reclaimable(refs)
    }

    /// Asserts that every target of `refs` is reclaimable.
    ///
    /// # Panics
    ///
    /// If any target is still reachable once the retry budget is exhausted.
    #[track_caller]
    pub fn assert_all_targets_reclaimable<W: WeakHandle>(&self, refs: &[W]) {
        raise(self.check_all_targets_reclaimable(refs));
    }

    /// Asserts that no target of `refs` is reclaimable.
    ///
    /// # Panics
    ///
    /// If any target has been reclaimed.
    #[track_caller]
    pub fn assert_no_target_reclaimable<W: WeakHandle>(&self, refs: &[W]) {
        raise(self.check_no_target_reclaimable(refs));
    }

    /// Runs `block`, asserting that no target of `refs` was reclaimable
    /// before it and all of them are after it.
    ///
    /// # Panics
    ///
    /// If either half fails. When the first half fails `block` is not run.
    #[track_caller]
    pub fn assert_targets_only_reclaimable_after<W: WeakHandle>(
        &self,
        refs: &[W],
        block: impl FnOnce(),
    ) {
        raise(self.check_targets_only_reclaimable_after(refs, block));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RefCounting;
    use crate::config::RetryPolicy;
    use std::cell::Cell;
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    /// Reports its target reclaimed from the `from`-th read on.
    struct LateHandle {
        reads: Cell<u32>,
        from: u32,
    }

    impl LateHandle {
        const fn new(from: u32) -> Self {
            Self {
                reads: Cell::new(0),
                from,
            }
        }
    }

    impl WeakHandle for LateHandle {
        fn is_reclaimed(&self) -> bool {
            let read = self.reads.get() + 1;
            self.reads.set(read);
            read >= self.from
        }
    }

    fn fleeting() -> Weak<u64> {
        Arc::downgrade(&Arc::new(7))
    }

    fn reclaimer() -> Reclaimer {
        Reclaimer::with_policy(
            RefCounting,
            RetryPolicy::new()
                .with_max_attempts(3)
                .with_pause(Duration::ZERO),
        )
    }

    #[test]
    fn test_aggregation_snapshot() {
        let held = Arc::new(0_u64);
        let mixed = [fleeting(), Arc::downgrade(&held)];

        assert!(Aggregation::Any.holds(&mixed));
        assert!(!Aggregation::All.holds(&mixed));
        assert!(!Aggregation::None.holds(&mixed));
    }

    #[test]
    fn test_aggregation_empty_group_is_vacuous() {
        let empty: [Weak<u64>; 0] = [];
        assert!(Aggregation::All.holds(&empty));
        assert!(Aggregation::None.holds(&empty));
        assert!(!Aggregation::Any.holds(&empty));
    }

    #[test]
    fn test_empty_group_passes_both_assertions() {
        let empty: Vec<Weak<u64>> = Vec::new();
        let reclaimer = reclaimer();
        reclaimer.assert_all_targets_reclaimable(&empty);
        reclaimer.assert_no_target_reclaimable(&empty);
        reclaimer.assert_targets_only_reclaimable_after(&empty, || {});
    }

    #[test]
    fn test_mixed_group_fails_both_assertions() {
        let held = Arc::new(0_u64);
        let mixed = vec![fleeting(), Arc::downgrade(&held), fleeting()];
        let reclaimer = reclaimer();

        assert_eq!(
            reclaimer.check_all_targets_reclaimable(&mixed),
            Err(ReclaimError::NotAllReclaimed {
                retained: vec![1],
                total: 3,
            })
        );
        assert_eq!(
            reclaimer.check_no_target_reclaimable(&mixed),
            Err(ReclaimError::SomeReclaimed {
                reclaimed: vec![0, 2],
                total: 3,
            })
        );
    }

    #[test]
    fn test_any_and_all() {
        let held = Arc::new(0_u64);
        let reclaimer = reclaimer();

        assert!(reclaimer.any_target_reclaimable(&[Arc::downgrade(&held), fleeting()]));
        assert!(!reclaimer.any_target_reclaimable(&[Arc::downgrade(&held)]));
        assert!(reclaimer.all_targets_reclaimable(&[fleeting(), fleeting()]));
        assert!(!reclaimer.all_targets_reclaimable(&[fleeting(), Arc::downgrade(&held)]));
    }

    #[test]
    fn test_targets_only_after_skips_block_when_one_already_gone() {
        let held = Arc::new(0_u64);
        let refs = vec![Arc::downgrade(&held), fleeting()];
        let mut ran = false;
        let result = reclaimer().check_targets_only_reclaimable_after(&refs, || ran = true);
        assert!(matches!(result, Err(ReclaimError::SomeReclaimed { .. })));
        assert!(!ran);
    }

    #[test]
    fn test_targets_only_after_succeeds() {
        let values: Vec<Arc<String>> = (0..3).map(|i| Arc::new(i.to_string())).collect();
        let refs: Vec<Weak<String>> = values.iter().map(Arc::downgrade).collect();
        reclaimer().assert_targets_only_reclaimable_after(&refs, move || drop(values));
    }

    #[test]
    fn test_heterogeneous_group() {
        let rc = std::rc::Rc::new(1_i32);
        let arc = Arc::new("x");
        let rc_weak = std::rc::Rc::downgrade(&rc);
        let arc_weak = Arc::downgrade(&arc);
        let group: [&dyn WeakHandle; 2] = [&rc_weak, &arc_weak];

        reclaimer().assert_targets_only_reclaimable_after(&group, || {
            drop(rc);
            drop(arc);
        });
    }

    #[test]
    #[should_panic(expected = "indices [1]")]
    fn test_assert_all_panics_naming_survivor() {
        let held = Arc::new(0_u64);
        reclaimer().assert_all_targets_reclaimable(&[fleeting(), Arc::downgrade(&held)]);
    }

    #[test]
    fn test_failure_names_state_seen_by_last_round() {
        let policy = RetryPolicy::new()
            .with_max_attempts(2)
            .with_pause(Duration::ZERO);
        let reclaimer = Reclaimer::with_policy(RefCounting, policy);
        // Three reads happen within the budget; the fourth would succeed.
        let refs = [LateHandle::new(4)];

        let err = reclaimer.check_all_targets_reclaimable(&refs).unwrap_err();
        assert_eq!(
            err,
            ReclaimError::NotAllReclaimed {
                retained: vec![0],
                total: 1,
            }
        );
        assert_eq!(refs[0].reads.get(), 3);
        assert!(err.to_string().contains("1 still reachable (indices [0])"));
    }

    #[test]
    fn test_some_reclaimed_names_state_seen_by_evaluator() {
        let held = Arc::new(0_u64);
        let refs = [Arc::downgrade(&held), fleeting()];
        let mut last_states = Vec::new();
        let reclaimer = reclaimer();

        assert!(reclaimer.try_to_achieve(|| {
            last_states = read_states(&refs);
            Aggregation::Any.holds_for(&last_states)
        }));
        assert_eq!(
            some_reclaimed(&last_states),
            ReclaimError::SomeReclaimed {
                reclaimed: vec![1],
                total: 2,
            }
        );
    }
}
