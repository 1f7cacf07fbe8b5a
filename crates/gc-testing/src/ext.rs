//! Method-call sugar over [`Reclaimer::default`].
//!
//! ```
//! use std::sync::Arc;
//! use gc_testing::{WeakGroupExt, WeakHandleExt};
//!
//! let first = Arc::new(1);
//! let second = Arc::new(2);
//! let refs = [Arc::downgrade(&first), Arc::downgrade(&second)];
//!
//! refs[0].assert_target_not_reclaimable();
//! refs.assert_targets_only_reclaimable_after(|| {
//!     drop(first);
//!     drop(second);
//! });
//! ```

use crate::evaluator::Reclaimer;
use crate::weak::WeakHandle;

/// Reclaimability checks as methods on any [`WeakHandle`].
///
/// Uses the reference-counting collector and the environment's retry
/// policy. Build a [`Reclaimer`] directly to drive another collector.
pub trait WeakHandleExt: WeakHandle {
    /// See [`Reclaimer::target_is_reclaimable`].
    fn target_is_reclaimable(&self) -> bool {
        Reclaimer::default().target_is_reclaimable(self)
    }

    /// See [`Reclaimer::assert_target_reclaimable`].
    #[track_caller]
    fn assert_target_reclaimable(&self) {
        Reclaimer::default().assert_target_reclaimable(self);
    }

    /// See [`Reclaimer::assert_target_not_reclaimable`].
    #[track_caller]
    fn assert_target_not_reclaimable(&self) {
        Reclaimer::default().assert_target_not_reclaimable(self);
    }

    /// See [`Reclaimer::assert_target_only_reclaimable_after`].
    #[track_caller]
    fn assert_target_only_reclaimable_after(&self, block: impl FnOnce()) {
        Reclaimer::default().assert_target_only_reclaimable_after(self, block);
    }
}

impl<W: WeakHandle + ?Sized> WeakHandleExt for W {}

/// Reclaimability checks as methods on a slice of [`WeakHandle`]s.
pub trait WeakGroupExt {
    /// See [`Reclaimer::any_target_reclaimable`].
    fn any_target_reclaimable(&self) -> bool;

    /// See [`Reclaimer::all_targets_reclaimable`].
    fn all_targets_reclaimable(&self) -> bool;

    /// See [`Reclaimer::assert_all_targets_reclaimable`].
    #[track_caller]
    fn assert_all_targets_reclaimable(&self);

    /// See [`Reclaimer::assert_no_target_reclaimable`].
    #[track_caller]
    fn assert_no_target_reclaimable(&self);

    /// See [`Reclaimer::assert_targets_only_reclaimable_after`].
    #[track_caller]
    fn assert_targets_only_reclaimable_after(&self, block: impl FnOnce());
}

impl<W: WeakHandle> WeakGroupExt for [W] {
    fn any_target_reclaimable(&self) -> bool {
        Reclaimer::default().any_target_reclaimable(self)
    }

    fn all_targets_reclaimable(&self) -> bool {
        Reclaimer::default().all_targets_reclaimable(self)
    }

    #[track_caller]
    fn assert_all_targets_reclaimable(&self) {
        Reclaimer::default().assert_all_targets_reclaimable(self);
    }

    #[track_caller]
    fn assert_no_target_reclaimable(&self) {
        Reclaimer::default().assert_no_target_reclaimable(self);
    }

    #[track_caller]
    fn assert_targets_only_reclaimable_after(&self, block: impl FnOnce()) {
        Reclaimer::default().assert_targets_only_reclaimable_after(self, block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Weak};

    #[test]
    fn test_single_handle_methods() {
        let held = Arc::new(1_u8);
        let weak = Arc::downgrade(&held);
        assert!(!weak.target_is_reclaimable());
        weak.assert_target_only_reclaimable_after(move || drop(held));
        assert!(weak.target_is_reclaimable());
    }

    #[test]
    fn test_group_methods_on_vec_and_array() {
        let values: Vec<Arc<u8>> = (0..3).map(Arc::new).collect();
        let refs: Vec<Weak<u8>> = values.iter().map(Arc::downgrade).collect();
        refs.assert_no_target_reclaimable();
        assert!(!refs.any_target_reclaimable());

        refs.assert_targets_only_reclaimable_after(move || drop(values));
        assert!(refs.all_targets_reclaimable());

        let empty: [Weak<u8>; 0] = [];
        empty.assert_all_targets_reclaimable();
        empty.assert_no_target_reclaimable();
    }
}
