//! The weak-reference capability consumed by the evaluator.
//!
//! A [`WeakHandle`] only has to answer one question: has its target been
//! reclaimed yet? Implementations are provided for the standard library's
//! `Weak` pointers (where reclamation happens eagerly, on the last strong
//! drop) and for [`host::Weak`](crate::host::Weak) (where it happens when a
//! collection runs).

use std::rc;
use std::sync;

/// A handle that observes, without keeping alive, some target object.
///
/// The trait is object-safe so that groups of unrelated handles can be
/// checked together as `&[&dyn WeakHandle]`.
///
/// # Contract
///
/// - Reads are snapshots: two calls may disagree if a collection happens
///   between them.
/// - Reclamation is monotonic: once `is_reclaimed` has returned `true` it
///   must keep returning `true`.
/// - `is_reclaimed` must not keep the target alive past the call, nor mutate
///   it.
pub trait WeakHandle {
    /// Returns `true` if the target is no longer available.
    fn is_reclaimed(&self) -> bool;
}

impl<T: ?Sized> WeakHandle for rc::Weak<T> {
    #[inline]
    fn is_reclaimed(&self) -> bool {
        self.strong_count() == 0
    }
}

impl<T: ?Sized> WeakHandle for sync::Weak<T> {
    #[inline]
    fn is_reclaimed(&self) -> bool {
        self.strong_count() == 0
    }
}

impl<W: WeakHandle + ?Sized> WeakHandle for &W {
    #[inline]
    fn is_reclaimed(&self) -> bool {
        (**self).is_reclaimed()
    }
}

impl<W: WeakHandle + ?Sized> WeakHandle for Box<W> {
    #[inline]
    fn is_reclaimed(&self) -> bool {
        (**self).is_reclaimed()
    }
}
