//! The "collect now" capability consumed by the evaluator.

use std::rc::Rc;
use std::sync::Arc;

/// Something that can be asked to reclaim unreachable objects.
///
/// Requests are best-effort: an implementation may run a full collection
/// synchronously, hand the request to a background collector, or ignore it
/// entirely. The evaluator never relies on a request having completed.
pub trait Collector {
    /// Asks the collector to run. Fire-and-forget.
    fn request_collection(&self);
}

/// Collector for hosts that reclaim eagerly through reference counting.
///
/// `Rc` and `Arc` free their target as soon as the last strong pointer is
/// dropped, so there is nothing to request. This is the default collector of
/// [`Reclaimer`](crate::Reclaimer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefCounting;

impl Collector for RefCounting {
    #[inline]
    fn request_collection(&self) {}
}

/// Adapts a closure into a [`Collector`].
///
/// Created by [`from_fn`].
#[derive(Clone)]
pub struct FnCollector<F>(F);

impl<F> std::fmt::Debug for FnCollector<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCollector").finish_non_exhaustive()
    }
}

impl<F: Fn()> Collector for FnCollector<F> {
    #[inline]
    fn request_collection(&self) {
        (self.0)();
    }
}

/// Wraps `f` so that every collection request calls it.
///
/// # Example
///
/// ```
/// use gc_testing::{collector, Reclaimer};
///
/// let reclaimer = Reclaimer::new(collector::from_fn(|| {
///     // e.g. call into the runtime under test
/// }));
/// # let _ = reclaimer;
/// ```
pub const fn from_fn<F: Fn()>(f: F) -> FnCollector<F> {
    FnCollector(f)
}

impl<C: Collector + ?Sized> Collector for &C {
    #[inline]
    fn request_collection(&self) {
        (**self).request_collection();
    }
}

impl<C: Collector + ?Sized> Collector for Box<C> {
    #[inline]
    fn request_collection(&self) {
        (**self).request_collection();
    }
}

impl<C: Collector + ?Sized> Collector for Rc<C> {
    #[inline]
    fn request_collection(&self) {
        (**self).request_collection();
    }
}

impl<C: Collector + ?Sized> Collector for Arc<C> {
    #[inline]
    fn request_collection(&self) {
        (**self).request_collection();
    }
}
