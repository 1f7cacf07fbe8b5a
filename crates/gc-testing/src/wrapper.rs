/// A box giving `value` an allocation of its own that a weak handle can
/// observe.
///
/// Useful when the value under test is of a type that is never placed behind
/// a shared pointer on its own, such as a number or a `Copy` struct.
///
/// ```
/// use std::sync::Arc;
/// use gc_testing::{Wrapper, WeakHandle};
///
/// let wrapper = Arc::new(Wrapper::new(7));
/// let weak = Arc::downgrade(&wrapper);
/// assert_eq!(*wrapper.value(), 7);
///
/// drop(wrapper);
/// assert!(weak.is_reclaimed());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Wrapper<T> {
    value: T,
}

impl<T> Wrapper<T> {
    /// Wraps `value`.
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// The wrapped value. It cannot be replaced after construction.
    ///
    /// ```compile_fail
    /// let mut wrapper = gc_testing::Wrapper::new(7);
    /// wrapper.value = 8;
    /// ```
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }
}
