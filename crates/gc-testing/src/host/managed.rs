//! Strong and weak handles into a [`DeferredHeap`](super::DeferredHeap).

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::Shared;
use crate::weak::WeakHandle;

/// Outcome of sweeping one retired slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Sweep {
    /// The value was dropped.
    Reclaimed,
    /// A weak handle was upgraded after retirement; the value stays.
    Resurrected,
    /// The slot had already been swept through an earlier retirement.
    AlreadyGone,
}

/// A slot whose strong count dropped to zero, type-erased for the queue.
pub(super) trait Retired: Send + Sync {
    fn sweep(&self) -> Sweep;
}

/// Storage for one managed value.
///
/// `value` is `None` once swept and never becomes `Some` again. `strong`
/// only changes while `value` is `Some`: upgrades hold the read lock, the
/// sweep holds the write lock.
struct Slot<T> {
    value: RwLock<Option<Arc<T>>>,
    strong: AtomicUsize,
}

impl<T: Send + Sync> Retired for Slot<T> {
    fn sweep(&self) -> Sweep {
        let mut value = self.value.write();
        if value.is_none() {
            return Sweep::AlreadyGone;
        }
        if self.strong.load(Ordering::Acquire) != 0 {
            return Sweep::Resurrected;
        }
        // Dropped outside the lock.
        let taken = value.take();
        drop(value);
        drop(taken);
        Sweep::Reclaimed
    }
}

/// A strong handle to a value living in a [`DeferredHeap`](super::DeferredHeap).
///
/// Dropping the last `Managed` for a value does not drop the value; it is
/// retired and only reclaimed by the next sweep.
pub struct Managed<T: Send + Sync + 'static> {
    value: Arc<T>,
    slot: Arc<Slot<T>>,
    shared: Arc<Shared>,
}

impl<T: Send + Sync + 'static> Managed<T> {
    pub(super) fn new(value: T, shared: Arc<Shared>) -> Self {
        let value = Arc::new(value);
        let slot = Arc::new(Slot {
            value: RwLock::new(Some(Arc::clone(&value))),
            strong: AtomicUsize::new(1),
        });
        shared.allocated.fetch_add(1, Ordering::Relaxed);
        Self {
            value,
            slot,
            shared,
        }
    }

    /// Creates a weak handle that observes this value without keeping it
    /// alive.
    #[must_use]
    pub fn downgrade(this: &Self) -> Weak<T> {
        Weak {
            slot: Arc::clone(&this.slot),
            shared: Arc::clone(&this.shared),
        }
    }

    /// Number of `Managed` handles currently pointing at this value.
    #[must_use]
    pub fn strong_count(this: &Self) -> usize {
        this.slot.strong.load(Ordering::Acquire)
    }

    /// Returns `true` if both handles point at the same value.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.slot, &other.slot)
    }
}

impl<T: Send + Sync + 'static> Clone for Managed<T> {
    fn clone(&self) -> Self {
        self.slot.strong.fetch_add(1, Ordering::AcqRel);
        Self {
            value: Arc::clone(&self.value),
            slot: Arc::clone(&self.slot),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> Drop for Managed<T> {
    fn drop(&mut self) {
        if self.slot.strong.fetch_sub(1, Ordering::AcqRel) == 1 {
            let slot: Arc<dyn Retired> = self.slot.clone();
            self.shared.retired.push(slot);
        }
    }
}

impl<T: Send + Sync + 'static> Deref for Managed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Send + Sync + fmt::Debug + 'static> fmt::Debug for Managed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Managed").field(&*self.value).finish()
    }
}

/// A weak handle into a [`DeferredHeap`](super::DeferredHeap).
///
/// Retired-but-unswept values can still be upgraded, which resurrects them.
/// Once swept, a value can never be upgraded again.
pub struct Weak<T: Send + Sync + 'static> {
    slot: Arc<Slot<T>>,
    shared: Arc<Shared>,
}

impl<T: Send + Sync + 'static> Weak<T> {
    /// Returns a strong handle if the value has not been swept.
    #[must_use]
    pub fn upgrade(&self) -> Option<Managed<T>> {
        let value = self.slot.value.read();
        value.as_ref().map(|value| {
            self.slot.strong.fetch_add(1, Ordering::AcqRel);
            Managed {
                value: Arc::clone(value),
                slot: Arc::clone(&self.slot),
                shared: Arc::clone(&self.shared),
            }
        })
    }
}

impl<T: Send + Sync + 'static> Clone for Weak<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weak")
            .field("reclaimed", &self.is_reclaimed())
            .finish()
    }
}

impl<T: Send + Sync + 'static> WeakHandle for Weak<T> {
    fn is_reclaimed(&self) -> bool {
        self.slot.value.read().is_none()
    }
}
