//! A deferred-reclamation heap for exercising the evaluator.
//!
//! Reference counting reclaims on the last drop, so with `Rc`/`Arc` the
//! retry loop never has anything to wait for. [`DeferredHeap`] behaves like
//! a tracing collector instead: a value whose last strong handle is dropped
//! is only *retired*, and stays reachable through weak handles until a
//! collection sweeps it. How collection requests are honoured is chosen with
//! [`CollectorMode`].
//!
//! This is not a real collector. It does not trace object graphs, so a
//! cycle of [`Managed`] handles is never reclaimed.
//!
//! # Example
//!
//! ```
//! use gc_testing::host::DeferredHeap;
//! use gc_testing::{Reclaimer, WeakHandle};
//!
//! let heap = DeferredHeap::synchronous();
//! let value = heap.alloc(String::from("retired, not freed"));
//! let weak = gc_testing::host::Managed::downgrade(&value);
//!
//! drop(value);
//! assert!(!weak.is_reclaimed());
//!
//! Reclaimer::new(&heap).assert_target_reclaimable(&weak);
//! ```

mod managed;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use crossbeam_queue::SegQueue;

use crate::collector::Collector;
use managed::{Retired, Sweep};

pub use managed::{Managed, Weak};

/// How a [`DeferredHeap`] responds to [`Collector::request_collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorMode {
    /// Every request sweeps immediately on the calling thread.
    Synchronous,
    /// Only every n-th request sweeps; the others are ignored.
    ///
    /// `EveryNth(0)` never sweeps.
    EveryNth(u32),
    /// Requests are handed to a background collector thread, which sweeps
    /// after `latency`.
    Concurrent {
        /// Delay between receiving a request and sweeping.
        latency: Duration,
    },
}

/// Snapshot of a heap's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Values allocated and not yet reclaimed (including retired ones).
    pub live: usize,
    /// Retirements waiting for a sweep.
    pub retired: usize,
    /// Values reclaimed since the heap was created.
    pub reclaimed: usize,
    /// Sweeps performed.
    pub sweeps: usize,
    /// Collection requests received.
    pub requests: usize,
}

/// State reachable from handles and from the background collector.
pub(crate) struct Shared {
    retired: SegQueue<Arc<dyn Retired>>,
    allocated: AtomicUsize,
    reclaimed: AtomicUsize,
    sweeps: AtomicUsize,
}

impl Shared {
    fn new() -> Self {
        Self {
            retired: SegQueue::new(),
            allocated: AtomicUsize::new(0),
            reclaimed: AtomicUsize::new(0),
            sweeps: AtomicUsize::new(0),
        }
    }

    /// Sweep everything retired so far. Retirements arriving concurrently
    /// are left for the next sweep.
    fn sweep(&self) -> usize {
        let mut swept = 0;
        for _ in 0..self.retired.len() {
            let Some(slot) = self.retired.pop() else {
                break;
            };
            if slot.sweep() == Sweep::Reclaimed {
                swept += 1;
            }
        }
        self.reclaimed.fetch_add(swept, Ordering::Relaxed);
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        crate::tracing::log_sweep(swept, self.retired.len());
        swept
    }
}

/// Background collector thread for [`CollectorMode::Concurrent`].
struct Background {
    requests: Sender<()>,
    handle: JoinHandle<()>,
}

impl Background {
    fn spawn(shared: Arc<Shared>, latency: Duration) -> io::Result<Self> {
        let (requests, incoming) = channel::unbounded::<()>();
        let handle = thread::Builder::new()
            .name("gc-testing-collector".to_owned())
            .spawn(move || {
                while incoming.recv().is_ok() {
                    thread::sleep(latency);
                    // Requests that piled up during the latency are served by
                    // this one sweep.
                    while incoming.try_recv().is_ok() {}
                    shared.sweep();
                }
            })?;
        Ok(Self { requests, handle })
    }
}

/// A heap whose values are reclaimed only when a collection runs.
pub struct DeferredHeap {
    shared: Arc<Shared>,
    mode: CollectorMode,
    requests: AtomicUsize,
    background: Option<Background>,
}

impl DeferredHeap {
    /// Creates a heap with the given collector behaviour.
    ///
    /// # Errors
    ///
    /// Fails if the background collector thread of
    /// [`CollectorMode::Concurrent`] cannot be spawned.
    pub fn new(mode: CollectorMode) -> io::Result<Self> {
        let shared = Arc::new(Shared::new());
        let background = match mode {
            CollectorMode::Concurrent { latency } => {
                Some(Background::spawn(Arc::clone(&shared), latency)?)
            }
            CollectorMode::Synchronous | CollectorMode::EveryNth(_) => None,
        };
        Ok(Self {
            shared,
            mode,
            requests: AtomicUsize::new(0),
            background,
        })
    }

    /// A heap that sweeps on every request.
    #[must_use]
    pub fn synchronous() -> Self {
        Self::without_background(CollectorMode::Synchronous)
    }

    /// A heap that sweeps on every `n`-th request only.
    #[must_use]
    pub fn every_nth(n: u32) -> Self {
        Self::without_background(CollectorMode::EveryNth(n))
    }

    /// A heap swept by a background thread `latency` after each request.
    ///
    /// # Errors
    ///
    /// Fails if the collector thread cannot be spawned.
    pub fn concurrent(latency: Duration) -> io::Result<Self> {
        Self::new(CollectorMode::Concurrent { latency })
    }

    fn without_background(mode: CollectorMode) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            mode,
            requests: AtomicUsize::new(0),
            background: None,
        }
    }

    /// Moves `value` into the heap.
    pub fn alloc<T: Send + Sync + 'static>(&self, value: T) -> Managed<T> {
        Managed::new(value, Arc::clone(&self.shared))
    }

    /// Sweeps retired values now, on this thread, regardless of the mode.
    ///
    /// Returns the number of values reclaimed.
    pub fn collect(&self) -> usize {
        self.shared.sweep()
    }

    /// The configured collector behaviour.
    #[must_use]
    pub const fn mode(&self) -> CollectorMode {
        self.mode
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let reclaimed = self.shared.reclaimed.load(Ordering::Relaxed);
        HeapStats {
            live: self
                .shared
                .allocated
                .load(Ordering::Relaxed)
                .saturating_sub(reclaimed),
            retired: self.shared.retired.len(),
            reclaimed,
            sweeps: self.shared.sweeps.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
        }
    }
}

impl Collector for DeferredHeap {
    fn request_collection(&self) {
        let request = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        match self.mode {
            CollectorMode::Synchronous => {
                self.shared.sweep();
            }
            CollectorMode::EveryNth(n) => {
                if n != 0 && request % n as usize == 0 {
                    self.shared.sweep();
                }
            }
            CollectorMode::Concurrent { .. } => {
                if let Some(background) = &self.background {
                    // The collector only goes away when the heap is dropped.
                    let _ = background.requests.send(());
                }
            }
        }
    }
}

impl Drop for DeferredHeap {
    fn drop(&mut self) {
        if let Some(Background { requests, handle }) = self.background.take() {
            drop(requests);
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for DeferredHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredHeap")
            .field("mode", &self.mode)
            .field("stats", &self.stats())
            .finish()
    }
}
