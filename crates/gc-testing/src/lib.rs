//! Assertions about object lifetimes for tests.
//!
//! `gc-testing` answers "has this object actually been reclaimed?" for a
//! target observed through a weak handle. Collection timing is not
//! deterministic, so every check runs through a bounded retry loop: evaluate,
//! and while the answer is not the expected one, request a collection, pause,
//! and evaluate again. The loop never reports a target as reclaimed before
//! it is; a target that stays reachable fails after a predictable budget.
//!
//! # Features
//!
//! - **Single and group assertions**: reclaimable, not reclaimable, and
//!   "only reclaimable after this block" for one handle or a slice of them
//! - **Pluggable collaborators**: any [`WeakHandle`] and any [`Collector`];
//!   `std::rc::Weak`/`std::sync::Weak` work out of the box
//! - **Deferred host**: [`host::DeferredHeap`] reclaims only when a collection
//!   runs, synchronously, on every n-th request, or on a background thread
//! - **Async**: [`tokio::AsyncReclaimer`] and `#[gc_testing::async_test]`
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use gc_testing::{Reclaimer, Wrapper};
//!
//! let reclaimer = Reclaimer::default();
//!
//! let boxed = Arc::new(Wrapper::new(7));
//! let weak = Arc::downgrade(&boxed);
//!
//! reclaimer.assert_target_only_reclaimable_after(&weak, || drop(boxed));
//! ```
//!
//! # Groups
//!
//! ```
//! use std::sync::Arc;
//! use gc_testing::fixtures::generate_sequence_and_weak_references;
//! use gc_testing::Reclaimer;
//!
//! let (mut sequence, references) = generate_sequence_and_weak_references(3, |i| i);
//! Reclaimer::default().assert_targets_only_reclaimable_after(&references, || {
//!     for _ in 0..3 {
//!         sequence.dismiss_next();
//!     }
//! });
//! ```
//!
//! # Retry budget
//!
//! The budget comes from [`RetryPolicy`]; [`Reclaimer::new`] and
//! [`Reclaimer::default`] read the `GC_TESTING_*` environment variables on
//! top of the built-in defaults, so slow CI machines can raise it without
//! code changes.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod collector;
mod config;
mod error;
mod evaluator;
mod ext;
pub mod fixtures;
mod group;
pub mod host;
mod metrics;
mod single;
mod tracing;
mod weak;
mod wrapper;

#[cfg(feature = "tokio")]
pub mod tokio;

// Re-export public API
pub use collector::{Collector, RefCounting};
pub use config::{
    RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_PAUSE, DEFAULT_PRESENCE_ATTEMPTS, ENV_MAX_ATTEMPTS,
    ENV_PAUSE_MS, ENV_PRESENCE_ATTEMPTS,
};
pub use error::{ConfigError, ReclaimError};
pub use evaluator::Reclaimer;
pub use ext::{WeakGroupExt, WeakHandleExt};
pub use group::Aggregation;
pub use metrics::{global_metrics, last_evaluation_metrics, EvaluationMetrics, GlobalMetrics};
pub use weak::WeakHandle;
pub use wrapper::Wrapper;

// Re-export the test attribute when the feature is enabled
#[cfg(feature = "macros")]
pub use gc_testing_macros::async_test;

#[cfg(feature = "tokio")]
#[doc(hidden)]
pub mod __private {
    pub use ::tokio;
}
