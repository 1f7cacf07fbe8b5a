//! Tokio async/await integration for gc-testing.
//!
//! This module provides tokio-specific features when the `tokio` feature is enabled:
//! - [`AsyncReclaimer`], which suspends the task instead of the thread
//!   between collection rounds
//! - cancellation of an evaluation through a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - the [`async_test`](crate::async_test) attribute (with the `macros`
//!   feature) for writing such tests
//!
//! # Enabling Tokio Support
//!
//! ```toml
//! [dev-dependencies]
//! gc-testing = { version = "0.3", features = ["tokio"] }
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gc_testing::tokio::AsyncReclaimer;
//!
//! #[gc_testing::async_test]
//! async fn dropping_the_cache_releases_entries() {
//!     let entry = Arc::new(String::from("cached"));
//!     let weak = Arc::downgrade(&entry);
//!
//!     AsyncReclaimer::default()
//!         .assert_target_only_reclaimable_after(&weak, move || drop(entry))
//!         .await;
//! }
//! ```

mod reclaimer;

pub use reclaimer::AsyncReclaimer;

use std::time::Duration;

/// Yields to the scheduler for one tick, or sleeps for `pause`.
pub(crate) async fn suspend(pause: Duration) {
    if pause.is_zero() {
        ::tokio::task::yield_now().await;
    } else {
        ::tokio::time::sleep(pause).await;
    }
}
