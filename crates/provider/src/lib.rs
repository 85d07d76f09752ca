//! Generation provider client and task tracker.
//!
//! Provides the REST client for the image-generation provider, the
//! in-memory task store, live status checks with per-task single-flight,
//! background pollers, and the [`manager::TaskManager`] that ties them
//! together for the HTTP layer.

pub mod api;
pub mod check;
pub mod manager;
pub mod messages;
pub mod poller;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;
