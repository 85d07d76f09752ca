//! Domain types and policy for the genproxy task tracker.
//!
//! Nothing in this crate performs I/O: the provider client, the task
//! store and the HTTP layer live in `genproxy-provider` and
//! `genproxy-api`.

pub mod error;
pub mod status_policy;
pub mod task;
pub mod types;
