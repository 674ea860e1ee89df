//! # Upstream Module
//!
//! Outbound HTTP to the statistics API: the [`client::UpstreamClient`] that
//! issues calls with the bearer credential and per-attempt timeout, and the
//! [`retry::RetryPolicy`] that bounds transport-failure retries.

pub mod client;
pub mod retry;

pub use client::{UpstreamClient, UpstreamResponse};
pub use retry::RetryPolicy;
