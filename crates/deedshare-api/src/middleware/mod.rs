//! # Middleware
//!
//! - `tracing_layer` — per-request tracing spans.
//! - `metrics` — request/error counters and the `/metrics` report.

pub mod metrics;
pub mod tracing_layer;
