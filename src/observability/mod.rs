//! # Observability
//!
//! - `logging`: tracing subscriber setup (JSON for CloudWatch, text locally)
//!
//! Step timings are carried on the `rotation.step` span as
//! `operation.duration_ms` and `operation.success` fields.

pub mod logging;

pub use logging::init_tracing;
