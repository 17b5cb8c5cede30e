//! # RDS Password Rotator
//!
//! Secrets Manager rotation handler for RDS master passwords.
//!
//! Secrets Manager invokes the handler four times per rotation, once per step,
//! with the same client request token. [`rotation::RotationCoordinator`] runs
//! one step per invocation against the provider traits in [`provider`]; the
//! AWS-backed implementations live in [`provider::aws`] and the in-memory
//! doubles used by tests in [`provider::memory`].

pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod provider;
pub mod rotation;

pub use config::RotationConfig;
pub use error::{RotationError, RotationErrorKind};
pub use rotation::{RotationCoordinator, RotationEvent, RotationResponse, RotationStep};
