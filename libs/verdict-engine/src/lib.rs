//! Verdict evaluation engine.
//!
//! Normalizes a submission into JavaScript, runs it once per test case in an
//! isolated sandbox execution and scores the returned values.

pub mod adapter;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod harness;
pub mod marshal;
pub mod sandbox;

#[cfg(test)]
mod harness_tests;

pub use adapter::{normalize, resolve_function, NormalizedUnit};
pub use config::{EngineConfig, SandboxKind};
pub use error::{AdapterError, ConfigError, EngineError};
pub use executor::Executor;
pub use sandbox::Sandbox;
