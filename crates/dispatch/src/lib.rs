//! `turntable-dispatch` library crate.
//!
//! Runs a command batch through a bounded worker pool. The binary
//! entrypoint (`render-parallel`) lives in `main.rs`; the modules are
//! exported for integration testing and reuse.

pub mod error;
pub mod pool;
pub mod runner;
