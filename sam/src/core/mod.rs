//! Deterministic, pure logic shared by the decision engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod budget;
pub mod classifier;
pub mod evaluate;
pub mod maturity;
pub mod mental_health;
pub mod performance;
pub mod plan;
pub mod request;
pub mod selector;
pub mod trace;
pub mod types;
pub mod utility;
