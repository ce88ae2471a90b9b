//! Maturity-gated decision engine.
//!
//! Each request runs through an orientation cycle (sense, evaluate, plan, act,
//! learn). Candidate plans are scored by a utility engine, bounded by a
//! developmental maturity level and watched by a mental-health monitor that can
//! refuse work when the engine's own reasoning degrades.
//!
//! - **[`core`]**: Pure, deterministic logic (classification, plan templates,
//!   utility scoring, maturity and mental-health state). No I/O.
//! - **[`io`]**: Config, persistence, traces and the external collaborators the
//!   cycle consults (policy, resource inventory, personality matrix).
//!
//! [`orientation`] runs one cycle; [`engine`] gates requests, handles failures
//! and persists state between them.

pub mod core;
pub mod engine;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orientation;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
