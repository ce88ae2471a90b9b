//! Stable exit codes for `sam` CLI commands.

/// Command succeeded, or `decide` produced a full decision.
pub const OK: i32 = 0;
/// Invalid arguments, config or state, or any other error.
pub const INVALID: i32 = 1;
/// `decide` was refused by the maturity envelope or the mental-health gate.
pub const REFUSED: i32 = 2;
/// `decide` hit an internal cycle failure and returned the fallback response.
pub const DEGRADED: i32 = 3;
