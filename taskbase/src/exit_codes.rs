//! Stable exit codes for taskbase CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed before touching the mirror (bad input, corrupt store, unknown keys, ...).
pub const INVALID: i32 = 1;
/// `taskbase check` found registry or mirror inconsistencies.
pub const INCONSISTENT: i32 = 2;
/// A rename sequence failed part-way; the mirror needs `taskbase reconcile`.
pub const DESYNC: i32 = 3;
