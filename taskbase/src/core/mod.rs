//! Deterministic, pure logic shared by the taskbase operations.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod filter;
pub mod invariants;
pub mod naming;
pub mod ordering;
pub mod shift;
