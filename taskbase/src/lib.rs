//! Ordered task base kept in sync across a JSON registry and a filesystem mirror.
//!
//! Every task record lives in three places at once: an entry in the registry
//! (`tasks.json`), a task file in the task tree and a solution file in the
//! solution tree. Both file names carry the record's 1-based position within its
//! subsection, so reordering means renaming. The crate is split the same way the
//! work is:
//!
//! - **[`core`]**: Pure, deterministic logic (file naming, shift plans, section
//!   ordering, invariant checks). No I/O.
//! - **[`io`]**: Side-effecting operations (config, JSON stores, the mirror,
//!   child processes, document rendering).
//!
//! Orchestration modules ([`add`], [`renumber`], [`reorder`], [`reconcile`],
//! [`attributes`], [`check`], [`generate`]) coordinate core logic with I/O to
//! implement CLI commands. [`engine`] holds the shift-and-place algorithms shared
//! by insertion and moves.

pub mod add;
pub mod attributes;
pub mod base;
pub mod check;
pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod generate;
pub mod io;
pub mod logging;
pub mod reconcile;
pub mod registry;
pub mod renumber;
pub mod reorder;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
