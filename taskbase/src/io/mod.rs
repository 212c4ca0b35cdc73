//! I/O helpers for taskbase commands.

pub mod config;
pub mod document;
pub mod init;
pub mod json_store;
pub mod mirror;
pub mod order_store;
pub mod paths;
pub mod process;
pub mod registry_store;
