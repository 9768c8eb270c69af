//! I/O helpers for spine commands.

pub mod catalogue_store;
pub mod config;
pub mod init;
pub mod scenario;
pub mod trace;
