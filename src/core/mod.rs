//! core
//!
//! Domain types, path routing and configuration.
//!
//! Nothing in this module performs network I/O.

pub mod config;
pub mod paths;
pub mod types;
