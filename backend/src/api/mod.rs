//! HTTP API module.
//!
//! This module provides the HTTP server, its payload types and the log
//! broadcaster every pipeline step reports through.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server};
pub use types::*;
