//! Socket and connection management.
//!
//! Mirrors the relevant parts of Chromium's `net/socket/`:
//! - [`connectjob`]: DNS → TCP → proxy tunnel connection flow
//! - [`matcher`]: NO_PROXY exclusion list
//! - [`proxy`]: proxy configuration and per-connection selection
//! - [`stream`]: the `StreamConn` byte-stream contract

pub mod connectjob;
pub mod matcher;
pub mod proxy;
pub mod stream;
