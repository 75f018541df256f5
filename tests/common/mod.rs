//! Common test utilities and fixtures for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: log lines, service payloads and config files
//! - `log_capture`: tracing capture with leak assertions
//! - `logger`: structured test logging

pub mod fixtures;
pub mod log_capture;
pub mod logger;
