// Licensed under the Apache-2.0 license

//! Shared support types used across the driver modules.

/// Minimal logging seam for driver diagnostics.
///
/// Implementations forward messages to whatever sink the host firmware
/// provides (UART, semihosting, a ring buffer). All methods default to
/// dropping the message so implementors only override what they need.
pub trait Logger {
    fn log_info(&self, _msg: &str) {}
    fn log_warn(&self, _msg: &str) {}
    fn log_error(&self, _msg: &str) {}
}

/// Logger that discards all output. The default for production builds.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {}
