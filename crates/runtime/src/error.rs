//! Runtime error taxonomy.

use thiserror::Error;

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;

/// Errors raised by surface lifecycle and surface operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
	/// A surface operation failed at the driver level.
	#[error("driver error: {0}")]
	Driver(String),

	/// The underlying automation session is no longer connected.
	#[error("automation session disconnected")]
	Disconnected,

	/// Every launch profile was exhausted without producing a session.
	#[error("no launch profile produced a session: {0}")]
	ResourceUnavailable(String),

	/// The shared-surface circuit breaker is open; no surface work was attempted.
	#[error("circuit breaker open for another {remaining_ms}ms")]
	CircuitBreakerOpen { remaining_ms: u64 },
}

impl RuntimeError {
	pub fn driver(message: impl Into<String>) -> Self {
		Self::Driver(message.into())
	}
}
