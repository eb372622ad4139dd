//! Posting error taxonomy and propagation policy.

use std::time::Duration;

use thiserror::Error;
use threadcast_protocol::ErrorKind;
use threadcast_runtime::RuntimeError;

pub type Result<T, E = PostError> = std::result::Result<T, E>;

/// Errors raised while executing a posting job.
///
/// Step-level errors are caught by the layer above and turned into the next
/// fallback (candidate → candidate, strategy → strategy, attempt → retry);
/// only exhaustion of every fallback and retry surfaces to the caller, and
/// then always as a structured `JobResult`, never a panic or a raw `Err`.
#[derive(Debug, Error)]
pub enum PostError {
	#[error("validation failed: {0}")]
	Validation(String),

	#[error("focus acquisition failed for {role}: {reason}")]
	FocusAcquisition { role: String, reason: String },

	#[error("entered content failed verification at {selector}: {reason}")]
	ContentVerification { selector: String, reason: String },

	#[error("submission not confirmed: {0}")]
	SubmissionNotConfirmed(String),

	/// Soft: capture failure never fails a job, it shortens the item list.
	#[error("identifier capture failed: {0}")]
	IdentifierCapture(String),

	#[error("strategy {strategy} failed: {message}")]
	Strategy { strategy: &'static str, message: String },

	#[error(transparent)]
	Runtime(#[from] RuntimeError),

	#[error("job attempt exceeded {}s global timeout", .0.as_secs())]
	Timeout(Duration),

	#[error("metrics write failed: {0}")]
	Metrics(String),
}

impl PostError {
	/// Maps the error onto the caller-facing taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			PostError::Validation(_) => ErrorKind::Validation,
			PostError::FocusAcquisition { .. } => ErrorKind::FocusAcquisition,
			PostError::ContentVerification { .. } => ErrorKind::ContentVerification,
			PostError::SubmissionNotConfirmed(_) => ErrorKind::SubmissionNotConfirmed,
			PostError::IdentifierCapture(_) | PostError::Strategy { .. } => ErrorKind::Strategy,
			PostError::Runtime(RuntimeError::CircuitBreakerOpen { .. }) => ErrorKind::CircuitBreakerOpen,
			PostError::Runtime(_) => ErrorKind::ResourceUnavailable,
			PostError::Timeout(_) => ErrorKind::TimeoutExceeded,
			PostError::Metrics(_) => ErrorKind::Metrics,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn runtime_errors_map_to_resource_kinds() {
		let unavailable = PostError::Runtime(RuntimeError::ResourceUnavailable("all profiles failed".into()));
		assert_eq!(unavailable.kind(), ErrorKind::ResourceUnavailable);

		let open = PostError::Runtime(RuntimeError::CircuitBreakerOpen { remaining_ms: 1000 });
		assert_eq!(open.kind(), ErrorKind::CircuitBreakerOpen);
	}

	#[test]
	fn timeout_maps_to_timeout_exceeded() {
		assert_eq!(PostError::Timeout(Duration::from_secs(180)).kind(), ErrorKind::TimeoutExceeded);
	}
}
