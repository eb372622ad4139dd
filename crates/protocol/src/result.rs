//! Caller-facing result shapes: posted items, attempt records, job results.

use serde::{Deserialize, Serialize};

use crate::identifier::ItemId;
use crate::job::PostingMode;

/// Outcome of one strategy execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
	Success,
	Failure,
}

/// Append-only record of one strategy execution within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAttempt {
	pub strategy: String,
	/// Unix epoch milliseconds at which the strategy started.
	pub started_at_ms: u64,
	pub outcome: AttemptOutcome,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// One published unit with whatever the surface exposed about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedItem {
	/// Mirrors the position of the content unit that produced this item.
	pub position: usize,
	/// Captured or synthesized identifier; absent when capture failed and no
	/// placeholder was needed to keep the chain position.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identifier: Option<ItemId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

/// Soft finding recorded alongside an otherwise successful result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub position: Option<usize>,
	pub message: String,
}

impl Warning {
	pub fn new(message: impl Into<String>) -> Self {
		Self { position: None, message: message.into() }
	}

	pub fn at(position: usize, message: impl Into<String>) -> Self {
		Self {
			position: Some(position),
			message: message.into(),
		}
	}
}

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	Validation,
	FocusAcquisition,
	ContentVerification,
	SubmissionNotConfirmed,
	ResourceUnavailable,
	CircuitBreakerOpen,
	TimeoutExceeded,
	Strategy,
	Metrics,
}

/// Terminal error attached to a failed job result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
	pub kind: ErrorKind,
	pub message: String,
}

/// Structured result of one posting job.
///
/// `items` may be a strict subset of the job's units: partial identifier
/// capture on an otherwise successful publish is reported through `warnings`,
/// not as a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
	pub success: bool,
	pub mode_used: PostingMode,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub root_identifier: Option<ItemId>,
	pub items: Vec<PostedItem>,
	pub attempts: Vec<StrategyAttempt>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<Warning>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<JobError>,
}

impl JobResult {
	/// Builds a successful result.
	pub fn published(
		mode_used: PostingMode,
		root_identifier: Option<ItemId>,
		items: Vec<PostedItem>,
		attempts: Vec<StrategyAttempt>,
		warnings: Vec<Warning>,
	) -> Self {
		Self {
			success: true,
			mode_used,
			root_identifier,
			items,
			attempts,
			warnings,
			error: None,
		}
	}

	/// Builds a failed result carrying the terminal error.
	pub fn failed(mode_used: PostingMode, kind: ErrorKind, message: impl Into<String>, attempts: Vec<StrategyAttempt>) -> Self {
		Self {
			success: false,
			mode_used,
			root_identifier: None,
			items: Vec::new(),
			attempts,
			warnings: Vec::new(),
			error: Some(JobError { kind, message: message.into() }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn failed_result_carries_kind_and_message() {
		let result = JobResult::failed(PostingMode::Single, ErrorKind::Validation, "job has no content units", Vec::new());
		assert!(!result.success);
		let error = result.error.unwrap();
		assert_eq!(error.kind, ErrorKind::Validation);
		assert_eq!(error.message, "job has no content units");
	}

	#[test]
	fn result_serializes_camel_case() {
		let id = ItemId::parse("123456789012345678").unwrap();
		let result = JobResult::published(
			PostingMode::Single,
			Some(id.clone()),
			vec![PostedItem {
				position: 0,
				identifier: Some(id),
				url: None,
			}],
			Vec::new(),
			Vec::new(),
		);
		let value = serde_json::to_value(&result).unwrap();
		assert_eq!(value["modeUsed"], "single");
		assert_eq!(value["rootIdentifier"], "123456789012345678");
		assert_eq!(value["items"][0]["position"], 0);
		assert!(value.get("error").is_none());
	}

	#[test]
	fn error_kind_serializes_snake_case() {
		let value = serde_json::to_value(ErrorKind::TimeoutExceeded).unwrap();
		assert_eq!(value, "timeout_exceeded");
	}
}
