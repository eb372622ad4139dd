//! Narrow interfaces to external collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use threadcast_protocol::{ItemId, PostingMode};
use threadcast_runtime::{SessionBlob, SurfaceFactory, SurfacePool};

/// Provides the opaque, previously-established authenticated session state.
///
/// The posting core only checks presence; refresh and validation belong to
/// the credential collaborator.
pub trait CredentialStore: Send + Sync {
	fn session_blob(&self) -> Option<SessionBlob>;
}

/// Credential store over a fixed in-memory blob.
pub struct StaticCredentialStore(Option<SessionBlob>);

impl StaticCredentialStore {
	pub fn new(blob: Option<SessionBlob>) -> Self {
		Self(blob)
	}
}

impl CredentialStore for StaticCredentialStore {
	fn session_blob(&self) -> Option<SessionBlob> {
		self.0.clone()
	}
}

/// Metadata written to the learning store for one published item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
	pub identifier: ItemId,
	pub position: usize,
	pub mode: PostingMode,
	pub chars: usize,
	/// Leading slice of the published text, for attribution lookups.
	pub preview: String,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MetricsError(pub String);

/// Receives per-item records after a successful job.
///
/// Sink failures are logged by the orchestrator and never fail the job.
#[async_trait]
pub trait MetricsSink: Send + Sync {
	async fn record(&self, records: &[PostRecord]) -> Result<(), MetricsError>;
}

/// Sink that drops every record.
pub struct NullMetricsSink;

#[async_trait]
impl MetricsSink for NullMetricsSink {
	async fn record(&self, _records: &[PostRecord]) -> Result<(), MetricsError> {
		Ok(())
	}
}

/// Builds a surface pool seeded with whatever session state the store holds.
pub fn pool_from_store(factory: Arc<dyn SurfaceFactory>, store: &dyn CredentialStore) -> Arc<SurfacePool> {
	SurfacePool::new(factory, store.session_blob())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn static_store_round_trips_blob() {
		let store = StaticCredentialStore::new(Some(SessionBlob::from_value(json!({"cookies": []}))));
		assert!(store.session_blob().is_some());
		assert!(StaticCredentialStore::new(None).session_blob().is_none());
	}
}
