//! Session launch with profile degradation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, RuntimeError};
use crate::profile::LaunchProfile;
use crate::surface::PageSurface;

/// Opaque pre-established authentication state for the target surface.
///
/// Produced by the credential collaborator and consumed as-is at launch;
/// the runtime never refreshes or validates it beyond presence.
#[derive(Debug, Clone)]
pub struct SessionBlob(Value);

impl SessionBlob {
	pub fn from_value(value: Value) -> Self {
		Self(value)
	}

	pub fn as_value(&self) -> &Value {
		&self.0
	}
}

/// Launches automation sessions for a concrete driver backend.
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
	/// Launches a session using `profile`, optionally seeded with `auth`.
	async fn launch(&self, profile: &LaunchProfile, auth: Option<&SessionBlob>) -> Result<Arc<dyn PageSurface>>;

	/// Best-effort cleanup after a failed launch, before the next profile is tried.
	async fn cleanup(&self) {}
}

/// Walks the profile ladder until one launch succeeds.
///
/// A failed profile triggers [`SurfaceFactory::cleanup`] before the next,
/// more conservative profile is tried. Exhausting the ladder raises
/// [`RuntimeError::ResourceUnavailable`] carrying the per-profile failures.
pub async fn launch_with_fallback(factory: &dyn SurfaceFactory, auth: Option<&SessionBlob>) -> Result<Arc<dyn PageSurface>> {
	let mut failures: Vec<String> = Vec::new();

	for profile in LaunchProfile::ladder() {
		debug!(target = "threadcast.session", profile = profile.name, "launching session");
		match factory.launch(&profile, auth).await {
			Ok(surface) => {
				debug!(target = "threadcast.session", profile = profile.name, "session launched");
				return Ok(surface);
			}
			Err(err) => {
				warn!(
					target = "threadcast.session",
					profile = profile.name,
					error = %err,
					"launch failed; cleaning up before next profile"
				);
				failures.push(format!("{}: {}", profile.name, err));
				factory.cleanup().await;
			}
		}
	}

	Err(RuntimeError::ResourceUnavailable(failures.join("; ")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake::FakeFactory;

	#[tokio::test]
	async fn first_profile_failure_falls_through_with_cleanup() {
		let factory = FakeFactory::new().with_fail_profiles(vec!["full"]);
		let surface = launch_with_fallback(&factory, None).await.unwrap();
		assert!(surface.is_connected());
		assert_eq!(factory.launches(), 2);
		assert_eq!(factory.cleanups(), 1);
	}

	#[tokio::test]
	async fn ladder_exhaustion_is_resource_unavailable() {
		let factory = FakeFactory::new().with_fail_profiles(vec!["full", "degraded", "minimal"]);
		let err = launch_with_fallback(&factory, None).await.unwrap_err();
		match err {
			RuntimeError::ResourceUnavailable(message) => {
				assert!(message.contains("full"));
				assert!(message.contains("minimal"));
			}
			other => panic!("unexpected error: {other}"),
		}
		assert_eq!(factory.cleanups(), 3);
	}
}
