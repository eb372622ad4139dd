//! Shared long-lived surface for read-style operations, guarded by a circuit breaker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Result, RuntimeError};
use crate::launcher::{SessionBlob, SurfaceFactory, launch_with_fallback};
use crate::surface::PageSurface;

/// Circuit-breaker tuning for the shared surface path.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
	/// Consecutive failures that open the breaker.
	pub threshold: u32,
	/// How long calls are rejected once the breaker opens.
	pub cooldown: Duration,
}

impl Default for BreakerConfig {
	fn default() -> Self {
		Self {
			threshold: 3,
			cooldown: Duration::from_secs(60),
		}
	}
}

struct SharedState {
	surface: Option<Arc<dyn PageSurface>>,
	consecutive_failures: u32,
	open_until: Option<Instant>,
}

/// Long-lived surface reused across repeated read-style calls.
///
/// Unlike posting surfaces, this surface survives across jobs for the life of
/// the service object. After `threshold` consecutive failures every call made
/// before the cooldown elapses is rejected immediately with
/// [`RuntimeError::CircuitBreakerOpen`] and performs no surface work; the
/// first call after the cooldown closes the breaker and proceeds normally.
pub struct SharedSurface {
	factory: Arc<dyn SurfaceFactory>,
	auth: Option<SessionBlob>,
	config: BreakerConfig,
	state: Mutex<SharedState>,
}

impl SharedSurface {
	pub fn new(factory: Arc<dyn SurfaceFactory>, auth: Option<SessionBlob>, config: BreakerConfig) -> Self {
		Self {
			factory,
			auth,
			config,
			state: Mutex::new(SharedState {
				surface: None,
				consecutive_failures: 0,
				open_until: None,
			}),
		}
	}

	/// Runs `op` against the shared surface, launching or relaunching it as needed.
	pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
	where
		F: FnOnce(Arc<dyn PageSurface>) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		self.check_breaker()?;

		let surface = match self.current_surface() {
			Some(surface) => surface,
			None => match launch_with_fallback(self.factory.as_ref(), self.auth.as_ref()).await {
				Ok(surface) => {
					self.state.lock().surface = Some(Arc::clone(&surface));
					surface
				}
				Err(err) => {
					self.record_failure().await;
					return Err(err);
				}
			},
		};

		match op(surface).await {
			Ok(value) => {
				self.state.lock().consecutive_failures = 0;
				Ok(value)
			}
			Err(err) => {
				self.record_failure().await;
				Err(err)
			}
		}
	}

	/// Closes the shared surface if one is open. Breaker state is unaffected.
	pub async fn shutdown(&self) {
		let surface = self.state.lock().surface.take();
		if let Some(surface) = surface {
			if let Err(err) = surface.close().await {
				debug!(target = "threadcast.session", error = %err, "shared surface close failed");
			}
		}
	}

	fn check_breaker(&self) -> Result<()> {
		let mut state = self.state.lock();
		if let Some(open_until) = state.open_until {
			let now = Instant::now();
			if now < open_until {
				let remaining_ms = open_until.duration_since(now).as_millis() as u64;
				return Err(RuntimeError::CircuitBreakerOpen { remaining_ms });
			}
			debug!(target = "threadcast.session", "circuit breaker cooldown elapsed; closing breaker");
			state.open_until = None;
			state.consecutive_failures = 0;
		}
		Ok(())
	}

	fn current_surface(&self) -> Option<Arc<dyn PageSurface>> {
		self.state.lock().surface.clone().filter(|surface| surface.is_connected())
	}

	async fn record_failure(&self) {
		let torn_down = {
			let mut state = self.state.lock();
			state.consecutive_failures += 1;
			if state.consecutive_failures >= self.config.threshold {
				state.open_until = Some(Instant::now() + self.config.cooldown);
				warn!(
					target = "threadcast.session",
					failures = state.consecutive_failures,
					cooldown_ms = self.config.cooldown.as_millis() as u64,
					"circuit breaker opened for shared surface"
				);
				state.surface.take()
			} else {
				None
			}
		};

		if let Some(surface) = torn_down {
			if let Err(err) = surface.close().await {
				debug!(target = "threadcast.session", error = %err, "shared surface close failed");
			}
		}
	}
}
