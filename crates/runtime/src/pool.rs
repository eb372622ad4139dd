//! Per-purpose surface pooling with transparent relaunch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::launcher::{SessionBlob, SurfaceFactory, launch_with_fallback};
use crate::surface::PageSurface;

/// What a pooled surface is used for. Pools never share surfaces across purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
	/// Exclusive per-job posting sessions.
	Posting,
	/// Repeated read-style operations.
	Readback,
}

impl std::fmt::Display for Purpose {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Purpose::Posting => f.write_str("posting"),
			Purpose::Readback => f.write_str("readback"),
		}
	}
}

/// Pool of automation surfaces keyed by purpose.
///
/// `acquire` hands out an idle healthy surface when one exists and launches a
/// fresh one through the profile ladder otherwise; a surface that
/// disconnected while idle is discarded without the caller ever seeing it.
pub struct SurfacePool {
	factory: Arc<dyn SurfaceFactory>,
	auth: Option<SessionBlob>,
	idle: Mutex<HashMap<Purpose, Vec<Arc<dyn PageSurface>>>>,
}

impl SurfacePool {
	pub fn new(factory: Arc<dyn SurfaceFactory>, auth: Option<SessionBlob>) -> Arc<Self> {
		Arc::new(Self {
			factory,
			auth,
			idle: Mutex::new(HashMap::new()),
		})
	}

	/// Acquires an exclusive surface for `purpose`.
	pub async fn acquire(self: &Arc<Self>, purpose: Purpose) -> Result<PooledSurface> {
		loop {
			let candidate = self.idle.lock().get_mut(&purpose).and_then(Vec::pop);
			match candidate {
				Some(surface) if surface.is_connected() => {
					debug!(target = "threadcast.session", %purpose, "reusing pooled surface");
					return Ok(PooledSurface {
						surface,
						purpose,
						pool: Arc::clone(self),
					});
				}
				Some(_) => {
					debug!(target = "threadcast.session", %purpose, "discarding disconnected pooled surface");
					continue;
				}
				None => break,
			}
		}

		let surface = launch_with_fallback(self.factory.as_ref(), self.auth.as_ref()).await?;
		Ok(PooledSurface {
			surface,
			purpose,
			pool: Arc::clone(self),
		})
	}

	fn put_back(&self, purpose: Purpose, surface: Arc<dyn PageSurface>) {
		self.idle.lock().entry(purpose).or_default().push(surface);
	}
}

/// Exclusive handle to one pooled surface.
pub struct PooledSurface {
	surface: Arc<dyn PageSurface>,
	purpose: Purpose,
	pool: Arc<SurfacePool>,
}

impl PooledSurface {
	pub fn surface(&self) -> &Arc<dyn PageSurface> {
		&self.surface
	}

	/// Returns a healthy surface to the pool; a disconnected one is dropped.
	pub fn release(self) {
		if self.surface.is_connected() {
			debug!(target = "threadcast.session", purpose = %self.purpose, "returning surface to pool");
			self.pool.put_back(self.purpose, self.surface);
		}
	}

	/// Closes the underlying surface, best-effort.
	pub async fn close(self) {
		if let Err(err) = self.surface.close().await {
			debug!(target = "threadcast.session", purpose = %self.purpose, error = %err, "surface close failed");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake::{FakeFactory, FakeSurface};

	#[tokio::test]
	async fn released_surface_is_reused() {
		let factory = Arc::new(FakeFactory::new());
		let pool = SurfacePool::new(factory.clone(), None);

		let handle = pool.acquire(Purpose::Posting).await.unwrap();
		handle.release();
		let _again = pool.acquire(Purpose::Posting).await.unwrap();
		assert_eq!(factory.launches(), 1);
	}

	#[tokio::test]
	async fn disconnected_idle_surface_is_replaced_transparently() {
		let factory = Arc::new(FakeFactory::new());
		let (dead, dead_controller) = FakeSurface::scripted();
		factory.push(dead);
		let pool = SurfacePool::new(factory.clone(), None);

		let handle = pool.acquire(Purpose::Posting).await.unwrap();
		handle.release();
		dead_controller.disconnect();

		let replacement = pool.acquire(Purpose::Posting).await.unwrap();
		assert!(replacement.surface().is_connected());
		assert_eq!(factory.launches(), 2);
	}

	#[tokio::test]
	async fn purposes_do_not_share_surfaces() {
		let factory = Arc::new(FakeFactory::new());
		let pool = SurfacePool::new(factory.clone(), None);

		let posting = pool.acquire(Purpose::Posting).await.unwrap();
		posting.release();
		let _readback = pool.acquire(Purpose::Readback).await.unwrap();
		assert_eq!(factory.launches(), 2);
	}
}
