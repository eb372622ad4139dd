//! Automation-surface lifecycle for the threadcast posting core.
//!
//! This crate owns everything below the orchestration layer: the narrow
//! [`PageSurface`] seam the core drives, launch-profile degradation,
//! per-purpose surface pooling, and the shared long-lived read surface with
//! circuit-breaker protection. An in-memory [`fake`] surface backs unit and
//! integration tests without a live browser.

pub mod error;
pub mod fake;
pub mod launcher;
pub mod pool;
pub mod profile;
pub mod shared;
pub mod surface;

pub use error::{Result, RuntimeError};
pub use launcher::{SessionBlob, SurfaceFactory, launch_with_fallback};
pub use pool::{PooledSurface, Purpose, SurfacePool};
pub use profile::LaunchProfile;
pub use shared::{BreakerConfig, SharedSurface};
pub use surface::{NetworkCapture, PageSurface};
