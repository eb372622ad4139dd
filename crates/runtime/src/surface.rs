//! The narrow automation-surface seam driven by the orchestration core.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One structured network response observed by the surface.
#[derive(Debug, Clone)]
pub struct NetworkCapture {
	pub url: String,
	pub body: Value,
}

/// Page-level operations the posting core needs from an automation session.
///
/// Implementations wrap a live browser page; [`crate::fake::FakeSurface`]
/// provides a scripted in-memory implementation for tests. Every wait point
/// suspends cooperatively, so dropping a future that drives a surface cancels
/// the in-flight step at its next suspension.
#[async_trait]
pub trait PageSurface: Send + Sync + std::fmt::Debug {
	async fn goto(&self, url: &str) -> Result<()>;

	/// Current page URL.
	async fn url(&self) -> Result<String>;

	async fn reload(&self) -> Result<()>;

	/// Waits up to `timeout` for `selector` to be present; returns whether it appeared.
	async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool>;

	async fn is_visible(&self, selector: &str) -> Result<bool>;

	/// Whether the element accepts text input.
	async fn is_editable(&self, selector: &str) -> Result<bool>;

	/// Whether the element is enabled for interaction.
	async fn is_enabled(&self, selector: &str) -> Result<bool>;

	async fn click(&self, selector: &str) -> Result<()>;

	/// Clears any residual content from an entry element.
	async fn clear(&self, selector: &str) -> Result<()>;

	/// Types `text` into the element, appending to existing content.
	async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

	/// Sends a keyboard shortcut to the page.
	async fn press(&self, key: &str) -> Result<()>;

	async fn text_content(&self, selector: &str) -> Result<Option<String>>;

	/// All anchor hrefs currently on the page.
	async fn anchor_hrefs(&self) -> Result<Vec<String>>;

	/// Structured responses observed since the last drain.
	async fn drain_captures(&self) -> Result<Vec<NetworkCapture>>;

	/// Whether the underlying session is still usable.
	fn is_connected(&self) -> bool;

	/// Best-effort shutdown of the underlying session.
	async fn close(&self) -> Result<()>;
}
