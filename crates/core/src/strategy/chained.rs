//! Chained-reply strategy: publish the root standalone, reply for each
//! subsequent unit.

use async_trait::async_trait;
use threadcast_protocol::{ContentUnit, ItemId, PostedItem, Warning};
use threadcast_runtime::PageSurface;
use tracing::{info, warn};

use super::{PostingStrategy, StrategyOutcome, StrategyTuning};
use crate::error::{PostError, Result};
use crate::focus::{self, SurfaceRole};
use crate::verify::{self, Confirmation, ConfirmationWatch};

/// Fallback strategy: each unit is a separate publish-then-link operation.
///
/// The root publish must succeed and yield an identifier; without it there
/// is nothing to chain to. After that, an individual reply failure records
/// a warning and the strategy keeps going, so a flaky middle reply costs
/// one chain position instead of the whole job.
pub struct ChainedReplyStrategy {
	tuning: StrategyTuning,
}

impl ChainedReplyStrategy {
	pub fn new(tuning: StrategyTuning) -> Self {
		Self { tuning }
	}

	async fn publish_root(&self, surface: &dyn PageSurface, unit: &ContentUnit) -> Result<verify::Captured> {
		let entry = focus::acquire_with(surface, SurfaceRole::EntrySlot(0), &self.tuning.focus).await?;
		surface.clear(&entry.selector).await?;
		surface.type_text(&entry.selector, unit.text()).await?;
		verify::verify_entry(surface, &entry.selector, unit.text()).await?;

		let submit = focus::acquire_with(surface, SurfaceRole::SubmitControl, &self.tuning.focus).await?;
		let baseline = surface.anchor_hrefs().await.unwrap_or_default();
		let before_url = surface.url().await?;
		let _ = surface.drain_captures().await;
		surface.click(&submit.selector).await?;

		let watch = ConfirmationWatch {
			entry_selector: entry.selector.clone(),
			submit_selector: submit.selector.clone(),
			before_url: before_url.clone(),
			expected_text: unit.text().to_string(),
			fallback: self.tuning.confirm_fallback,
		};
		verify::confirm_submission(surface, &watch).await?;
		tokio::time::sleep(self.tuning.settle).await;

		verify::capture_identifier(surface, &baseline, Some(&before_url)).await.ok_or_else(|| PostError::Strategy {
			strategy: "chained-reply",
			message: "root identifier capture failed; nothing to anchor replies to".to_string(),
		})
	}

	async fn publish_reply(&self, surface: &dyn PageSurface, anchor_url: &str, unit: &ContentUnit) -> Result<PublishedReply> {
		surface.goto(anchor_url).await?;

		let trigger = focus::acquire_with(surface, SurfaceRole::ReplyTrigger, &self.tuning.focus).await?;
		surface.click(&trigger.selector).await?;

		let entry = focus::acquire_with(surface, SurfaceRole::ReplyEntry, &self.tuning.focus).await?;
		surface.clear(&entry.selector).await?;
		surface.type_text(&entry.selector, unit.text()).await?;
		verify::verify_entry(surface, &entry.selector, unit.text()).await?;

		let submit = focus::acquire_with(surface, SurfaceRole::ReplySubmit, &self.tuning.focus).await?;
		let baseline = surface.anchor_hrefs().await.unwrap_or_default();
		let before_url = surface.url().await?;
		let _ = surface.drain_captures().await;
		surface.click(&submit.selector).await?;

		let watch = ConfirmationWatch {
			entry_selector: entry.selector.clone(),
			submit_selector: submit.selector.clone(),
			before_url: before_url.clone(),
			expected_text: unit.text().to_string(),
			fallback: self.tuning.confirm_fallback,
		};
		let confirmation = verify::confirm_submission(surface, &watch).await?;
		tokio::time::sleep(self.tuning.settle).await;

		match verify::capture_identifier(surface, &baseline, Some(&before_url)).await {
			Some(captured) => {
				let anchor = captured.url.clone().unwrap_or_else(|| item_url(&before_url, &captured.id));
				Ok(PublishedReply {
					item: PostedItem {
						position: unit.position(),
						identifier: Some(captured.id),
						url: captured.url,
					},
					anchor_url: Some(anchor),
					synthesized: false,
					assumed: confirmation == Confirmation::AssumedAfterTimeout,
				})
			}
			None => {
				// Keep the chain position with a placeholder; the next reply
				// stays anchored to the last item with a real URL.
				let placeholder = verify::synthetic_id();
				Ok(PublishedReply {
					item: PostedItem {
						position: unit.position(),
						identifier: Some(placeholder),
						url: None,
					},
					anchor_url: None,
					synthesized: true,
					assumed: confirmation == Confirmation::AssumedAfterTimeout,
				})
			}
		}
	}
}

struct PublishedReply {
	item: PostedItem,
	anchor_url: Option<String>,
	synthesized: bool,
	assumed: bool,
}

#[async_trait]
impl PostingStrategy for ChainedReplyStrategy {
	fn name(&self) -> &'static str {
		"chained-reply"
	}

	async fn execute(&self, surface: &dyn PageSurface, units: &[ContentUnit]) -> Result<StrategyOutcome> {
		info!(target = "threadcast.strategy", units = units.len(), "publishing root of reply chain");
		let mut warnings: Vec<Warning> = Vec::new();

		let root = self.publish_root(surface, &units[0]).await?;
		let root_id = root.id.clone();
		let current_url = surface.url().await.unwrap_or_default();
		let mut anchor_url = root.url.clone().unwrap_or_else(|| item_url(&current_url, &root_id));

		let mut items = vec![PostedItem {
			position: units[0].position(),
			identifier: Some(root.id),
			url: root.url,
		}];

		for unit in &units[1..] {
			// Pacing between replies, matching the surface's own rate shaping.
			tokio::time::sleep(self.tuning.reply_delay).await;

			match self.publish_reply(surface, &anchor_url, unit).await {
				Ok(reply) => {
					if let Some(anchor) = &reply.anchor_url {
						anchor_url = anchor.clone();
					}
					if reply.synthesized {
						warnings.push(Warning::at(unit.position(), "identifier capture failed; placeholder assigned"));
					}
					if reply.assumed {
						warnings.push(Warning::at(unit.position(), "reply submission assumed successful: no signal within the fallback window"));
					}
					items.push(reply.item);
				}
				Err(err) => {
					warn!(
						target = "threadcast.strategy",
						position = unit.position(),
						error = %err,
						"reply failed; continuing chain"
					);
					warnings.push(Warning::at(unit.position(), format!("reply failed: {err}")));
				}
			}
		}

		Ok(StrategyOutcome {
			root_identifier: Some(root_id),
			items,
			warnings,
		})
	}
}

/// Builds an item URL on the same origin as `current`.
fn item_url(current: &str, id: &ItemId) -> String {
	match origin_of(current) {
		Some(origin) => format!("{origin}/i/status/{id}"),
		None => format!("/i/status/{id}"),
	}
}

fn origin_of(url: &str) -> Option<&str> {
	let scheme_end = url.find("://")? + 3;
	match url[scheme_end..].find('/') {
		Some(path_start) => Some(&url[..scheme_end + path_start]),
		None => Some(url),
	}
}
