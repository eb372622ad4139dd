//! Composite-entry strategy: one multi-slot authoring view, one submission.

use async_trait::async_trait;
use threadcast_protocol::{ContentUnit, PostedItem, Warning};
use threadcast_runtime::PageSurface;
use tracing::{info, warn};

use super::{PostingStrategy, StrategyOutcome, StrategyTuning};
use crate::error::Result;
use crate::focus::{self, SurfaceRole};
use crate::verify::{self, Confirmation, ConfirmationWatch};

/// Preferred strategy: fill every slot of the composite authoring view and
/// submit the whole chain at once.
pub struct CompositeEntryStrategy {
	tuning: StrategyTuning,
}

impl CompositeEntryStrategy {
	pub fn new(tuning: StrategyTuning) -> Self {
		Self { tuning }
	}
}

#[async_trait]
impl PostingStrategy for CompositeEntryStrategy {
	fn name(&self) -> &'static str {
		"composite-entry"
	}

	async fn execute(&self, surface: &dyn PageSurface, units: &[ContentUnit]) -> Result<StrategyOutcome> {
		info!(target = "threadcast.strategy", units = units.len(), "entering composite authoring view");
		let mut warnings: Vec<Warning> = Vec::new();

		let first = focus::acquire_with(surface, SurfaceRole::EntrySlot(0), &self.tuning.focus).await?;
		surface.clear(&first.selector).await?;
		surface.type_text(&first.selector, units[0].text()).await?;
		verify::verify_entry(surface, &first.selector, units[0].text()).await?;

		for unit in &units[1..] {
			let add = focus::acquire_with(surface, SurfaceRole::AddSlot, &self.tuning.focus).await?;
			surface.click(&add.selector).await?;

			let slot = focus::acquire_with(surface, SurfaceRole::EntrySlot(unit.position()), &self.tuning.focus).await?;
			surface.type_text(&slot.selector, unit.text()).await?;
			verify::verify_entry(surface, &slot.selector, unit.text()).await?;
		}

		// The surface's rendering may lag the slot additions; a mismatch is
		// a soft warning rather than a hard failure.
		let rendered = rendered_slot_count(surface, units.len()).await;
		if rendered != units.len() {
			warn!(
				target = "threadcast.strategy",
				rendered,
				expected = units.len(),
				"slot count mismatch before submission"
			);
			warnings.push(Warning::new(format!("authoring view rendered {rendered} slots for {} units", units.len())));
		}

		let submit = focus::acquire_with(surface, SurfaceRole::SubmitControl, &self.tuning.focus).await?;
		let baseline = surface.anchor_hrefs().await.unwrap_or_default();
		let before_url = surface.url().await?;
		// Discard captures accumulated while authoring so post-submission
		// capture only sees the submission's own traffic.
		let _ = surface.drain_captures().await;
		surface.click(&submit.selector).await?;

		let watch = ConfirmationWatch {
			entry_selector: first.selector.clone(),
			submit_selector: submit.selector.clone(),
			before_url: before_url.clone(),
			expected_text: units[0].text().to_string(),
			fallback: self.tuning.confirm_fallback,
		};
		let confirmation = verify::confirm_submission(surface, &watch).await?;
		if confirmation == Confirmation::AssumedAfterTimeout {
			warnings.push(Warning::new("submission assumed successful: no signal within the fallback window"));
		}

		tokio::time::sleep(self.tuning.settle).await;
		let captured = verify::capture_identifiers(surface, &baseline, Some(&before_url), units.len()).await;

		let mut items: Vec<PostedItem> = Vec::new();
		for (unit, capture) in units.iter().zip(captured.iter()) {
			items.push(PostedItem {
				position: unit.position(),
				identifier: Some(capture.id.clone()),
				url: capture.url.clone(),
			});
		}
		for unit in units.iter().skip(captured.len()) {
			warnings.push(Warning::at(unit.position(), "identifier not captured"));
		}

		Ok(StrategyOutcome {
			root_identifier: captured.first().map(|capture| capture.id.clone()),
			items,
			warnings,
		})
	}
}

/// Counts contiguously rendered entry slots, starting at slot 0.
async fn rendered_slot_count(surface: &dyn PageSurface, expected: usize) -> usize {
	let mut count = 0;
	for index in 0..expected {
		let mut present = false;
		for candidate in focus::candidates(SurfaceRole::EntrySlot(index)) {
			if surface.is_visible(&candidate.selector).await.unwrap_or(false) {
				present = true;
				break;
			}
		}
		if !present {
			break;
		}
		count += 1;
	}
	count
}

#[cfg(test)]
mod tests {
	use threadcast_runtime::fake::FakeSurface;

	use super::*;

	#[tokio::test]
	async fn slot_count_stops_at_first_gap() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_entry("[data-testid=\"composerSlot_0\"] [contenteditable=\"true\"]");
		controller.add_entry("[data-testid=\"composerSlot_2\"] [contenteditable=\"true\"]");

		assert_eq!(rendered_slot_count(surface.as_ref(), 3).await, 1);
	}
}
