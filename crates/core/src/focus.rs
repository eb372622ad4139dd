//! Focus acquisition over structurally unstable interactive elements.
//!
//! The target surface renders the same logical control under several
//! different structures depending on rollout bucket and page state, so each
//! role carries an ordered candidate list, most-specific first. Candidates
//! that are present but not interactive are skipped, and total exhaustion
//! escalates through overlay dismissal, a platform keyboard shortcut, and a
//! full reload before the role is declared unacquirable.

use std::fmt;
use std::time::Duration;

use threadcast_runtime::PageSurface;
use tracing::debug;

use crate::error::{PostError, Result};

/// Interactive element the posting flow needs to drive next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
	/// Entry slot `n` of the multi-slot authoring view.
	EntrySlot(usize),
	/// Entry field of a reply-style authoring view.
	ReplyEntry,
	/// Submit control of the multi-slot authoring view.
	SubmitControl,
	/// Submit control of a reply-style authoring view.
	ReplySubmit,
	/// Control that appends another entry slot.
	AddSlot,
	/// Control that dismisses a blocking overlay.
	DismissOverlay,
	/// Control that opens a reply-style authoring view on an item page.
	ReplyTrigger,
}

impl SurfaceRole {
	/// Platform keyboard shortcut that opens the authoring view for this role.
	fn shortcut(&self) -> Option<&'static str> {
		match self {
			SurfaceRole::EntrySlot(_) | SurfaceRole::AddSlot | SurfaceRole::SubmitControl => Some("n"),
			SurfaceRole::ReplyEntry | SurfaceRole::ReplySubmit | SurfaceRole::ReplyTrigger => Some("r"),
			SurfaceRole::DismissOverlay => None,
		}
	}
}

impl fmt::Display for SurfaceRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SurfaceRole::EntrySlot(index) => write!(f, "entry-slot-{index}"),
			SurfaceRole::ReplyEntry => f.write_str("reply-entry"),
			SurfaceRole::SubmitControl => f.write_str("submit-control"),
			SurfaceRole::ReplySubmit => f.write_str("reply-submit"),
			SurfaceRole::AddSlot => f.write_str("add-slot"),
			SurfaceRole::DismissOverlay => f.write_str("dismiss-overlay"),
			SurfaceRole::ReplyTrigger => f.write_str("reply-trigger"),
		}
	}
}

/// How a matched candidate must respond before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
	Editable,
	Clickable,
}

/// One locator in a role's fallback list.
#[derive(Debug, Clone)]
pub struct Candidate {
	pub selector: String,
	pub interaction: Interaction,
}

impl Candidate {
	fn editable(selector: impl Into<String>) -> Self {
		Self {
			selector: selector.into(),
			interaction: Interaction::Editable,
		}
	}

	fn clickable(selector: impl Into<String>) -> Self {
		Self {
			selector: selector.into(),
			interaction: Interaction::Clickable,
		}
	}
}

/// Ordered locator candidates for `role`, most-specific first.
pub fn candidates(role: SurfaceRole) -> Vec<Candidate> {
	match role {
		SurfaceRole::EntrySlot(index) => {
			let mut list = vec![
				Candidate::editable(format!("[data-testid=\"composerSlot_{index}\"] [contenteditable=\"true\"]")),
				Candidate::editable(format!("div[role=\"textbox\"][data-slot-index=\"{index}\"]")),
			];
			// The broad contenteditable match resolves to the first slot, so it
			// only backs up slot 0.
			if index == 0 {
				list.push(Candidate::editable("div[contenteditable=\"true\"][role=\"textbox\"]"));
			}
			list
		}
		SurfaceRole::ReplyEntry => vec![
			Candidate::editable("[data-testid=\"replyComposer\"] [contenteditable=\"true\"]"),
			Candidate::editable("div[role=\"textbox\"][aria-label=\"Post your reply\"]"),
			Candidate::editable("div[contenteditable=\"true\"][role=\"textbox\"]"),
		],
		SurfaceRole::SubmitControl => vec![
			Candidate::clickable("[data-testid=\"composerSubmit\"]"),
			Candidate::clickable("button[data-action=\"post\"]"),
			Candidate::clickable("div[role=\"button\"][aria-label=\"Post\"]"),
		],
		SurfaceRole::ReplySubmit => vec![
			Candidate::clickable("[data-testid=\"replySubmit\"]"),
			Candidate::clickable("button[data-action=\"reply\"]"),
			Candidate::clickable("div[role=\"button\"][aria-label=\"Reply\"]"),
		],
		SurfaceRole::AddSlot => vec![
			Candidate::clickable("[data-testid=\"addSlotButton\"]"),
			Candidate::clickable("button[aria-label=\"Add another post\"]"),
			Candidate::clickable("div[role=\"button\"][aria-label=\"Add\"]"),
		],
		SurfaceRole::DismissOverlay => vec![
			Candidate::clickable("[data-testid=\"overlayClose\"]"),
			Candidate::clickable("div[role=\"dialog\"] [aria-label=\"Close\"]"),
			Candidate::clickable("[aria-label=\"Dismiss\"]"),
		],
		SurfaceRole::ReplyTrigger => vec![
			Candidate::clickable("[data-testid=\"replyAction\"]"),
			Candidate::clickable("div[role=\"button\"][data-action=\"reply-open\"]"),
			Candidate::clickable("div[role=\"button\"][aria-label^=\"Reply\"]"),
		],
	}
}

/// Probe and escalation timing.
#[derive(Debug, Clone)]
pub struct FocusTuning {
	/// Wait budget per candidate locator.
	pub candidate_timeout: Duration,
	/// Settle delay after an escalation action before reprobing.
	pub settle: Duration,
}

impl Default for FocusTuning {
	fn default() -> Self {
		Self {
			candidate_timeout: Duration::from_millis(1200),
			settle: Duration::from_millis(400),
		}
	}
}

/// Selector handle for an acquired element.
#[derive(Debug, Clone)]
pub struct Acquired {
	pub selector: String,
	pub interaction: Interaction,
}

/// Finds and activates the element for `role` with default tuning.
pub async fn acquire(surface: &dyn PageSurface, role: SurfaceRole) -> Result<Acquired> {
	acquire_with(surface, role, &FocusTuning::default()).await
}

/// Finds and activates the element for `role`.
///
/// Escalation order on candidate exhaustion: overlay dismissal, platform
/// keyboard shortcut, full reload, each followed by a reprobe. Only when all
/// of these fail is the role reported unacquirable.
pub async fn acquire_with(surface: &dyn PageSurface, role: SurfaceRole, tuning: &FocusTuning) -> Result<Acquired> {
	if let Some(found) = probe(surface, role, tuning).await? {
		return activate(surface, role, found).await;
	}

	if role == SurfaceRole::DismissOverlay {
		return Err(exhausted(role, "no overlay dismiss control matched"));
	}

	debug!(target = "threadcast.focus", role = %role, "candidates exhausted; dismissing overlays");
	if let Some(dismiss) = probe(surface, SurfaceRole::DismissOverlay, tuning).await? {
		let _ = surface.click(&dismiss.selector).await;
		tokio::time::sleep(tuning.settle).await;
		if let Some(found) = probe(surface, role, tuning).await? {
			return activate(surface, role, found).await;
		}
	}

	if let Some(key) = role.shortcut() {
		debug!(target = "threadcast.focus", role = %role, key, "trying keyboard shortcut");
		let _ = surface.press(key).await;
		tokio::time::sleep(tuning.settle).await;
		if let Some(found) = probe(surface, role, tuning).await? {
			return activate(surface, role, found).await;
		}
	}

	debug!(target = "threadcast.focus", role = %role, "reloading page");
	surface.reload().await?;
	tokio::time::sleep(tuning.settle).await;
	if let Some(found) = probe(surface, role, tuning).await? {
		return activate(surface, role, found).await;
	}

	Err(exhausted(role, "no candidate matched after overlay dismissal, shortcut, and reload"))
}

async fn probe(surface: &dyn PageSurface, role: SurfaceRole, tuning: &FocusTuning) -> Result<Option<Candidate>> {
	for candidate in candidates(role) {
		if !surface.wait_for(&candidate.selector, tuning.candidate_timeout).await? {
			continue;
		}

		let interactive = match candidate.interaction {
			Interaction::Editable => surface.is_visible(&candidate.selector).await? && surface.is_editable(&candidate.selector).await?,
			Interaction::Clickable => surface.is_visible(&candidate.selector).await? && surface.is_enabled(&candidate.selector).await?,
		};

		if interactive {
			debug!(target = "threadcast.focus", role = %role, selector = %candidate.selector, "candidate accepted");
			return Ok(Some(candidate));
		}

		debug!(
			target = "threadcast.focus",
			role = %role,
			selector = %candidate.selector,
			"candidate present but not interactive; skipping"
		);
	}
	Ok(None)
}

async fn activate(surface: &dyn PageSurface, role: SurfaceRole, candidate: Candidate) -> Result<Acquired> {
	// Entry elements are focused by clicking; controls are left for the
	// caller to click at the right point in the flow.
	if candidate.interaction == Interaction::Editable {
		surface.click(&candidate.selector).await.map_err(|err| PostError::FocusAcquisition {
			role: role.to_string(),
			reason: format!("focus click failed: {err}"),
		})?;
	}
	Ok(Acquired {
		selector: candidate.selector,
		interaction: candidate.interaction,
	})
}

fn exhausted(role: SurfaceRole, reason: &str) -> PostError {
	PostError::FocusAcquisition {
		role: role.to_string(),
		reason: reason.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use threadcast_runtime::fake::{Action, Effect, ElementState, FakeSurface};

	use super::*;

	fn quick() -> FocusTuning {
		FocusTuning {
			candidate_timeout: Duration::from_millis(50),
			settle: Duration::from_millis(10),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn most_specific_candidate_wins() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_entry("[data-testid=\"composerSlot_0\"] [contenteditable=\"true\"]");
		controller.add_entry("div[contenteditable=\"true\"][role=\"textbox\"]");

		let acquired = acquire_with(surface.as_ref(), SurfaceRole::EntrySlot(0), &quick()).await.unwrap();
		assert_eq!(acquired.selector, "[data-testid=\"composerSlot_0\"] [contenteditable=\"true\"]");
	}

	#[tokio::test(start_paused = true)]
	async fn inert_candidate_is_skipped() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_element(
			"[data-testid=\"composerSlot_0\"] [contenteditable=\"true\"]",
			ElementState {
				visible: true,
				editable: false,
				enabled: true,
				text: String::new(),
			},
		);
		controller.add_entry("div[role=\"textbox\"][data-slot-index=\"0\"]");

		let acquired = acquire_with(surface.as_ref(), SurfaceRole::EntrySlot(0), &quick()).await.unwrap();
		assert_eq!(acquired.selector, "div[role=\"textbox\"][data-slot-index=\"0\"]");
	}

	#[tokio::test(start_paused = true)]
	async fn overlay_dismissal_unblocks_acquisition() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_button("[data-testid=\"overlayClose\"]");
		controller.on_click(
			"[data-testid=\"overlayClose\"]",
			vec![
				Effect::RemoveElement("[data-testid=\"overlayClose\"]".into()),
				Effect::AddElement {
					selector: "[data-testid=\"replyComposer\"] [contenteditable=\"true\"]".into(),
					state: ElementState::entry(),
				},
			],
		);

		let acquired = acquire_with(surface.as_ref(), SurfaceRole::ReplyEntry, &quick()).await.unwrap();
		assert_eq!(acquired.selector, "[data-testid=\"replyComposer\"] [contenteditable=\"true\"]");
		assert!(controller.actions().contains(&Action::Click("[data-testid=\"overlayClose\"]".into())));
	}

	#[tokio::test(start_paused = true)]
	async fn shortcut_opens_authoring_view() {
		let (surface, controller) = FakeSurface::scripted();
		controller.on_press(
			"n",
			vec![Effect::AddElement {
				selector: "[data-testid=\"composerSlot_0\"] [contenteditable=\"true\"]".into(),
				state: ElementState::entry(),
			}],
		);

		let acquired = acquire_with(surface.as_ref(), SurfaceRole::EntrySlot(0), &quick()).await.unwrap();
		assert_eq!(acquired.selector, "[data-testid=\"composerSlot_0\"] [contenteditable=\"true\"]");
		assert!(controller.actions().contains(&Action::Press("n".into())));
	}

	#[tokio::test(start_paused = true)]
	async fn total_exhaustion_reloads_then_fails() {
		let (surface, controller) = FakeSurface::scripted();

		let err = acquire_with(surface.as_ref(), SurfaceRole::SubmitControl, &quick()).await.unwrap_err();
		assert!(matches!(err, PostError::FocusAcquisition { .. }));
		assert!(controller.actions().contains(&Action::Reload));
	}
}
