//! Entry verification, submission confirmation, and identifier capture.
//!
//! The target surface gives no reliable positive acknowledgment for any of
//! the three, so each check is heuristic: entered text is matched on a
//! whitespace-normalized prefix rather than byte equality, submission is
//! confirmed by racing several indirect signals, and identifiers are fished
//! out of network captures, the page URL, and newly-appeared links in that
//! order.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::select_all;
use regex::Regex;
use threadcast_protocol::ItemId;
use threadcast_runtime::{NetworkCapture, PageSurface};
use tracing::{debug, warn};

use crate::error::{PostError, Result};

const VERIFY_ATTEMPTS: u32 = 3;
const VERIFY_BACKOFF: Duration = Duration::from_millis(200);
const PREFIX_CHARS: usize = 24;
const SIGNAL_POLL: Duration = Duration::from_millis(100);

/// JSON keys that carry an item identifier in intercepted responses.
const ID_FIELDS: [&str; 3] = ["rest_id", "id_str", "item_id"];

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/status/(\d{18,20})(?:\D|$)").unwrap());

static SYNTHETIC_SEQ: AtomicU64 = AtomicU64::new(1);

/// Collapses runs of whitespace to single spaces and trims the ends.
pub fn normalize_ws(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The normalized prefix an entry must render before it counts as accepted.
pub fn significant_prefix(text: &str) -> String {
	normalize_ws(text).chars().take(PREFIX_CHARS).collect()
}

/// Checks that the rendered entry contains a significant prefix of `expected`.
///
/// Exact comparison is deliberately avoided: the surface reflows whitespace
/// and may decorate entities as it renders. The check retries with a short
/// backoff before raising, since rendering can lag the keystrokes.
pub async fn verify_entry(surface: &dyn PageSurface, selector: &str, expected: &str) -> Result<()> {
	let prefix = significant_prefix(expected);
	if prefix.is_empty() {
		return Ok(());
	}

	for attempt in 1..=VERIFY_ATTEMPTS {
		let rendered = surface.text_content(selector).await?.unwrap_or_default();
		if normalize_ws(&rendered).contains(&prefix) {
			return Ok(());
		}
		debug!(
			target = "threadcast.verify",
			selector,
			attempt,
			rendered_chars = rendered.chars().count(),
			"rendered content missing expected prefix"
		);
		if attempt < VERIFY_ATTEMPTS {
			tokio::time::sleep(VERIFY_BACKOFF).await;
		}
	}

	Err(PostError::ContentVerification {
		selector: selector.to_string(),
		reason: format!("rendered content never contained the expected prefix ({prefix:?})"),
	})
}

/// Signal that ended the submission-confirmation race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
	/// The page navigated away from the authoring view.
	Navigated(String),
	/// The entry surface detached from the page.
	EntryDetached,
	/// The submit control transitioned to a disabled state.
	SubmitDisabled,
	/// The fallback window elapsed with no contrary signal.
	AssumedAfterTimeout,
}

/// What the confirmation race observes.
#[derive(Debug, Clone)]
pub struct ConfirmationWatch {
	pub entry_selector: String,
	pub submit_selector: String,
	pub before_url: String,
	pub expected_text: String,
	/// Fallback window after which silence is treated as success.
	pub fallback: Duration,
}

/// Races the available success signals after a submit click.
///
/// The fallback arm treats "no evidence of failure after a reasonable wait"
/// as success because the surface gives no positive acknowledgment. That is
/// a known false-positive risk: a silently rejected submission whose
/// authoring view also went away will be reported as confirmed. The one
/// contrary signal checked at the deadline is an intact entry still holding
/// the submitted text.
pub async fn confirm_submission(surface: &dyn PageSurface, watch: &ConfirmationWatch) -> Result<Confirmation> {
	let navigation = Box::pin(async {
		loop {
			let url = surface.url().await?;
			if url != watch.before_url {
				return Ok(Confirmation::Navigated(url));
			}
			tokio::time::sleep(SIGNAL_POLL).await;
		}
	});

	let detachment = Box::pin(async {
		loop {
			if !surface.is_visible(&watch.entry_selector).await? {
				return Ok(Confirmation::EntryDetached);
			}
			tokio::time::sleep(SIGNAL_POLL).await;
		}
	});

	let disablement = Box::pin(async {
		loop {
			if !surface.is_enabled(&watch.submit_selector).await? {
				return Ok(Confirmation::SubmitDisabled);
			}
			tokio::time::sleep(SIGNAL_POLL).await;
		}
	});

	let fallback = Box::pin(async {
		tokio::time::sleep(watch.fallback).await;
		let entry_intact = surface.is_visible(&watch.entry_selector).await?;
		if entry_intact {
			let rendered = surface.text_content(&watch.entry_selector).await?.unwrap_or_default();
			let prefix = significant_prefix(&watch.expected_text);
			if !prefix.is_empty() && normalize_ws(&rendered).contains(&prefix) {
				return Err(PostError::SubmissionNotConfirmed(format!(
					"entry still holds submitted text after {}ms",
					watch.fallback.as_millis()
				)));
			}
		}
		warn!(
			target = "threadcast.verify",
			fallback_ms = watch.fallback.as_millis() as u64,
			"no submission signal within fallback window; assuming success"
		);
		Ok(Confirmation::AssumedAfterTimeout)
	});

	let arms: Vec<std::pin::Pin<Box<dyn std::future::Future<Output = Result<Confirmation>> + Send + '_>>> =
		vec![navigation, detachment, disablement, fallback];
	let (outcome, _index, _rest) = select_all(arms).await;

	if let Ok(signal) = &outcome {
		debug!(target = "threadcast.verify", signal = ?signal, "submission confirmed");
	}
	outcome
}

/// One captured identifier with the URL it was recovered from, when known.
#[derive(Debug, Clone)]
pub struct Captured {
	pub id: ItemId,
	pub url: Option<String>,
}

/// Captures up to `expected` identifiers for freshly published items.
///
/// Precedence: intercepted network responses, then the page URL, then links
/// that were not present before submission. The URL arm only counts when the
/// page actually moved off `before_url`, so a reply that leaves the browser
/// on its parent's item page cannot re-capture the parent's identifier.
/// Candidates that fail the identifier predicate are dropped; capture is
/// best-effort and surface errors degrade to an empty result rather than
/// failing the caller.
pub async fn capture_identifiers(surface: &dyn PageSurface, baseline_anchors: &[String], before_url: Option<&str>, expected: usize) -> Vec<Captured> {
	let mut found: Vec<Captured> = Vec::new();

	match surface.drain_captures().await {
		Ok(captures) => {
			for capture in &captures {
				collect_ids_from_capture(capture, &mut found);
			}
		}
		Err(err) => debug!(target = "threadcast.verify", error = %err, "network capture drain failed"),
	}

	match surface.url().await {
		Ok(url) => {
			if before_url != Some(url.as_str()) {
				if let Some(id) = id_from_url(&url) {
					push_unique(&mut found, Captured { id, url: Some(url) });
				}
			}
		}
		Err(err) => debug!(target = "threadcast.verify", error = %err, "url read failed during capture"),
	}

	match surface.anchor_hrefs().await {
		Ok(anchors) => {
			for href in anchors {
				if baseline_anchors.contains(&href) {
					continue;
				}
				if let Some(id) = id_from_url(&href) {
					push_unique(&mut found, Captured { id, url: Some(href) });
				}
			}
		}
		Err(err) => debug!(target = "threadcast.verify", error = %err, "anchor scan failed during capture"),
	}

	found.truncate(expected);
	found
}

/// Captures the identifier of the single most recently published item.
pub async fn capture_identifier(surface: &dyn PageSurface, baseline_anchors: &[String], before_url: Option<&str>) -> Option<Captured> {
	capture_identifiers(surface, baseline_anchors, before_url, 1).await.into_iter().next()
}

/// Extracts a valid identifier from an item URL, if the URL has one.
pub fn id_from_url(url: &str) -> Option<ItemId> {
	STATUS_RE.captures(url).and_then(|groups| ItemId::parse(groups.get(1)?.as_str()))
}

/// Locally-unique placeholder identifier satisfying the validity predicate.
///
/// Used for dry runs and for chain positions whose real identifier could not
/// be captured; the orchestrator records a warning whenever one stands in
/// for a real capture.
pub fn synthetic_id() -> ItemId {
	let seq = SYNTHETIC_SEQ.fetch_add(1, Ordering::Relaxed);
	let id = format!("9{:017}", seq % 100_000_000_000_000_000);
	ItemId::parse(&id).unwrap_or_else(|| unreachable!("synthetic ids always satisfy the predicate"))
}

fn collect_ids_from_capture(capture: &NetworkCapture, found: &mut Vec<Captured>) {
	walk_for_ids(&capture.body, found);
}

fn walk_for_ids(value: &serde_json::Value, found: &mut Vec<Captured>) {
	match value {
		serde_json::Value::Object(map) => {
			for (key, child) in map {
				if ID_FIELDS.contains(&key.as_str()) {
					if let Some(id) = child.as_str().and_then(ItemId::parse) {
						push_unique(found, Captured { id, url: None });
						continue;
					}
				}
				walk_for_ids(child, found);
			}
		}
		serde_json::Value::Array(items) => {
			for item in items {
				walk_for_ids(item, found);
			}
		}
		_ => {}
	}
}

fn push_unique(found: &mut Vec<Captured>, captured: Captured) {
	if !found.iter().any(|existing| existing.id == captured.id) {
		found.push(captured);
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use threadcast_runtime::fake::FakeSurface;

	use super::*;

	#[test]
	fn normalization_collapses_reflowed_whitespace() {
		assert_eq!(normalize_ws("Hello\n\n  world \t again"), "Hello world again");
	}

	#[test]
	fn url_extraction_honors_the_predicate() {
		assert!(id_from_url("https://surface.example/u/status/123456789012345678").is_some());
		assert!(id_from_url("https://surface.example/u/status/1234").is_none());
		assert!(id_from_url("https://surface.example/u/profile").is_none());
	}

	#[test]
	fn synthetic_ids_are_valid_and_unique() {
		let first = synthetic_id();
		let second = synthetic_id();
		assert_ne!(first, second);
		assert!(ItemId::parse(first.as_str()).is_some());
	}

	#[tokio::test(start_paused = true)]
	async fn verify_accepts_reflowed_rendering() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_entry("entry");
		surface.type_text("entry", "Hello   world,\nthis is a long unit of content").await.unwrap();

		verify_entry(surface.as_ref(), "entry", "Hello world, this is a long unit of content").await.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn verify_fails_after_bounded_retries() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_entry("entry");

		let err = verify_entry(surface.as_ref(), "entry", "content that never rendered").await.unwrap_err();
		assert!(matches!(err, PostError::ContentVerification { .. }));
	}

	#[tokio::test(start_paused = true)]
	async fn navigation_wins_the_confirmation_race() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_entry("entry");
		controller.add_button("submit");
		controller.set_url("https://surface.example/u/status/123456789012345678");

		let watch = ConfirmationWatch {
			entry_selector: "entry".into(),
			submit_selector: "submit".into(),
			before_url: "https://surface.example/compose".into(),
			expected_text: "Hello".into(),
			fallback: Duration::from_secs(8),
		};
		let confirmation = confirm_submission(surface.as_ref(), &watch).await.unwrap();
		assert!(matches!(confirmation, Confirmation::Navigated(_)));
	}

	#[tokio::test(start_paused = true)]
	async fn detachment_wins_when_url_is_stable() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_button("submit");
		controller.set_url("https://surface.example/compose");

		let watch = ConfirmationWatch {
			entry_selector: "entry".into(),
			submit_selector: "submit".into(),
			before_url: "https://surface.example/compose".into(),
			expected_text: "Hello".into(),
			fallback: Duration::from_secs(8),
		};
		let confirmation = confirm_submission(surface.as_ref(), &watch).await.unwrap();
		assert_eq!(confirmation, Confirmation::EntryDetached);
	}

	#[tokio::test(start_paused = true)]
	async fn silence_is_assumed_success_when_entry_cleared() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_entry("entry");
		controller.add_button("submit");
		controller.set_url("https://surface.example/compose");

		let watch = ConfirmationWatch {
			entry_selector: "entry".into(),
			submit_selector: "submit".into(),
			before_url: "https://surface.example/compose".into(),
			expected_text: "Hello world from the race".into(),
			fallback: Duration::from_millis(500),
		};
		let confirmation = confirm_submission(surface.as_ref(), &watch).await.unwrap();
		assert_eq!(confirmation, Confirmation::AssumedAfterTimeout);
	}

	#[tokio::test(start_paused = true)]
	async fn intact_entry_with_text_is_a_contrary_signal() {
		let (surface, controller) = FakeSurface::scripted();
		controller.add_entry("entry");
		controller.add_button("submit");
		controller.set_url("https://surface.example/compose");
		surface.type_text("entry", "Hello world from the race").await.unwrap();

		let watch = ConfirmationWatch {
			entry_selector: "entry".into(),
			submit_selector: "submit".into(),
			before_url: "https://surface.example/compose".into(),
			expected_text: "Hello world from the race".into(),
			fallback: Duration::from_millis(500),
		};
		let err = confirm_submission(surface.as_ref(), &watch).await.unwrap_err();
		assert!(matches!(err, PostError::SubmissionNotConfirmed(_)));
	}

	#[tokio::test]
	async fn network_capture_takes_precedence() {
		let (surface, controller) = FakeSurface::scripted();
		controller.push_capture(
			"https://surface.example/api/create",
			json!({"data": {"create_post": {"rest_id": "111111111111111111"}}}),
		);
		controller.set_url("https://surface.example/u/status/222222222222222222");

		let captured = capture_identifier(surface.as_ref(), &[], None).await.unwrap();
		assert_eq!(captured.id.as_str(), "111111111111111111");
	}

	#[tokio::test]
	async fn unchanged_url_is_not_a_capture_source() {
		let (surface, controller) = FakeSurface::scripted();
		let parent = "https://surface.example/u/status/111111111111111111";
		controller.set_url(parent);

		// The page never left the parent item, so its identifier must not be
		// mistaken for the reply's.
		assert!(capture_identifier(surface.as_ref(), &[], Some(parent)).await.is_none());
		assert!(capture_identifier(surface.as_ref(), &[], None).await.is_some());
	}

	#[tokio::test]
	async fn anchor_diff_ignores_preexisting_links() {
		let (surface, controller) = FakeSurface::scripted();
		let old = "https://surface.example/u/status/111111111111111111".to_string();
		controller.add_anchor(old.clone());
		controller.add_anchor("https://surface.example/u/status/333333333333333333");

		let captured = capture_identifier(surface.as_ref(), std::slice::from_ref(&old), None).await.unwrap();
		assert_eq!(captured.id.as_str(), "333333333333333333");
	}

	#[tokio::test]
	async fn invalid_candidates_are_never_returned() {
		let (surface, controller) = FakeSurface::scripted();
		controller.push_capture("https://surface.example/api/create", json!({"rest_id": "not-a-number"}));
		controller.add_anchor("https://surface.example/u/status/12345");

		assert!(capture_identifier(surface.as_ref(), &[], None).await.is_none());
	}

	#[tokio::test]
	async fn multi_capture_orders_by_precedence() {
		let (surface, controller) = FakeSurface::scripted();
		controller.push_capture(
			"https://surface.example/api/create",
			json!({"items": [{"rest_id": "111111111111111111"}, {"rest_id": "222222222222222222"}]}),
		);
		controller.add_anchor("https://surface.example/u/status/333333333333333333");

		let captured = capture_identifiers(surface.as_ref(), &[], None, 3).await;
		let ids: Vec<&str> = captured.iter().map(|item| item.id.as_str()).collect();
		assert_eq!(ids, vec!["111111111111111111", "222222222222222222", "333333333333333333"]);
	}
}
