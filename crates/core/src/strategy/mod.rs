//! Interchangeable publishing protocols.
//!
//! Exactly two strategies exist: the composite-entry strategy drives one
//! multi-slot authoring view and submits once; the chained-reply strategy
//! publishes the first unit standalone and anchors every later unit as a
//! reply to the latest published item. The orchestrator runs them strictly
//! in that order, never concurrently, because both mutate the same
//! authoring surface.

use std::time::Duration;

use async_trait::async_trait;
use threadcast_protocol::{ContentUnit, ItemId, PostedItem, PostingOptions, Warning};
use threadcast_runtime::PageSurface;

use crate::error::Result;
use crate::focus::FocusTuning;

pub mod chained;
pub mod composite;

pub use chained::ChainedReplyStrategy;
pub use composite::CompositeEntryStrategy;

/// Timing knobs shared by both strategies.
#[derive(Debug, Clone)]
pub struct StrategyTuning {
	pub focus: FocusTuning,
	/// Fallback window for the submission-confirmation race.
	pub confirm_fallback: Duration,
	/// Delay between successive reply submissions.
	pub reply_delay: Duration,
	/// Settle delay after submission before identifier capture.
	pub settle: Duration,
}

impl Default for StrategyTuning {
	fn default() -> Self {
		Self {
			focus: FocusTuning::default(),
			confirm_fallback: Duration::from_secs(8),
			reply_delay: Duration::from_secs(2),
			settle: Duration::from_millis(300),
		}
	}
}

impl StrategyTuning {
	pub fn from_options(options: &PostingOptions) -> Self {
		Self {
			reply_delay: options.reply_delay,
			..Self::default()
		}
	}
}

/// What a successful strategy execution produced.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
	pub root_identifier: Option<ItemId>,
	pub items: Vec<PostedItem>,
	pub warnings: Vec<Warning>,
}

/// One publishing protocol.
#[async_trait]
pub trait PostingStrategy: Send + Sync {
	fn name(&self) -> &'static str;

	/// Publishes `units` through this protocol, or fails on the first
	/// unrecoverable step.
	async fn execute(&self, surface: &dyn PageSurface, units: &[ContentUnit]) -> Result<StrategyOutcome>;
}
