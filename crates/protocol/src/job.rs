//! Posting job and content-unit shapes.

use serde::{Deserialize, Serialize};

/// Platform limit on the character length of one content unit.
pub const MAX_UNIT_CHARS: usize = 280;

/// One atomic piece of text to be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
	/// 0-based position inside the job; fixed at construction.
	position: usize,
	text: String,
}

impl ContentUnit {
	pub fn position(&self) -> usize {
		self.position
	}

	pub fn text(&self) -> &str {
		&self.text
	}
}

/// Whether a job publishes one standalone item or a linked chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingMode {
	Single,
	Thread,
}

impl std::fmt::Display for PostingMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			PostingMode::Single => f.write_str("single"),
			PostingMode::Thread => f.write_str("thread"),
		}
	}
}

/// The full ordered publish request.
///
/// Unit order and count are fixed once the job is built; the mode is derived
/// from the unit count, so `Thread` holds exactly when there is more than one
/// unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingJob {
	units: Vec<ContentUnit>,
	mode: PostingMode,
}

impl PostingJob {
	/// Builds a job from ordered unit texts, deriving positions and mode.
	pub fn new<I, S>(texts: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let units: Vec<ContentUnit> = texts
			.into_iter()
			.enumerate()
			.map(|(position, text)| ContentUnit { position, text: text.into() })
			.collect();
		let mode = if units.len() > 1 { PostingMode::Thread } else { PostingMode::Single };
		Self { units, mode }
	}

	/// Convenience constructor for a one-unit job.
	pub fn single(text: impl Into<String>) -> Self {
		Self::new([text.into()])
	}

	pub fn units(&self) -> &[ContentUnit] {
		&self.units
	}

	pub fn mode(&self) -> PostingMode {
		self.mode
	}
}
