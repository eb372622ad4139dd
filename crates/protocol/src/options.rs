//! Recognized posting configuration options.

use std::time::Duration;

/// Fully resolved configuration for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct PostingOptions {
	/// Wall-clock bound for one job-body attempt.
	pub job_timeout: Duration,
	/// Total number of job-body attempts before the job is failed.
	pub max_attempts: u32,
	/// Fixed delay between job-body attempts.
	pub retry_delay: Duration,
	/// Fixed delay between successive reply submissions in the chained strategy.
	pub reply_delay: Duration,
	/// Maximum number of content units accepted per job.
	pub max_units: usize,
	/// Skip all session work and return a synthetic success.
	pub dry_run: bool,
	/// Disable the thread path entirely regardless of unit count.
	pub force_single: bool,
}

impl Default for PostingOptions {
	fn default() -> Self {
		Self {
			job_timeout: Duration::from_secs(180),
			max_attempts: 2,
			retry_delay: Duration::from_secs(5),
			reply_delay: Duration::from_secs(2),
			max_units: 25,
			dry_run: false,
			force_single: false,
		}
	}
}

impl PostingOptions {
	/// Sets the per-attempt wall-clock bound.
	pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
		self.job_timeout = timeout;
		self
	}

	/// Sets the total attempt budget.
	pub fn with_max_attempts(mut self, attempts: u32) -> Self {
		self.max_attempts = attempts;
		self
	}

	/// Sets the inter-attempt delay.
	pub fn with_retry_delay(mut self, delay: Duration) -> Self {
		self.retry_delay = delay;
		self
	}

	/// Sets the inter-reply pacing delay.
	pub fn with_reply_delay(mut self, delay: Duration) -> Self {
		self.reply_delay = delay;
		self
	}

	/// Sets the per-job unit-count cap.
	pub fn with_max_units(mut self, max_units: usize) -> Self {
		self.max_units = max_units;
		self
	}

	/// Enables or disables dry-run short-circuiting.
	pub fn with_dry_run(mut self, dry_run: bool) -> Self {
		self.dry_run = dry_run;
		self
	}

	/// Enables or disables the force-single switch.
	pub fn with_force_single(mut self, force_single: bool) -> Self {
		self.force_single = force_single;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let options = PostingOptions::default();
		assert_eq!(options.job_timeout, Duration::from_secs(180));
		assert_eq!(options.max_attempts, 2);
		assert_eq!(options.max_units, 25);
		assert!(!options.dry_run);
		assert!(!options.force_single);
	}

	#[test]
	fn builders_override_fields() {
		let options = PostingOptions::default()
			.with_job_timeout(Duration::from_secs(30))
			.with_max_attempts(3)
			.with_dry_run(true);
		assert_eq!(options.job_timeout, Duration::from_secs(30));
		assert_eq!(options.max_attempts, 3);
		assert!(options.dry_run);
	}
}
