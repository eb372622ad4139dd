//! Top-level posting state machine.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use threadcast_protocol::{AttemptOutcome, ErrorKind, JobResult, MAX_UNIT_CHARS, PostedItem, PostingJob, PostingMode, PostingOptions, StrategyAttempt, Warning};
use threadcast_runtime::{PooledSurface, Purpose, SurfacePool};
use tracing::{info, warn};

use crate::collaborators::{MetricsSink, PostRecord};
use crate::error::{PostError, Result};
use crate::strategy::{ChainedReplyStrategy, CompositeEntryStrategy, PostingStrategy, StrategyOutcome, StrategyTuning};
use crate::verify;

const STRATEGY_ERROR_CHARS: usize = 300;
const PREVIEW_CHARS: usize = 40;

/// Runs posting jobs to completion against pooled automation surfaces.
///
/// `submit` never returns an error: every failure path resolves to a
/// `JobResult` with `success == false` and a structured terminal error.
pub struct Orchestrator {
	pool: Arc<SurfacePool>,
	options: PostingOptions,
	strategies: Vec<Arc<dyn PostingStrategy>>,
	metrics: Arc<dyn MetricsSink>,
}

impl Orchestrator {
	/// Builds an orchestrator with the standard strategy order:
	/// composite-entry first, chained-reply as the fallback.
	pub fn new(pool: Arc<SurfacePool>, options: PostingOptions, metrics: Arc<dyn MetricsSink>) -> Self {
		let tuning = StrategyTuning::from_options(&options);
		let strategies: Vec<Arc<dyn PostingStrategy>> = vec![
			Arc::new(CompositeEntryStrategy::new(tuning.clone())),
			Arc::new(ChainedReplyStrategy::new(tuning)),
		];
		Self {
			pool,
			options,
			strategies,
			metrics,
		}
	}

	/// Replaces the strategy list, preserving priority order.
	pub fn with_strategies(mut self, strategies: Vec<Arc<dyn PostingStrategy>>) -> Self {
		self.strategies = strategies;
		self
	}

	/// Publishes `job` and reports what happened.
	pub async fn submit(&self, job: &PostingJob) -> JobResult {
		let mode_used = job.mode();

		if let Err(message) = validate(job, &self.options) {
			info!(target = "threadcast", %message, "job rejected by validation");
			return JobResult::failed(mode_used, ErrorKind::Validation, message, Vec::new());
		}

		if self.options.dry_run {
			info!(target = "threadcast", units = job.units().len(), "dry run; skipping session work");
			return dry_run_result(job);
		}

		let attempts: Arc<Mutex<Vec<StrategyAttempt>>> = Arc::new(Mutex::new(Vec::new()));
		let mut last_error: Option<PostError> = None;

		for attempt in 1..=self.options.max_attempts.max(1) {
			if attempt > 1 {
				tokio::time::sleep(self.options.retry_delay).await;
			}
			info!(target = "threadcast", attempt, max = self.options.max_attempts, "starting job attempt");

			// The pooled handle is parked here so the cleanup below reaches
			// it even when the timeout wins and the attempt future is dropped
			// mid-step.
			let slot: Arc<Mutex<Option<PooledSurface>>> = Arc::new(Mutex::new(None));
			let body = self.run_attempt(job, Arc::clone(&slot), Arc::clone(&attempts));

			match tokio::time::timeout(self.options.job_timeout, body).await {
				Ok(Ok(outcome)) => {
					if let Some(handle) = slot.lock().take() {
						handle.release();
					}
					self.write_metrics(job, &outcome).await;
					return JobResult::published(mode_used, outcome.root_identifier, outcome.items, attempts.lock().clone(), outcome.warnings);
				}
				Ok(Err(err)) => {
					warn!(target = "threadcast", attempt, error = %err, "job attempt failed");
					close_slot(&slot).await;
					last_error = Some(err);
				}
				Err(_elapsed) => {
					warn!(
						target = "threadcast",
						attempt,
						timeout_ms = self.options.job_timeout.as_millis() as u64,
						"job attempt timed out"
					);
					close_slot(&slot).await;
					last_error = Some(PostError::Timeout(self.options.job_timeout));
				}
			}
		}

		let error = last_error.unwrap_or_else(|| PostError::Strategy {
			strategy: "none",
			message: "no attempt was made".to_string(),
		});
		JobResult::failed(mode_used, error.kind(), error.to_string(), attempts.lock().clone())
	}

	async fn run_attempt(&self, job: &PostingJob, slot: Arc<Mutex<Option<PooledSurface>>>, attempts: Arc<Mutex<Vec<StrategyAttempt>>>) -> Result<StrategyOutcome> {
		let pooled = self.pool.acquire(Purpose::Posting).await?;
		let surface = Arc::clone(pooled.surface());
		*slot.lock() = Some(pooled);

		let mut failures: Vec<(&'static str, String)> = Vec::new();
		for strategy in &self.strategies {
			let started_at_ms = epoch_ms();
			info!(target = "threadcast.strategy", strategy = strategy.name(), "executing strategy");

			match strategy.execute(surface.as_ref(), job.units()).await {
				Ok(outcome) => {
					attempts.lock().push(StrategyAttempt {
						strategy: strategy.name().to_string(),
						started_at_ms,
						outcome: AttemptOutcome::Success,
						error: None,
					});
					return Ok(outcome);
				}
				Err(err) => {
					let message = truncate(&err.to_string(), STRATEGY_ERROR_CHARS);
					warn!(target = "threadcast.strategy", strategy = strategy.name(), error = %message, "strategy failed");
					attempts.lock().push(StrategyAttempt {
						strategy: strategy.name().to_string(),
						started_at_ms,
						outcome: AttemptOutcome::Failure,
						error: Some(message.clone()),
					});
					failures.push((strategy.name(), message));
				}
			}
		}

		let combined = failures
			.iter()
			.map(|(name, message)| format!("{name}: {message}"))
			.collect::<Vec<_>>()
			.join("; ");
		Err(PostError::Strategy {
			strategy: "all",
			message: truncate(&combined, STRATEGY_ERROR_CHARS * 2),
		})
	}

	async fn write_metrics(&self, job: &PostingJob, outcome: &StrategyOutcome) {
		let records: Vec<PostRecord> = outcome
			.items
			.iter()
			.filter_map(|item| {
				let identifier = item.identifier.clone()?;
				let unit = job.units().get(item.position)?;
				Some(PostRecord {
					identifier,
					position: item.position,
					mode: job.mode(),
					chars: unit.text().chars().count(),
					preview: unit.text().chars().take(PREVIEW_CHARS).collect(),
				})
			})
			.collect();

		if records.is_empty() {
			return;
		}
		if let Err(err) = self.metrics.record(&records).await {
			warn!(target = "threadcast", error = %err, "metrics write failed; job result unaffected");
		}
	}
}

fn validate(job: &PostingJob, options: &PostingOptions) -> std::result::Result<(), String> {
	let units = job.units();
	if units.is_empty() {
		return Err("job has no content units".to_string());
	}
	if units.len() > options.max_units {
		return Err(format!("job has {} units, exceeding the cap of {}", units.len(), options.max_units));
	}
	if options.force_single && units.len() > 1 {
		return Err(format!("thread posting is disabled but the job has {} units", units.len()));
	}
	if job.mode() == PostingMode::Thread && units.len() < 2 {
		return Err("thread job needs at least 2 units".to_string());
	}
	for unit in units {
		if unit.text().trim().is_empty() {
			return Err(format!("unit {} is empty", unit.position()));
		}
		let chars = unit.text().chars().count();
		if chars > MAX_UNIT_CHARS {
			return Err(format!("unit {} has {chars} chars, exceeding the {MAX_UNIT_CHARS} char limit", unit.position()));
		}
	}
	Ok(())
}

fn dry_run_result(job: &PostingJob) -> JobResult {
	let items: Vec<PostedItem> = job
		.units()
		.iter()
		.map(|unit| PostedItem {
			position: unit.position(),
			identifier: Some(verify::synthetic_id()),
			url: None,
		})
		.collect();
	let root_identifier = items.first().and_then(|item| item.identifier.clone());
	JobResult::published(
		job.mode(),
		root_identifier,
		items,
		Vec::new(),
		vec![Warning::new("dry run: no session acquired; identifiers are synthetic")],
	)
}

async fn close_slot(slot: &Arc<Mutex<Option<PooledSurface>>>) {
	let handle = slot.lock().take();
	if let Some(handle) = handle {
		handle.close().await;
	}
}

fn epoch_ms() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_millis() as u64).unwrap_or_default()
}

fn truncate(message: &str, max_chars: usize) -> String {
	if message.chars().count() <= max_chars {
		return message.to_string();
	}
	let mut truncated: String = message.chars().take(max_chars).collect();
	truncated.push('…');
	truncated
}

#[cfg(test)]
mod tests {
	use super::*;

	fn options() -> PostingOptions {
		PostingOptions::default()
	}

	#[test]
	fn empty_job_fails_validation() {
		let job = PostingJob::new(Vec::<String>::new());
		assert!(validate(&job, &options()).is_err());
	}

	#[test]
	fn over_long_unit_fails_validation() {
		let job = PostingJob::single("x".repeat(MAX_UNIT_CHARS + 1));
		let message = validate(&job, &options()).unwrap_err();
		assert!(message.contains("char limit"));
	}

	#[test]
	fn force_single_rejects_threads() {
		let job = PostingJob::new(["A", "B"]);
		let message = validate(&job, &options().with_force_single(true)).unwrap_err();
		assert!(message.contains("disabled"));
	}

	#[test]
	fn unit_cap_is_enforced() {
		let texts: Vec<String> = (0..5).map(|index| format!("unit {index}")).collect();
		let job = PostingJob::new(texts);
		assert!(validate(&job, &options().with_max_units(4)).is_err());
		assert!(validate(&job, &options().with_max_units(5)).is_ok());
	}

	#[test]
	fn truncate_keeps_short_messages_intact() {
		assert_eq!(truncate("short", 10), "short");
		assert_eq!(truncate("0123456789ab", 10), "0123456789…");
	}
}
