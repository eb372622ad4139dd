//! Posting orchestration for API-less social-publishing surfaces.
//!
//! threadcast turns an ordered list of content units into a published,
//! cross-referenced chain on a surface that offers no stable programmatic
//! API, only an interactive page whose structure drifts over time. The
//! hard part is surviving that surface: locating the right element among
//! several structural variants ([`focus`]), confirming that entry and
//! submission actually happened ([`verify`]), and recovering the durable
//! identifier of each published item, all with bounded retries and pooled
//! session lifecycle management (`threadcast-runtime`).
//!
//! The entry point is [`Orchestrator::submit`], which never fails: every
//! outcome is a structured [`JobResult`].

pub mod collaborators;
pub mod error;
pub mod focus;
pub mod orchestrator;
pub mod strategy;
pub mod verify;

pub use collaborators::{CredentialStore, MetricsError, MetricsSink, NullMetricsSink, PostRecord, StaticCredentialStore, pool_from_store};
pub use error::{PostError, Result};
pub use orchestrator::Orchestrator;
pub use strategy::{ChainedReplyStrategy, CompositeEntryStrategy, PostingStrategy, StrategyOutcome, StrategyTuning};

pub use threadcast_protocol as protocol;
pub use threadcast_protocol::{ContentUnit, ItemId, JobResult, PostedItem, PostingJob, PostingMode, PostingOptions, StrategyAttempt, Warning};
pub use threadcast_runtime as runtime;
pub use threadcast_runtime::{BreakerConfig, PageSurface, SessionBlob, SharedSurface, SurfaceFactory, SurfacePool};
