//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit a `portal_http.call` span per logical request with
//!   `method`, `path`, and `classification` fields, plus events for classification, backoff,
//!   renewal, session expiry, and server errors.
//! - Enable `metrics` to increment `portal_http_call_total` per logical request, labeled by
//!   `classification` + `outcome`, and `portal_http_stage_total` for the recovery stages,
//!   labeled by `stage` + `outcome`.

mod tracing;

pub use tracing::*;

// self
use crate::{_prelude::*, policy::Classification};

/// Pipeline stages observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Rate-limit backoff retry.
	Backoff,
	/// Session renewal call.
	Renewal,
	/// POST coalescing.
	Coalesce,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Backoff => "backoff",
			Stage::Renewal => "renewal",
			Stage::Coalesce => "coalesce",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Stage joined work already in progress instead of starting its own.
	Joined,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Joined => "joined",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the outcome of one logical request under its classification.
pub fn record_call(classification: Classification, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"portal_http_call_total",
		"classification" => classification.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (classification, outcome);
}

/// Records a recovery stage outcome via the global metrics recorder (when enabled).
pub fn record_stage(stage: Stage, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"portal_http_stage_total",
		"stage" => stage.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (stage, outcome);
}
