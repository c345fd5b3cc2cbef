//! Observability helpers for the request pipeline.
//!
//! Every pipeline stage runs inside a structured span named `quote_gateway.stage` carrying the
//! `stage` and `step` fields.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment the `quote_gateway_stage_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Rate-limit admission.
	Admission,
	/// Credential validation against the identity platform.
	Authentication,
	/// Ticker query normalization.
	TickerValidation,
	/// Snapshot cache lookup and upstream fan-out.
	Aggregation,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Admission => "admission",
			Stage::Authentication => "authentication",
			Stage::TickerValidation => "ticker_validation",
			Stage::Aggregation => "aggregation",
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
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Stage let the request continue.
	Success,
	/// Stage terminated the request.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}

	/// Maps a stage result onto its terminal outcome.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		match result {
			Ok(_) => StageOutcome::Success,
			Err(_) => StageOutcome::Failure,
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
