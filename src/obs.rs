//! Optional observability helpers for login flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `login_broker.flow` with the `provider`
//!   and `stage` fields, plus warnings for soft failures and disabled providers.
//! - Enable `metrics` to increment the `login_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `provider`, `stage`, and `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Login entry points observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoginStage {
	/// Authorization URL construction.
	Start,
	/// Provider redirect handling.
	Callback,
}
impl LoginStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			LoginStage::Start => "start",
			LoginStage::Callback => "callback",
		}
	}
}
impl Display for LoginStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a login stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Login ended with a user-facing failure result.
	Failure,
	/// Error propagated back to the caller.
	Error,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Error => "error",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
