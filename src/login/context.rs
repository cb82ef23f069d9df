//! Per-call deadline carried into the callback.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::time::Instant;

/// Caller-supplied bounds for a single callback.
///
/// Dropping the callback future cancels any in-flight provider call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallContext {
	deadline: Option<Instant>,
}
impl CallContext {
	/// Context without a caller deadline; only the tenant's provider timeout applies.
	pub fn new() -> Self {
		Self::default()
	}

	/// Context whose deadline is `timeout` from now.
	pub fn with_timeout(timeout: StdDuration) -> Self {
		Self::with_deadline(Instant::now() + timeout)
	}

	/// Context that expires at `deadline`.
	pub fn with_deadline(deadline: Instant) -> Self {
		Self { deadline: Some(deadline) }
	}

	/// Caller deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Earliest of the caller deadline and `started + budget`.
	pub(crate) fn effective_deadline(&self, started: Instant, budget: StdDuration) -> Instant {
		let budget_deadline = started + budget;

		match self.deadline {
			Some(deadline) if deadline < budget_deadline => deadline,
			_ => budget_deadline,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn effective_deadline_takes_the_earliest() {
		let started = Instant::now();
		let budget = StdDuration::from_secs(10);

		assert_eq!(CallContext::new().effective_deadline(started, budget), started + budget);

		let tight = CallContext::with_deadline(started + StdDuration::from_secs(1));

		assert_eq!(tight.effective_deadline(started, budget), started + StdDuration::from_secs(1));

		let loose = CallContext::with_deadline(started + StdDuration::from_secs(60));

		assert_eq!(loose.effective_deadline(started, budget), started + budget);
	}
}
