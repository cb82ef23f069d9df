//! Injectable UTC time sources.

// self
use crate::_prelude::*;

/// Source of the current UTC instant.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant in UTC.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock for deterministic TTL checks.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `instant`.
	pub fn new(instant: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(instant)))
	}

	/// Moves the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// Shared clock handle used by components that stamp or check instants.
pub fn system() -> Arc<dyn Clock> {
	Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn manual_clock_clones_share_time() {
		let clock = ManualClock::new(datetime!(2025-01-01 00:00 UTC));
		let view = clock.clone();

		clock.advance(Duration::seconds(61));

		assert_eq!(view.now(), datetime!(2025-01-01 00:01:01 UTC));

		view.set(datetime!(2030-01-01 00:00 UTC));

		assert_eq!(clock.now(), datetime!(2030-01-01 00:00 UTC));
	}
}
