//! Injected time sources so every TTL comparison is testable without sleeping.

// self
use crate::_prelude::*;

/// Time source consulted for every expiry evaluation.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall-clock implementation used outside of tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock; tests set or advance it to cross TTL boundaries deterministically.
#[derive(Debug)]
pub struct ManualClock {
	current: Mutex<OffsetDateTime>,
}
impl ManualClock {
	/// Creates a clock frozen at the provided instant.
	pub fn new(start: OffsetDateTime) -> Self {
		Self { current: Mutex::new(start) }
	}

	/// Moves the clock to an absolute instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.current.lock() = instant;
	}

	/// Advances the clock by the provided duration.
	pub fn advance(&self, by: Duration) {
		let mut current = self.current.lock();

		*current += by;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.current.lock()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn manual_clock_advances_and_resets() {
		let start = datetime!(2026-01-01 00:00:00 UTC);
		let clock = ManualClock::new(start);

		assert_eq!(clock.now(), start);

		clock.advance(Duration::seconds(90));

		assert_eq!(clock.now(), start + Duration::seconds(90));

		clock.set(start);

		assert_eq!(clock.now(), start);
	}
}
