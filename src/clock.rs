//! Pluggable time sources used for every expiry decision.

// self
use crate::_prelude::*;

/// Source of "now" for expiry and refresh calculations.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
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

/// Adapts a closure into a [`Clock`].
#[derive(Clone, Copy)]
pub struct FnClock<F>(pub F);
impl<F> Clock for FnClock<F>
where
	F: Send + Sync + Fn() -> OffsetDateTime,
{
	fn now(&self) -> OffsetDateTime {
		(self.0)()
	}
}
impl<F> Debug for FnClock<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnClock(..)")
	}
}

/// Manually driven clock for deterministic tests; clones share the same instant.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward (or backward for negative durations).
	pub fn advance(&self, delta: Duration) {
		let mut now = self.0.lock();

		*now += delta;
	}

	/// Jumps to an absolute instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::UNIX_EPOCH)
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}
