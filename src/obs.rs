//! Optional observability helpers for token acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `oauth2_token_source.token` and debug events for
//!   degraded cache operations and failed exchanges.
//! - Enable `metrics` to increment the `oauth2_token_source_token_total` counter for every
//!   attempt/success/failure, labeled by `origin` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Where a token handed to the caller came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOrigin {
	/// Fresh token already held in memory.
	Memory,
	/// Token adopted from the external cache.
	Cache,
	/// Token obtained from the token endpoint.
	Endpoint,
}
impl TokenOrigin {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenOrigin::Memory => "memory",
			TokenOrigin::Cache => "cache",
			TokenOrigin::Endpoint => "endpoint",
		}
	}
}
impl Display for TokenOrigin {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOutcome {
	/// Entry to a lookup stage.
	Attempt,
	/// Token handed back.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl TokenOutcome {
	/// Terminal outcome of a finished exchange.
	pub fn of<T>(result: &Result<T>) -> Self {
		if result.is_ok() { TokenOutcome::Success } else { TokenOutcome::Failure }
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenOutcome::Attempt => "attempt",
			TokenOutcome::Success => "success",
			TokenOutcome::Failure => "failure",
		}
	}
}
impl Display for TokenOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
