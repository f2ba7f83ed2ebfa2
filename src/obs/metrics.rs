// self
use crate::{
	_prelude::*,
	obs::{TokenOrigin, TokenOutcome},
};

/// Records a token outcome via the global metrics recorder (when enabled).
pub fn record_token_outcome(origin: TokenOrigin, outcome: TokenOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_token_source_token_total",
			"origin" => origin.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (origin, outcome);
	}
}

/// Records the terminal outcome of `result` for `origin`.
pub fn record_token_result<T>(origin: TokenOrigin, result: &Result<T>) {
	record_token_outcome(origin, TokenOutcome::of(result));
}
