// self
use crate::{
	_prelude::*,
	cache::CacheError,
	obs::TokenOrigin,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedToken<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedToken<F> = F;

/// Span wrapping one `token()` call.
#[derive(Clone, Debug)]
pub struct TokenSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl TokenSpan {
	/// Creates a span tagged with the cache key; `origin` is recorded once known.
	pub fn new(cache_key: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::debug_span!(
				"oauth2_token_source.token",
				cache_key,
				origin = tracing::field::Empty
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = cache_key;

			Self {}
		}
	}

	/// Records which stage produced the token.
	pub fn record_origin(&self, origin: TokenOrigin) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("origin", origin.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = origin;
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedToken<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a cache read that degraded to a miss.
pub fn cache_read_failed(err: &CacheError) {
	#[cfg(feature = "tracing")]
	tracing::debug!(error = %err, "Cache read failed; treating as a miss.");
	#[cfg(not(feature = "tracing"))]
	let _ = err;
}

/// Logs a cache write that was dropped.
pub fn cache_write_failed(err: &CacheError) {
	#[cfg(feature = "tracing")]
	tracing::debug!(error = %err, "Cache write failed; token kept in memory only.");
	#[cfg(not(feature = "tracing"))]
	let _ = err;
}

/// Logs a failed token endpoint exchange.
pub fn fetch_failed(err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::debug!(error = %err, status = ?err.status(), "Token exchange failed.");
	#[cfg(not(feature = "tracing"))]
	let _ = err;
}
