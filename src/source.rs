//! Token lifecycle orchestration: memory, then the external cache, then the token endpoint.

mod config;
mod stats;

pub use config::*;
pub use stats::*;

// crates.io
use oauth2::http::header::{AUTHORIZATION, HeaderMap};
use time::Date;
// self
use crate::{
	_prelude::*,
	auth::{self, AuthFuture, AuthorizationTarget, RequestAuth, Secret},
	cache::{self, CachedTokenRecord, TokenCache},
	clock::Clock,
	fetch::TokenFetcher,
	http::TokenHttpClient,
	obs::{self, TokenOrigin, TokenOutcome, TokenSpan},
	schema::{StandardTokenResponse, TokenResponse},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Token source backed by the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestTokenSource<R = StandardTokenResponse> = TokenSource<ReqwestHttpClient, R>;

/// Token held in memory by one [`TokenSource`].
#[derive(Debug, Default)]
struct TokenState {
	token: Option<Secret>,
	expires_at: Option<OffsetDateTime>,
}
impl TokenState {
	fn fresh_token(&self, now: OffsetDateTime, refresh_before: Duration) -> Option<String> {
		let token = self.token.as_ref().filter(|token| !token.is_empty())?;
		let expires_at = self.expires_at?;

		now.checked_add(refresh_before)
			.filter(|deadline| *deadline <= expires_at)
			.map(|_| token.expose().to_owned())
	}

	fn store(&mut self, token: Secret, expires_at: OffsetDateTime) {
		self.token = Some(token);
		self.expires_at = Some(expires_at);
	}
}

struct TokenSourceInner<C, R>
where
	C: ?Sized + TokenHttpClient,
{
	config: TokenSourceConfig,
	fetcher: TokenFetcher<C, R>,
	cache_key: String,
	state: AsyncMutex<TokenState>,
	stats: TokenSourceStats,
}

/// OAuth 2.0 client-credentials token source.
///
/// Every [`token`](TokenSource::token) call holds one exclusive lock for the whole decision
/// sequence, so concurrent callers on the same instance never trigger more than one exchange at
/// a time. Clones share the lock and the held token.
///
/// The response schema `R` is fixed at construction; see [`crate::schema`].
pub struct TokenSource<C, R = StandardTokenResponse>
where
	C: ?Sized + TokenHttpClient,
{
	inner: Arc<TokenSourceInner<C, R>>,
}
impl<C, R> TokenSource<C, R>
where
	C: ?Sized + TokenHttpClient,
	R: TokenResponse,
{
	/// Creates a token source over a caller-supplied transport.
	pub fn with_http_client(
		config: TokenSourceConfig,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let fetcher = TokenFetcher::new(http_client.into(), &config);
		let cache_key = cache::cache_key(&config.client_id, config.client_secret.expose());

		Ok(Self {
			inner: Arc::new(TokenSourceInner {
				config,
				fetcher,
				cache_key,
				state: AsyncMutex::new(TokenState::default()),
				stats: TokenSourceStats::default(),
			}),
		})
	}

	/// Configuration this source was built from.
	pub fn config(&self) -> &TokenSourceConfig {
		&self.inner.config
	}

	/// Key under which this source reads and writes the external cache.
	pub fn cache_key(&self) -> &str {
		&self.inner.cache_key
	}

	/// Counters for memory hits, cache hits, and exchanges.
	pub fn stats(&self) -> &TokenSourceStats {
		&self.inner.stats
	}

	/// Returns a non-empty access token.
	///
	/// A held token is returned while `now + refresh_before <= expires_at`. Otherwise the
	/// external cache is consulted, and on a miss the token endpoint is called. Endpoint
	/// failures are returned as-is and leave the held token untouched.
	pub async fn token(&self) -> Result<String> {
		let span = TokenSpan::new(&self.inner.cache_key);

		span.instrument(self.acquire(&span)).await
	}

	/// Sets `Authorization: Bearer <token>` on `target`. On failure `target` is left unchanged.
	pub async fn apply<T>(&self, target: &mut T) -> Result<()>
	where
		T: ?Sized + AuthorizationTarget,
	{
		let token = self.token().await?;
		let value = auth::bearer_header_value(&token)?;

		target.headers_mut().insert(AUTHORIZATION, value);

		Ok(())
	}

	/// Like [`TokenSource::apply`], but succeeds without doing anything when either side is
	/// absent.
	pub async fn apply_opt<T>(source: Option<&Self>, target: Option<&mut T>) -> Result<()>
	where
		T: ?Sized + AuthorizationTarget,
	{
		match (source, target) {
			(Some(source), Some(target)) => source.apply(target).await,
			_ => Ok(()),
		}
	}

	/// Forgets the held token; the next call re-runs the cache and endpoint lookups.
	pub async fn invalidate(&self) {
		*self.inner.state.lock().await = TokenState::default();
	}

	async fn acquire(&self, span: &TokenSpan) -> Result<String> {
		let inner = &*self.inner;
		let refresh_before = inner.config.refresh_before;
		let mut state = inner.state.lock().await;

		if let Some(token) = state.fresh_token(inner.config.clock.now(), refresh_before) {
			inner.stats.record_memory_hit();

			return Ok(Self::handed_out(span, TokenOrigin::Memory, token));
		}
		if let Some(record) = self.read_cache().await {
			let lifetime = if record.expires_in > 0 {
				Duration::seconds(record.expires_in)
			} else {
				refresh_before
			};
			let expires_at = deadline_after(inner.config.clock.now(), lifetime);
			let token = record.access_token;

			state.store(Secret::new(token.clone()), expires_at);
			inner.stats.record_cache_hit();

			return Ok(Self::handed_out(span, TokenOrigin::Cache, token));
		}

		obs::record_token_outcome(TokenOrigin::Endpoint, TokenOutcome::Attempt);

		let result = inner.fetcher.fetch().await;

		obs::record_token_result(TokenOrigin::Endpoint, &result);

		let fetched = result.inspect_err(|e| {
			inner.stats.record_fetch_failure();
			obs::fetch_failed(e);
		})?;
		let lifetime = fetched.expires_in.unwrap_or(refresh_before);
		let expires_at = deadline_after(inner.config.clock.now(), lifetime);
		let token = fetched.access_token.expose().to_owned();

		state.store(fetched.access_token, expires_at);
		inner.stats.record_fetch();
		self.write_cache(&token, lifetime).await;
		span.record_origin(TokenOrigin::Endpoint);

		Ok(token)
	}

	async fn read_cache(&self) -> Option<CachedTokenRecord> {
		let cache = self.inner.config.cache.as_ref()?;

		match cache.get(&self.inner.cache_key).await {
			Ok(raw) => raw.as_deref().and_then(CachedTokenRecord::decode),
			Err(e) => {
				obs::cache_read_failed(&e);

				None
			},
		}
	}

	async fn write_cache(&self, token: &str, lifetime: Duration) {
		let Some(cache) = self.inner.config.cache.as_ref() else {
			return;
		};

		if !lifetime.is_positive() {
			return;
		}

		let record = CachedTokenRecord {
			access_token: token.to_owned(),
			expires_in: lifetime.whole_seconds(),
		};
		let result = match record.encode() {
			Ok(raw) => cache.set(&self.inner.cache_key, raw, lifetime).await,
			Err(e) => Err(e),
		};

		if let Err(e) = result {
			obs::cache_write_failed(&e);
		}
	}

	/// Marks a memory or cache answer; endpoint answers are recorded around the exchange.
	fn handed_out(span: &TokenSpan, origin: TokenOrigin, token: String) -> String {
		span.record_origin(origin);
		obs::record_token_outcome(origin, TokenOutcome::Success);

		token
	}
}
#[cfg(feature = "reqwest")]
impl<R> TokenSource<ReqwestHttpClient, R>
where
	R: TokenResponse,
{
	/// Creates a token source over a fresh reqwest client that does not follow redirects.
	pub fn new(config: TokenSourceConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::new()?)
	}
}
impl<C, R> Clone for TokenSource<C, R>
where
	C: ?Sized + TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner) }
	}
}
impl<C, R> Debug for TokenSource<C, R>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSource")
			.field("config", &self.inner.config)
			.field("cache_key", &self.inner.cache_key)
			.finish_non_exhaustive()
	}
}
impl<C, R> RequestAuth for TokenSource<C, R>
where
	C: ?Sized + TokenHttpClient,
	R: TokenResponse,
{
	fn authorize<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthFuture<'a> {
		Box::pin(self.apply(headers))
	}
}

fn deadline_after(now: OffsetDateTime, lifetime: Duration) -> OffsetDateTime {
	now.checked_add(lifetime).unwrap_or_else(|| Date::MAX.midnight().assume_utc())
}
