//! Immutable configuration captured by a [`TokenSource`](crate::source::TokenSource).

// self
use crate::{
	_prelude::*,
	auth::Secret,
	cache::TokenCache,
	clock::{Clock, FnClock, SystemClock},
	error::ConfigError,
};

/// Client-credentials parameters plus the optional collaborators a token source uses.
#[derive(Clone)]
pub struct TokenSourceConfig {
	/// Token endpoint.
	pub token_url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Requested scopes, sent space-joined in request order without further validation.
	pub scopes: Vec<String>,
	/// Additional form parameters sent with every exchange.
	pub extra_params: BTreeMap<String, String>,
	/// Optional cache shared with other token sources, possibly in other processes.
	pub cache: Option<Arc<dyn TokenCache>>,
	/// Leeway before expiry at which a held token stops being handed out.
	pub refresh_before: Duration,
	/// Time source for every expiry decision.
	pub clock: Arc<dyn Clock>,
}
impl TokenSourceConfig {
	/// Leeway used unless [`TokenSourceConfig::with_refresh_before`] overrides it.
	pub const DEFAULT_REFRESH_BEFORE: Duration = Duration::seconds(30);

	/// Creates a configuration with no scopes, no cache, and the system clock.
	pub fn new(
		token_url: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
	) -> Self {
		Self {
			token_url,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			scopes: Vec::new(),
			extra_params: BTreeMap::new(),
			cache: None,
			refresh_before: Self::DEFAULT_REFRESH_BEFORE,
			clock: Arc::new(SystemClock),
		}
	}

	/// Same as [`TokenSourceConfig::new`] but parses the token endpoint first.
	pub fn parse(
		token_url: &str,
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
	) -> Result<Self> {
		let token_url =
			Url::parse(token_url).map_err(|source| ConfigError::InvalidTokenUrl { source })?;

		Ok(Self::new(token_url, client_id, client_secret))
	}

	/// Replaces the requested scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Appends one scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.push(scope.into());

		self
	}

	/// Sets one extra form parameter.
	pub fn with_extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_params.insert(key.into(), value.into());

		self
	}

	/// Sets several extra form parameters.
	pub fn with_extra_params<I, K, V>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.extra_params.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Attaches a cache backend.
	pub fn with_cache<T>(self, cache: T) -> Self
	where
		T: 'static + TokenCache,
	{
		self.with_shared_cache(Arc::new(cache))
	}

	/// Attaches a cache backend that is already shared behind an [`Arc`].
	pub fn with_shared_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Overrides the refresh leeway; negative values are treated as zero.
	pub fn with_refresh_before(mut self, refresh_before: Duration) -> Self {
		self.refresh_before =
			if refresh_before.is_negative() { Duration::ZERO } else { refresh_before };

		self
	}

	/// Overrides the time source.
	pub fn with_clock<T>(mut self, clock: T) -> Self
	where
		T: 'static + Clock,
	{
		self.clock = Arc::new(clock);

		self
	}

	/// Uses a closure as the time source.
	pub fn with_clock_fn<F>(self, now: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> OffsetDateTime,
	{
		self.with_clock(FnClock(now))
	}
}
impl Debug for TokenSourceConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSourceConfig")
			.field("token_url", &self.token_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("scopes", &self.scopes)
			.field("extra_params", &self.extra_params)
			.field("cache", &self.cache.is_some())
			.field("refresh_before", &self.refresh_before)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = TokenSourceConfig::parse("https://auth.example.com/token", "id", "secret")
			.expect("Config should parse.");

		assert_eq!(config.refresh_before, Duration::seconds(30));
		assert!(config.scopes.is_empty());
		assert!(config.cache.is_none());
	}

	#[test]
	fn parse_rejects_invalid_urls() {
		let err = TokenSourceConfig::parse("not a url", "id", "secret")
			.expect_err("Relative garbage should not parse.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidTokenUrl { .. })));
	}

	#[test]
	fn refresh_before_zero_is_honored_and_negative_clamps() {
		let url = Url::parse("https://auth.example.com/token").expect("URL should parse.");
		let zero = TokenSourceConfig::new(url.clone(), "id", "secret")
			.with_refresh_before(Duration::ZERO);
		let negative = TokenSourceConfig::new(url, "id", "secret")
			.with_refresh_before(Duration::seconds(-5));

		assert_eq!(zero.refresh_before, Duration::ZERO);
		assert_eq!(negative.refresh_before, Duration::ZERO);
	}

	#[test]
	fn scopes_are_kept_verbatim() {
		let url = Url::parse("https://auth.example.com/token").expect("URL should parse.");
		let config = TokenSourceConfig::new(url, "id", "secret")
			.with_scopes(["read write"])
			.with_scope("admin");

		assert_eq!(config.scopes, ["read write", "admin"]);
	}

	#[test]
	fn debug_redacts_secret() {
		let config = TokenSourceConfig::parse("https://auth.example.com/token", "id", "hunter2")
			.expect("Config should parse.");

		assert!(!format!("{config:?}").contains("hunter2"));
	}
}
