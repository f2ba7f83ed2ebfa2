// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::http::header::{AUTHORIZATION, HeaderMap};
use serde::Deserialize;
// self
use oauth2_token_source::{
	_preludet::*,
	auth::RequestAuth,
	cache::{CacheError, CacheFuture, MemoryCache, TokenCache, cache_key},
	clock::ManualClock,
	schema::TokenResponse,
	source::{TokenSource, TokenSourceConfig},
};

const CLIENT_ID: &str = "client-id";
const CLIENT_SECRET: &str = "client-secret";
const LONG_LIVED: &str = r#"{"access_token":"long-lived","token_type":"Bearer","expires_in":3600}"#;

#[derive(Deserialize)]
struct VendorResponse {
	token: String,
	#[serde(default)]
	expires_at: i64,
}
impl TokenResponse for VendorResponse {
	fn access_token(&self) -> &str {
		&self.token
	}

	fn expires_in(&self) -> i64 {
		self.expires_at
	}
}

/// Cache whose every operation fails.
struct BrokenCache;
impl TokenCache for BrokenCache {
	fn get<'a>(&'a self, _key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async { Err(CacheError::Backend { message: "connection reset".into() }) })
	}

	fn set<'a>(&'a self, _key: &'a str, _value: String, _ttl: Duration) -> CacheFuture<'a, ()> {
		Box::pin(async { Err(CacheError::Backend { message: "connection reset".into() }) })
	}
}

fn clock() -> ManualClock {
	ManualClock::new(OffsetDateTime::now_utc())
}

fn config(clock: &ManualClock) -> TokenSourceConfig {
	TokenSourceConfig::parse("https://auth.example.com/token", CLIENT_ID, CLIENT_SECRET)
		.expect("Token endpoint should parse.")
		.with_clock(clock.clone())
}

fn source(
	config: TokenSourceConfig,
	http: &ScriptedHttpClient,
) -> TokenSource<ScriptedHttpClient> {
	TokenSource::with_http_client(config, http.clone()).expect("Token source should build.")
}

#[tokio::test]
async fn refetches_once_the_token_expires() {
	let clock = clock();
	let http = ScriptedHttpClient::default();
	let source = source(config(&clock).with_refresh_before(Duration::ZERO), &http);

	assert_eq!(source.token().await.expect("First token should be fetched."), "t1");
	assert_eq!(http.calls(), 1);

	clock.advance(Duration::seconds(2));

	assert_eq!(source.token().await.expect("Expired token should be replaced."), "t2");
	assert_eq!(http.calls(), 2);
	assert_eq!(source.stats().fetches(), 2);
}

#[tokio::test]
async fn fresh_token_is_reused_without_endpoint_calls() {
	let clock = clock();
	let http = ScriptedHttpClient::new([ScriptedReply::ok(LONG_LIVED)]);
	let source = source(config(&clock), &http);

	for _ in 0..5 {
		assert_eq!(source.token().await.expect("Token should be served."), "long-lived");
	}

	clock.advance(Duration::seconds(3600 - 30));

	assert_eq!(source.token().await.expect("Boundary token should be served."), "long-lived");
	assert_eq!(http.calls(), 1);
	assert_eq!(source.stats().memory_hits(), 5);
}

#[tokio::test]
async fn entering_the_refresh_window_triggers_exactly_one_fetch() {
	let clock = clock();
	let http = ScriptedHttpClient::new([
		ScriptedReply::ok(r#"{"access_token":"first","expires_in":3600}"#),
		ScriptedReply::ok(r#"{"access_token":"second","expires_in":3600}"#),
	]);
	let source = source(config(&clock), &http);

	assert_eq!(source.token().await.expect("First token should be fetched."), "first");

	clock.advance(Duration::seconds(3600 - 29));

	assert_eq!(source.token().await.expect("Refresh should succeed."), "second");
	assert_eq!(source.token().await.expect("Refreshed token should be reused."), "second");
	assert_eq!(http.calls(), 2);
}

#[tokio::test]
async fn sources_with_same_credentials_share_the_cache() {
	let clock = clock();
	let cache = MemoryCache::with_clock(Arc::new(clock.clone()));
	let http = ScriptedHttpClient::new([ScriptedReply::ok(LONG_LIVED)]);
	let first = source(config(&clock).with_cache(cache.clone()), &http);
	let second = source(
		config(&clock).with_cache(cache.clone()).with_scopes(["other"]),
		&ScriptedHttpClient::default(),
	);

	assert_eq!(first.cache_key(), second.cache_key());
	assert_eq!(first.token().await.expect("First source should fetch."), "long-lived");
	assert_eq!(second.token().await.expect("Second source should use the cache."), "long-lived");
	assert_eq!(http.calls(), 1);
	assert_eq!(second.stats().cache_hits(), 1);
	assert_eq!(second.stats().fetches(), 0);
}

#[tokio::test]
async fn prepopulated_cache_is_adopted_without_endpoint_calls() {
	let clock = clock();
	let cache = MemoryCache::with_clock(Arc::new(clock.clone()));

	cache
		.set(
			&cache_key(CLIENT_ID, CLIENT_SECRET),
			r#"{"access_token":"cached-token","expires_in":3600}"#.into(),
			Duration::hours(1),
		)
		.await
		.expect("Seeding the cache should succeed.");

	let http = ScriptedHttpClient::default();
	let source = source(
		config(&clock).with_cache(cache).with_refresh_before(Duration::seconds(30)),
		&http,
	);

	assert_eq!(source.token().await.expect("Cached token should be adopted."), "cached-token");
	assert_eq!(source.token().await.expect("Adopted token should be held."), "cached-token");
	assert_eq!(http.calls(), 0);
	assert_eq!(source.stats().memory_hits(), 1);
}

#[tokio::test]
async fn provider_errors_surface_and_next_call_retries() {
	let clock = clock();
	let http = ScriptedHttpClient::new([
		ScriptedReply::Status(401, "invalid_client".into()),
		ScriptedReply::ok(LONG_LIVED),
	]);
	let source = source(config(&clock), &http);
	let err = source.token().await.expect_err("401 should surface.");

	assert!(matches!(&err, Error::Provider { body, .. } if body == "invalid_client"));
	assert!(err.to_string().contains("401"));
	assert!(err.to_string().contains("invalid_client"));
	assert_eq!(source.token().await.expect("Second attempt should succeed."), "long-lived");
	assert_eq!(http.calls(), 2);
	assert_eq!(source.stats().fetch_failures(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_token() {
	let start = OffsetDateTime::now_utc();
	let clock = ManualClock::new(start);
	let http = ScriptedHttpClient::new([
		ScriptedReply::ok(r#"{"access_token":"original","expires_in":3600}"#),
		ScriptedReply::Status(503, "maintenance".into()),
	]);
	let source = source(config(&clock), &http);

	assert_eq!(source.token().await.expect("First token should be fetched."), "original");

	clock.advance(Duration::seconds(3590));

	assert!(matches!(source.token().await, Err(Error::Provider { .. })));

	clock.set(start);

	assert_eq!(source.token().await.expect("Held token should survive."), "original");
	assert_eq!(http.calls(), 2);
}

#[tokio::test]
async fn failure_without_a_held_token_is_surfaced() {
	let clock = clock();
	let http = ScriptedHttpClient::new([ScriptedReply::TransportFailure("dns".into())]);
	let source = source(config(&clock), &http);

	assert!(matches!(source.token().await, Err(Error::Transport(_))));
	assert!(matches!(source.token().await, Err(Error::Transport(_))));
	assert_eq!(http.calls(), 2);
}

#[tokio::test]
async fn custom_schema_yields_the_same_token_and_lifetime() {
	let clock = clock();
	let standard_cache = MemoryCache::with_clock(Arc::new(clock.clone()));
	let vendor_cache = MemoryCache::with_clock(Arc::new(clock.clone()));
	let standard = source(
		config(&clock).with_cache(standard_cache.clone()),
		&ScriptedHttpClient::new([ScriptedReply::ok(
			r#"{"access_token":"same","expires_in":120}"#,
		)]),
	);
	let vendor_http =
		ScriptedHttpClient::new([ScriptedReply::ok(r#"{"token":"same","expires_at":120}"#)]);
	let vendor = TokenSource::<ScriptedHttpClient, VendorResponse>::with_http_client(
		config(&clock).with_cache(vendor_cache.clone()),
		vendor_http.clone(),
	)
	.expect("Vendor token source should build.");

	assert_eq!(standard.token().await.expect("Standard schema should decode."), "same");
	assert_eq!(vendor.token().await.expect("Vendor schema should decode."), "same");

	let standard_record =
		standard_cache.get(standard.cache_key()).await.expect("Cache read should succeed.");
	let vendor_record =
		vendor_cache.get(vendor.cache_key()).await.expect("Cache read should succeed.");

	assert_eq!(standard_record, vendor_record);
	assert_eq!(standard_record.as_deref(), Some(r#"{"access_token":"same","expires_in":120}"#));

	clock.advance(Duration::seconds(120 - 30));

	assert_eq!(vendor.token().await.expect("Vendor token should still be fresh."), "same");
	assert_eq!(vendor_http.calls(), 1);
}

#[tokio::test]
async fn missing_expiry_falls_back_to_refresh_before() {
	let clock = clock();
	let cache = MemoryCache::with_clock(Arc::new(clock.clone()));
	let http = ScriptedHttpClient::new([ScriptedReply::ok(r#"{"access_token":"no-expiry"}"#)]);
	let source = source(config(&clock).with_cache(cache.clone()), &http);

	assert_eq!(source.token().await.expect("Token should be fetched."), "no-expiry");
	assert_eq!(
		cache.get(source.cache_key()).await.expect("Cache read should succeed.").as_deref(),
		Some(r#"{"access_token":"no-expiry","expires_in":30}"#),
	);
	assert_eq!(source.token().await.expect("Token should be held."), "no-expiry");
	assert_eq!(http.calls(), 1);
}

#[tokio::test]
async fn zero_lifetime_tokens_are_not_written_to_the_cache() {
	let clock = clock();
	let cache = MemoryCache::with_clock(Arc::new(clock.clone()));
	let http = ScriptedHttpClient::new([ScriptedReply::ok(r#"{"access_token":"ephemeral"}"#)]);
	let source =
		source(config(&clock).with_cache(cache.clone()).with_refresh_before(Duration::ZERO), &http);

	assert_eq!(source.token().await.expect("Token should be fetched."), "ephemeral");
	assert!(cache.is_empty());
}

#[tokio::test]
async fn unparseable_cache_records_are_misses() {
	let clock = clock();
	let cache = MemoryCache::with_clock(Arc::new(clock.clone()));
	let http = ScriptedHttpClient::new([ScriptedReply::ok(LONG_LIVED)]);
	let source = source(config(&clock).with_cache(cache.clone()), &http);

	cache
		.set(source.cache_key(), "{not json".into(), Duration::hours(1))
		.await
		.expect("Seeding the cache should succeed.");

	assert_eq!(source.token().await.expect("Corrupt record should fall through."), "long-lived");
	assert_eq!(http.calls(), 1);
}

#[tokio::test]
async fn cache_failures_degrade_to_endpoint_calls() {
	let clock = clock();
	let http = ScriptedHttpClient::new([ScriptedReply::ok(LONG_LIVED)]);
	let source = source(config(&clock).with_cache(BrokenCache), &http);

	assert_eq!(source.token().await.expect("Broken cache should be ignored."), "long-lived");
	assert_eq!(source.token().await.expect("Held token should be reused."), "long-lived");
	assert_eq!(http.calls(), 1);
}

#[tokio::test]
async fn invalidate_forces_a_new_lookup() {
	let clock = clock();
	let http = ScriptedHttpClient::new([
		ScriptedReply::ok(r#"{"access_token":"revoked","expires_in":3600}"#),
		ScriptedReply::ok(r#"{"access_token":"replacement","expires_in":3600}"#),
	]);
	let source = source(config(&clock), &http);

	assert_eq!(source.token().await.expect("First token should be fetched."), "revoked");

	source.invalidate().await;

	assert_eq!(source.token().await.expect("Token should be replaced."), "replacement");
	assert_eq!(http.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_trigger_a_single_fetch() {
	let clock = clock();
	let http = ScriptedHttpClient::new([ScriptedReply::ok(LONG_LIVED)]);
	let source = source(config(&clock), &http);
	let tasks = (0..16)
		.map(|_| {
			let source = source.clone();

			tokio::spawn(async move { source.token().await })
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let token = task.await.expect("Task should not panic.").expect("Token should be served.");

		assert_eq!(token, "long-lived");
	}

	assert_eq!(http.calls(), 1);
}

#[tokio::test]
async fn apply_sets_a_sensitive_bearer_header() {
	let clock = clock();
	let http = ScriptedHttpClient::new([ScriptedReply::ok(LONG_LIVED)]);
	let source = source(config(&clock), &http);
	let mut headers = HeaderMap::new();

	source.apply(&mut headers).await.expect("Apply should succeed.");

	let value = headers.get(AUTHORIZATION).expect("Authorization header should be set.");

	assert_eq!(value, "Bearer long-lived");
	assert!(value.is_sensitive());

	let mut other = HeaderMap::new();

	source.authorize(&mut other).await.expect("RequestAuth should delegate to apply.");

	assert_eq!(other.get(AUTHORIZATION), Some(value));
	assert_eq!(http.calls(), 1);
}

#[tokio::test]
async fn apply_leaves_target_untouched_on_failure() {
	let clock = clock();
	let http = ScriptedHttpClient::new([ScriptedReply::Status(500, "boom".into())]);
	let source = source(config(&clock), &http);
	let mut headers = HeaderMap::new();

	assert!(source.apply(&mut headers).await.is_err());
	assert!(headers.is_empty());
}

#[tokio::test]
async fn apply_opt_is_a_noop_when_either_side_is_missing() {
	let clock = clock();
	let http = ScriptedHttpClient::default();
	let source = source(config(&clock), &http);
	let mut headers = HeaderMap::new();

	TokenSource::apply_opt(None::<&TokenSource<ScriptedHttpClient>>, Some(&mut headers))
		.await
		.expect("Missing source should be a no-op.");
	TokenSource::apply_opt(Some(&source), None::<&mut HeaderMap>)
		.await
		.expect("Missing target should be a no-op.");

	assert!(headers.is_empty());
	assert_eq!(http.calls(), 0);

	TokenSource::apply_opt(Some(&source), Some(&mut headers))
		.await
		.expect("Both sides present should apply.");

	assert_eq!(headers.get(AUTHORIZATION).map(|v| v.as_bytes()), Some(&b"Bearer t1"[..]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timed_out_fetch_releases_the_lock_for_queued_callers() {
	let clock = clock();
	let http = ScriptedHttpClient::new([ScriptedReply::Stall, ScriptedReply::ok(LONG_LIVED)]);
	let source = source(config(&clock), &http);
	let stalled = {
		let source = source.clone();

		tokio::spawn(async move {
			tokio::time::timeout(StdDuration::from_millis(200), source.token()).await
		})
	};

	while http.calls() == 0 {
		tokio::time::sleep(StdDuration::from_millis(5)).await;
	}

	let queued = {
		let source = source.clone();

		tokio::spawn(async move { source.token().await })
	};

	assert!(stalled.await.expect("Task should not panic.").is_err());
	assert_eq!(
		queued.await.expect("Task should not panic.").expect("Queued caller should fetch."),
		"long-lived",
	);
	assert_eq!(source.token().await.expect("Fetched token should be held."), "long-lived");
	assert_eq!(http.calls(), 2);
	assert_eq!(source.stats().fetches(), 1);
	assert_eq!(source.stats().fetch_failures(), 0);
	assert_eq!(source.stats().memory_hits(), 1);
}

#[tokio::test]
async fn prejoined_scopes_reach_the_endpoint_unchanged() {
	let clock = clock();
	let http = ScriptedHttpClient::new([ScriptedReply::ok(LONG_LIVED)]);
	let source = source(config(&clock).with_scopes(["read write"]), &http);

	assert_eq!(source.token().await.expect("Pre-joined scopes should be accepted."), "long-lived");

	let requests = http.requests();

	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].body, "grant_type=client_credentials&scope=read+write");
}
