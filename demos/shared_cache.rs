//! Demonstrates two token sources converging on one token through a shared file cache, the way
//! separate processes on one host would.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_token_source::{
	cache::FileCache,
	source::{ReqwestTokenSource, TokenSource, TokenSourceConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"shared-access\",\"expires_in\":900}");
		})
		.await;
	let cache_dir =
		std::env::temp_dir().join(format!("oauth2-token-source-demo-{}", std::process::id()));
	let config = TokenSourceConfig::parse(&server.url("/token"), "demo-client", "super-secret")?
		.with_cache(FileCache::open(cache_dir.join("tokens.json"))?);
	let worker_a: ReqwestTokenSource = TokenSource::new(config.clone())?;
	let worker_b: ReqwestTokenSource = TokenSource::new(config)?;

	println!("Worker A token: {}.", worker_a.token().await?);
	println!("Worker B token: {}.", worker_b.token().await?);
	println!("Worker B cache hits: {}.", worker_b.stats().cache_hits());

	token_mock.assert_calls_async(1).await;
	std::fs::remove_dir_all(cache_dir)?;

	Ok(())
}
