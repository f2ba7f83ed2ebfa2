//! Demonstrates fetching a client-credentials token with the default reqwest transport and
//! attaching it to an outgoing API call through [`AuthorizedClient`].

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_token_source::{
	client::AuthorizedClient,
	reqwest::{Client, Method},
	source::{ReqwestTokenSource, TokenSource, TokenSourceConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer demo-access");
			then.status(200).body("{\"name\":\"service-router\"}");
		})
		.await;
	let config = TokenSourceConfig::parse(&server.url("/token"), "demo-client", "super-secret")?
		.with_scopes(["email.read", "profile.read"]);
	let source: ReqwestTokenSource = TokenSource::new(config.clone())?;

	println!("Reusable access token: {}.", source.token().await?);

	let client = AuthorizedClient::new(Client::new()).with_oauth_client_credentials(config)?;
	let request = client.client().request(Method::GET, server.url("/me")).build()?;
	let response = client.execute(request).await?;

	println!("API answered: {}.", response.text().await?);

	token_mock.assert_calls_async(2).await;
	api_mock.assert_async().await;

	Ok(())
}
