//! Thin dispatch wrapper that applies a default [`RequestAuth`] to every outgoing request.

// crates.io
use reqwest::{Request, Response};
// self
use crate::{
	_prelude::*,
	auth::RequestAuth,
	error::TransportError,
	http::ReqwestHttpClient,
	schema::StandardTokenResponse,
	source::{TokenSource, TokenSourceConfig},
};

/// reqwest client plus an optional default authorization hook.
///
/// The hook runs exactly once per request, right before sending. When it fails the request is
/// never sent.
#[derive(Clone, Default)]
pub struct AuthorizedClient {
	client: ReqwestClient,
	auth: Option<Arc<dyn RequestAuth>>,
}
impl AuthorizedClient {
	/// Wraps `client` without any default authorization.
	pub fn new(client: ReqwestClient) -> Self {
		Self { client, auth: None }
	}

	/// Sets the default authorization hook.
	pub fn with_auth<A>(self, auth: A) -> Self
	where
		A: 'static + RequestAuth,
	{
		self.with_shared_auth(Arc::new(auth))
	}

	/// Sets a default authorization hook that is shared with other clients.
	pub fn with_shared_auth(mut self, auth: Arc<dyn RequestAuth>) -> Self {
		self.auth = Some(auth);

		self
	}

	/// Authorizes requests with client-credentials tokens fetched through this client's own
	/// connection pool.
	pub fn with_oauth_client_credentials(self, config: TokenSourceConfig) -> Result<Self> {
		let source = TokenSource::<ReqwestHttpClient, StandardTokenResponse>::with_http_client(
			config,
			ReqwestHttpClient::with_client(self.client.clone()),
		)?;

		Ok(self.with_auth(source))
	}

	/// Underlying reqwest client, e.g. for building requests.
	pub fn client(&self) -> &ReqwestClient {
		&self.client
	}

	/// Applies the default authorization, then sends `request`.
	pub async fn execute(&self, mut request: Request) -> Result<Response> {
		if let Some(auth) = &self.auth {
			auth.authorize(request.headers_mut()).await?;
		}

		self.client.execute(request).await.map_err(|e| TransportError::from(e).into())
	}
}
impl Debug for AuthorizedClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedClient").field("auth", &self.auth.is_some()).finish()
	}
}
