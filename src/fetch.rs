//! Client-credentials exchange against the token endpoint.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{self, Secret},
	error::{ConfigError, TransportError},
	http::TokenHttpClient,
	schema::{self, TokenResponse},
	source::TokenSourceConfig,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_ACCEPT: &str = "application/json";

/// Token returned by a successful exchange.
#[derive(Clone, Debug)]
pub struct FetchedToken {
	/// Non-empty access token.
	pub access_token: Secret,
	/// Provider-declared lifetime; `None` when missing, zero, or negative.
	pub expires_in: Option<Duration>,
}

/// Issues `grant_type=client_credentials` requests and decodes them with schema `R`.
pub struct TokenFetcher<C, R>
where
	C: ?Sized + TokenHttpClient,
{
	http_client: Arc<C>,
	token_url: Url,
	client_id: String,
	client_secret: Secret,
	scopes: Vec<String>,
	extra_params: BTreeMap<String, String>,
	_schema: PhantomData<fn() -> R>,
}
impl<C, R> TokenFetcher<C, R>
where
	C: ?Sized + TokenHttpClient,
	R: TokenResponse,
{
	/// Captures the request parameters from `config`.
	pub fn new(http_client: Arc<C>, config: &TokenSourceConfig) -> Self {
		Self {
			http_client,
			token_url: config.token_url.clone(),
			client_id: config.client_id.clone(),
			client_secret: config.client_secret.clone(),
			scopes: config.scopes.clone(),
			extra_params: config.extra_params.clone(),
			_schema: PhantomData,
		}
	}

	/// Encodes the form body.
	///
	/// Keys are written in lexical order; an extra parameter named `grant_type` or `scope`
	/// replaces the built-in value.
	pub fn form_body(&self) -> String {
		let mut form = BTreeMap::new();

		form.insert("grant_type", "client_credentials".to_owned());

		if !self.scopes.is_empty() {
			form.insert("scope", self.scopes.join(" "));
		}
		for (key, value) in &self.extra_params {
			form.insert(key.as_str(), value.clone());
		}

		form_urlencoded::Serializer::new(String::new()).extend_pairs(form).finish()
	}

	/// Builds the token endpoint request.
	pub fn build_request(&self) -> Result<HttpRequest> {
		let authorization = auth::basic_header_value(&self.client_id, self.client_secret.expose())?;
		let request = Request::builder()
			.method(Method::POST)
			.uri(self.token_url.as_str())
			.header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
			.header(ACCEPT, HeaderValue::from_static(JSON_ACCEPT))
			.header(AUTHORIZATION, authorization)
			.body(self.form_body().into_bytes())
			.map_err(ConfigError::from)?;

		Ok(request)
	}

	/// Performs one exchange. Nothing is retried.
	pub async fn fetch(&self) -> Result<FetchedToken> {
		let request = self.build_request()?;
		let handle = self.http_client.handle();
		let response = handle.call(request).await.map_err(TransportError::from_http_client)?;
		let status = response.status();

		if status.as_u16() >= 400 {
			return Err(Error::Provider {
				status,
				body: String::from_utf8_lossy(response.body()).into_owned(),
			});
		}

		let decoded = schema::decode::<R>(response.body())
			.map_err(|source| Error::Decode { source, status })?;

		if decoded.access_token().is_empty() {
			return Err(Error::EmptyToken);
		}

		let expires_in = Some(decoded.expires_in()).filter(|secs| *secs > 0).map(Duration::seconds);

		Ok(FetchedToken { access_token: Secret::new(decoded.access_token()), expires_in })
	}
}
impl<C, R> Debug for TokenFetcher<C, R>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenFetcher")
			.field("token_url", &self.token_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("scopes", &self.scopes)
			.field("extra_params", &self.extra_params)
			.finish()
	}
}
