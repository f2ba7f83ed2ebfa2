//! Request authorization hooks.
//!
//! [`RequestAuth`] is the contract the request-dispatch side calls exactly once per outgoing
//! request, before sending. The crate ships three implementations: [`BasicAuth`],
//! [`BearerToken`], and [`TokenSource`](crate::source::TokenSource) for OAuth 2.0 client
//! credentials. A failing hook leaves the request headers untouched.

pub mod secret;

pub use secret::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::http::{
	Request as HttpRequest,
	header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future returned by [`RequestAuth::authorize`].
pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Anything that carries a mutable header map an `Authorization` header can be written to.
pub trait AuthorizationTarget {
	/// Mutable access to the outgoing headers.
	fn headers_mut(&mut self) -> &mut HeaderMap;
}
impl AuthorizationTarget for HeaderMap {
	fn headers_mut(&mut self) -> &mut HeaderMap {
		self
	}
}
impl<B> AuthorizationTarget for HttpRequest<B> {
	fn headers_mut(&mut self) -> &mut HeaderMap {
		HttpRequest::headers_mut(self)
	}
}
#[cfg(feature = "reqwest")]
impl AuthorizationTarget for reqwest::Request {
	fn headers_mut(&mut self) -> &mut HeaderMap {
		reqwest::Request::headers_mut(self)
	}
}

/// Default authorization applied to every request a client sends.
pub trait RequestAuth
where
	Self: Send + Sync,
{
	/// Writes credentials into `headers`; on error the headers must be left as they were.
	fn authorize<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthFuture<'a>;
}

/// HTTP Basic credentials.
#[derive(Clone, Debug)]
pub struct BasicAuth {
	/// User name.
	pub username: String,
	/// Password; redacted in debug output.
	pub password: Secret,
}
impl BasicAuth {
	/// Creates Basic credentials.
	pub fn new(username: impl Into<String>, password: impl Into<Secret>) -> Self {
		Self { username: username.into(), password: password.into() }
	}
}
impl RequestAuth for BasicAuth {
	fn authorize<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthFuture<'a> {
		Box::pin(async move {
			let value = basic_header_value(&self.username, self.password.expose())?;

			headers.insert(AUTHORIZATION, value);

			Ok(())
		})
	}
}

/// Static bearer token. An empty token authorizes nothing.
#[derive(Clone, Debug)]
pub struct BearerToken(pub Secret);
impl BearerToken {
	/// Wraps a static token.
	pub fn new(token: impl Into<Secret>) -> Self {
		Self(token.into())
	}
}
impl RequestAuth for BearerToken {
	fn authorize<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthFuture<'a> {
		Box::pin(async move {
			if self.0.is_empty() {
				return Ok(());
			}

			headers.insert(AUTHORIZATION, bearer_header_value(self.0.expose())?);

			Ok(())
		})
	}
}

/// Builds `Basic base64(username:password)`, marked sensitive.
pub fn basic_header_value(username: &str, password: &str) -> Result<HeaderValue> {
	let encoded = STANDARD.encode(format!("{username}:{password}"));

	sensitive_header_value(format!("Basic {encoded}"))
}

/// Builds `Bearer <token>`, marked sensitive.
pub fn bearer_header_value(token: &str) -> Result<HeaderValue> {
	sensitive_header_value(format!("Bearer {token}"))
}

fn sensitive_header_value(raw: String) -> Result<HeaderValue> {
	let mut value = HeaderValue::try_from(raw)
		.map_err(|source| ConfigError::InvalidHeaderValue { header: "Authorization", source })?;

	value.set_sensitive(true);

	Ok(value)
}
