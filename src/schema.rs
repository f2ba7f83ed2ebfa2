//! Token endpoint response schemas.
//!
//! A [`TokenSource`](crate::source::TokenSource) is bound to exactly one schema through its
//! `R` type parameter. The default, [`StandardTokenResponse`], reads the RFC 6749 field names;
//! providers that answer with different field names plug in their own type:
//!
//! ```
//! use oauth2_token_source::schema::TokenResponse;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct VendorResponse {
//! 	token: String,
//! 	#[serde(default)]
//! 	expires_at: i64,
//! }
//! impl TokenResponse for VendorResponse {
//! 	fn access_token(&self) -> &str {
//! 		&self.token
//! 	}
//!
//! 	fn expires_in(&self) -> i64 {
//! 		self.expires_at
//! 	}
//! }
//! ```

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Accessors over a decoded token endpoint body.
pub trait TokenResponse
where
	Self: 'static + Send + DeserializeOwned,
{
	/// Access token string; an empty value is treated as a failed exchange.
	fn access_token(&self) -> &str;

	/// Lifetime in seconds; zero or negative means the provider did not specify one.
	fn expires_in(&self) -> i64;
}

/// RFC 6749 §5.1 response body.
#[derive(Clone, Serialize, Deserialize)]
pub struct StandardTokenResponse {
	/// `access_token` field.
	pub access_token: String,
	/// `token_type` field, usually `Bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// `expires_in` field in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Space-delimited `scope` field, when the provider echoes it.
	#[serde(default)]
	pub scope: Option<String>,
}
impl TokenResponse for StandardTokenResponse {
	fn access_token(&self) -> &str {
		&self.access_token
	}

	fn expires_in(&self) -> i64 {
		self.expires_in.unwrap_or_default()
	}
}
impl Debug for StandardTokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StandardTokenResponse")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.finish()
	}
}

/// Decodes `body` into the schema type, recording the JSON path of any mismatch.
pub fn decode<R>(body: &[u8]) -> Result<R, serde_path_to_error::Error<serde_json::Error>>
where
	R: TokenResponse,
{
	let de = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(de)
}
