//! Token-source error types shared by the fetcher, the source, and the auth hooks.

// crates.io
use oauth2::{HttpClientError, http::StatusCode};
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced by [`TokenSource::token`](crate::source::TokenSource::token) and
/// everything built on it.
///
/// Cache failures never show up here; the external cache is an optimization and its errors
/// degrade to misses.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, I/O) while reaching the token endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Token endpoint answered with an HTTP status of 400 or above.
	#[error("Token endpoint returned {status}, body={body}.")]
	Provider {
		/// HTTP status returned by the provider.
		status: StatusCode,
		/// Raw response body, kept verbatim for diagnosing provider-specific failures.
		body: String,
	},
	/// Token endpoint body could not be decoded with the configured response schema.
	#[error("Token endpoint body does not match the response schema at `{}`.", .source.path())]
	Decode {
		/// Structured parsing failure, including the JSON path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the undecodable response.
		status: StatusCode,
	},
	/// Token endpoint answered successfully but the access token was empty.
	#[error("Token endpoint returned an empty access token.")]
	EmptyToken,
}
impl Error {
	/// Returns the HTTP status attached to provider and decode failures.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Provider { status, .. } | Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Token endpoint URL cannot be parsed.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A credential cannot be encoded as an HTTP header value.
	#[error("The {header} header value contains characters that cannot be sent.")]
	InvalidHeaderValue {
		/// Header being built.
		header: &'static str,
		/// Underlying header validation failure.
		#[source]
		source: oauth2::http::header::InvalidHeaderValue,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
	/// HTTP client failed without a structured error.
	#[error("HTTP client error occurred while calling the token endpoint: {message}.")]
	Other {
		/// Client-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Maps an [`HttpClientError`] emitted by a [`TokenHttpClient`](crate::http::TokenHttpClient)
	/// handle into the crate error taxonomy.
	pub fn from_http_client<E>(err: HttpClientError<E>) -> Error
	where
		E: 'static + Send + Sync + StdError,
	{
		match err {
			HttpClientError::Reqwest(inner) => Self::Network { source: inner }.into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => Self::Io(inner).into(),
			HttpClientError::Other(message) => Self::Other { message }.into(),
			_ => Self::Other { message: "unrecognized HTTP client failure".into() }.into(),
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
