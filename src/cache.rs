//! External token cache contracts, the shared cache-key derivation, and built-in backends.
//!
//! The cache is an optimization: [`TokenSource`](crate::source::TokenSource) treats every
//! [`CacheError`] from `get` as a miss and ignores errors from `set`.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// std
use std::fmt::Write as _;
// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Namespace prefixed to every cache key written by this crate.
pub const CACHE_KEY_NAMESPACE: &str = "oauth2-token-source";

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Out-of-process key-value store with TTL support (Redis, Memcached, a shared file, ...).
///
/// Implementations provide their own concurrency safety; token sources in different
/// processes coordinate only through the key.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Reads `key`. `None` (or an empty string) means "not present".
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;

	/// Writes `value` under `key` for `ttl`.
	fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Token record as stored in the cache: `{"access_token": string, "expires_in": integer}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTokenRecord {
	/// Access token.
	pub access_token: String,
	/// Lifetime in seconds at the time of writing; non-positive means unknown.
	#[serde(default)]
	pub expires_in: i64,
}
impl CachedTokenRecord {
	/// Serializes the record into its wire form.
	pub fn encode(&self) -> Result<String, CacheError> {
		serde_json::to_string(self)
			.map_err(|e| CacheError::Serialization { message: e.to_string() })
	}

	/// Parses a cached value; malformed records and empty tokens yield `None`.
	pub fn decode(raw: &str) -> Option<Self> {
		serde_json::from_str::<Self>(raw).ok().filter(|record| !record.access_token.is_empty())
	}
}
impl Debug for CachedTokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedTokenRecord")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

/// Derives the shared cache key for a credential pair.
///
/// The key depends on the client id and secret only, never on scopes or the token URL, so
/// every instance holding the same credentials converges on one cached token.
pub fn cache_key(client_id: &str, client_secret: &str) -> String {
	let digest = Sha256::digest(format!("{client_id}:{client_secret}").as_bytes());
	let mut key = String::with_capacity(CACHE_KEY_NAMESPACE.len() + 7 + digest.len() * 2);

	key.push_str(CACHE_KEY_NAMESPACE);
	key.push_str(":oauth:");

	for byte in digest {
		let _ = write!(key, "{byte:02x}");
	}

	key
}
