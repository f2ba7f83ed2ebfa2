//! OAuth 2.0 client-credentials token source: obtain, cache, proactively refresh, and inject
//! bearer tokens, optionally sharing them across processes through an external cache.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
#[cfg(feature = "reqwest")] pub mod client;
pub mod clock;
pub mod error;
pub mod fetch;
pub mod http;
pub mod obs;
pub mod schema;
pub mod source;
#[cfg(any(test, feature = "test"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fakes for integration tests; enabled via `cfg(test)` or the
	//! `test` feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// crates.io
	use oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{StatusCode, header::HeaderMap},
	};
	// self
	use crate::http::TokenHttpClient;
	#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

	/// Failure emitted by [`ScriptedHttpClient`] for [`ScriptedReply::TransportFailure`].
	#[derive(Debug, ThisError)]
	#[error("Scripted transport failure: {0}.")]
	pub struct ScriptedTransportError(pub String);

	/// One canned reply served by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub enum ScriptedReply {
		/// HTTP response with the given status and body.
		Status(u16, String),
		/// Transport-level failure (no HTTP response at all).
		TransportFailure(String),
		/// Request that never completes; the caller has to drop it.
		Stall,
	}
	impl ScriptedReply {
		/// Successful JSON body.
		pub fn ok(body: impl Into<String>) -> Self {
			Self::Status(200, body.into())
		}
	}

	/// Request captured by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// Request method.
		pub method: String,
		/// Target URI.
		pub uri: String,
		/// Request headers.
		pub headers: HeaderMap,
		/// UTF-8 body.
		pub body: String,
	}

	/// In-process transport that replays scripted replies and counts calls.
	///
	/// When the script runs dry the last reply is repeated; a client with no script at all
	/// answers `200` with `t<call number>` tokens that live for one second.
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedHttpClient {
		calls: Arc<AtomicUsize>,
		script: Arc<Mutex<VecDeque<ScriptedReply>>>,
		last: Arc<Mutex<Option<ScriptedReply>>>,
		requests: Arc<Mutex<Vec<RecordedRequest>>>,
	}
	impl ScriptedHttpClient {
		/// Builds a client that serves `replies` in order.
		pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
			let client = Self::default();

			client.script.lock().extend(replies);

			client
		}

		/// Appends another reply to the script.
		pub fn push(&self, reply: ScriptedReply) {
			self.script.lock().push_back(reply);
		}

		/// Number of requests dispatched so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Requests dispatched so far.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}

		fn next_reply(&self, call: usize) -> ScriptedReply {
			if let Some(reply) = self.script.lock().pop_front() {
				*self.last.lock() = Some(reply.clone());

				return reply;
			}

			self.last.lock().clone().unwrap_or_else(|| {
				ScriptedReply::ok(format!(
					"{{\"access_token\":\"t{call}\",\"token_type\":\"Bearer\",\"expires_in\":1}}"
				))
			})
		}
	}
	impl TokenHttpClient for ScriptedHttpClient {
		type Handle = ScriptedHandle;
		type TransportError = ScriptedTransportError;

		fn handle(&self) -> Self::Handle {
			ScriptedHandle(self.clone())
		}
	}

	/// Handle returned by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub struct ScriptedHandle(ScriptedHttpClient);
	impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
		type Error = HttpClientError<ScriptedTransportError>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			Box::pin(async move {
				let call = self.0.calls.fetch_add(1, Ordering::SeqCst) + 1;

				self.0.requests.lock().push(RecordedRequest {
					method: request.method().to_string(),
					uri: request.uri().to_string(),
					headers: request.headers().clone(),
					body: String::from_utf8_lossy(request.body()).into_owned(),
				});

				match self.0.next_reply(call) {
					ScriptedReply::Status(status, body) => {
						let mut response = HttpResponse::new(body.into_bytes());

						*response.status_mut() =
							StatusCode::from_u16(status).unwrap_or(StatusCode::OK);

						Ok(response)
					},
					ScriptedReply::TransportFailure(message) =>
						Err(HttpClientError::Reqwest(Box::new(ScriptedTransportError(message)))),
					ScriptedReply::Stall => std::future::pending().await,
				}
			})
		}
	}

	/// Builds a plain reqwest transport for tests that talk to `httpmock`.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::default()
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		marker::PhantomData,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
