//! Transport primitives for portal API calls.
//!
//! The pipeline's only dependency on an HTTP stack is [`HttpTransport`]: it receives an
//! [`ApiRequest`] whose path is already normalized relative to the API base and returns the
//! raw [`ApiResponse`] or a [`TransportError`]. Status handling (backoff, renewal, coalescing)
//! lives above the transport, so custom transports never need to reproduce it.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing portal API calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// every clone of the client and by coalesced calls that outlive their initiator. Timeouts
/// and aborts must be reported as [`TransportError::Timeout`] and
/// [`TransportError::Aborted`]; the pipeline relies on that distinction to keep transient
/// network failures from ending the session.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with the response, whatever its status.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] bound to the API base URL.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
}
impl ReqwestTransport {
	/// Builds a transport with a default reqwest client.
	pub fn new(base_url: Url) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().build()?;

		Ok(Self::with_client(client, base_url))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url }
	}

	/// Base URL every request path is appended to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Resolves a normalized path + query against the base URL.
	pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Url {
		let mut url = self.base_url.clone();
		let joined = format!("{}{path}", url.path().trim_end_matches('/'));

		url.set_path(&joined);
		url.set_query(None);

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		url
	}

	fn build(&self, request: ApiRequest) -> Result<reqwest::Request, TransportError> {
		let url = self.url_for(&request.path, &request.query);
		let mut builder = self.client.request(request.method, url).headers(request.headers);

		if let Some(timeout) = request.timeout {
			builder = builder.timeout(timeout);
		}

		builder = match request.body {
			RequestBody::Empty => builder,
			RequestBody::Json(value) => builder.body(serde_json::to_vec(&value).map_err(|e| {
				TransportError::InvalidRequest { message: format!("JSON body failed to encode: {e}") }
			})?),
			RequestBody::Multipart(form) => builder.multipart(form.into_reqwest()?),
		};

		Ok(builder.build()?)
	}
}
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request = self.build(request)?;
			let response = self.client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse::new(status, headers, body))
		})
	}
}
