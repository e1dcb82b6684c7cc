//! Buffered response model returned by transports and the pipeline.

// std
use std::borrow::Cow;
// crates.io
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use time::{OffsetDateTime, format_description::well_known::Rfc2822};
// self
use crate::_prelude::*;

/// Fully buffered HTTP response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiResponse {
	/// Assembles a response from its parts.
	pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers, body: body.into() }
	}

	/// Creates a response with no headers and no body.
	pub fn empty(status: StatusCode) -> Self {
		Self::new(status, HeaderMap::new(), Vec::new())
	}

	/// Creates a JSON response.
	pub fn json_body(status: StatusCode, body: &serde_json::Value) -> Self {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Self::new(status, headers, body.to_string())
	}

	/// HTTP status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	/// Decodes the body as JSON, reporting the failing field path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de).map_err(Error::decode)
	}

	/// Retry-After hint expressed as a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		let raw = self.headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

		if let Ok(secs) = raw.parse::<u64>() {
			return Some(Duration::from_secs(secs));
		}
		if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
			let delta = moment - OffsetDateTime::now_utc();

			if delta.is_positive() {
				return Duration::try_from(delta).ok();
			}
		}

		None
	}
}
