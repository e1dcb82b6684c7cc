//! Outgoing request model shared by callers, the pipeline, and transports.

// self
use crate::{_prelude::*, error::TransportError};

/// A logical portal API call.
///
/// `path` may be relative (`/tenants`), prefixed with the API base path (`/api/tenants`), or
/// absolute; the client normalizes it before classification.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Request path.
	pub path: String,
	/// Query pairs appended to the URL.
	pub query: Vec<(String, String)>,
	/// Per-request headers, merged over the client's default headers.
	pub headers: HeaderMap,
	/// Request payload.
	pub body: RequestBody,
	/// Per-request timeout overriding the client default.
	pub timeout: Option<Duration>,
}
impl ApiRequest {
	/// Creates a request with no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: RequestBody::Empty,
			timeout: None,
		}
	}

	/// Creates a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Creates a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Creates a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Creates a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Creates a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		let value = serde_json::to_value(body).map_err(|e| Error::InvalidRequest {
			reason: format!("body could not be serialized as JSON: {e}"),
		})?;

		self.body = RequestBody::Json(value);

		Ok(self)
	}

	/// Replaces the payload with a multipart form.
	pub fn with_multipart(mut self, form: MultipartForm) -> Self {
		self.body = RequestBody::Multipart(form);

		self
	}

	/// Adds a header, replacing any previous value with the same name.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Overrides the timeout for this request only.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns the bearer credential carried by the request, if any.
	pub fn bearer_token(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
	}
}

/// Request payload variants.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No payload.
	#[default]
	Empty,
	/// JSON document.
	Json(serde_json::Value),
	/// Multipart upload; never coalesced.
	Multipart(MultipartForm),
}
impl RequestBody {
	/// Returns true for multipart uploads.
	pub fn is_multipart(&self) -> bool {
		matches!(self, Self::Multipart(_))
	}
}

/// Multipart form built by upload call sites.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipartForm {
	/// Parts in submission order.
	pub parts: Vec<FormPart>,
}
impl MultipartForm {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(FormPart { name: name.into(), value: PartValue::Text(value.into()) });

		self
	}

	/// Adds a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		content_type: Option<&str>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		self.parts.push(FormPart {
			name: name.into(),
			value: PartValue::File {
				file_name: file_name.into(),
				content_type: content_type.map(str::to_owned),
				bytes: bytes.into(),
			},
		});

		self
	}

	pub(crate) fn into_reqwest(self) -> Result<reqwest::multipart::Form, TransportError> {
		let mut form = reqwest::multipart::Form::new();

		for FormPart { name, value } in self.parts {
			form = match value {
				PartValue::Text(text) => form.text(name, text),
				PartValue::File { file_name, content_type, bytes } => {
					let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);

					if let Some(mime) = content_type {
						part = part.mime_str(&mime).map_err(|e| TransportError::InvalidRequest {
							message: format!("multipart part `{name}` has an invalid type: {e}"),
						})?;
					}

					form.part(name, part)
				},
			};
		}

		Ok(form)
	}
}

/// Single named part of a [`MultipartForm`].
#[derive(Clone, Debug, PartialEq)]
pub struct FormPart {
	/// Field name.
	pub name: String,
	/// Field payload.
	pub value: PartValue,
}

/// Payload of a [`FormPart`].
#[derive(Clone, PartialEq)]
pub enum PartValue {
	/// Plain text field.
	Text(String),
	/// Binary file.
	File {
		/// File name reported to the server.
		file_name: String,
		/// MIME type, if known.
		content_type: Option<String>,
		/// File contents.
		bytes: Vec<u8>,
	},
}
impl Debug for PartValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::File { file_name, content_type, bytes } => f
				.debug_struct("File")
				.field("file_name", file_name)
				.field("content_type", content_type)
				.field("len", &bytes.len())
				.finish(),
		}
	}
}
