//! Client-level error types shared across the pipeline, stores, and transports.

// self
use crate::{_prelude::*, http::ApiResponse, policy::Classification};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Errors are `Clone` so coalesced callers can all receive the same outcome.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (timeout, abort, DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),

	/// Request could not be assembled from the caller's input.
	#[error("Request is invalid: {reason}.")]
	InvalidRequest {
		/// Human-readable reason string.
		reason: String,
	},
	/// Rate limit persisted after every backoff retry was spent.
	#[error("Rate limit on `{path}` persisted after {attempts} retries.")]
	RateLimited {
		/// Normalized request path.
		path: String,
		/// Number of retries performed before giving up.
		attempts: u32,
		/// Retry-After hint from the final response, if supplied.
		retry_after: Option<Duration>,
		/// Final `429` response.
		response: ApiResponse,
	},
	/// Session could not be recovered after an authentication failure.
	#[error("Session is not authenticated: {reason}.")]
	Unauthenticated {
		/// Why the session could not be recovered.
		reason: SessionFailure,
	},
	/// Server refused access to the resource.
	#[error(transparent)]
	Forbidden(StatusError),
	/// Server-side failure (`5xx`).
	#[error(transparent)]
	Server(StatusError),
	/// Any other non-success status, including `401` on public endpoints.
	#[error(transparent)]
	Status(StatusError),
	/// Response body did not match the expected shape.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured decoding failure including the offending field path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
}
impl Error {
	/// Returns true if the failure was a client-side timeout or abort.
	pub fn is_timeout_or_abort(&self) -> bool {
		matches!(self, Self::Transport(TransportError::Timeout | TransportError::Aborted))
	}

	/// Returns the HTTP status tied to the failure, when one was received.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::RateLimited { response, .. } => Some(response.status()),
			Self::Forbidden(e) | Self::Server(e) | Self::Status(e) => Some(e.status),
			Self::Unauthenticated { reason } => reason.status(),
			_ => None,
		}
	}

	pub(crate) fn decode(source: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Decode { source: Arc::new(source) }
	}
}

impl From<SessionFailure> for Error {
	fn from(reason: SessionFailure) -> Self {
		Self::Unauthenticated { reason }
	}
}

/// Reasons a `401` could not be recovered locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionFailure {
	/// No refresh token was stored.
	MissingRefreshToken,
	/// Renewal endpoint rejected the refresh token or could not be reached.
	RenewalRejected {
		/// HTTP status from the renewal endpoint, if it responded.
		status: Option<StatusCode>,
	},
	/// Renewal endpoint answered `2xx` but the token envelope was unusable.
	MalformedRenewal {
		/// Field path or parser message describing the problem.
		detail: String,
	},
}
impl SessionFailure {
	fn status(&self) -> Option<StatusCode> {
		match self {
			Self::RenewalRejected { status } => *status,
			_ => None,
		}
	}
}
impl Display for SessionFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::MissingRefreshToken => f.write_str("no refresh token is stored"),
			Self::RenewalRejected { status: Some(status) } =>
				write!(f, "renewal was rejected with status {status}"),
			Self::RenewalRejected { status: None } => f.write_str("renewal could not be completed"),
			Self::MalformedRenewal { detail } =>
				write!(f, "renewal response was malformed ({detail})"),
		}
	}
}

/// Non-success response details shared by the status-carrying [`Error`] variants.
#[derive(Clone, Debug, ThisError)]
#[error("{method} `{path}` failed with status {status}.")]
pub struct StatusError {
	/// Request method.
	pub method: Method,
	/// Normalized request path.
	pub path: String,
	/// HTTP status returned by the server.
	pub status: StatusCode,
	/// Classification applied to the request.
	pub classification: Classification,
	/// Full response, including the body.
	pub response: ApiResponse,
}
impl StatusError {
	pub(crate) fn new(
		method: Method,
		path: impl Into<String>,
		classification: Classification,
		response: ApiResponse,
	) -> Self {
		Self { method, path: path.into(), status: response.status(), classification, response }
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http or https.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// A configured path does not start with `/`.
	#[error("The {field} path must start with `/`: {path}.")]
	InvalidPath {
		/// Configuration field that failed validation.
		field: &'static str,
		/// Offending path.
		path: String,
	},
	/// Backoff retry budget exceeds the supported range.
	#[error("Backoff allows at most {max} retries, got {requested}.")]
	RetriesOutOfRange {
		/// Largest supported value.
		max: u32,
		/// Requested value.
		requested: u32,
	},
	/// A default header name or value is not valid HTTP.
	#[error("Default header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration document is invalid at `{path}`: {message}.")]
	Document {
		/// Field path of the failure.
		path: String,
		/// Parser message.
		message: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures raised before a response was received.
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Client-side timeout elapsed.
	#[error("Request timed out before the server responded.")]
	Timeout,
	/// Request was aborted before the server responded.
	#[error("Request was aborted before the server responded.")]
	Aborted,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the portal API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Transport could not turn the request into a wire request.
	#[error("Request could not be encoded for the transport: {message}.")]
	InvalidRequest {
		/// Human-readable description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout
		} else if e.is_builder() {
			Self::InvalidRequest { message: e.to_string() }
		} else {
			Self::network(e)
		}
	}
}
