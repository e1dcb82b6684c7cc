//! Client configuration, builder, and validation.

// self
use crate::{_prelude::*, error::ConfigError, policy::EndpointPolicy};

const MAX_RETRIES_LIMIT: u32 = 10;

/// Everything a [`PortalClient`](crate::client::PortalClient) needs besides its collaborators.
///
/// Deserializable so hosts can ship it as a JSON document; use [`ClientConfig::from_json`] to
/// get field-path errors and validation in one step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// API base URL; its path (e.g. `/api`) is stripped from caller paths during normalization.
	pub base_url: Url,
	/// Default per-request timeout in milliseconds; `None` disables it.
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: Option<u64>,
	/// Rate-limit backoff settings.
	#[serde(default)]
	pub backoff: BackoffConfig,
	/// Session renewal and navigation settings.
	#[serde(default)]
	pub session: SessionConfig,
	/// Headers added to every request before the credential policy runs.
	#[serde(default)]
	pub default_headers: BTreeMap<String, String>,
	/// Whether identical concurrent POSTs share one network call.
	#[serde(default = "default_true")]
	pub coalesce_posts: bool,
	/// Endpoint classification rules.
	#[serde(default)]
	pub policy: EndpointPolicy,
}
impl ClientConfig {
	/// Starts a builder seeded with defaults.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(document: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(document);
		let config: Self = serde_path_to_error::deserialize(&mut de).map_err(|e| {
			ConfigError::Document { path: e.path().to_string(), message: e.inner().to_string() }
		})?;

		config.validate()?;

		Ok(config)
	}

	/// Checks invariants that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.backoff.max_retries > MAX_RETRIES_LIMIT {
			return Err(ConfigError::RetriesOutOfRange {
				max: MAX_RETRIES_LIMIT,
				requested: self.backoff.max_retries,
			});
		}

		for (field, path) in [
			("refresh", &self.session.refresh_path),
			("login", &self.session.login_path),
			("unauthorized", &self.session.unauthorized_path),
		] {
			if !path.starts_with('/') {
				return Err(ConfigError::InvalidPath { field, path: path.clone() });
			}
		}

		self.header_map().map(|_| ())
	}

	/// Path component of the base URL.
	pub fn base_path(&self) -> &str {
		self.base_url.path()
	}

	/// Default per-request timeout.
	pub fn timeout(&self) -> Option<Duration> {
		self.timeout_ms.map(Duration::from_millis)
	}

	/// Default headers as a typed map.
	pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
		let mut headers = HeaderMap::with_capacity(self.default_headers.len());

		for (name, value) in &self.default_headers {
			let invalid = || ConfigError::InvalidHeader { name: name.clone() };
			let header_name = HeaderName::from_str(name).map_err(|_| invalid())?;
			let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;

			headers.insert(header_name, header_value);
		}

		Ok(headers)
	}
}

/// Rate-limit backoff settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
	/// Retries performed after the first `429` before surfacing it.
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	/// Base delay in milliseconds; retry `n` waits `2^n * base`.
	#[serde(default = "default_base_delay_ms")]
	pub base_delay_ms: u64,
}
impl BackoffConfig {
	/// Base delay as a [`Duration`].
	pub fn base_delay(&self) -> Duration {
		Duration::from_millis(self.base_delay_ms)
	}
}
impl Default for BackoffConfig {
	fn default() -> Self {
		Self { max_retries: default_max_retries(), base_delay_ms: default_base_delay_ms() }
	}
}

/// Session renewal endpoint and navigation targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Renewal endpoint, relative to the base URL.
	#[serde(default = "default_refresh_path")]
	pub refresh_path: String,
	/// Login surface navigated to when the session cannot be recovered.
	#[serde(default = "default_login_path")]
	pub login_path: String,
	/// Surface navigated to after a `403`.
	#[serde(default = "default_unauthorized_path")]
	pub unauthorized_path: String,
}
impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			refresh_path: default_refresh_path(),
			login_path: default_login_path(),
			unauthorized_path: default_unauthorized_path(),
		}
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	config: ClientConfig,
}
impl ClientConfigBuilder {
	/// Creates a builder with defaults for everything but the base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			config: ClientConfig {
				base_url,
				timeout_ms: default_timeout_ms(),
				backoff: BackoffConfig::default(),
				session: SessionConfig::default(),
				default_headers: BTreeMap::new(),
				coalesce_posts: true,
				policy: EndpointPolicy::portal_default(),
			},
		}
	}

	/// Sets the default per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.config.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));

		self
	}

	/// Disables the default per-request timeout.
	pub fn no_timeout(mut self) -> Self {
		self.config.timeout_ms = None;

		self
	}

	/// Overrides the rate-limit retry budget.
	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.config.backoff.max_retries = max_retries;

		self
	}

	/// Overrides the base backoff delay.
	pub fn base_delay(mut self, delay: Duration) -> Self {
		self.config.backoff.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);

		self
	}

	/// Overrides the renewal endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.session.refresh_path = path.into();

		self
	}

	/// Overrides the login navigation target.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.config.session.login_path = path.into();

		self
	}

	/// Overrides the unauthorized navigation target.
	pub fn unauthorized_path(mut self, path: impl Into<String>) -> Self {
		self.config.session.unauthorized_path = path.into();

		self
	}

	/// Adds a header sent with every request.
	pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.config.default_headers.insert(name.into(), value.into());

		self
	}

	/// Enables or disables POST coalescing.
	pub fn coalesce_posts(mut self, enabled: bool) -> Self {
		self.config.coalesce_posts = enabled;

		self
	}

	/// Replaces the classification rules.
	pub fn policy(mut self, policy: EndpointPolicy) -> Self {
		self.config.policy = policy;

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn default_timeout_ms() -> Option<u64> {
	Some(30_000)
}

fn default_true() -> bool {
	true
}

fn default_max_retries() -> u32 {
	3
}

fn default_base_delay_ms() -> u64 {
	300
}

fn default_refresh_path() -> String {
	"/auth/refresh-token".into()
}

fn default_login_path() -> String {
	"/login".into()
}

fn default_unauthorized_path() -> String {
	"/unauthorized".into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://portal.example.com/api").expect("Base URL fixture should parse.")
	}

	#[test]
	fn builder_applies_portal_defaults() {
		let config = ClientConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(config.backoff, BackoffConfig { max_retries: 3, base_delay_ms: 300 });
		assert_eq!(config.session.refresh_path, "/auth/refresh-token");
		assert_eq!(config.session.login_path, "/login");
		assert_eq!(config.session.unauthorized_path, "/unauthorized");
		assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
		assert_eq!(config.base_path(), "/api");
		assert!(config.coalesce_posts);
		assert_eq!(config.policy, EndpointPolicy::portal_default());
	}

	#[test]
	fn builder_rejects_invalid_settings() {
		let err = ClientConfig::builder(base())
			.max_retries(11)
			.build()
			.expect_err("Retry budgets above the limit should be rejected.");

		assert!(matches!(err, ConfigError::RetriesOutOfRange { max: 10, requested: 11 }));

		let err = ClientConfig::builder(base())
			.login_path("login")
			.build()
			.expect_err("Relative navigation paths should be rejected.");

		assert!(matches!(err, ConfigError::InvalidPath { field: "login", .. }));

		let err = ClientConfig::builder(base())
			.default_header("bad header", "x")
			.build()
			.expect_err("Invalid header names should be rejected.");

		assert!(matches!(err, ConfigError::InvalidHeader { .. }));

		let ftp = Url::parse("ftp://portal.example.com").expect("FTP fixture should parse.");
		let err = ClientConfig::builder(ftp)
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));
	}

	#[test]
	fn from_json_fills_defaults_and_reports_paths() {
		let config = ClientConfig::from_json(
			r#"{"base_url":"https://portal.example.com/api","backoff":{"max_retries":5}}"#,
		)
		.expect("Minimal JSON document should load.");

		assert_eq!(config.backoff.max_retries, 5);
		assert_eq!(config.backoff.base_delay_ms, 300);
		assert_eq!(config.session, SessionConfig::default());

		let err = ClientConfig::from_json(
			r#"{"base_url":"https://portal.example.com","backoff":{"max_retries":"many"}}"#,
		)
		.expect_err("Non-numeric retry budgets should be rejected.");
		let ConfigError::Document { path, .. } = err else {
			panic!("Document errors should carry the field path, got {err:?}.");
		};

		assert_eq!(path, "backoff.max_retries");
	}
}
