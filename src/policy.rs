//! Endpoint classification: which authentication policy applies to a request.
//!
//! Paths are normalized once with [`normalize_path`] at the client boundary, then
//! [`EndpointPolicy::classify`] tests them against two rule sets. Membership in a set is an
//! `any` test, so rule order never matters; the PUBLIC set wins over OPTIONAL_AUTH and
//! everything unmatched is AUTHENTICATED.

pub mod rule;

pub use rule::*;

// std
use std::borrow::Cow;
// self
use crate::_prelude::*;

/// Authentication policy bucket assigned to a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
	/// Never carries a credential; never triggers session handling.
	Public,
	/// Carries a credential when one exists; never triggers session handling.
	OptionalAuth,
	/// Carries a credential when one exists; a `401` runs renewal and logout handling.
	Authenticated,
}
impl Classification {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Classification::Public => "public",
			Classification::OptionalAuth => "optional_auth",
			Classification::Authenticated => "authenticated",
		}
	}

	/// Returns true if a stored access token may be attached.
	pub const fn attaches_credential(self) -> bool {
		!matches!(self, Classification::Public)
	}

	/// Returns true if `401`/`403` responses may cause session side effects.
	pub const fn handles_session_failure(self) -> bool {
		matches!(self, Classification::Authenticated)
	}
}
impl Display for Classification {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable rule sets used to classify requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPolicy {
	/// Rules that mark a request PUBLIC.
	#[serde(default)]
	pub public: Vec<EndpointRule>,
	/// Rules that mark a request OPTIONAL_AUTH.
	#[serde(default)]
	pub optional_auth: Vec<EndpointRule>,
}
impl EndpointPolicy {
	/// Creates a policy with no rules; every request is AUTHENTICATED.
	pub fn empty() -> Self {
		Self { public: Vec::new(), optional_auth: Vec::new() }
	}

	/// Rule sets used by the portal API.
	pub fn portal_default() -> Self {
		let public = [
			"/auth/forgot-password",
			"/auth/verify-otp",
			"/auth/resend-otp",
			"/auth/reset-password",
			"/payments/webhook",
			"/payments/callback",
		]
		.into_iter()
		.map(EndpointRule::contains)
		.chain(["/auth/login", "/auth/refresh-token"].into_iter().map(EndpointRule::suffix))
		.chain([EndpointRule::exact("/contact-messages").for_method(Method::POST)])
		.collect();
		let optional_auth =
			["/chatbot", "/chat-sessions"].into_iter().map(EndpointRule::contains).collect();

		Self { public, optional_auth }
	}

	/// Adds a PUBLIC rule.
	pub fn with_public(mut self, rule: EndpointRule) -> Self {
		self.public.push(rule);

		self
	}

	/// Adds an OPTIONAL_AUTH rule.
	pub fn with_optional_auth(mut self, rule: EndpointRule) -> Self {
		self.optional_auth.push(rule);

		self
	}

	/// Classifies a request. Never fails.
	pub fn classify(&self, method: &Method, path: &str) -> Classification {
		let path: Cow<str> =
			if path.starts_with('/') { Cow::Borrowed(path) } else { Cow::Owned(format!("/{path}")) };

		if self.public.iter().any(|rule| rule.matches(method, &path)) {
			Classification::Public
		} else if self.optional_auth.iter().any(|rule| rule.matches(method, &path)) {
			Classification::OptionalAuth
		} else {
			Classification::Authenticated
		}
	}
}
impl Default for EndpointPolicy {
	fn default() -> Self {
		Self::portal_default()
	}
}

/// Path split into its normalized form and decoded query pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedPath {
	/// Path relative to the API base, with a leading `/` and no trailing `/`.
	pub path: String,
	/// Query pairs found in the raw input.
	pub query: Vec<(String, String)>,
}

/// Normalizes a caller-supplied path or absolute URL relative to the API base path.
///
/// Absolute URLs lose their origin, the base path prefix (e.g. `/api`) is stripped, a leading
/// `/` is ensured, and trailing slashes are dropped except for the root.
pub fn normalize_path(raw: &str, base_path: &str) -> NormalizedPath {
	let raw = raw.trim();
	let relative = match Url::parse(raw) {
		Ok(url) if url.has_host() => match url.query() {
			Some(query) => format!("{}?{query}", url.path()),
			None => url.path().to_owned(),
		},
		_ => raw.to_owned(),
	};
	let relative = relative.split_once('#').map_or(relative.as_str(), |(head, _)| head);
	let (path_part, query_part) = match relative.split_once('?') {
		Some((path, query)) => (path, Some(query)),
		None => (relative, None),
	};
	let mut path =
		if path_part.starts_with('/') { path_part.to_owned() } else { format!("/{path_part}") };
	let base = base_path.trim_end_matches('/');

	if !base.is_empty() {
		if path == base {
			path = "/".into();
		} else if let Some(rest) = path.strip_prefix(base).filter(|rest| rest.starts_with('/')) {
			path = rest.to_owned();
		}
	}
	while path.len() > 1 && path.ends_with('/') {
		path.pop();
	}

	let query = query_part
		.map(|query| url::form_urlencoded::parse(query.as_bytes()).into_owned().collect())
		.unwrap_or_default();

	NormalizedPath { path, query }
}
