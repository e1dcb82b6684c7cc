//! Endpoint rules matched against normalized request paths.

// self
use crate::_prelude::*;

/// How a rule's pattern is compared with a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchKind {
	/// Path equals the pattern.
	Exact,
	/// Path ends with the pattern.
	Suffix,
	/// Path contains the pattern anywhere.
	Contains,
}
impl MatchKind {
	/// Returns true if `path` satisfies `pattern` under this match kind.
	pub fn matches(self, pattern: &str, path: &str) -> bool {
		match self {
			MatchKind::Exact => path == pattern,
			MatchKind::Suffix => path.ends_with(pattern),
			MatchKind::Contains => path.contains(pattern),
		}
	}
}

/// Single classification rule with an optional method constraint.
///
/// An [`Exact`](MatchKind::Exact) rule only covers the collection endpoint itself, so scoped
/// sub-resources such as `/contact-messages/{id}/reply` never inherit its status.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRule {
	/// Comparison applied to the pattern.
	pub kind: MatchKind,
	/// Path fragment to compare against.
	pub pattern: String,
	/// Upper-case method the rule is restricted to, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
}
impl EndpointRule {
	/// Creates a rule with the given kind and pattern.
	pub fn new(kind: MatchKind, pattern: impl Into<String>) -> Self {
		Self { kind, pattern: pattern.into(), method: None }
	}

	/// Creates an [`Exact`](MatchKind::Exact) rule.
	pub fn exact(pattern: impl Into<String>) -> Self {
		Self::new(MatchKind::Exact, pattern)
	}

	/// Creates a [`Suffix`](MatchKind::Suffix) rule.
	pub fn suffix(pattern: impl Into<String>) -> Self {
		Self::new(MatchKind::Suffix, pattern)
	}

	/// Creates a [`Contains`](MatchKind::Contains) rule.
	pub fn contains(pattern: impl Into<String>) -> Self {
		Self::new(MatchKind::Contains, pattern)
	}

	/// Restricts the rule to a single method.
	pub fn for_method(mut self, method: Method) -> Self {
		self.method = Some(method.as_str().to_ascii_uppercase());

		self
	}

	/// Returns true if the rule covers the method + normalized path pair.
	pub fn matches(&self, method: &Method, path: &str) -> bool {
		let method_ok = self
			.method
			.as_deref()
			.is_none_or(|constraint| constraint.eq_ignore_ascii_case(method.as_str()));

		method_ok && self.kind.matches(&self.pattern, path)
	}
}
