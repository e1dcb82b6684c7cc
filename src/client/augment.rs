//! Request-phase credential policy.

// self
use crate::{
	_prelude::*,
	http::{ApiRequest, RequestBody},
	obs,
	policy::Classification,
	store::{CredentialSlot, CredentialStore, TokenSecret},
};

/// Outgoing request after augmentation, plus the credential it carries.
#[derive(Debug)]
pub(crate) struct Augmented {
	pub(crate) request: ApiRequest,
	pub(crate) credential: Option<TokenSecret>,
}

/// Applies default headers, content type, timeout, and the bearer credential policy.
///
/// PUBLIC requests never leave with an `Authorization` header, even when the defaults carry
/// one. Other requests carry exactly the stored access token, or no credential at all. Store
/// failures degrade to "no credential"; this stage never fails.
pub(crate) fn augment(
	mut request: ApiRequest,
	classification: Classification,
	defaults: &HeaderMap,
	store: &dyn CredentialStore,
	default_timeout: Option<Duration>,
) -> Augmented {
	let mut headers = defaults.clone();

	headers.extend(std::mem::take(&mut request.headers));

	match &request.body {
		RequestBody::Json(_) if !headers.contains_key(CONTENT_TYPE) => {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		},
		RequestBody::Multipart(_) => {
			headers.remove(CONTENT_TYPE);
		},
		_ => {},
	}

	let credential = if classification.attaches_credential() {
		store.get(CredentialSlot::AccessToken).unwrap_or_else(|e| {
			obs::store_failure(&e);

			None
		})
	} else {
		None
	};
	let header = credential.as_ref().and_then(TokenSecret::bearer_header);

	headers.remove(AUTHORIZATION);

	if let Some(value) = header {
		headers.insert(AUTHORIZATION, value);
	}

	obs::classified(classification, credential.is_some());

	request.headers = headers;
	request.timeout = request.timeout.or(default_timeout);

	Augmented { request, credential }
}
