//! Single-shot session renewal after a `401` on an authenticated endpoint.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	client::{backoff::RetryState, metrics::ClientMetrics},
	config::SessionConfig,
	error::{SessionFailure, TransportError},
	http::{ApiRequest, ApiResponse, HttpTransport},
	navigate::{self, Navigator},
	obs::{self, Outcome, Stage},
	store::{CredentialSlot, CredentialStore, TokenSecret},
};

/// Tokens returned by the renewal endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenewedTokens {
	pub(crate) access_token: TokenSecret,
	#[serde(default)]
	pub(crate) refresh_token: Option<TokenSecret>,
}

#[derive(Deserialize)]
struct Envelope<T> {
	data: T,
}

#[derive(Deserialize)]
struct TokenBundle {
	tokens: RenewedTokens,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenewalRequest<'a> {
	refresh_token: &'a str,
}

/// Renews the access token and ends the session when renewal is impossible.
///
/// Concurrent `401`s are funneled through one async mutex. A caller that acquires it after
/// another caller already stored a newer token replays with that token instead of issuing a
/// second renewal.
pub(crate) struct SessionCoordinator {
	config: SessionConfig,
	timeout: Option<Duration>,
	store: Arc<dyn CredentialStore>,
	navigator: Arc<dyn Navigator>,
	metrics: Arc<ClientMetrics>,
	singleflight: AsyncMutex<()>,
}
impl SessionCoordinator {
	pub(crate) fn new(
		config: SessionConfig,
		timeout: Option<Duration>,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
		metrics: Arc<ClientMetrics>,
	) -> Self {
		Self { config, timeout, store, navigator, metrics, singleflight: AsyncMutex::new(()) }
	}

	pub(crate) fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Recovers from a `401`; `Ok(())` means the original request should be replayed.
	///
	/// `sent` is the credential the rejected attempt carried. Callers must not invoke this again
	/// once `state.refresh_attempted` is set.
	pub(crate) async fn recover<T>(
		&self,
		transport: &T,
		state: &mut RetryState,
		sent: Option<&TokenSecret>,
	) -> Result<()>
	where
		T: ?Sized + HttpTransport,
	{
		state.refresh_attempted = true;

		let _singleflight = self.singleflight.lock().await;
		let pair = self.store.credentials()?;

		if pair.access_token.as_ref().is_some_and(|current| sent != Some(current)) {
			return Ok(());
		}

		let Some(refresh_token) = pair.refresh_token else {
			self.expire(&SessionFailure::MissingRefreshToken);

			return Err(SessionFailure::MissingRefreshToken.into());
		};

		self.metrics.record_renewal_attempt();
		obs::record_stage(Stage::Renewal, Outcome::Attempt);

		let renewed = self.renew(transport, &refresh_token).await.and_then(|tokens| {
			self.store.set(CredentialSlot::AccessToken, tokens.access_token)?;

			if let Some(rotated) = tokens.refresh_token {
				self.store.set(CredentialSlot::RefreshToken, rotated)?;
			}

			Ok(())
		});

		obs::renewal_finished(renewed.is_ok());

		match renewed {
			Ok(()) => {
				self.metrics.record_renewal_success();
				obs::record_stage(Stage::Renewal, Outcome::Success);

				Ok(())
			},
			Err(e) => {
				self.metrics.record_renewal_failure();
				obs::record_stage(Stage::Renewal, Outcome::Failure);

				if let Error::Unauthenticated { reason } = &e {
					self.expire(reason);
				}

				Err(e)
			},
		}
	}

	/// Clears stored credentials and sends the host to the login surface unless it is there.
	pub(crate) fn expire(&self, reason: &dyn Display) -> bool {
		if let Err(e) = self.store.clear() {
			obs::store_failure(&e);
		}

		let navigated = navigate::navigate_once(self.navigator.as_ref(), &self.config.login_path);

		self.metrics.record_session_expired();
		obs::session_expired(reason, navigated);

		navigated
	}

	// Timeouts and aborts pass through untouched so a slow renewal never ends the session.
	async fn renew<T>(&self, transport: &T, refresh_token: &TokenSecret) -> Result<RenewedTokens>
	where
		T: ?Sized + HttpTransport,
	{
		let mut request = ApiRequest::post(&self.config.refresh_path)
			.with_json(&RenewalRequest { refresh_token: refresh_token.expose() })?
			.with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		request.timeout = self.timeout;

		let response = match transport.execute(request).await {
			Ok(response) => response,
			Err(e @ (TransportError::Timeout | TransportError::Aborted)) => return Err(e.into()),
			Err(_) => return Err(SessionFailure::RenewalRejected { status: None }.into()),
		};

		if !response.status().is_success() {
			return Err(SessionFailure::RenewalRejected { status: Some(response.status()) }.into());
		}

		Ok(parse_renewal(&response)?)
	}
}
impl Debug for SessionCoordinator {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("SessionCoordinator")
			.field("config", &self.config)
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}

/// Extracts tokens from `{"data":{"tokens":{...}}}`, also accepting the doubly nested
/// `{"data":{"data":{"tokens":{...}}}}` shape some deployments emit.
pub(crate) fn parse_renewal(response: &ApiResponse) -> Result<RenewedTokens, SessionFailure> {
	let value: Value = serde_json::from_slice(response.body())
		.map_err(|e| SessionFailure::MalformedRenewal { detail: e.to_string() })?;
	let doubly_nested = value.get("data").and_then(|data| data.get("data")).is_some();
	let tokens = if doubly_nested {
		decode::<Envelope<Envelope<TokenBundle>>>(value)?.data.data.tokens
	} else {
		decode::<Envelope<TokenBundle>>(value)?.data.tokens
	};

	if tokens.access_token.expose().is_empty() {
		return Err(SessionFailure::MalformedRenewal {
			detail: "data.tokens.accessToken is empty".into(),
		});
	}

	Ok(tokens)
}

fn decode<T>(value: Value) -> Result<T, SessionFailure>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|e| SessionFailure::MalformedRenewal {
		detail: format!("{}: {}", e.path(), e.inner()),
	})
}
