//! The portal client: classification, augmentation, backoff, renewal, and coalescing wired
//! into one pipeline.

mod augment;
mod backoff;
mod coalesce;
mod metrics;
mod session;

pub use backoff::{BackoffController, RetryState};
pub use coalesce::{CoalesceKey, RequestCoalescer, canonical_json};
pub use metrics::ClientMetrics;

// self
use crate::{
	_prelude::*,
	client::{
		augment::{Augmented, augment},
		session::SessionCoordinator,
	},
	config::ClientConfig,
	error::StatusError,
	http::{ApiRequest, ApiResponse, HttpTransport, MultipartForm, ReqwestTransport},
	navigate::{self, Navigator},
	obs::{self, CallSpan, Outcome},
	policy::{self, Classification},
	store::{CredentialPair, CredentialSlot, CredentialStore, TokenSecret},
};

/// Client backed by the default reqwest transport.
pub type ReqwestPortalClient = PortalClient<ReqwestTransport>;

/// Entry point for every portal API call.
///
/// Cloning is cheap; clones share the transport, the credential store, the renewal guard, and
/// the coalescing registry.
pub struct PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	inner: Arc<ClientInner<T>>,
}
impl PortalClient<ReqwestTransport> {
	/// Builds a client that talks to `config.base_url` through reqwest.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		let transport = ReqwestTransport::new(config.base_url.clone())?;

		Self::with_transport(config, transport, store, navigator)
	}
}
impl<T> PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a client over a caller-supplied transport.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		config.validate()?;

		let default_headers = config.header_map()?;
		let metrics = Arc::new(ClientMetrics::default());
		let mut session_config = config.session.clone();

		session_config.refresh_path =
			policy::normalize_path(&session_config.refresh_path, config.base_path()).path;

		let session = SessionCoordinator::new(
			session_config,
			config.timeout(),
			Arc::clone(&store),
			Arc::clone(&navigator),
			Arc::clone(&metrics),
		);
		let backoff = BackoffController::new(config.backoff);

		Ok(Self {
			inner: Arc::new(ClientInner {
				transport: transport.into(),
				store,
				navigator,
				default_headers,
				backoff,
				session,
				coalescer: RequestCoalescer::new(),
				metrics,
				config,
			}),
		})
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.inner.config
	}

	/// Recovery counters.
	pub fn metrics(&self) -> &ClientMetrics {
		&self.inner.metrics
	}

	/// Registry of in-flight coalesced POSTs.
	pub fn coalescer(&self) -> &RequestCoalescer {
		&self.inner.coalescer
	}

	/// Underlying transport.
	pub fn transport(&self) -> &T {
		&self.inner.transport
	}

	/// Classifies a raw path the same way outgoing requests are classified.
	pub fn classify(&self, method: &Method, path: &str) -> Classification {
		let normalized = policy::normalize_path(path, self.inner.config.base_path());

		self.inner.config.policy.classify(method, &normalized.path)
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::get(path)).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).with_json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::put(path).with_json(body)?).await
	}

	/// Sends a `PATCH` request with a JSON body.
	pub async fn patch<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::patch(path).with_json(body)?).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	/// Uploads a multipart form with `POST`; uploads are never coalesced.
	pub async fn upload(&self, path: impl Into<String>, form: MultipartForm) -> Result<ApiResponse> {
		self.send(ApiRequest::post(path).with_multipart(form)).await
	}

	/// Sends a request and decodes the JSON response body into `R`.
	pub async fn send_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: serde::de::DeserializeOwned,
	{
		self.send(request).await?.json()
	}

	/// Runs `request` through the full pipeline.
	///
	/// Identical concurrent POSTs (same method, normalized path, query, and body) share one
	/// network call and all observe its outcome. A `401` on an authenticated endpoint triggers
	/// at most one renewal; a `429` is retried with exponential backoff. Timeouts and aborts
	/// are surfaced immediately and never touch the session.
	pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		let normalized = policy::normalize_path(&request.path, self.inner.config.base_path());

		request.path = normalized.path;

		if !normalized.query.is_empty() {
			let mut query = normalized.query;

			query.append(&mut request.query);

			request.query = query;
		}

		let key = (self.inner.config.coalesce_posts && request.method == Method::POST)
			.then(|| CoalesceKey::for_request(&request))
			.flatten();

		match key {
			Some(key) => {
				let client = self.clone();

				self.inner
					.coalescer
					.run(key, move || async move { client.dispatch(request).await })
					.await
			},
			None => self.dispatch(request).await,
		}
	}

	/// Persists a freshly issued credential pair, plus the serialized user profile if given.
	pub fn sign_in(&self, pair: &CredentialPair, user: Option<&str>) -> Result<()> {
		self.inner.store.save_credentials(pair)?;

		match user {
			Some(user) => self.inner.store.set(CredentialSlot::User, TokenSecret::new(user))?,
			None => self.inner.store.remove(CredentialSlot::User)?,
		}

		Ok(())
	}

	/// Currently stored credentials.
	pub fn credentials(&self) -> Result<CredentialPair> {
		Ok(self.inner.store.credentials()?)
	}

	/// Clears stored credentials and navigates to the login surface unless already there.
	///
	/// Returns true if a navigation was issued.
	pub fn logout(&self) -> Result<bool> {
		self.inner.store.clear()?;

		Ok(navigate::navigate_once(
			self.inner.navigator.as_ref(),
			&self.inner.session.config().login_path,
		))
	}

	async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		let inner = &*self.inner;
		let classification = inner.config.policy.classify(&request.method, &request.path);
		let span = CallSpan::new(&request.method, &request.path, classification);

		span.instrument(async move {
			obs::record_call(classification, Outcome::Attempt);

			let result = inner.run(request, classification).await;

			obs::record_call(
				classification,
				if result.is_ok() { Outcome::Success } else { Outcome::Failure },
			);

			result
		})
		.await
	}
}
impl<T> Clone for PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner) }
	}
}
impl<T> Debug for PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("PortalClient")
			.field("base_url", &self.inner.config.base_url.as_str())
			.field("backoff", &self.inner.backoff)
			.field("session", &self.inner.session)
			.field("coalescer", &self.inner.coalescer)
			.finish_non_exhaustive()
	}
}

struct ClientInner<T>
where
	T: ?Sized + HttpTransport,
{
	config: ClientConfig,
	store: Arc<dyn CredentialStore>,
	navigator: Arc<dyn Navigator>,
	default_headers: HeaderMap,
	backoff: BackoffController,
	session: SessionCoordinator,
	coalescer: RequestCoalescer,
	metrics: Arc<ClientMetrics>,
	transport: Arc<T>,
}
impl<T> ClientInner<T>
where
	T: ?Sized + HttpTransport,
{
	async fn run(&self, request: ApiRequest, classification: Classification) -> Result<ApiResponse> {
		let mut state = RetryState::default();

		loop {
			let Augmented { request: outgoing, credential } = augment(
				request.clone(),
				classification,
				&self.default_headers,
				self.store.as_ref(),
				self.config.timeout(),
			);
			let response = self.transport.execute(outgoing).await?;
			let status = response.status();

			if status == StatusCode::TOO_MANY_REQUESTS {
				if self.backoff.wait(&mut state).await {
					self.metrics.record_rate_limit_retry();

					continue;
				}

				return Err(Error::RateLimited {
					path: request.path,
					attempts: state.attempts,
					retry_after: response.retry_after(),
					response,
				});
			}
			if status == StatusCode::UNAUTHORIZED && classification.handles_session_failure() {
				// The replay's own outcome is final; the caller gets its response untouched.
				if state.refresh_attempted {
					obs::replay_rejected();

					return Err(Error::Status(status_error(&request, classification, response)));
				}

				self.session
					.recover(self.transport.as_ref(), &mut state, credential.as_ref())
					.await?;

				continue;
			}
			if status == StatusCode::FORBIDDEN {
				let navigated = classification.handles_session_failure()
					&& navigate::navigate_once(
						self.navigator.as_ref(),
						&self.session.config().unauthorized_path,
					);

				obs::forbidden(navigated);

				return Err(Error::Forbidden(status_error(&request, classification, response)));
			}
			if status.is_server_error() {
				obs::server_error(status);

				return Err(Error::Server(status_error(&request, classification, response)));
			}
			if status.is_client_error() {
				return Err(Error::Status(status_error(&request, classification, response)));
			}

			return Ok(response);
		}
	}
}

fn status_error(
	request: &ApiRequest,
	classification: Classification,
	response: ApiResponse,
) -> StatusError {
	StatusError::new(request.method.clone(), &request.path, classification, response)
}
