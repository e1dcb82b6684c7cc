//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{collections::VecDeque, sync::Arc, time::Duration};
// crates.io
use httpmock::MockServer;
use parking_lot::Mutex;
// self
use portal_http::{
	client::PortalClient,
	config::{ClientConfig, ClientConfigBuilder},
	error::TransportError,
	http::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportFuture},
	navigate::MemoryNavigator,
	reqwest::{self, StatusCode},
	store::{CredentialSlot, CredentialStore, MemoryStore},
	url::Url,
};

pub const BASE_URL: &str = "https://portal.example.com/api";

/// Transport that replays a script of responses and records every request it receives.
///
/// Once the script runs out it answers `200 OK` with an empty body.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
	script: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
	requests: Mutex<Vec<ApiRequest>>,
	delay: Option<Duration>,
}
impl ScriptedTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Delays every response, keeping calls in flight long enough to overlap.
	pub fn with_delay(delay: Duration) -> Self {
		Self { delay: Some(delay), ..Self::default() }
	}

	pub fn respond(&self, response: ApiResponse) -> &Self {
		self.script.lock().push_back(Ok(response));

		self
	}

	pub fn status(&self, status: StatusCode) -> &Self {
		self.respond(ApiResponse::empty(status))
	}

	pub fn fail(&self, error: TransportError) -> &Self {
		self.script.lock().push_back(Err(error));

		self
	}

	pub fn requests(&self) -> Vec<ApiRequest> {
		self.requests.lock().clone()
	}

	pub fn calls(&self) -> usize {
		self.requests.lock().len()
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			self.requests.lock().push(request);

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			let next = self.script.lock().pop_front();

			next.unwrap_or_else(|| Ok(ApiResponse::empty(StatusCode::OK)))
		})
	}
}

pub fn config_builder() -> ClientConfigBuilder {
	ClientConfig::builder(Url::parse(BASE_URL).expect("Base URL fixture should parse."))
}

pub fn scripted_client(
	config: ClientConfig,
	transport: &Arc<ScriptedTransport>,
	store: &MemoryStore,
	navigator: &MemoryNavigator,
) -> PortalClient<ScriptedTransport> {
	PortalClient::with_transport(
		config,
		Arc::clone(transport),
		Arc::new(store.clone()),
		Arc::new(navigator.clone()),
	)
	.expect("Scripted client should build.")
}

pub fn mock_client(
	server: &MockServer,
	store: &MemoryStore,
	navigator: &MemoryNavigator,
) -> PortalClient<ReqwestTransport> {
	let base = Url::parse(&server.url("/api")).expect("Mock server URL should parse.");
	let config = ClientConfig::builder(base.clone())
		.timeout(Duration::from_secs(5))
		.build()
		.expect("Mock client configuration should validate.");
	let http = reqwest::Client::builder()
		.no_proxy()
		.build()
		.expect("Failed to build reqwest client for tests.");

	PortalClient::with_transport(
		config,
		ReqwestTransport::with_client(http, base),
		Arc::new(store.clone()),
		Arc::new(navigator.clone()),
	)
	.expect("Mock client should build.")
}

pub fn access_token(store: &MemoryStore) -> Option<String> {
	store
		.get(CredentialSlot::AccessToken)
		.expect("Reading the memory store should succeed.")
		.map(|token| token.expose().to_owned())
}

pub fn refresh_token(store: &MemoryStore) -> Option<String> {
	store
		.get(CredentialSlot::RefreshToken)
		.expect("Reading the memory store should succeed.")
		.map(|token| token.expose().to_owned())
}
