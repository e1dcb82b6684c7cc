mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use tokio::time::Instant;
// self
use common::*;
use portal_http::{
	error::Error,
	http::ApiResponse,
	navigate::MemoryNavigator,
	reqwest::{
		StatusCode,
		header::{HeaderMap, HeaderValue, RETRY_AFTER},
	},
	store::MemoryStore,
};

fn rate_limited(retry_after: Option<&'static str>) -> ApiResponse {
	let mut headers = HeaderMap::new();

	if let Some(value) = retry_after {
		headers.insert(RETRY_AFTER, HeaderValue::from_static(value));
	}

	ApiResponse::new(StatusCode::TOO_MANY_REQUESTS, headers, Vec::new())
}

fn assert_waited(started: Instant, expected: Duration) {
	let elapsed = started.elapsed();

	assert!(
		elapsed >= expected && elapsed < expected + Duration::from_millis(50),
		"Expected roughly {expected:?} of backoff, observed {elapsed:?}."
	);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_requests_retry_with_doubling_delays() {
	let transport = Arc::new(ScriptedTransport::new());
	let store = MemoryStore::with_tokens("access-1", "refresh-1");
	let navigator = MemoryNavigator::default();
	let client = scripted_client(
		config_builder().build().expect("Default configuration should validate."),
		&transport,
		&store,
		&navigator,
	);

	transport
		.status(StatusCode::TOO_MANY_REQUESTS)
		.status(StatusCode::TOO_MANY_REQUESTS)
		.status(StatusCode::TOO_MANY_REQUESTS)
		.status(StatusCode::OK);

	let started = Instant::now();
	let response = client.get("/inspections").await.expect("Fourth attempt should succeed.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_waited(started, Duration::from_millis(600 + 1_200 + 2_400));
	assert_eq!(transport.calls(), 4);
	assert_eq!(client.metrics().rate_limit_retries(), 3);
	assert!(
		transport.requests().iter().all(|request| request.bearer_token() == Some("access-1")),
		"Every retry should be re-augmented with the stored token."
	);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_final_rate_limit() {
	let transport = Arc::new(ScriptedTransport::new());
	let store = MemoryStore::with_tokens("access-1", "refresh-1");
	let navigator = MemoryNavigator::default();
	let client = scripted_client(
		config_builder().build().expect("Default configuration should validate."),
		&transport,
		&store,
		&navigator,
	);

	for _ in 0..3 {
		transport.respond(rate_limited(None));
	}

	transport.respond(rate_limited(Some("120")));

	let started = Instant::now();
	let err = client.get("/inspections").await.expect_err("Rate limit should persist.");
	let Error::RateLimited { path, attempts, retry_after, response } = err else {
		panic!("Expected a rate-limit error, got {err:?}.");
	};

	assert_eq!(path, "/inspections");
	assert_eq!(attempts, 3);
	assert_eq!(retry_after, Some(Duration::from_secs(120)));
	assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
	assert_eq!(transport.calls(), 4);
	assert_waited(started, Duration::from_millis(4_200));
	assert!(navigator.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn retry_budget_and_base_delay_are_configurable() {
	let transport = Arc::new(ScriptedTransport::new());
	let store = MemoryStore::default();
	let navigator = MemoryNavigator::default();
	let config = config_builder()
		.max_retries(1)
		.base_delay(Duration::from_millis(50))
		.build()
		.expect("Custom backoff configuration should validate.");
	let client = scripted_client(config, &transport, &store, &navigator);

	transport.status(StatusCode::TOO_MANY_REQUESTS).status(StatusCode::TOO_MANY_REQUESTS);

	let started = Instant::now();
	let err = client.get("/sites").await.expect_err("Single retry should be exhausted.");

	assert!(matches!(err, Error::RateLimited { attempts: 1, .. }));
	assert_waited(started, Duration::from_millis(100));
	assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn public_endpoints_back_off_too() {
	let transport = Arc::new(ScriptedTransport::new());
	let store = MemoryStore::default();
	let navigator = MemoryNavigator::default();
	let client = scripted_client(
		config_builder().build().expect("Default configuration should validate."),
		&transport,
		&store,
		&navigator,
	);

	transport.status(StatusCode::TOO_MANY_REQUESTS).status(StatusCode::CREATED);

	let response = client
		.post("/auth/resend-otp", &serde_json::json!({ "email": "ops@example.com" }))
		.await
		.expect("Second attempt should succeed.");

	assert_eq!(response.status(), StatusCode::CREATED);
	assert_eq!(transport.calls(), 2);
}
