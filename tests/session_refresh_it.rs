mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;
use portal_http::{
	error::{Error, SessionFailure, TransportError},
	http::ApiRequest,
	navigate::MemoryNavigator,
	reqwest::StatusCode,
	store::MemoryStore,
};

#[tokio::test]
async fn expired_token_is_renewed_once_and_the_request_replayed() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/users").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/users").header("authorization", "Bearer fresh");
			then.status(200).json_body(json!({ "data": [{ "id": 1 }] }));
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/refresh-token")
				.json_body(json!({ "refreshToken": "refresh-1" }));
			then.status(200).json_body(json!({ "data": { "tokens": { "accessToken": "fresh" } } }));
		})
		.await;
	let store = MemoryStore::with_tokens("stale", "refresh-1");
	let navigator = MemoryNavigator::at("/admin/users");
	let client = mock_client(&server, &store, &navigator);
	let users: serde_json::Value = client
		.send_json(ApiRequest::get("/admin/users"))
		.await
		.expect("Replayed request should succeed.");

	assert_eq!(users["data"][0]["id"], 1);
	rejected.assert_calls_async(1).await;
	renewal.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
	assert_eq!(access_token(&store).as_deref(), Some("fresh"));
	assert_eq!(refresh_token(&store).as_deref(), Some("refresh-1"));
	assert!(navigator.history().is_empty());
	assert_eq!(client.metrics().renewal_attempts(), 1);
	assert_eq!(client.metrics().renewal_successes(), 1);
}

#[tokio::test]
async fn rotated_refresh_tokens_from_nested_envelopes_are_stored() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/sites").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/sites").header("authorization", "Bearer fresh");
			then.status(200);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(200).json_body(json!({
				"data": { "data": { "tokens": { "accessToken": "fresh", "refreshToken": "refresh-2" } } }
			}));
		})
		.await;

	let store = MemoryStore::with_tokens("stale", "refresh-1");
	let navigator = MemoryNavigator::default();
	let client = mock_client(&server, &store, &navigator);

	client.get("/sites").await.expect("Replayed request should succeed.");

	assert_eq!(access_token(&store).as_deref(), Some("fresh"));
	assert_eq!(refresh_token(&store).as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn missing_refresh_token_ends_the_session() {
	let server = MockServer::start_async().await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(200);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/dashboard");
			then.status(401);
		})
		.await;

	let store = MemoryStore::with_tokens("stale", "unused");
	let navigator = MemoryNavigator::at("/admin/dashboard");
	let client = mock_client(&server, &store, &navigator);

	client
		.sign_in(
			&portal_http::store::CredentialPair {
				access_token: Some("stale".into()),
				refresh_token: None,
			},
			Some(r#"{"id":7}"#),
		)
		.expect("Seeding credentials should succeed.");

	let err = client.get("/admin/dashboard").await.expect_err("Session should end.");

	assert!(matches!(err, Error::Unauthenticated { reason: SessionFailure::MissingRefreshToken }));
	renewal.assert_calls_async(0).await;
	assert!(store.is_empty());
	assert_eq!(navigator.history(), vec!["/login".to_owned()]);
	assert_eq!(client.metrics().sessions_expired(), 1);
}

#[tokio::test]
async fn rejected_renewal_clears_credentials_and_navigates_to_login() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/incidents");
			then.status(401);
		})
		.await;

	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(400).json_body(json!({ "message": "Refresh token expired" }));
		})
		.await;
	let store = MemoryStore::with_tokens("stale", "refresh-1");
	let navigator = MemoryNavigator::at("/incidents");
	let client = mock_client(&server, &store, &navigator);
	let err = client.get("/incidents").await.expect_err("Renewal failure should surface.");

	assert!(matches!(
		err,
		Error::Unauthenticated {
			reason: SessionFailure::RenewalRejected { status: Some(StatusCode::BAD_REQUEST) }
		}
	));
	renewal.assert_calls_async(1).await;
	assert!(store.is_empty());
	assert_eq!(navigator.history(), vec!["/login".to_owned()]);
	assert_eq!(client.metrics().renewal_failures(), 1);
}

#[tokio::test]
async fn malformed_renewal_response_ends_the_session() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/incidents");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(200).json_body(json!({ "data": { "token": "fresh" } }));
		})
		.await;

	let store = MemoryStore::with_tokens("stale", "refresh-1");
	let navigator = MemoryNavigator::default();
	let client = mock_client(&server, &store, &navigator);
	let err = client.get("/incidents").await.expect_err("Malformed renewal should surface.");

	assert!(matches!(
		err,
		Error::Unauthenticated { reason: SessionFailure::MalformedRenewal { .. } }
	));
	assert!(store.is_empty());
	assert_eq!(navigator.history(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn second_rejection_after_replay_is_returned_as_is() {
	let server = MockServer::start_async().await;
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/permits");
			then.status(401)
				.header("x-request-id", "replay-7")
				.json_body(json!({ "message": "account disabled" }));
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(200).json_body(json!({ "data": { "tokens": { "accessToken": "fresh" } } }));
		})
		.await;
	let store = MemoryStore::with_tokens("stale", "refresh-1");
	let navigator = MemoryNavigator::default();
	let client = mock_client(&server, &store, &navigator);
	let err = client.get("/permits").await.expect_err("Replay rejection should surface.");

	let Error::Status(status) = err else {
		panic!("Replay rejection should carry the replay's response, got {err:?}.");
	};

	assert_eq!(status.status, StatusCode::UNAUTHORIZED);
	assert_eq!(status.path, "/permits");
	assert!(status.response.text().contains("account disabled"));
	assert_eq!(
		status.response.headers().get("x-request-id").and_then(|value| value.to_str().ok()),
		Some("replay-7")
	);
	protected.assert_calls_async(2).await;
	renewal.assert_calls_async(1).await;
	assert_eq!(access_token(&store).as_deref(), Some("fresh"));
	assert!(navigator.history().is_empty());
}

#[tokio::test]
async fn concurrent_rejections_share_a_single_renewal() {
	let server = MockServer::start_async().await;

	for path in ["/api/sites", "/api/audits"] {
		server
			.mock_async(|when, then| {
				when.method(GET).path(path).header("authorization", "Bearer stale");
				then.status(401);
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path(path).header("authorization", "Bearer fresh");
				then.status(200);
			})
			.await;
	}

	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(200)
				.delay(Duration::from_millis(100))
				.json_body(json!({ "data": { "tokens": { "accessToken": "fresh" } } }));
		})
		.await;
	let store = MemoryStore::with_tokens("stale", "refresh-1");
	let navigator = MemoryNavigator::default();
	let client = mock_client(&server, &store, &navigator);
	let (sites, audits) = tokio::join!(client.get("/sites"), client.get("/audits"));

	sites.expect("Sites request should succeed after renewal.");
	audits.expect("Audits request should succeed after renewal.");
	renewal.assert_calls_async(1).await;
	assert_eq!(client.metrics().renewal_attempts(), 1);
}

#[tokio::test]
async fn already_on_login_does_not_navigate_again() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile");
			then.status(401);
		})
		.await;

	let store = MemoryStore::default();
	let navigator = MemoryNavigator::at("/login");
	let client = mock_client(&server, &store, &navigator);
	let err = client.get("/profile").await.expect_err("Unauthenticated call should fail.");

	assert!(matches!(err, Error::Unauthenticated { reason: SessionFailure::MissingRefreshToken }));
	assert!(navigator.history().is_empty());
}

#[tokio::test]
async fn public_rejections_never_trigger_renewal() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(401).json_body(json!({ "message": "Invalid credentials" }));
		})
		.await;

	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(200);
		})
		.await;
	let store = MemoryStore::with_tokens("access-1", "refresh-1");
	let navigator = MemoryNavigator::at("/login");
	let client = mock_client(&server, &store, &navigator);
	let err = client
		.post("/auth/login", &json!({ "email": "ops@example.com", "password": "wrong" }))
		.await
		.expect_err("Bad credentials should surface.");
	let Error::Status(status) = err else {
		panic!("Expected a plain status error, got {err:?}.");
	};

	assert_eq!(status.status, StatusCode::UNAUTHORIZED);
	assert!(status.response.text().contains("Invalid credentials"));
	renewal.assert_calls_async(0).await;
	assert_eq!(access_token(&store).as_deref(), Some("access-1"));
}

#[tokio::test]
async fn timeouts_leave_the_session_untouched() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/reports/export");
			then.status(200).delay(Duration::from_secs(2));
		})
		.await;

	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(200);
		})
		.await;
	let store = MemoryStore::with_tokens("access-1", "refresh-1");
	let navigator = MemoryNavigator::at("/reports");
	let client = mock_client(&server, &store, &navigator);
	let err = client
		.send(ApiRequest::get("/reports/export").with_timeout(Duration::from_millis(100)))
		.await
		.expect_err("Slow responses should time out.");

	assert!(matches!(err, Error::Transport(TransportError::Timeout)));
	assert!(err.is_timeout_or_abort());
	renewal.assert_calls_async(0).await;
	assert_eq!(access_token(&store).as_deref(), Some("access-1"));
	assert!(navigator.history().is_empty());
}

#[tokio::test]
async fn aborted_transports_never_renew() {
	let transport = Arc::new(ScriptedTransport::new());
	let store = MemoryStore::with_tokens("access-1", "refresh-1");
	let navigator = MemoryNavigator::default();
	let client = scripted_client(
		config_builder().build().expect("Default configuration should validate."),
		&transport,
		&store,
		&navigator,
	);

	transport.fail(TransportError::Aborted);

	let err = client.get("/incidents").await.expect_err("Aborted calls should fail.");

	assert!(matches!(err, Error::Transport(TransportError::Aborted)));
	assert_eq!(transport.calls(), 1);
	assert_eq!(client.metrics().renewal_attempts(), 0);
	assert_eq!(refresh_token(&store).as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn logout_clears_credentials_and_navigates_once() {
	let transport = Arc::new(ScriptedTransport::new());
	let store = MemoryStore::with_tokens("access-1", "refresh-1");
	let navigator = MemoryNavigator::at("/admin/dashboard");
	let client = scripted_client(
		config_builder().build().expect("Default configuration should validate."),
		&transport,
		&store,
		&navigator,
	);

	assert!(client.logout().expect("Logout should succeed."));
	assert!(!client.logout().expect("Second logout should succeed."));
	assert!(store.is_empty());
	assert_eq!(navigator.history(), vec!["/login".to_owned()]);
	assert_eq!(transport.calls(), 0);
}
