//! Walks through a portal session against a mock API: an expired access token is renewed
//! transparently, identical form submissions share one call, and the credentials survive in a
//! file-backed store.
//!
//! Set `RUST_LOG=portal_http=debug` to watch the pipeline's tracing events.

// std
use std::{env, sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;
// self
use portal_http::{
	client::PortalClient,
	config::ClientConfig,
	http::ApiRequest,
	navigate::MemoryNavigator,
	store::{CredentialPair, CredentialStore, FileStore},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/dashboard").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/dashboard").header("authorization", "Bearer fresh");
			then.status(200).json_body(json!({ "data": { "openIncidents": 4 } }));
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh-token");
			then.status(200).json_body(json!({
				"data": { "tokens": { "accessToken": "fresh", "refreshToken": "refresh-2" } }
			}));
		})
		.await;
	let contact = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/contact-messages");
			then.status(201).delay(Duration::from_millis(200));
		})
		.await;
	let store_path = env::temp_dir().join("portal_http_demo").join("session.json");
	let store = Arc::new(FileStore::open(&store_path)?);
	let navigator = MemoryNavigator::at("/admin/dashboard");
	let config = ClientConfig::builder(Url::parse(&server.url("/api"))?).build()?;
	let client = PortalClient::new(config, store.clone(), Arc::new(navigator.clone()))?;

	client.sign_in(&CredentialPair::new("stale", "refresh-1"), Some(r#"{"name":"Demo"}"#))?;

	let dashboard: serde_json::Value =
		client.send_json(ApiRequest::get("/admin/dashboard")).await?;

	println!("Open incidents: {}.", dashboard["data"]["openIncidents"]);

	let message = json!({ "name": "Visitor", "message": "Please call me back." });
	let (first, second) = tokio::join!(
		client.post("/contact-messages", &message),
		client.post("/contact-messages", &message)
	);

	println!("Contact form answered {} and {}.", first?.status(), second?.status());
	println!(
		"Stored refresh token rotated: {}.",
		store.credentials()?.refresh_token.is_some_and(|token| token.expose() == "refresh-2")
	);
	println!("Credentials persisted at {}.", store.path().display());

	stale.assert_async().await;
	fresh.assert_async().await;
	renewal.assert_async().await;
	contact.assert_async().await;

	client.logout()?;

	println!("Navigation history after logout: {:?}.", navigator.history());

	Ok(())
}
