//! Helpers shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
use serde_json::json;
// self
use kroger_connect::{
	auth::ProviderId,
	config::KrogerConfig,
	flows::{ReqwestBroker, TokenBroker},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::{ClientAuthMethod, GrantType, ProviderDescriptor},
	reqwest::Client,
	session::ReqwestSession,
	store::{MemoryStore, TokenStore},
	url::Url,
};

pub const CLIENT_ID: &str = "kroger-it-client";
pub const CLIENT_SECRET: &str = "kroger-it-secret";
pub const REDIRECT_URI: &str = "http://localhost:8000/callback";

/// Reqwest transport that trusts the self-signed certificate `httpmock` serves.
pub fn http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Insecure test client should build.");

	ReqwestHttpClient::with_client(client)
}

/// HTTPS URL on the mock server.
pub fn https_url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path).replacen("http://", "https://", 1))
		.expect("Mock server URL should parse.")
}

/// Kroger-shaped descriptor pointing at the mock server.
pub fn descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::builder(ProviderId::new("kroger-mock").expect("Provider id should be valid."))
		.authorization_endpoint(https_url(server, "/v1/connect/oauth2/authorize"))
		.token_endpoint(https_url(server, "/v1/connect/oauth2/token"))
		.support_grants(GrantType::ALL)
		.client_auth_method(ClientAuthMethod::ClientSecretBasic)
		.build()
		.expect("Mock descriptor should validate.")
}

/// Broker over an in-memory store.
pub fn broker(server: &MockServer) -> (ReqwestBroker, Arc<MemoryStore>) {
	let memory = Arc::new(MemoryStore::default());
	let store: Arc<dyn TokenStore> = memory.clone();
	let broker = TokenBroker::with_http_client(
		store,
		descriptor(server),
		CLIENT_ID,
		http_client(),
		ReqwestTransportErrorMapper,
	)
	.with_client_secret(CLIENT_SECRET);

	(broker, memory)
}

/// Session over [`broker`].
pub fn session(server: &MockServer) -> (ReqwestSession, Arc<MemoryStore>) {
	let (broker, store) = broker(server);
	let config = KrogerConfig::builder(CLIENT_ID, CLIENT_SECRET, REDIRECT_URI)
		.build()
		.expect("Test configuration should validate.");

	(ReqwestSession::with_broker(broker, config), store)
}

/// Token endpoint success body.
pub fn token_body(access: &str, refresh: Option<&str>, expires_in: i64) -> String {
	let mut body = json!({
		"access_token": access,
		"token_type": "bearer",
		"expires_in": expires_in,
	});

	if let Some(refresh) = refresh {
		body["refresh_token"] = json!(refresh);
	}

	body.to_string()
}

pub const TOKEN_PATH: &str = "/v1/connect/oauth2/token";
