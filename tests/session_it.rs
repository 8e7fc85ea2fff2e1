#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use common::{REDIRECT_URI, TOKEN_PATH};
use kroger_connect::{
	auth::{TokenKind, TokenRecord},
	error::Error,
	provider::kroger,
	session::ReqwestSession,
	store::TokenStore,
};

fn stored_user_token(session: &ReqwestSession, expires_in: Duration) -> TokenRecord {
	let mut record = stored_access_only(session, expires_in);

	record.refresh_token = Some("stored-refresh".into());

	record
}

fn stored_access_only(session: &ReqwestSession, expires_in: Duration) -> TokenRecord {
	let issued_at = OffsetDateTime::now_utc() - Duration::hours(1);

	TokenRecord::builder(session.broker().family(TokenKind::User), kroger::user_scope())
		.access_token("stored-access")
		.issued_at(issued_at)
		.expires_at(issued_at + expires_in)
		.build()
		.expect("Stored token fixture should build.")
}

#[tokio::test]
async fn app_token_is_cached_until_invalidated() {
	let server = MockServer::start_async().await;
	let (session, _store) = common::session(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(common::token_body("app-access", None, 1800));
		})
		.await;

	session.app_token().await.expect("First app token should be fetched.");
	session.app_token().await.expect("Second app token should come from cache.");
	mock.assert_calls_async(1).await;

	session.invalidate_app_token();
	session.app_token().await.expect("App token should be fetched again.");
	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn user_token_requires_authentication_when_nothing_is_stored() {
	let server = MockServer::start_async().await;
	let (session, _store) = common::session(&server);
	let err = session.user_token().await.expect_err("Empty store should require sign-in.");

	assert!(matches!(err, Error::AuthenticationRequired));
}

#[tokio::test]
async fn stored_user_token_is_used_without_network() {
	let server = MockServer::start_async().await;
	let (session, store) = common::session(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500);
		})
		.await;

	store
		.save(stored_user_token(&session, Duration::hours(3)))
		.await
		.expect("Seeding should succeed.");

	let token = session.user_token().await.expect("Stored token should be used.");

	mock.assert_calls_async(0).await;

	assert_eq!(token.access_token.expose(), "stored-access");
}

#[tokio::test]
async fn expiring_user_token_without_refresh_token_is_still_used() {
	let server = MockServer::start_async().await;
	let (session, store) = common::session(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500);
		})
		.await;

	store
		.save(stored_access_only(&session, Duration::hours(1) + Duration::seconds(20)))
		.await
		.expect("Seeding should succeed.");

	let token = session.user_token().await.expect("Unexpired token should be used.");

	mock.assert_calls_async(0).await;

	assert_eq!(token.access_token.expose(), "stored-access");
	assert!(token.refresh_token.is_none());
}

#[tokio::test]
async fn expired_user_token_without_refresh_token_requires_authentication() {
	let server = MockServer::start_async().await;
	let (session, store) = common::session(&server);

	store
		.save(stored_access_only(&session, Duration::minutes(30)))
		.await
		.expect("Seeding should succeed.");

	let err = session.user_token().await.expect_err("Expired token should not be used.");

	assert!(matches!(err, Error::AuthenticationRequired));
}

#[tokio::test]
async fn lapsed_user_token_is_refreshed() {
	let server = MockServer::start_async().await;
	let (session, store) = common::session(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(common::token_body("refreshed-access", Some("next-refresh"), 1800));
		})
		.await;

	store
		.save(stored_user_token(&session, Duration::minutes(30)))
		.await
		.expect("Seeding should succeed.");

	let token = session.user_token().await.expect("Lapsed token should refresh.");

	assert_eq!(token.access_token.expose(), "refreshed-access");

	session.user_token().await.expect("Refreshed token should be cached.");
	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_refresh_requires_authentication() {
	let server = MockServer::start_async().await;
	let (session, store) = common::session(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_grant"}"#);
		})
		.await;

	store
		.save(stored_user_token(&session, Duration::minutes(30)))
		.await
		.expect("Seeding should succeed.");

	let err = session.user_token().await.expect_err("Rejected refresh should fail.");

	mock.assert_async().await;

	assert!(matches!(err, Error::AuthenticationRequired));

	let err = session.user_token().await.expect_err("Revoked token should not be retried.");

	assert!(matches!(err, Error::AuthenticationRequired));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn completed_authentication_feeds_user_token() {
	let server = MockServer::start_async().await;
	let (session, _store) = common::session(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(common::token_body("signed-in", Some("signed-in-refresh"), 1800));
		})
		.await;
	let auth = session.start_authentication().expect("Authentication should start.");

	assert_eq!(auth.redirect_uri.as_str(), REDIRECT_URI);

	let callback = format!("{REDIRECT_URI}?code=fresh-code&state={}", auth.state);

	session.complete_authentication(auth, &callback).await.expect("Sign-in should complete.");

	let token = session.user_token().await.expect("User token should be available.");

	mock.assert_calls_async(1).await;

	assert_eq!(token.access_token.expose(), "signed-in");
	assert_eq!(session.zip_code(), "90274");

	session.invalidate_user_token();

	let token = session.user_token().await.expect("Stored token should be reloaded.");

	assert_eq!(token.access_token.expose(), "signed-in");

	mock.assert_calls_async(1).await;
}
