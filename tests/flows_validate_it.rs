// self
use oauth2_authority::{
	_preludet::*,
	audit::{AuditKind, AuditSink},
	auth::{ClientId, ScopeSet},
	client::ClientRecord,
	error::TokenError,
	flows::{TokenRequest, TokenTypeHint},
};

const CLIENT_ID: &str = "client-validate";
const CLIENT_SECRET: &str = "secret-validate";
const REDIRECT: &str = "https://app.test/callback";

fn client_id() -> ClientId {
	ClientId::new(CLIENT_ID).expect("Client identifier fixture should be valid.")
}

/// Registers a scoped client and mints one access token through the machine grant.
async fn mint_access_token(fixture: &TestAuthority) -> String {
	let redirect = Url::parse(REDIRECT).expect("Redirect fixture should parse successfully.");
	let scope = ScopeSet::new(["introspect"]).expect("Scope fixture should be valid.");
	let record = ClientRecord::new(client_id(), CLIENT_SECRET, redirect, TEST_EPOCH).scope(scope);

	fixture
		.authority
		.clients()
		.register(record)
		.await
		.expect("Client registration fixture should succeed.");

	fixture
		.authority
		.exchange(TokenRequest::client_credentials(client_id(), CLIENT_SECRET))
		.await
		.expect("Client credentials exchange should succeed.")
		.access_token
}

#[tokio::test]
async fn minted_tokens_validate_with_their_request_identity() {
	let fixture = build_test_authority();
	let token = mint_access_token(&fixture).await;

	assert_eq!(token.split('.').count(), 3);

	let validated = fixture
		.authority
		.validate_token(&token)
		.await
		.expect("Freshly minted token should validate.");

	assert_eq!(validated.client_id, client_id());
	assert_eq!(validated.user_id, None);
	assert_eq!(validated.scope, "introspect");
	assert_eq!(validated.expires_at, TEST_EPOCH + Duration::hours(1));
}

#[tokio::test]
async fn tokens_expire_strictly_after_their_exp_instant() {
	let fixture = build_test_authority();
	let token = mint_access_token(&fixture).await;

	fixture.clock.advance(Duration::hours(1));

	fixture
		.authority
		.validate_token(&token)
		.await
		.expect("A token should validate at its exact expiry instant.");

	fixture.clock.advance(Duration::seconds(1));

	let err = fixture
		.authority
		.validate_token(&token)
		.await
		.expect_err("A token one second past expiry should be rejected.");

	assert!(matches!(err, Error::Token(TokenError::Expired)));

	let events = fixture.audit.recent(5).await.expect("Audit sink should return recent events.");
	let failure = events
		.iter()
		.find(|event| event.kind == AuditKind::TokenValidationFailed)
		.expect("The failed validation should be audited.");

	assert_eq!(failure.subject, "access_token");
	assert!(failure.detail.as_deref().is_some_and(|detail| detail.contains("expired")));
}

#[tokio::test]
async fn revoked_tokens_fail_validation_until_their_natural_expiry() {
	let fixture = build_test_authority();
	let token = mint_access_token(&fixture).await;

	fixture
		.authority
		.revoke_token(&token, TokenTypeHint::AccessToken)
		.await
		.expect("Revocation should succeed.");

	let err = fixture
		.authority
		.validate_token(&token)
		.await
		.expect_err("A revoked token should fail validation.");

	assert!(matches!(err, Error::Token(TokenError::Revoked)));

	// Revoking twice does not disturb the outcome.
	fixture
		.authority
		.revoke_token(&token, TokenTypeHint::AccessToken)
		.await
		.expect("Revoking twice should remain a success.");

	let events = fixture.audit.recent(10).await.expect("Audit sink should return recent events.");
	let revoked = events
		.iter()
		.find(|event| event.kind == AuditKind::TokenRevoked)
		.expect("The revocation should be audited.");

	assert_eq!(revoked.subject, CLIENT_ID);
	assert!(revoked.detail.as_deref().is_some_and(|detail| detail.contains("jti")));

	// Once the token lapses on its own, expiry wins over revocation.
	fixture.clock.advance(Duration::hours(2));

	let err = fixture
		.authority
		.validate_token(&token)
		.await
		.expect_err("An expired token should report expiry.");

	assert!(matches!(err, Error::Token(TokenError::Expired)));
}

#[tokio::test]
async fn tampered_payloads_and_truncated_tokens_are_rejected() {
	let fixture = build_test_authority();
	let token = mint_access_token(&fixture).await;
	let segments: Vec<_> = token.split('.').collect();

	// Swap in the payload of a different token; the signature no longer covers it.
	let other = mint_access_token(&fixture).await;
	let other_payload = other.split('.').nth(1).expect("Token should have a payload segment.");
	let forged = format!("{}.{}.{}", segments[0], other_payload, segments[2]);
	let err = fixture
		.authority
		.validate_token(&forged)
		.await
		.expect_err("A token with a swapped payload should be rejected.");

	assert!(matches!(err, Error::Token(TokenError::InvalidSignature)));

	let err = fixture
		.authority
		.validate_token(&format!("{}.{}", segments[0], segments[1]))
		.await
		.expect_err("A two-segment token should be rejected.");

	assert!(matches!(err, Error::Token(TokenError::Malformed)));
}

#[tokio::test]
async fn the_revocation_hint_is_authoritative() {
	let fixture = build_test_authority();
	let token = mint_access_token(&fixture).await;

	// An access token presented under the refresh hint matches no record and changes nothing.
	fixture
		.authority
		.revoke_token(&token, TokenTypeHint::RefreshToken)
		.await
		.expect("A hint miss should be a quiet no-op.");

	fixture
		.authority
		.validate_token(&token)
		.await
		.expect("The access token should still validate after the hint miss.");
}
