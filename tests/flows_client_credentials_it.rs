// self
use oauth2_authority::{
	_preludet::*,
	audit::{AuditKind, AuditSink},
	auth::{ClientId, ScopeSet},
	client::{ClientRecord, ClientStatus, GrantSet, GrantType},
	flows::TokenRequest,
};

const CLIENT_ID: &str = "client-machine";
const CLIENT_SECRET: &str = "secret-machine";
const REDIRECT: &str = "https://app.test/callback";

fn client_id() -> ClientId {
	ClientId::new(CLIENT_ID).expect("Client identifier fixture should be valid.")
}

async fn register_service_client(fixture: &TestAuthority) {
	let redirect = Url::parse(REDIRECT).expect("Redirect fixture should parse successfully.");
	let scope =
		ScopeSet::new(["service.read", "service.write"]).expect("Scope fixture should be valid.");
	let record = ClientRecord::new(client_id(), CLIENT_SECRET, redirect, TEST_EPOCH).scope(scope);

	fixture
		.authority
		.clients()
		.register(record)
		.await
		.expect("Client registration fixture should succeed.");
}

#[tokio::test]
async fn client_credentials_mint_a_user_less_access_token() {
	let fixture = build_test_authority();

	register_service_client(&fixture).await;

	let response = fixture
		.authority
		.exchange(TokenRequest::client_credentials(client_id(), CLIENT_SECRET))
		.await
		.expect("Client credentials exchange should succeed.");

	assert_eq!(response.token_type, "Bearer");
	assert_eq!(response.expires_in, 3_600);
	assert_eq!(response.scope, "service.read service.write");
	assert!(response.refresh_token.is_none(), "Machine grants must not mint a refresh token.");

	let claims = fixture
		.authority
		.tokens()
		.validate(&response.access_token)
		.await
		.expect("Freshly minted access token should verify.");

	assert_eq!(claims.iss, TEST_ISSUER);
	assert_eq!(claims.sub, CLIENT_ID);
	assert_eq!(claims.aud, CLIENT_ID);
	assert_eq!(claims.user_id, None);
	assert_eq!(claims.exp - claims.iat, 3_600);

	let events = fixture.audit.recent(5).await.expect("Audit sink should return recent events.");
	let issued = events
		.iter()
		.find(|event| event.kind == AuditKind::TokenIssued)
		.expect("Token issuance should be audited.");

	assert_eq!(issued.subject, CLIENT_ID);
	assert!(issued.detail.as_deref().is_some_and(|detail| detail.contains("client_credentials")));
}

#[tokio::test]
async fn bad_secrets_fail_before_grant_inspection() {
	let fixture = build_test_authority();

	register_service_client(&fixture).await;

	// The nonsense grant name never gets a look: authentication fails first.
	let err = fixture
		.authority
		.exchange(TokenRequest::client_credentials(client_id(), "wrong").grant_type("made-up"))
		.await
		.expect_err("A bad secret should fail authentication.");

	assert!(matches!(err, Error::InvalidClient { .. }));

	let events = fixture.audit.recent(5).await.expect("Audit sink should return recent events.");
	let failure = events
		.iter()
		.find(|event| event.kind == AuditKind::ClientAuthFailed)
		.expect("Failed client authentication should be audited.");

	assert_eq!(failure.subject, CLIENT_ID);
}

#[tokio::test]
async fn unrecognized_grant_names_are_refused() {
	let fixture = build_test_authority();

	register_service_client(&fixture).await;

	let err = fixture
		.authority
		.exchange(TokenRequest::client_credentials(client_id(), CLIENT_SECRET).grant_type("password"))
		.await
		.expect_err("An unknown grant name should be refused.");

	assert!(matches!(err, Error::UnsupportedGrantType { ref grant_type } if grant_type == "password"));
}

#[tokio::test]
async fn grants_outside_the_allow_list_are_refused() {
	let fixture = build_test_authority();
	let redirect = Url::parse(REDIRECT).expect("Redirect fixture should parse successfully.");
	let record = ClientRecord::new(client_id(), CLIENT_SECRET, redirect, TEST_EPOCH)
		.grants(GrantSet::only([GrantType::AuthorizationCode]));

	fixture
		.authority
		.clients()
		.register(record)
		.await
		.expect("Client registration fixture should succeed.");

	let err = fixture
		.authority
		.exchange(TokenRequest::client_credentials(client_id(), CLIENT_SECRET))
		.await
		.expect_err("A grant outside the client's allow-list should be refused.");

	assert!(matches!(
		err,
		Error::UnsupportedGrantType { ref grant_type } if grant_type == "client_credentials"
	));
}

#[tokio::test]
async fn suspension_is_reversible() {
	let fixture = build_test_authority();

	register_service_client(&fixture).await;

	fixture
		.authority
		.clients()
		.set_status(&client_id(), ClientStatus::Suspended)
		.await
		.expect("Status update should succeed.");

	let err = fixture
		.authority
		.exchange(TokenRequest::client_credentials(client_id(), CLIENT_SECRET))
		.await
		.expect_err("A suspended client should be refused.");

	assert!(matches!(err, Error::InvalidClient { .. }));

	fixture
		.authority
		.clients()
		.set_status(&client_id(), ClientStatus::Active)
		.await
		.expect("Status update should succeed.");

	fixture
		.authority
		.exchange(TokenRequest::client_credentials(client_id(), CLIENT_SECRET))
		.await
		.expect("A reactivated client should exchange again.");
}
