//! Client registrations: secret hashing, grant allow-lists, and the registry facade.

// crates.io
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet},
	store::AuthStore,
};

/// Lifecycle status of a registered client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
	/// Client may authorize and exchange tokens.
	Active,
	/// Client is blocked from every flow until reactivated.
	Suspended,
}

/// OAuth grant families the service understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization-code exchange.
	AuthorizationCode,
	/// Refresh-token redemption.
	RefreshToken,
	/// Direct client-credentials issuance.
	ClientCredentials,
}
impl GrantType {
	/// Parses the wire-format grant name; returns `None` for anything unrecognized.
	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"authorization_code" => Some(Self::AuthorizationCode),
			"refresh_token" => Some(Self::RefreshToken),
			"client_credentials" => Some(Self::ClientCredentials),
			_ => None,
		}
	}

	/// Wire-format grant name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::AuthorizationCode => "authorization_code",
			Self::RefreshToken => "refresh_token",
			Self::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Set of grants a client is allowed to use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantSet(BTreeSet<GrantType>);
impl GrantSet {
	/// Allows every grant the service understands.
	pub fn all() -> Self {
		Self(
			[GrantType::AuthorizationCode, GrantType::RefreshToken, GrantType::ClientCredentials]
				.into(),
		)
	}

	/// Allows exactly the provided grants.
	pub fn only(grants: impl IntoIterator<Item = GrantType>) -> Self {
		Self(grants.into_iter().collect())
	}

	/// Returns `true` if the grant is on the allow-list.
	pub fn allows(&self, grant: GrantType) -> bool {
		self.0.contains(&grant)
	}
}
impl Default for GrantSet {
	fn default() -> Self {
		Self::all()
	}
}

/// Registered OAuth client.
///
/// Only a SHA-256 digest of the secret is retained; the plaintext never leaves
/// [`ClientRecord::new`]. The redirect URI is normalized once at registration and compared
/// byte-for-byte afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
	/// Public client identifier.
	pub client_id: ClientId,
	/// Hex-encoded SHA-256 digest of the client secret.
	pub secret_hash: String,
	/// Registered redirect URI.
	pub redirect_uri: Url,
	/// Default scopes granted on client-credentials issuance.
	pub scope: ScopeSet,
	/// Lifecycle status.
	pub status: ClientStatus,
	/// Grants this client may use.
	pub allowed_grants: GrantSet,
	/// Registration instant.
	pub created_at: OffsetDateTime,
}
impl ClientRecord {
	/// Registers a client, digesting the plaintext secret immediately.
	pub fn new(
		client_id: ClientId,
		secret: &str,
		redirect_uri: Url,
		created_at: OffsetDateTime,
	) -> Self {
		Self {
			client_id,
			secret_hash: hash_secret(secret),
			redirect_uri,
			scope: ScopeSet::default(),
			status: ClientStatus::Active,
			allowed_grants: GrantSet::default(),
			created_at,
		}
	}

	/// Sets the default scopes for client-credentials issuance.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Restricts the client to the provided grants.
	pub fn grants(mut self, grants: GrantSet) -> Self {
		self.allowed_grants = grants;

		self
	}

	/// Overrides the lifecycle status.
	pub fn status(mut self, status: ClientStatus) -> Self {
		self.status = status;

		self
	}

	/// Compares a presented secret against the stored digest in constant time.
	pub fn verify_secret(&self, presented: &str) -> bool {
		let presented = hash_secret(presented);

		bool::from(presented.as_bytes().ct_eq(self.secret_hash.as_bytes()))
	}

	/// Returns `true` if the presented redirect URI equals the registered one byte-for-byte.
	pub fn matches_redirect(&self, presented: &str) -> bool {
		self.redirect_uri.as_str() == presented
	}

	/// Returns `true` if the client may use the grant.
	pub fn allows(&self, grant: GrantType) -> bool {
		self.allowed_grants.allows(grant)
	}

	/// Returns `true` if the client is active.
	pub fn is_active(&self) -> bool {
		matches!(self.status, ClientStatus::Active)
	}
}
impl Debug for ClientRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientRecord")
			.field("client_id", &self.client_id)
			.field("secret_hash", &"<redacted>")
			.field("redirect_uri", &self.redirect_uri.as_str())
			.field("scope", &self.scope)
			.field("status", &self.status)
			.field("allowed_grants", &self.allowed_grants)
			.field("created_at", &self.created_at)
			.finish()
	}
}

/// Store-backed facade for client lookup and authentication.
#[derive(Clone)]
pub struct ClientRegistry {
	store: Arc<dyn AuthStore>,
}
impl ClientRegistry {
	/// Creates a registry over the provided store.
	pub fn new(store: Arc<dyn AuthStore>) -> Self {
		Self { store }
	}

	/// Persists or replaces a client registration.
	pub async fn register(&self, record: ClientRecord) -> Result<()> {
		Ok(self.store.put_client(record).await?)
	}

	/// Fetches a client registration, if present.
	pub async fn get(&self, client: &ClientId) -> Result<Option<ClientRecord>> {
		Ok(self.store.client(client).await?)
	}

	/// Updates a client's lifecycle status; returns `false` if the client is unknown.
	pub async fn set_status(&self, client: &ClientId, status: ClientStatus) -> Result<bool> {
		Ok(self.store.set_client_status(client, status).await?)
	}

	/// Authenticates a client secret, then requires the client to be active.
	///
	/// The secret is checked before the status so an unauthenticated caller learns nothing
	/// about suspension.
	pub async fn authenticate(&self, client: &ClientId, secret: &str) -> Result<ClientRecord> {
		let record = self
			.store
			.client(client)
			.await?
			.ok_or_else(|| Error::InvalidClient { reason: "unknown client".into() })?;

		if !record.verify_secret(secret) {
			return Err(Error::InvalidClient { reason: "client secret mismatch".into() });
		}
		if !record.is_active() {
			return Err(Error::InvalidClient { reason: "client is suspended".into() });
		}

		Ok(record)
	}

	/// Fetches a client and requires it to be active, without checking any secret.
	pub async fn require_active(&self, client: &ClientId) -> Result<ClientRecord> {
		let record = self
			.store
			.client(client)
			.await?
			.ok_or_else(|| Error::InvalidClient { reason: "unknown client".into() })?;

		if !record.is_active() {
			return Err(Error::InvalidClient { reason: "client is suspended".into() });
		}

		Ok(record)
	}
}

fn hash_secret(secret: &str) -> String {
	hex::encode(Sha256::digest(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record() -> ClientRecord {
		ClientRecord::new(
			ClientId::new("client-1").expect("Client fixture should be valid."),
			"hunter2",
			Url::parse("https://app.test/callback").expect("Redirect fixture should parse."),
			macros::datetime!(2026-01-01 00:00 UTC),
		)
	}

	#[test]
	fn secret_is_stored_as_a_digest_and_verified_in_constant_time() {
		let record = record();

		assert_ne!(record.secret_hash, "hunter2");
		assert_eq!(record.secret_hash.len(), 64);
		assert!(record.verify_secret("hunter2"));
		assert!(!record.verify_secret("hunter3"));
	}

	#[test]
	fn redirect_comparison_is_byte_exact() {
		let record = record();

		assert!(record.matches_redirect("https://app.test/callback"));
		assert!(!record.matches_redirect("https://app.test/callback/"));
		assert!(!record.matches_redirect("https://app.test/other"));
	}

	#[test]
	fn grant_allow_list_defaults_to_everything() {
		let record = record();

		assert!(record.allows(GrantType::AuthorizationCode));
		assert!(record.allows(GrantType::RefreshToken));
		assert!(record.allows(GrantType::ClientCredentials));

		let restricted = record.grants(GrantSet::only([GrantType::ClientCredentials]));

		assert!(!restricted.allows(GrantType::AuthorizationCode));
		assert!(restricted.allows(GrantType::ClientCredentials));
	}

	#[test]
	fn grant_type_parses_its_wire_names() {
		assert_eq!(GrantType::parse("authorization_code"), Some(GrantType::AuthorizationCode));
		assert_eq!(GrantType::parse("refresh_token"), Some(GrantType::RefreshToken));
		assert_eq!(GrantType::parse("client_credentials"), Some(GrantType::ClientCredentials));
		assert_eq!(GrantType::parse("password"), None);
		assert_eq!(GrantType::AuthorizationCode.to_string(), "authorization_code");
	}

	#[test]
	fn debug_output_redacts_the_secret_digest() {
		let record = record();
		let rendered = format!("{record:?}");

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains(&record.secret_hash));
	}
}
