//! Token issuance, validation, and revocation over a pluggable clock and store.

// crates.io
use rand::{Rng, RngCore, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, UserId},
	clock::Clock,
	error::TokenError,
	store::AuthStore,
	token::{
		claims::AccessClaims,
		jwt,
		record::{RefreshTokenRecord, RevocationEntry},
		secret::TokenSecret,
	},
};

/// Freshly minted access token together with the claims it encodes.
#[derive(Clone)]
pub struct IssuedAccessToken {
	/// Compact JWT handed to the client.
	pub token: String,
	/// Claims embedded in the token.
	pub claims: AccessClaims,
}
impl Debug for IssuedAccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedAccessToken")
			.field("token", &"<redacted>")
			.field("claims", &self.claims)
			.finish()
	}
}

/// Mints, validates, and revokes tokens for the authority.
///
/// Validation runs the checks in a fixed order: signature and shape first, then expiry against
/// the service clock, then the revocation set. Each failure maps to exactly one
/// [`TokenError`] variant so callers can distinguish them.
pub struct TokenService {
	secret: TokenSecret,
	issuer: String,
	access_ttl: Duration,
	refresh_ttl: Duration,
	store: Arc<dyn AuthStore>,
	clock: Arc<dyn Clock>,
}
impl TokenService {
	/// Creates a token service bound to a signing secret and issuer identity.
	pub fn new(
		secret: TokenSecret,
		issuer: impl Into<String>,
		access_ttl: Duration,
		refresh_ttl: Duration,
		store: Arc<dyn AuthStore>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self { secret, issuer: issuer.into(), access_ttl, refresh_ttl, store, clock }
	}

	/// Issuer written into every minted token.
	pub fn issuer(&self) -> &str {
		&self.issuer
	}

	/// Lifetime of minted access tokens.
	pub fn access_ttl(&self) -> Duration {
		self.access_ttl
	}

	/// Mints an HS256 access token for a client, optionally on behalf of a user.
	///
	/// The `sub` claim carries the user id when one is present and falls back to the client id
	/// for machine-only grants.
	pub fn issue_access_token(
		&self,
		client: &ClientId,
		user: Option<&UserId>,
		scope: &ScopeSet,
	) -> Result<IssuedAccessToken> {
		let now = self.clock.now();
		let claims = AccessClaims {
			iss: self.issuer.clone(),
			sub: user.map_or_else(|| client.to_string(), ToString::to_string),
			aud: client.to_string(),
			iat: now.unix_timestamp(),
			exp: (now + self.access_ttl).unix_timestamp(),
			jti: random_hex(16),
			client_id: client.clone(),
			scope: scope.to_string(),
			user_id: user.cloned(),
		};
		let token = jwt::encode(&claims, self.secret.expose().as_bytes()).map_err(Error::Token)?;

		Ok(IssuedAccessToken { token, claims })
	}

	/// Verifies a presented access token and returns its claims.
	pub async fn validate(&self, token: &str) -> Result<AccessClaims> {
		let claims =
			jwt::verify_and_decode(token, self.secret.expose().as_bytes()).map_err(Error::Token)?;
		let now = self.clock.now();

		if claims.is_expired_at(now) {
			return Err(TokenError::Expired.into());
		}
		if self.store.is_revoked(&claims.jti, now).await? {
			return Err(TokenError::Revoked.into());
		}

		Ok(claims)
	}

	/// Revokes a validly signed access token by recording its `jti` until expiry.
	///
	/// Returns the verified claims when an entry was recorded. Revoking an already-expired token
	/// is a no-op returning `None`, and revoking twice is idempotent.
	pub async fn revoke(&self, token: &str) -> Result<Option<AccessClaims>> {
		let claims =
			jwt::verify_and_decode(token, self.secret.expose().as_bytes()).map_err(Error::Token)?;
		let now = self.clock.now();

		if claims.is_expired_at(now) {
			return Ok(None);
		}

		let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
			.map_err(|_| Error::Token(TokenError::Malformed))?;

		self.store.put_revocation(RevocationEntry::new(claims.jti.clone(), expires_at), now).await?;

		Ok(Some(claims))
	}

	/// Mints and persists an opaque refresh token for a client.
	pub async fn issue_refresh_token(
		&self,
		client: &ClientId,
		user: Option<&UserId>,
		scope: &ScopeSet,
	) -> Result<RefreshTokenRecord> {
		let now = self.clock.now();
		let record = RefreshTokenRecord::new(
			TokenSecret::new(random_hex(32)),
			client.clone(),
			scope.clone(),
			now,
			now + self.refresh_ttl,
		);
		let record = match user {
			Some(user) => record.user(user.clone()),
			None => record,
		};

		self.store.put_refresh_token(record.clone()).await?;

		Ok(record)
	}
}
impl Debug for TokenService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenService")
			.field("secret", &"<redacted>")
			.field("issuer", &self.issuer)
			.field("access_ttl", &self.access_ttl)
			.field("refresh_ttl", &self.refresh_ttl)
			.finish()
	}
}

/// Uniform random alphanumeric string, used for authorization codes and generated ids.
pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

/// Hex encoding of `bytes` random bytes, used for `jti` values and opaque tokens.
pub(crate) fn random_hex(bytes: usize) -> String {
	let mut buffer = vec![0_u8; bytes];

	rand::rng().fill_bytes(&mut buffer);

	hex::encode(buffer)
}
