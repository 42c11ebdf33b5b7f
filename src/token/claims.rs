//! Access token claims as they appear on the wire.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, UserId},
};

/// Claims embedded in an access token payload.
///
/// Field order matches the serialized order; integrations parse these names verbatim, so the
/// struct is the wire contract. `scope` uses the space-delimited string form and `user_id` is
/// omitted entirely for client-only tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
	/// Issuer configured on the authority.
	pub iss: String,
	/// Subject: the user when present, otherwise the client.
	pub sub: String,
	/// Audience: always the client the token was minted for.
	pub aud: String,
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, seconds since the Unix epoch.
	pub exp: i64,
	/// 128-bit random token identifier, hex-encoded; the revocation set keys on it.
	pub jti: String,
	/// Client the token was minted for.
	pub client_id: ClientId,
	/// Space-delimited scope string.
	pub scope: String,
	/// End user the token acts for, when the grant carried one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<UserId>,
}
impl AccessClaims {
	/// Returns true once `exp` is strictly in the past at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.exp < instant.unix_timestamp()
	}
}
