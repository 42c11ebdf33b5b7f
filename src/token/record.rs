//! Stored credential records: single-use authorization codes, opaque refresh tokens, and
//! revocation entries keyed by token id.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, UserId},
	token::secret::TokenSecret,
};

/// Lifecycle status of a stored credential at a given instant.
///
/// Credentials are valid through their expiry instant and expired strictly after it, matching
/// the access-token `exp` rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Credential is currently redeemable.
	Active,
	/// Credential exceeded its expiry instant.
	Expired,
}

/// Single-use authorization code awaiting exchange.
///
/// The redirect URI is kept as the exact string presented during authorization; exchange
/// compares it byte-for-byte.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCodeRecord {
	/// The code value handed back to the client.
	pub code: TokenSecret,
	/// Client the code was minted for.
	pub client_id: ClientId,
	/// Resource owner who approved the grant, when one was present.
	pub user_id: Option<UserId>,
	/// Scopes approved for this grant.
	pub scope: ScopeSet,
	/// Redirect URI string bound to the code.
	pub redirect_uri: String,
	/// Instant the code was minted.
	pub issued_at: OffsetDateTime,
	/// Instant after which the code can no longer be exchanged.
	pub expires_at: OffsetDateTime,
}
impl AuthCodeRecord {
	/// Creates a code record bound to a client and redirect URI.
	pub fn new(
		code: TokenSecret,
		client_id: ClientId,
		scope: ScopeSet,
		redirect_uri: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			code,
			client_id,
			user_id: None,
			scope,
			redirect_uri: redirect_uri.into(),
			issued_at,
			expires_at,
		}
	}

	/// Attaches the approving resource owner.
	pub fn user(mut self, user: UserId) -> Self {
		self.user_id = Some(user);

		self
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		if instant > self.expires_at {
			return CredentialStatus::Expired;
		}

		CredentialStatus::Active
	}

	/// Returns `true` if the code can no longer be exchanged at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}
}
impl Debug for AuthCodeRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthCodeRecord")
			.field("code", &"<redacted>")
			.field("client_id", &self.client_id)
			.field("user_id", &self.user_id)
			.field("scope", &self.scope)
			.field("redirect_uri", &self.redirect_uri)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Long-lived opaque refresh token record.
///
/// The record carries the scope granted at issuance so refreshed access tokens can restate it
/// without consulting the client registration again.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
	/// The opaque token value.
	pub token: TokenSecret,
	/// Client the token was issued to.
	pub client_id: ClientId,
	/// Resource owner the token acts for, when one was present.
	pub user_id: Option<UserId>,
	/// Scopes granted at issuance.
	pub scope: ScopeSet,
	/// Instant the token was minted.
	pub issued_at: OffsetDateTime,
	/// Instant after which the token can no longer be redeemed.
	pub expires_at: OffsetDateTime,
}
impl RefreshTokenRecord {
	/// Creates a refresh token record bound to a client.
	pub fn new(
		token: TokenSecret,
		client_id: ClientId,
		scope: ScopeSet,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self { token, client_id, user_id: None, scope, issued_at, expires_at }
	}

	/// Attaches the resource owner the token acts for.
	pub fn user(mut self, user: UserId) -> Self {
		self.user_id = Some(user);

		self
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		if instant > self.expires_at {
			return CredentialStatus::Expired;
		}

		CredentialStatus::Active
	}

	/// Returns `true` if the token can no longer be redeemed at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}
}
impl Debug for RefreshTokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshTokenRecord")
			.field("token", &"<redacted>")
			.field("client_id", &self.client_id)
			.field("user_id", &self.user_id)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Revocation marker for an access token, retained until the token would have expired anyway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
	/// Token id (`jti` claim) of the revoked access token.
	pub jti: String,
	/// Expiry instant of the revoked token; the entry is dead weight afterwards.
	pub expires_at: OffsetDateTime,
}
impl RevocationEntry {
	/// Creates a revocation entry for a token id.
	pub fn new(jti: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { jti: jti.into(), expires_at }
	}

	/// Returns `true` once the revoked token would have expired on its own.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant > self.expires_at
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn code_record() -> AuthCodeRecord {
		AuthCodeRecord::new(
			TokenSecret::new("a".repeat(32)),
			ClientId::new("client-1").expect("Client fixture should be valid."),
			ScopeSet::new(["profile"]).expect("Scope fixture should be valid."),
			"https://app.test/callback",
			macros::datetime!(2026-01-01 00:00 UTC),
			macros::datetime!(2026-01-01 00:10 UTC),
		)
	}

	#[test]
	fn credentials_are_valid_through_their_expiry_instant() {
		let code = code_record();

		assert_eq!(
			code.status_at(macros::datetime!(2026-01-01 00:10 UTC)),
			CredentialStatus::Active
		);
		assert!(code.is_expired_at(macros::datetime!(2026-01-01 00:10:01 UTC)));

		let refresh = RefreshTokenRecord::new(
			TokenSecret::new("b".repeat(64)),
			ClientId::new("client-1").expect("Client fixture should be valid."),
			ScopeSet::default(),
			macros::datetime!(2026-01-01 00:00 UTC),
			macros::datetime!(2026-01-31 00:00 UTC),
		);

		assert!(!refresh.is_expired_at(macros::datetime!(2026-01-31 00:00 UTC)));
		assert!(refresh.is_expired_at(macros::datetime!(2026-01-31 00:00:01 UTC)));
	}

	#[test]
	fn user_attachment_is_preserved() {
		let user = UserId::new("user-7").expect("User fixture should be valid.");
		let code = code_record().user(user.clone());

		assert_eq!(code.user_id, Some(user));
	}

	#[test]
	fn debug_output_redacts_secret_values() {
		let rendered = format!("{:?}", code_record());

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains(&"a".repeat(32)));
	}

	#[test]
	fn revocation_entries_outlive_the_token_exactly() {
		let entry = RevocationEntry::new("jti-1", macros::datetime!(2026-01-01 01:00 UTC));

		assert!(!entry.is_expired_at(macros::datetime!(2026-01-01 01:00 UTC)));
		assert!(entry.is_expired_at(macros::datetime!(2026-01-01 01:00:01 UTC)));
	}
}
