//! High-level authority flows behind the [`Authority`] facade.
//!
//! The facade wires the client registry, token service, rate-limit policy, audit sink, and
//! clock together so the individual flows can focus on grant-specific logic. Every public
//! entry point records an audit event for security-relevant outcomes and fails closed when the
//! rate-limit policy errors.

pub mod authorize;
pub mod exchange;

pub use authorize::*;
pub use exchange::*;

// self
use crate::{
	_prelude::*,
	audit::{self, AuditEvent, AuditKind, AuditSink},
	auth::{ClientId, UserId},
	client::ClientRegistry,
	clock::Clock,
	config::{AuthorityConfig, ConfigError},
	error::TokenError,
	guard::{RateAction, RateDecision, RateLimitPolicy, SlidingWindowLimiter},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::AuthStore,
	token::TokenService,
};

/// Token family named by the caller when revoking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenTypeHint {
	/// The presented value is a signed access token.
	AccessToken,
	/// The presented value is an opaque refresh token.
	RefreshToken,
}

/// Public introspection view of a validated access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidatedToken {
	/// Client the token was issued to.
	pub client_id: ClientId,
	/// Resource owner the token acts for, when one was present.
	pub user_id: Option<UserId>,
	/// Space-joined scope granted to the token.
	pub scope: String,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}

/// Coordinates authorization, exchange, validation, and revocation over shared backends.
pub struct Authority {
	store: Arc<dyn AuthStore>,
	clients: ClientRegistry,
	tokens: TokenService,
	limiter: Arc<dyn RateLimitPolicy>,
	audit: Arc<dyn AuditSink>,
	clock: Arc<dyn Clock>,
	auth_code_ttl: Duration,
}
impl Authority {
	/// Builds an authority with the in-process sliding-window limiter.
	pub fn new(
		config: AuthorityConfig,
		store: Arc<dyn AuthStore>,
		audit: Arc<dyn AuditSink>,
		clock: Arc<dyn Clock>,
	) -> Result<Self, ConfigError> {
		let limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limits, clock.clone()));

		Self::with_rate_limit_policy(config, store, audit, clock, limiter)
	}

	/// Builds an authority that consults a caller-provided rate-limit policy.
	pub fn with_rate_limit_policy(
		config: AuthorityConfig,
		store: Arc<dyn AuthStore>,
		audit: Arc<dyn AuditSink>,
		clock: Arc<dyn Clock>,
		limiter: Arc<dyn RateLimitPolicy>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let clients = ClientRegistry::new(store.clone());
		let tokens = TokenService::new(
			config.jwt_secret,
			config.issuer,
			config.access_token_ttl,
			config.refresh_token_ttl,
			store.clone(),
			clock.clone(),
		);

		Ok(Self {
			store,
			clients,
			tokens,
			limiter,
			audit,
			clock,
			auth_code_ttl: config.auth_code_ttl,
		})
	}

	/// Client registry backing this authority.
	pub fn clients(&self) -> &ClientRegistry {
		&self.clients
	}

	/// Token service minting and verifying this authority's tokens.
	pub fn tokens(&self) -> &TokenService {
		&self.tokens
	}

	/// Audit sink receiving this authority's events.
	pub fn audit(&self) -> &dyn AuditSink {
		self.audit.as_ref()
	}

	/// Verifies an access token and returns its public introspection view.
	pub async fn validate_token(&self, token: &str) -> Result<ValidatedToken> {
		const KIND: FlowKind = FlowKind::Validate;

		let span = FlowSpan::new(KIND, "validate_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<ValidatedToken> = span
			.instrument(async move {
				let claims = self.tokens.validate(token).await?;
				let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
					.map_err(|_| Error::Token(TokenError::Malformed))?;

				Ok(ValidatedToken {
					client_id: claims.client_id,
					user_id: claims.user_id,
					scope: claims.scope,
					expires_at,
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(error) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				let event =
					AuditEvent::new(AuditKind::TokenValidationFailed, "access_token", self.clock.now())
						.detail(error.to_string());

				audit::record_event(self.audit.as_ref(), event).await;
			},
		}

		result
	}

	/// Revokes a token, dispatching on the caller-supplied hint.
	///
	/// Both paths are idempotent: revoking an already-expired access token or an unknown
	/// refresh token succeeds without effect. The hint is authoritative; there is no fallback
	/// to the other family.
	pub async fn revoke_token(&self, token: &str, hint: TokenTypeHint) -> Result<()> {
		const KIND: FlowKind = FlowKind::Revoke;

		let span = FlowSpan::new(KIND, "revoke_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				match hint {
					TokenTypeHint::AccessToken =>
						if let Some(claims) = self.tokens.revoke(token).await? {
							let event = AuditEvent::new(
								AuditKind::TokenRevoked,
								claims.client_id.as_ref(),
								self.clock.now(),
							)
							.detail(format!("jti `{}`", claims.jti));

							audit::record_event(self.audit.as_ref(), event).await;
						},
					TokenTypeHint::RefreshToken =>
						if let Some(record) = self.store.refresh_token(token).await? {
							self.store.delete_refresh_token(token).await?;

							let event = AuditEvent::new(
								AuditKind::TokenRevoked,
								record.client_id.as_ref(),
								self.clock.now(),
							)
							.detail("refresh token deleted");

							audit::record_event(self.audit.as_ref(), event).await;
						},
				}

				Ok(())
			})
			.await;

		match &result {
			Ok(()) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Consults the rate-limit policy and converts a denial into an error.
	///
	/// A policy failure denies the request too; the limit is never bypassed.
	pub(crate) async fn enforce_rate_limit(
		&self,
		identifier: &str,
		action: RateAction,
	) -> Result<()> {
		match self.limiter.check(identifier, action).await? {
			RateDecision::Allow => Ok(()),
			RateDecision::Deny(directive) => {
				let detail = directive
					.reason
					.clone()
					.unwrap_or_else(|| format!("{action} quota exhausted"));
				let event =
					AuditEvent::new(AuditKind::RateLimitTripped, identifier, self.clock.now())
						.detail(detail);

				audit::record_event(self.audit.as_ref(), event).await;

				Err(Error::RateLimitExceeded(directive))
			},
		}
	}
}
impl Debug for Authority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authority")
			.field("issuer", &self.tokens.issuer())
			.field("auth_code_ttl", &self.auth_code_ttl)
			.finish()
	}
}
