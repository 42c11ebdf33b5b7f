//! Token exchange across the supported grant types.

// self
use crate::{
	_prelude::*,
	audit::{self, AuditEvent, AuditKind},
	auth::{ClientId, ScopeSet, UserId},
	client::{ClientRecord, GrantType},
	flows::Authority,
	guard::RateAction,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::ClaimOutcome,
	token::TokenSecret,
};

/// Token-endpoint request.
///
/// The grant type is carried as the raw wire string so unsupported values surface as
/// [`Error::UnsupportedGrantType`] instead of failing to construct a request at all.
#[derive(Clone)]
pub struct TokenRequest {
	/// Wire-format grant name, such as `authorization_code`.
	pub grant_type: String,
	/// Client presenting the request.
	pub client_id: ClientId,
	/// Client secret, verified before any grant-specific work.
	pub client_secret: String,
	/// Authorization code, for the `authorization_code` grant.
	pub code: Option<String>,
	/// Redirect URI restated for the `authorization_code` grant.
	pub redirect_uri: Option<String>,
	/// Refresh token, for the `refresh_token` grant.
	pub refresh_token: Option<String>,
}
impl TokenRequest {
	/// Creates an `authorization_code` exchange request.
	pub fn authorization_code(
		client_id: ClientId,
		client_secret: impl Into<String>,
		code: impl Into<String>,
		redirect_uri: impl Into<String>,
	) -> Self {
		Self {
			grant_type: GrantType::AuthorizationCode.as_str().into(),
			client_id,
			client_secret: client_secret.into(),
			code: Some(code.into()),
			redirect_uri: Some(redirect_uri.into()),
			refresh_token: None,
		}
	}

	/// Creates a `refresh_token` redemption request.
	pub fn refresh_token(
		client_id: ClientId,
		client_secret: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Self {
		Self {
			grant_type: GrantType::RefreshToken.as_str().into(),
			client_id,
			client_secret: client_secret.into(),
			code: None,
			redirect_uri: None,
			refresh_token: Some(refresh_token.into()),
		}
	}

	/// Creates a `client_credentials` issuance request.
	pub fn client_credentials(client_id: ClientId, client_secret: impl Into<String>) -> Self {
		Self {
			grant_type: GrantType::ClientCredentials.as_str().into(),
			client_id,
			client_secret: client_secret.into(),
			code: None,
			redirect_uri: None,
			refresh_token: None,
		}
	}

	/// Overrides the wire grant name, for callers relaying raw input.
	pub fn grant_type(mut self, grant_type: impl Into<String>) -> Self {
		self.grant_type = grant_type.into();

		self
	}
}
impl Debug for TokenRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRequest")
			.field("grant_type", &self.grant_type)
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("code", &self.code.as_ref().map(|_| "<redacted>"))
			.field("redirect_uri", &self.redirect_uri)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Token-endpoint response.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
	/// Signed access token.
	pub access_token: String,
	/// Fixed `Bearer` scheme.
	pub token_type: String,
	/// Seconds until the access token expires.
	pub expires_in: i64,
	/// Opaque refresh token, present for grants that mint one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Space-joined scope granted to the tokens.
	pub scope: String,
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &self.refresh_token)
			.field("scope", &self.scope)
			.finish()
	}
}

impl Authority {
	/// Exchanges a grant for tokens, dispatching on the requested grant type.
	///
	/// Client credentials are always verified first so the failure reads the same for every
	/// grant; a grant outside the client's allow-list is reported as unsupported.
	pub async fn exchange(&self, request: TokenRequest) -> Result<TokenResponse> {
		const KIND: FlowKind = FlowKind::Exchange;

		let span = FlowSpan::new(KIND, "exchange");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.exchange_checked(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn exchange_checked(&self, request: TokenRequest) -> Result<TokenResponse> {
		self.enforce_rate_limit(request.client_id.as_ref(), RateAction::Auth).await?;

		let registration = match self
			.clients
			.authenticate(&request.client_id, &request.client_secret)
			.await
		{
			Ok(registration) => registration,
			Err(error) => {
				if matches!(error, Error::InvalidClient { .. }) {
					let event = AuditEvent::new(
						AuditKind::ClientAuthFailed,
						request.client_id.as_ref(),
						self.clock.now(),
					)
					.detail(error.to_string());

					audit::record_event(self.audit.as_ref(), event).await;
				}

				return Err(error);
			},
		};
		let grant = GrantType::parse(&request.grant_type).ok_or_else(|| {
			Error::UnsupportedGrantType { grant_type: request.grant_type.clone() }
		})?;

		if !registration.allows(grant) {
			return Err(Error::UnsupportedGrantType { grant_type: request.grant_type.clone() });
		}

		let outcome = match grant {
			GrantType::AuthorizationCode => self.exchange_code(&registration, &request).await,
			GrantType::RefreshToken => self.redeem_refresh_token(&registration, &request).await,
			GrantType::ClientCredentials => self.issue_client_credentials(&registration).await,
		};

		if let Err(error) = &outcome {
			if matches!(
				error,
				Error::InvalidOrExpiredCode | Error::RedirectMismatch | Error::InvalidRefreshToken
			) {
				let event = AuditEvent::new(
					AuditKind::ExchangeRejected,
					request.client_id.as_ref(),
					self.clock.now(),
				)
				.detail(error.to_string());

				audit::record_event(self.audit.as_ref(), event).await;
			}
		}

		outcome
	}

	async fn exchange_code(
		&self,
		registration: &ClientRecord,
		request: &TokenRequest,
	) -> Result<TokenResponse> {
		let code = request.code.as_deref().ok_or(Error::InvalidOrExpiredCode)?;
		let record = match self.store.claim_code(code).await? {
			ClaimOutcome::Claimed(record) => record,
			ClaimOutcome::Missing => return Err(Error::InvalidOrExpiredCode),
		};
		let now = self.clock.now();

		if record.is_expired_at(now) {
			return Err(Error::InvalidOrExpiredCode);
		}
		// A code minted for another client is burned, not handed over.
		if record.client_id != registration.client_id {
			return Err(Error::InvalidOrExpiredCode);
		}
		// The claim above already consumed the code; a mismatched redirect cannot retry it.
		if request.redirect_uri.as_deref() != Some(record.redirect_uri.as_str()) {
			return Err(Error::RedirectMismatch);
		}

		let response =
			self.issue_tokens(registration, record.user_id.as_ref(), &record.scope, true).await?;
		let event =
			AuditEvent::new(AuditKind::TokenIssued, registration.client_id.as_ref(), now)
				.detail("authorization_code grant");
		let event = match &record.user_id {
			Some(user) => event.actor(user.clone()),
			None => event,
		};

		audit::record_event(self.audit.as_ref(), event).await;

		Ok(response)
	}

	async fn redeem_refresh_token(
		&self,
		registration: &ClientRecord,
		request: &TokenRequest,
	) -> Result<TokenResponse> {
		let presented = request.refresh_token.as_deref().ok_or(Error::InvalidRefreshToken)?;
		let record =
			self.store.refresh_token(presented).await?.ok_or(Error::InvalidRefreshToken)?;
		let now = self.clock.now();

		if record.is_expired_at(now) {
			// Stale records are dropped on sight so the store stays bounded.
			self.store.delete_refresh_token(presented).await?;

			return Err(Error::InvalidRefreshToken);
		}
		if record.client_id != registration.client_id {
			return Err(Error::InvalidRefreshToken);
		}

		// No rotation: the presented token stays valid until its own expiry.
		let response =
			self.issue_tokens(registration, record.user_id.as_ref(), &record.scope, false).await?;
		let event =
			AuditEvent::new(AuditKind::TokenRefreshed, registration.client_id.as_ref(), now)
				.detail("refresh_token grant");
		let event = match &record.user_id {
			Some(user) => event.actor(user.clone()),
			None => event,
		};

		audit::record_event(self.audit.as_ref(), event).await;

		Ok(response)
	}

	async fn issue_client_credentials(
		&self,
		registration: &ClientRecord,
	) -> Result<TokenResponse> {
		let response = self.issue_tokens(registration, None, &registration.scope, false).await?;
		let event = AuditEvent::new(
			AuditKind::TokenIssued,
			registration.client_id.as_ref(),
			self.clock.now(),
		)
		.detail("client_credentials grant");

		audit::record_event(self.audit.as_ref(), event).await;

		Ok(response)
	}

	async fn issue_tokens(
		&self,
		registration: &ClientRecord,
		user: Option<&UserId>,
		scope: &ScopeSet,
		mint_refresh: bool,
	) -> Result<TokenResponse> {
		let issued = self.tokens.issue_access_token(&registration.client_id, user, scope)?;
		let refresh_token = if mint_refresh {
			Some(
				self.tokens
					.issue_refresh_token(&registration.client_id, user, scope)
					.await?
					.token,
			)
		} else {
			None
		};

		Ok(TokenResponse {
			access_token: issued.token,
			token_type: "Bearer".into(),
			expires_in: self.tokens.access_ttl().whole_seconds(),
			refresh_token,
			scope: scope.to_string(),
		})
	}
}
