//! Authorization-code issuance.

// self
use crate::{
	_prelude::*,
	audit::{self, AuditEvent, AuditKind},
	auth::{ClientId, ScopeSet, UserId},
	flows::Authority,
	guard::RateAction,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	token::{AuthCodeRecord, TokenSecret, service},
};

/// Length of minted authorization codes, in alphanumeric characters.
const CODE_LEN: usize = 32;

/// Authorization request presented on behalf of a client.
#[derive(Clone, Debug)]
pub struct AuthorizeRequest {
	/// Client asking for a grant.
	pub client_id: ClientId,
	/// Redirect URI; must equal the registered value byte-for-byte.
	pub redirect_uri: String,
	/// Requested response type; only `code` and `token` are understood.
	pub response_type: String,
	/// Scopes the resource owner approved.
	pub scope: ScopeSet,
	/// Opaque caller state echoed back verbatim.
	pub state: Option<String>,
	/// Resource owner approving the grant, when the caller authenticated one.
	pub user_id: Option<UserId>,
}
impl AuthorizeRequest {
	/// Creates a `code` request without state or an attached resource owner.
	pub fn new(client_id: ClientId, redirect_uri: impl Into<String>, scope: ScopeSet) -> Self {
		Self {
			client_id,
			redirect_uri: redirect_uri.into(),
			response_type: "code".into(),
			scope,
			state: None,
			user_id: None,
		}
	}

	/// Overrides the response type, for callers relaying raw wire input.
	pub fn response_type(mut self, response_type: impl Into<String>) -> Self {
		self.response_type = response_type.into();

		self
	}

	/// Attaches caller state.
	pub fn state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Attaches the approving resource owner.
	pub fn user(mut self, user: UserId) -> Self {
		self.user_id = Some(user);

		self
	}
}

/// Grant returned by a successful authorization request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthorizeGrant {
	/// Single-use authorization code.
	pub authorization_code: TokenSecret,
	/// Redirect URI the code is bound to.
	pub redirect_uri: String,
	/// Seconds until the code expires.
	pub expires_in: i64,
	/// Caller state echoed back verbatim.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub state: Option<String>,
}

impl Authority {
	/// Issues a single-use authorization code bound to the client and redirect URI.
	///
	/// Both `code` and `token` response types mint a code; anything else is rejected. The code
	/// expires after the configured authorization-code TTL.
	pub async fn authorize(&self, request: AuthorizeRequest) -> Result<AuthorizeGrant> {
		const KIND: FlowKind = FlowKind::Authorize;

		let span = FlowSpan::new(KIND, "authorize");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.enforce_rate_limit(request.client_id.as_ref(), RateAction::Auth).await?;

				let outcome = self.mint_code(&request).await;

				match &outcome {
					Ok(_) => {
						let event = AuditEvent::new(
							AuditKind::CodeIssued,
							request.client_id.as_ref(),
							self.clock.now(),
						)
						.detail(format!("redirect `{}`", request.redirect_uri));
						let event = match &request.user_id {
							Some(user) => event.actor(user.clone()),
							None => event,
						};

						audit::record_event(self.audit.as_ref(), event).await;
					},
					Err(error) => {
						if matches!(
							error,
							Error::InvalidClient { .. }
								| Error::InvalidRedirectUri
								| Error::UnsupportedResponseType { .. }
						) {
							let event = AuditEvent::new(
								AuditKind::AuthorizeRejected,
								request.client_id.as_ref(),
								self.clock.now(),
							)
							.detail(error.to_string());

							audit::record_event(self.audit.as_ref(), event).await;
						}
					},
				}

				outcome
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn mint_code(&self, request: &AuthorizeRequest) -> Result<AuthorizeGrant> {
		let registration = self.clients.require_active(&request.client_id).await?;

		if !registration.matches_redirect(&request.redirect_uri) {
			return Err(Error::InvalidRedirectUri);
		}
		if !matches!(request.response_type.as_str(), "code" | "token") {
			return Err(Error::UnsupportedResponseType {
				response_type: request.response_type.clone(),
			});
		}

		let now = self.clock.now();
		let code = TokenSecret::new(service::random_string(CODE_LEN));
		let record = AuthCodeRecord::new(
			code.clone(),
			request.client_id.clone(),
			request.scope.clone(),
			request.redirect_uri.clone(),
			now,
			now + self.auth_code_ttl,
		);
		let record = match &request.user_id {
			Some(user) => record.user(user.clone()),
			None => record,
		};

		self.store.put_code(record, now).await?;

		Ok(AuthorizeGrant {
			authorization_code: code,
			redirect_uri: request.redirect_uri.clone(),
			expires_in: self.auth_code_ttl.whole_seconds(),
			state: request.state.clone(),
		})
	}
}
