//! Append-only audit trail covering authorization, token, and RBAC mutation events.
//!
//! Auditing is best-effort by design: a sink failure never changes the outcome of the
//! operation that produced the event.

// self
use crate::{
	_prelude::*,
	auth::UserId,
	store::StoreFuture,
};

/// Event categories recorded by the authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditKind {
	/// An authorization code was minted.
	CodeIssued,
	/// An authorization request was rejected.
	AuthorizeRejected,
	/// A client failed secret or status checks.
	ClientAuthFailed,
	/// An access token (and possibly a refresh token) was issued.
	TokenIssued,
	/// An access token was reissued from a refresh token.
	TokenRefreshed,
	/// A token was revoked.
	TokenRevoked,
	/// A presented token failed validation.
	TokenValidationFailed,
	/// A token exchange was rejected after client authentication.
	ExchangeRejected,
	/// A request was denied by the rate limiter.
	RateLimitTripped,
	/// An anti-forgery token failed validation.
	CsrfRejected,
	/// A permission check came back negative.
	PermissionDenied,
	/// A role was assigned to a user.
	RoleAssigned,
	/// A role was removed from a user.
	RoleRemoved,
	/// A role definition was created.
	RoleCreated,
	/// A permission definition was created.
	PermissionCreated,
	/// A permission was linked to a role.
	RolePermissionLinked,
	/// A permission was granted directly to a user.
	UserPermissionGranted,
}
impl AuditKind {
	/// Returns a stable label suitable for log fields and queries.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuditKind::CodeIssued => "code_issued",
			AuditKind::AuthorizeRejected => "authorize_rejected",
			AuditKind::ClientAuthFailed => "client_auth_failed",
			AuditKind::TokenIssued => "token_issued",
			AuditKind::TokenRefreshed => "token_refreshed",
			AuditKind::TokenRevoked => "token_revoked",
			AuditKind::TokenValidationFailed => "token_validation_failed",
			AuditKind::ExchangeRejected => "exchange_rejected",
			AuditKind::RateLimitTripped => "rate_limit_tripped",
			AuditKind::CsrfRejected => "csrf_rejected",
			AuditKind::PermissionDenied => "permission_denied",
			AuditKind::RoleAssigned => "role_assigned",
			AuditKind::RoleRemoved => "role_removed",
			AuditKind::RoleCreated => "role_created",
			AuditKind::PermissionCreated => "permission_created",
			AuditKind::RolePermissionLinked => "role_permission_linked",
			AuditKind::UserPermissionGranted => "user_permission_granted",
		}
	}
}
impl Display for AuditKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Single audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
	/// Instant the event was produced.
	pub at: OffsetDateTime,
	/// Event category.
	pub kind: AuditKind,
	/// User who triggered the event, when one is known.
	pub actor: Option<UserId>,
	/// Primary subject, such as a client id, user id, or permission name.
	pub subject: String,
	/// Free-form context, such as the rejection reason.
	pub detail: Option<String>,
}
impl AuditEvent {
	/// Creates an event for a subject at an instant.
	pub fn new(kind: AuditKind, subject: impl Into<String>, at: OffsetDateTime) -> Self {
		Self { at, kind, actor: None, subject: subject.into(), detail: None }
	}

	/// Attributes the event to a user.
	pub fn actor(mut self, actor: UserId) -> Self {
		self.actor = Some(actor);

		self
	}

	/// Attaches free-form context.
	pub fn detail(mut self, detail: impl Into<String>) -> Self {
		self.detail = Some(detail.into());

		self
	}
}

/// Append-only sink receiving audit events.
pub trait AuditSink
where
	Self: Send + Sync,
{
	/// Appends an event.
	fn record(&self, event: AuditEvent) -> StoreFuture<'_, ()>;

	/// Returns up to `limit` events, newest first.
	fn recent(&self, limit: usize) -> StoreFuture<'_, Vec<AuditEvent>>;
}

/// Bounded in-process [`AuditSink`] that drops the oldest events past its capacity.
#[derive(Clone, Debug)]
pub struct MemoryAuditSink {
	events: Arc<RwLock<VecDeque<AuditEvent>>>,
	capacity: usize,
}
impl MemoryAuditSink {
	/// Creates a sink retaining at most `capacity` events.
	pub fn new(capacity: usize) -> Self {
		Self { events: Arc::new(RwLock::new(VecDeque::new())), capacity }
	}
}
impl Default for MemoryAuditSink {
	fn default() -> Self {
		Self::new(1_024)
	}
}
impl AuditSink for MemoryAuditSink {
	fn record(&self, event: AuditEvent) -> StoreFuture<'_, ()> {
		let events = self.events.clone();
		let capacity = self.capacity;

		Box::pin(async move {
			let mut guard = events.write();

			guard.push_back(event);

			while guard.len() > capacity {
				guard.pop_front();
			}

			Ok(())
		})
	}

	fn recent(&self, limit: usize) -> StoreFuture<'_, Vec<AuditEvent>> {
		let events = self.events.clone();

		Box::pin(async move { Ok(events.read().iter().rev().take(limit).cloned().collect()) })
	}
}

/// Records an event, swallowing sink failures so the triggering operation's outcome stands.
pub(crate) async fn record_event(sink: &dyn AuditSink, event: AuditEvent) {
	#[cfg(feature = "tracing")]
	if let Err(error) = sink.record(event).await {
		tracing::warn!(%error, "Audit sink rejected an event.");
	}
	#[cfg(not(feature = "tracing"))]
	let _ = sink.record(event).await;
}
