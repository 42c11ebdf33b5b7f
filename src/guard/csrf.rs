//! Session-scoped anti-forgery tokens with per-form isolation.

// crates.io
use subtle::ConstantTimeEq;
// self
use crate::{_prelude::*, auth::SessionId, clock::Clock, token::service::random_hex};

#[derive(Clone, Debug)]
struct IssuedCsrf {
	token: String,
	issued_at: OffsetDateTime,
}

/// Issues and validates per-(session, form) anti-forgery tokens.
///
/// Validation is non-consuming; a token stays valid for repeated submissions of the same form
/// until it ages out or is explicitly invalidated. Every rejection path returns the same
/// error so a caller learns nothing about which check failed.
pub struct CsrfGuard {
	ttl: Duration,
	clock: Arc<dyn Clock>,
	tokens: RwLock<HashMap<(SessionId, String), IssuedCsrf>>,
}
impl CsrfGuard {
	/// Creates a guard whose tokens age out after `ttl`.
	pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
		Self { ttl, clock, tokens: RwLock::new(HashMap::new()) }
	}

	/// Issues a fresh token for a form within a session, replacing any previous one.
	pub fn issue(&self, session: &SessionId, form: &str) -> String {
		let token = random_hex(32);
		let issued = IssuedCsrf { token: token.clone(), issued_at: self.clock.now() };

		self.tokens.write().insert((session.clone(), form.to_owned()), issued);

		token
	}

	/// Validates a presented token in constant time.
	///
	/// Fails closed when no token is on record, when the stored token is older than the TTL
	/// (the stale entry is removed), or when the values differ.
	pub fn validate(&self, session: &SessionId, form: &str, presented: &str) -> Result<()> {
		let key = (session.clone(), form.to_owned());
		let now = self.clock.now();
		let mut guard = self.tokens.write();
		let issued = guard.get(&key).ok_or(Error::CsrfValidationFailed)?;

		if now > issued.issued_at + self.ttl {
			guard.remove(&key);

			return Err(Error::CsrfValidationFailed);
		}
		if !bool::from(issued.token.as_bytes().ct_eq(presented.as_bytes())) {
			return Err(Error::CsrfValidationFailed);
		}

		Ok(())
	}

	/// Drops the token for one form within a session.
	pub fn invalidate(&self, session: &SessionId, form: &str) {
		self.tokens.write().remove(&(session.clone(), form.to_owned()));
	}

	/// Drops every token belonging to a session, such as on logout.
	pub fn invalidate_session(&self, session: &SessionId) {
		self.tokens.write().retain(|(owner, _), _| owner != session);
	}
}
impl Debug for CsrfGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CsrfGuard").field("ttl", &self.ttl).finish()
	}
}
