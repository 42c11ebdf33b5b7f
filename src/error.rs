//! Service-level error types shared across flows, guards, and stores.

// self
use crate::_prelude::*;

/// Service-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical service error exposed by public APIs.
///
/// Internal storage faults collapse into [`Error::ServiceUnavailable`] so backend detail never
/// leaks across the API boundary; the original failure stays reachable through `source()`.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure surfaced as a generic unavailability.
	#[error("Service is temporarily unavailable.")]
	ServiceUnavailable(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Access token failed verification.
	#[error(transparent)]
	Token(#[from] TokenError),

	/// Client is unknown, suspended, or presented bad credentials.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Reason string recorded for operators; never echoes the presented secret.
		reason: String,
	},
	/// Presented redirect URI does not match the registered value.
	#[error("Redirect URI does not match the registered value.")]
	InvalidRedirectUri,
	/// Authorization request named a response type outside `code`/`token`.
	#[error("Unsupported response type: {response_type}.")]
	UnsupportedResponseType {
		/// Response type string as presented.
		response_type: String,
	},
	/// Token request named a grant the service (or the client) does not allow.
	#[error("Unsupported grant type: {grant_type}.")]
	UnsupportedGrantType {
		/// Grant type string as presented.
		grant_type: String,
	},
	/// Authorization code is missing, already consumed, or past its expiry.
	#[error("Authorization code is invalid or has expired.")]
	InvalidOrExpiredCode,
	/// Redirect URI presented at exchange differs from the one stored at issuance.
	#[error("Redirect URI differs from the one the code was issued for.")]
	RedirectMismatch,
	/// Refresh token is missing, bound to another client, or past its expiry.
	#[error("Refresh token is invalid or has expired.")]
	InvalidRefreshToken,
	/// User lacks the required permission.
	#[error("User `{user_id}` lacks the `{permission}` permission.")]
	PermissionDenied {
		/// User the check ran against.
		user_id: String,
		/// Permission that was required.
		permission: String,
	},
	/// Request quota exhausted for the identifier and action category.
	#[error("Rate limit exceeded.")]
	RateLimitExceeded(crate::guard::RetryDirective),
	/// Anti-forgery token is missing, stale, or does not match.
	#[error("CSRF token validation failed.")]
	CsrfValidationFailed,
}

/// Verification failures for presented access tokens, in check order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenError {
	/// Token does not have three base64url segments or carries an undecodable payload.
	#[error("Token is malformed.")]
	Malformed,
	/// Recomputed HMAC does not match the presented signature.
	#[error("Token signature is invalid.")]
	InvalidSignature,
	/// Token's `exp` claim is in the past.
	#[error("Token has expired.")]
	Expired,
	/// Token's `jti` claim is present in the revocation set.
	#[error("Token has been revoked.")]
	Revoked,
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_errors_collapse_into_service_unavailable() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::ServiceUnavailable(_)));
		assert!(!error.to_string().contains("database unreachable"));

		let source = StdError::source(&error)
			.expect("Service error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn token_errors_stay_transparent() {
		let error: Error = TokenError::Revoked.into();

		assert_eq!(error.to_string(), TokenError::Revoked.to_string());
	}
}
