//! Storage contracts and built-in backends for authority state.
//!
//! Credential state (clients, codes, refresh tokens, revocations) and the RBAC graph (roles,
//! permissions, assignments) are separate traits so backends can implement either surface
//! independently. [`MemoryStore`] implements both; [`FileStore`](file::FileStore) persists the
//! credential surface only.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, PermissionId, RoleId, UserId},
	client::{ClientRecord, ClientStatus},
	rbac::{PermissionRecord, RoleAssignment, RoleRecord},
	token::{AuthCodeRecord, RefreshTokenRecord, RevocationEntry},
};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage contract for OAuth credential state.
pub trait AuthStore
where
	Self: Send + Sync,
{
	/// Persists or replaces a client registration.
	fn put_client(&self, record: ClientRecord) -> StoreFuture<'_, ()>;

	/// Fetches a client registration, if present.
	fn client<'a>(&'a self, client: &'a ClientId) -> StoreFuture<'a, Option<ClientRecord>>;

	/// Updates a client's lifecycle status; returns `false` if the client is unknown.
	fn set_client_status<'a>(
		&'a self,
		client: &'a ClientId,
		status: ClientStatus,
	) -> StoreFuture<'a, bool>;

	/// Persists an authorization code, pruning codes already expired at `now`.
	fn put_code(&self, record: AuthCodeRecord, now: OffsetDateTime) -> StoreFuture<'_, ()>;

	/// Atomically removes and returns the code record, whoever gets there first.
	fn claim_code<'a>(&'a self, code: &'a str) -> StoreFuture<'a, ClaimOutcome>;

	/// Persists a refresh token record keyed by its opaque value.
	fn put_refresh_token(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches a refresh token record, if present.
	fn refresh_token<'a>(&'a self, token: &'a str)
	-> StoreFuture<'a, Option<RefreshTokenRecord>>;

	/// Deletes a refresh token; returns `false` if it was not stored.
	fn delete_refresh_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, bool>;

	/// Records a revocation entry, pruning entries already expired at `now`.
	fn put_revocation(&self, entry: RevocationEntry, now: OffsetDateTime) -> StoreFuture<'_, ()>;

	/// Returns `true` if the token id has a live revocation entry at `now`.
	fn is_revoked<'a>(&'a self, jti: &'a str, now: OffsetDateTime) -> StoreFuture<'a, bool>;
}

/// Storage contract for the RBAC graph.
pub trait RbacStore
where
	Self: Send + Sync,
{
	/// Persists or replaces a role definition.
	fn put_role(&self, record: RoleRecord) -> StoreFuture<'_, ()>;

	/// Fetches a role definition, if present.
	fn role<'a>(&'a self, role: &'a RoleId) -> StoreFuture<'a, Option<RoleRecord>>;

	/// Persists or replaces a permission definition.
	fn put_permission(&self, record: PermissionRecord) -> StoreFuture<'_, ()>;

	/// Fetches a permission definition, if present.
	fn permission<'a>(
		&'a self,
		permission: &'a PermissionId,
	) -> StoreFuture<'a, Option<PermissionRecord>>;

	/// Links a permission to a role; returns `false` if the link already existed.
	fn link_role_permission<'a>(
		&'a self,
		role: &'a RoleId,
		permission: &'a PermissionId,
	) -> StoreFuture<'a, bool>;

	/// Records a user-role assignment; returns `false` if it already existed.
	fn assign_role(&self, assignment: RoleAssignment) -> StoreFuture<'_, bool>;

	/// Removes a user-role assignment; returns `false` if none existed.
	fn remove_role<'a>(&'a self, user: &'a UserId, role: &'a RoleId) -> StoreFuture<'a, bool>;

	/// Lists the role assignments held by a user.
	fn user_roles<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Vec<RoleAssignment>>;

	/// Lists the permission definitions linked to a role, skipping dangling links.
	fn role_permissions<'a>(&'a self, role: &'a RoleId)
	-> StoreFuture<'a, Vec<PermissionRecord>>;

	/// Grants a permission directly to a user; returns `false` if already granted.
	fn grant_user_permission<'a>(
		&'a self,
		user: &'a UserId,
		permission: &'a PermissionId,
	) -> StoreFuture<'a, bool>;

	/// Lists the permission definitions granted directly to a user.
	fn user_permissions<'a>(&'a self, user: &'a UserId)
	-> StoreFuture<'a, Vec<PermissionRecord>>;

	/// Lists the users currently holding a role.
	fn users_with_role<'a>(&'a self, role: &'a RoleId) -> StoreFuture<'a, Vec<UserId>>;
}

/// Result of an authorization-code claim attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClaimOutcome {
	/// The caller won the code; no other claimant will see it.
	Claimed(AuthCodeRecord),
	/// The code was never stored or was already claimed.
	Missing,
}

/// Error type produced by [`AuthStore`] and [`RbacStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failure surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn claim_outcome_round_trips_through_serde() {
		let payload = serde_json::to_string(&ClaimOutcome::Missing)
			.expect("ClaimOutcome should serialize to JSON.");

		assert_eq!(payload, "\"Missing\"");

		let round_trip: ClaimOutcome = serde_json::from_str(&payload)
			.expect("Serialized outcome should deserialize from JSON.");

		assert_eq!(round_trip, ClaimOutcome::Missing);
	}

	#[test]
	fn store_error_messages_carry_the_backend_detail() {
		let error = StoreError::Backend { message: "disk full".into() };

		assert_eq!(error.to_string(), "Backend failure: disk full.");
	}
}
