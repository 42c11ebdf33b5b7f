//! Role-based access control: definitions, assignments, the resolution cache, and the engine.

pub mod cache;
pub mod engine;

pub use cache::{PermissionCache, TtlPermissionCache};
pub use engine::RbacEngine;

// self
use crate::{
	_prelude::*,
	auth::{PermissionId, PermissionPath, RoleId, UserId},
};

/// Lifecycle status of a role or permission definition.
///
/// Inactive definitions stay stored but contribute nothing during resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
	/// Definition participates in resolution.
	Active,
	/// Definition is ignored during resolution.
	Inactive,
}

/// Role definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
	/// Stable role identifier.
	pub role_id: RoleId,
	/// Human-facing role name, matched by [`RbacEngine::has_role`](engine::RbacEngine::has_role).
	pub name: String,
	/// Optional operator description.
	pub description: Option<String>,
	/// Lifecycle status.
	pub status: EntryStatus,
	/// Creation instant.
	pub created_at: OffsetDateTime,
}
impl RoleRecord {
	/// Creates an active role definition.
	pub fn new(role_id: RoleId, name: impl Into<String>, created_at: OffsetDateTime) -> Self {
		Self {
			role_id,
			name: name.into(),
			description: None,
			status: EntryStatus::Active,
			created_at,
		}
	}

	/// Attaches an operator description.
	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}

	/// Overrides the lifecycle status.
	pub fn status(mut self, status: EntryStatus) -> Self {
		self.status = status;

		self
	}

	/// Returns `true` if the role participates in resolution.
	pub fn is_active(&self) -> bool {
		matches!(self.status, EntryStatus::Active)
	}
}

/// Permission definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
	/// Stable permission identifier.
	pub permission_id: PermissionId,
	/// Dot-path permission name, optionally wildcard-suffixed.
	pub name: PermissionPath,
	/// Resource type this permission is scoped to, if any.
	pub resource_type: Option<String>,
	/// Optional operator description.
	pub description: Option<String>,
	/// Lifecycle status.
	pub status: EntryStatus,
	/// Creation instant.
	pub created_at: OffsetDateTime,
}
impl PermissionRecord {
	/// Creates an active permission definition.
	pub fn new(
		permission_id: PermissionId,
		name: PermissionPath,
		created_at: OffsetDateTime,
	) -> Self {
		Self {
			permission_id,
			name,
			resource_type: None,
			description: None,
			status: EntryStatus::Active,
			created_at,
		}
	}

	/// Scopes the permission to a resource type.
	pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
		self.resource_type = Some(resource_type.into());

		self
	}

	/// Attaches an operator description.
	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}

	/// Overrides the lifecycle status.
	pub fn status(mut self, status: EntryStatus) -> Self {
		self.status = status;

		self
	}

	/// Returns `true` if the permission participates in resolution.
	pub fn is_active(&self) -> bool {
		matches!(self.status, EntryStatus::Active)
	}

	/// Entries this definition contributes to a resolved permission set.
	///
	/// The bare name always contributes; a resource-scoped definition additionally contributes
	/// the `name:resource_type` composite so resource-qualified checks can match it.
	pub fn entries(&self) -> impl Iterator<Item = String> + '_ {
		let composite =
			self.resource_type.as_ref().map(|resource| format!("{}:{resource}", self.name));

		std::iter::once(self.name.to_string()).chain(composite)
	}
}

/// User-role join record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
	/// User holding the role.
	pub user_id: UserId,
	/// Role held.
	pub role_id: RoleId,
	/// Administrator who made the assignment, when known.
	pub assigned_by: Option<UserId>,
	/// Assignment instant.
	pub assigned_at: OffsetDateTime,
}
impl RoleAssignment {
	/// Creates an assignment without an attributed actor.
	pub fn new(user_id: UserId, role_id: RoleId, assigned_at: OffsetDateTime) -> Self {
		Self { user_id, role_id, assigned_by: None, assigned_at }
	}

	/// Attributes the assignment to an administrator.
	pub fn assigned_by(mut self, actor: UserId) -> Self {
		self.assigned_by = Some(actor);

		self
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn resource_scoped_permissions_contribute_both_entries() {
		let record = PermissionRecord::new(
			PermissionId::new("perm-1").expect("Permission fixture should be valid."),
			PermissionPath::new("document.read").expect("Path fixture should be valid."),
			macros::datetime!(2026-01-01 00:00 UTC),
		)
		.resource_type("document");
		let entries: Vec<_> = record.entries().collect();

		assert_eq!(entries, ["document.read", "document.read:document"]);
	}

	#[test]
	fn unscoped_permissions_contribute_only_their_name() {
		let record = PermissionRecord::new(
			PermissionId::new("perm-2").expect("Permission fixture should be valid."),
			PermissionPath::new("system.admin").expect("Path fixture should be valid."),
			macros::datetime!(2026-01-01 00:00 UTC),
		);
		let entries: Vec<_> = record.entries().collect();

		assert_eq!(entries, ["system.admin"]);
	}

	#[test]
	fn assignments_track_the_acting_administrator() {
		let user = UserId::new("user-42").expect("User fixture should be valid.");
		let actor = UserId::new("admin-1").expect("Actor fixture should be valid.");
		let role = RoleId::new("role-admins").expect("Role fixture should be valid.");
		let assignment = RoleAssignment::new(user, role, macros::datetime!(2026-01-01 00:00 UTC))
			.assigned_by(actor.clone());

		assert_eq!(assignment.assigned_by, Some(actor));
	}
}
