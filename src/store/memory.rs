//! Thread-safe in-memory implementation of both storage surfaces.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, PermissionId, RoleId, UserId},
	client::{ClientRecord, ClientStatus},
	rbac::{PermissionRecord, RoleAssignment, RoleRecord},
	store::{AuthStore, ClaimOutcome, RbacStore, StoreFuture},
	token::{AuthCodeRecord, RefreshTokenRecord, RevocationEntry},
};

type Shared = Arc<RwLock<Inner>>;

#[derive(Debug, Default)]
struct Inner {
	clients: HashMap<ClientId, ClientRecord>,
	codes: HashMap<String, AuthCodeRecord>,
	refresh_tokens: HashMap<String, RefreshTokenRecord>,
	revocations: HashMap<String, RevocationEntry>,
	roles: HashMap<RoleId, RoleRecord>,
	permissions: HashMap<PermissionId, PermissionRecord>,
	role_permissions: HashMap<RoleId, BTreeSet<PermissionId>>,
	user_roles: HashMap<UserId, Vec<RoleAssignment>>,
	user_permissions: HashMap<UserId, BTreeSet<PermissionId>>,
}
impl Inner {
	fn prune_codes(&mut self, now: OffsetDateTime) {
		self.codes.retain(|_, record| !record.is_expired_at(now));
	}

	fn prune_revocations(&mut self, now: OffsetDateTime) {
		self.revocations.retain(|_, entry| !entry.is_expired_at(now));
	}

	fn resolve_permissions(&self, ids: Option<&BTreeSet<PermissionId>>) -> Vec<PermissionRecord> {
		ids.into_iter()
			.flatten()
			.filter_map(|id| self.permissions.get(id).cloned())
			.collect()
	}
}

/// Thread-safe backend keeping every record in-process, for tests and single-node deployments.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Shared);
impl AuthStore for MemoryStore {
	fn put_client(&self, record: ClientRecord) -> StoreFuture<'_, ()> {
		let shared = self.0.clone();

		Box::pin(async move {
			shared.write().clients.insert(record.client_id.clone(), record);

			Ok(())
		})
	}

	fn client<'a>(&'a self, client: &'a ClientId) -> StoreFuture<'a, Option<ClientRecord>> {
		let shared = self.0.clone();
		let client = client.to_owned();

		Box::pin(async move { Ok(shared.read().clients.get(&client).cloned()) })
	}

	fn set_client_status<'a>(
		&'a self,
		client: &'a ClientId,
		status: ClientStatus,
	) -> StoreFuture<'a, bool> {
		let shared = self.0.clone();
		let client = client.to_owned();

		Box::pin(async move {
			Ok(match shared.write().clients.get_mut(&client) {
				Some(record) => {
					record.status = status;

					true
				},
				None => false,
			})
		})
	}

	fn put_code(&self, record: AuthCodeRecord, now: OffsetDateTime) -> StoreFuture<'_, ()> {
		let shared = self.0.clone();

		Box::pin(async move {
			let mut guard = shared.write();

			guard.prune_codes(now);
			guard.codes.insert(record.code.expose().to_owned(), record);

			Ok(())
		})
	}

	fn claim_code<'a>(&'a self, code: &'a str) -> StoreFuture<'a, ClaimOutcome> {
		let shared = self.0.clone();
		let code = code.to_owned();

		Box::pin(async move {
			Ok(match shared.write().codes.remove(&code) {
				Some(record) => ClaimOutcome::Claimed(record),
				None => ClaimOutcome::Missing,
			})
		})
	}

	fn put_refresh_token(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		let shared = self.0.clone();

		Box::pin(async move {
			shared.write().refresh_tokens.insert(record.token.expose().to_owned(), record);

			Ok(())
		})
	}

	fn refresh_token<'a>(
		&'a self,
		token: &'a str,
	) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		let shared = self.0.clone();
		let token = token.to_owned();

		Box::pin(async move { Ok(shared.read().refresh_tokens.get(&token).cloned()) })
	}

	fn delete_refresh_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, bool> {
		let shared = self.0.clone();
		let token = token.to_owned();

		Box::pin(async move { Ok(shared.write().refresh_tokens.remove(&token).is_some()) })
	}

	fn put_revocation(&self, entry: RevocationEntry, now: OffsetDateTime) -> StoreFuture<'_, ()> {
		let shared = self.0.clone();

		Box::pin(async move {
			let mut guard = shared.write();

			guard.prune_revocations(now);
			guard.revocations.insert(entry.jti.clone(), entry);

			Ok(())
		})
	}

	fn is_revoked<'a>(&'a self, jti: &'a str, now: OffsetDateTime) -> StoreFuture<'a, bool> {
		let shared = self.0.clone();
		let jti = jti.to_owned();

		Box::pin(async move {
			Ok(shared.read().revocations.get(&jti).is_some_and(|entry| !entry.is_expired_at(now)))
		})
	}
}
impl RbacStore for MemoryStore {
	fn put_role(&self, record: RoleRecord) -> StoreFuture<'_, ()> {
		let shared = self.0.clone();

		Box::pin(async move {
			shared.write().roles.insert(record.role_id.clone(), record);

			Ok(())
		})
	}

	fn role<'a>(&'a self, role: &'a RoleId) -> StoreFuture<'a, Option<RoleRecord>> {
		let shared = self.0.clone();
		let role = role.to_owned();

		Box::pin(async move { Ok(shared.read().roles.get(&role).cloned()) })
	}

	fn put_permission(&self, record: PermissionRecord) -> StoreFuture<'_, ()> {
		let shared = self.0.clone();

		Box::pin(async move {
			shared.write().permissions.insert(record.permission_id.clone(), record);

			Ok(())
		})
	}

	fn permission<'a>(
		&'a self,
		permission: &'a PermissionId,
	) -> StoreFuture<'a, Option<PermissionRecord>> {
		let shared = self.0.clone();
		let permission = permission.to_owned();

		Box::pin(async move { Ok(shared.read().permissions.get(&permission).cloned()) })
	}

	fn link_role_permission<'a>(
		&'a self,
		role: &'a RoleId,
		permission: &'a PermissionId,
	) -> StoreFuture<'a, bool> {
		let shared = self.0.clone();
		let role = role.to_owned();
		let permission = permission.to_owned();

		Box::pin(async move {
			Ok(shared.write().role_permissions.entry(role).or_default().insert(permission))
		})
	}

	fn assign_role(&self, assignment: RoleAssignment) -> StoreFuture<'_, bool> {
		let shared = self.0.clone();

		Box::pin(async move {
			let mut guard = shared.write();
			let assignments = guard.user_roles.entry(assignment.user_id.clone()).or_default();

			if assignments.iter().any(|existing| existing.role_id == assignment.role_id) {
				return Ok(false);
			}

			assignments.push(assignment);

			Ok(true)
		})
	}

	fn remove_role<'a>(&'a self, user: &'a UserId, role: &'a RoleId) -> StoreFuture<'a, bool> {
		let shared = self.0.clone();
		let user = user.to_owned();
		let role = role.to_owned();

		Box::pin(async move {
			Ok(match shared.write().user_roles.get_mut(&user) {
				Some(assignments) => {
					let before = assignments.len();

					assignments.retain(|assignment| assignment.role_id != role);

					assignments.len() != before
				},
				None => false,
			})
		})
	}

	fn user_roles<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Vec<RoleAssignment>> {
		let shared = self.0.clone();
		let user = user.to_owned();

		Box::pin(async move { Ok(shared.read().user_roles.get(&user).cloned().unwrap_or_default()) })
	}

	fn role_permissions<'a>(
		&'a self,
		role: &'a RoleId,
	) -> StoreFuture<'a, Vec<PermissionRecord>> {
		let shared = self.0.clone();
		let role = role.to_owned();

		Box::pin(async move {
			let guard = shared.read();

			Ok(guard.resolve_permissions(guard.role_permissions.get(&role)))
		})
	}

	fn grant_user_permission<'a>(
		&'a self,
		user: &'a UserId,
		permission: &'a PermissionId,
	) -> StoreFuture<'a, bool> {
		let shared = self.0.clone();
		let user = user.to_owned();
		let permission = permission.to_owned();

		Box::pin(async move {
			Ok(shared.write().user_permissions.entry(user).or_default().insert(permission))
		})
	}

	fn user_permissions<'a>(
		&'a self,
		user: &'a UserId,
	) -> StoreFuture<'a, Vec<PermissionRecord>> {
		let shared = self.0.clone();
		let user = user.to_owned();

		Box::pin(async move {
			let guard = shared.read();

			Ok(guard.resolve_permissions(guard.user_permissions.get(&user)))
		})
	}

	fn users_with_role<'a>(&'a self, role: &'a RoleId) -> StoreFuture<'a, Vec<UserId>> {
		let shared = self.0.clone();
		let role = role.to_owned();

		Box::pin(async move {
			Ok(shared
				.read()
				.user_roles
				.iter()
				.filter(|(_, assignments)| {
					assignments.iter().any(|assignment| assignment.role_id == role)
				})
				.map(|(user, _)| user.clone())
				.collect())
		})
	}
}
