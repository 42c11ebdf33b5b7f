//! Permission resolution and RBAC mutations with last-step cache invalidation.
//!
//! Resolution aggregates role-derived permissions with direct user grants, consulting the
//! cache first. Concurrent misses for the same user collapse into one storage load through a
//! per-user singleflight guard. Every mutation invalidates the affected users' cached sets as
//! its final step so no reader can observe a stale set after the mutation returns.

// self
use crate::{
	_prelude::*,
	audit::{self, AuditEvent, AuditKind, AuditSink},
	auth::{PermissionId, PermissionPath, PermissionSet, RoleId, UserId},
	clock::Clock,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	rbac::{PermissionRecord, RoleAssignment, RoleRecord, cache::PermissionCache},
	store::{RbacStore, StoreError},
	token::service::random_string,
};

/// Resolves permission checks and applies RBAC mutations.
pub struct RbacEngine {
	store: Arc<dyn RbacStore>,
	cache: Arc<dyn PermissionCache>,
	audit: Arc<dyn AuditSink>,
	clock: Arc<dyn Clock>,
	cache_ttl: Duration,
	load_guards: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}
impl RbacEngine {
	/// Creates an engine over the provided store, cache, audit sink, and clock.
	pub fn new(
		store: Arc<dyn RbacStore>,
		cache: Arc<dyn PermissionCache>,
		audit: Arc<dyn AuditSink>,
		clock: Arc<dyn Clock>,
		cache_ttl: Duration,
	) -> Self {
		Self { store, cache, audit, clock, cache_ttl, load_guards: Mutex::new(HashMap::new()) }
	}

	/// Checks whether a user holds a permission, optionally qualified by a resource.
	///
	/// Wildcard query strings resolve to `false` without touching storage; wildcards grant,
	/// they are never granted against.
	pub async fn has_permission(
		&self,
		user: &UserId,
		permission: &str,
		resource: Option<&str>,
	) -> Result<bool> {
		const KIND: FlowKind = FlowKind::RbacCheck;

		let span = FlowSpan::new(KIND, "has_permission");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if permission.contains('*') {
					return Ok(false);
				}

				let resolved = self.resolved_permissions(user).await?;

				Ok(resolved.grants(permission, resource))
			})
			.await;

		match &result {
			Ok(true) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Ok(false) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				let event =
					AuditEvent::new(AuditKind::PermissionDenied, permission, self.clock.now())
						.actor(user.clone());
				let event = match resource {
					Some(resource) => event.detail(format!("resource `{resource}`")),
					None => event,
				};

				audit::record_event(self.audit.as_ref(), event).await;
			},
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Checks a permission and maps a negative answer to [`Error::PermissionDenied`].
	pub async fn require_permission(
		&self,
		user: &UserId,
		permission: &str,
		resource: Option<&str>,
	) -> Result<()> {
		if self.has_permission(user, permission, resource).await? {
			Ok(())
		} else {
			Err(Error::PermissionDenied {
				user_id: user.to_string(),
				permission: permission.to_owned(),
			})
		}
	}

	/// Checks whether a user holds an active role with the given name.
	pub async fn has_role(&self, user: &UserId, role_name: &str) -> Result<bool> {
		for assignment in self.store.user_roles(user).await? {
			let matched = self
				.store
				.role(&assignment.role_id)
				.await?
				.is_some_and(|role| role.is_active() && role.name == role_name);

			if matched {
				return Ok(true);
			}
		}

		Ok(false)
	}

	/// Assigns a role to a user; returns `false` when the user already held it.
	///
	/// A no-op assignment has no side effects at all: no audit entry, no invalidation.
	pub async fn assign_role(
		&self,
		user: &UserId,
		role: &RoleId,
		actor: Option<&UserId>,
	) -> Result<bool> {
		const KIND: FlowKind = FlowKind::RbacMutation;

		let span = FlowSpan::new(KIND, "assign_role");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let assignment = RoleAssignment::new(user.clone(), role.clone(), self.clock.now());
				let assignment = match actor {
					Some(actor) => assignment.assigned_by(actor.clone()),
					None => assignment,
				};

				if !self.store.assign_role(assignment).await? {
					return Ok(false);
				}

				let event = AuditEvent::new(AuditKind::RoleAssigned, user.as_ref(), self.clock.now())
					.detail(role.to_string());
				let event = match actor {
					Some(actor) => event.actor(actor.clone()),
					None => event,
				};

				audit::record_event(self.audit.as_ref(), event).await;
				// Invalidation is the last step; a reader racing this mutation either sees the
				// old set before it or resolves fresh after it.
				self.cache.delete(user).await;

				Ok(true)
			})
			.await;

		record_mutation_outcome(KIND, &result);

		result
	}

	/// Removes a role from a user; returns `false` when the user did not hold it.
	pub async fn remove_role(
		&self,
		user: &UserId,
		role: &RoleId,
		actor: Option<&UserId>,
	) -> Result<bool> {
		const KIND: FlowKind = FlowKind::RbacMutation;

		let span = FlowSpan::new(KIND, "remove_role");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if !self.store.remove_role(user, role).await? {
					return Ok(false);
				}

				let event = AuditEvent::new(AuditKind::RoleRemoved, user.as_ref(), self.clock.now())
					.detail(role.to_string());
				let event = match actor {
					Some(actor) => event.actor(actor.clone()),
					None => event,
				};

				audit::record_event(self.audit.as_ref(), event).await;
				self.cache.delete(user).await;

				Ok(true)
			})
			.await;

		record_mutation_outcome(KIND, &result);

		result
	}

	/// Creates a role and links the provided permissions to it.
	pub async fn create_role(
		&self,
		name: &str,
		description: Option<&str>,
		permission_ids: &[PermissionId],
		actor: Option<&UserId>,
	) -> Result<RoleRecord> {
		let role_id = generated_id::<RoleId>("role")?;
		let record = RoleRecord::new(role_id, name, self.clock.now());
		let record = match description {
			Some(description) => record.description(description),
			None => record,
		};

		self.store.put_role(record.clone()).await?;

		for permission in permission_ids {
			self.store.link_role_permission(&record.role_id, permission).await?;
		}

		let event = AuditEvent::new(AuditKind::RoleCreated, record.role_id.as_ref(), self.clock.now())
			.detail(name.to_owned());
		let event = match actor {
			Some(actor) => event.actor(actor.clone()),
			None => event,
		};

		audit::record_event(self.audit.as_ref(), event).await;

		Ok(record)
	}

	/// Creates a permission definition.
	pub async fn create_permission(
		&self,
		name: PermissionPath,
		description: Option<&str>,
		resource_type: Option<&str>,
		actor: Option<&UserId>,
	) -> Result<PermissionRecord> {
		let permission_id = generated_id::<PermissionId>("perm")?;
		let record = PermissionRecord::new(permission_id, name, self.clock.now());
		let record = match description {
			Some(description) => record.description(description),
			None => record,
		};
		let record = match resource_type {
			Some(resource_type) => record.resource_type(resource_type),
			None => record,
		};

		self.store.put_permission(record.clone()).await?;

		let event = AuditEvent::new(
			AuditKind::PermissionCreated,
			record.permission_id.as_ref(),
			self.clock.now(),
		)
		.detail(record.name.to_string());
		let event = match actor {
			Some(actor) => event.actor(actor.clone()),
			None => event,
		};

		audit::record_event(self.audit.as_ref(), event).await;

		Ok(record)
	}

	/// Links a permission to a role, invalidating every holder's cached set.
	pub async fn assign_permission_to_role(
		&self,
		role: &RoleId,
		permission: &PermissionId,
		actor: Option<&UserId>,
	) -> Result<bool> {
		const KIND: FlowKind = FlowKind::RbacMutation;

		let span = FlowSpan::new(KIND, "assign_permission_to_role");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if !self.store.link_role_permission(role, permission).await? {
					return Ok(false);
				}

				let event =
					AuditEvent::new(AuditKind::RolePermissionLinked, role.as_ref(), self.clock.now())
						.detail(permission.to_string());
				let event = match actor {
					Some(actor) => event.actor(actor.clone()),
					None => event,
				};

				audit::record_event(self.audit.as_ref(), event).await;

				// Everyone holding the role resolves differently now.
				for user in self.store.users_with_role(role).await? {
					self.cache.delete(&user).await;
				}

				Ok(true)
			})
			.await;

		record_mutation_outcome(KIND, &result);

		result
	}

	/// Grants a permission directly to a user, bypassing roles.
	pub async fn grant_permission_to_user(
		&self,
		user: &UserId,
		permission: &PermissionId,
		actor: Option<&UserId>,
	) -> Result<bool> {
		if !self.store.grant_user_permission(user, permission).await? {
			return Ok(false);
		}

		let event =
			AuditEvent::new(AuditKind::UserPermissionGranted, user.as_ref(), self.clock.now())
				.detail(permission.to_string());
		let event = match actor {
			Some(actor) => event.actor(actor.clone()),
			None => event,
		};

		audit::record_event(self.audit.as_ref(), event).await;
		self.cache.delete(user).await;

		Ok(true)
	}

	async fn resolved_permissions(&self, user: &UserId) -> Result<PermissionSet> {
		if let Some(cached) = self.cache.get(user, self.clock.now()).await {
			return Ok(cached);
		}

		let guard = self.load_guard(user);
		let _singleflight = guard.lock().await;

		// The flight that beat us here has already populated the cache.
		if let Some(cached) = self.cache.get(user, self.clock.now()).await {
			return Ok(cached);
		}

		let resolved = self.resolve_from_store(user).await?;

		self.cache.set(user.clone(), resolved.clone(), self.clock.now() + self.cache_ttl).await;

		Ok(resolved)
	}

	async fn resolve_from_store(&self, user: &UserId) -> Result<PermissionSet> {
		let mut permissions = PermissionSet::new();

		for assignment in self.store.user_roles(user).await? {
			// Dangling or deactivated roles contribute nothing.
			let active = self
				.store
				.role(&assignment.role_id)
				.await?
				.is_some_and(|role| role.is_active());

			if !active {
				continue;
			}

			for record in self.store.role_permissions(&assignment.role_id).await? {
				insert_active(&mut permissions, &record);
			}
		}

		for record in self.store.user_permissions(user).await? {
			insert_active(&mut permissions, &record);
		}

		Ok(permissions)
	}

	fn load_guard(&self, user: &UserId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.load_guards.lock();

		guards.entry(user.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for RbacEngine {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RbacEngine").field("cache_ttl", &self.cache_ttl).finish()
	}
}

fn insert_active(permissions: &mut PermissionSet, record: &PermissionRecord) {
	if record.is_active() {
		for entry in record.entries() {
			permissions.insert(entry);
		}
	}
}

fn generated_id<T>(prefix: &str) -> Result<T>
where
	T: FromStr,
	T::Err: Display,
{
	format!("{prefix}-{}", random_string(16)).parse().map_err(|error: T::Err| {
		StoreError::Backend { message: format!("Generated identifier was rejected: {error}.") }
			.into()
	})
}

fn record_mutation_outcome(kind: FlowKind, result: &Result<bool>) {
	match result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
	}
}
