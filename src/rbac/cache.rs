//! Per-user resolved permission cache with single-key TTL semantics.

// self
use crate::{
	_prelude::*,
	auth::{PermissionSet, UserId},
};

/// Boxed future returned by cache operations.
///
/// Cache operations are infallible by contract; an implementation that loses state simply
/// reports a miss and the engine re-resolves from storage.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Single-key get/set/delete cache for resolved permission sets.
pub trait PermissionCache
where
	Self: Send + Sync,
{
	/// Fetches the cached set for a user, honoring the entry's expiry at `now`.
	fn get<'a>(
		&'a self,
		user: &'a UserId,
		now: OffsetDateTime,
	) -> CacheFuture<'a, Option<PermissionSet>>;

	/// Caches a resolved set until `expires_at`, replacing any previous entry.
	fn set(
		&self,
		user: UserId,
		permissions: PermissionSet,
		expires_at: OffsetDateTime,
	) -> CacheFuture<'_, ()>;

	/// Drops the cached set for a user.
	fn delete<'a>(&'a self, user: &'a UserId) -> CacheFuture<'a, ()>;
}

#[derive(Clone, Debug)]
struct CachedSet {
	permissions: PermissionSet,
	expires_at: OffsetDateTime,
}
impl CachedSet {
	fn is_stale_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at < instant
	}
}

/// In-process [`PermissionCache`] holding one entry per user.
///
/// Stale entries are evicted by the read that discovers them.
#[derive(Clone, Debug, Default)]
pub struct TtlPermissionCache(Arc<RwLock<HashMap<UserId, CachedSet>>>);
impl PermissionCache for TtlPermissionCache {
	fn get<'a>(
		&'a self,
		user: &'a UserId,
		now: OffsetDateTime,
	) -> CacheFuture<'a, Option<PermissionSet>> {
		let cache = self.0.clone();
		let user = user.to_owned();

		Box::pin(async move {
			{
				let guard = cache.read();

				match guard.get(&user) {
					Some(cached) if !cached.is_stale_at(now) =>
						return Some(cached.permissions.clone()),
					Some(_) => (),
					None => return None,
				}
			}

			// Re-check under the write lock; another task may have refreshed the entry since
			// the read lock was released.
			let mut guard = cache.write();

			if guard.get(&user).is_some_and(|cached| cached.is_stale_at(now)) {
				guard.remove(&user);
			}

			None
		})
	}

	fn set(
		&self,
		user: UserId,
		permissions: PermissionSet,
		expires_at: OffsetDateTime,
	) -> CacheFuture<'_, ()> {
		let cache = self.0.clone();

		Box::pin(async move {
			cache.write().insert(user, CachedSet { permissions, expires_at });
		})
	}

	fn delete<'a>(&'a self, user: &'a UserId) -> CacheFuture<'a, ()> {
		let cache = self.0.clone();
		let user = user.to_owned();

		Box::pin(async move {
			cache.write().remove(&user);
		})
	}
}
