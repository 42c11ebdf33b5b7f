//! File-backed [`AuthStore`] for single-node deployments that must survive restarts.
//!
//! The RBAC graph stays in memory-backed stores; only credential state is persisted here.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::ClientId,
	client::{ClientRecord, ClientStatus},
	store::{AuthStore, ClaimOutcome, StoreError, StoreFuture},
	token::{AuthCodeRecord, RefreshTokenRecord, RevocationEntry},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
	clients: Vec<ClientRecord>,
	codes: Vec<AuthCodeRecord>,
	refresh_tokens: Vec<RefreshTokenRecord>,
	revocations: Vec<RevocationEntry>,
}

#[derive(Debug, Default)]
struct Inner {
	clients: HashMap<ClientId, ClientRecord>,
	codes: HashMap<String, AuthCodeRecord>,
	refresh_tokens: HashMap<String, RefreshTokenRecord>,
	revocations: HashMap<String, RevocationEntry>,
}
impl Inner {
	fn from_snapshot(snapshot: Snapshot) -> Self {
		Self {
			clients: snapshot
				.clients
				.into_iter()
				.map(|record| (record.client_id.clone(), record))
				.collect(),
			codes: snapshot
				.codes
				.into_iter()
				.map(|record| (record.code.expose().to_owned(), record))
				.collect(),
			refresh_tokens: snapshot
				.refresh_tokens
				.into_iter()
				.map(|record| (record.token.expose().to_owned(), record))
				.collect(),
			revocations: snapshot
				.revocations
				.into_iter()
				.map(|entry| (entry.jti.clone(), entry))
				.collect(),
		}
	}

	fn snapshot(&self) -> Snapshot {
		Snapshot {
			clients: self.clients.values().cloned().collect(),
			codes: self.codes.values().cloned().collect(),
			refresh_tokens: self.refresh_tokens.values().cloned().collect(),
			revocations: self.revocations.values().cloned().collect(),
		}
	}
}

/// Persists credential state to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Inner>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { Snapshot::default() };

		Ok(Self { path, inner: Arc::new(RwLock::new(Inner::from_snapshot(snapshot))) })
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Snapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		// Path-tracking deserialization so a corrupt snapshot names the failing field.
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to parse {}: {e}", path.display()) }
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &Inner) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(&contents.snapshot()).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize store snapshot: {e}") }
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl AuthStore for FileStore {
	fn put_client(&self, record: ClientRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.clients.insert(record.client_id.clone(), record);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn client<'a>(&'a self, client: &'a ClientId) -> StoreFuture<'a, Option<ClientRecord>> {
		Box::pin(async move { Ok(self.inner.read().clients.get(client).cloned()) })
	}

	fn set_client_status<'a>(
		&'a self,
		client: &'a ClientId,
		status: ClientStatus,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			match guard.clients.get_mut(client) {
				Some(record) => {
					record.status = status;

					self.persist_locked(&guard)?;

					Ok(true)
				},
				None => Ok(false),
			}
		})
	}

	fn put_code(&self, record: AuthCodeRecord, now: OffsetDateTime) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.codes.retain(|_, stored| !stored.is_expired_at(now));
			guard.codes.insert(record.code.expose().to_owned(), record);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn claim_code<'a>(&'a self, code: &'a str) -> StoreFuture<'a, ClaimOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			match guard.codes.remove(code) {
				Some(record) => {
					self.persist_locked(&guard)?;

					Ok(ClaimOutcome::Claimed(record))
				},
				None => Ok(ClaimOutcome::Missing),
			}
		})
	}

	fn put_refresh_token(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.refresh_tokens.insert(record.token.expose().to_owned(), record);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn refresh_token<'a>(
		&'a self,
		token: &'a str,
	) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().refresh_tokens.get(token).cloned()) })
	}

	fn delete_refresh_token<'a>(&'a self, token: &'a str) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			match guard.refresh_tokens.remove(token) {
				Some(_) => {
					self.persist_locked(&guard)?;

					Ok(true)
				},
				None => Ok(false),
			}
		})
	}

	fn put_revocation(&self, entry: RevocationEntry, now: OffsetDateTime) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.revocations.retain(|_, stored| !stored.is_expired_at(now));
			guard.revocations.insert(entry.jti.clone(), entry);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn is_revoked<'a>(&'a self, jti: &'a str, now: OffsetDateTime) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			Ok(self
				.inner
				.read()
				.revocations
				.get(jti)
				.is_some_and(|entry| !entry.is_expired_at(now)))
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::ScopeSet;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"oauth2_authority_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn client_fixture() -> ClientRecord {
		ClientRecord::new(
			ClientId::new("client-file").expect("Client fixture should be valid."),
			"file-secret",
			Url::parse("https://app.test/callback").expect("Redirect fixture should parse."),
			OffsetDateTime::now_utc(),
		)
	}

	fn code_fixture(now: OffsetDateTime) -> AuthCodeRecord {
		AuthCodeRecord::new(
			crate::token::TokenSecret::new("c".repeat(32)),
			ClientId::new("client-file").expect("Client fixture should be valid."),
			ScopeSet::new(["profile"]).expect("Scope fixture should be valid."),
			"https://app.test/callback",
			now,
			now + Duration::minutes(10),
		)
	}

	#[test]
	fn snapshot_survives_reopen_and_codes_stay_single_use() {
		let path = temp_path();
		let now = OffsetDateTime::now_utc();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.put_client(client_fixture()))
			.expect("Failed to persist client fixture.");
		rt.block_on(store.put_code(code_fixture(now), now))
			.expect("Failed to persist code fixture.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let client_id = ClientId::new("client-file").expect("Client fixture should be valid.");
		let fetched = rt
			.block_on(reopened.client(&client_id))
			.expect("Failed to fetch client after reopen.")
			.expect("File store lost the client after reopen.");

		assert!(fetched.verify_secret("file-secret"));

		let code = "c".repeat(32);
		let first = rt.block_on(reopened.claim_code(&code)).expect("First claim should succeed.");

		assert!(matches!(first, ClaimOutcome::Claimed(_)));

		let second =
			rt.block_on(reopened.claim_code(&code)).expect("Second claim should not error.");

		assert_eq!(second, ClaimOutcome::Missing);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshots_report_a_parse_error() {
		let path = temp_path();

		fs::write(&path, b"{\"clients\": [{\"client_id\": 42}]}")
			.expect("Failed to seed corrupt snapshot.");

		let error = FileStore::open(&path).expect_err("Corrupt snapshot should fail to load.");

		assert!(matches!(error, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
