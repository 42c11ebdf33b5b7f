//! Rust's turnkey OAuth 2.0 authority - mint single-use codes, HS256 access tokens, RBAC
//! decisions, and fail-closed guards behind pluggable stores in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

#[cfg(test)] use oauth2_authority as _;

pub mod audit;
pub mod auth;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod flows;
pub mod guard;
pub mod obs;
pub mod rbac;
pub mod store;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use time::macros::datetime;
	// self
	use crate::{
		audit::MemoryAuditSink,
		auth::ClientId,
		client::ClientRecord,
		clock::ManualClock,
		config::AuthorityConfig,
		flows::Authority,
		rbac::{RbacEngine, TtlPermissionCache},
		store::MemoryStore,
	};

	/// Base instant for manual-clock tests.
	pub const TEST_EPOCH: OffsetDateTime = datetime!(2026-01-01 00:00:00 UTC);
	/// Issuer baked into test configurations.
	pub const TEST_ISSUER: &str = "https://authority.test";
	/// Signing secret baked into test configurations.
	pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

	/// Authority plus the injected collaborators integration tests poke at.
	pub struct TestAuthority {
		/// Facade under test.
		pub authority: Authority,
		/// Shared in-memory store backing the facade.
		pub store: Arc<MemoryStore>,
		/// Audit sink the facade appends to.
		pub audit: Arc<MemoryAuditSink>,
		/// Manually driven clock.
		pub clock: Arc<ManualClock>,
	}

	/// RBAC engine plus the injected collaborators integration tests poke at.
	pub struct TestEngine {
		/// Engine under test.
		pub engine: RbacEngine,
		/// Shared in-memory store backing the engine.
		pub store: Arc<MemoryStore>,
		/// Audit sink the engine appends to.
		pub audit: Arc<MemoryAuditSink>,
		/// Manually driven clock.
		pub clock: Arc<ManualClock>,
	}

	/// Builds the configuration used across tests.
	pub fn test_config() -> AuthorityConfig {
		AuthorityConfig::new(TEST_ISSUER, TEST_SECRET)
	}

	/// Constructs an authority over a fresh in-memory store, audit sink, and manual clock.
	pub fn build_test_authority() -> TestAuthority {
		let store = Arc::new(MemoryStore::default());
		let audit = Arc::new(MemoryAuditSink::default());
		let clock = Arc::new(ManualClock::new(TEST_EPOCH));
		let authority = Authority::new(test_config(), store.clone(), audit.clone(), clock.clone())
			.expect("Test configuration should be valid.");

		TestAuthority { authority, store, audit, clock }
	}

	/// Constructs an RBAC engine over a fresh in-memory store, TTL cache, and manual clock.
	pub fn build_test_engine() -> TestEngine {
		let store = Arc::new(MemoryStore::default());
		let audit = Arc::new(MemoryAuditSink::default());
		let clock = Arc::new(ManualClock::new(TEST_EPOCH));
		let engine = RbacEngine::new(
			store.clone(),
			Arc::new(TtlPermissionCache::default()),
			audit.clone(),
			clock.clone(),
			Duration::minutes(5),
		);

		TestEngine { engine, store, audit, clock }
	}

	/// Registers an active client with the provided redirect URI and returns its record.
	pub async fn register_test_client(
		authority: &Authority,
		client_id: &str,
		secret: &str,
		redirect: &str,
	) -> ClientRecord {
		let id = ClientId::new(client_id).expect("Client identifier fixture should be valid.");
		let redirect = Url::parse(redirect).expect("Redirect fixture should parse successfully.");
		let record = ClientRecord::new(id, secret, redirect, TEST_EPOCH);

		authority
			.clients()
			.register(record.clone())
			.await
			.expect("Client registration fixture should succeed.");

		record
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap, HashSet, VecDeque},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
