//! Authority configuration surface with validated construction.

// self
use crate::{_prelude::*, guard::RateLimitConfig, token::TokenSecret};

/// Errors raised when a configuration cannot be used to build an authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ConfigError {
	/// The JWT signing secret was empty.
	#[error("JWT signing secret cannot be empty.")]
	EmptySecret,
	/// The issuer string was empty.
	#[error("Issuer cannot be empty.")]
	EmptyIssuer,
	/// A lifetime was zero or negative.
	#[error("{field} must be positive.")]
	NonPositiveTtl {
		/// Name of the offending configuration field.
		field: &'static str,
	},
}

/// Tunable surface of the authority.
///
/// Defaults follow the published contract: one-hour access tokens, thirty-day refresh tokens,
/// ten-minute authorization codes, one-hour CSRF tokens, and a five-minute permission cache.
/// Deserialization applies the same defaults, so a config file only has to name the issuer and
/// the signing secret.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorityConfig {
	/// Issuer written into the `iss` claim of every minted token.
	pub issuer: String,
	/// HMAC-SHA256 signing secret.
	pub jwt_secret: TokenSecret,
	/// Access-token lifetime.
	#[serde(default = "default_access_token_ttl")]
	pub access_token_ttl: Duration,
	/// Refresh-token lifetime.
	#[serde(default = "default_refresh_token_ttl")]
	pub refresh_token_ttl: Duration,
	/// Authorization-code lifetime.
	#[serde(default = "default_auth_code_ttl")]
	pub auth_code_ttl: Duration,
	/// Anti-forgery token lifetime.
	#[serde(default = "default_csrf_token_ttl")]
	pub csrf_token_ttl: Duration,
	/// Resolved permission set cache lifetime.
	#[serde(default = "default_permission_cache_ttl")]
	pub permission_cache_ttl: Duration,
	/// Per-category request quotas.
	#[serde(default)]
	pub rate_limits: RateLimitConfig,
}
impl AuthorityConfig {
	/// Creates a configuration with contract defaults for every lifetime.
	pub fn new(issuer: impl Into<String>, jwt_secret: impl Into<TokenSecret>) -> Self {
		Self {
			issuer: issuer.into(),
			jwt_secret: jwt_secret.into(),
			access_token_ttl: default_access_token_ttl(),
			refresh_token_ttl: default_refresh_token_ttl(),
			auth_code_ttl: default_auth_code_ttl(),
			csrf_token_ttl: default_csrf_token_ttl(),
			permission_cache_ttl: default_permission_cache_ttl(),
			rate_limits: RateLimitConfig::default(),
		}
	}

	/// Overrides the access-token lifetime.
	pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
		self.access_token_ttl = ttl;

		self
	}

	/// Overrides the refresh-token lifetime.
	pub fn refresh_token_ttl(mut self, ttl: Duration) -> Self {
		self.refresh_token_ttl = ttl;

		self
	}

	/// Overrides the authorization-code lifetime.
	pub fn auth_code_ttl(mut self, ttl: Duration) -> Self {
		self.auth_code_ttl = ttl;

		self
	}

	/// Overrides the anti-forgery token lifetime.
	pub fn csrf_token_ttl(mut self, ttl: Duration) -> Self {
		self.csrf_token_ttl = ttl;

		self
	}

	/// Overrides the permission cache lifetime.
	pub fn permission_cache_ttl(mut self, ttl: Duration) -> Self {
		self.permission_cache_ttl = ttl;

		self
	}

	/// Overrides the request quotas.
	pub fn rate_limits(mut self, rate_limits: RateLimitConfig) -> Self {
		self.rate_limits = rate_limits;

		self
	}

	/// Checks the configuration for values that would produce a broken authority.
	///
	/// A non-empty secret here is what lets the signer treat HMAC key construction as
	/// infallible later.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.jwt_secret.expose().is_empty() {
			return Err(ConfigError::EmptySecret);
		}
		if self.issuer.is_empty() {
			return Err(ConfigError::EmptyIssuer);
		}

		for (field, ttl) in [
			("access_token_ttl", self.access_token_ttl),
			("refresh_token_ttl", self.refresh_token_ttl),
			("auth_code_ttl", self.auth_code_ttl),
			("csrf_token_ttl", self.csrf_token_ttl),
			("permission_cache_ttl", self.permission_cache_ttl),
		] {
			if !ttl.is_positive() {
				return Err(ConfigError::NonPositiveTtl { field });
			}
		}

		Ok(())
	}
}

fn default_access_token_ttl() -> Duration {
	Duration::seconds(3_600)
}

fn default_refresh_token_ttl() -> Duration {
	Duration::seconds(2_592_000)
}

fn default_auth_code_ttl() -> Duration {
	Duration::seconds(600)
}

fn default_csrf_token_ttl() -> Duration {
	Duration::seconds(3_600)
}

fn default_permission_cache_ttl() -> Duration {
	Duration::seconds(300)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_follow_the_published_contract() {
		let config = AuthorityConfig::new("https://authority.test", TokenSecret::new("secret"));

		assert_eq!(config.access_token_ttl, Duration::seconds(3_600));
		assert_eq!(config.refresh_token_ttl, Duration::days(30));
		assert_eq!(config.auth_code_ttl, Duration::seconds(600));
		assert_eq!(config.csrf_token_ttl, Duration::seconds(3_600));
		assert_eq!(config.permission_cache_ttl, Duration::seconds(300));
		assert!(config.validate().is_ok());
	}

	#[test]
	fn deserialization_fills_missing_lifetimes_with_defaults() {
		let config: AuthorityConfig = serde_json::from_str(
			"{\"issuer\":\"https://authority.test\",\"jwt_secret\":\"secret\"}",
		)
		.expect("A minimal config should deserialize successfully.");

		assert_eq!(config.issuer, "https://authority.test");
		assert_eq!(config.access_token_ttl, Duration::seconds(3_600));
		assert_eq!(config.auth_code_ttl, Duration::seconds(600));
		assert_eq!(config.rate_limits, RateLimitConfig::default());
	}

	#[test]
	fn validation_rejects_empty_credentials_and_dead_ttls() {
		let empty_secret = AuthorityConfig::new("https://authority.test", TokenSecret::new(""));

		assert_eq!(empty_secret.validate(), Err(ConfigError::EmptySecret));

		let empty_issuer = AuthorityConfig::new("", TokenSecret::new("secret"));

		assert_eq!(empty_issuer.validate(), Err(ConfigError::EmptyIssuer));

		let dead_ttl = AuthorityConfig::new("https://authority.test", TokenSecret::new("secret"))
			.auth_code_ttl(Duration::ZERO);

		assert_eq!(
			dead_ttl.validate(),
			Err(ConfigError::NonPositiveTtl { field: "auth_code_ttl" })
		);
	}
}
