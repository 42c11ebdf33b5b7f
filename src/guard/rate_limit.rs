//! Sliding-window rate limiting keyed by caller identifier and action category.
//!
//! The window holds raw request timestamps pruned to a one-hour horizon; the per-minute check
//! counts the trailing sixty seconds. Both checks and the append run under one lock so
//! concurrent callers never undercount.

// self
use crate::{_prelude::*, clock::Clock, store::StoreError};

/// Boxed future returned by [`RateLimitPolicy::check`].
pub type RateLimitFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RateDecision, StoreError>> + 'a + Send>>;

/// Strategy consulted before an authority operation proceeds.
///
/// Callers must fail closed: a policy error denies the request instead of bypassing the
/// limit.
pub trait RateLimitPolicy
where
	Self: Send + Sync,
{
	/// Evaluates whether the identifier may perform another action of this category.
	fn check<'a>(&'a self, identifier: &'a str, action: RateAction) -> RateLimitFuture<'a>;
}

/// Action categories with independent quotas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateAction {
	/// General API traffic.
	Api,
	/// Credential-sensitive attempts such as authorization and token exchange.
	Auth,
}
impl RateAction {
	/// Returns a stable label suitable for keys and log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RateAction::Api => "api",
			RateAction::Auth => "auth",
		}
	}
}
impl Display for RateAction {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request quota for one action category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuota {
	/// Maximum requests within any trailing sixty seconds.
	pub per_minute: u32,
	/// Maximum requests within any trailing hour.
	pub per_hour: u32,
}
impl RateQuota {
	/// Creates a quota from per-minute and per-hour ceilings.
	pub const fn new(per_minute: u32, per_hour: u32) -> Self {
		Self { per_minute, per_hour }
	}
}

/// Per-category quotas enforced by [`SlidingWindowLimiter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
	/// Quota for [`RateAction::Api`].
	pub api: RateQuota,
	/// Quota for [`RateAction::Auth`].
	pub auth: RateQuota,
}
impl RateLimitConfig {
	/// Overrides the API quota.
	pub fn api(mut self, quota: RateQuota) -> Self {
		self.api = quota;

		self
	}

	/// Overrides the auth quota.
	pub fn auth(mut self, quota: RateQuota) -> Self {
		self.auth = quota;

		self
	}

	/// Quota applied to an action category.
	pub fn quota_for(&self, action: RateAction) -> RateQuota {
		match action {
			RateAction::Api => self.api,
			RateAction::Auth => self.auth,
		}
	}
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self { api: RateQuota::new(60, 1_000), auth: RateQuota::new(5, 100) }
	}
}

/// Result of a rate-limit check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateDecision {
	/// The request may proceed; its timestamp has been recorded.
	Allow,
	/// The request is over quota and was not recorded.
	Deny(RetryDirective),
}

/// Advises callers when to retry after a [`RateDecision::Deny`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

type WindowKey = (String, RateAction);

/// In-process [`RateLimitPolicy`] enforcing [`RateLimitConfig`] quotas.
pub struct SlidingWindowLimiter {
	config: RateLimitConfig,
	clock: Arc<dyn Clock>,
	windows: Mutex<HashMap<WindowKey, VecDeque<OffsetDateTime>>>,
}
impl SlidingWindowLimiter {
	/// Creates a limiter over the provided quotas and clock.
	pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
		Self { config, clock, windows: Mutex::new(HashMap::new()) }
	}

	fn check_now(&self, identifier: &str, action: RateAction) -> RateDecision {
		let now = self.clock.now();
		let quota = self.config.quota_for(action);
		let mut windows = self.windows.lock();
		let window = windows.entry((identifier.to_owned(), action)).or_default();

		// Timestamps are appended in clock order, so the horizon prune and the trailing-minute
		// count can both walk from an end of the deque.
		while window.front().is_some_and(|at| *at <= now - Duration::hours(1)) {
			window.pop_front();
		}

		let minute_floor = now - Duration::minutes(1);
		let within_minute = window.iter().rev().take_while(|at| **at > minute_floor).count();

		if within_minute >= quota.per_minute as usize {
			// A zero quota denies unconditionally and has no oldest entry to anchor on.
			let earliest_retry_at = if within_minute == 0 {
				now + Duration::minutes(1)
			} else {
				window[window.len() - within_minute] + Duration::minutes(1)
			};

			return RateDecision::Deny(
				RetryDirective::new(earliest_retry_at, earliest_retry_at - now)
					.with_reason(format!("per-minute quota exhausted for `{action}`")),
			);
		}
		if window.len() >= quota.per_hour as usize {
			// The prune above left only entries inside the hour, so the front is the one whose
			// departure frees a slot.
			let earliest_retry_at = match window.front() {
				Some(oldest) => *oldest + Duration::hours(1),
				None => now,
			};

			return RateDecision::Deny(
				RetryDirective::new(earliest_retry_at, earliest_retry_at - now)
					.with_reason(format!("hourly quota exhausted for `{action}`")),
			);
		}

		window.push_back(now);

		RateDecision::Allow
	}
}
impl RateLimitPolicy for SlidingWindowLimiter {
	fn check<'a>(&'a self, identifier: &'a str, action: RateAction) -> RateLimitFuture<'a> {
		Box::pin(async move { Ok(self.check_now(identifier, action)) })
	}
}
impl Debug for SlidingWindowLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SlidingWindowLimiter").field("config", &self.config).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn limiter(config: RateLimitConfig) -> (SlidingWindowLimiter, Arc<ManualClock>) {
		let clock = Arc::new(ManualClock::new(macros::datetime!(2026-01-01 00:00 UTC)));

		(SlidingWindowLimiter::new(config, clock.clone()), clock)
	}

	#[tokio::test]
	async fn the_sixty_first_call_within_a_minute_is_denied() {
		let (limiter, _clock) = limiter(RateLimitConfig::default());

		for _ in 0..60 {
			assert_eq!(
				limiter.check("203.0.113.9", RateAction::Api).await,
				Ok(RateDecision::Allow)
			);
		}

		let decision = limiter
			.check("203.0.113.9", RateAction::Api)
			.await
			.expect("In-process limiter should not error.");

		match decision {
			RateDecision::Deny(directive) => {
				assert_eq!(
					directive.earliest_retry_at,
					macros::datetime!(2026-01-01 00:01 UTC)
				);
				assert_eq!(directive.recommended_backoff, Duration::minutes(1));
			},
			RateDecision::Allow => panic!("The sixty-first call should be denied."),
		}
	}

	#[tokio::test]
	async fn the_window_slides_rather_than_resetting() {
		let config = RateLimitConfig::default().api(RateQuota::new(2, 100));
		let (limiter, clock) = limiter(config);

		assert_eq!(limiter.check("u", RateAction::Api).await, Ok(RateDecision::Allow));

		clock.advance(Duration::seconds(30));

		assert_eq!(limiter.check("u", RateAction::Api).await, Ok(RateDecision::Allow));
		assert!(matches!(
			limiter.check("u", RateAction::Api).await,
			Ok(RateDecision::Deny(_))
		));

		// 61 seconds after the first call it has left the minute window; the second has not.
		clock.advance(Duration::seconds(31));

		assert_eq!(limiter.check("u", RateAction::Api).await, Ok(RateDecision::Allow));
	}

	#[tokio::test]
	async fn the_hourly_ceiling_holds_even_when_requests_are_spread_out() {
		let config = RateLimitConfig::default().auth(RateQuota::new(100, 3));
		let (limiter, clock) = limiter(config);

		for _ in 0..3 {
			assert_eq!(limiter.check("c1", RateAction::Auth).await, Ok(RateDecision::Allow));

			clock.advance(Duration::minutes(2));
		}

		let decision =
			limiter.check("c1", RateAction::Auth).await.expect("In-process limiter should not error.");

		match decision {
			RateDecision::Deny(directive) => {
				assert!(directive.reason.is_some_and(|reason| reason.contains("hourly")));
			},
			RateDecision::Allow => panic!("The fourth call should exceed the hourly quota."),
		}

		// One hour after the first call a slot frees up.
		clock.advance(Duration::minutes(55));

		assert_eq!(limiter.check("c1", RateAction::Auth).await, Ok(RateDecision::Allow));
	}

	#[tokio::test]
	async fn identifiers_and_actions_have_independent_windows() {
		let config = RateLimitConfig::default().auth(RateQuota::new(1, 100));
		let (limiter, _clock) = limiter(config);

		assert_eq!(limiter.check("c1", RateAction::Auth).await, Ok(RateDecision::Allow));
		assert!(matches!(limiter.check("c1", RateAction::Auth).await, Ok(RateDecision::Deny(_))));
		// A different client and a different category are unaffected.
		assert_eq!(limiter.check("c2", RateAction::Auth).await, Ok(RateDecision::Allow));
		assert_eq!(limiter.check("c1", RateAction::Api).await, Ok(RateDecision::Allow));
	}

	#[tokio::test]
	async fn denied_calls_are_not_recorded_against_the_window() {
		let config = RateLimitConfig::default().api(RateQuota::new(1, 100));
		let (limiter, clock) = limiter(config);

		assert_eq!(limiter.check("u", RateAction::Api).await, Ok(RateDecision::Allow));

		for _ in 0..5 {
			assert!(matches!(
				limiter.check("u", RateAction::Api).await,
				Ok(RateDecision::Deny(_))
			));
		}

		clock.advance(Duration::seconds(61));

		// Only the accepted call occupied the window; the denials left no trace.
		assert_eq!(limiter.check("u", RateAction::Api).await, Ok(RateDecision::Allow));
	}
}
