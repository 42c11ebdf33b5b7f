//! Fail-closed request guards: sliding-window rate limiting and anti-forgery tokens.

pub mod csrf;
pub mod rate_limit;

pub use csrf::CsrfGuard;
pub use rate_limit::{
	RateAction, RateDecision, RateLimitConfig, RateLimitFuture, RateLimitPolicy, RateQuota,
	RetryDirective, SlidingWindowLimiter,
};
