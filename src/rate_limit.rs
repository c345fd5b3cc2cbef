//! Admission control consulted before a request reaches authentication.
//!
//! [`RateLimitPolicy`] is the seam; [`FixedWindowLimiter`] is the built-in policy. It keeps one
//! [`RateWindow`] per identifier and admits at most `ceiling` requests per window. Being a fixed
//! window, it tolerates bursts of up to twice the ceiling around a window boundary; deployments
//! that need a strict sliding window should supply another policy.

// std
use std::net::IpAddr;
// self
use crate::{_prelude::*, sweep::Sweep};

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::seconds(60);
/// Default number of admitted requests per window.
pub const DEFAULT_CEILING: u32 = 60;

/// Strategy that decides whether the next request from an identifier may proceed.
pub trait RateLimitPolicy
where
	Self: Send + Sync,
{
	/// Evaluates (and records) one request described by `context`.
	fn evaluate(&self, context: &RateLimitContext) -> RateLimitDecision;
}

/// Context shared with a [`RateLimitPolicy`] for one inbound request.
#[derive(Clone, Debug)]
pub struct RateLimitContext {
	/// Identifier the request is accounted against.
	pub identifier: String,
	/// Timestamp the gateway observed before invoking the policy.
	pub observed_at: OffsetDateTime,
}
impl RateLimitContext {
	/// Creates a context for `identifier` observed now.
	pub fn new(identifier: impl Into<String>) -> Self {
		Self { identifier: identifier.into(), observed_at: OffsetDateTime::now_utc() }
	}

	/// Picks the identifier for a request: the raw Authorization header when present, otherwise
	/// the caller's network address.
	///
	/// Authenticated callers are therefore limited per credential regardless of address, and
	/// anonymous callers per address.
	pub fn for_request(authorization: Option<&str>, remote_addr: Option<IpAddr>) -> Self {
		let identifier = match (authorization, remote_addr) {
			(Some(header), _) if !header.is_empty() => header.to_owned(),
			(_, Some(addr)) => addr.to_string(),
			_ => "unknown".to_owned(),
		};

		Self::new(identifier)
	}

	/// Overrides the timestamp associated with the observation.
	pub fn with_observed_at(mut self, instant: OffsetDateTime) -> Self {
		self.observed_at = instant;

		self
	}
}

/// Result emitted by a [`RateLimitPolicy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request is refused until the directive's instant.
	Deny(RetryDirective),
}
impl RateLimitDecision {
	/// Returns `true` for [`RateLimitDecision::Allow`].
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow)
	}
}

/// Advises callers when to retry after a [`RateLimitDecision::Deny`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when the caller's window resets.
	pub earliest_retry_at: OffsetDateTime,
	/// Time remaining until the reset, relative to the denied observation.
	pub retry_after: Duration,
}
impl RetryDirective {
	/// Creates a directive from the window reset instant and the denied observation instant.
	pub fn new(earliest_retry_at: OffsetDateTime, observed_at: OffsetDateTime) -> Self {
		Self { earliest_retry_at, retry_after: earliest_retry_at - observed_at }
	}

	/// Whole seconds to wait, rounded up and never below one.
	pub fn retry_after_secs(&self) -> u64 {
		let millis = self.retry_after.whole_milliseconds().max(0);
		let secs = (millis + 999) / 1_000;

		u64::try_from(secs).unwrap_or(u64::MAX).max(1)
	}
}

/// Request counter for a single identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateWindow {
	/// Requests admitted in the current window.
	pub count: u32,
	/// Instant the current window ends.
	pub reset_at: OffsetDateTime,
}

/// Fixed-window rate limiter keyed by identifier.
#[derive(Debug)]
pub struct FixedWindowLimiter {
	windows: Mutex<HashMap<String, RateWindow>>,
	window: Duration,
	ceiling: u32,
}
impl FixedWindowLimiter {
	/// Creates a limiter admitting `ceiling` requests per `window`.
	pub fn new(window: Duration, ceiling: u32) -> Self {
		Self { windows: Default::default(), window, ceiling }
	}

	/// Configured window length.
	pub fn window(&self) -> Duration {
		self.window
	}

	/// Configured per-window ceiling.
	pub fn ceiling(&self) -> u32 {
		self.ceiling
	}

	/// Convenience wrapper that evaluates `identifier` at the current instant.
	pub fn admit(&self, identifier: &str) -> RateLimitDecision {
		self.evaluate(&RateLimitContext::new(identifier))
	}

	/// Current window for `identifier`, if one is tracked.
	pub fn window_for(&self, identifier: &str) -> Option<RateWindow> {
		self.windows.lock().get(identifier).copied()
	}

	/// Number of tracked identifiers.
	pub fn tracked(&self) -> usize {
		self.windows.lock().len()
	}
}
impl Default for FixedWindowLimiter {
	fn default() -> Self {
		Self::new(DEFAULT_WINDOW, DEFAULT_CEILING)
	}
}
impl RateLimitPolicy for FixedWindowLimiter {
	fn evaluate(&self, context: &RateLimitContext) -> RateLimitDecision {
		let now = context.observed_at;
		let fresh = RateWindow { count: 1, reset_at: now + self.window };
		let mut windows = self.windows.lock();
		let Some(current) = windows.get_mut(&context.identifier) else {
			windows.insert(context.identifier.clone(), fresh);

			return RateLimitDecision::Allow;
		};

		if now > current.reset_at {
			*current = fresh;

			return RateLimitDecision::Allow;
		}
		if current.count < self.ceiling {
			current.count += 1;

			return RateLimitDecision::Allow;
		}

		RateLimitDecision::Deny(RetryDirective::new(current.reset_at, now))
	}
}
impl Sweep for FixedWindowLimiter {
	const LABEL: &'static str = "rate_limiter";

	fn sweep_at(&self, now: OffsetDateTime) -> usize {
		let mut windows = self.windows.lock();
		let before = windows.len();

		windows.retain(|_, window| now <= window.reset_at);

		before - windows.len()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn at(identifier: &str, instant: OffsetDateTime) -> RateLimitContext {
		RateLimitContext::new(identifier).with_observed_at(instant)
	}

	#[test]
	fn ceiling_plus_one_is_denied_with_positive_retry() {
		let limiter = FixedWindowLimiter::new(Duration::seconds(60), 3);
		let start = macros::datetime!(2025-03-01 09:00 UTC);

		for offset in 0..3 {
			assert!(limiter.evaluate(&at("caller", start + Duration::seconds(offset))).is_allowed());
		}

		let decision = limiter.evaluate(&at("caller", start + Duration::seconds(20)));
		let RateLimitDecision::Deny(directive) = decision else {
			panic!("Fourth request inside the window must be denied.");
		};

		assert_eq!(directive.earliest_retry_at, start + Duration::seconds(60));
		assert_eq!(directive.retry_after_secs(), 40);
	}

	#[test]
	fn window_resets_after_expiry() {
		let limiter = FixedWindowLimiter::new(Duration::seconds(60), 1);
		let start = macros::datetime!(2025-03-01 09:00 UTC);

		assert!(limiter.evaluate(&at("caller", start)).is_allowed());
		assert!(!limiter.evaluate(&at("caller", start + Duration::seconds(60))).is_allowed());
		assert!(limiter.evaluate(&at("caller", start + Duration::seconds(61))).is_allowed());

		let window = limiter.window_for("caller").expect("Window should be tracked after reset.");

		assert_eq!(window.count, 1);
		assert_eq!(window.reset_at, start + Duration::seconds(121));
	}

	#[test]
	fn identifiers_are_isolated() {
		let limiter = FixedWindowLimiter::new(Duration::seconds(60), 1);
		let start = macros::datetime!(2025-03-01 09:00 UTC);

		assert!(limiter.evaluate(&at("a", start)).is_allowed());
		assert!(limiter.evaluate(&at("b", start)).is_allowed());
		assert!(!limiter.evaluate(&at("a", start)).is_allowed());
		assert_eq!(limiter.tracked(), 2);
	}

	#[test]
	fn retry_after_rounds_up_sub_second_remainders() {
		let start = macros::datetime!(2025-03-01 09:00 UTC);
		let directive =
			RetryDirective::new(start + Duration::milliseconds(1_200), start);

		assert_eq!(directive.retry_after_secs(), 2);
		assert_eq!(RetryDirective::new(start, start).retry_after_secs(), 1);
	}

	#[test]
	fn identifier_prefers_authorization_header() {
		let addr: IpAddr = "10.0.0.7".parse().expect("Fixture address should parse.");

		assert_eq!(
			RateLimitContext::for_request(Some("Bearer abc"), Some(addr)).identifier,
			"Bearer abc"
		);
		assert_eq!(RateLimitContext::for_request(None, Some(addr)).identifier, "10.0.0.7");
		assert_eq!(RateLimitContext::for_request(Some(""), None).identifier, "unknown");
	}

	#[test]
	fn sweep_drops_elapsed_windows() {
		let limiter = FixedWindowLimiter::new(Duration::seconds(60), 5);
		let start = macros::datetime!(2025-03-01 09:00 UTC);

		limiter.evaluate(&at("old", start));
		limiter.evaluate(&at("new", start + Duration::seconds(50)));

		assert_eq!(limiter.sweep_at(start + Duration::seconds(70)), 1);
		assert!(limiter.window_for("old").is_none());
		assert!(limiter.window_for("new").is_some());
	}
}
