//! Token validation against the identity platform.
//!
//! [`TokenValidator`] owns one expiring cache per scheme and dispatches each request's
//! [`Credentials`] to exactly one strategy. A cache hit returns the identity without contacting
//! the platform; a miss calls the platform, and only successful validations are cached. Cache
//! lifetimes follow the token's `exp` claim so an entry never outlives the token it stands for.

mod bearer;
mod shared_link;

// self
use crate::{
	_prelude::*,
	auth::{AuthenticatedIdentity, Credentials, PlatformHost, SharedLinkIdentity},
	cache::TtlCache,
	config::{DEFAULT_BEARER_TTL, DEFAULT_SHARED_LINK_TTL, PlatformConfig},
	http::ReqwestHttpClient,
	obs::{self, Stage, StageOutcome, StageSpan},
};

/// Cache namespace for validated shared-link payloads.
pub const SHARED_LINK_NAMESPACE: &str = "shared_link";
/// Cache namespace for validated bearer users.
pub const BEARER_NAMESPACE: &str = "bearer";

/// Validates credentials against the identity platform with expiry-aware caching.
#[derive(Debug)]
pub struct TokenValidator {
	http: ReqwestHttpClient,
	platform: PlatformConfig,
	shared_links: Arc<TtlCache<SharedLinkIdentity>>,
	bearer_users: Arc<TtlCache<serde_json::Value>>,
	shared_link_fallback_ttl: Duration,
	bearer_fallback_ttl: Duration,
}
impl TokenValidator {
	/// Creates a validator with empty caches and default fallback lifetimes.
	pub fn new(http: ReqwestHttpClient, platform: PlatformConfig) -> Self {
		Self {
			http,
			platform,
			shared_links: Default::default(),
			bearer_users: Default::default(),
			shared_link_fallback_ttl: DEFAULT_SHARED_LINK_TTL,
			bearer_fallback_ttl: DEFAULT_BEARER_TTL,
		}
	}

	/// Overrides the lifetime used for shared-link payloads without an `exp` claim.
	pub fn with_shared_link_fallback_ttl(mut self, ttl: Duration) -> Self {
		self.shared_link_fallback_ttl = ttl;

		self
	}

	/// Overrides the lifetime used for bearer tokens without a readable `exp` claim.
	pub fn with_bearer_fallback_ttl(mut self, ttl: Duration) -> Self {
		self.bearer_fallback_ttl = ttl;

		self
	}

	/// Cache of validated shared-link payloads.
	pub fn shared_link_cache(&self) -> &Arc<TtlCache<SharedLinkIdentity>> {
		&self.shared_links
	}

	/// Cache of validated bearer user records.
	pub fn bearer_cache(&self) -> &Arc<TtlCache<serde_json::Value>> {
		&self.bearer_users
	}

	/// Platform addressing used by both strategies.
	pub fn platform(&self) -> &PlatformConfig {
		&self.platform
	}

	/// Validates `credentials` for a request resolved to `host`.
	pub async fn validate(
		&self,
		credentials: &Credentials,
		host: &PlatformHost,
	) -> Result<AuthenticatedIdentity> {
		const STAGE: Stage = Stage::Authentication;

		let auth_type = credentials.auth_type();
		let span = StageSpan::new(STAGE, auth_type.as_str());

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				let outcome = match credentials {
					Credentials::SharedLink(token) => self
						.validate_shared_link(token, host)
						.await
						.map(AuthenticatedIdentity::SharedLink),
					Credentials::Bearer(token) =>
						self.validate_bearer(token, host).await.map(AuthenticatedIdentity::Bearer),
				};

				outcome.map_err(|e| {
					tracing::warn!(
						auth_type = auth_type.as_str(),
						host = %host,
						error = %e,
						"Token validation failed."
					);

					Error::auth_validation(auth_type, e)
				})
			})
			.await;

		obs::record_stage_outcome(STAGE, StageOutcome::of(&result));

		result
	}
}
