//! Bearer strategy: the organization's user-identity endpoint decides, the token's own (unverified)
//! `exp` claim sizes the cache entry.

// self
use crate::{
	_prelude::*,
	auth::{
		BearerIdentity, PlatformHost, TokenSecret, TokenValidator, lifetime_until, peek_claims,
		validator::BEARER_NAMESPACE,
	},
	error::AuthValidationError,
};

impl TokenValidator {
	pub(super) async fn validate_bearer(
		&self,
		token: &TokenSecret,
		host: &PlatformHost,
	) -> Result<BearerIdentity, AuthValidationError> {
		let organization = host.organization();
		// Scoped per organization: a hit must never vouch for an org whose endpoint was not asked.
		let key = token.cache_key(&format!("{BEARER_NAMESPACE}:{organization}"));

		if let Some(user) = self.bearer_users.get(&key) {
			tracing::debug!(organization, "Bearer cache hit.");

			return Ok(BearerIdentity::from_user(organization, user));
		}

		let url = self.platform.user_identity_url(organization).map_err(|e| {
			tracing::error!(organization, error = %e, "User identity URL is invalid.");

			AuthValidationError::Rejected { reason: "invalid organization".into() }
		})?;
		let user: serde_json::Value =
			self.http.send_json(self.http.get(url).bearer_auth(token.expose())).await?;
		// Claims are read only after the platform accepted the token.
		let expires_at = peek_claims(token.expose()).and_then(|claims| claims.expires_at());
		let ttl = lifetime_until(expires_at, OffsetDateTime::now_utc(), self.bearer_fallback_ttl)?;

		self.bearer_users.set(key, user.clone(), ttl);

		let identity = BearerIdentity::from_user(organization, user);

		tracing::info!(
			organization,
			email = identity.email.as_deref().unwrap_or_default(),
			ttl_secs = ttl.whole_seconds(),
			"Bearer token validated."
		);

		Ok(identity)
	}
}
