//! Shared-link strategy: the platform's JWT validation endpoint decides, the payload's `exp`
//! claim sizes the cache entry.

// self
use crate::{
	_prelude::*,
	auth::{
		PlatformHost, SharedLinkIdentity, TokenSecret, TokenValidator, lifetime_until, unix_seconds,
		validator::SHARED_LINK_NAMESPACE,
	},
	error::AuthValidationError,
};

#[derive(Serialize)]
struct ValidationRequest<'a> {
	token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
	#[serde(default)]
	valid: bool,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	payload: Option<SharedLinkPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct SharedLinkPayload {
	#[serde(default)]
	shared_link_id: Option<serde_json::Value>,
	#[serde(default)]
	instance_id: Option<serde_json::Value>,
	#[serde(default)]
	org_id: Option<serde_json::Value>,
	#[serde(default)]
	org_name: Option<String>,
	#[serde(default)]
	exp: Option<serde_json::Value>,
}
impl SharedLinkPayload {
	fn into_identity(self) -> Result<SharedLinkIdentity, AuthValidationError> {
		Ok(SharedLinkIdentity {
			shared_link_id: required_id(self.shared_link_id, "shared_link_id")?,
			instance_id: required_id(self.instance_id, "instance_id")?,
			org_id: required_id(self.org_id, "org_id")?,
			org_name: self.org_name,
		})
	}
}

impl TokenValidator {
	pub(super) async fn validate_shared_link(
		&self,
		token: &TokenSecret,
		host: &PlatformHost,
	) -> Result<SharedLinkIdentity, AuthValidationError> {
		let key = token.cache_key(SHARED_LINK_NAMESPACE);

		if let Some(identity) = self.shared_links.get(&key) {
			tracing::debug!(shared_link_id = %identity.shared_link_id, "Shared-link cache hit.");

			return Ok(identity);
		}

		let url = self.platform.shared_link_validation_url(host).map_err(|e| {
			tracing::error!(host = %host, error = %e, "Shared-link validation URL is invalid.");

			AuthValidationError::Rejected { reason: "invalid platform host".into() }
		})?;
		let response: ValidationResponse = self
			.http
			.send_json(self.http.post(url).json(&ValidationRequest { token: token.expose() }))
			.await?;

		if !response.valid {
			return Err(AuthValidationError::Rejected {
				reason: response.error.unwrap_or_else(|| "token invalid".into()),
			});
		}

		let payload = response.payload.unwrap_or_default();
		let expires_at = payload.exp.as_ref().and_then(unix_seconds);
		let identity = payload.into_identity()?;
		let ttl =
			lifetime_until(expires_at, OffsetDateTime::now_utc(), self.shared_link_fallback_ttl)?;

		self.shared_links.set(key, identity.clone(), ttl);

		tracing::info!(
			shared_link_id = %identity.shared_link_id,
			instance_id = %identity.instance_id,
			ttl_secs = ttl.whole_seconds(),
			"Shared-link token validated."
		);

		Ok(identity)
	}
}

fn required_id(
	value: Option<serde_json::Value>,
	field: &'static str,
) -> Result<String, AuthValidationError> {
	let id = match value {
		Some(serde_json::Value::String(s)) if !s.is_empty() => s,
		Some(serde_json::Value::Number(n)) => n.to_string(),
		_ => return Err(AuthValidationError::MissingField { field }),
	};

	Ok(id)
}
