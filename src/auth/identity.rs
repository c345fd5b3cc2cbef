//! Authenticated caller identities produced by the validator strategies.

// self
use crate::_prelude::*;

/// Authentication scheme a request used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
	/// `SharedLink <jwt>`: link-based, non-interactive access grant.
	SharedLink,
	/// `Bearer <token>`: platform user access token.
	Bearer,
}
impl AuthType {
	/// Returns a stable label suitable for span, metric, or response fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthType::SharedLink => "shared_link",
			AuthType::Bearer => "bearer",
		}
	}
}
impl Display for AuthType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Validated shared-link payload; this is what the shared-link cache stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SharedLinkIdentity {
	/// Shared link identifier.
	pub shared_link_id: String,
	/// Platform instance the link belongs to.
	pub instance_id: String,
	/// Owning organization identifier.
	pub org_id: String,
	/// Owning organization display name, when the platform supplies one.
	pub org_name: Option<String>,
}

/// Platform user behind a validated bearer token.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BearerIdentity {
	/// Organization subdomain the token was validated against.
	pub organization: String,
	/// User email, when the user record carries one.
	pub email: Option<String>,
	/// Raw user record returned by the platform.
	pub user: serde_json::Value,
}
impl BearerIdentity {
	/// Builds an identity from the raw user record.
	pub fn from_user(organization: impl Into<String>, user: serde_json::Value) -> Self {
		let email = user.get("email").and_then(serde_json::Value::as_str).map(str::to_owned);

		Self { organization: organization.into(), email, user }
	}
}

/// Exactly one authenticated caller per request.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthenticatedIdentity {
	/// Caller presented a valid shared-link token.
	SharedLink(SharedLinkIdentity),
	/// Caller presented a valid bearer token.
	Bearer(BearerIdentity),
}
impl AuthenticatedIdentity {
	/// Scheme that produced this identity.
	pub fn auth_type(&self) -> AuthType {
		match self {
			Self::SharedLink(_) => AuthType::SharedLink,
			Self::Bearer(_) => AuthType::Bearer,
		}
	}

	/// Organization label surfaced to clients: the org name for shared links, the subdomain for
	/// bearer users.
	pub fn organization(&self) -> Option<&str> {
		match self {
			Self::SharedLink(link) => link.org_name.as_deref(),
			Self::Bearer(user) => Some(user.organization.as_str()),
		}
	}
}
