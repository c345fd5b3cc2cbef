//! Authorization header parsing into the two supported credential schemes.

// self
use crate::{
	_prelude::*,
	auth::{AuthType, TokenSecret},
	error::AuthSchemeError,
};

const SHARED_LINK_PREFIX: &str = "SharedLink ";
const BEARER_PREFIX: &str = "Bearer ";

/// Credentials carried by the Authorization header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
	/// `SharedLink <jwt>`.
	SharedLink(TokenSecret),
	/// `Bearer <token>`.
	Bearer(TokenSecret),
}
impl Credentials {
	/// Parses the raw Authorization header value.
	///
	/// Scheme prefixes are case-sensitive and must be followed by a single space and a
	/// non-empty token.
	pub fn from_header(header: Option<&str>) -> Result<Self, AuthSchemeError> {
		let header = header.ok_or(AuthSchemeError::Missing)?;

		if let Some(token) = header.strip_prefix(SHARED_LINK_PREFIX) {
			return Ok(Self::SharedLink(non_empty_token(token)?));
		}
		if let Some(token) = header.strip_prefix(BEARER_PREFIX) {
			return Ok(Self::Bearer(non_empty_token(token)?));
		}

		Err(AuthSchemeError::Unrecognized)
	}

	/// Scheme of these credentials.
	pub fn auth_type(&self) -> AuthType {
		match self {
			Self::SharedLink(_) => AuthType::SharedLink,
			Self::Bearer(_) => AuthType::Bearer,
		}
	}

	/// Token carried by the header.
	pub fn token(&self) -> &TokenSecret {
		match self {
			Self::SharedLink(token) | Self::Bearer(token) => token,
		}
	}
}
impl FromStr for Credentials {
	type Err = AuthSchemeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_header(Some(s))
	}
}

fn non_empty_token(raw: &str) -> Result<TokenSecret, AuthSchemeError> {
	let token = raw.trim();

	if token.is_empty() {
		return Err(AuthSchemeError::Unrecognized);
	}

	Ok(TokenSecret::new(token))
}
