//! Secure token secret wrapper that redacts sensitive material.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the wrapped value is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Cache key for this secret inside `namespace`.
	///
	/// The key is the base64url (no padding) SHA-256 digest of the full secret, so two tokens
	/// that share a long prefix never collide and the raw token never becomes a map key.
	pub fn cache_key(&self, namespace: &str) -> String {
		let digest = Sha256::digest(self.0.as_bytes());

		format!("{namespace}:{}", URL_SAFE_NO_PAD.encode(digest))
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn cache_keys_distinguish_shared_prefixes() {
		let prefix = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
		let lhs = TokenSecret::new(format!("{prefix}.first"));
		let rhs = TokenSecret::new(format!("{prefix}.second"));

		assert_ne!(lhs.cache_key("bearer"), rhs.cache_key("bearer"));
		assert_eq!(lhs.cache_key("bearer"), lhs.clone().cache_key("bearer"));
		assert_ne!(lhs.cache_key("bearer"), lhs.cache_key("shared_link"));
		assert!(lhs.cache_key("bearer").starts_with("bearer:"));
		assert!(!lhs.cache_key("bearer").contains(prefix));
	}
}
