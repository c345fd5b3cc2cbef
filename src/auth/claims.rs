//! Untrusted claims peek and expiry-derived cache lifetimes.
//!
//! [`peek_claims`] decodes the middle segment of a JWT-shaped token without checking its
//! signature. The result only sizes cache lifetimes; it never decides whether a caller is
//! authenticated. Authenticity comes solely from the identity platform's response.

// crates.io
use base64::{
	Engine as _, alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::{_prelude::*, error::AuthValidationError};

const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims read from an unverified token body.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct UnverifiedClaims {
	/// Raw `exp` claim, when present.
	#[serde(default)]
	pub exp: Option<serde_json::Value>,
}
impl UnverifiedClaims {
	/// Expiry as a Unix timestamp, if the claim is numeric.
	pub fn expires_at(&self) -> Option<i64> {
		self.exp.as_ref().and_then(unix_seconds)
	}
}

/// Decodes the claims segment of `token` without verifying the signature.
///
/// Returns `None` unless the token has exactly three dot-separated segments and the middle one is
/// base64 (standard or URL-safe, padded or not) JSON.
pub fn peek_claims(token: &str) -> Option<UnverifiedClaims> {
	let mut segments = token.split('.');
	let (Some(_), Some(body), Some(_), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return None;
	};
	let normalized = body.replace('+', "-").replace('/', "_");
	let bytes = LENIENT_URL_SAFE.decode(normalized.as_bytes()).ok()?;

	serde_json::from_slice(&bytes).ok()
}

/// Interprets a JSON `exp` value as whole Unix seconds.
pub fn unix_seconds(value: &serde_json::Value) -> Option<i64> {
	match value {
		serde_json::Value::Number(number) =>
			number.as_i64().or_else(|| number.as_f64().map(|secs| secs.floor() as i64)),
		_ => None,
	}
}

/// Computes how long a validated token may stay cached.
///
/// A present expiry yields `exp - now` (floored to whole seconds) and fails with
/// [`AuthValidationError::Expired`] when that is not positive. A missing expiry yields `fallback`.
pub fn lifetime_until(
	expires_at: Option<i64>,
	now: OffsetDateTime,
	fallback: Duration,
) -> Result<Duration, AuthValidationError> {
	let Some(exp) = expires_at else {
		return Ok(fallback);
	};
	let now_ms = now.unix_timestamp_nanos() / 1_000_000;
	let remaining_secs = (i128::from(exp) * 1_000 - now_ms).div_euclid(1_000);

	if remaining_secs <= 0 {
		return Err(AuthValidationError::Expired);
	}

	Ok(Duration::seconds(i64::try_from(remaining_secs).unwrap_or(i64::MAX)))
}
