//! Platform host resolution from browser-supplied request headers.

// self
use crate::{_prelude::*, config::PlatformConfig};

/// Identity-platform host a request belongs to (for example `acme.my.pitcher.com`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlatformHost(String);
impl PlatformHost {
	/// Resolves the host from the `Referer` header, then the `Origin` header, falling back to the
	/// configured development host when neither names a platform domain.
	pub fn resolve(referer: Option<&str>, origin: Option<&str>, config: &PlatformConfig) -> Self {
		let suffix = config.domain_suffix.as_str();
		let host = referer
			.and_then(|raw| platform_host_of(raw, suffix))
			.or_else(|| origin.and_then(|raw| platform_host_of(raw, suffix)))
			.unwrap_or_else(|| config.default_host.clone());

		Self(host)
	}

	/// Wraps an already-known host name.
	pub fn new(host: impl Into<String>) -> Self {
		Self(host.into())
	}

	/// Host name as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Organization subdomain: the first DNS label of the host.
	pub fn organization(&self) -> &str {
		self.0.split('.').next().unwrap_or_default()
	}
}
impl Display for PlatformHost {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Returns the host of `raw` when it parses as a URL whose host ends with `suffix`.
pub fn platform_host_of(raw: &str, suffix: &str) -> Option<String> {
	let url = Url::parse(raw).ok()?;
	let host = url.host_str()?;

	host.ends_with(suffix).then(|| host.to_owned())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn referer_wins_over_origin() {
		let config = PlatformConfig::default();
		let host = PlatformHost::resolve(
			Some("https://acme.my.pitcher.com/dsr/room?x=1"),
			Some("https://other.my.pitcher.com"),
			&config,
		);

		assert_eq!(host.as_str(), "acme.my.pitcher.com");
		assert_eq!(host.organization(), "acme");
	}

	#[test]
	fn origin_is_used_when_referer_is_foreign_or_malformed() {
		let config = PlatformConfig::default();

		for referer in [Some("https://evil.example.com/"), Some("not a url"), None] {
			let host = PlatformHost::resolve(referer, Some("https://beta.my.pitcher.com"), &config);

			assert_eq!(host.as_str(), "beta.my.pitcher.com");
		}
	}

	#[test]
	fn falls_back_to_default_host() {
		let config = PlatformConfig::default();
		let host = PlatformHost::resolve(None, Some("https://my.pitcher.com.evil.io"), &config);

		assert_eq!(host.as_str(), "dev.my.pitcher.com");
		assert_eq!(host.organization(), "dev");
	}
}
