//! Environment-driven gateway configuration.
//!
//! [`load_env_file`] merges a `.env` file into the process environment when present and
//! [`GatewayConfig::from_env`] then reads it. Startup fails fast when the quote provider API key is absent or still the
//! placeholder. Every other setting has a default.

// std
use std::net::{Ipv4Addr, SocketAddr};
// self
use crate::{
	_prelude::*,
	auth::{PlatformHost, TokenSecret},
	error::ConfigError,
};

/// Placeholder value shipped in sample environment files.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default quote provider base URL.
pub const DEFAULT_QUOTES_BASE_URL: &str = "https://finnhub.io/api/v1";
/// Default platform domain suffix used for host resolution and origin checks.
pub const DEFAULT_DOMAIN_SUFFIX: &str = ".my.pitcher.com";
/// Default platform host when a request names none.
pub const DEFAULT_PLATFORM_HOST: &str = "dev.my.pitcher.com";
/// Cache lifetime for assembled market snapshots.
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::minutes(20);
/// Cache lifetime for shared-link payloads without an `exp` claim.
pub const DEFAULT_SHARED_LINK_TTL: Duration = Duration::minutes(10);
/// Cache lifetime for bearer users whose token carries no readable `exp` claim.
pub const DEFAULT_BEARER_TTL: Duration = Duration::minutes(20);

const SHARED_LINK_VALIDATION_PATH: &str = "sharing/api/validate-sharing-jwt";
const USER_IDENTITY_PATH: &str = "api/v1/users/me/";

/// Deployment mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuntimeMode {
	/// Debug endpoints enabled, failure details included in 500 bodies.
	#[default]
	Development,
	/// Debug endpoints disabled, failure details withheld.
	Production,
}
impl RuntimeMode {
	/// Parses a mode label; only `production` (case-insensitive) selects production.
	pub fn from_label(label: &str) -> Self {
		if label.trim().eq_ignore_ascii_case("production") {
			Self::Production
		} else {
			Self::Development
		}
	}

	/// Returns `true` in production mode.
	pub fn is_production(self) -> bool {
		matches!(self, Self::Production)
	}

	/// Stable label for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Development => "development",
			Self::Production => "production",
		}
	}
}

/// Identity platform addressing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformConfig {
	/// Domain suffix every platform host ends with (leading dot included).
	pub domain_suffix: String,
	/// Host used when neither `Referer` nor `Origin` names a platform host.
	pub default_host: String,
	/// Routes every platform call to this base URL instead of the resolved host.
	pub base_url_override: Option<Url>,
}
impl PlatformConfig {
	/// Shared-link validation endpoint for `host`.
	pub fn shared_link_validation_url(&self, host: &PlatformHost) -> Result<Url, url::ParseError> {
		self.endpoint(host.as_str(), SHARED_LINK_VALIDATION_PATH)
	}

	/// User identity endpoint for `organization`.
	pub fn user_identity_url(&self, organization: &str) -> Result<Url, url::ParseError> {
		let host = format!("{organization}{}", self.domain_suffix);

		self.endpoint(&host, USER_IDENTITY_PATH)
	}

	/// Returns `true` when `origin` is a URL whose host ends with the platform suffix.
	pub fn allows_origin(&self, origin: &str) -> bool {
		crate::auth::platform_host_of(origin, &self.domain_suffix).is_some()
	}

	fn endpoint(&self, host: &str, path: &str) -> Result<Url, url::ParseError> {
		match &self.base_url_override {
			Some(base) => Url::parse(&format!("{}/{path}", base.as_str().trim_end_matches('/'))),
			None => Url::parse(&format!("https://{host}/{path}")),
		}
	}
}
impl Default for PlatformConfig {
	fn default() -> Self {
		Self {
			domain_suffix: DEFAULT_DOMAIN_SUFFIX.into(),
			default_host: DEFAULT_PLATFORM_HOST.into(),
			base_url_override: None,
		}
	}
}

/// Complete gateway configuration.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
	/// Socket address the HTTP server binds to.
	pub listen_addr: SocketAddr,
	/// Deployment mode.
	pub mode: RuntimeMode,
	/// Quote provider API key.
	pub quotes_api_key: TokenSecret,
	/// Quote provider base URL (the `/quote` path is appended).
	pub quotes_base_url: Url,
	/// Identity platform addressing.
	pub platform: PlatformConfig,
	/// Rate limit window length.
	pub rate_limit_window: Duration,
	/// Requests admitted per identifier and window.
	pub rate_limit_ceiling: u32,
	/// Snapshot cache lifetime.
	pub snapshot_ttl: Duration,
	/// Shared-link cache lifetime when the payload has no expiry.
	pub shared_link_fallback_ttl: Duration,
	/// Bearer cache lifetime when the token has no readable expiry.
	pub bearer_fallback_ttl: Duration,
	/// Interval between cache and rate-limit sweeps.
	pub sweep_interval: Duration,
	/// Lets concurrent snapshot misses for one ticker set share a single upstream fan-out.
	pub coalesce_fetches: bool,
}
impl GatewayConfig {
	/// Default configuration around the provided quote provider API key.
	pub fn new(quotes_api_key: impl Into<String>) -> Result<Self, ConfigError> {
		Ok(Self {
			listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
			mode: RuntimeMode::default(),
			quotes_api_key: TokenSecret::new(quotes_api_key),
			quotes_base_url: parse_url("FINNHUB_BASE_URL", DEFAULT_QUOTES_BASE_URL)?,
			platform: PlatformConfig::default(),
			rate_limit_window: crate::rate_limit::DEFAULT_WINDOW,
			rate_limit_ceiling: crate::rate_limit::DEFAULT_CEILING,
			snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
			shared_link_fallback_ttl: DEFAULT_SHARED_LINK_TTL,
			bearer_fallback_ttl: DEFAULT_BEARER_TTL,
			sweep_interval: crate::sweep::DEFAULT_SWEEP_INTERVAL,
			coalesce_fetches: false,
		})
	}

	/// Reads the process environment.
	///
	/// Call [`load_env_file`] first so `.env` entries are visible here.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a configuration from an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let api_key = read("FINNHUB_API_KEY")
			.filter(|key| key != API_KEY_PLACEHOLDER)
			.ok_or(ConfigError::MissingApiKey)?;
		let mut config = Self::new(api_key)?;

		if let Some(port) = read("PORT") {
			let port = parse_value::<u16>("PORT", port)?;

			config.listen_addr.set_port(port);
		}
		if let Some(mode) = read("GATEWAY_MODE") {
			config.mode = RuntimeMode::from_label(&mode);
		}
		if let Some(base) = read("FINNHUB_BASE_URL") {
			config.quotes_base_url = parse_url("FINNHUB_BASE_URL", &base)?;
		}
		if let Some(suffix) = read("PLATFORM_DOMAIN_SUFFIX") {
			config.platform.domain_suffix = suffix;
		}
		if let Some(host) = read("PLATFORM_DEFAULT_HOST") {
			config.platform.default_host = host;
		}
		if let Some(base) = read("PLATFORM_BASE_URL") {
			config.platform.base_url_override = Some(parse_url("PLATFORM_BASE_URL", &base)?);
		}
		if let Some(ceiling) = read("RATE_LIMIT_MAX_REQUESTS") {
			config.rate_limit_ceiling = parse_value("RATE_LIMIT_MAX_REQUESTS", ceiling)?;
		}
		if let Some(secs) = read("RATE_LIMIT_WINDOW_SECS") {
			let secs = parse_value::<u32>("RATE_LIMIT_WINDOW_SECS", secs)?;

			config.rate_limit_window = Duration::seconds(i64::from(secs));
		}
		if let Some(flag) = read("GATEWAY_COALESCE_FETCHES") {
			config.coalesce_fetches = parse_value("GATEWAY_COALESCE_FETCHES", flag)?;
		}

		Ok(config)
	}
}

/// Loads `.env` into the process environment without overriding variables that are already set.
///
/// A missing file is not an error. Runs before the tracing subscriber is installed, so `RUST_LOG`
/// may come from `.env`.
pub fn load_env_file() -> Result<(), dotenvy::Error> {
	tolerate_missing(dotenvy::dotenv())
}

fn tolerate_missing<T>(loaded: Result<T, dotenvy::Error>) -> Result<(), dotenvy::Error> {
	match loaded {
		Err(e) if !e.not_found() => Err(e),
		_ => Ok(()),
	}
}

fn parse_value<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
	T: FromStr,
{
	value.parse().map_err(|_| ConfigError::InvalidValue { key, value })
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
	Url::parse(value).map_err(|source| ConfigError::InvalidUrl { key, source })
}
