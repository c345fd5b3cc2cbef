//! Gateway-level error types shared across the pipeline, validators, and upstream clients.

// self
use crate::{_prelude::*, auth::AuthType, rate_limit::RetryDirective};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error; every variant terminates the request with a mapped status.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Admission control denied the request; the caller may retry after the directive.
	#[error("Too many requests.")]
	RateLimited(RetryDirective),
	/// Authorization header is missing or uses an unknown scheme.
	#[error(transparent)]
	AuthScheme(#[from] AuthSchemeError),
	/// The identity platform rejected the token, or the token is expired or malformed.
	#[error("{scheme} authentication failed: {source}")]
	AuthValidation {
		/// Scheme whose strategy rejected the credentials.
		scheme: AuthType,
		/// Underlying validation failure.
		#[source]
		source: AuthValidationError,
	},
	/// No usable ticker symbol survived filtering.
	#[error("Invalid ticker symbols.")]
	InvalidTickers,
	/// Every upstream quote and index call failed.
	#[error("All {failed_calls} upstream market data calls failed.")]
	AggregateFailure {
		/// Number of upstream calls attempted (and failed) for the snapshot.
		failed_calls: usize,
	},
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure outside any per-symbol fetch.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Listener or socket failure while serving.
	#[error("Server I/O failure.")]
	Io(#[from] std::io::Error),
}
impl Error {
	/// Wraps a validation failure for the given scheme.
	pub fn auth_validation(scheme: AuthType, source: impl Into<AuthValidationError>) -> Self {
		Self::AuthValidation { scheme, source: source.into() }
	}
}

/// Authorization header problems detected before any validator runs.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthSchemeError {
	/// No Authorization header was sent.
	#[error("Missing Authorization header.")]
	Missing,
	/// The header does not start with a supported scheme, or carries no token.
	#[error("Authorization header uses an unsupported scheme.")]
	Unrecognized,
}

/// Reasons a validator strategy refused a token.
#[derive(Debug, ThisError)]
pub enum AuthValidationError {
	/// The identity platform call failed or returned a non-success status.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// The platform answered but reported the token invalid.
	#[error("Identity platform rejected the token: {reason}.")]
	Rejected {
		/// Platform-supplied reason, or a generic label when none was given.
		reason: String,
	},
	/// The validated payload lacks a required identifying field.
	#[error("Token payload is missing `{field}`.")]
	MissingField {
		/// Name of the missing payload field.
		field: &'static str,
	},
	/// The token's expiry claim is not in the future.
	#[error("Token has expired.")]
	Expired,
}

/// Failure of a single upstream call (platform endpoint, quote, or index).
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Upstream answered with a non-success HTTP status.
	#[error("Upstream returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Upstream body could not be decoded into the expected shape.
	#[error("Upstream returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// The quote provider returned an all-zero quote for the symbol.
	#[error("No market data available for {symbol}.")]
	NoData {
		/// Symbol that returned no data.
		symbol: String,
	},
	/// Request never produced a response.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Configuration and startup failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Quote provider API key is absent or still the placeholder value.
	#[error("FINNHUB_API_KEY environment variable is not configured.")]
	MissingApiKey,
	/// An environment value could not be parsed.
	#[error("Environment variable `{key}` has an invalid value `{value}`.")]
	InvalidValue {
		/// Environment variable name.
		key: &'static str,
		/// Offending raw value.
		value: String,
	},
	/// An environment value is not a valid URL.
	#[error("Environment variable `{key}` is not a valid URL.")]
	InvalidUrl {
		/// Environment variable name.
		key: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling an upstream service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		Self::Transport(e.into())
	}
}
