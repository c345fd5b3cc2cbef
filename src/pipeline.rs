//! Framework-agnostic request pipeline.
//!
//! A financial-data request moves strictly forward through admission, authentication, ticker
//! validation, and aggregation. Each stage either advances or ends the request with the error that
//! maps to its status (429, 401, 400, 500). The pipeline never retries.

// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	auth::{AuthenticatedIdentity, Credentials, PlatformHost, TokenValidator},
	config::GatewayConfig,
	error::ConfigError,
	http::ReqwestHttpClient,
	market::{DataAggregator, FinancialSnapshot, FinnhubProvider, TickerSet},
	obs::{self, Stage, StageOutcome, StageSpan},
	rate_limit::{FixedWindowLimiter, RateLimitContext, RateLimitDecision, RateLimitPolicy},
	sweep::SweepHandle,
};

/// Transport-neutral view of an inbound request.
#[derive(Clone, Debug, Default)]
pub struct InboundRequest {
	/// Raw `Authorization` header value.
	pub authorization: Option<String>,
	/// Raw `Referer` header value.
	pub referer: Option<String>,
	/// Raw `Origin` header value.
	pub origin: Option<String>,
	/// Peer address of the connection.
	pub remote_addr: Option<IpAddr>,
	/// Raw `tickers` query value.
	pub tickers: Option<String>,
}
impl InboundRequest {
	/// Sets the `Authorization` header value.
	pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
		self.authorization = Some(value.into());

		self
	}

	/// Sets the `Referer` header value.
	pub fn with_referer(mut self, value: impl Into<String>) -> Self {
		self.referer = Some(value.into());

		self
	}

	/// Sets the `Origin` header value.
	pub fn with_origin(mut self, value: impl Into<String>) -> Self {
		self.origin = Some(value.into());

		self
	}

	/// Sets the peer address.
	pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
		self.remote_addr = Some(addr);

		self
	}

	/// Sets the raw `tickers` query value.
	pub fn with_tickers(mut self, value: impl Into<String>) -> Self {
		self.tickers = Some(value.into());

		self
	}

	/// Platform host the request belongs to.
	pub fn platform_host(&self, config: &GatewayConfig) -> PlatformHost {
		PlatformHost::resolve(self.referer.as_deref(), self.origin.as_deref(), &config.platform)
	}
}

/// Background sweep loops owned by a running gateway.
#[derive(Debug)]
pub struct GatewaySweepers {
	handles: Vec<SweepHandle>,
}
impl GatewaySweepers {
	/// Number of loops still scheduled.
	pub fn running(&self) -> usize {
		self.handles.iter().filter(|handle| handle.is_running()).count()
	}

	/// Stops every loop.
	pub async fn stop(self) {
		for handle in self.handles {
			handle.stop().await;
		}
	}
}

/// Owns every process-wide service and runs the request pipeline.
#[derive(Debug)]
pub struct Gateway {
	config: GatewayConfig,
	limiter: Arc<FixedWindowLimiter>,
	validator: TokenValidator,
	aggregator: DataAggregator,
}
impl Gateway {
	/// Builds the services described by `config`; no background task is started.
	pub fn new(config: GatewayConfig) -> Result<Self> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::http_client_build)?;
		let http = ReqwestHttpClient::with_client(client);
		let provider =
			FinnhubProvider::new(http.clone(), &config.quotes_base_url, config.quotes_api_key.clone())
				.map_err(|source| ConfigError::InvalidUrl { key: "FINNHUB_BASE_URL", source })?;
		let limiter = Arc::new(FixedWindowLimiter::new(
			config.rate_limit_window,
			config.rate_limit_ceiling,
		));
		let validator = TokenValidator::new(http, config.platform.clone())
			.with_shared_link_fallback_ttl(config.shared_link_fallback_ttl)
			.with_bearer_fallback_ttl(config.bearer_fallback_ttl);
		let aggregator = DataAggregator::new(Arc::new(provider))
			.with_ttl(config.snapshot_ttl)
			.with_coalescing(config.coalesce_fetches);

		Ok(Self { config, limiter, validator, aggregator })
	}

	/// Active configuration.
	pub fn config(&self) -> &GatewayConfig {
		&self.config
	}

	/// Rate limiter consulted by [`admit`](Self::admit).
	pub fn limiter(&self) -> &Arc<FixedWindowLimiter> {
		&self.limiter
	}

	/// Token validator consulted by [`authenticate`](Self::authenticate).
	pub fn validator(&self) -> &TokenValidator {
		&self.validator
	}

	/// Snapshot aggregator.
	pub fn aggregator(&self) -> &DataAggregator {
		&self.aggregator
	}

	/// Starts the sweep loops for the rate limiter and every cache.
	///
	/// Must be called from within a Tokio runtime.
	pub fn spawn_sweepers(&self) -> GatewaySweepers {
		let interval = self.config.sweep_interval;
		let handles = vec![
			SweepHandle::spawn(&self.limiter, interval),
			SweepHandle::spawn(self.validator.shared_link_cache(), interval),
			SweepHandle::spawn(self.validator.bearer_cache(), interval),
			SweepHandle::spawn(self.aggregator.cache(), interval),
		];

		GatewaySweepers { handles }
	}

	/// Admission stage: counts the request against its identifier.
	pub fn admit(&self, request: &InboundRequest) -> Result<()> {
		const STAGE: Stage = Stage::Admission;

		let _span = StageSpan::new(STAGE, "admit").entered();

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let context =
			RateLimitContext::for_request(request.authorization.as_deref(), request.remote_addr);
		let result = match self.limiter.evaluate(&context) {
			RateLimitDecision::Allow => Ok(()),
			RateLimitDecision::Deny(directive) => {
				tracing::warn!(
					remote_addr = ?request.remote_addr,
					retry_after_secs = directive.retry_after_secs(),
					"Rate limit exceeded."
				);

				Err(Error::RateLimited(directive))
			},
		};

		obs::record_stage_outcome(STAGE, StageOutcome::of(&result));

		result
	}

	/// Authentication stage: parses the header and validates the credentials.
	pub async fn authenticate(&self, request: &InboundRequest) -> Result<AuthenticatedIdentity> {
		let credentials = Credentials::from_header(request.authorization.as_deref())
			.inspect_err(|e| {
				obs::record_stage_outcome(Stage::Authentication, StageOutcome::Failure);
				tracing::warn!(error = %e, "Rejected Authorization header.");
			})?;
		let host = request.platform_host(&self.config);

		self.validator.validate(&credentials, &host).await
	}

	/// Ticker validation stage.
	pub fn tickers(&self, request: &InboundRequest) -> Result<TickerSet> {
		const STAGE: Stage = Stage::TickerValidation;

		let _span = StageSpan::new(STAGE, "parse").entered();
		let result = TickerSet::from_query(request.tickers.as_deref());

		obs::record_stage_outcome(STAGE, StageOutcome::of(&result));

		result
	}

	/// Runs the full financial-data pipeline and returns the personalized response snapshot.
	pub async fn financial_data(&self, request: &InboundRequest) -> Result<FinancialSnapshot> {
		self.admit(request)?;

		let identity = self.authenticate(request).await?;
		let tickers = self.tickers(request)?;
		let fetch = self.aggregator.fetch(&tickers).await?;

		Ok(fetch.snapshot.personalize(&identity, fetch.cached))
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::net::Ipv4Addr;
	// self
	use super::*;
	use crate::{_preludet::*, error::AuthSchemeError};

	fn gateway() -> Arc<Gateway> {
		let mut config = test_gateway_config("http://127.0.0.1:9", "http://127.0.0.1:9");

		config.rate_limit_ceiling = 2;

		build_test_gateway(config)
	}

	#[test]
	fn admission_denies_after_ceiling() {
		let gateway = gateway();
		let request = InboundRequest::default().with_remote_addr(IpAddr::V4(Ipv4Addr::LOCALHOST));

		gateway.admit(&request).expect("First request is admitted.");
		gateway.admit(&request).expect("Second request is admitted.");

		let err = gateway.admit(&request).expect_err("Third request exceeds the ceiling.");

		match err {
			Error::RateLimited(directive) => assert!(directive.retry_after_secs() >= 1),
			other => panic!("Unexpected error: {other:?}"),
		}

		let other_caller = request.clone().with_authorization("Bearer someone-else");

		gateway.admit(&other_caller).expect("Credentials are limited independently of address.");
	}

	#[tokio::test]
	async fn missing_header_fails_before_any_upstream_call() {
		let gateway = gateway();
		let err = gateway
			.authenticate(&InboundRequest::default())
			.await
			.expect_err("Missing header must fail.");

		assert!(matches!(err, Error::AuthScheme(AuthSchemeError::Missing)));
	}

	#[test]
	fn ticker_stage_rejects_empty_sets() {
		let gateway = gateway();

		assert!(matches!(
			gateway.tickers(&InboundRequest::default().with_tickers("1,2,3")),
			Err(Error::InvalidTickers)
		));
	}

	#[tokio::test]
	async fn sweepers_start_and_stop() {
		let gateway = gateway();
		let sweepers = gateway.spawn_sweepers();

		assert_eq!(sweepers.running(), 4);

		sweepers.stop().await;
	}
}
