//! Stateless HTTP gateway that authenticates shared-link and bearer callers against an external
//! identity platform, rate-limits them per credential, and serves cached, fanned-out market quotes
//! from a rate-limited upstream provider.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod market;
pub mod obs;
pub mod pipeline;
pub mod rate_limit;
pub mod server;
pub mod sweep;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		config::{GatewayConfig, PlatformConfig, RuntimeMode},
		pipeline::Gateway,
	};

	/// API key handed to the mocked quote provider during tests.
	pub const TEST_API_KEY: &str = "test-finnhub-key";

	/// Builds a development-mode configuration whose platform and quote calls are routed to the
	/// provided mock server base URLs.
	pub fn test_gateway_config(platform_base: &str, quotes_base: &str) -> GatewayConfig {
		let platform_base =
			Url::parse(platform_base).expect("Mock platform base URL should parse successfully.");
		let quotes_base =
			Url::parse(quotes_base).expect("Mock quote base URL should parse successfully.");

		GatewayConfig {
			platform: PlatformConfig {
				base_url_override: Some(platform_base),
				..PlatformConfig::default()
			},
			quotes_base_url: quotes_base,
			..GatewayConfig::new(TEST_API_KEY)
				.expect("Default configuration should build successfully.")
		}
	}

	/// Same as [`test_gateway_config`] with the runtime mode forced to production.
	pub fn test_production_config(platform_base: &str, quotes_base: &str) -> GatewayConfig {
		GatewayConfig {
			mode: RuntimeMode::Production,
			..test_gateway_config(platform_base, quotes_base)
		}
	}

	/// Constructs a [`Gateway`] without starting any sweep loops.
	pub fn build_test_gateway(config: GatewayConfig) -> Arc<Gateway> {
		Arc::new(Gateway::new(config).expect("Gateway should build from the test configuration."))
	}

	/// Encodes an unsigned JWT-shaped token whose middle segment carries `claims`.
	///
	/// The signature segment is a fixed placeholder; the gateway never verifies it locally.
	pub fn unsigned_jwt(claims: serde_json::Value) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
		let body = URL_SAFE_NO_PAD.encode(
			serde_json::to_vec(&claims).expect("Test claims should serialize to JSON."),
		);

		format!("{header}.{body}.c2lnbmF0dXJl")
	}

	/// Unix timestamp `offset` away from the current instant.
	pub fn unix_from_now(offset: Duration) -> i64 {
		(OffsetDateTime::now_utc() + offset).unix_timestamp()
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tower as _};
