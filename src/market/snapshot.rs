//! Financial snapshot model returned by `/api/financial-data`.
//!
//! Snapshots are cached caller-agnostic. [`FinancialSnapshot::personalize`] produces the
//! per-response copy carrying the caller's identity, so a cached value is never mutated.

// self
use crate::{
	_prelude::*,
	auth::{AuthType, AuthenticatedIdentity},
};

/// Value reported in `_metadata.source`.
pub const SNAPSHOT_SOURCE: &str = "finnhub_api";
/// Value reported in `_metadata.note`.
pub const SNAPSHOT_NOTE: &str = "Real-time data from Finnhub (cached for 20 minutes)";

/// Quote for a single ticker.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
	/// Ticker symbol.
	pub symbol: String,
	/// Current price.
	pub price: f64,
	/// Absolute change since the previous close.
	pub change: Option<f64>,
	/// Percentage change since the previous close.
	pub change_percent: Option<f64>,
	/// Session high.
	pub high: f64,
	/// Session low.
	pub low: f64,
	/// Session open.
	pub open: f64,
	/// Previous session close.
	pub previous_close: f64,
	/// Provider timestamp of the quote.
	#[serde(with = "time::serde::rfc3339")]
	pub last_updated: OffsetDateTime,
}

/// Overview entry for one market index.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuote {
	/// Current index level.
	pub value: f64,
	/// Absolute change since the previous close.
	pub change: Option<f64>,
	/// Percentage change since the previous close.
	pub change_percent: Option<f64>,
}

/// Market indices keyed by name (`sp500`, `nasdaq`, `dow`), plus the time they were collected.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarketOverview {
	/// Indices that returned data.
	#[serde(flatten)]
	pub indices: BTreeMap<String, IndexQuote>,
	/// Collection time.
	#[serde(rename = "lastUpdated", with = "time::serde::rfc3339")]
	pub last_updated: OffsetDateTime,
}

/// Caller-specific fields appended to each response copy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallerMetadata {
	/// Scheme the caller authenticated with.
	pub auth_type: AuthType,
	/// Shared link identifier (shared-link callers only).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub shared_link_id: Option<String>,
	/// Platform instance identifier (shared-link callers only).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub instance_id: Option<String>,
	/// User email (bearer callers only).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub requested_by: Option<String>,
	/// Organization label.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub organization: Option<String>,
}
impl From<&AuthenticatedIdentity> for CallerMetadata {
	fn from(identity: &AuthenticatedIdentity) -> Self {
		let organization = identity.organization().map(str::to_owned);

		match identity {
			AuthenticatedIdentity::SharedLink(link) => Self {
				auth_type: AuthType::SharedLink,
				shared_link_id: Some(link.shared_link_id.clone()),
				instance_id: Some(link.instance_id.clone()),
				requested_by: None,
				organization,
			},
			AuthenticatedIdentity::Bearer(user) => Self {
				auth_type: AuthType::Bearer,
				shared_link_id: None,
				instance_id: None,
				requested_by: user.email.clone(),
				organization,
			},
		}
	}
}

/// Fetch metadata serialized as `_metadata`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SnapshotMetadata {
	/// When the upstream fan-out completed.
	#[serde(with = "time::serde::rfc3339")]
	pub fetched_at: OffsetDateTime,
	/// Upstream source label.
	pub source: &'static str,
	/// Number of quotes in the snapshot.
	pub tickers_count: usize,
	/// Whether this response was served from the snapshot cache.
	pub cached: bool,
	/// Human-readable freshness note.
	pub note: &'static str,
	/// Per-request caller fields; absent on cached values.
	#[serde(flatten)]
	pub caller: Option<CallerMetadata>,
}

/// Aggregated quotes plus optional index overview.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinancialSnapshot {
	/// Quotes for the tickers that returned data, in request order.
	pub stock_quotes: Vec<StockQuote>,
	/// Index overview, or `None` when no index returned data.
	pub market_overview: Option<MarketOverview>,
	/// Fetch metadata.
	#[serde(rename = "_metadata")]
	pub metadata: SnapshotMetadata,
}
impl FinancialSnapshot {
	/// Assembles a caller-agnostic snapshot fetched at `fetched_at`.
	pub fn new(
		stock_quotes: Vec<StockQuote>,
		market_overview: Option<MarketOverview>,
		fetched_at: OffsetDateTime,
	) -> Self {
		let metadata = SnapshotMetadata {
			fetched_at,
			source: SNAPSHOT_SOURCE,
			tickers_count: stock_quotes.len(),
			cached: false,
			note: SNAPSHOT_NOTE,
			caller: None,
		};

		Self { stock_quotes, market_overview, metadata }
	}

	/// Response copy carrying `identity` and the cache-hit flag.
	pub fn personalize(&self, identity: &AuthenticatedIdentity, cached: bool) -> Self {
		let mut copy = self.clone();

		copy.metadata.cached = cached;
		copy.metadata.caller = Some(identity.into());

		copy
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::{BearerIdentity, SharedLinkIdentity};

	fn snapshot() -> FinancialSnapshot {
		let at = macros::datetime!(2025-01-02 15:30 UTC);
		let quote = StockQuote {
			symbol: "AAPL".into(),
			price: 190.5,
			change: Some(1.5),
			change_percent: Some(0.79),
			high: 191.0,
			low: 188.0,
			open: 189.0,
			previous_close: 189.0,
			last_updated: at,
		};

		FinancialSnapshot::new(vec![quote], None, at)
	}

	#[test]
	fn serializes_expected_shape() {
		let value = serde_json::to_value(snapshot()).expect("Snapshot should serialize.");

		assert_eq!(value["stock_quotes"][0]["changePercent"], 0.79);
		assert_eq!(value["stock_quotes"][0]["previousClose"], 189.0);
		assert_eq!(value["stock_quotes"][0]["lastUpdated"], "2025-01-02T15:30:00Z");
		assert!(value["market_overview"].is_null());
		assert_eq!(value["_metadata"]["source"], "finnhub_api");
		assert_eq!(value["_metadata"]["tickers_count"], 1);
		assert_eq!(value["_metadata"]["cached"], false);
		assert!(value["_metadata"].get("auth_type").is_none());
	}

	#[test]
	fn overview_flattens_indices() {
		let overview = MarketOverview {
			indices: BTreeMap::from([(
				"sp500".to_owned(),
				IndexQuote { value: 5000.0, change: Some(-3.0), change_percent: Some(-0.06) },
			)]),
			last_updated: macros::datetime!(2025-01-02 15:30 UTC),
		};
		let value = serde_json::to_value(overview).expect("Overview should serialize.");

		assert_eq!(value["sp500"]["value"], 5000.0);
		assert_eq!(value["sp500"]["changePercent"], -0.06);
		assert_eq!(value["lastUpdated"], "2025-01-02T15:30:00Z");
	}

	#[test]
	fn personalization_leaves_cached_value_untouched() {
		let cached = snapshot();
		let shared = AuthenticatedIdentity::SharedLink(SharedLinkIdentity {
			shared_link_id: "sl-1".into(),
			instance_id: "inst-1".into(),
			org_id: "org-1".into(),
			org_name: Some("Acme".into()),
		});
		let response = cached.personalize(&shared, true);
		let value = serde_json::to_value(&response).expect("Response should serialize.");

		assert_eq!(value["_metadata"]["auth_type"], "shared_link");
		assert_eq!(value["_metadata"]["shared_link_id"], "sl-1");
		assert_eq!(value["_metadata"]["instance_id"], "inst-1");
		assert_eq!(value["_metadata"]["organization"], "Acme");
		assert_eq!(value["_metadata"]["cached"], true);
		assert!(value["_metadata"].get("requested_by").is_none());
		assert!(cached.metadata.caller.is_none());
		assert!(!cached.metadata.cached);

		let bearer = AuthenticatedIdentity::Bearer(BearerIdentity::from_user(
			"acme",
			serde_json::json!({ "email": "rep@acme.test" }),
		));
		let value = serde_json::to_value(cached.personalize(&bearer, false))
			.expect("Response should serialize.");

		assert_eq!(value["_metadata"]["auth_type"], "bearer");
		assert_eq!(value["_metadata"]["requested_by"], "rep@acme.test");
		assert_eq!(value["_metadata"]["organization"], "acme");
		assert!(value["_metadata"].get("shared_link_id").is_none());
	}
}
