//! Cache-backed fan-out over the quote provider.
//!
//! A snapshot miss issues one quote call per ticker and one per market index, all concurrently.
//! Individual failures degrade the snapshot (the symbol or index is omitted) instead of failing the
//! request; only a fan-out in which every call failed becomes [`Error::AggregateFailure`].
//!
//! By default concurrent misses for the same ticker set each run their own fan-out, the last
//! writer winning the cache slot. With coalescing enabled, a per-key single-flight guard lets
//! later callers wait for the first fan-out and read its cached result.

// crates.io
use futures::future;
// self
use crate::{
	_prelude::*,
	cache::TtlCache,
	config::DEFAULT_SNAPSHOT_TTL,
	error::UpstreamError,
	market::{
		FinancialSnapshot, IndexQuote, MarketOverview, QuoteProvider, StockQuote, Ticker, TickerSet,
	},
	obs::{self, Stage, StageOutcome, StageSpan},
};

/// Market indices reported in the overview, as `(name, provider symbol)`.
pub const MARKET_INDICES: [(&str, &str); 3] = [("sp500", "^GSPC"), ("nasdaq", "^IXIC"), ("dow", "^DJI")];

/// Snapshot plus whether it came from the cache.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotFetch {
	/// Caller-agnostic snapshot.
	pub snapshot: FinancialSnapshot,
	/// `true` when served from the snapshot cache.
	pub cached: bool,
}

/// Fetches, merges, and caches market snapshots.
pub struct DataAggregator {
	provider: Arc<dyn QuoteProvider>,
	cache: Arc<TtlCache<FinancialSnapshot>>,
	ttl: Duration,
	coalesce: bool,
	flight_guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}
impl DataAggregator {
	/// Creates an aggregator with an empty cache, the default snapshot TTL, and no coalescing.
	pub fn new(provider: Arc<dyn QuoteProvider>) -> Self {
		Self {
			provider,
			cache: Default::default(),
			ttl: DEFAULT_SNAPSHOT_TTL,
			coalesce: false,
			flight_guards: Default::default(),
		}
	}

	/// Overrides the snapshot cache lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Enables or disables single-flight coalescing of concurrent misses.
	pub fn with_coalescing(mut self, coalesce: bool) -> Self {
		self.coalesce = coalesce;

		self
	}

	/// Snapshot cache shared with the sweeper.
	pub fn cache(&self) -> &Arc<TtlCache<FinancialSnapshot>> {
		&self.cache
	}

	/// Returns the snapshot for `tickers`, from cache when fresh.
	pub async fn fetch(&self, tickers: &TickerSet) -> Result<SnapshotFetch> {
		const STAGE: Stage = Stage::Aggregation;

		let span = StageSpan::new(STAGE, "fetch");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				let key = tickers.cache_key();

				if let Some(hit) = self.cached(&key) {
					return Ok(hit);
				}
				if !self.coalesce {
					return self.fetch_and_store(tickers, key).await;
				}

				let guard = self.flight_guard(&key);
				let result = {
					let _singleflight = guard.lock().await;

					match self.cached(&key) {
						Some(hit) => Ok(hit),
						None => self.fetch_and_store(tickers, key.clone()).await,
					}
				};

				self.release_flight_guard(&key, guard);

				result
			})
			.await;

		obs::record_stage_outcome(STAGE, StageOutcome::of(&result));

		result
	}

	fn cached(&self, key: &str) -> Option<SnapshotFetch> {
		let snapshot = self.cache.get(key)?;

		tracing::debug!(key, "Snapshot cache hit.");

		Some(SnapshotFetch { snapshot, cached: true })
	}

	async fn fetch_and_store(&self, tickers: &TickerSet, key: String) -> Result<SnapshotFetch> {
		tracing::info!(key, tickers = tickers.len(), "Fetching fresh market data.");

		let snapshot = self.fan_out(tickers).await?;

		self.cache.set(key, snapshot.clone(), self.ttl);

		Ok(SnapshotFetch { snapshot, cached: false })
	}

	async fn fan_out(&self, tickers: &TickerSet) -> Result<FinancialSnapshot> {
		let quotes = future::join_all(tickers.tickers().iter().map(|ticker| self.stock_quote(ticker)));
		let indices = future::join_all(
			MARKET_INDICES.iter().map(|&(name, symbol)| self.index_quote(name, symbol)),
		);
		let (quotes, indices) = futures::join!(quotes, indices);
		let attempted = quotes.len() + indices.len();
		let failed = quotes.iter().filter(|r| r.is_err()).count()
			+ indices.iter().filter(|r| r.is_err()).count();

		if failed == attempted {
			tracing::error!(failed, "Every upstream market data call failed.");

			return Err(Error::AggregateFailure { failed_calls: failed });
		}

		let now = OffsetDateTime::now_utc();
		let stock_quotes = quotes.into_iter().filter_map(|r| r.ok().flatten()).collect();
		let indices = indices.into_iter().filter_map(|r| r.ok().flatten()).collect::<BTreeMap<_, _>>();
		let market_overview =
			(!indices.is_empty()).then(|| MarketOverview { indices, last_updated: now });

		Ok(FinancialSnapshot::new(stock_quotes, market_overview, now))
	}

	async fn stock_quote(&self, ticker: &Ticker) -> Result<Option<StockQuote>, UpstreamError> {
		let symbol = ticker.as_str();
		let raw = self.provider.quote(symbol).await.inspect_err(|e| {
			tracing::warn!(symbol, error = %e, "Failed to fetch quote.");
		})?;

		if raw.is_empty() {
			tracing::warn!(symbol, "No data available for symbol.");

			return Ok(None);
		}

		Ok(Some(StockQuote {
			symbol: symbol.to_owned(),
			price: raw.c,
			change: raw.d,
			change_percent: raw.dp,
			high: raw.h,
			low: raw.l,
			open: raw.o,
			previous_close: raw.pc,
			last_updated: OffsetDateTime::from_unix_timestamp(raw.t)
				.unwrap_or(OffsetDateTime::UNIX_EPOCH),
		}))
	}

	async fn index_quote(
		&self,
		name: &'static str,
		symbol: &'static str,
	) -> Result<Option<(String, IndexQuote)>, UpstreamError> {
		let raw = self.provider.quote(symbol).await.inspect_err(|e| {
			tracing::warn!(index = name, error = %e, "Failed to fetch index.");
		})?;

		if raw.c == 0.0 {
			return Ok(None);
		}

		Ok(Some((name.to_owned(), IndexQuote { value: raw.c, change: raw.d, change_percent: raw.dp })))
	}

	fn flight_guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.flight_guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	fn release_flight_guard(&self, key: &str, guard: Arc<AsyncMutex<()>>) {
		let mut guards = self.flight_guards.lock();

		// Map entry plus the caller's clone: nobody else is waiting.
		if Arc::strong_count(&guard) <= 2 {
			guards.remove(key);
		}
	}
}
impl Debug for DataAggregator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DataAggregator")
			.field("cached_snapshots", &self.cache.len())
			.field("ttl", &self.ttl)
			.field("coalesce", &self.coalesce)
			.finish_non_exhaustive()
	}
}
