//! Upstream quote provider seam.

// self
use crate::{_prelude::*, auth::TokenSecret, error::UpstreamError, http::ReqwestHttpClient};

/// Future returned by [`QuoteProvider::quote`].
pub type QuoteFuture<'a> = Pin<Box<dyn Future<Output = Result<RawQuote, UpstreamError>> + 'a + Send>>;

/// Raw quote fields as the provider reports them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawQuote {
	/// Current price.
	#[serde(default)]
	pub c: f64,
	/// Change.
	#[serde(default)]
	pub d: Option<f64>,
	/// Percent change.
	#[serde(default)]
	pub dp: Option<f64>,
	/// High.
	#[serde(default)]
	pub h: f64,
	/// Low.
	#[serde(default)]
	pub l: f64,
	/// Open.
	#[serde(default)]
	pub o: f64,
	/// Previous close.
	#[serde(default)]
	pub pc: f64,
	/// Unix timestamp of the quote.
	#[serde(default)]
	pub t: i64,
}
impl RawQuote {
	/// Provider convention for an unknown symbol: price, high, and low are all zero.
	pub fn is_empty(&self) -> bool {
		self.c == 0.0 && self.h == 0.0 && self.l == 0.0
	}
}

/// Source of per-symbol quotes.
pub trait QuoteProvider
where
	Self: Send + Sync,
{
	/// Fetches the latest quote for `symbol`.
	fn quote<'a>(&'a self, symbol: &'a str) -> QuoteFuture<'a>;
}

/// Finnhub `/quote` client.
#[derive(Clone, Debug)]
pub struct FinnhubProvider {
	http: ReqwestHttpClient,
	quote_url: Url,
	api_key: TokenSecret,
}
impl FinnhubProvider {
	/// Creates a provider rooted at `base_url` (the `/quote` path is appended).
	pub fn new(
		http: ReqwestHttpClient,
		base_url: &Url,
		api_key: TokenSecret,
	) -> Result<Self, url::ParseError> {
		let quote_url = Url::parse(&format!("{}/quote", base_url.as_str().trim_end_matches('/')))?;

		Ok(Self { http, quote_url, api_key })
	}

	/// Fully qualified `/quote` endpoint.
	pub fn quote_url(&self) -> &Url {
		&self.quote_url
	}
}
impl QuoteProvider for FinnhubProvider {
	fn quote<'a>(&'a self, symbol: &'a str) -> QuoteFuture<'a> {
		Box::pin(async move {
			let request = self
				.http
				.get(self.quote_url.clone())
				.query(&[("symbol", symbol), ("token", self.api_key.expose())]);

			self.http.send_json(request).await
		})
	}
}
