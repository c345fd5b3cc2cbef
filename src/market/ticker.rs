//! Ticker symbol validation.

// self
use crate::_prelude::*;

/// Symbols served when a request names none.
pub const DEFAULT_TICKERS: [&str; 4] = ["AAPL", "MSFT", "GOOGL", "AMZN"];
/// Maximum number of symbols kept per request.
pub const MAX_TICKERS: usize = 10;
/// Maximum symbol length.
pub const MAX_TICKER_LEN: usize = 5;

/// A validated ticker symbol: one to five ASCII uppercase letters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);
impl Ticker {
	/// Validates `symbol` exactly as given (no trimming or case folding).
	pub fn parse(symbol: &str) -> Option<Self> {
		let valid = (1..=MAX_TICKER_LEN).contains(&symbol.len())
			&& symbol.bytes().all(|b| b.is_ascii_uppercase());

		valid.then(|| Self(symbol.to_owned()))
	}

	/// Symbol as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for Ticker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Keeps the valid symbols of `symbols`, in input order, capped at [`MAX_TICKERS`].
pub fn validate_tickers<I, S>(symbols: I) -> Vec<Ticker>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	symbols.into_iter().filter_map(|s| Ticker::parse(s.as_ref())).take(MAX_TICKERS).collect()
}

/// Ordered, non-empty set of validated tickers for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickerSet(Vec<Ticker>);
impl TickerSet {
	/// Builds a set from already-normalized symbols; fails when none survive validation.
	pub fn new<I, S>(symbols: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let tickers = validate_tickers(symbols);

		if tickers.is_empty() {
			return Err(Error::InvalidTickers);
		}

		Ok(Self(tickers))
	}

	/// Parses the raw `tickers` query value.
	///
	/// Values are split on `,`, trimmed, and upper-cased before validation. An absent or blank
	/// value selects [`DEFAULT_TICKERS`].
	pub fn from_query(raw: Option<&str>) -> Result<Self> {
		match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
			Some(raw) => Self::new(raw.split(',').map(|s| s.trim().to_ascii_uppercase())),
			None => Self::new(DEFAULT_TICKERS),
		}
	}

	/// Symbols in request order.
	pub fn tickers(&self) -> &[Ticker] {
		&self.0
	}

	/// Number of symbols.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Always `false`; kept for API symmetry with [`len`](Self::len).
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Order-insensitive snapshot cache key.
	pub fn cache_key(&self) -> String {
		let mut symbols = self.0.iter().map(Ticker::as_str).collect::<Vec<_>>();

		symbols.sort_unstable();

		format!("financial_data:{}", symbols.join("_"))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn symbols(tickers: &[Ticker]) -> Vec<&str> {
		tickers.iter().map(Ticker::as_str).collect()
	}

	#[test]
	fn validation_drops_invalid_symbols() {
		let tickers = validate_tickers(["aapl", "TOOLONGTICKER", "MSFT", "123"]);

		assert_eq!(symbols(&tickers), ["MSFT"]);
	}

	#[test]
	fn validation_keeps_first_ten_in_order() {
		let input = [
			"A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O",
		];
		let tickers = validate_tickers(input);

		assert_eq!(symbols(&tickers), input[..10]);
	}

	#[test]
	fn query_is_normalized_before_validation() {
		let set = TickerSet::from_query(Some(" aapl , msft,,12 ")).expect("Two symbols survive.");

		assert_eq!(symbols(set.tickers()), ["AAPL", "MSFT"]);
	}

	#[test]
	fn absent_or_blank_query_uses_defaults() {
		for raw in [None, Some(""), Some("   ")] {
			let set = TickerSet::from_query(raw).expect("Defaults should always validate.");

			assert_eq!(symbols(set.tickers()), DEFAULT_TICKERS);
		}
	}

	#[test]
	fn empty_result_is_rejected() {
		assert!(matches!(TickerSet::from_query(Some("123,$$$")), Err(Error::InvalidTickers)));
	}

	#[test]
	fn cache_key_ignores_order() {
		let lhs = TickerSet::from_query(Some("MSFT,AAPL")).expect("Valid set.");
		let rhs = TickerSet::from_query(Some("AAPL,MSFT")).expect("Valid set.");

		assert_eq!(lhs.cache_key(), rhs.cache_key());
		assert_eq!(lhs.cache_key(), "financial_data:AAPL_MSFT");
	}
}
