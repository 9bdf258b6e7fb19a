//! Historical price source port.

use chrono::NaiveDate;

use crate::domain::error::AnalyzerError;
use crate::domain::price::PriceTable;

/// A ticker the source could not deliver, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTicker {
    pub ticker: String,
    pub reason: String,
}

/// Prices that loaded plus the tickers that did not. A partial result is
/// not an error; callers decide whether a missing ticker is fatal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub table: PriceTable,
    pub failed: Vec<FailedTicker>,
}

impl FetchOutcome {
    pub fn failed_tickers(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.ticker.clone()).collect()
    }
}

pub trait MarketDataPort {
    /// Adjusted closes for `tickers` between `start` and `end` inclusive.
    fn fetch_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchOutcome, AnalyzerError>;
}
