//! Explicit price cache keyed by (ticker set, date range).
//!
//! Only complete fetches are kept so a ticker that failed once is retried
//! on the next request.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::domain::error::AnalyzerError;
use crate::ports::market_data_port::{FetchOutcome, MarketDataPort};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tickers: BTreeSet<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(tickers: &[String], start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            tickers: tickers.iter().cloned().collect(),
            start,
            end,
        }
    }
}

#[derive(Debug, Default)]
pub struct PriceCache {
    entries: HashMap<CacheKey, FetchOutcome>,
    hits: usize,
    misses: usize,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_fetch(
        &mut self,
        source: &dyn MarketDataPort,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchOutcome, AnalyzerError> {
        let key = CacheKey::new(tickers, start, end);
        if let Some(outcome) = self.entries.get(&key) {
            self.hits += 1;
            tracing::debug!(tickers = ?key.tickers, %start, %end, "price cache hit");
            return Ok(outcome.clone());
        }

        self.misses += 1;
        let outcome = source.fetch_prices(tickers, start, end)?;
        if outcome.failed.is_empty() {
            self.entries.insert(key, outcome.clone());
        } else {
            tracing::debug!(failed = outcome.failed.len(), "partial fetch not cached");
        }
        Ok(outcome)
    }

    /// Drop every entry that includes `ticker`. Returns how many were dropped.
    pub fn invalidate(&mut self, ticker: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.tickers.contains(ticker));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}
