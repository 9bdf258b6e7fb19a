#![allow(dead_code)]

use chrono::NaiveDate;
use portfolio_analyzer::domain::config::AnalyticsConfig;
use portfolio_analyzer::domain::error::AnalyzerError;
use portfolio_analyzer::domain::portfolio::Portfolio;
use portfolio_analyzer::domain::price::PriceSeries;
use portfolio_analyzer::ports::market_data_port::{FailedTicker, FetchOutcome, MarketDataPort};
use portfolio_analyzer::ports::portfolio_store_port::PortfolioStorePort;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

pub struct MockMarketData {
    pub data: HashMap<String, Vec<(NaiveDate, f64)>>,
    pub errors: HashMap<String, String>,
    pub calls: Cell<usize>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_prices(mut self, ticker: &str, prices: Vec<(NaiveDate, f64)>) -> Self {
        self.data.insert(ticker.to_string(), prices);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchOutcome, AnalyzerError> {
        self.calls.set(self.calls.get() + 1);
        let mut outcome = FetchOutcome::default();
        for ticker in tickers {
            if let Some(reason) = self.errors.get(ticker) {
                outcome.failed.push(FailedTicker {
                    ticker: ticker.clone(),
                    reason: reason.clone(),
                });
                continue;
            }
            let points: Vec<(NaiveDate, f64)> = self
                .data
                .get(ticker)
                .map(|p| p.iter().copied().filter(|(d, _)| *d >= start && *d <= end).collect())
                .unwrap_or_default();
            if points.is_empty() {
                outcome.failed.push(FailedTicker {
                    ticker: ticker.clone(),
                    reason: "no data".into(),
                });
                continue;
            }
            outcome.table.insert(PriceSeries::from_pairs(ticker.as_str(), &points)?);
        }
        Ok(outcome)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub portfolios: RefCell<BTreeMap<String, Portfolio>>,
}

impl PortfolioStorePort for MemoryStore {
    fn save(&self, name: &str, portfolio: &Portfolio) -> Result<(), AnalyzerError> {
        self.portfolios
            .borrow_mut()
            .insert(name.to_string(), portfolio.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Portfolio>, AnalyzerError> {
        Ok(self.portfolios.borrow().get(name).cloned())
    }

    fn list(&self) -> Result<Vec<String>, AnalyzerError> {
        Ok(self.portfolios.borrow().keys().cloned().collect())
    }

    fn delete(&self, name: &str) -> Result<bool, AnalyzerError> {
        Ok(self.portfolios.borrow_mut().remove(name).is_some())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn start_date() -> NaiveDate {
    date(2022, 1, 3)
}

/// Prices compounded from `returns`, one per calendar day from `start`.
pub fn prices_from_returns(start: NaiveDate, first: f64, returns: &[f64]) -> Vec<(NaiveDate, f64)> {
    let mut price = first;
    let mut out = vec![(start, price)];
    for (i, r) in returns.iter().enumerate() {
        price *= 1.0 + r;
        out.push((start + chrono::Duration::days(i as i64 + 1), price));
    }
    out
}

/// Deterministic wavy returns with a drift.
pub fn wavy_returns(n: usize, drift: f64, amplitude: f64, frequency: f64) -> Vec<f64> {
    (0..n)
        .map(|i| drift + amplitude * (i as f64 * frequency).sin())
        .collect()
}

pub fn wavy_prices(n: usize, drift: f64, amplitude: f64, frequency: f64) -> Vec<(NaiveDate, f64)> {
    prices_from_returns(start_date(), 100.0, &wavy_returns(n, drift, amplitude, frequency))
}

/// Three assets with 300 days of history.
pub fn three_asset_market() -> MockMarketData {
    MockMarketData::new()
        .with_prices("AAA", wavy_prices(300, 0.0008, 0.012, 0.7))
        .with_prices("BBB", wavy_prices(300, 0.0004, 0.006, 1.3))
        .with_prices("CCC", wavy_prices(300, 0.0002, 0.015, 2.1))
}

pub fn test_config() -> AnalyticsConfig {
    AnalyticsConfig {
        seed: Some(42),
        frontier_samples: 200,
        ..AnalyticsConfig::default()
    }
}

pub fn tickers(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
