//! CSV price adapter: one `<TICKER>.csv` per ticker under a base directory.
//!
//! Files need a header with a `date` column (YYYY-MM-DD) and an adjusted
//! close column, `adj_close` when present, otherwise `close`. Rows may be in
//! any order.

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::AnalyzerError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::market_data_port::{FailedTicker, FetchOutcome, MarketDataPort};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    pub fn read_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, AnalyzerError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| AnalyzerError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| AnalyzerError::DataSource {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let column = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };
        let date_col = column(&["date"]).ok_or_else(|| AnalyzerError::DataSource {
            reason: format!("{}: missing date column", path.display()),
        })?;
        let close_col = column(&["adj_close", "adj close", "adjclose"])
            .or_else(|| column(&["close"]))
            .ok_or_else(|| AnalyzerError::DataSource {
                reason: format!("{}: missing close column", path.display()),
            })?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| AnalyzerError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                AnalyzerError::DataSource {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            if date < start || date > end {
                continue;
            }

            let close_str = record.get(close_col).unwrap_or_default().trim();
            let close: f64 = close_str.parse().map_err(|e| AnalyzerError::DataSource {
                reason: format!("invalid close value '{}': {}", close_str, e),
            })?;

            points.push(PricePoint { date, close });
        }

        if points.is_empty() {
            return Err(AnalyzerError::DataSource {
                reason: format!("no prices between {} and {}", start, end),
            });
        }

        points.sort_by_key(|p| p.date);
        PriceSeries::new(ticker, points)
    }

    /// Tickers with a CSV file in the base directory, sorted.
    pub fn list_tickers(&self) -> Result<Vec<String>, AnalyzerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AnalyzerError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AnalyzerError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchOutcome, AnalyzerError> {
        if !self.base_path.is_dir() {
            return Err(AnalyzerError::DataSource {
                reason: format!("price directory {} does not exist", self.base_path.display()),
            });
        }

        let mut outcome = FetchOutcome::default();
        for ticker in tickers {
            match self.read_series(ticker, start, end) {
                Ok(series) => {
                    tracing::debug!(ticker = %ticker, points = series.len(), "loaded prices");
                    outcome.table.insert(series);
                }
                Err(e) => outcome.failed.push(FailedTicker {
                    ticker: ticker.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        Ok(outcome)
    }
}
