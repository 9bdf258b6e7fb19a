//! Price series, price tables and explicit date alignment.
//!
//! Series from different tickers never meet implicitly: every multi-ticker
//! computation goes through [`PriceTable::align`], which produces a single
//! shared date axis according to an [`AlignPolicy`].

use crate::domain::error::AnalyzerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Adjusted-close prices for one ticker, dates strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, AnalyzerError> {
        let ticker = ticker.into();
        for w in points.windows(2) {
            if w[1].date <= w[0].date {
                return Err(AnalyzerError::MisalignedData {
                    reason: format!(
                        "{}: dates not strictly increasing at {} -> {}",
                        ticker, w[0].date, w[1].date
                    ),
                });
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.close.is_finite() || p.close <= 0.0) {
            return Err(AnalyzerError::DataSource {
                reason: format!("{}: invalid price {} on {}", ticker, bad.close, bad.date),
            });
        }
        Ok(Self { ticker, points })
    }

    pub fn from_pairs(
        ticker: impl Into<String>,
        pairs: &[(NaiveDate, f64)],
    ) -> Result<Self, AnalyzerError> {
        let points = pairs
            .iter()
            .map(|&(date, close)| PricePoint { date, close })
            .collect();
        Self::new(ticker, points)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].close)
    }

    /// Sub-series restricted to `range` (inclusive).
    pub fn within(&self, range: &DateRange) -> PriceSeries {
        PriceSeries {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .filter(|p| range.contains(p.date))
                .copied()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalyzerError> {
        if start > end {
            return Err(AnalyzerError::MisalignedData {
                reason: format!("start date {} is after end date {}", start, end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// How the shared date axis of a [`PriceTable`] is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlignPolicy {
    /// Keep only dates on which every ticker has a price.
    #[default]
    Intersect,
    /// Union of dates; gaps carry the previous price forward. Dates before
    /// every ticker has started trading are dropped.
    ForwardFill,
}

impl fmt::Display for AlignPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignPolicy::Intersect => write!(f, "intersect"),
            AlignPolicy::ForwardFill => write!(f, "forward_fill"),
        }
    }
}

impl FromStr for AlignPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intersect" | "inner" | "drop" => Ok(AlignPolicy::Intersect),
            "forward_fill" | "ffill" | "forward-fill" => Ok(AlignPolicy::ForwardFill),
            other => Err(format!("unknown align policy '{}'", other)),
        }
    }
}

/// Prices for several tickers keyed by ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    series: BTreeMap<String, PriceSeries>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }

    pub fn get(&self, ticker: &str) -> Option<&PriceSeries> {
        self.series.get(ticker)
    }

    pub fn tickers(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.values()
    }

    /// Build a single date axis for `tickers` (in the given order).
    pub fn align(
        &self,
        tickers: &[String],
        range: Option<&DateRange>,
        policy: AlignPolicy,
    ) -> Result<AlignedPrices, AnalyzerError> {
        let mut selected: Vec<PriceSeries> = Vec::with_capacity(tickers.len());
        let mut missing = Vec::new();

        for ticker in tickers {
            let series = match (self.series.get(ticker), range) {
                (Some(s), Some(r)) => s.within(r),
                (Some(s), None) => s.clone(),
                (None, _) => {
                    missing.push(ticker.clone());
                    continue;
                }
            };
            if series.is_empty() {
                missing.push(ticker.clone());
                continue;
            }
            selected.push(series);
        }

        if !missing.is_empty() {
            return Err(AnalyzerError::MissingTicker { tickers: missing });
        }
        if selected.is_empty() {
            return Err(AnalyzerError::insufficient("aligned prices", 0, 2));
        }

        let (dates, columns) = match policy {
            AlignPolicy::Intersect => intersect_columns(&selected),
            AlignPolicy::ForwardFill => forward_fill_columns(&selected),
        };

        if dates.len() < 2 {
            return Err(AnalyzerError::insufficient(
                format!("aligned prices ({})", policy),
                dates.len(),
                2,
            ));
        }

        Ok(AlignedPrices {
            dates,
            tickers: tickers.to_vec(),
            columns,
        })
    }
}

fn intersect_columns(selected: &[PriceSeries]) -> (Vec<NaiveDate>, Vec<Vec<f64>>) {
    let mut common: BTreeSet<NaiveDate> = selected[0].points.iter().map(|p| p.date).collect();
    for series in &selected[1..] {
        let dates: BTreeSet<NaiveDate> = series.points.iter().map(|p| p.date).collect();
        common.retain(|d| dates.contains(d));
    }
    let dates: Vec<NaiveDate> = common.into_iter().collect();
    let columns = selected
        .iter()
        .map(|s| dates.iter().filter_map(|&d| s.price_on(d)).collect())
        .collect();
    (dates, columns)
}

fn forward_fill_columns(selected: &[PriceSeries]) -> (Vec<NaiveDate>, Vec<Vec<f64>>) {
    let all_dates: BTreeSet<NaiveDate> = selected
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.date))
        .collect();

    let mut cursors = vec![0usize; selected.len()];
    let mut last: Vec<Option<f64>> = vec![None; selected.len()];
    let mut dates = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); selected.len()];

    for date in all_dates {
        for (i, series) in selected.iter().enumerate() {
            while cursors[i] < series.points.len() && series.points[cursors[i]].date <= date {
                last[i] = Some(series.points[cursors[i]].close);
                cursors[i] += 1;
            }
        }
        if last.iter().all(Option::is_some) {
            dates.push(date);
            for (col, value) in columns.iter_mut().zip(&last) {
                col.extend(*value);
            }
        }
    }
    (dates, columns)
}

/// Price matrix on a shared date axis, one column per ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPrices {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl AlignedPrices {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_for(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }
}
