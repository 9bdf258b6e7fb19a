//! Return series builder.
//!
//! Simple return: `p[t] / p[t-1] - 1`. Log return: `ln(p[t] / p[t-1])`.
//! A return series is one element shorter than its price series and starts
//! on the second price date.

use crate::domain::error::AnalyzerError;
use crate::domain::price::{AlignedPrices, PriceSeries};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnKind {
    #[default]
    Simple,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    kind: ReturnKind,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

impl ReturnSeries {
    pub fn new(
        kind: ReturnKind,
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> Result<Self, AnalyzerError> {
        if dates.len() != values.len() {
            return Err(AnalyzerError::MisalignedData {
                reason: format!("{} dates for {} return values", dates.len(), values.len()),
            });
        }
        if dates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AnalyzerError::MisalignedData {
                reason: "return dates not strictly increasing".into(),
            });
        }
        Ok(Self {
            kind,
            dates,
            values,
        })
    }

    /// Simple returns over a sequence of closes sharing `dates`.
    pub fn from_closes(
        dates: &[NaiveDate],
        closes: &[f64],
        kind: ReturnKind,
    ) -> Result<Self, AnalyzerError> {
        if dates.len() != closes.len() {
            return Err(AnalyzerError::MisalignedData {
                reason: format!("{} dates for {} prices", dates.len(), closes.len()),
            });
        }
        if closes.len() < 2 {
            return Err(AnalyzerError::insufficient("return series", closes.len(), 2));
        }
        let values = closes
            .windows(2)
            .map(|w| match kind {
                ReturnKind::Simple => w[1] / w[0] - 1.0,
                ReturnKind::Log => (w[1] / w[0]).ln(),
            })
            .collect();
        Self::new(kind, dates[1..].to_vec(), values)
    }

    pub fn from_prices(series: &PriceSeries, kind: ReturnKind) -> Result<Self, AnalyzerError> {
        Self::from_closes(&series.dates(), &series.closes(), kind)
    }

    pub fn kind(&self) -> ReturnKind {
        self.kind
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The last `n` observations (or all of them when shorter).
    pub fn tail(&self, n: usize) -> ReturnSeries {
        let start = self.len().saturating_sub(n);
        ReturnSeries {
            kind: self.kind,
            dates: self.dates[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Same series expressed as simple returns.
    pub fn to_simple(&self) -> ReturnSeries {
        match self.kind {
            ReturnKind::Simple => self.clone(),
            ReturnKind::Log => ReturnSeries {
                kind: ReturnKind::Simple,
                dates: self.dates.clone(),
                values: self.values.iter().map(|r| r.exp_m1()).collect(),
            },
        }
    }

    /// Inner join on dates. Both outputs share exactly the same date axis.
    pub fn intersect(&self, other: &ReturnSeries) -> Result<(ReturnSeries, ReturnSeries), AnalyzerError> {
        let (mut i, mut j) = (0, 0);
        let mut dates = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();

        while i < self.dates.len() && j < other.dates.len() {
            match self.dates[i].cmp(&other.dates[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dates.push(self.dates[i]);
                    left.push(self.values[i]);
                    right.push(other.values[j]);
                    i += 1;
                    j += 1;
                }
            }
        }

        if dates.is_empty() {
            return Err(AnalyzerError::MisalignedData {
                reason: "return series share no dates".into(),
            });
        }

        Ok((
            ReturnSeries {
                kind: self.kind,
                dates: dates.clone(),
                values: left,
            },
            ReturnSeries {
                kind: other.kind,
                dates,
                values: right,
            },
        ))
    }

    /// Growth of one unit invested, after each period.
    pub fn cumulative_growth(&self) -> Vec<f64> {
        let mut acc = 1.0;
        self.values
            .iter()
            .map(|&r| {
                acc *= match self.kind {
                    ReturnKind::Simple => 1.0 + r,
                    ReturnKind::Log => r.exp(),
                };
                acc
            })
            .collect()
    }

    pub fn total_return(&self) -> f64 {
        self.cumulative_growth().last().map_or(0.0, |g| g - 1.0)
    }

    /// Rebuild the price path from `start_price`; length is `len() + 1`.
    pub fn recover_prices(&self, start_price: f64) -> Vec<f64> {
        std::iter::once(start_price)
            .chain(self.cumulative_growth().into_iter().map(|g| start_price * g))
            .collect()
    }

    /// Returns compounded per calendar month, oldest first.
    pub fn monthly_returns(&self) -> Vec<MonthlyReturn> {
        let simple = self.to_simple();
        let mut months: Vec<MonthlyReturn> = Vec::new();
        for (date, r) in simple.dates.iter().zip(&simple.values) {
            match months.last_mut() {
                Some(m) if m.year == date.year() && m.month == date.month() => {
                    m.value = (1.0 + m.value) * (1.0 + r) - 1.0;
                }
                _ => months.push(MonthlyReturn {
                    year: date.year(),
                    month: date.month(),
                    value: *r,
                }),
            }
        }
        months
    }
}

/// Simple returns for several tickers on one shared date axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReturns {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub series: Vec<ReturnSeries>,
}

impl AssetReturns {
    pub fn from_aligned(prices: &AlignedPrices) -> Result<Self, AnalyzerError> {
        let series = prices
            .columns
            .iter()
            .map(|col| ReturnSeries::from_closes(&prices.dates, col, ReturnKind::Simple))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            dates: prices.dates[1..].to_vec(),
            tickers: prices.tickers.clone(),
            series,
        })
    }

    pub fn asset_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<&ReturnSeries> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| &self.series[i])
    }

    pub fn columns(&self) -> Vec<&[f64]> {
        self.series.iter().map(|s| s.values()).collect()
    }

    /// Weighted sum of asset returns per date.
    pub fn portfolio_returns(&self, weights: &[f64]) -> Result<ReturnSeries, AnalyzerError> {
        if weights.len() != self.asset_count() {
            return Err(AnalyzerError::InvalidWeights {
                reason: format!(
                    "{} weights for {} assets",
                    weights.len(),
                    self.asset_count()
                ),
            });
        }
        if self.len() < 2 {
            return Err(AnalyzerError::insufficient("portfolio returns", self.len(), 2));
        }
        let values = (0..self.len())
            .map(|t| {
                self.series
                    .iter()
                    .zip(weights)
                    .map(|(s, w)| w * s.values[t])
                    .sum()
            })
            .collect();
        ReturnSeries::new(ReturnKind::Simple, self.dates.clone(), values)
    }
}
