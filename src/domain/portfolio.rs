//! The Portfolio aggregate: tickers, validated weights and the return series
//! derived from them. Changing weights produces a new Portfolio.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::AnalyzerError;
use crate::domain::price::DateRange;
use crate::domain::returns::{AssetReturns, ReturnSeries};

pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllocationMethod {
    #[default]
    Equal,
    Custom,
    Optimized,
}

impl fmt::Display for AllocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationMethod::Equal => write!(f, "equal"),
            AllocationMethod::Custom => write!(f, "custom"),
            AllocationMethod::Optimized => write!(f, "optimized"),
        }
    }
}

impl FromStr for AllocationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(AllocationMethod::Equal),
            "custom" => Ok(AllocationMethod::Custom),
            "optimized" | "optimised" | "max_sharpe" => Ok(AllocationMethod::Optimized),
            other => Err(format!("unknown allocation method '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub name: String,
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    pub allocation: AllocationMethod,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Price window the portfolio was built from. `start` is the first
    /// return date, one bar after the first price.
    #[serde(default)]
    pub window: Option<DateRange>,
    pub returns: ReturnSeries,
    pub asset_returns: AssetReturns,
}

impl Portfolio {
    pub fn new(
        name: impl Into<String>,
        asset_returns: AssetReturns,
        weights: Vec<f64>,
        allocation: AllocationMethod,
    ) -> Result<Self, AnalyzerError> {
        validate_weights(&weights, asset_returns.asset_count())?;
        let returns = asset_returns.portfolio_returns(&weights)?;
        let (start, end) = match (asset_returns.dates.first(), asset_returns.dates.last()) {
            (Some(&s), Some(&e)) => (s, e),
            _ => return Err(AnalyzerError::insufficient("portfolio", 0, 2)),
        };
        Ok(Self {
            name: name.into(),
            tickers: asset_returns.tickers.clone(),
            weights,
            allocation,
            start,
            end,
            window: None,
            returns,
            asset_returns,
        })
    }

    pub fn with_window(mut self, window: DateRange) -> Self {
        self.window = Some(window);
        self
    }

    /// Range to fetch prices over so they line up with the portfolio's
    /// returns. Falls back to the return dates when no window was recorded.
    pub fn price_window(&self) -> DateRange {
        self.window.unwrap_or(DateRange {
            start: self.start,
            end: self.end,
        })
    }

    pub fn equal_weighted(name: impl Into<String>, asset_returns: AssetReturns) -> Result<Self, AnalyzerError> {
        let weights = equal_weights(asset_returns.asset_count());
        Self::new(name, asset_returns, weights, AllocationMethod::Equal)
    }

    /// Same assets and history under new weights.
    pub fn reweighted(&self, weights: Vec<f64>, allocation: AllocationMethod) -> Result<Self, AnalyzerError> {
        let mut next = Self::new(self.name.clone(), self.asset_returns.clone(), weights, allocation)?;
        next.window = self.window;
        Ok(next)
    }

    pub fn weight_of(&self, ticker: &str) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.weights[i])
    }

    pub fn holdings(&self) -> impl Iterator<Item = (&str, f64)> {
        self.tickers.iter().map(String::as_str).zip(self.weights.iter().copied())
    }
}

pub fn equal_weights(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// Weights must match the asset count, each lie in [0, 1] and sum to 1.
pub fn validate_weights(weights: &[f64], asset_count: usize) -> Result<(), AnalyzerError> {
    if asset_count == 0 {
        return Err(AnalyzerError::InvalidWeights {
            reason: "portfolio has no assets".into(),
        });
    }
    if weights.len() != asset_count {
        return Err(AnalyzerError::InvalidWeights {
            reason: format!("{} weights for {} assets", weights.len(), asset_count),
        });
    }
    if let Some(w) = weights
        .iter()
        .find(|w| !w.is_finite() || **w < -WEIGHT_TOLERANCE || **w > 1.0 + WEIGHT_TOLERANCE)
    {
        return Err(AnalyzerError::InvalidWeights {
            reason: format!("weight {} outside [0, 1]", w),
        });
    }
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(AnalyzerError::InvalidWeights {
            reason: format!("weights sum to {:.6}, expected 1", total),
        });
    }
    Ok(())
}
