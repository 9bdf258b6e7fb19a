//! Forward-looking risk estimates and Monte Carlo simulation.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::domain::error::AnalyzerError;
use crate::domain::metrics::compute_drawdown;
use crate::domain::returns::ReturnSeries;
use crate::domain::stats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardRisk {
    pub expected_annual_return: f64,
    pub expected_volatility: f64,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub cvar_99: f64,
    pub probability_of_loss: f64,
    pub historical_max_drawdown: f64,
}

pub fn forward_risk(returns: &ReturnSeries, trading_days: usize) -> Result<ForwardRisk, AnalyzerError> {
    if returns.len() < 2 {
        return Err(AnalyzerError::insufficient("forward risk", returns.len(), 2));
    }
    let returns = returns.to_simple();
    let r = returns.values();
    let days = trading_days as f64;

    let var_95 = stats::percentile(r, 1.0 - 0.95);
    let var_99 = stats::percentile(r, 1.0 - 0.99);
    let tail_mean = |cutoff: f64| {
        let tail: Vec<f64> = r.iter().copied().filter(|&x| x <= cutoff).collect();
        stats::mean(&tail)
    };

    Ok(ForwardRisk {
        expected_annual_return: stats::mean(r) * days,
        expected_volatility: stats::sample_std(r) * days.sqrt(),
        var_95,
        var_99,
        cvar_95: tail_mean(var_95),
        cvar_99: tail_mean(var_99),
        probability_of_loss: r.iter().filter(|&&x| x < 0.0).count() as f64 / r.len() as f64,
        historical_max_drawdown: compute_drawdown(&returns.cumulative_growth()).0,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub paths: usize,
    pub days: usize,
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            paths: 1000,
            days: 252,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub paths: usize,
    pub days: usize,
    pub terminal_p5: f64,
    pub terminal_p50: f64,
    pub terminal_p95: f64,
    pub probability_below_start: f64,
    /// Terminal value of every path, unsorted.
    pub terminal_values: Vec<f64>,
}

/// Simulates growth of 1.0 under normal daily returns fitted to `returns`.
pub fn monte_carlo(returns: &ReturnSeries, config: &MonteCarloConfig) -> Result<MonteCarloSummary, AnalyzerError> {
    if returns.len() < 2 {
        return Err(AnalyzerError::insufficient("monte carlo", returns.len(), 2));
    }
    if config.paths == 0 || config.days == 0 {
        return Err(AnalyzerError::ConfigInvalid {
            section: "risk".to_string(),
            key: if config.paths == 0 { "paths" } else { "days" }.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let simple = returns.to_simple();
    let mean = stats::mean(simple.values());
    let std = stats::sample_std(simple.values());
    let normal = Normal::new(mean, std).map_err(|e| AnalyzerError::MisalignedData {
        reason: format!("cannot fit return distribution: {}", e),
    })?;

    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let terminal_values: Vec<f64> = (0..config.paths)
        .map(|_| (0..config.days).fold(1.0, |value, _| value * (1.0 + normal.sample(&mut rng))))
        .collect();

    let below = terminal_values.iter().filter(|&&v| v < 1.0).count();
    Ok(MonteCarloSummary {
        paths: config.paths,
        days: config.days,
        terminal_p5: stats::percentile(&terminal_values, 0.05),
        terminal_p50: stats::percentile(&terminal_values, 0.50),
        terminal_p95: stats::percentile(&terminal_values, 0.95),
        probability_below_start: below as f64 / config.paths as f64,
        terminal_values,
    })
}
