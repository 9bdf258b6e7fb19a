//! Mean-variance optimisation.
//!
//! Max-Sharpe weights are found by projected gradient ascent on the long-only
//! simplex (weights in [0, 1], summing to 1), starting from equal weights.
//! The Sharpe surface is not concave in general, so the result is a local
//! optimum.
//!
//! The efficient frontier is sampled with uniform random weights normalised
//! onto the simplex. A fixed seed reproduces the same cloud.

use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::domain::config::OptimizerConfig;
use crate::domain::error::AnalyzerError;
use crate::domain::returns::AssetReturns;
use crate::domain::stats;

const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
}

/// Annualised mean vector and covariance matrix of a set of assets.
#[derive(Debug, Clone)]
pub struct MeanVariance {
    pub tickers: Vec<String>,
    pub mean: Vec<f64>,
    pub cov: Vec<Vec<f64>>,
    pub risk_free_rate: f64,
}

impl MeanVariance {
    pub fn from_returns(
        returns: &AssetReturns,
        trading_days: usize,
        risk_free_rate: f64,
    ) -> Result<Self, AnalyzerError> {
        if returns.len() < 2 {
            return Err(AnalyzerError::insufficient("mean-variance model", returns.len(), 2));
        }
        let days = trading_days as f64;
        let columns = returns.columns();
        let mean = columns.iter().map(|c| stats::mean(c) * days).collect();
        let cov = stats::covariance_matrix(&columns)
            .into_iter()
            .map(|row| row.into_iter().map(|c| c * days).collect())
            .collect();
        Ok(Self {
            tickers: returns.tickers.clone(),
            mean,
            cov,
            risk_free_rate,
        })
    }

    pub fn asset_count(&self) -> usize {
        self.mean.len()
    }

    pub fn statistics(&self, weights: &[f64]) -> PortfolioStats {
        let expected_return = stats::dot(weights, &self.mean);
        let volatility = stats::quadratic_form(weights, &self.cov).max(0.0).sqrt();
        PortfolioStats {
            expected_return,
            volatility,
            sharpe: stats::ratio(expected_return - self.risk_free_rate, volatility),
        }
    }

    fn sharpe(&self, weights: &[f64]) -> f64 {
        self.statistics(weights).sharpe
    }

    /// d/dw of (wᵀμ - rf) / sqrt(wᵀΣw).
    fn sharpe_gradient(&self, weights: &[f64]) -> Vec<f64> {
        let variance = stats::quadratic_form(weights, &self.cov);
        let sigma = variance.sqrt();
        let excess = stats::dot(weights, &self.mean) - self.risk_free_rate;
        self.cov
            .iter()
            .zip(&self.mean)
            .map(|(row, mu)| {
                let sigma_w = stats::dot(row, weights);
                (mu * sigma - excess * sigma_w / sigma) / variance
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    pub stats: PortfolioStats,
    pub iterations: usize,
}

/// Max-Sharpe weights. Exhausting the iteration budget yields
/// `AnalyzerError::Optimization` carrying the best weights reached.
pub fn optimize_max_sharpe(
    model: &MeanVariance,
    config: &OptimizerConfig,
) -> Result<OptimizationResult, AnalyzerError> {
    let n = model.asset_count();
    if n < 2 {
        return Err(AnalyzerError::Optimization {
            reason: format!("need at least 2 assets, have {}", n),
            best_weights: None,
        });
    }

    let mut weights = vec![1.0 / n as f64; n];
    let mut value = model.sharpe(&weights);
    if !value.is_finite() {
        return Err(AnalyzerError::Optimization {
            reason: "Sharpe ratio undefined at equal weights (zero volatility)".into(),
            best_weights: None,
        });
    }

    for iteration in 1..=config.max_iterations {
        let gradient = model.sharpe_gradient(&weights);
        if gradient.iter().any(|g| !g.is_finite()) {
            return Err(AnalyzerError::Optimization {
                reason: format!("gradient undefined at iteration {}", iteration),
                best_weights: Some(weights),
            });
        }

        let mut step = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let candidate: Vec<f64> = weights
                .iter()
                .zip(&gradient)
                .map(|(w, g)| w + step * g)
                .collect();
            let candidate = project_to_simplex(&candidate);
            let moved: Vec<f64> = candidate.iter().zip(&weights).map(|(c, w)| c - w).collect();
            let candidate_value = model.sharpe(&candidate);
            if candidate_value >= value + ARMIJO * stats::dot(&gradient, &moved) {
                accepted = Some((candidate, candidate_value));
                break;
            }
            step *= 0.5;
        }

        let Some((next, next_value)) = accepted else {
            // no ascent direction left on the simplex
            return Ok(finish(model, weights, iteration));
        };

        let improvement = next_value - value;
        weights = next;
        value = next_value;
        if improvement.abs() <= config.tolerance {
            return Ok(finish(model, weights, iteration));
        }
    }

    Err(AnalyzerError::Optimization {
        reason: format!(
            "no convergence within {} iterations",
            config.max_iterations
        ),
        best_weights: Some(weights),
    })
}

fn finish(model: &MeanVariance, weights: Vec<f64>, iterations: usize) -> OptimizationResult {
    OptimizationResult {
        tickers: model.tickers.clone(),
        stats: model.statistics(&weights),
        weights,
        iterations,
    }
}

/// Euclidean projection onto { w : w_i >= 0, Σ w_i = 1 }.
pub fn project_to_simplex(v: &[f64]) -> Vec<f64> {
    if v.is_empty() {
        return Vec::new();
    }
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (i, u) in sorted.iter().enumerate() {
        cumulative += u;
        let t = (cumulative - 1.0) / (i + 1) as f64;
        if u - t > 0.0 {
            theta = t;
        }
    }
    v.iter().map(|x| (x - theta).max(0.0)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub weights: Vec<f64>,
    pub stats: PortfolioStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficientFrontier {
    pub tickers: Vec<String>,
    pub points: Vec<FrontierPoint>,
    /// Solver result (or its fallback), when one was reached.
    pub max_sharpe: Option<FrontierPoint>,
}

impl EfficientFrontier {
    pub fn best_sampled_sharpe(&self) -> Option<&FrontierPoint> {
        self.points
            .iter()
            .filter(|p| p.stats.sharpe.is_finite())
            .max_by(|a, b| a.stats.sharpe.total_cmp(&b.stats.sharpe))
    }

    pub fn min_volatility(&self) -> Option<&FrontierPoint> {
        self.points
            .iter()
            .min_by(|a, b| a.stats.volatility.total_cmp(&b.stats.volatility))
    }
}

pub fn efficient_frontier(
    model: &MeanVariance,
    samples: usize,
    seed: Option<u64>,
    config: &OptimizerConfig,
) -> Result<EfficientFrontier, AnalyzerError> {
    let n = model.asset_count();
    if n < 2 {
        return Err(AnalyzerError::Optimization {
            reason: format!("need at least 2 assets, have {}", n),
            best_weights: None,
        });
    }

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let uniform = Uniform::new(0.0, 1.0);

    let mut points = Vec::with_capacity(samples);
    while points.len() < samples {
        let raw: Vec<f64> = (0..n).map(|_| uniform.sample(&mut rng)).collect();
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            continue;
        }
        let weights: Vec<f64> = raw.iter().map(|w| w / total).collect();
        points.push(FrontierPoint {
            stats: model.statistics(&weights),
            weights,
        });
    }

    let solved = match optimize_max_sharpe(model, config) {
        Ok(result) => Some(result.weights),
        Err(err) => {
            let fallback = err.fallback_weights().map(<[f64]>::to_vec);
            tracing::warn!(error = %err, "frontier max-Sharpe point from fallback weights");
            fallback
        }
    };
    let max_sharpe = solved.map(|weights| FrontierPoint {
        stats: model.statistics(&weights),
        weights,
    });

    Ok(EfficientFrontier {
        tickers: model.tickers.clone(),
        points,
        max_sharpe,
    })
}
