//! Orchestration: wires the market data source, the portfolio store and the
//! price cache to the analytics engine.
//!
//! Every call is synchronous and stateless apart from the price cache.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::cache::PriceCache;
use crate::domain::config::AnalyticsConfig;
use crate::domain::error::AnalyzerError;
use crate::domain::grading::{ReportCard, grade_report};
use crate::domain::indicator::compute_indicator_set;
use crate::domain::metrics::{MetricsReport, compute_metrics};
use crate::domain::optimizer::{
    EfficientFrontier, MeanVariance, PortfolioStats, efficient_frontier, optimize_max_sharpe,
};
use crate::domain::portfolio::{AllocationMethod, Portfolio, equal_weights};
use crate::domain::price::{DateRange, PriceTable};
use crate::domain::regime::{
    CurrentRegime, RegimePoint, RegimeStats, assess_current_regime, classify_regimes,
    regime_statistics,
};
use crate::domain::returns::{AssetReturns, ReturnKind, ReturnSeries};
use crate::domain::risk::{ForwardRisk, MonteCarloConfig, MonteCarloSummary, forward_risk, monte_carlo};
use crate::domain::signal::{HoldingAnalysis, analyze_holding};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::portfolio_store_port::PortfolioStorePort;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    pub name: String,
    pub tickers: Vec<String>,
    pub allocation: AllocationMethod,
    /// Required for `Custom`, ignored otherwise.
    pub weights: Option<Vec<f64>>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Weights from the max-Sharpe solver. `converged` is false when the solver
/// ran out of iterations and its last feasible point was used instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedWeights {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    pub stats: PortfolioStats,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub forward: ForwardRisk,
    pub monte_carlo: MonteCarloSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeReport {
    pub points: Vec<RegimePoint>,
    pub statistics: Vec<RegimeStats>,
    pub current: CurrentRegime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAnalysis {
    pub metrics: MetricsReport,
    pub grades: ReportCard,
    pub frontier: Option<EfficientFrontier>,
    pub holdings: Vec<HoldingAnalysis>,
    pub risk: RiskReport,
    pub regimes: RegimeReport,
}

pub struct Analyzer<'a> {
    market_data: &'a dyn MarketDataPort,
    store: &'a dyn PortfolioStorePort,
    config: AnalyticsConfig,
    cache: PriceCache,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        market_data: &'a dyn MarketDataPort,
        store: &'a dyn PortfolioStorePort,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            market_data,
            store,
            config,
            cache: PriceCache::new(),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn cache(&mut self) -> &mut PriceCache {
        &mut self.cache
    }

    /// All requested tickers, or `MissingTicker` naming the ones that failed.
    fn load_prices(
        &mut self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, AnalyzerError> {
        let outcome = self.cache.get_or_fetch(self.market_data, tickers, start, end)?;
        if !outcome.failed.is_empty() {
            for failed in &outcome.failed {
                tracing::warn!(ticker = %failed.ticker, reason = %failed.reason, "price fetch failed");
            }
            return Err(AnalyzerError::MissingTicker {
                tickers: outcome.failed_tickers(),
            });
        }
        Ok(outcome.table)
    }

    fn load_asset_returns(
        &mut self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AssetReturns, AnalyzerError> {
        let range = DateRange::new(start, end)?;
        let table = self.load_prices(tickers, start, end)?;
        let aligned = table.align(tickers, Some(&range), self.config.align)?;
        tracing::info!(
            tickers = tickers.len(),
            dates = aligned.len(),
            policy = %self.config.align,
            "aligned prices"
        );
        AssetReturns::from_aligned(&aligned)
    }

    pub fn build_portfolio(&mut self, request: &BuildRequest) -> Result<Portfolio, AnalyzerError> {
        if request.tickers.is_empty() {
            return Err(AnalyzerError::InvalidWeights {
                reason: "portfolio has no tickers".into(),
            });
        }
        let asset_returns = self.load_asset_returns(&request.tickers, request.start, request.end)?;

        let weights = match request.allocation {
            AllocationMethod::Equal => equal_weights(request.tickers.len()),
            AllocationMethod::Custom => request.weights.clone().ok_or_else(|| AnalyzerError::InvalidWeights {
                reason: "custom allocation needs weights".into(),
            })?,
            AllocationMethod::Optimized => self.optimal_weights(&asset_returns)?.weights,
        };

        let window = DateRange::new(request.start, request.end)?;
        let portfolio =
            Portfolio::new(request.name.clone(), asset_returns, weights, request.allocation)?.with_window(window);
        tracing::info!(
            name = %portfolio.name,
            allocation = %portfolio.allocation,
            observations = portfolio.returns.len(),
            "built portfolio"
        );
        Ok(portfolio)
    }

    /// Max-Sharpe weights, falling back to the solver's last feasible point
    /// when it does not converge.
    pub fn optimal_weights(&self, asset_returns: &AssetReturns) -> Result<OptimizedWeights, AnalyzerError> {
        let model = self.model(asset_returns)?;
        match optimize_max_sharpe(&model, &self.config.optimizer) {
            Ok(result) => Ok(OptimizedWeights {
                tickers: result.tickers,
                weights: result.weights,
                stats: result.stats,
                converged: true,
            }),
            Err(err) => match err.fallback_weights() {
                Some(weights) => {
                    tracing::warn!(error = %err, "optimizer did not converge, using best feasible weights");
                    Ok(OptimizedWeights {
                        tickers: model.tickers.clone(),
                        weights: weights.to_vec(),
                        stats: model.statistics(weights),
                        converged: false,
                    })
                }
                None => Err(err),
            },
        }
    }

    /// A new portfolio over the same history with max-Sharpe weights.
    pub fn reoptimize(&self, portfolio: &Portfolio) -> Result<(Portfolio, OptimizedWeights), AnalyzerError> {
        let optimized = self.optimal_weights(&portfolio.asset_returns)?;
        let reweighted = portfolio.reweighted(optimized.weights.clone(), AllocationMethod::Optimized)?;
        Ok((reweighted, optimized))
    }

    fn model(&self, asset_returns: &AssetReturns) -> Result<MeanVariance, AnalyzerError> {
        MeanVariance::from_returns(asset_returns, self.config.trading_days, self.config.risk_free_rate)
    }

    pub fn benchmark_returns(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ReturnSeries, AnalyzerError> {
        let tickers = vec![ticker.to_string()];
        let table = self.load_prices(&tickers, start, end)?;
        let series = table.get(ticker).ok_or_else(|| AnalyzerError::MissingTicker {
            tickers: tickers.clone(),
        })?;
        ReturnSeries::from_prices(series, ReturnKind::Simple)
    }

    pub fn metrics(&mut self, portfolio: &Portfolio, benchmark: Option<&str>) -> Result<MetricsReport, AnalyzerError> {
        let bench = match benchmark {
            Some(ticker) => {
                let window = portfolio.price_window();
                Some(self.benchmark_returns(ticker, window.start, window.end)?)
            }
            None => None,
        };
        compute_metrics(&portfolio.returns, bench.as_ref(), &self.config)
    }

    pub fn grades(&mut self, portfolio: &Portfolio, benchmark: Option<&str>) -> Result<ReportCard, AnalyzerError> {
        Ok(grade_report(&self.metrics(portfolio, benchmark)?))
    }

    pub fn frontier(&self, portfolio: &Portfolio) -> Result<EfficientFrontier, AnalyzerError> {
        let model = self.model(&portfolio.asset_returns)?;
        efficient_frontier(
            &model,
            self.config.frontier_samples,
            self.config.seed,
            &self.config.optimizer,
        )
    }

    /// Signal and stance for every holding with enough history.
    pub fn holdings(&mut self, portfolio: &Portfolio) -> Result<Vec<HoldingAnalysis>, AnalyzerError> {
        let window = portfolio.price_window();
        let table = self.load_prices(&portfolio.tickers, window.start, window.end)?;
        let mut analyses = Vec::with_capacity(portfolio.tickers.len());
        for ticker in &portfolio.tickers {
            let Some(series) = table.get(ticker) else {
                continue;
            };
            let set = compute_indicator_set(series, &self.config.indicators);
            match analyze_holding(&set, &self.config.indicators, &self.config.signals) {
                Some(analysis) => analyses.push(analysis),
                None => tracing::warn!(ticker = %ticker, "no price history for signal"),
            }
        }
        Ok(analyses)
    }

    pub fn risk(&self, portfolio: &Portfolio, simulation: &MonteCarloConfig) -> Result<RiskReport, AnalyzerError> {
        Ok(RiskReport {
            forward: forward_risk(&portfolio.returns, self.config.trading_days)?,
            monte_carlo: monte_carlo(&portfolio.returns, simulation)?,
        })
    }

    pub fn regimes(&self, portfolio: &Portfolio) -> Result<RegimeReport, AnalyzerError> {
        let returns = &portfolio.returns;
        if returns.len() < 2 {
            return Err(AnalyzerError::insufficient("regimes", returns.len(), 2));
        }
        let points = classify_regimes(returns, self.config.regime_lookback, self.config.trading_days);
        let statistics = regime_statistics(returns, &points, self.config.trading_days);
        let closes = returns.recover_prices(100.0);
        Ok(RegimeReport {
            current: assess_current_regime(returns, &closes, self.config.trading_days),
            points,
            statistics,
        })
    }

    /// Everything at once. The frontier is skipped for single-asset
    /// portfolios.
    pub fn analyze(&mut self, portfolio: &Portfolio, benchmark: Option<&str>) -> Result<PortfolioAnalysis, AnalyzerError> {
        let metrics = self.metrics(portfolio, benchmark)?;
        let grades = grade_report(&metrics);
        let frontier = match self.frontier(portfolio) {
            Ok(f) => Some(f),
            Err(err) => {
                tracing::warn!(error = %err, "skipping efficient frontier");
                None
            }
        };
        let simulation = MonteCarloConfig {
            seed: self.config.seed,
            ..MonteCarloConfig::default()
        };
        Ok(PortfolioAnalysis {
            metrics,
            grades,
            frontier,
            holdings: self.holdings(portfolio)?,
            risk: self.risk(portfolio, &simulation)?,
            regimes: self.regimes(portfolio)?,
        })
    }

    pub fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), AnalyzerError> {
        self.store.save(&portfolio.name, portfolio)?;
        tracing::info!(name = %portfolio.name, "saved portfolio");
        Ok(())
    }

    pub fn load_portfolio(&self, name: &str) -> Result<Portfolio, AnalyzerError> {
        self.store
            .load(name)?
            .ok_or_else(|| AnalyzerError::PortfolioNotFound { name: name.to_string() })
    }

    pub fn list_portfolios(&self) -> Result<Vec<String>, AnalyzerError> {
        self.store.list()
    }

    pub fn delete_portfolio(&self, name: &str) -> Result<(), AnalyzerError> {
        if self.store.delete(name)? {
            tracing::info!(name = %name, "deleted portfolio");
            Ok(())
        } else {
            Err(AnalyzerError::PortfolioNotFound { name: name.to_string() })
        }
    }
}
