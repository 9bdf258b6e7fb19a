//! Typed analytics configuration.
//!
//! Every value has a default; a config file only needs to name what it
//! overrides. Range checks live in `config_validation`.

use crate::domain::error::AnalyzerError;
use crate::domain::price::AlignPolicy;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub sma_short: usize,
    pub sma_medium: usize,
    pub sma_long: usize,
    pub bollinger_period: usize,
    pub bollinger_mult: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub pivot_order: usize,
    pub max_levels: usize,
    pub recent_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            sma_short: 20,
            sma_medium: 50,
            sma_long: 200,
            bollinger_period: 20,
            bollinger_mult: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            pivot_order: 5,
            max_levels: 3,
            recent_window: 20,
        }
    }
}

/// Vote weights and thresholds of the signal generator.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_weak_oversold: f64,
    pub rsi_weak_overbought: f64,
    pub strong_vote: i32,
    pub weak_vote: i32,
    pub strong_threshold: i32,
    pub threshold: i32,
    pub confidence_per_point: f64,
    /// Fractional distance to a level that counts as "near".
    pub proximity_pct: f64,
    pub accumulation_band: f64,
    pub trend_lookback: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_weak_oversold: 40.0,
            rsi_weak_overbought: 60.0,
            strong_vote: 2,
            weak_vote: 1,
            strong_threshold: 4,
            threshold: 2,
            confidence_per_point: 15.0,
            proximity_pct: 0.02,
            accumulation_band: 0.03,
            trend_lookback: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub risk_free_rate: f64,
    pub trading_days: usize,
    pub var_confidence: f64,
    pub frontier_samples: usize,
    pub align: AlignPolicy,
    pub seed: Option<u64>,
    pub regime_lookback: usize,
    pub indicators: IndicatorConfig,
    pub signals: SignalConfig,
    pub optimizer: OptimizerConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            trading_days: 252,
            var_confidence: 0.95,
            frontier_samples: 5000,
            align: AlignPolicy::Intersect,
            seed: None,
            regime_lookback: 60,
            indicators: IndicatorConfig::default(),
            signals: SignalConfig::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, AnalyzerError> {
        let d = AnalyticsConfig::default();

        let align = match config.get_string("analytics", "align") {
            Some(raw) => raw.parse().map_err(|reason| AnalyzerError::ConfigInvalid {
                section: "analytics".to_string(),
                key: "align".to_string(),
                reason,
            })?,
            None => d.align,
        };

        let seed = match config.get_string("analytics", "seed") {
            Some(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|_| {
                AnalyzerError::ConfigInvalid {
                    section: "analytics".to_string(),
                    key: "seed".to_string(),
                    reason: format!("'{}' is not an unsigned integer", raw),
                }
            })?),
            _ => None,
        };

        let ind = &d.indicators;
        let indicators = IndicatorConfig {
            rsi_period: get_usize(config, "indicators", "rsi_period", ind.rsi_period)?,
            sma_short: get_usize(config, "indicators", "sma_short", ind.sma_short)?,
            sma_medium: get_usize(config, "indicators", "sma_medium", ind.sma_medium)?,
            sma_long: get_usize(config, "indicators", "sma_long", ind.sma_long)?,
            bollinger_period: get_usize(config, "indicators", "bollinger_period", ind.bollinger_period)?,
            bollinger_mult: config.get_double("indicators", "bollinger_mult", ind.bollinger_mult),
            macd_fast: get_usize(config, "indicators", "macd_fast", ind.macd_fast)?,
            macd_slow: get_usize(config, "indicators", "macd_slow", ind.macd_slow)?,
            macd_signal: get_usize(config, "indicators", "macd_signal", ind.macd_signal)?,
            pivot_order: get_usize(config, "indicators", "pivot_order", ind.pivot_order)?,
            max_levels: get_usize(config, "indicators", "max_levels", ind.max_levels)?,
            recent_window: get_usize(config, "indicators", "recent_window", ind.recent_window)?,
        };

        let sig = &d.signals;
        let signals = SignalConfig {
            strong_threshold: get_i32(config, "signals", "strong_threshold", sig.strong_threshold)?,
            threshold: get_i32(config, "signals", "threshold", sig.threshold)?,
            proximity_pct: config.get_double("signals", "proximity_pct", sig.proximity_pct),
            accumulation_band: config.get_double("signals", "accumulation_band", sig.accumulation_band),
            trend_lookback: get_usize(config, "signals", "trend_lookback", sig.trend_lookback)?,
            ..sig.clone()
        };

        let optimizer = OptimizerConfig {
            max_iterations: get_usize(config, "optimizer", "max_iterations", d.optimizer.max_iterations)?,
            tolerance: config.get_double("optimizer", "tolerance", d.optimizer.tolerance),
        };

        Ok(AnalyticsConfig {
            risk_free_rate: config.get_double("analytics", "risk_free_rate", d.risk_free_rate),
            trading_days: get_usize(config, "analytics", "trading_days", d.trading_days)?,
            var_confidence: config.get_double("analytics", "var_confidence", d.var_confidence),
            frontier_samples: get_usize(config, "analytics", "frontier_samples", d.frontier_samples)?,
            align,
            seed,
            regime_lookback: get_usize(config, "analytics", "regime_lookback", d.regime_lookback)?,
            indicators,
            signals,
            optimizer,
        })
    }

    /// `sqrt(trading_days)`, the daily-to-annual volatility scale.
    pub fn annualization(&self) -> f64 {
        (self.trading_days as f64).sqrt()
    }
}

fn get_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, AnalyzerError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| AnalyzerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{} must be non-negative, got {}", key, value),
    })
}

fn get_i32(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i32,
) -> Result<i32, AnalyzerError> {
    let value = config.get_int(section, key, i64::from(default));
    i32::try_from(value).map_err(|_| AnalyzerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{} is out of range", value),
    })
}
