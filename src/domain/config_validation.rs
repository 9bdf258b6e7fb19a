//! Configuration validation.
//!
//! Typed analytics settings are range-checked after they are read; the
//! adapter sections (`[data]`, `[store]`) are checked against the raw port.

use crate::domain::config::AnalyticsConfig;
use crate::domain::error::AnalyzerError;
use crate::ports::config_port::ConfigPort;

pub const STORE_BACKENDS: [&str; 2] = ["json", "sqlite"];

pub fn validate_analytics_config(config: &AnalyticsConfig) -> Result<(), AnalyzerError> {
    validate_analytics(config)?;
    validate_indicators(config)?;
    validate_signals(config)?;
    validate_optimizer(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> AnalyzerError {
    AnalyzerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_analytics(config: &AnalyticsConfig) -> Result<(), AnalyzerError> {
    if !(0.0..1.0).contains(&config.risk_free_rate) {
        return Err(invalid("analytics", "risk_free_rate", "risk_free_rate must be between 0 and 1"));
    }
    if config.trading_days == 0 {
        return Err(invalid("analytics", "trading_days", "trading_days must be positive"));
    }
    if !(config.var_confidence > 0.0 && config.var_confidence < 1.0) {
        return Err(invalid("analytics", "var_confidence", "var_confidence must be in (0, 1)"));
    }
    if config.frontier_samples == 0 {
        return Err(invalid("analytics", "frontier_samples", "frontier_samples must be positive"));
    }
    if config.regime_lookback < 2 {
        return Err(invalid("analytics", "regime_lookback", "regime_lookback must be at least 2"));
    }
    Ok(())
}

fn validate_indicators(config: &AnalyticsConfig) -> Result<(), AnalyzerError> {
    let ind = &config.indicators;
    let periods = [
        ("rsi_period", ind.rsi_period),
        ("sma_short", ind.sma_short),
        ("sma_medium", ind.sma_medium),
        ("sma_long", ind.sma_long),
        ("bollinger_period", ind.bollinger_period),
        ("macd_fast", ind.macd_fast),
        ("macd_slow", ind.macd_slow),
        ("macd_signal", ind.macd_signal),
        ("pivot_order", ind.pivot_order),
        ("max_levels", ind.max_levels),
        ("recent_window", ind.recent_window),
    ];
    if let Some((key, _)) = periods.iter().find(|(_, p)| *p == 0) {
        return Err(invalid("indicators", key, format!("{} must be positive", key)));
    }
    if !(ind.sma_short < ind.sma_medium && ind.sma_medium < ind.sma_long) {
        return Err(invalid(
            "indicators",
            "sma_medium",
            "sma periods must satisfy sma_short < sma_medium < sma_long",
        ));
    }
    if ind.macd_fast >= ind.macd_slow {
        return Err(invalid("indicators", "macd_fast", "macd_fast must be below macd_slow"));
    }
    if ind.bollinger_period < 2 {
        return Err(invalid("indicators", "bollinger_period", "bollinger_period must be at least 2"));
    }
    if ind.bollinger_mult <= 0.0 {
        return Err(invalid("indicators", "bollinger_mult", "bollinger_mult must be positive"));
    }
    Ok(())
}

fn validate_signals(config: &AnalyticsConfig) -> Result<(), AnalyzerError> {
    let sig = &config.signals;
    if sig.threshold <= 0 {
        return Err(invalid("signals", "threshold", "threshold must be positive"));
    }
    if sig.strong_threshold < sig.threshold {
        return Err(invalid(
            "signals",
            "strong_threshold",
            "strong_threshold must not be below threshold",
        ));
    }
    if !(sig.proximity_pct > 0.0 && sig.proximity_pct < 1.0) {
        return Err(invalid("signals", "proximity_pct", "proximity_pct must be in (0, 1)"));
    }
    if !(0.0..1.0).contains(&sig.accumulation_band) {
        return Err(invalid("signals", "accumulation_band", "accumulation_band must be in [0, 1)"));
    }
    if sig.trend_lookback == 0 {
        return Err(invalid("signals", "trend_lookback", "trend_lookback must be positive"));
    }
    Ok(())
}

fn validate_optimizer(config: &AnalyticsConfig) -> Result<(), AnalyzerError> {
    if !(config.optimizer.tolerance > 0.0) {
        return Err(invalid("optimizer", "tolerance", "tolerance must be positive"));
    }
    Ok(())
}

/// `[data] path` must name the price directory.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<String, AnalyzerError> {
    match config.get_string("data", "path") {
        Some(p) if !p.trim().is_empty() => Ok(p.trim().to_string()),
        _ => Err(AnalyzerError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

/// `[store]` needs a known backend (default json) and a path.
pub fn validate_store_config(config: &dyn ConfigPort) -> Result<(String, String), AnalyzerError> {
    let backend = config
        .get_string("store", "backend")
        .map(|b| b.trim().to_lowercase())
        .unwrap_or_else(|| "json".to_string());
    if !STORE_BACKENDS.contains(&backend.as_str()) {
        return Err(invalid(
            "store",
            "backend",
            format!("unknown backend '{}', expected json or sqlite", backend),
        ));
    }
    match config.get_string("store", "path") {
        Some(p) if !p.trim().is_empty() => Ok((backend, p.trim().to_string())),
        _ => Err(AnalyzerError::ConfigMissing {
            section: "store".to_string(),
            key: "path".to_string(),
        }),
    }
}
