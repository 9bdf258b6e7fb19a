//! All indicators for one ticker, computed in one pass over its series.

use std::collections::HashMap;

use crate::domain::config::IndicatorConfig;
use crate::domain::indicator::{
    IndicatorSeries, IndicatorType, SupportResistance, calculate_bollinger, calculate_macd,
    calculate_rsi, calculate_sma, calculate_support_resistance,
};
use crate::domain::price::PriceSeries;

#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub ticker: String,
    pub last_price: Option<f64>,
    pub series: HashMap<IndicatorType, IndicatorSeries>,
    pub levels: SupportResistance,
}

impl IndicatorSet {
    pub fn get(&self, indicator: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator)
    }
}

pub fn compute_indicator_set(series: &PriceSeries, config: &IndicatorConfig) -> IndicatorSet {
    let mut map = HashMap::new();

    for period in [config.sma_short, config.sma_medium, config.sma_long] {
        let s = calculate_sma(series, period);
        map.insert(s.indicator_type.clone(), s);
    }

    let list = [
        calculate_rsi(series, config.rsi_period),
        calculate_macd(series, config.macd_fast, config.macd_slow, config.macd_signal),
        calculate_bollinger(series, config.bollinger_period, mult_x100(config.bollinger_mult)),
    ];
    for s in list {
        map.insert(s.indicator_type.clone(), s);
    }

    IndicatorSet {
        ticker: series.ticker().to_string(),
        last_price: series.last().map(|p| p.close),
        series: map,
        levels: calculate_support_resistance(
            series,
            config.pivot_order,
            config.max_levels,
            config.recent_window,
        ),
    }
}

/// Bollinger multiplier as the integer key `IndicatorType` hashes on.
pub fn mult_x100(mult: f64) -> u32 {
    (mult * 100.0).round().max(0.0) as u32
}
