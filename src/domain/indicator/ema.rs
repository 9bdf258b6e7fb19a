//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price::PriceSeries;

pub fn calculate_ema(series: &PriceSeries, period: usize) -> IndicatorSeries {
    let ema = ema_values(&series.closes(), period);

    let values = series
        .points()
        .iter()
        .zip(ema)
        .map(|(point, v)| IndicatorPoint {
            date: point.date,
            valid: !v.is_nan(),
            value: IndicatorValue::Simple(v),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// EMA over raw values. Leading NaNs are skipped; the seed is the SMA of
/// the first `period` defined values. Output is NaN-padded to `input.len()`.
pub fn ema_values(input: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; input.len()];
    if period == 0 {
        return out;
    }

    let Some(first) = input.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    let seed_end = first + period - 1;
    if seed_end >= input.len() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = input[first..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = ema;

    for i in (seed_end + 1)..input.len() {
        ema = input[i] * k + ema * (1.0 - k);
        out[i] = ema;
    }
    out
}
