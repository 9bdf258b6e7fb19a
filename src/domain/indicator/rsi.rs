//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100
//! If both averages are 0 (flat prices): RSI = 50
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price::PriceSeries;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(series: &PriceSeries, period: usize) -> IndicatorSeries {
    let points = series.points();
    let invalid = |date| IndicatorPoint {
        date,
        valid: false,
        value: IndicatorValue::Simple(f64::NAN),
    };

    if period == 0 || points.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: points.iter().map(|p| invalid(p.date)).collect(),
        };
    }

    let mut values = Vec::with_capacity(points.len());
    values.push(invalid(points[0].date));

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..points.len() {
        let change = points[i].close - points[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let change_idx = i - 1;

        if change_idx < period {
            avg_gain += gain / period as f64;
            avg_loss += loss / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        }

        if change_idx + 1 < period {
            values.push(invalid(points[i].date));
        } else {
            values.push(IndicatorPoint {
                date: points[i].date,
                valid: true,
                value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
