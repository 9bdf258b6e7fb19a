//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Undefined (NaN, invalid) until n closes
//! exist; never a partial average.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price::PriceSeries;

pub fn calculate_sma(series: &PriceSeries, period: usize) -> IndicatorSeries {
    let points = series.points();
    let mut values = Vec::with_capacity(points.len());

    for (i, point) in points.iter().enumerate() {
        let valid = period > 0 && i + 1 >= period;
        let value = if valid {
            points[i + 1 - period..=i].iter().map(|p| p.close).sum::<f64>() / period as f64
        } else {
            f64::NAN
        };
        values.push(IndicatorPoint {
            date: point.date,
            valid,
            value: IndicatorValue::Simple(value),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
