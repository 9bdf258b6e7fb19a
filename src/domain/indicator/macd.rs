//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded with the SMA of the first
//! `signal` defined line values
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: max(fast, slow) - 1 + signal - 1 bars

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, ema_values};
use crate::domain::price::PriceSeries;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    series: &PriceSeries,
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if series.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let closes = series.closes();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_values(&macd_line, signal_period);

    let values = series
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let line = macd_line[i];
            let signal = signal_line[i];
            let valid = !signal.is_nan();
            IndicatorPoint {
                date: point.date,
                valid,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(series: &PriceSeries) -> IndicatorSeries {
    calculate_macd(series, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::series;

    fn rising(n: usize) -> PriceSeries {
        let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        series(&prices)
    }

    #[test]
    fn macd_warmup_default() {
        let s = calculate_macd_default(&rising(40));

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for i in 0..warmup {
            assert!(!s.values[i].valid, "Index {} should not be valid", i);
        }
        assert!(s.values[warmup].valid, "Index {} should be valid", warmup);
    }

    #[test]
    fn macd_invalid_points_carry_nan() {
        let s = calculate_macd_default(&rising(40));
        match s.values[0].value {
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => {
                assert!(line.is_nan());
                assert!(signal.is_nan());
                assert!(histogram.is_nan());
            }
            _ => panic!("Expected MACD value"),
        }
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let s = calculate_macd_default(&rising(40));

        for point in s.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!((histogram - (line - signal)).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let prices = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];
        let s = calculate_macd(&series(&prices), 3, 5, 2);

        let ema_fast = ema_values(&prices, 3);
        let ema_slow = ema_values(&prices, 5);

        for (i, point) in s.values.iter().enumerate().skip(4) {
            if let IndicatorValue::Macd { line, .. } = point.value {
                let expected_line = ema_fast[i] - ema_slow[i];
                assert!(
                    (line - expected_line).abs() < f64::EPSILON,
                    "MACD line mismatch at index {}",
                    i
                );
            }
        }
    }

    #[test]
    fn macd_signal_seeded_with_sma_of_line() {
        let prices = [10.0, 12.0, 11.0, 15.0, 14.0, 18.0, 17.0, 21.0];
        let s = calculate_macd(&series(&prices), 2, 3, 3);

        let lines: Vec<f64> = s
            .values
            .iter()
            .map(|p| match p.value {
                IndicatorValue::Macd { line, .. } => line,
                _ => f64::NAN,
            })
            .collect();
        // line defined from index 2, signal seed at index 4
        let seed = (lines[2] + lines[3] + lines[4]) / 3.0;
        match s.values[4].value {
            IndicatorValue::Macd { signal, .. } => assert!((signal - seed).abs() < 1e-12),
            _ => panic!("Expected MACD value"),
        }
        assert!(!s.values[3].valid);
        assert!(s.values[4].valid);
    }

    #[test]
    fn macd_indicator_type() {
        let s = calculate_macd(&series(&[100.0, 101.0, 102.0]), 5, 10, 3);

        assert_eq!(
            s.indicator_type,
            IndicatorType::Macd {
                fast: 5,
                slow: 10,
                signal: 3
            }
        );
    }

    #[test]
    fn macd_empty_series() {
        let s = calculate_macd_default(&series(&[]));
        assert!(s.values.is_empty());
    }

    #[test]
    fn macd_zero_period() {
        let prices = series(&[100.0, 101.0, 102.0]);

        assert!(calculate_macd(&prices, 0, 26, 9).values.is_empty());
        assert!(calculate_macd(&prices, 12, 0, 9).values.is_empty());
        assert!(calculate_macd(&prices, 12, 26, 0).values.is_empty());
    }

    #[test]
    fn macd_custom_parameters() {
        let s = calculate_macd(&rising(20), 5, 10, 3);

        let warmup = 10 - 1 + 3 - 1;
        assert!(!s.values[warmup - 1].valid);
        assert!(s.values[warmup].valid);
    }
}
