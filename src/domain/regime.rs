//! Market regime classification.
//!
//! Rolling regimes: each date with a full lookback window is labelled by its
//! annualised rolling mean (above +2% bull, below -2% bear, otherwise
//! sideways) and, for bull and bear, by whether its rolling volatility is
//! above the median rolling volatility. Dates inside the first window carry
//! no regime.
//!
//! The current regime looks only at the recent tail of the series.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::returns::ReturnSeries;
use crate::domain::stats;

pub const DEFAULT_LOOKBACK: usize = 60;
const TREND_THRESHOLD: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Regime {
    BullLowVol,
    BullHighVol,
    Sideways,
    BearLowVol,
    BearHighVol,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::BullLowVol => "Bull Market (Low Vol)",
            Regime::BullHighVol => "Bull Market (High Vol)",
            Regime::Sideways => "Sideways/Choppy",
            Regime::BearLowVol => "Bear Market (Low Vol)",
            Regime::BearHighVol => "Bear Market (High Vol)",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimePoint {
    pub date: NaiveDate,
    pub regime: Option<Regime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats {
    pub regime: Regime,
    pub occurrences: usize,
    pub mean_daily_return: f64,
    pub annual_volatility: f64,
    pub best_day: f64,
    pub worst_day: f64,
    pub win_rate: f64,
}

pub fn classify_regimes(
    returns: &ReturnSeries,
    lookback: usize,
    trading_days: usize,
) -> Vec<RegimePoint> {
    let values = returns.values();
    let days = trading_days as f64;

    let rolling: Vec<Option<(f64, f64)>> = (0..values.len())
        .map(|i| {
            if lookback < 2 || i + 1 < lookback {
                return None;
            }
            let window = &values[i + 1 - lookback..=i];
            Some((stats::mean(window) * days, stats::sample_std(window) * days.sqrt()))
        })
        .collect();

    let vols: Vec<f64> = rolling.iter().flatten().map(|&(_, v)| v).collect();
    let vol_median = stats::percentile(&vols, 0.5);

    returns
        .dates()
        .iter()
        .zip(&rolling)
        .map(|(&date, window)| RegimePoint {
            date,
            regime: window.map(|(mean, vol)| {
                let high_vol = vol > vol_median;
                if mean > TREND_THRESHOLD {
                    if high_vol { Regime::BullHighVol } else { Regime::BullLowVol }
                } else if mean < -TREND_THRESHOLD {
                    if high_vol { Regime::BearHighVol } else { Regime::BearLowVol }
                } else {
                    Regime::Sideways
                }
            }),
        })
        .collect()
}

/// Per-regime statistics, ordered by regime.
pub fn regime_statistics(
    returns: &ReturnSeries,
    regimes: &[RegimePoint],
    trading_days: usize,
) -> Vec<RegimeStats> {
    let mut buckets: std::collections::BTreeMap<Regime, Vec<f64>> = Default::default();
    for (r, point) in returns.values().iter().zip(regimes) {
        if let Some(regime) = point.regime {
            buckets.entry(regime).or_default().push(*r);
        }
    }

    buckets
        .into_iter()
        .map(|(regime, rs)| RegimeStats {
            regime,
            occurrences: rs.len(),
            mean_daily_return: stats::mean(&rs),
            annual_volatility: stats::sample_std(&rs) * (trading_days as f64).sqrt(),
            best_day: rs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_day: rs.iter().copied().fold(f64::INFINITY, f64::min),
            win_rate: rs.iter().filter(|&&r| r > 0.0).count() as f64 / rs.len() as f64,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketState {
    Crisis,
    Bear,
    Bull,
    Recovery,
    Neutral,
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketState::Crisis => "High Volatility / Crisis",
            MarketState::Bear => "Bear Market",
            MarketState::Bull => "Bull Market",
            MarketState::Recovery => "Recovery",
            MarketState::Neutral => "Neutral / Consolidation",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRegime {
    pub state: MarketState,
    pub volatility: f64,
    /// None when there are not enough closes for the lookback.
    pub momentum_60d: Option<f64>,
    pub return_20d: Option<f64>,
    pub trend: TrendLabel,
    /// Price relative to SMA(200), as a fraction.
    pub price_vs_sma200: Option<f64>,
}

/// Assess the regime from the latest returns and closes of one series.
pub fn assess_current_regime(returns: &ReturnSeries, closes: &[f64], trading_days: usize) -> CurrentRegime {
    let tail = returns.tail(DEFAULT_LOOKBACK);
    let volatility = stats::sample_std(tail.values()) * (trading_days as f64).sqrt();

    let trailing = |n: usize| match (closes.last(), closes.len().checked_sub(n)) {
        (Some(last), Some(i)) => Some(last / closes[i] - 1.0),
        _ => None,
    };
    let return_20d = trailing(20);
    let momentum_60d = trailing(60);

    let sma = |n: usize| (closes.len() >= n).then(|| stats::mean(&closes[closes.len() - n..]));
    let (sma50, sma200) = (sma(50), sma(200));
    let trend = match (sma50, sma200) {
        (Some(a), Some(b)) if a > b => TrendLabel::Bullish,
        (Some(a), Some(b)) if a < b => TrendLabel::Bearish,
        (Some(_), Some(_)) => TrendLabel::Neutral,
        _ => TrendLabel::InsufficientData,
    };
    let price_vs_sma200 = match (closes.last(), sma200) {
        (Some(p), Some(s)) => Some(p / s - 1.0),
        _ => None,
    };

    let state = if volatility > 0.35 {
        MarketState::Crisis
    } else if momentum_60d.is_some_and(|m| m < -0.10) && volatility > 0.25 {
        MarketState::Bear
    } else if momentum_60d.is_some_and(|m| m > 0.15) && volatility < 0.20 {
        MarketState::Bull
    } else if momentum_60d.is_some_and(|m| m > 0.0) && return_20d.is_some_and(|r| r > 0.0) {
        MarketState::Recovery
    } else {
        MarketState::Neutral
    };

    CurrentRegime {
        state,
        volatility,
        momentum_60d,
        return_20d,
        trend,
        price_vs_sma200,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::returns::ReturnKind;
    use approx::assert_abs_diff_eq;

    fn returns(values: &[f64]) -> ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        ReturnSeries::new(ReturnKind::Simple, dates, values.to_vec()).unwrap()
    }

    fn alternating(n: usize, drift: f64, swing: f64) -> Vec<f64> {
        (0..n)
            .map(|i| drift + if i % 2 == 0 { swing } else { -swing })
            .collect()
    }

    #[test]
    fn warmup_has_no_regime() {
        let r = returns(&alternating(10, 0.001, 0.01));
        let regimes = classify_regimes(&r, 5, 252);
        assert_eq!(regimes.len(), 10);
        assert!(regimes[..4].iter().all(|p| p.regime.is_none()));
        assert!(regimes[4..].iter().all(|p| p.regime.is_some()));
    }

    #[test]
    fn bull_and_bear_split_by_volatility() {
        let mut values = alternating(20, 0.002, 0.002);
        values.extend(alternating(20, -0.002, 0.02));
        let r = returns(&values);
        let regimes = classify_regimes(&r, 10, 252);

        assert_eq!(regimes[15].regime, Some(Regime::BullLowVol));
        assert_eq!(regimes[39].regime, Some(Regime::BearHighVol));
    }

    #[test]
    fn flat_mean_is_sideways() {
        let r = returns(&alternating(30, 0.0, 0.01));
        let regimes = classify_regimes(&r, 10, 252);
        // even windows have mean exactly 0
        assert_eq!(regimes[29].regime, Some(Regime::Sideways));
    }

    #[test]
    fn stats_per_regime() {
        let mut values = alternating(20, 0.002, 0.002);
        values.extend(alternating(20, -0.002, 0.02));
        let r = returns(&values);
        let regimes = classify_regimes(&r, 10, 252);
        let stats = regime_statistics(&r, &regimes, 252);

        let total: usize = stats.iter().map(|s| s.occurrences).sum();
        assert_eq!(total, 31);
        let bull = stats.iter().find(|s| s.regime == Regime::BullLowVol).unwrap();
        assert!(bull.win_rate > 0.0);
        assert!(bull.best_day >= bull.worst_day);
    }

    #[test]
    fn crisis_when_volatility_is_extreme() {
        let values = alternating(80, 0.0, 0.05);
        let r = returns(&values);
        let closes = r.recover_prices(100.0);
        let current = assess_current_regime(&r, &closes, 252);
        assert_eq!(current.state, MarketState::Crisis);
        assert_eq!(current.trend, TrendLabel::InsufficientData);
    }

    #[test]
    fn bull_on_strong_calm_momentum() {
        let values = alternating(250, 0.004, 0.001);
        let r = returns(&values);
        let closes = r.recover_prices(100.0);
        let current = assess_current_regime(&r, &closes, 252);
        assert_eq!(current.state, MarketState::Bull);
        assert_eq!(current.trend, TrendLabel::Bullish);
        assert!(current.price_vs_sma200.unwrap() > 0.0);
    }

    #[test]
    fn short_history_is_neutral() {
        let r = returns(&[0.001, -0.001, 0.0005]);
        let closes = r.recover_prices(10.0);
        let current = assess_current_regime(&r, &closes, 252);
        assert_eq!(current.momentum_60d, None);
        assert_eq!(current.return_20d, None);
        assert_eq!(current.state, MarketState::Neutral);
    }

    #[test]
    fn short_slide_has_no_momentum_reading() {
        let r = returns(&[-0.03; 10]);
        let closes = r.recover_prices(100.0);
        let current = assess_current_regime(&r, &closes, 252);
        assert!(current.momentum_60d.is_none());
        assert!(current.return_20d.is_none());
        assert_eq!(current.state, MarketState::Neutral);
    }

    #[test]
    fn momentum_measured_once_history_allows() {
        let r = returns(&[0.001; 70]);
        let closes = r.recover_prices(100.0);
        let current = assess_current_regime(&r, &closes, 252);
        assert_abs_diff_eq!(current.momentum_60d.unwrap(), 1.001f64.powi(59) - 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(current.return_20d.unwrap(), 1.001f64.powi(19) - 1.0, epsilon = 1e-12);
    }
}
