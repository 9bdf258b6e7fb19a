//! Trading signal and accumulate/distribute stance for one holding.
//!
//! The trading signal sums every indicator vote into one score and maps it
//! onto a five-point scale. The accumulate/distribute stance is a separate
//! rule on price versus a rising or falling SMA band; the two are reported
//! side by side and may disagree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::config::{IndicatorConfig, SignalConfig};
use crate::domain::indicator::set::mult_x100;
use crate::domain::indicator::{IndicatorSet, IndicatorType, IndicatorValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalAction {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalAction::StrongBuy => "STRONG BUY",
            SignalAction::Buy => "BUY",
            SignalAction::Hold => "HOLD",
            SignalAction::Sell => "SELL",
            SignalAction::StrongSell => "STRONG SELL",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    Accumulate,
    Distribute,
    Neutral,
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stance::Accumulate => "ACCUMULATE",
            Stance::Distribute => "DISTRIBUTE",
            Stance::Neutral => "NEUTRAL",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub source: String,
    pub points: i32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub action: SignalAction,
    pub score: i32,
    pub confidence: f64,
    pub votes: Vec<Vote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingAnalysis {
    pub ticker: String,
    pub signal: TradingSignal,
    pub stance: Stance,
}

/// Latest indicator readings the vote rules look at. Missing readings skip
/// the rules that need them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub prev_macd_histogram: Option<f64>,
    pub sma_medium: Option<f64>,
    pub sma_long: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub nearest_support: Option<f64>,
    pub nearest_resistance: Option<f64>,
    /// SMA(medium) `trend_lookback` bars ago.
    pub sma_medium_lagged: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn from_set(
        set: &IndicatorSet,
        indicators: &IndicatorConfig,
        signals: &SignalConfig,
    ) -> Option<Self> {
        let price = set.last_price?;

        let sma = move |period| set.get(&IndicatorType::Sma(period));
        let macd = set.get(&IndicatorType::Macd {
            fast: indicators.macd_fast,
            slow: indicators.macd_slow,
            signal: indicators.macd_signal,
        });
        let histogram = move |offset| match macd?.back(offset)?.value {
            IndicatorValue::Macd { histogram, .. } => Some(histogram),
            _ => None,
        };
        let bands = set
            .get(&IndicatorType::Bollinger {
                period: indicators.bollinger_period,
                stddev_mult_x100: mult_x100(indicators.bollinger_mult),
            })
            .and_then(|s| s.latest())
            .and_then(|p| match p.value {
                IndicatorValue::Bollinger { upper, lower, .. } => Some((upper, lower)),
                _ => None,
            });

        Some(IndicatorSnapshot {
            price,
            rsi: set
                .get(&IndicatorType::Rsi(indicators.rsi_period))
                .and_then(|s| s.latest_simple()),
            macd_histogram: histogram(0),
            prev_macd_histogram: histogram(1),
            sma_medium: sma(indicators.sma_medium).and_then(|s| s.latest_simple()),
            sma_long: sma(indicators.sma_long).and_then(|s| s.latest_simple()),
            bollinger_upper: bands.map(|b| b.0),
            bollinger_lower: bands.map(|b| b.1),
            nearest_support: set.levels.nearest_support(),
            nearest_resistance: set.levels.nearest_resistance(),
            sma_medium_lagged: sma(indicators.sma_medium)
                .and_then(|s| s.back(signals.trend_lookback))
                .and_then(|p| p.value.simple()),
        })
    }
}

pub fn generate_signal(snapshot: &IndicatorSnapshot, config: &SignalConfig) -> TradingSignal {
    let mut votes = Vec::new();
    let price = snapshot.price;
    let strong = config.strong_vote;
    let weak = config.weak_vote;

    if let Some(rsi) = snapshot.rsi {
        if rsi < config.rsi_oversold {
            votes.push(vote("RSI", strong, format!("oversold ({:.1})", rsi)));
        } else if rsi > config.rsi_overbought {
            votes.push(vote("RSI", -strong, format!("overbought ({:.1})", rsi)));
        } else if rsi < config.rsi_weak_oversold {
            votes.push(vote("RSI", weak, format!("weak ({:.1})", rsi)));
        } else if rsi > config.rsi_weak_overbought {
            votes.push(vote("RSI", -weak, format!("strong ({:.1})", rsi)));
        }
    }

    if let Some(hist) = snapshot.macd_histogram {
        let v = match snapshot.prev_macd_histogram {
            Some(prev) if prev < 0.0 && hist > 0.0 => vote("MACD", strong, "bullish crossover"),
            Some(prev) if prev > 0.0 && hist < 0.0 => vote("MACD", -strong, "bearish crossover"),
            _ if hist > 0.0 => vote("MACD", weak, "histogram positive"),
            _ => vote("MACD", -weak, "histogram negative"),
        };
        votes.push(v);
    }

    if let (Some(medium), Some(long)) = (snapshot.sma_medium, snapshot.sma_long) {
        let v = if price > medium && medium > long {
            vote("Trend", strong, "price above rising SMA stack")
        } else if price < medium && medium < long {
            vote("Trend", -strong, "price below falling SMA stack")
        } else if price > long {
            vote("Trend", weak, "price above long SMA")
        } else {
            vote("Trend", -weak, "price below long SMA")
        };
        votes.push(v);
    }

    if let Some(lower) = snapshot.bollinger_lower {
        if price < lower {
            votes.push(vote("Bollinger", weak, "below lower band"));
        }
    }
    if let Some(upper) = snapshot.bollinger_upper {
        if price > upper {
            votes.push(vote("Bollinger", -weak, "above upper band"));
        }
    }

    if let Some(support) = snapshot.nearest_support {
        if price >= support && price <= support * (1.0 + config.proximity_pct) {
            votes.push(vote("Support", weak, format!("near support {:.2}", support)));
        }
    }
    if let Some(resistance) = snapshot.nearest_resistance {
        if price <= resistance && price >= resistance * (1.0 - config.proximity_pct) {
            votes.push(vote(
                "Resistance",
                -weak,
                format!("near resistance {:.2}", resistance),
            ));
        }
    }

    let score: i32 = votes.iter().map(|v| v.points).sum();
    TradingSignal {
        action: classify_score(score, config),
        score,
        confidence: (score.abs() as f64 * config.confidence_per_point).min(100.0),
        votes,
    }
}

pub fn classify_score(score: i32, config: &SignalConfig) -> SignalAction {
    if score >= config.strong_threshold {
        SignalAction::StrongBuy
    } else if score >= config.threshold {
        SignalAction::Buy
    } else if score <= -config.strong_threshold {
        SignalAction::StrongSell
    } else if score <= -config.threshold {
        SignalAction::Sell
    } else {
        SignalAction::Hold
    }
}

pub fn classify_stance(snapshot: &IndicatorSnapshot, config: &SignalConfig) -> Stance {
    let (Some(sma), Some(lagged)) = (snapshot.sma_medium, snapshot.sma_medium_lagged) else {
        return Stance::Neutral;
    };
    let price = snapshot.price;
    if price > sma * (1.0 + config.accumulation_band) && sma > lagged {
        Stance::Accumulate
    } else if price < sma * (1.0 - config.accumulation_band) && sma < lagged {
        Stance::Distribute
    } else {
        Stance::Neutral
    }
}

pub fn analyze_holding(
    set: &IndicatorSet,
    indicators: &IndicatorConfig,
    signals: &SignalConfig,
) -> Option<HoldingAnalysis> {
    let snapshot = IndicatorSnapshot::from_set(set, indicators, signals)?;
    Some(HoldingAnalysis {
        ticker: set.ticker.clone(),
        signal: generate_signal(&snapshot, signals),
        stance: classify_stance(&snapshot, signals),
    })
}

fn vote(source: &str, points: i32, reason: impl Into<String>) -> Vote {
    Vote {
        source: source.to_string(),
        points,
        reason: reason.into(),
    }
}
