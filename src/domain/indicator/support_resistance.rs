//! Support and resistance levels.
//!
//! Three families of levels are derived from the closes of one series:
//! - Order-k pivots: a close that is the minimum (support) or maximum
//!   (resistance) of the 2k+1 bar window centred on it. Equal prices collapse
//!   to the most recent pivot. Levels are split around the current price and
//!   ordered nearest-first, with recency breaking equal distances.
//! - Classic floor pivots from the last 3-bar high/low and the last close.
//! - The rolling high/low over the last `window` bars.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::price::PriceSeries;

pub const DEFAULT_ORDER: usize = 5;
pub const DEFAULT_MAX_LEVELS: usize = 3;
pub const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorPivots {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub current_price: f64,
    /// Below the current price, nearest first.
    pub supports: Vec<Level>,
    /// Above the current price, nearest first.
    pub resistances: Vec<Level>,
    pub floor: Option<FloorPivots>,
    pub recent_high: Option<f64>,
    pub recent_low: Option<f64>,
}

impl SupportResistance {
    pub fn nearest_support(&self) -> Option<f64> {
        self.supports.first().map(|l| l.price)
    }

    pub fn nearest_resistance(&self) -> Option<f64> {
        self.resistances.first().map(|l| l.price)
    }
}

pub fn calculate_support_resistance(
    series: &PriceSeries,
    order: usize,
    max_levels: usize,
    window: usize,
) -> SupportResistance {
    let points = series.points();
    let current_price = series.last().map_or(f64::NAN, |p| p.close);

    let mut lows = Vec::new();
    let mut highs = Vec::new();
    if order > 0 && points.len() > 2 * order {
        for i in order..points.len() - order {
            let close = points[i].close;
            let window = &points[i - order..=i + order];
            if window.iter().all(|p| close <= p.close) {
                lows.push(Level {
                    price: close,
                    date: points[i].date,
                });
            }
            if window.iter().all(|p| close >= p.close) {
                highs.push(Level {
                    price: close,
                    date: points[i].date,
                });
            }
        }
    }

    let supports = nearest_levels(
        dedupe_by_price(lows)
            .into_iter()
            .filter(|l| l.price < current_price)
            .collect(),
        current_price,
        max_levels,
    );
    let resistances = nearest_levels(
        dedupe_by_price(highs)
            .into_iter()
            .filter(|l| l.price > current_price)
            .collect(),
        current_price,
        max_levels,
    );

    let closes = series.closes();

    SupportResistance {
        current_price,
        supports,
        resistances,
        floor: floor_pivots(&closes),
        recent_high: rolling_extreme(&closes, window, f64::max),
        recent_low: rolling_extreme(&closes, window, f64::min),
    }
}

/// Keeps one level per price; the later pivot wins.
fn dedupe_by_price(levels: Vec<Level>) -> Vec<Level> {
    let mut out: Vec<Level> = Vec::with_capacity(levels.len());
    for level in levels {
        match out.iter_mut().find(|l| l.price == level.price) {
            Some(existing) if level.date > existing.date => *existing = level,
            Some(_) => {}
            None => out.push(level),
        }
    }
    out
}

fn nearest_levels(mut levels: Vec<Level>, current: f64, max: usize) -> Vec<Level> {
    levels.sort_by(|a, b| {
        let da = (a.price - current).abs();
        let db = (b.price - current).abs();
        da.total_cmp(&db).then_with(|| b.date.cmp(&a.date))
    });
    levels.truncate(max);
    levels
}

fn floor_pivots(closes: &[f64]) -> Option<FloorPivots> {
    if closes.len() < 3 {
        return None;
    }
    let last3 = &closes[closes.len() - 3..];
    let high = last3.iter().copied().fold(f64::MIN, f64::max);
    let low = last3.iter().copied().fold(f64::MAX, f64::min);
    let close = last3[2];

    let pivot = (high + low + close) / 3.0;
    Some(FloorPivots {
        pivot,
        r1: 2.0 * pivot - low,
        r2: pivot + (high - low),
        s1: 2.0 * pivot - high,
        s2: pivot - (high - low),
    })
}

fn rolling_extreme(closes: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    closes[closes.len() - window..].iter().copied().reduce(pick)
}
