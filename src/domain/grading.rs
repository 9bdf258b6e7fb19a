//! A–F report card over a metrics report.
//!
//! Each graded metric has fixed bands calibrated so a broad equity index
//! lands around a B. The overall grade is a weighted GPA; metrics without a
//! named weight count 0.5%. Undefined (NaN) values grade N/A and score as a C.

use std::fmt;

use serde::Serialize;

use crate::domain::metrics::MetricsReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
    NotApplicable,
}

impl Grade {
    pub fn points(self) -> f64 {
        match self {
            Grade::A => 4.0,
            Grade::B => 3.0,
            Grade::C | Grade::NotApplicable => 2.0,
            Grade::D => 1.0,
            Grade::F => 0.0,
        }
    }

    pub fn from_gpa(gpa: f64) -> Grade {
        if gpa >= 3.5 {
            Grade::A
        } else if gpa >= 2.5 {
            Grade::B
        } else if gpa >= 1.5 {
            Grade::C
        } else if gpa >= 0.5 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::NotApplicable => "N/A",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricGrade {
    pub metric: &'static str,
    pub value: f64,
    pub grade: Grade,
    pub scale: &'static str,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCard {
    pub grades: Vec<MetricGrade>,
    pub gpa: f64,
    pub overall: Grade,
}

enum Bands {
    /// Minimum value for A, B, C, D.
    HigherIsBetter([f64; 4]),
    /// Maximum value (exclusive) for A, B, C, D.
    LowerIsBetter([f64; 4]),
    /// Nested `[low, high)` intervals for A, B, C, D.
    Within([(f64, f64); 4]),
}

struct Rule {
    metric: &'static str,
    bands: Bands,
    scale: &'static str,
    weight: f64,
}

const OTHER_WEIGHT: f64 = 0.005;

const RULES: &[Rule] = &[
    Rule {
        metric: "Annual Return",
        bands: Bands::HigherIsBetter([0.12, 0.08, 0.04, 0.0]),
        scale: "A: >12%, B: 8-12%, C: 4-8%, D: 0-4%, F: <0%",
        weight: 0.15,
    },
    Rule {
        metric: "Sharpe Ratio",
        bands: Bands::HigherIsBetter([1.0, 0.5, 0.2, 0.0]),
        scale: "A: >1.0, B: 0.5-1.0, C: 0.2-0.5, D: 0-0.2, F: <0",
        weight: 0.25,
    },
    Rule {
        metric: "Sortino Ratio",
        bands: Bands::HigherIsBetter([1.5, 0.9, 0.5, 0.2]),
        scale: "A: >1.5, B: 0.9-1.5, C: 0.5-0.9, D: 0.2-0.5, F: <0.2",
        weight: 0.10,
    },
    Rule {
        metric: "Max Drawdown",
        bands: Bands::HigherIsBetter([-0.15, -0.25, -0.35, -0.50]),
        scale: "A: >-15%, B: -15% to -25%, C: -25% to -35%, D: -35% to -50%, F: <-50%",
        weight: 0.15,
    },
    Rule {
        metric: "Annual Volatility",
        bands: Bands::LowerIsBetter([0.12, 0.16, 0.20, 0.25]),
        scale: "A: <12%, B: 12-16%, C: 16-20%, D: 20-25%, F: >25%",
        weight: 0.05,
    },
    Rule {
        metric: "Calmar Ratio",
        bands: Bands::HigherIsBetter([1.0, 0.5, 0.25, 0.1]),
        scale: "A: >1.0, B: 0.5-1.0, C: 0.25-0.5, D: 0.1-0.25, F: <0.1",
        weight: 0.05,
    },
    Rule {
        metric: "Win Rate",
        bands: Bands::HigherIsBetter([0.60, 0.55, 0.50, 0.45]),
        scale: "A: >60%, B: 55-60%, C: 50-55%, D: 45-50%, F: <45%",
        weight: 0.03,
    },
    Rule {
        metric: "Best Month",
        bands: Bands::HigherIsBetter([0.12, 0.08, 0.04, 0.01]),
        scale: "A: >12%, B: 8-12%, C: 4-8%, D: 1-4%, F: <1%",
        weight: OTHER_WEIGHT,
    },
    Rule {
        metric: "Worst Month",
        bands: Bands::HigherIsBetter([-0.08, -0.12, -0.16, -0.20]),
        scale: "A: >-8%, B: -8% to -12%, C: -12% to -16%, D: -16% to -20%, F: <-20%",
        weight: OTHER_WEIGHT,
    },
    Rule {
        metric: "Alpha",
        bands: Bands::HigherIsBetter([0.02, 0.005, -0.005, -0.02]),
        scale: "A: >2%, B: 0.5-2%, C: -0.5% to 0.5%, D: -2% to -0.5%, F: <-2%",
        weight: 0.20,
    },
    Rule {
        metric: "Beta",
        bands: Bands::Within([(0.85, 1.15), (0.7, 1.3), (0.5, 1.5), (0.3, 1.7)]),
        scale: "A: 0.85-1.15, B: 0.7-0.85 or 1.15-1.3, C: 0.5-0.7 or 1.3-1.5, D: 0.3-0.5 or 1.5-1.7, F: <0.3 or >1.7",
        weight: 0.02,
    },
];

const LETTERS: [Grade; 4] = [Grade::A, Grade::B, Grade::C, Grade::D];

fn band_grade(bands: &Bands, value: f64) -> Grade {
    if value.is_nan() {
        return Grade::NotApplicable;
    }
    let hit = match bands {
        Bands::HigherIsBetter(mins) => mins.iter().position(|&m| value >= m),
        Bands::LowerIsBetter(maxs) => maxs.iter().position(|&m| value < m),
        Bands::Within(ranges) => ranges.iter().position(|&(lo, hi)| value >= lo && value < hi),
    };
    hit.map_or(Grade::F, |i| LETTERS[i])
}

/// Grade one named metric; `None` when the metric is not graded.
pub fn grade_metric(metric: &str, value: f64) -> Option<MetricGrade> {
    let rule = RULES.iter().find(|r| r.metric == metric)?;
    Some(MetricGrade {
        metric: rule.metric,
        value,
        grade: band_grade(&rule.bands, value),
        scale: rule.scale,
        weight: rule.weight,
    })
}

pub fn overall_grade(grades: &[MetricGrade]) -> (Grade, f64) {
    let total_weight: f64 = grades.iter().map(|g| g.weight).sum();
    if total_weight <= 0.0 {
        return (Grade::C, 2.0);
    }
    let gpa = grades
        .iter()
        .map(|g| g.grade.points() * g.weight)
        .sum::<f64>()
        / total_weight;
    (Grade::from_gpa(gpa), gpa)
}

pub fn grade_report(report: &MetricsReport) -> ReportCard {
    let grades: Vec<MetricGrade> = report
        .entries()
        .into_iter()
        .filter_map(|(name, value)| grade_metric(name, value))
        .collect();
    let (overall, gpa) = overall_grade(&grades);
    ReportCard {
        grades,
        gpa,
        overall,
    }
}
