//! Performance metrics over a daily return series.
//!
//! Every ratio whose denominator is zero or undefined is NaN, never 0.

use crate::domain::config::AnalyticsConfig;
use crate::domain::error::AnalyzerError;
use crate::domain::returns::ReturnSeries;
use crate::domain::stats::{self, ratio};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub observations: usize,
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub calmar_ratio: f64,
    pub omega_ratio: f64,
    pub value_at_risk: f64,
    pub conditional_var: f64,
    pub tail_ratio: f64,
    pub stability: f64,
    pub win_rate: f64,
    pub best_day: f64,
    pub worst_day: f64,
    pub best_month: f64,
    pub worst_month: f64,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
}

impl MetricsReport {
    /// Named metrics in display order. Alpha and beta only appear when a
    /// benchmark was supplied.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        let mut out = vec![
            ("Total Return", self.total_return),
            ("Annual Return", self.annual_return),
            ("Annual Volatility", self.annual_volatility),
            ("Sharpe Ratio", self.sharpe_ratio),
            ("Sortino Ratio", self.sortino_ratio),
            ("Max Drawdown", self.max_drawdown),
            ("Max Drawdown Duration", self.max_drawdown_duration as f64),
            ("Calmar Ratio", self.calmar_ratio),
            ("Omega Ratio", self.omega_ratio),
            ("Value at Risk", self.value_at_risk),
            ("Conditional VaR", self.conditional_var),
            ("Tail Ratio", self.tail_ratio),
            ("Stability", self.stability),
            ("Win Rate", self.win_rate),
            ("Best Day", self.best_day),
            ("Worst Day", self.worst_day),
            ("Best Month", self.best_month),
            ("Worst Month", self.worst_month),
        ];
        if let Some(alpha) = self.alpha {
            out.push(("Alpha", alpha));
        }
        if let Some(beta) = self.beta {
            out.push(("Beta", beta));
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

pub fn compute_metrics(
    returns: &ReturnSeries,
    benchmark: Option<&ReturnSeries>,
    config: &AnalyticsConfig,
) -> Result<MetricsReport, AnalyzerError> {
    if returns.len() < 2 {
        return Err(AnalyzerError::insufficient("metrics", returns.len(), 2));
    }
    let returns = returns.to_simple();
    let r = returns.values();
    let n = r.len() as f64;
    let days = config.trading_days as f64;
    let rf = config.risk_free_rate;

    let total_return = returns.total_return();
    let annual_return = annualize(total_return, r.len(), days);
    let annual_volatility = stats::sample_std(r) * config.annualization();
    let sharpe_ratio = ratio(annual_return - rf, annual_volatility);

    let downside: Vec<f64> = r.iter().copied().filter(|&x| x < 0.0).collect();
    let downside_deviation = stats::sample_std(&downside) * config.annualization();
    let sortino_ratio = ratio(annual_return - rf, downside_deviation);

    let (max_drawdown, max_drawdown_duration) = compute_drawdown(&returns.cumulative_growth());
    let calmar_ratio = ratio(annual_return, max_drawdown.abs());

    let gains: f64 = r.iter().filter(|&&x| x > 0.0).sum();
    let losses: f64 = r.iter().filter(|&&x| x < 0.0).map(|x| x.abs()).sum();
    let omega_ratio = ratio(gains, losses);

    let value_at_risk = stats::percentile(r, 1.0 - config.var_confidence);
    let tail: Vec<f64> = r.iter().copied().filter(|&x| x <= value_at_risk).collect();
    let conditional_var = stats::mean(&tail);

    let tail_ratio = ratio(
        stats::percentile(r, 0.95).abs(),
        stats::percentile(r, 0.05).abs(),
    );

    let mut log_sum = 0.0;
    let cum_log: Vec<f64> = r
        .iter()
        .map(|x| {
            log_sum += x.ln_1p();
            log_sum
        })
        .collect();
    let stability = stats::r_squared_vs_index(&cum_log);

    let win_rate = r.iter().filter(|&&x| x > 0.0).count() as f64 / n;
    let best_day = r.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst_day = r.iter().copied().fold(f64::INFINITY, f64::min);

    let months = returns.monthly_returns();
    let best_month = months
        .iter()
        .map(|m| m.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let worst_month = months.iter().map(|m| m.value).fold(f64::INFINITY, f64::min);

    let (alpha, beta) = match benchmark {
        Some(bench) => {
            let (port, bench) = returns.intersect(&bench.to_simple())?;
            let beta = ratio(
                stats::sample_covariance(port.values(), bench.values()),
                stats::sample_variance(bench.values()),
            );
            let port_annual = annualize(port.total_return(), port.len(), days);
            let bench_annual = annualize(bench.total_return(), bench.len(), days);
            let alpha = port_annual - (rf + beta * (bench_annual - rf));
            (Some(alpha), Some(beta))
        }
        None => (None, None),
    };

    Ok(MetricsReport {
        observations: r.len(),
        total_return,
        annual_return,
        annual_volatility,
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        max_drawdown_duration,
        calmar_ratio,
        omega_ratio,
        value_at_risk,
        conditional_var,
        tail_ratio,
        stability,
        win_rate,
        best_day,
        worst_day,
        best_month,
        worst_month,
        alpha,
        beta,
    })
}

/// Geometric annualisation of a total return earned over `periods` days.
pub fn annualize(total_return: f64, periods: usize, trading_days: f64) -> f64 {
    if periods == 0 {
        return f64::NAN;
    }
    (1.0 + total_return).powf(trading_days / periods as f64) - 1.0
}

/// Deepest drawdown (<= 0) and the longest run of periods spent below a peak.
pub fn compute_drawdown(growth: &[f64]) -> (f64, usize) {
    let Some(&first) = growth.first() else {
        return (f64::NAN, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut current = 0usize;
    let mut longest = 0usize;

    for &g in growth {
        peak = peak.max(g);
        let dd = g / peak - 1.0;
        if dd < 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
        max_dd = max_dd.min(dd);
    }

    (max_dd, longest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::returns::ReturnKind;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    fn returns(values: &[f64]) -> ReturnSeries {
        ReturnSeries::new(ReturnKind::Simple, dates(values.len()), values.to_vec()).unwrap()
    }

    fn from_prices(prices: &[f64]) -> ReturnSeries {
        ReturnSeries::from_closes(&dates(prices.len()), prices, ReturnKind::Simple).unwrap()
    }

    #[test]
    fn price_path_example() {
        let r = from_prices(&[100.0, 102.0, 101.0, 105.0, 107.0]);
        let m = compute_metrics(&r, None, &AnalyticsConfig::default()).unwrap();

        assert_eq!(m.observations, 4);
        assert_abs_diff_eq!(m.total_return, 0.07, epsilon = 1e-12);
        assert_abs_diff_eq!(m.annual_return, 1.07f64.powf(63.0) - 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(m.max_drawdown, 101.0 / 102.0 - 1.0, epsilon = 1e-12);
        assert_eq!(m.max_drawdown_duration, 1);
        assert_abs_diff_eq!(m.win_rate, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(m.best_day, 0.04 / 1.01, epsilon = 1e-12);
        assert_abs_diff_eq!(m.worst_day, -1.0 / 102.0, epsilon = 1e-12);
        assert!(m.alpha.is_none());
    }

    #[test]
    fn constant_returns_have_zero_vol_and_nan_ratios() {
        // 2^-7 keeps the mean exact so the deviations are exactly zero
        let r = returns(&[0.0078125; 30]);
        let m = compute_metrics(&r, None, &AnalyticsConfig::default()).unwrap();

        assert_abs_diff_eq!(m.annual_volatility, 0.0, epsilon = 1e-15);
        assert!(m.sharpe_ratio.is_nan());
        assert!(m.sortino_ratio.is_nan());
        assert_eq!(m.max_drawdown, 0.0);
        assert!(m.calmar_ratio.is_nan());
        assert!(m.omega_ratio.is_nan());
    }

    #[test]
    fn single_return_is_insufficient() {
        let r = returns(&[0.01]);
        let err = compute_metrics(&r, None, &AnalyticsConfig::default()).unwrap_err();
        assert!(matches!(err, AnalyzerError::InsufficientData { have: 1, need: 2, .. }));
    }

    #[test]
    fn sharpe_uses_annual_excess_over_volatility() {
        let r = returns(&[0.01, -0.005, 0.002, 0.007, -0.003, 0.004]);
        let cfg = AnalyticsConfig::default();
        let m = compute_metrics(&r, None, &cfg).unwrap();

        let expected = (m.annual_return - 0.02) / m.annual_volatility;
        assert_abs_diff_eq!(m.sharpe_ratio, expected, epsilon = 1e-12);

        let downside = stats::sample_std(&[-0.005, -0.003]) * 252f64.sqrt();
        assert_abs_diff_eq!(m.sortino_ratio, (m.annual_return - 0.02) / downside, epsilon = 1e-9);
    }

    #[test]
    fn omega_and_var() {
        let r = returns(&[0.02, -0.01, 0.03, -0.02, 0.01]);
        let m = compute_metrics(&r, None, &AnalyticsConfig::default()).unwrap();

        assert_abs_diff_eq!(m.omega_ratio, 0.06 / 0.03, epsilon = 1e-12);
        // 5th percentile of sorted [-0.02,-0.01,0.01,0.02,0.03]: rank 0.2
        assert_abs_diff_eq!(m.value_at_risk, -0.02 + 0.01 * 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(m.conditional_var, -0.02, epsilon = 1e-12);
    }

    #[test]
    fn drawdown_duration_counts_longest_run() {
        let (dd, duration) = compute_drawdown(&[1.0, 0.9, 0.95, 1.1, 1.0, 1.05, 1.08, 1.2]);
        assert_abs_diff_eq!(dd, -0.1, epsilon = 1e-12);
        assert_eq!(duration, 3);
    }

    #[test]
    fn benchmark_identical_gives_unit_beta_and_zero_alpha() {
        let r = returns(&[0.01, -0.02, 0.015, 0.003, -0.004]);
        let cfg = AnalyticsConfig::default();
        let m = compute_metrics(&r, Some(&r), &cfg).unwrap();

        assert_abs_diff_eq!(m.beta.unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.alpha.unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(m.entries().last().unwrap().0, "Beta");
    }

    #[test]
    fn alpha_uses_only_common_dates() {
        let r = returns(&[0.2, 0.01, -0.02, 0.015, 0.003, -0.004]);
        // same series, first day missing
        let bench = ReturnSeries::new(ReturnKind::Simple, dates(6)[1..].to_vec(), r.values()[1..].to_vec()).unwrap();
        let m = compute_metrics(&r, Some(&bench), &AnalyticsConfig::default()).unwrap();

        assert_abs_diff_eq!(m.beta.unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.alpha.unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(m.observations, 6);
    }

    #[test]
    fn flat_benchmark_gives_nan_beta() {
        let r = returns(&[0.01, -0.02, 0.015]);
        let bench = returns(&[0.0, 0.0, 0.0]);
        let m = compute_metrics(&r, Some(&bench), &AnalyticsConfig::default()).unwrap();
        assert!(m.beta.unwrap().is_nan());
        assert!(m.alpha.unwrap().is_nan());
    }

    #[test]
    fn benchmark_without_common_dates_is_misaligned() {
        let r = returns(&[0.01, 0.02]);
        let later: Vec<NaiveDate> = dates(10)[5..7].to_vec();
        let bench = ReturnSeries::new(ReturnKind::Simple, later, vec![0.01, 0.0]).unwrap();
        let err = compute_metrics(&r, Some(&bench), &AnalyticsConfig::default()).unwrap_err();
        assert!(matches!(err, AnalyzerError::MisalignedData { .. }));
    }

    #[test]
    fn monthly_extremes() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let d: Vec<NaiveDate> = (0..4).map(|i| start + chrono::Duration::days(i)).collect();
        // Jan 30, Jan 31 | Feb 1, Feb 2
        let r = ReturnSeries::new(ReturnKind::Simple, d, vec![0.1, 0.1, -0.05, 0.0]).unwrap();
        let m = compute_metrics(&r, None, &AnalyticsConfig::default()).unwrap();
        assert_abs_diff_eq!(m.best_month, 0.21, epsilon = 1e-12);
        assert_abs_diff_eq!(m.worst_month, -0.05, epsilon = 1e-12);
    }

    #[test]
    fn entries_lookup() {
        let r = returns(&[0.01, 0.02, -0.01]);
        let m = compute_metrics(&r, None, &AnalyticsConfig::default()).unwrap();
        assert_eq!(m.get("Win Rate"), Some(m.win_rate));
        assert!(m.get("Alpha").is_none());
        assert_eq!(m.entries().len(), 18);
    }
}
