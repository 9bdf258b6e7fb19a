//! Small numeric helpers shared by the metrics, optimizer and risk modules.
//!
//! Every function returns NaN rather than panicking when its input is too
//! short or a denominator is zero.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample covariance of two equally long slices.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return f64::NAN;
    }
    let ma = mean(a);
    let mb = mean(b);
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (a.len() - 1) as f64
}

/// Percentile with linear interpolation between closest ranks, `q` in [0, 1].
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return f64::NAN;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// `a / b`, or NaN when `b` is zero or either side is not finite.
pub fn ratio(a: f64, b: f64) -> f64 {
    if b == 0.0 || !a.is_finite() || !b.is_finite() {
        f64::NAN
    } else {
        a / b
    }
}

/// Coefficient of determination of an OLS fit of `y` against 0..n.
pub fn r_squared_vs_index(y: &[f64]) -> f64 {
    if y.len() < 2 {
        return f64::NAN;
    }
    let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
    let cov = sample_covariance(&x, y);
    let var_x = sample_variance(&x);
    let var_y = sample_variance(y);
    if var_y == 0.0 {
        return f64::NAN;
    }
    cov * cov / (var_x * var_y)
}

/// Covariance matrix of equally long columns.
pub fn covariance_matrix(columns: &[&[f64]]) -> Vec<Vec<f64>> {
    let n = columns.len();
    let mut cov = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let c = sample_covariance(columns[i], columns[j]);
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    cov
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `wᵀ Σ w`
pub fn quadratic_form(w: &[f64], matrix: &[Vec<f64>]) -> f64 {
    matrix
        .iter()
        .zip(w)
        .map(|(row, wi)| wi * dot(row, w))
        .sum()
}
