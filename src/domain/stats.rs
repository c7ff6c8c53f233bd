//! Descriptive statistics shared by the risk, rebalance and backtest modules.
//!
//! None of these guard against degenerate input: an empty slice gives NaN,
//! and callers propagate that NaN as-is.

use std::cmp::Ordering;

pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(xs: &[f64]) -> f64 {
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (xs.len() as f64 - 1.0)).sqrt()
}

/// Empirical quantile with linear interpolation between order statistics.
/// `q` is in [0, 1].
pub fn quantile(xs: &[f64], q: f64) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Sample covariance matrix of equally long columns.
pub fn covariance_matrix(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = columns.len();
    let means: Vec<f64> = columns.iter().map(|c| mean(c)).collect();
    let mut cov = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in i..n {
            let len = columns[i].len().min(columns[j].len());
            let s: f64 = (0..len)
                .map(|k| (columns[i][k] - means[i]) * (columns[j][k] - means[j]))
                .sum();
            let c = s / (len as f64 - 1.0);
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    cov
}

/// `wᵀ Σ w`
pub fn quadratic_form(weights: &[f64], matrix: &[Vec<f64>]) -> f64 {
    weights
        .iter()
        .enumerate()
        .map(|(i, wi)| {
            weights
                .iter()
                .enumerate()
                .map(|(j, wj)| wi * matrix[i][j] * wj)
                .sum::<f64>()
        })
        .sum()
}

/// 1-based ascending ranks; ties share the average of the ranks they span.
/// `None` entries are not ranked.
pub fn average_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| !x.is_nan()).map(|x| (i, x)))
        .collect();
    order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut ranks = vec![None; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && order[end + 1].1 == order[start].1 {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &(idx, _) in &order[start..=end] {
            ranks[idx] = Some(rank);
        }
        start = end + 1;
    }
    ranks
}

/// Running mean/variance over an expanding window (Welford).
#[derive(Debug, Clone, Default)]
pub struct ExpandingStd {
    count: usize,
    mean: f64,
    m2: f64,
}

impl ExpandingStd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Sample standard deviation of everything pushed so far; NaN below two
    /// observations.
    pub fn std(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mean_and_std() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(mean(&xs), 5.0);
        // population std is 2; sample std is sqrt(32 / 7)
        assert_abs_diff_eq!(sample_std(&xs), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn empty_input_is_nan() {
        assert!(mean(&[]).is_nan());
        assert!(sample_std(&[]).is_nan());
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn quantile_interpolates() {
        let xs = [3.0, 1.0, 2.0, 4.0];
        assert_abs_diff_eq!(quantile(&xs, 0.0), 1.0);
        assert_abs_diff_eq!(quantile(&xs, 1.0), 4.0);
        assert_abs_diff_eq!(quantile(&xs, 0.5), 2.5);
        assert_abs_diff_eq!(quantile(&xs, 0.05), 1.15, epsilon = 1e-12);
    }

    #[test]
    fn covariance_of_identical_columns() {
        let a = vec![1.0, 2.0, 3.0];
        let cov = covariance_matrix(&[a.clone(), a]);
        assert_abs_diff_eq!(cov[0][0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cov[0][1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quadratic_form(&[0.5, 0.5], &cov), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn ranks_average_ties() {
        let ranks = average_ranks(&[Some(3.0), Some(1.0), Some(3.0), None, Some(0.5)]);
        assert_eq!(ranks, vec![Some(3.5), Some(2.0), Some(3.5), None, Some(1.0)]);
    }

    #[test]
    fn ranks_skip_nan() {
        let ranks = average_ranks(&[Some(f64::NAN), Some(1.0)]);
        assert_eq!(ranks, vec![None, Some(1.0)]);
    }

    #[test]
    fn expanding_std_matches_batch() {
        let xs = [10.0, 12.0, 9.0, 15.0, 11.0];
        let mut acc = ExpandingStd::new();
        assert!(acc.std().is_nan());
        for (i, &x) in xs.iter().enumerate() {
            acc.push(x);
            if i >= 1 {
                assert_abs_diff_eq!(acc.std(), sample_std(&xs[..=i]), epsilon = 1e-12);
            }
        }
        assert_eq!(acc.count(), 5);
    }
}
