//! Monthly momentum rebalancer.
//!
//! The rebalancer walks the checkpoints of a price table (the first date,
//! then every month-end) and produces one weight row and one signal row per
//! checkpoint. The first weight row is equal weight; each later row is the
//! previous row nudged by `delta` for the best and worst ranked instruments,
//! then renormalized.
//!
//! The signal for an instrument is its percent change over the last
//! `lookback_days` observations, divided by the sample standard deviation of
//! all its closes from the start of history. That denominator is an expanding
//! window kept in an [`ExpandingStd`] per instrument, fed row by row as the
//! walk advances. The lookback must fit between the previous checkpoint and
//! the current one; when it does not, or the instrument has too little
//! history, the signal is NaN and the instrument keeps its weight.
//!
//! Adjusted weights are floored at zero before renormalizing, so an
//! instrument that stays bottom-ranked drops out instead of going short.

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::dates::checkpoint_indices;
use crate::domain::error::RiskbalError;
use crate::domain::prices::PriceTable;
use crate::domain::stats::{ExpandingStd, average_ranks};

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumConfig {
    pub lookback_days: usize,
    pub delta: f64,
    pub top_k: usize,
    pub bottom_k: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            lookback_days: 20,
            delta: 0.05,
            top_k: 2,
            bottom_k: 2,
        }
    }
}

impl MomentumConfig {
    pub fn validate(&self) -> Result<(), RiskbalError> {
        if self.lookback_days == 0 {
            return Err(RiskbalError::InvalidLookback {
                value: self.lookback_days,
            });
        }
        Ok(())
    }
}

/// One dated row of a weight or signal table, ordered like
/// [`RebalanceHistory::tickers`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceHistory {
    pub tickers: Vec<String>,
    pub weights: Vec<HistoryRow>,
    pub signals: Vec<HistoryRow>,
}

impl RebalanceHistory {
    /// Weights in force on `date`: the latest row dated on or before it.
    pub fn weights_on(&self, date: NaiveDate) -> Option<&[f64]> {
        let idx = self.weights.partition_point(|row| row.date <= date);
        idx.checked_sub(1).map(|i| self.weights[i].values.as_slice())
    }

    pub fn final_weights(&self) -> Option<Vec<(String, f64)>> {
        self.weights.last().map(|row| {
            self.tickers
                .iter()
                .cloned()
                .zip(row.values.iter().copied())
                .collect()
        })
    }
}

pub fn run_rebalance(
    prices: &PriceTable,
    config: &MomentumConfig,
) -> Result<RebalanceHistory, RiskbalError> {
    config.validate()?;

    let n = prices.instrument_count();
    let checkpoints = checkpoint_indices(&prices.dates);
    let mut weights = Vec::with_capacity(checkpoints.len());
    let mut signals = Vec::with_capacity(checkpoints.len());

    let Some(&first) = checkpoints.first() else {
        return Ok(RebalanceHistory {
            tickers: prices.tickers.clone(),
            weights,
            signals,
        });
    };

    let mut expanding: Vec<ExpandingStd> = vec![ExpandingStd::new(); n];
    let mut fed = 0;
    feed_rows(prices, &mut expanding, &mut fed, first);

    let mut current = vec![1.0 / n as f64; n];
    weights.push(HistoryRow {
        date: prices.dates[first],
        values: current.clone(),
    });
    signals.push(HistoryRow {
        date: prices.dates[first],
        values: vec![f64::NAN; n],
    });

    for pair in checkpoints.windows(2) {
        let (previous, checkpoint) = (pair[0], pair[1]);
        feed_rows(prices, &mut expanding, &mut fed, checkpoint);

        let scores: Vec<f64> = prices
            .closes
            .iter()
            .zip(&expanding)
            .map(|(column, acc)| {
                momentum_signal(column, previous, checkpoint, config.lookback_days, acc.std())
            })
            .collect();

        current = adjust_weights(&current, &scores, config)?;
        debug!(
            date = %prices.dates[checkpoint],
            ?scores,
            weights = ?current,
            "rebalanced"
        );

        weights.push(HistoryRow {
            date: prices.dates[checkpoint],
            values: current.clone(),
        });
        signals.push(HistoryRow {
            date: prices.dates[checkpoint],
            values: scores,
        });
    }

    Ok(RebalanceHistory {
        tickers: prices.tickers.clone(),
        weights,
        signals,
    })
}

/// Push every close in rows `fed..=through` into the per-instrument
/// expanding accumulators.
fn feed_rows(prices: &PriceTable, expanding: &mut [ExpandingStd], fed: &mut usize, through: usize) {
    for row in *fed..=through {
        for (column, acc) in prices.closes.iter().zip(expanding.iter_mut()) {
            if let Some(close) = column[row] {
                acc.push(close);
            }
        }
    }
    *fed = through + 1;
}

/// Percent change over the last `lookback` rows ending at `end`, divided by
/// `std`. The base row must not precede `start`, the previous checkpoint;
/// otherwise the signal is NaN. Missing closes fall back to the last
/// available one.
pub fn momentum_signal(
    column: &[Option<f64>],
    start: usize,
    end: usize,
    lookback: usize,
    std: f64,
) -> f64 {
    let last_close = |row: usize| column[..=row].iter().rev().find_map(|c| *c);

    let Some(base_row) = end.checked_sub(lookback).filter(|&row| row >= start) else {
        return f64::NAN;
    };
    match (last_close(end), last_close(base_row)) {
        (Some(now), Some(then)) => (now / then - 1.0) / std,
        _ => f64::NAN,
    }
}

/// Rank `signals` ascending (ties averaged, NaN unranked); the `bottom_k`
/// lowest lose `delta`, the `top_k` highest gain `delta`. Adjusted weights
/// are floored at zero and renormalized to sum to one. Fails when nothing
/// is left to renormalize.
pub fn adjust_weights(
    previous: &[f64],
    signals: &[f64],
    config: &MomentumConfig,
) -> Result<Vec<f64>, RiskbalError> {
    let ranks = average_ranks(&signals.iter().map(|s| Some(*s)).collect::<Vec<_>>());
    let ranked = ranks.iter().filter(|r| r.is_some()).count();
    let bottom_cut = config.bottom_k as f64;
    let top_cut = ranked.saturating_sub(config.top_k) as f64;

    let adjusted: Vec<f64> = previous
        .iter()
        .zip(&ranks)
        .map(|(w, rank)| match rank {
            Some(r) => {
                let mut step = 0.0;
                if *r <= bottom_cut {
                    step -= config.delta;
                }
                if *r > top_cut {
                    step += config.delta;
                }
                (w + step).max(0.0)
            }
            None => *w,
        })
        .collect();

    let total: f64 = adjusted.iter().sum();
    if total.is_nan() || total <= 0.0 {
        return Err(RiskbalError::DegenerateWeights { sum: total });
    }
    Ok(adjusted.into_iter().map(|w| w / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prices::PricePoint;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn trading_days(count: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..count)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    fn price_table(columns: Vec<Vec<f64>>) -> PriceTable {
        let dates = trading_days(columns.first().map(|c| c.len()).unwrap_or(0));
        PriceTable::from_series(
            columns
                .into_iter()
                .enumerate()
                .map(|(i, closes)| {
                    let points = closes
                        .into_iter()
                        .zip(&dates)
                        .map(|(close, date)| PricePoint { date: *date, close })
                        .collect();
                    (format!("T{i}"), points)
                })
                .collect(),
        )
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let config = MomentumConfig {
            lookback_days: 0,
            ..MomentumConfig::default()
        };
        let err = run_rebalance(&price_table(vec![vec![1.0, 2.0]]), &config).unwrap_err();
        assert!(matches!(err, RiskbalError::InvalidLookback { value: 0 }));
    }

    #[test]
    fn increasing_signal_moves_top_and_bottom_two() {
        let config = MomentumConfig {
            delta: 0.03,
            ..MomentumConfig::default()
        };
        let previous = vec![1.0 / 7.0; 7];
        let signals = [-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0];

        let next = adjust_weights(&previous, &signals, &config).unwrap();

        let base = 1.0 / 7.0;
        let expected = [
            base - 0.03,
            base - 0.03,
            base,
            base,
            base,
            base + 0.03,
            base + 0.03,
        ];
        for (got, want) in next.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(next.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn configurable_k() {
        let config = MomentumConfig {
            top_k: 1,
            bottom_k: 3,
            delta: 0.01,
            ..MomentumConfig::default()
        };
        let next = adjust_weights(&[0.2; 5], &[5.0, 4.0, 3.0, 2.0, 1.0], &config).unwrap();
        // three lose 0.01, one gains 0.01: raw sum 0.98
        assert_abs_diff_eq!(next[0], 0.21 / 0.98, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 0.2 / 0.98, epsilon = 1e-12);
        assert_abs_diff_eq!(next[4], 0.19 / 0.98, epsilon = 1e-12);
    }

    #[test]
    fn tied_signals_share_average_rank() {
        let config = MomentumConfig {
            delta: 0.1,
            ..MomentumConfig::default()
        };
        // ranks 1, 2.5, 2.5, 4: the first is in the bottom two, and both
        // tied instruments rank above 4 - 2 alongside the last
        let next = adjust_weights(&[0.25; 4], &[1.0, 2.0, 2.0, 3.0], &config).unwrap();
        assert_abs_diff_eq!(next[0], 0.15 / 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 0.35 / 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(next[2], next[1], epsilon = 1e-12);
        assert_abs_diff_eq!(next[3], 0.35 / 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(next.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn nan_signal_keeps_weight() {
        let config = MomentumConfig::default();
        let next = adjust_weights(&[0.5, 0.5], &[f64::NAN, 1.0], &config).unwrap();
        // single ranked instrument gets both steps, netting zero
        assert_abs_diff_eq!(next[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn persistent_bottom_rank_floors_at_zero() {
        let config = MomentumConfig::default();
        let signals: Vec<f64> = (1..=7).map(f64::from).collect();
        let mut weights = vec![1.0 / 7.0; 7];

        for _ in 0..6 {
            weights = adjust_weights(&weights, &signals, &config).unwrap();
            assert!(weights.iter().all(|w| *w >= 0.0));
            assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }

        assert_eq!(weights[0], 0.0);
        assert_eq!(weights[1], 0.0);
        assert!(weights[6] > weights[4]);
    }

    #[test]
    fn nothing_left_to_renormalize_is_an_error() {
        let config = MomentumConfig {
            top_k: 0,
            bottom_k: 2,
            delta: 0.5,
            ..MomentumConfig::default()
        };
        let err = adjust_weights(&[0.5, 0.5], &[1.0, 2.0], &config).unwrap_err();
        assert!(matches!(err, RiskbalError::DegenerateWeights { sum } if sum == 0.0));
    }

    #[test]
    fn momentum_signal_is_nan_when_lookback_precedes_window() {
        let column = vec![Some(100.0), Some(110.0), Some(121.0), Some(133.1)];
        assert!(momentum_signal(&column, 1, 3, 50, 2.0).is_nan());
        assert!(momentum_signal(&column, 1, 3, 3, 2.0).is_nan());
        let s = momentum_signal(&column, 1, 3, 2, 2.0);
        assert_abs_diff_eq!(s, (133.1 / 110.0 - 1.0) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn momentum_signal_uses_last_available_close() {
        let column = vec![Some(100.0), None, Some(120.0), None];
        let s = momentum_signal(&column, 0, 3, 2, 1.0);
        // base row 1 falls back to row 0, end row 3 falls back to row 2
        assert_abs_diff_eq!(s, 0.2, epsilon = 1e-12);
        assert!(momentum_signal(&[None, Some(1.0)], 0, 1, 1, 1.0).is_nan());
    }

    #[test]
    fn lookback_longer_than_month_keeps_equal_weight() {
        // checkpoints Jan 1, Jan 31 and Feb 29 are at most 30 rows apart
        let table = price_table(vec![
            (0..60).map(|i| 100.0 + i as f64).collect(),
            (0..60).map(|i| 100.0 - 0.5 * i as f64).collect(),
        ]);
        let config = MomentumConfig {
            lookback_days: 60,
            ..MomentumConfig::default()
        };
        let history = run_rebalance(&table, &config).unwrap();

        assert_eq!(history.signals.len(), 3);
        for row in &history.signals {
            assert!(row.values.iter().all(|v| v.is_nan()));
        }
        for row in &history.weights {
            assert_eq!(row.values, vec![0.5, 0.5]);
        }
    }

    #[test]
    fn history_has_one_row_per_checkpoint() {
        // 2024-01-01 .. 2024-03-10: first date, Jan 31, Feb 29, Mar 10
        let table = price_table(vec![
            (0..70).map(|i| 100.0 + i as f64).collect(),
            (0..70).map(|i| 100.0 - 0.5 * i as f64).collect(),
            (0..70).map(|i| 200.0 + i as f64).collect(),
            (0..70).map(|i| 200.0 - i as f64 * 0.5).collect(),
            (0..70).map(|i| 300.0 + i as f64).collect(),
        ]);
        let history = run_rebalance(&table, &MomentumConfig::default()).unwrap();

        let dates: Vec<_> = history.weights.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            ]
        );
        assert_eq!(history.signals.len(), 4);
        assert!(history.signals[0].values.iter().all(|v| v.is_nan()));
        for row in &history.weights {
            assert_abs_diff_eq!(row.values.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        // T0 ranks top and T1 bottom at the first transition
        assert!(history.weights[1].values[0] > history.weights[0].values[0]);
        assert!(history.weights[1].values[1] < history.weights[0].values[1]);
        // Feb 29 to Mar 10 is shorter than the lookback
        assert!(history.signals[3].values.iter().all(|v| v.is_nan()));
        for (after, before) in history.weights[3].values.iter().zip(&history.weights[2].values) {
            assert_abs_diff_eq!(*after, *before, epsilon = 1e-12);
        }
    }

    #[test]
    fn signal_denominator_is_expanding() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i * i) as f64 * 0.1).collect();
        let table = price_table(vec![closes.clone(), vec![10.0; 40]]);
        let config = MomentumConfig {
            lookback_days: 5,
            ..MomentumConfig::default()
        };
        let history = run_rebalance(&table, &config).unwrap();

        // second checkpoint is Jan 31 (row 30)
        let std = crate::domain::stats::sample_std(&closes[..=30]);
        let expected = (closes[30] / closes[25] - 1.0) / std;
        assert_abs_diff_eq!(history.signals[1].values[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn weights_on_forward_fills() {
        let table = price_table(vec![(0..40).map(|i| 1.0 + i as f64).collect()]);
        let history = run_rebalance(&table, &MomentumConfig::default()).unwrap();

        let before = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let mid = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(history.weights_on(before).is_none());
        assert_eq!(history.weights_on(mid).unwrap(), &[1.0]);
    }

    #[test]
    fn final_weights_pairs_tickers() {
        let table = price_table(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let history = run_rebalance(&table, &MomentumConfig::default()).unwrap();
        let last = history.final_weights().unwrap();
        assert_eq!(last[0].0, "T0");
        assert_abs_diff_eq!(last[0].1 + last[1].1, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_table_gives_empty_history() {
        let history = run_rebalance(&PriceTable::default(), &MomentumConfig::default()).unwrap();
        assert!(history.weights.is_empty());
        assert!(history.final_weights().is_none());
    }

    proptest! {
        #[test]
        fn initial_row_is_equal_weight(
            n in 1usize..12,
            days in 2usize..80,
            seed in 1.0f64..50.0,
        ) {
            let columns: Vec<Vec<f64>> = (0..n)
                .map(|c| (0..days).map(|d| seed + ((c * 7 + d * 3) % 11) as f64).collect())
                .collect();
            let history = run_rebalance(&price_table(columns), &MomentumConfig::default()).unwrap();
            let first = &history.weights[0];
            for w in &first.values {
                prop_assert!((w - 1.0 / n as f64).abs() < 1e-15);
            }
        }
    }
}
