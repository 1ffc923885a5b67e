//! Series helpers shared by the equity, drawdown and comparison charts.

use tracing::warn;

use crate::domain::TradeOutcome;

/// Drawdown at each point as a negative fraction of the running peak.
///
/// 0.0 at new highs, and 0.0 while the running peak is not positive.
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            if v > peak {
                peak = v;
            }
            if peak > 0.0 {
                ((v - peak) / peak).min(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 for empty, constant or monotonically increasing input.
pub fn max_drawdown(values: &[f64]) -> f64 {
    drawdown_series(values).into_iter().fold(0.0, f64::min)
}

/// One chart point per date, x = index. Lengths should match; if they do not,
/// the longer side is truncated and the mismatch logged.
pub fn equity_points(dates: &[String], equity: &[f64]) -> Vec<(f64, f64)> {
    if dates.len() != equity.len() {
        warn!(
            dates = dates.len(),
            equity = equity.len(),
            "equity series length does not match dates, truncating"
        );
    }
    dates
        .iter()
        .zip(equity)
        .enumerate()
        .map(|(i, (_, &v))| (i as f64, v))
        .collect()
}

/// Index-based points for any series.
pub fn indexed_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

/// Padded `(lower, upper)` y bounds over every finite value, 5% padding.
/// Flat series get a fixed pad; empty input gives `(0.0, 1.0)`.
pub fn series_bounds<'a, I>(series: I) -> (f64, f64)
where
    I: IntoIterator<Item = &'a [(f64, f64)]>,
{
    let (lo, hi) = series
        .into_iter()
        .flat_map(|s| s.iter().map(|&(_, y)| y))
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
    if lo > hi {
        return (0.0, 1.0);
    }
    let range = hi - lo;
    let pad = if range > 0.0 {
        range * 0.05
    } else {
        (hi.abs() * 0.01).max(1.0)
    };
    (lo - pad, hi + pad)
}

/// Three evenly spaced labels across a date axis: first, middle, last.
pub fn date_labels(dates: &[String]) -> Vec<String> {
    match dates.len() {
        0 => Vec::new(),
        1 => vec![dates[0].clone()],
        n => vec![
            dates[0].clone(),
            dates[n / 2].clone(),
            dates[n - 1].clone(),
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeMarker {
    Win,
    Loss,
    Flat,
}

impl TradeMarker {
    pub fn classify(pnl: f64) -> Self {
        if pnl > 0.0 {
            TradeMarker::Win
        } else if pnl < 0.0 {
            TradeMarker::Loss
        } else {
            TradeMarker::Flat
        }
    }

    pub fn glyph(self) -> char {
        match self {
            TradeMarker::Win => '▲',
            TradeMarker::Loss => '▼',
            TradeMarker::Flat => '•',
        }
    }
}

/// Markers for a period's trades, in trade order.
pub fn trade_markers(trades: &[TradeOutcome]) -> Vec<TradeMarker> {
    trades.iter().map(|t| TradeMarker::classify(t.pnl)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawdown_known_values() {
        let eq = [100.0, 110.0, 99.0, 121.0];
        let dd = drawdown_series(&eq);
        assert_eq!(dd[0], 0.0);
        assert_eq!(dd[1], 0.0);
        assert!((dd[2] - (-0.1)).abs() < 1e-12);
        assert_eq!(dd[3], 0.0);
        assert!((max_drawdown(&eq) - (-0.1)).abs() < 1e-12);
    }

    #[test]
    fn drawdown_empty_and_constant() {
        assert!(drawdown_series(&[]).is_empty());
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[5.0; 10]), 0.0);
    }

    #[test]
    fn non_positive_peak_gives_zero() {
        assert_eq!(drawdown_series(&[-5.0, -10.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn points_truncate_on_mismatch() {
        let dates: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(equity_points(&dates, &[1.0, 2.0]).len(), 2);
        assert_eq!(equity_points(&dates, &[1.0, 2.0, 3.0]).len(), 3);
    }

    #[test]
    fn bounds_pad_and_handle_flat() {
        let a = [(0.0, 10.0), (1.0, 20.0)];
        let (lo, hi) = series_bounds([&a[..]]);
        assert!((lo - 9.5).abs() < 1e-12 && (hi - 20.5).abs() < 1e-12);

        let flat = [(0.0, 100.0), (1.0, 100.0)];
        let (lo, hi) = series_bounds([&flat[..]]);
        assert!(lo < 100.0 && hi > 100.0);

        assert_eq!(series_bounds(std::iter::empty::<&[(f64, f64)]>()), (0.0, 1.0));
    }

    #[test]
    fn markers_classify_by_sign() {
        let trades = [TradeOutcome { pnl: 5.0 }, TradeOutcome { pnl: -1.0 }, TradeOutcome { pnl: 0.0 }];
        assert_eq!(
            trade_markers(&trades),
            vec![TradeMarker::Win, TradeMarker::Loss, TradeMarker::Flat]
        );
    }
}
