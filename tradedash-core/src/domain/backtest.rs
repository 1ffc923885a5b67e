//! Backtest, market-event comparison and portfolio replay payloads.
//!
//! All three are computed server-side; the client only submits parameters
//! and renders what comes back.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::num;

/// Body of `POST /backtest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub strategy: String,
    pub params: BTreeMap<String, f64>,
}

/// Body of `POST /strategies/<name>`: same as a backtest minus the strategy id,
/// which is carried by the path instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyRunRequest {
    pub symbol: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub params: BTreeMap<String, f64>,
}

impl From<&BacktestRequest> for StrategyRunRequest {
    fn from(req: &BacktestRequest) -> Self {
        Self {
            symbol: req.symbol.clone(),
            from: req.from,
            to: req.to,
            params: req.params.clone(),
        }
    }
}

/// Backtest output. Series fields are index-aligned with `dates`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub equity_curve: Vec<f64>,
    #[serde(default, alias = "close")]
    pub prices: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub signals: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub rsi: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub atr: Option<Vec<Option<f64>>>,
    /// Anything else the strategy reports (summary metrics, thresholds, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BacktestResult {
    /// Scalar numeric metrics from the extra fields, for a summary table.
    pub fn scalar_metrics(&self) -> Vec<(String, f64)> {
        self.extra
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|x| (k.clone(), x)))
            .collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().copied()
    }

    /// Total return relative to the first equity point.
    pub fn total_return(&self) -> Option<f64> {
        let first = *self.equity_curve.first()?;
        let last = *self.equity_curve.last()?;
        if first == 0.0 {
            return None;
        }
        Some(last / first - 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

/// Body of `POST /market-event-comparison`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequest {
    pub strategy: String,
    pub symbol: String,
    pub period_a: DateRange,
    pub period_b: DateRange,
    pub include_news: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TradeOutcome {
    #[serde(deserialize_with = "num::flexible")]
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinLoss {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub win_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodResult {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub equity_curve: Vec<f64>,
    #[serde(default)]
    pub trades: Vec<TradeOutcome>,
    #[serde(default)]
    pub win_loss: WinLoss,
    #[serde(default)]
    pub volatility: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub period_a: PeriodResult,
    pub period_b: PeriodResult,
    #[serde(default)]
    pub confidence_score: Option<f64>,
}

impl ComparisonResult {
    /// Date labels for the shared x axis: whichever period is longer.
    pub fn labels(&self) -> &[String] {
        if self.period_a.dates.len() > self.period_b.dates.len() {
            &self.period_a.dates
        } else {
            &self.period_b.dates
        }
    }
}

/// Body of `POST /portfolio-replay` (one symbol per request).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayRequest {
    pub strategy: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayAction {
    Buy,
    Sell,
    #[default]
    #[serde(other)]
    Hold,
}

impl ReplayAction {
    pub fn is_trade(self) -> bool {
        matches!(self, ReplayAction::Buy | ReplayAction::Sell)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReplayAction::Buy => "buy",
            ReplayAction::Sell => "sell",
            ReplayAction::Hold => "hold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStep {
    pub date: String,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub price: Option<f64>,
    #[serde(default)]
    pub action: ReplayAction,
    #[serde(deserialize_with = "num::flexible")]
    pub equity: f64,
    #[serde(default)]
    pub position: serde_json::Value,
    #[serde(default)]
    pub trade_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    #[serde(default)]
    pub final_equity: Option<f64>,
    #[serde(default)]
    pub total_trades: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PortfolioReplay {
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
    #[serde(default)]
    pub summary: ReplaySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtest_request_serializes_dates_as_iso() {
        let req = BacktestRequest {
            symbol: "AAPL".into(),
            from: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            strategy: "basicMomentum".into(),
            params: [("window".to_string(), 20.0)].into_iter().collect(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["from"], "2023-01-01");
        assert_eq!(v["to"], "2023-12-31");
        assert_eq!(v["params"]["window"], 20.0);
    }

    #[test]
    fn backtest_result_keeps_unknown_metrics() {
        let r: BacktestResult = serde_json::from_str(
            r#"{"dates":["2023-01-02","2023-01-03"],"equityCurve":[1.0,1.1],
                "rsi":[null,55.2],"sharpe":1.4,"note":"ok"}"#,
        )
        .unwrap();
        assert_eq!(r.dates.len(), 2);
        assert_eq!(r.rsi.as_ref().unwrap()[1], Some(55.2));
        assert_eq!(r.scalar_metrics(), vec![("sharpe".to_string(), 1.4)]);
        assert!((r.total_return().unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn comparison_request_uses_camel_case() {
        let req = ComparisonRequest {
            strategy: "meanReversionML".into(),
            symbol: "AAPL".into(),
            period_a: DateRange { from: "2020-02-01".into(), to: "2020-04-01".into() },
            period_b: DateRange { from: "2022-01-01".into(), to: "2022-03-01".into() },
            include_news: false,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["periodA"]["from"], "2020-02-01");
        assert_eq!(v["includeNews"], false);
    }

    #[test]
    fn replay_unknown_action_is_hold() {
        let step: ReplayStep =
            serde_json::from_str(r#"{"date":"2024-01-02","action":"rebalance","equity":"1000"}"#)
                .unwrap();
        assert_eq!(step.action, ReplayAction::Hold);
        assert_eq!(step.equity, 1000.0);
    }
}
