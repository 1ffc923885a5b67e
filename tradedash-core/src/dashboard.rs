//! Dashboard summary derived from the order log.

use crate::domain::{Account, OrderLog, Position};

/// How many recent fills the dashboard lists.
pub const RECENT_FILLS: usize = 3;

fn stamp(log: &OrderLog) -> &str {
    log.filled_at
        .as_deref()
        .or(log.submitted_at.as_deref())
        .unwrap_or("")
}

/// Latest filled orders, newest first, by fill time (submission time when
/// the fill time is missing). Timestamps are ISO 8601, so string order is
/// time order.
pub fn recent_fills(logs: &[OrderLog], limit: usize) -> Vec<&OrderLog> {
    let mut filled: Vec<&OrderLog> = logs.iter().filter(|l| l.is_filled()).collect();
    filled.sort_by(|a, b| stamp(b).cmp(stamp(a)));
    filled.truncate(limit);
    filled
}

pub fn total_trades(logs: &[OrderLog]) -> usize {
    logs.iter().filter(|l| l.is_filled()).count()
}

/// Headline numbers for the dashboard panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSummary {
    pub portfolio_value: Option<f64>,
    pub buying_power: Option<f64>,
    pub cash: Option<f64>,
    pub day_change: Option<f64>,
    pub open_positions: usize,
    pub unrealized_pl: f64,
    pub total_trades: usize,
}

impl DashboardSummary {
    pub fn build(account: Option<&Account>, positions: &[Position], logs: &[OrderLog]) -> Self {
        Self {
            portfolio_value: account.and_then(|a| a.portfolio_value),
            buying_power: account.and_then(|a| a.buying_power),
            cash: account.and_then(|a| a.cash),
            day_change: account.and_then(Account::day_change),
            open_positions: positions.len(),
            unrealized_pl: positions.iter().map(|p| p.unrealized_pl).sum(),
            total_trades: total_trades(logs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(id: &str, status: &str, submitted: &str, filled: Option<&str>) -> OrderLog {
        OrderLog {
            id: id.into(),
            status: Some(status.into()),
            submitted_at: Some(submitted.into()),
            filled_at: filled.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn recent_fills_newest_first() {
        let logs = vec![
            log("a", "filled", "2024-01-01T10:00:00Z", Some("2024-01-01T10:00:01Z")),
            log("b", "rejected", "2024-01-05T10:00:00Z", None),
            log("c", "filled", "2024-01-03T10:00:00Z", None),
            log("d", "filled", "2024-01-02T10:00:00Z", Some("2024-01-04T09:00:00Z")),
            log("e", "filled", "2023-12-30T10:00:00Z", Some("2023-12-30T10:00:00Z")),
        ];
        let ids: Vec<&str> = recent_fills(&logs, RECENT_FILLS)
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(ids, vec!["d", "c", "a"]);
        assert_eq!(total_trades(&logs), 4);
    }

    #[test]
    fn summary_without_account() {
        let s = DashboardSummary::build(None, &[], &[]);
        assert_eq!(s.portfolio_value, None);
        assert_eq!(s.total_trades, 0);
    }
}
