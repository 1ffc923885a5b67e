//! Portfolio account, positions, market data and trade history.

use serde::{Deserialize, Serialize};

use super::{id, num};

/// Brokerage account snapshot from `GET /portfolio`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub portfolio_value: Option<f64>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub buying_power: Option<f64>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub cash: Option<f64>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub equity: Option<f64>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub last_equity: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl Account {
    /// Day P&L as equity minus last close equity, when both are known.
    pub fn day_change(&self) -> Option<f64> {
        Some(self.equity? - self.last_equity?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    #[serde(deserialize_with = "num::flexible")]
    pub qty: f64,
    #[serde(deserialize_with = "num::flexible")]
    pub avg_entry_price: f64,
    #[serde(deserialize_with = "num::flexible")]
    pub current_price: f64,
    #[serde(deserialize_with = "num::flexible")]
    pub market_value: f64,
    #[serde(deserialize_with = "num::flexible")]
    pub unrealized_pl: f64,
    #[serde(default, deserialize_with = "num::flexible")]
    pub unrealized_plpc: f64,
    #[serde(default)]
    pub side: String,
}

/// Equity history from `GET /portfolio/history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioHistory {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub equity: Vec<Option<f64>>,
    #[serde(default)]
    pub profit_loss: Vec<Option<f64>>,
    #[serde(default)]
    pub profit_loss_pct: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub base_value: Option<f64>,
    #[serde(default)]
    pub timeframe: Option<String>,
}

impl PortfolioHistory {
    /// Equity values with gaps carried forward from the previous point.
    pub fn equity_filled(&self) -> Vec<f64> {
        let mut last = self.base_value.unwrap_or(0.0);
        self.equity
            .iter()
            .map(|v| {
                if let Some(x) = v {
                    last = *x;
                }
                last
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, alias = "bp", deserialize_with = "num::flexible_opt")]
    pub bid_price: Option<f64>,
    #[serde(default, alias = "ap", deserialize_with = "num::flexible_opt")]
    pub ask_price: Option<f64>,
    #[serde(default, alias = "bs", deserialize_with = "num::flexible_opt")]
    pub bid_size: Option<f64>,
    #[serde(default, alias = "as", deserialize_with = "num::flexible_opt")]
    pub ask_size: Option<f64>,
    #[serde(default, alias = "t")]
    pub timestamp: Option<String>,
}

impl Quote {
    pub fn mid(&self) -> Option<f64> {
        Some((self.bid_price? + self.ask_price?) / 2.0)
    }
}

/// OHLCV bar. Accepts both long and single-letter (brokerage) field names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bar {
    #[serde(alias = "t")]
    pub timestamp: String,
    #[serde(alias = "o", deserialize_with = "num::flexible")]
    pub open: f64,
    #[serde(alias = "h", deserialize_with = "num::flexible")]
    pub high: f64,
    #[serde(alias = "l", deserialize_with = "num::flexible")]
    pub low: f64,
    #[serde(alias = "c", deserialize_with = "num::flexible")]
    pub close: f64,
    #[serde(default, alias = "v", deserialize_with = "num::flexible")]
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exchange: String,
}

impl SymbolInfo {
    /// Display label used by symbol pickers: `AAPL - Apple Inc. (NASDAQ)`.
    pub fn label(&self) -> String {
        format!("{} - {} ({})", self.symbol, self.name, self.exchange)
    }
}

/// Row of `GET /history`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    pub symbol: String,
    #[serde(deserialize_with = "num::flexible")]
    pub qty: f64,
    #[serde(rename = "type", alias = "side")]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub price: Option<f64>,
}

/// Account activity from `GET /history/activities` (fills, dividends, transfers).
#[derive(Debug, Clone, Deserialize)]
pub struct Activity {
    #[serde(default, deserialize_with = "id::string")]
    pub id: String,
    #[serde(default)]
    pub activity_type: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub net_amount: Option<f64>,
    #[serde(default)]
    pub transaction_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl Activity {
    pub fn when(&self) -> &str {
        self.transaction_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or("-")
    }
}
