//! Wire types for the trading API.
//!
//! These mirror the JSON the API sends. Nothing here is computed locally;
//! unknown fields are ignored and optional ones default.

pub mod account;
pub mod auth;
pub mod backtest;
pub mod notification;
pub mod order;
pub mod training;

pub use account::{
    Account, Activity, Bar, HistoryItem, PortfolioHistory, Position, Quote, SymbolInfo,
};
pub use auth::{AlpacaEnv, AlpacaKeys, AuthResponse, KeysResponse, MessageResponse, User};
pub use backtest::{
    BacktestRequest, BacktestResult, ComparisonRequest, ComparisonResult, DateRange,
    PeriodResult, PortfolioReplay, ReplayAction, ReplayRequest, ReplayStep, ReplaySummary,
    StrategyRunRequest, TradeOutcome, WinLoss,
};
pub use notification::Notification;
pub use order::{Order, OrderLog, OrderRequest, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use training::{
    Achievement, Badge, LeaderboardEntry, Module, ModuleSummary, Unit, UnitProgressUpdate,
    UserProgress,
};

/// Serde helpers for numeric fields the API sends either as JSON numbers or
/// as decimal strings (brokerage passthrough fields like `"1234.50"`).
pub(crate) mod num {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    fn to_f64<E: serde::de::Error>(v: NumOrStr) -> Result<f64, E> {
        match v {
            NumOrStr::Num(n) => Ok(n),
            NumOrStr::Str(s) if s.trim().is_empty() => Ok(0.0),
            NumOrStr::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("not a number: '{s}'"))),
        }
    }

    pub fn flexible<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        to_f64(NumOrStr::deserialize(d)?)
    }

    pub fn flexible_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<NumOrStr>::deserialize(d)? {
            Some(v) => to_f64(v).map(Some),
            None => Ok(None),
        }
    }
}

/// Ids arrive as strings from some services and integers from others.
pub(crate) mod id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Int(i64),
        Str(String),
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match IdRepr::deserialize(d)? {
            IdRepr::Int(i) => i.to_string(),
            IdRepr::Str(s) => s,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_accepts_string_numbers() {
        let json = r#"{
            "symbol": "AAPL", "qty": "10", "avg_entry_price": "150.25",
            "current_price": 155.0, "market_value": "1550", "unrealized_pl": "47.5",
            "unrealized_plpc": "0.0316", "side": "long"
        }"#;
        let pos: Position = serde_json::from_str(json).unwrap();
        assert_eq!(pos.qty, 10.0);
        assert_eq!(pos.avg_entry_price, 150.25);
        assert_eq!(pos.current_price, 155.0);
    }

    #[test]
    fn numeric_ids_become_strings() {
        let n: Notification =
            serde_json::from_str(r#"{"id": 42, "message": "Order filled", "read": false}"#).unwrap();
        assert_eq!(n.id, "42");
    }
}
