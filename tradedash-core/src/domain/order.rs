//! Orders and the order audit log.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{id, num};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    #[default]
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
    Stop,
    StopLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    #[default]
    Day,
    Gtc,
    Ioc,
    Fok,
}

macro_rules! impl_cycle_display {
    ($t:ty, [$($v:ident => $s:literal),+ $(,)?]) => {
        impl $t {
            pub const ALL: &'static [$t] = &[$(Self::$v),+];

            pub fn as_str(self) -> &'static str {
                match self { $(Self::$v => $s),+ }
            }

            /// Next variant, wrapping. Used by form pickers.
            pub fn cycle(self, direction: i32) -> Self {
                let all = Self::ALL;
                let idx = all.iter().position(|v| *v == self).unwrap_or(0) as i32;
                let len = all.len() as i32;
                all[((idx + direction).rem_euclid(len)) as usize]
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $t {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lower = s.to_ascii_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == lower)
                    .ok_or_else(|| format!("unknown value '{s}'"))
            }
        }
    };
}

impl_cycle_display!(OrderSide, [Buy => "buy", Sell => "sell"]);
impl_cycle_display!(OrderType, [Market => "market", Limit => "limit", Stop => "stop", StopLimit => "stop_limit"]);
impl_cycle_display!(TimeInForce, [Day => "day", Gtc => "gtc", Ioc => "ioc", Fok => "fok"]);

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: f64,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
}

impl Default for OrderRequest {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            qty: 1.0,
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            limit_price: None,
            stop_price: None,
        }
    }
}

/// Coarse status bucket used for coloring order rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
    Other,
}

impl OrderStatus {
    pub fn classify(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "open" | "new" | "accepted" | "pending_new" | "partially_filled" => OrderStatus::Open,
            "filled" => OrderStatus::Filled,
            "cancelled" | "canceled" | "rejected" | "expired" => OrderStatus::Cancelled,
            _ => OrderStatus::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    pub symbol: String,
    #[serde(deserialize_with = "num::flexible")]
    pub qty: f64,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(default, alias = "filled_avg_price", deserialize_with = "num::flexible_opt")]
    pub filled_avg_price: Option<f64>,
}

impl Order {
    pub fn status_class(&self) -> OrderStatus {
        OrderStatus::classify(&self.status)
    }
}

/// Entry of `GET /order-logs`: one submitted order with its lifecycle stamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderLog {
    #[serde(default, deserialize_with = "id::string")]
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "num::flexible_opt")]
    pub qty: Option<f64>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub filled_at: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl OrderLog {
    pub fn is_filled(&self) -> bool {
        self.status.as_deref() == Some("filled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_request_wire_shape() {
        let req = OrderRequest {
            symbol: "AAPL".into(),
            qty: 3.0,
            side: OrderSide::Sell,
            order_type: OrderType::StopLimit,
            ..Default::default()
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["side"], "sell");
        assert_eq!(v["type"], "stop_limit");
        assert_eq!(v["time_in_force"], "day");
        assert!(v.get("limit_price").is_none());
    }

    #[test]
    fn enums_cycle_and_parse() {
        assert_eq!(OrderSide::Buy.cycle(1), OrderSide::Sell);
        assert_eq!(OrderSide::Buy.cycle(-1), OrderSide::Sell);
        assert_eq!(OrderType::Market.cycle(-1), OrderType::StopLimit);
        assert_eq!("GTC".parse::<TimeInForce>().unwrap(), TimeInForce::Gtc);
        assert!("later".parse::<TimeInForce>().is_err());
    }

    #[test]
    fn status_buckets() {
        assert_eq!(OrderStatus::classify("Filled"), OrderStatus::Filled);
        assert_eq!(OrderStatus::classify("canceled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::classify("open"), OrderStatus::Open);
        assert_eq!(OrderStatus::classify("held"), OrderStatus::Other);
    }
}
