use serde::Serialize;

use super::client::{segment, ApiClient};
use crate::domain::{Account, Bar, PortfolioHistory, Position, Quote, SymbolInfo};
use crate::error::ApiError;

/// Query for `GET /portfolio/history`. Unset fields are left to the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

/// Query for `GET /portfolio/market/bars/:symbol`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BarsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl ApiClient {
    pub fn portfolio(&self) -> Result<Account, ApiError> {
        self.get("/portfolio")
    }

    pub fn positions(&self) -> Result<Vec<Position>, ApiError> {
        self.get("/portfolio/positions")
    }

    pub fn portfolio_history(&self, query: &HistoryQuery) -> Result<PortfolioHistory, ApiError> {
        self.get_query("/portfolio/history", query)
    }

    pub fn quote(&self, symbol: &str) -> Result<Quote, ApiError> {
        self.get(&format!("/portfolio/market/quote/{}", segment(symbol)))
    }

    pub fn bars(&self, symbol: &str, query: &BarsQuery) -> Result<Vec<Bar>, ApiError> {
        self.get_query(&format!("/portfolio/market/bars/{}", segment(symbol)), query)
    }

    pub fn symbols(&self) -> Result<Vec<SymbolInfo>, ApiError> {
        self.get("/portfolio/market/symbols")
    }
}
