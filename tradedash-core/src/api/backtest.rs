use super::client::ApiClient;
use crate::domain::{
    BacktestRequest, BacktestResult, ComparisonRequest, ComparisonResult, PortfolioReplay,
    ReplayRequest,
};
use crate::error::ApiError;

impl ApiClient {
    pub fn run_backtest(&self, req: &BacktestRequest) -> Result<BacktestResult, ApiError> {
        self.post("/backtest", req)
    }

    pub fn market_event_comparison(&self, req: &ComparisonRequest) -> Result<ComparisonResult, ApiError> {
        self.post("/market-event-comparison", req)
    }

    pub fn portfolio_replay(&self, req: &ReplayRequest) -> Result<PortfolioReplay, ApiError> {
        self.post("/portfolio-replay", req)
    }
}
