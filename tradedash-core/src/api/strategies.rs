use super::client::ApiClient;
use crate::domain::{BacktestResult, StrategyRunRequest};
use crate::error::ApiError;
use crate::strategy::StrategyKind;

impl ApiClient {
    /// Run one strategy through its dedicated endpoint.
    pub fn run_strategy(&self, kind: StrategyKind, req: &StrategyRunRequest) -> Result<BacktestResult, ApiError> {
        self.post(kind.endpoint(), req)
    }
}
