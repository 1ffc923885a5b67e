use super::client::ApiClient;
use crate::domain::{Activity, HistoryItem};
use crate::error::ApiError;

impl ApiClient {
    pub fn history(&self) -> Result<Vec<HistoryItem>, ApiError> {
        self.get("/history")
    }

    pub fn activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.get("/history/activities")
    }
}
