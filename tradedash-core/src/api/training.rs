use reqwest::Method;

use super::client::{segment, ApiClient};
use crate::domain::{
    Achievement, Badge, LeaderboardEntry, Module, ModuleSummary, Unit, UnitProgressUpdate,
    UserProgress,
};
use crate::error::ApiError;

impl ApiClient {
    pub fn modules(&self) -> Result<Vec<ModuleSummary>, ApiError> {
        self.get("/training/modules")
    }

    pub fn module(&self, id: &str) -> Result<Module, ApiError> {
        self.get(&format!("/training/modules/{}", segment(id)))
    }

    pub fn unit(&self, id: &str) -> Result<Unit, ApiError> {
        self.get(&format!("/training/units/{}", segment(id)))
    }

    pub fn update_unit_progress(&self, id: &str, update: &UnitProgressUpdate) -> Result<(), ApiError> {
        let path = format!("/training/units/{}/progress", segment(id));
        self.fire_json(Method::POST, &path, update)
    }

    pub fn progress(&self) -> Result<UserProgress, ApiError> {
        self.get("/training/progress")
    }

    pub fn reset_progress(&self) -> Result<(), ApiError> {
        self.fire(Method::DELETE, "/training/progress")
    }

    pub fn achievements(&self) -> Result<Vec<Achievement>, ApiError> {
        self.get("/training/achievements")
    }

    pub fn badges(&self) -> Result<Vec<Badge>, ApiError> {
        self.get("/training/badges")
    }

    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ApiError> {
        self.get("/training/leaderboard")
    }
}
