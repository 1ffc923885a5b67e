use reqwest::Method;

use super::client::{segment, ApiClient};
use crate::domain::Notification;
use crate::error::ApiError;

impl ApiClient {
    pub fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get("/notifications")
    }

    /// Ask the server to generate any pending notifications.
    pub fn poll_notifications(&self) -> Result<(), ApiError> {
        self.fire(Method::POST, "/notifications/poll")
    }

    pub fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        self.fire(Method::POST, &format!("/notifications/{}/read", segment(id)))
    }

    pub fn delete_notification(&self, id: &str) -> Result<(), ApiError> {
        self.fire(Method::DELETE, &format!("/notifications/{}", segment(id)))
    }
}
