use serde::{Deserialize, Serialize};

use super::id;

/// In-app notification (order fills, price alerts, system messages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<String>,
}

impl Notification {
    /// Heading shown above the message; falls back to a generic label.
    pub fn title(&self) -> &str {
        self.kind.as_deref().unwrap_or("notification")
    }
}
