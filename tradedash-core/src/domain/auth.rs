//! Users, login responses and brokerage key settings.

use serde::{Deserialize, Serialize};

use super::id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpaca_env: Option<AlpacaEnv>,
    #[serde(default)]
    pub has_alpaca_keys: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Generic `{ message }` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlpacaEnv {
    #[default]
    Paper,
    Live,
}

/// Body of `PUT /auth/alpaca-keys`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlpacaKeys {
    pub alpaca_paper_api_key: String,
    pub alpaca_paper_secret_key: String,
    pub alpaca_live_api_key: String,
    pub alpaca_live_secret_key: String,
    pub alpaca_env: AlpacaEnv,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeysResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_serialize_camel_case() {
        let keys = AlpacaKeys {
            alpaca_paper_api_key: "PK1".into(),
            alpaca_env: AlpacaEnv::Live,
            ..Default::default()
        };
        let v = serde_json::to_value(&keys).unwrap();
        assert_eq!(v["alpacaPaperApiKey"], "PK1");
        assert_eq!(v["alpacaEnv"], "live");
    }
}
