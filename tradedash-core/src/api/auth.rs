use reqwest::Method;
use serde_json::json;

use super::client::ApiClient;
use crate::domain::{AlpacaKeys, AuthResponse, KeysResponse, MessageResponse};
use crate::error::ApiError;

impl ApiClient {
    /// `POST /auth/login`. Does not install the token; see
    /// [`crate::session::SessionStore::login`].
    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login", &json!({ "email": email, "password": password }))
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<MessageResponse, ApiError> {
        self.post(
            "/auth/register",
            &json!({ "name": name, "email": email, "password": password }),
        )
    }

    pub fn forgot_password(&self, email: &str) -> Result<MessageResponse, ApiError> {
        self.post("/auth/forgot-password", &json!({ "email": email }))
    }

    pub fn reset_password(&self, token: &str, password: &str) -> Result<MessageResponse, ApiError> {
        self.post(
            "/auth/reset-password",
            &json!({ "token": token, "password": password }),
        )
    }

    pub fn verify_email(&self, token: &str) -> Result<MessageResponse, ApiError> {
        self.get_query("/auth/verify", &[("token", token)])
    }

    /// Store brokerage keys. A `success: false` reply is turned into an error.
    pub fn update_alpaca_keys(&self, keys: &AlpacaKeys) -> Result<KeysResponse, ApiError> {
        let resp: KeysResponse = self.send_json(Method::PUT, "/auth/alpaca-keys", keys)?;
        keys_outcome(resp)
    }

    pub fn remove_alpaca_keys(&self) -> Result<KeysResponse, ApiError> {
        let resp: KeysResponse = self.delete("/auth/alpaca-keys")?;
        keys_outcome(resp)
    }
}

fn keys_outcome(resp: KeysResponse) -> Result<KeysResponse, ApiError> {
    if resp.success {
        Ok(resp)
    } else {
        Err(ApiError::Validation(
            resp.error
                .unwrap_or_else(|| "failed to update API keys".to_string()),
        ))
    }
}
