use super::client::{segment, ApiClient};
use crate::domain::{MessageResponse, Order, OrderLog, OrderRequest};
use crate::error::{error_message, ApiError};

impl ApiClient {
    pub fn orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get("/orders")
    }

    /// Submit an order. The reply must carry an `id`; anything else is
    /// reported with the server's message.
    pub fn create_order(&self, order: &OrderRequest) -> Result<Order, ApiError> {
        let raw: serde_json::Value = self.post("/orders", order)?;
        if raw.get("id").map_or(true, serde_json::Value::is_null) {
            let message = error_message(&raw.to_string())
                .unwrap_or_else(|| "Failed to place order".to_string());
            return Err(ApiError::Validation(message));
        }
        Ok(serde_json::from_value(raw)?)
    }

    pub fn order(&self, id: &str) -> Result<Order, ApiError> {
        self.get(&format!("/orders/{}", segment(id)))
    }

    pub fn cancel_order(&self, id: &str) -> Result<MessageResponse, ApiError> {
        let path = format!("/orders/{}", segment(id));
        let body: Option<MessageResponse> = self.delete(&path)?;
        Ok(body.unwrap_or_default())
    }

    /// `GET /order-logs`. A non-array reply is treated as an empty log.
    pub fn order_logs(&self) -> Result<Vec<OrderLog>, ApiError> {
        let raw: serde_json::Value = self.get("/order-logs")?;
        match raw {
            serde_json::Value::Array(_) => Ok(serde_json::from_value(raw)?),
            _ => Ok(Vec::new()),
        }
    }
}
