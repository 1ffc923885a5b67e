//! Client-side validation for the auth, order and settings forms.
//!
//! Each form returns a [`FieldErrors`] map keyed by field name; an empty map
//! means the form may be submitted. The server re-validates everything.

use std::collections::BTreeMap;

use crate::domain::{AlpacaEnv, AlpacaKeys, OrderRequest, OrderType};
use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Field name → message, in a stable order for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// `Ok(())` when empty, otherwise the first message as a validation error.
    pub fn into_result(self) -> Result<(), ApiError> {
        match self.0.into_values().next() {
            None => Ok(()),
            Some(msg) => Err(ApiError::Validation(msg)),
        }
    }
}

/// Loose shape check: something@something.tld, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    match domain.rsplit_once('.') {
        Some((host, tld)) => !local.is_empty() && !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.insert("email", "Email is invalid");
    }
}

fn check_new_password(errors: &mut FieldErrors, password: &str, confirm: &str) {
    if password.is_empty() {
        errors.insert("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
    if confirm.is_empty() {
        errors.insert("confirmPassword", "Please confirm your password");
    } else if password != confirm {
        errors.insert("confirmPassword", "Passwords do not match");
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        check_email(&mut errors, self.email.trim());
        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.insert("name", "Name is required");
        }
        check_email(&mut errors, self.email.trim());
        check_new_password(&mut errors, &self.password, &self.confirm_password);
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl ForgotPasswordForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        check_email(&mut errors, self.email.trim());
        errors
    }
}

/// Reset form. No minimum length here; the server enforces its own policy.
#[derive(Debug, Clone, Default)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

impl ResetPasswordForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.token.trim().is_empty() {
            errors.insert("token", "Invalid or missing reset token");
        }
        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        }
        if self.confirm_password.is_empty() {
            errors.insert("confirmPassword", "Please confirm your password");
        } else if self.password != self.confirm_password {
            errors.insert("confirmPassword", "Passwords do not match");
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerifyEmailForm {
    pub token: String,
}

impl VerifyEmailForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.token.trim().is_empty() {
            errors.insert("token", "Verification token is required");
        }
        errors
    }
}

/// Normalize and check an order before submission: the symbol is trimmed and
/// uppercased in place.
pub fn validate_order(order: &mut OrderRequest) -> FieldErrors {
    let mut errors = FieldErrors::default();
    order.symbol = order.symbol.trim().to_ascii_uppercase();
    if order.symbol.is_empty() {
        errors.insert("symbol", "Symbol is required");
    }
    if !(order.qty > 0.0) {
        errors.insert("qty", "Quantity must be greater than 0");
    }
    let needs_limit = matches!(order.order_type, OrderType::Limit | OrderType::StopLimit);
    let needs_stop = matches!(order.order_type, OrderType::Stop | OrderType::StopLimit);
    match order.limit_price {
        None if needs_limit => errors.insert("limit_price", "Limit price is required"),
        Some(p) if needs_limit && p <= 0.0 => {
            errors.insert("limit_price", "Limit price must be greater than 0")
        }
        _ => {}
    }
    match order.stop_price {
        None if needs_stop => errors.insert("stop_price", "Stop price is required"),
        Some(p) if needs_stop && p <= 0.0 => {
            errors.insert("stop_price", "Stop price must be greater than 0")
        }
        _ => {}
    }
    if !needs_limit {
        order.limit_price = None;
    }
    if !needs_stop {
        order.stop_price = None;
    }
    errors
}

/// Keys for the selected environment must both be present.
pub fn validate_keys(keys: &AlpacaKeys) -> FieldErrors {
    let mut errors = FieldErrors::default();
    let (key, secret) = match keys.alpaca_env {
        AlpacaEnv::Paper => (&keys.alpaca_paper_api_key, &keys.alpaca_paper_secret_key),
        AlpacaEnv::Live => (&keys.alpaca_live_api_key, &keys.alpaca_live_secret_key),
    };
    if key.trim().is_empty() {
        errors.insert("apiKey", "API key is required for the selected environment");
    }
    if secret.trim().is_empty() {
        errors.insert("secretKey", "Secret key is required for the selected environment");
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn register_rules() {
        let form = RegisterForm {
            name: " ".into(),
            email: "x@y.z".into(),
            password: "12345".into(),
            confirm_password: "1234".into(),
        };
        let errors = form.validate();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("password"), Some("Password must be at least 6 characters"));
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn register_accepts_valid_form() {
        let form = RegisterForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn reset_requires_token() {
        let form = ResetPasswordForm {
            token: String::new(),
            password: "abc".into(),
            confirm_password: "abc".into(),
        };
        let errors = form.validate();
        assert!(errors.get("token").is_some());
        assert!(errors.get("password").is_none());
    }

    #[test]
    fn verify_requires_token() {
        assert!(VerifyEmailForm { token: "  ".into() }.validate().get("token").is_some());
        assert!(VerifyEmailForm { token: "abc".into() }.validate().is_empty());
    }

    #[test]
    fn order_is_normalized() {
        let mut order = OrderRequest {
            symbol: " aapl ".into(),
            limit_price: Some(10.0),
            ..Default::default()
        };
        assert!(validate_order(&mut order).is_empty());
        assert_eq!(order.symbol, "AAPL");
        assert_eq!(order.limit_price, None);
    }

    #[test]
    fn order_limit_needs_price() {
        let mut order = OrderRequest {
            symbol: "AAPL".into(),
            qty: 0.0,
            order_type: OrderType::Limit,
            ..Default::default()
        };
        let errors = validate_order(&mut order);
        assert!(errors.get("qty").is_some());
        assert!(errors.get("limit_price").is_some());
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn keys_checked_for_selected_env() {
        let keys = AlpacaKeys {
            alpaca_paper_api_key: "PK".into(),
            alpaca_paper_secret_key: "SK".into(),
            alpaca_env: AlpacaEnv::Live,
            ..Default::default()
        };
        assert!(!validate_keys(&keys).is_empty());
        let paper = AlpacaKeys { alpaca_env: AlpacaEnv::Paper, ..keys };
        assert!(validate_keys(&paper).is_empty());
    }
}
