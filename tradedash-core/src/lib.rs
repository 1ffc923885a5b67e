//! Client library for the TradeDash trading API.
//!
//! The server owns every piece of trading logic: order execution, portfolio
//! valuation, backtests, strategy computation and training progress. This
//! crate holds what a front end needs around that:
//!
//! - [`api::ApiClient`]: one typed method per endpoint
//! - [`session::SessionStore`]: cached login token and user
//! - [`strategy`]: strategy catalog and backtest parameter form
//! - [`replay`]: portfolio replay stepper and overlay
//! - [`training`]: unit content parsing, answers and scoring
//! - [`export`]: CSV export for logs, replays and backtests

pub mod api;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod export;
pub mod forms;
pub mod notifications;
pub mod replay;
pub mod session;
pub mod strategy;
pub mod training;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use session::{Session, SessionStore, SESSION_EXPIRED};
