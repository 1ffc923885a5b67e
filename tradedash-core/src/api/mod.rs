//! Typed wrappers over the trading REST API, one file per endpoint group.
//!
//! Every wrapper is a thin `impl ApiClient` method: it builds the path and
//! body, sends one request and decodes the JSON shape listed in the endpoint
//! table. No business logic runs here.

mod auth;
mod backtest;
mod client;
mod history;
mod notifications;
mod orders;
mod portfolio;
mod strategies;
mod training;

pub use client::ApiClient;
pub use portfolio::{BarsQuery, HistoryQuery};
