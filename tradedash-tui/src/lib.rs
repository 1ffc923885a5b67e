//! TradeDash TUI: ten-panel terminal trading dashboard with vim-style navigation.
//!
//! Panels:
//! 1. Dashboard: account summary, recent fills, order log
//! 2. Backtest: strategy parameters, equity and drawdown charts
//! 3. Portfolio: equity history and positions
//! 4. Orders: open and recent orders
//! 5. History: order history and account activities
//! 6. Replay: multi-symbol portfolio replay
//! 7. Compare: one strategy over two periods
//! 8. Training: modules, units and gamification
//! 9. Settings: account and Alpaca keys
//! 0. Help: keyboard shortcuts

pub mod app;
pub mod form;
pub mod input;
pub mod persistence;
pub mod response;
pub mod theme;
pub mod ui;
pub mod worker;

pub use app::AppState;
