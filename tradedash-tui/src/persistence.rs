//! UI state persistence: JSON save/load across restarts.
//!
//! Only view preferences are kept here. The login session has its own file
//! managed by [`tradedash_core::SessionStore`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use tradedash_core::strategy::StrategyKind;

use crate::app::{AppState, Overlay, Panel};

/// Serializable subset of app state that persists across restarts.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub active_panel: Panel,
    /// Backtest strategy id, e.g. `basicMomentum`.
    pub strategy: String,
    pub symbol: String,
    pub replay_symbols: String,
    pub history_period: usize,
    pub welcome_dismissed: bool,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            active_panel: Panel::Dashboard,
            strategy: StrategyKind::BasicMomentum.id().to_string(),
            symbol: "AAPL".into(),
            replay_symbols: "AAPL".into(),
            history_period: 0,
            welcome_dismissed: false,
        }
    }
}

/// Load persisted state from disk. Returns defaults if file is missing or corrupt.
pub fn load(path: &Path) -> PersistedState {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => PersistedState::default(),
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn extract(app: &AppState) -> PersistedState {
    PersistedState {
        active_panel: app.active_panel,
        strategy: app.backtest.form.strategy().id().to_string(),
        symbol: app.backtest.form.symbol.clone(),
        replay_symbols: app.replay.symbols.clone(),
        history_period: app.portfolio.period,
        welcome_dismissed: app.welcome_dismissed || app.overlay == Overlay::None,
    }
}

/// Apply persisted state. Unknown strategy ids keep the default.
pub fn apply(app: &mut AppState, state: PersistedState) {
    app.active_panel = state.active_panel;
    if let Some(kind) = StrategyKind::from_id(&state.strategy) {
        app.backtest.select_strategy(kind);
    }
    if !state.symbol.trim().is_empty() {
        app.backtest.form.symbol = state.symbol.trim().to_ascii_uppercase();
    }
    if !state.replay_symbols.trim().is_empty() {
        app.replay.symbols = state.replay_symbols;
    }
    app.portfolio.period = state.history_period;
    app.welcome_dismissed = state.welcome_dismissed;
    if !state.welcome_dismissed && app.overlay == Overlay::None {
        app.overlay = Overlay::Welcome;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ui_state.json");

        let state = PersistedState {
            active_panel: Panel::Replay,
            strategy: "volatilityBreakout".into(),
            symbol: "MSFT".into(),
            welcome_dismissed: true,
            ..PersistedState::default()
        };

        save(&path, &state).unwrap();
        let loaded = load(&path);

        assert_eq!(loaded.active_panel, Panel::Replay);
        assert_eq!(loaded.strategy, "volatilityBreakout");
        assert_eq!(loaded.symbol, "MSFT");
        assert!(loaded.welcome_dismissed);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let loaded = load(Path::new("/nonexistent/path/ui_state.json"));
        assert_eq!(loaded.active_panel, Panel::Dashboard);
        assert!(!loaded.welcome_dismissed);
    }

    #[test]
    fn corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui_state.json");
        std::fs::write(&path, "not valid json {{{").unwrap();

        let loaded = load(&path);
        assert_eq!(loaded.strategy, "basicMomentum");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui_state.json");
        std::fs::write(&path, r#"{"symbol":"TSLA"}"#).unwrap();

        let loaded = load(&path);
        assert_eq!(loaded.symbol, "TSLA");
        assert_eq!(loaded.replay_symbols, "AAPL");
    }
}
