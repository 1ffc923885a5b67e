//! Keyboard input dispatch: text edits → overlays → global keys → panel keys.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use tradedash_core::domain::{AlpacaEnv, OrderStatus};
use tradedash_core::export;
use tradedash_core::forms::validate_keys;
use tradedash_core::training::UnitBody;

use crate::app::{
    AppState, AuthScreen, BacktestRow, CompareState, EditTarget, ErrorCategory, GamificationTab,
    HistoryView, OrderRow, Overlay, Panel, ReplayState, SettingsState, HISTORY_PERIODS,
};
use crate::worker::WorkerCommand;

pub fn handle_key(app: &mut AppState, key: KeyEvent, now: Instant) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.running = false;
        return;
    }

    // 1. An inline edit swallows everything until Enter or Esc.
    if app.edit.is_some() {
        handle_edit(app, key);
        return;
    }

    // 2. Overlays consume input next.
    match app.overlay {
        Overlay::Welcome => {
            app.overlay = Overlay::None;
            app.welcome_dismissed = true;
            return;
        }
        Overlay::Auth => {
            handle_auth_overlay(app, key);
            return;
        }
        Overlay::NewOrder => {
            handle_order_overlay(app, key);
            return;
        }
        Overlay::Unit => {
            handle_unit_overlay(app, key, now);
            return;
        }
        Overlay::Gamification => {
            handle_gamification_overlay(app, key);
            return;
        }
        Overlay::Notifications => {
            handle_notifications_overlay(app, key);
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::ConfirmReset => {
            if key.code == KeyCode::Char('y') {
                app.send(WorkerCommand::ResetProgress);
            } else {
                app.set_status("Reset cancelled");
            }
            app.overlay = Overlay::None;
            return;
        }
        Overlay::None => {}
    }

    // 3. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char(c @ '0'..='9') => {
            if let Some(panel) = Panel::from_hotkey(c) {
                app.enter_panel(panel);
            }
            return;
        }
        KeyCode::Tab => {
            app.enter_panel(app.active_panel.next());
            return;
        }
        KeyCode::BackTab => {
            app.enter_panel(app.active_panel.prev());
            return;
        }
        KeyCode::Char('?') => {
            app.enter_panel(Panel::Help);
            return;
        }
        KeyCode::Char('e') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
            return;
        }
        KeyCode::Char('N') => {
            app.notification_cursor = 0;
            app.overlay = Overlay::Notifications;
            app.send(WorkerCommand::LoadNotifications);
            return;
        }
        KeyCode::Char('r') => {
            app.refresh();
            return;
        }
        _ => {}
    }

    // 4. Panel-specific keys.
    match app.active_panel {
        Panel::Dashboard => handle_dashboard_key(app, key),
        Panel::Backtest => handle_backtest_key(app, key),
        Panel::Portfolio => handle_portfolio_key(app, key),
        Panel::Orders => handle_orders_key(app, key),
        Panel::History => handle_history_key(app, key),
        Panel::Replay => handle_replay_key(app, key, now),
        Panel::Compare => handle_compare_key(app, key),
        Panel::Training => handle_training_key(app, key),
        Panel::Settings => handle_settings_key(app, key),
        Panel::Help => {}
    }
}

fn handle_edit(app: &mut AppState, key: KeyEvent) {
    let Some(edit) = app.edit.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Esc => app.edit = None,
        KeyCode::Backspace => {
            edit.buffer.pop();
        }
        KeyCode::Char(c) => edit.buffer.push(c),
        _ => {}
    }
}

fn step(cursor: &mut usize, len: usize, down: bool) {
    if down {
        if *cursor + 1 < len {
            *cursor += 1;
        }
    } else {
        *cursor = cursor.saturating_sub(1);
    }
}

fn export_result(app: &mut AppState, stem: &str, content: anyhow::Result<String>) {
    let written = content.and_then(|csv| export::write_export(&app.export_dir, stem, &csv));
    match written {
        Ok(path) => app.set_status(format!("Exported to {}", path.display())),
        Err(e) => app.push_error(ErrorCategory::Other, format!("{e:#}"), "export".into()),
    }
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

fn handle_auth_overlay(app: &mut AppState, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let auth = &mut app.auth;
    match key.code {
        KeyCode::Char('l') if ctrl => auth.switch(AuthScreen::Login),
        KeyCode::Char('r') if ctrl => auth.switch(AuthScreen::Register),
        KeyCode::Char('f') if ctrl => auth.switch(AuthScreen::Forgot),
        KeyCode::Char('t') if ctrl => auth.switch(AuthScreen::Reset),
        KeyCode::Char('v') if ctrl => auth.switch(AuthScreen::Verify),
        KeyCode::Esc => {
            if auth.screen == AuthScreen::Login {
                app.running = false;
            } else {
                auth.switch(AuthScreen::Login);
            }
        }
        KeyCode::Tab | KeyCode::Down => auth.form.next(),
        KeyCode::BackTab | KeyCode::Up => auth.form.prev(),
        KeyCode::Backspace => auth.form.pop(),
        KeyCode::Enter => {
            // Enter on a middle field moves on; on the last one it submits.
            if auth.form.focus + 1 < auth.form.len() {
                auth.form.next();
            } else if let Some(cmd) = auth.submit() {
                app.send(cmd);
            }
        }
        KeyCode::Char(c) if !ctrl => auth.form.push(c),
        _ => {}
    }
}

fn handle_order_overlay(app: &mut AppState, key: KeyEvent) {
    let form = &mut app.new_order;
    let row = form.current();
    match key.code {
        KeyCode::Esc => app.overlay = Overlay::None,
        KeyCode::Down | KeyCode::Tab => step(&mut form.row, OrderRow::ALL.len(), true),
        KeyCode::Up | KeyCode::BackTab => step(&mut form.row, OrderRow::ALL.len(), false),
        KeyCode::Left => form.cycle(-1),
        KeyCode::Right | KeyCode::Char(' ') if !row.is_text() => form.cycle(1),
        KeyCode::Backspace => {
            if let Some(text) = form.text_mut(row) {
                text.pop();
            }
        }
        KeyCode::Enter => {
            if let Some(order) = form.to_request() {
                app.send(WorkerCommand::PlaceOrder(order));
                app.set_status("Submitting order...");
            }
        }
        KeyCode::Char(c) => match form.text_mut(row) {
            Some(text) => text.push(c),
            None => match c {
                'h' => form.cycle(-1),
                'l' => form.cycle(1),
                _ => {}
            },
        },
        _ => {}
    }
}

fn handle_unit_overlay(app: &mut AppState, key: KeyEvent, now: Instant) {
    let Some(viewer) = app.unit.as_mut() else {
        app.overlay = Overlay::None;
        return;
    };
    let typing = matches!(viewer.body, UnitBody::FillBlank(_)) && !viewer.sheet.is_submitted();

    match key.code {
        KeyCode::Esc => {
            app.unit = None;
            app.overlay = Overlay::None;
        }
        KeyCode::Down | KeyCode::Tab => viewer.move_item(1),
        KeyCode::Up | KeyCode::BackTab => viewer.move_item(-1),
        KeyCode::Left => viewer.move_option(-1),
        KeyCode::Right => viewer.move_option(1),
        KeyCode::Backspace if typing => viewer.backspace(),
        KeyCode::Backspace => {
            if matches!(viewer.body, UnitBody::Matching { .. }) {
                viewer.sheet.unassign(viewer.item);
            }
        }
        KeyCode::Enter => {
            if let Some(cmd) = viewer.completion(now) {
                app.send(cmd);
                return;
            }
            match viewer.submit() {
                Ok(score) => app.set_status(format!("Score: {score}%  (Enter to complete, r to retry)")),
                Err(e) => app.set_warning(e.to_string()),
            }
        }
        KeyCode::Char(c) if typing => viewer.type_char(c),
        KeyCode::Char(' ') => viewer.select(),
        KeyCode::Char('j') => viewer.move_item(1),
        KeyCode::Char('k') => viewer.move_item(-1),
        KeyCode::Char('h') => viewer.move_option(-1),
        KeyCode::Char('l') => viewer.move_option(1),
        KeyCode::Char('r') if viewer.sheet.is_submitted() => viewer.retry(),
        KeyCode::Char('q') => {
            app.unit = None;
            app.overlay = Overlay::None;
        }
        _ => {}
    }
}

fn handle_gamification_overlay(app: &mut AppState, key: KeyEvent) {
    let g = &mut app.gamification;
    let len = match g.tab {
        GamificationTab::Achievements => g.achievements.len(),
        GamificationTab::Badges => g.badges.len(),
        GamificationTab::Leaderboard => g.leaderboard.len(),
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('g') => app.overlay = Overlay::None,
        KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => {
            g.tab = g.tab.next();
            g.scroll = 0;
        }
        KeyCode::Char('h') | KeyCode::Left => {
            g.tab = g.tab.next().next();
            g.scroll = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => step(&mut g.scroll, len, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut g.scroll, len, false),
        _ => {}
    }
}

fn handle_notifications_overlay(app: &mut AppState, key: KeyEvent) {
    let selected = app
        .notifications
        .items()
        .get(app.notification_cursor)
        .map(|n| (n.id.clone(), n.read));
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('N') => app.overlay = Overlay::None,
        KeyCode::Char('j') | KeyCode::Down => {
            step(&mut app.notification_cursor, app.notifications.len(), true)
        }
        KeyCode::Char('k') | KeyCode::Up => {
            step(&mut app.notification_cursor, app.notifications.len(), false)
        }
        KeyCode::Char('r') | KeyCode::Enter => {
            if let Some((id, false)) = selected {
                app.send(WorkerCommand::MarkNotificationRead(id));
            }
        }
        KeyCode::Char('d') => {
            if let Some((id, _)) = selected {
                app.send(WorkerCommand::DeleteNotification(id));
            }
        }
        _ => {}
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

fn handle_dashboard_key(app: &mut AppState, key: KeyEvent) {
    let len = app.dashboard.filtered().len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.dashboard.cursor, len, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.dashboard.cursor, len, false),
        KeyCode::Enter => app.dashboard.expanded = !app.dashboard.expanded,
        KeyCode::Char('/') => app.begin_edit(EditTarget::LogFilter),
        KeyCode::Esc => {
            app.dashboard.filter.clear();
            app.dashboard.cursor = 0;
        }
        KeyCode::Char('n') => app.open_new_order(None),
        KeyCode::Char('x') => {
            let csv = export::order_logs_csv(&app.dashboard.filtered());
            match csv {
                Ok(Some(csv)) => export_result(app, "order_logs", Ok(csv)),
                Ok(None) => app.set_warning("No order logs to export"),
                Err(e) => export_result(app, "order_logs", Err(e)),
            }
        }
        _ => {}
    }
}

fn handle_backtest_key(app: &mut AppState, key: KeyEvent) {
    let rows = app.backtest.row_count();
    let row = app.backtest.row();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.backtest.cursor, rows, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.backtest.cursor, rows, false),
        KeyCode::Char('h') | KeyCode::Left => adjust_backtest(app, row, -1),
        KeyCode::Char('l') | KeyCode::Right => adjust_backtest(app, row, 1),
        KeyCode::Enter => match row {
            BacktestRow::Symbol => app.begin_edit(EditTarget::BacktestSymbol),
            BacktestRow::From => app.begin_edit(EditTarget::BacktestFrom),
            BacktestRow::To => app.begin_edit(EditTarget::BacktestTo),
            BacktestRow::Strategy | BacktestRow::Param(_) => adjust_backtest(app, row, 1),
        },
        KeyCode::Char('d') => {
            let kind = app.backtest.form.strategy();
            app.backtest.select_strategy(kind);
            app.set_status("Parameters reset to defaults");
        }
        KeyCode::Char('g') => match app.backtest.form.to_request() {
            Ok(req) => {
                app.set_status(format!("Running {} on {}...", req.strategy, req.symbol));
                app.send(WorkerCommand::RunBacktest(req));
            }
            Err(e) => app.push_api_error(&e, "backtest form"),
        },
        KeyCode::Char('x') => match &app.backtest.result {
            Some(result) => {
                let csv = export::backtest_csv(result);
                export_result(app, "backtest", csv);
            }
            None => app.set_warning("Run a backtest first"),
        },
        _ => {}
    }
}

fn adjust_backtest(app: &mut AppState, row: BacktestRow, direction: i32) {
    match row {
        BacktestRow::Strategy => {
            let next = app.backtest.form.strategy().cycle(direction);
            app.backtest.select_strategy(next);
        }
        BacktestRow::Param(i) => {
            let Some(spec) = app.backtest.form.strategy().def().params.get(i) else {
                return;
            };
            if let Err(e) = app.backtest.form.nudge(spec.name, direction) {
                app.push_api_error(&e, "backtest form");
            }
        }
        _ => {}
    }
}

fn handle_portfolio_key(app: &mut AppState, key: KeyEvent) {
    let len = app.portfolio.positions.len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.portfolio.cursor, len, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.portfolio.cursor, len, false),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('l') | KeyCode::Right => {
            let n = HISTORY_PERIODS.len();
            let back = matches!(key.code, KeyCode::Char('h') | KeyCode::Left);
            app.portfolio.period = (app.portfolio.period + if back { n - 1 } else { 1 }) % n;
            app.refresh();
        }
        KeyCode::Char('n') => {
            let symbol = app
                .portfolio
                .positions
                .get(app.portfolio.cursor)
                .map(|p| p.symbol.clone());
            app.open_new_order(symbol.as_deref());
        }
        _ => {}
    }
}

fn handle_orders_key(app: &mut AppState, key: KeyEvent) {
    let len = app.orders.orders.len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.orders.cursor, len, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.orders.cursor, len, false),
        KeyCode::Char('n') => {
            let symbol = app
                .orders
                .orders
                .get(app.orders.cursor)
                .map(|o| o.symbol.clone());
            app.open_new_order(symbol.as_deref());
        }
        KeyCode::Char('c') => {
            let Some(order) = app.orders.orders.get(app.orders.cursor) else {
                return;
            };
            let (id, symbol, status) = (order.id.clone(), order.symbol.clone(), order.status.clone());
            if order.status_class() == OrderStatus::Open {
                app.set_status(format!("Cancelling {symbol}..."));
                app.send(WorkerCommand::CancelOrder(id));
            } else {
                app.set_warning(format!("Order is {status} and cannot be cancelled"));
            }
        }
        _ => {}
    }
}

fn handle_history_key(app: &mut AppState, key: KeyEvent) {
    let len = app.history.len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.history.cursor, len, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.history.cursor, len, false),
        KeyCode::Char('h') | KeyCode::Char('l') | KeyCode::Left | KeyCode::Right | KeyCode::Char('v') => {
            app.history.view = match app.history.view {
                HistoryView::Orders => HistoryView::Activities,
                HistoryView::Activities => HistoryView::Orders,
            };
            app.history.cursor = 0;
        }
        _ => {}
    }
}

fn handle_replay_key(app: &mut AppState, key: KeyEvent, now: Instant) {
    let loaded = !app.replay.set.is_empty();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.replay.cursor, ReplayState::ROWS, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.replay.cursor, ReplayState::ROWS, false),
        KeyCode::Char('s') => app.replay.strategy = app.replay.strategy.cycle(1),
        KeyCode::Char('S') => app.replay.strategy = app.replay.strategy.cycle(-1),
        KeyCode::Enter => match app.replay.cursor {
            0 => app.replay.strategy = app.replay.strategy.cycle(1),
            1 => app.begin_edit(EditTarget::ReplaySymbols),
            2 => app.begin_edit(EditTarget::ReplayFrom),
            _ => app.begin_edit(EditTarget::ReplayTo),
        },
        KeyCode::Char('g') => match app.replay.request() {
            Ok(cmd) => {
                app.set_status("Loading replay...");
                app.send(cmd);
            }
            Err(e) => app.push_api_error(&e, "replay form"),
        },
        KeyCode::Char(' ') if loaded => app.replay.toggle_play(now),
        KeyCode::Char('h') | KeyCode::Left if loaded => app.replay.stepper.step_by(-1),
        KeyCode::Char('l') | KeyCode::Right if loaded => app.replay.stepper.step_by(1),
        KeyCode::Home if loaded => app.replay.stepper.jump_to_start(),
        KeyCode::End if loaded => app.replay.stepper.jump_to_end(),
        KeyCode::Char('x') => {
            if app.replay.set.loaded().next().is_none() {
                app.set_warning("Nothing to export");
            } else {
                let csv = export::replay_csv(&app.replay.set);
                export_result(app, "portfolio_replay", csv);
            }
        }
        _ => {}
    }
}

fn handle_compare_key(app: &mut AppState, key: KeyEvent) {
    let cursor = app.compare.cursor;
    let toggle_or_cycle = |app: &mut AppState, direction: i32| match cursor {
        0 => app.compare.strategy = app.compare.strategy.cycle(direction),
        6 => app.compare.include_news = !app.compare.include_news,
        _ => {}
    };
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.compare.cursor, CompareState::ROWS, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.compare.cursor, CompareState::ROWS, false),
        KeyCode::Char('h') | KeyCode::Left => toggle_or_cycle(app, -1),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Char(' ') => toggle_or_cycle(app, 1),
        KeyCode::Enter => match cursor {
            1..=5 => app.begin_edit(EditTarget::CompareField(cursor - 1)),
            _ => toggle_or_cycle(app, 1),
        },
        KeyCode::Char('g') => match app.compare.request() {
            Ok(req) => {
                app.set_status(format!("Comparing periods for {}...", req.symbol));
                app.compare.request = Some(req.clone());
                app.send(WorkerCommand::RunComparison(req));
            }
            Err(e) => app.push_api_error(&e, "comparison form"),
        },
        _ => {}
    }
}

fn handle_training_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('g') => {
            app.overlay = Overlay::Gamification;
            app.send(WorkerCommand::LoadGamification);
            return;
        }
        KeyCode::Char('R') => {
            app.overlay = Overlay::ConfirmReset;
            return;
        }
        _ => {}
    }

    if let Some(module) = &app.training.module {
        let len = module.units.len();
        let unit_id = module.units.get(app.training.unit_cursor).map(|u| u.id.clone());
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => step(&mut app.training.unit_cursor, len, true),
            KeyCode::Char('k') | KeyCode::Up => step(&mut app.training.unit_cursor, len, false),
            KeyCode::Enter | KeyCode::Char('l') => {
                if let Some(id) = unit_id {
                    app.send(WorkerCommand::OpenUnit(id));
                }
            }
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') => {
                app.training.module = None;
            }
            _ => {}
        }
        return;
    }

    let len = app.training.modules.len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.training.cursor, len, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.training.cursor, len, false),
        KeyCode::Enter | KeyCode::Char('l') => {
            let Some(module) = app.training.modules.get(app.training.cursor) else {
                return;
            };
            let (id, title) = (module.id.clone(), module.title.clone());
            if module.is_unlocked {
                app.send(WorkerCommand::LoadModule(id));
            } else {
                app.set_warning(format!("\"{title}\" is locked"));
            }
        }
        _ => {}
    }
}

fn handle_settings_key(app: &mut AppState, key: KeyEvent) {
    let cursor = app.settings.cursor;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => step(&mut app.settings.cursor, SettingsState::ROWS, true),
        KeyCode::Char('k') | KeyCode::Up => step(&mut app.settings.cursor, SettingsState::ROWS, false),
        KeyCode::Char('h') | KeyCode::Char('l') | KeyCode::Left | KeyCode::Right if cursor == 0 => {
            toggle_env(&mut app.settings)
        }
        KeyCode::Enter => match cursor {
            0 => toggle_env(&mut app.settings),
            i => app.begin_edit(EditTarget::ApiKey(i - 1)),
        },
        KeyCode::Char('v') => app.settings.show_keys = !app.settings.show_keys,
        KeyCode::Char('s') => {
            let keys = app.settings.keys();
            app.settings.errors = validate_keys(&keys);
            if app.settings.errors.is_empty() {
                app.set_status("Saving API keys...");
                app.send(WorkerCommand::UpdateKeys(keys));
            } else {
                app.set_warning("Enter both keys for the selected environment");
            }
        }
        KeyCode::Char('D') => {
            app.set_status("Removing API keys...");
            app.send(WorkerCommand::RemoveKeys);
        }
        KeyCode::Char('L') => app.logout(),
        _ => {}
    }
}

fn toggle_env(settings: &mut SettingsState) {
    settings.env = match settings.env {
        AlpacaEnv::Paper => AlpacaEnv::Live,
        AlpacaEnv::Live => AlpacaEnv::Paper,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use tradedash_core::domain::{Order, User};
    use tradedash_core::{Session, SessionStore};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn logged_in_app(dir: &std::path::Path) -> (AppState, mpsc::Receiver<WorkerCommand>) {
        let (tx, rx) = mpsc::channel();
        let (_resp_tx, resp_rx) = mpsc::channel();
        let mut session = SessionStore::open(dir.join("session.json"));
        session
            .store(Session {
                token: "tok".into(),
                user: User {
                    id: "u1".into(),
                    name: "Ada".into(),
                    email: "ada@example.com".into(),
                    alpaca_env: None,
                    has_alpaca_keys: false,
                },
            })
            .unwrap();
        let app = AppState::new(tx, resp_rx, session, dir.join("exports"), Instant::now());
        (app, rx)
    }

    #[test]
    fn digits_switch_panels_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, rx) = logged_in_app(dir.path());
        handle_key(&mut app, press(KeyCode::Char('4')), Instant::now());
        assert_eq!(app.active_panel, Panel::Orders);
        assert!(matches!(rx.try_recv(), Ok(WorkerCommand::LoadOrders)));

        handle_key(&mut app, press(KeyCode::Char('0')), Instant::now());
        assert_eq!(app.active_panel, Panel::Help);
        handle_key(&mut app, press(KeyCode::Tab), Instant::now());
        assert_eq!(app.active_panel, Panel::Dashboard);
    }

    #[test]
    fn edits_suppress_global_keys() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = logged_in_app(dir.path());
        app.active_panel = Panel::Backtest;
        app.backtest.cursor = 1;
        handle_key(&mut app, press(KeyCode::Enter), Instant::now());
        assert!(app.edit.is_some());

        for _ in 0..4 {
            handle_key(&mut app, press(KeyCode::Backspace), Instant::now());
        }
        for c in "qqq".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)), Instant::now());
        }
        assert!(app.running);
        handle_key(&mut app, press(KeyCode::Enter), Instant::now());
        assert_eq!(app.backtest.form.symbol, "QQQ");
        assert!(app.edit.is_none());
    }

    #[test]
    fn ctrl_v_opens_verify_and_submits_token() {
        let (tx, rx) = mpsc::channel();
        let (_resp_tx, resp_rx) = mpsc::channel();
        let dir = tempfile::tempdir().unwrap();
        let session = SessionStore::open(dir.path().join("session.json"));
        let mut app = AppState::new(tx, resp_rx, session, dir.path().into(), Instant::now());

        let ctrl_v = KeyEvent::new(KeyCode::Char('v'), KeyModifiers::CONTROL);
        handle_key(&mut app, ctrl_v, Instant::now());
        assert_eq!(app.auth.screen, AuthScreen::Verify);

        for c in "tok-42".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)), Instant::now());
        }
        handle_key(&mut app, press(KeyCode::Enter), Instant::now());
        match rx.try_recv() {
            Ok(WorkerCommand::VerifyEmail { token }) => assert_eq!(token, "tok-42"),
            other => panic!("expected verify, got {other:?}"),
        }

        handle_key(&mut app, press(KeyCode::Esc), Instant::now());
        assert_eq!(app.auth.screen, AuthScreen::Login);
        assert!(app.running);
    }

    #[test]
    fn login_screen_collects_and_submits() {
        let (tx, rx) = mpsc::channel();
        let (_resp_tx, resp_rx) = mpsc::channel();
        let dir = tempfile::tempdir().unwrap();
        let session = SessionStore::open(dir.path().join("session.json"));
        let mut app = AppState::new(tx, resp_rx, session, dir.path().into(), Instant::now());
        assert_eq!(app.overlay, Overlay::Auth);

        for c in "a@b.co".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)), Instant::now());
        }
        handle_key(&mut app, press(KeyCode::Enter), Instant::now());
        for c in "secret1".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)), Instant::now());
        }
        handle_key(&mut app, press(KeyCode::Enter), Instant::now());

        match rx.try_recv() {
            Ok(WorkerCommand::Login { email, password }) => {
                assert_eq!(email, "a@b.co");
                assert_eq!(password, "secret1");
            }
            other => panic!("expected login, got {other:?}"),
        }
        assert_eq!(app.in_flight, 1);
    }

    #[test]
    fn cancel_only_open_orders() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, rx) = logged_in_app(dir.path());
        app.active_panel = Panel::Orders;
        let order = |id: &str, status: &str| Order {
            id: id.into(),
            symbol: "AAPL".into(),
            qty: 1.0,
            kind: "market".into(),
            side: Some("buy".into()),
            status: status.into(),
            created_at: None,
            filled_avg_price: None,
        };
        app.orders.orders = vec![order("o1", "filled"), order("o2", "new")];

        handle_key(&mut app, press(KeyCode::Char('c')), Instant::now());
        assert!(rx.try_recv().is_err());

        handle_key(&mut app, press(KeyCode::Char('j')), Instant::now());
        handle_key(&mut app, press(KeyCode::Char('c')), Instant::now());
        assert!(matches!(rx.try_recv(), Ok(WorkerCommand::CancelOrder(id)) if id == "o2"));
    }

    #[test]
    fn settings_save_requires_selected_env_keys() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, rx) = logged_in_app(dir.path());
        app.active_panel = Panel::Settings;
        handle_key(&mut app, press(KeyCode::Char('s')), Instant::now());
        assert!(!app.settings.errors.is_empty());
        assert!(rx.try_recv().is_err());

        app.settings.keys.set(0, "PK");
        app.settings.keys.set(1, "SK");
        handle_key(&mut app, press(KeyCode::Char('s')), Instant::now());
        assert!(matches!(rx.try_recv(), Ok(WorkerCommand::UpdateKeys(_))));
    }

    #[test]
    fn reset_needs_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, rx) = logged_in_app(dir.path());
        app.active_panel = Panel::Training;
        handle_key(&mut app, press(KeyCode::Char('R')), Instant::now());
        assert_eq!(app.overlay, Overlay::ConfirmReset);
        handle_key(&mut app, press(KeyCode::Char('n')), Instant::now());
        assert_eq!(app.overlay, Overlay::None);
        assert!(rx.try_recv().is_err());

        handle_key(&mut app, press(KeyCode::Char('R')), Instant::now());
        handle_key(&mut app, press(KeyCode::Char('y')), Instant::now());
        assert!(matches!(rx.try_recv(), Ok(WorkerCommand::ResetProgress)));
    }
}
