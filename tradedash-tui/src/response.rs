//! Applying worker responses to the app state.

use std::time::Instant;

use tracing::{info, warn};

use tradedash_core::{ApiError, Session};

use crate::app::{AppState, AuthScreen, Overlay, StatusLevel, UnitViewer};
use crate::worker::{PartFailure, WorkerCommand, WorkerResponse};

/// Contexts whose failures are shown on the login screen rather than
/// treated as an expired session.
const AUTH_CONTEXTS: [&str; 5] = [
    "login",
    "register",
    "forgot password",
    "reset password",
    "verify email",
];

pub fn handle_worker_response(app: &mut AppState, resp: WorkerResponse, now: Instant) {
    if !matches!(resp, WorkerResponse::Polled(_)) {
        app.in_flight = app.in_flight.saturating_sub(1);
    }

    match resp {
        WorkerResponse::LoggedIn(auth) => {
            info!(user = %auth.user.email, "logged in");
            if let Err(e) = app.session.store(Session {
                token: auth.token,
                user: auth.user,
            }) {
                // Still logged in for this run; only persistence failed.
                app.push_api_error(&e, "session");
            }
            app.on_login(now);
        }
        WorkerResponse::AuthMessage(message) => {
            let next = match app.auth.screen {
                AuthScreen::Register | AuthScreen::Reset | AuthScreen::Verify => AuthScreen::Login,
                other => other,
            };
            app.auth.switch(next);
            app.auth.message = Some((message.clone(), StatusLevel::Info));
            app.set_status(message);
        }
        WorkerResponse::Dashboard {
            account,
            positions,
            logs,
            failures,
        } => {
            if account.is_some() {
                app.dashboard.account = account;
            }
            if let Some(positions) = positions {
                app.dashboard.positions = positions;
            }
            if let Some(logs) = logs {
                app.dashboard.logs = logs;
            }
            let len = app.dashboard.filtered().len();
            app.dashboard.cursor = app.dashboard.cursor.min(len.saturating_sub(1));
            handle_part_failures(app, failures);
        }
        WorkerResponse::Portfolio {
            account,
            positions,
            history,
            failures,
        } => {
            if account.is_some() {
                app.portfolio.account = account;
            }
            if let Some(positions) = positions {
                app.portfolio.cursor = app.portfolio.cursor.min(positions.len().saturating_sub(1));
                app.portfolio.positions = positions;
            }
            if history.is_some() {
                app.portfolio.history = history;
            }
            handle_part_failures(app, failures);
        }
        WorkerResponse::Orders(orders) => {
            app.orders.cursor = app.orders.cursor.min(orders.len().saturating_sub(1));
            app.orders.orders = orders;
        }
        WorkerResponse::OrderLogs(logs) => {
            app.dashboard.logs = logs;
        }
        WorkerResponse::OrderPlaced(order) => {
            app.overlay = Overlay::None;
            app.set_status(format!(
                "Order placed: {} {} {} ({})",
                order.side.as_deref().unwrap_or("").to_uppercase(),
                order.qty,
                order.symbol,
                order.status
            ));
            app.refresh();
        }
        WorkerResponse::OrderCancelled { id, message } => {
            app.orders.orders.retain(|o| o.id != id);
            app.orders.cursor = app
                .orders
                .cursor
                .min(app.orders.orders.len().saturating_sub(1));
            app.set_status(message.unwrap_or_else(|| "Order cancelled".into()));
        }
        WorkerResponse::History { items, activities } => {
            app.history.items = items;
            app.history.activities = activities;
            app.history.cursor = app.history.cursor.min(app.history.len().saturating_sub(1));
        }
        WorkerResponse::Symbols(symbols) => {
            app.symbols = symbols;
        }
        WorkerResponse::Backtest(result) => {
            let status = match result.total_return() {
                Some(r) => format!("Backtest complete: {:+.2}% total return", r * 100.0),
                None => "Backtest complete".to_string(),
            };
            app.backtest.result = Some(*result);
            app.set_status(status);
        }
        WorkerResponse::Comparison(result) => {
            app.compare.result = Some(*result);
            app.set_status("Comparison complete");
        }
        WorkerResponse::Replay(set) => {
            let failed: Vec<String> = set
                .entries()
                .iter()
                .filter_map(|(symbol, r)| r.as_ref().err().map(|e| format!("{symbol}: {e}")))
                .collect();
            app.replay.load(set);
            if failed.is_empty() {
                app.set_status("Replay loaded");
            } else {
                app.set_warning(format!("Replay failed for {}", failed.join("; ")));
            }
        }
        WorkerResponse::Notifications(items) | WorkerResponse::Polled(Ok(items)) => {
            let before = app.notifications.unread_count();
            app.notifications.replace(items);
            app.notification_cursor = app
                .notification_cursor
                .min(app.notifications.len().saturating_sub(1));
            let after = app.notifications.unread_count();
            if after > before {
                app.set_status(format!("{after} unread notification(s)"));
            }
        }
        WorkerResponse::Polled(Err(error)) => {
            handle_failure(app, "notification poll", error);
        }
        WorkerResponse::NotificationRead(id) => {
            app.notifications.mark_read(&id);
        }
        WorkerResponse::NotificationDeleted(id) => {
            app.notifications.remove(&id);
            app.notification_cursor = app
                .notification_cursor
                .min(app.notifications.len().saturating_sub(1));
        }
        WorkerResponse::Training { modules, progress } => {
            app.training.cursor = app.training.cursor.min(modules.len().saturating_sub(1));
            app.training.modules = modules;
            app.training.progress = Some(progress);
        }
        WorkerResponse::ModuleLoaded(module) => {
            app.training.module = Some(*module);
            app.training.unit_cursor = 0;
        }
        WorkerResponse::UnitLoaded(unit) => {
            app.unit = Some(UnitViewer::new(*unit, now));
            app.overlay = Overlay::Unit;
        }
        WorkerResponse::UnitCompleted { id, tokens } => {
            if let Some(module) = app.training.module.as_mut() {
                if let Some(unit) = module.units.iter_mut().find(|u| u.id == id) {
                    unit.is_completed = true;
                }
            }
            if app.unit.as_ref().is_some_and(|v| v.unit.id == id) {
                app.unit = None;
                if app.overlay == Overlay::Unit {
                    app.overlay = Overlay::None;
                }
            }
            app.set_status(format!("Unit completed! +{tokens} tokens"));
            app.send(WorkerCommand::LoadTraining);
        }
        WorkerResponse::ProgressReset => {
            app.training.module = None;
            app.training.unit_cursor = 0;
            app.set_status("Training progress reset");
            app.send(WorkerCommand::LoadTraining);
        }
        WorkerResponse::Gamification {
            achievements,
            badges,
            leaderboard,
        } => {
            app.gamification.achievements = achievements;
            app.gamification.badges = badges;
            app.gamification.leaderboard = leaderboard;
            app.gamification.scroll = 0;
        }
        WorkerResponse::KeysUpdated(resp) => {
            if !resp.success {
                let message = resp.error.unwrap_or_else(|| "Failed to update API keys".into());
                app.push_error(
                    crate::app::ErrorCategory::Server,
                    message,
                    "api keys".into(),
                );
                return;
            }
            if let Some(user) = resp.user {
                app.settings.sync_user(&user);
                if let Err(e) = app.session.update_user(user) {
                    app.push_api_error(&e, "session");
                }
            }
            app.settings.keys.clear();
            app.set_status("API keys updated");
        }
        WorkerResponse::Failed { context, error } => handle_failure(app, context, error),
    }
}

/// Report each failed part of a load; stop once one of them ends the session.
fn handle_part_failures(app: &mut AppState, failures: Vec<PartFailure>) {
    for PartFailure { context, error } in failures {
        handle_failure(app, context, error);
        if !app.is_logged_in() {
            break;
        }
    }
}

fn handle_failure(app: &mut AppState, context: &'static str, error: ApiError) {
    if AUTH_CONTEXTS.contains(&context) {
        app.auth.message = Some((error.to_string(), StatusLevel::Error));
        app.push_api_error(&error, context);
        return;
    }
    if app.session.handle_auth_error(&error) {
        warn!(context, "session rejected by server");
        app.expire_session();
        return;
    }
    app.push_api_error(&error, context);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use tradedash_core::domain::{AuthResponse, Notification, User};
    use tradedash_core::SessionStore;

    use crate::app::Panel;

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            alpaca_env: None,
            has_alpaca_keys: false,
        }
    }

    fn app(dir: &std::path::Path) -> (AppState, mpsc::Receiver<WorkerCommand>) {
        let (tx, rx) = mpsc::channel();
        let (_resp_tx, resp_rx) = mpsc::channel();
        let session = SessionStore::open(dir.join("session.json"));
        let app = AppState::new(tx, resp_rx, session, dir.to_path_buf(), Instant::now());
        (app, rx)
    }

    fn log_in(app: &mut AppState) {
        handle_worker_response(
            app,
            WorkerResponse::LoggedIn(AuthResponse {
                token: "tok".into(),
                user: user(),
            }),
            Instant::now(),
        );
    }

    #[test]
    fn login_stores_session_and_shows_welcome() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, rx) = app(dir.path());
        app.in_flight = 1;
        log_in(&mut app);

        assert!(app.is_logged_in());
        assert!(dir.path().join("session.json").exists());
        assert_eq!(app.overlay, Overlay::Welcome);
        let sent: Vec<_> = rx.try_iter().collect();
        assert!(sent
            .iter()
            .any(|c| matches!(c, WorkerCommand::LoadNotifications)));
        assert!(sent.iter().any(|c| matches!(c, WorkerCommand::LoadDashboard)));
    }

    #[test]
    fn auth_failure_expires_session() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, rx) = app(dir.path());
        log_in(&mut app);
        app.active_panel = Panel::Orders;

        handle_worker_response(
            &mut app,
            WorkerResponse::Failed {
                context: "orders",
                error: ApiError::Unauthorized("Invalid token".into()),
            },
            Instant::now(),
        );

        assert!(!app.is_logged_in());
        assert_eq!(app.overlay, Overlay::Auth);
        assert!(!dir.path().join("session.json").exists());
        let message = app.auth.message.as_ref().map(|(m, _)| m.as_str());
        assert_eq!(message, Some(tradedash_core::SESSION_EXPIRED));
        assert!(rx
            .try_iter()
            .any(|c| matches!(c, WorkerCommand::SetToken(None))));
    }

    #[test]
    fn failed_login_stays_on_login_screen() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = app(dir.path());
        handle_worker_response(
            &mut app,
            WorkerResponse::Failed {
                context: "login",
                error: ApiError::Unauthorized("Invalid credentials".into()),
            },
            Instant::now(),
        );
        assert_eq!(app.overlay, Overlay::Auth);
        let (message, level) = app.auth.message.clone().unwrap();
        assert!(message.contains("Invalid credentials"));
        assert_eq!(level, StatusLevel::Error);
        assert_eq!(app.error_history.len(), 1);
    }

    #[test]
    fn other_failures_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = app(dir.path());
        log_in(&mut app);
        handle_worker_response(
            &mut app,
            WorkerResponse::Failed {
                context: "backtest",
                error: ApiError::Http {
                    status: 500,
                    message: "Strategy exploded".into(),
                },
            },
            Instant::now(),
        );
        assert!(app.is_logged_in());
        assert_eq!(app.error_history[0].context, "backtest");
        assert_eq!(app.error_history[0].category, crate::app::ErrorCategory::Server);
    }

    #[test]
    fn dashboard_keeps_parts_that_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = app(dir.path());
        log_in(&mut app);
        let log: tradedash_core::domain::OrderLog = serde_json::from_value(serde_json::json!({
            "id": 1, "symbol": "AAPL", "side": "buy", "qty": 2, "status": "filled"
        }))
        .unwrap();

        handle_worker_response(
            &mut app,
            WorkerResponse::Dashboard {
                account: None,
                positions: Some(Vec::new()),
                logs: Some(vec![log]),
                failures: vec![PartFailure {
                    context: "portfolio",
                    error: ApiError::Http {
                        status: 400,
                        message: "Alpaca API keys not configured".into(),
                    },
                }],
            },
            Instant::now(),
        );

        assert!(app.is_logged_in());
        assert!(app.dashboard.account.is_none());
        assert_eq!(app.dashboard.logs.len(), 1);
        assert_eq!(app.error_history.len(), 1);
        assert_eq!(app.error_history[0].context, "portfolio");
    }

    #[test]
    fn rejected_part_expires_session_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = app(dir.path());
        log_in(&mut app);
        let rejected = || ApiError::Unauthorized("Invalid token".into());

        handle_worker_response(
            &mut app,
            WorkerResponse::Portfolio {
                account: None,
                positions: None,
                history: None,
                failures: vec![
                    PartFailure { context: "portfolio", error: rejected() },
                    PartFailure { context: "positions", error: rejected() },
                ],
            },
            Instant::now(),
        );

        assert!(!app.is_logged_in());
        assert_eq!(app.overlay, Overlay::Auth);
        assert!(app.error_history.is_empty());
    }

    #[test]
    fn polls_do_not_touch_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = app(dir.path());
        app.in_flight = 1;
        let n = Notification {
            id: "n1".into(),
            kind: Some("order_filled".into()),
            message: "AAPL filled".into(),
            read: false,
            created_at: None,
        };
        handle_worker_response(&mut app, WorkerResponse::Polled(Ok(vec![n])), Instant::now());
        assert_eq!(app.in_flight, 1);
        assert_eq!(app.notifications.unread_count(), 1);

        handle_worker_response(
            &mut app,
            WorkerResponse::NotificationRead("n1".into()),
            Instant::now(),
        );
        assert_eq!(app.in_flight, 0);
        assert_eq!(app.notifications.unread_count(), 0);
    }

    #[test]
    fn register_message_returns_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = app(dir.path());
        app.auth.switch(AuthScreen::Register);
        handle_worker_response(
            &mut app,
            WorkerResponse::AuthMessage("Check your email".into()),
            Instant::now(),
        );
        assert_eq!(app.auth.screen, AuthScreen::Login);
        assert_eq!(
            app.auth.message,
            Some(("Check your email".to_string(), StatusLevel::Info))
        );
    }
}
