//! Background worker thread: every API call runs here.
//!
//! The draw loop sends a [`WorkerCommand`] and picks up the matching
//! [`WorkerResponse`] on a later frame. Requests run one at a time in
//! arrival order and are never cancelled.

use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::NaiveDate;
use tracing::debug;

use tradedash_core::api::HistoryQuery;
use tradedash_core::domain::{
    Account, Achievement, Activity, AlpacaKeys, AuthResponse, Badge, BacktestRequest,
    BacktestResult, ComparisonRequest, ComparisonResult, HistoryItem, KeysResponse,
    LeaderboardEntry, Module, ModuleSummary, Notification, Order, OrderLog, OrderRequest,
    PortfolioHistory, Position, SymbolInfo, Unit, UnitProgressUpdate, UserProgress,
};
use tradedash_core::notifications::poll_cycle;
use tradedash_core::replay::ReplaySet;
use tradedash_core::{ApiClient, ApiError};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Install or clear the bearer token on the worker's client.
    SetToken(Option<String>),
    Login {
        email: String,
        password: String,
    },
    Register {
        name: String,
        email: String,
        password: String,
    },
    ForgotPassword {
        email: String,
    },
    ResetPassword {
        token: String,
        password: String,
    },
    VerifyEmail {
        token: String,
    },
    LoadDashboard,
    LoadPortfolio {
        query: HistoryQuery,
    },
    LoadOrders,
    LoadOrderLogs,
    PlaceOrder(OrderRequest),
    CancelOrder(String),
    LoadHistory,
    LoadSymbols,
    RunBacktest(BacktestRequest),
    RunComparison(ComparisonRequest),
    LoadReplay {
        strategy: String,
        symbols: Vec<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    LoadNotifications,
    PollNotifications,
    MarkNotificationRead(String),
    DeleteNotification(String),
    LoadTraining,
    LoadModule(String),
    OpenUnit(String),
    CompleteUnit {
        id: String,
        update: UnitProgressUpdate,
    },
    ResetProgress,
    LoadGamification,
    UpdateKeys(AlpacaKeys),
    RemoveKeys,
    Shutdown,
}

/// Responses sent from the worker back to the UI.
#[derive(Debug)]
pub enum WorkerResponse {
    LoggedIn(AuthResponse),
    /// Success text from register / forgot / reset.
    AuthMessage(String),
    /// Each part is fetched on its own; parts that failed are `None` and
    /// listed in `failures`.
    Dashboard {
        account: Option<Account>,
        positions: Option<Vec<Position>>,
        logs: Option<Vec<OrderLog>>,
        failures: Vec<PartFailure>,
    },
    Portfolio {
        account: Option<Account>,
        positions: Option<Vec<Position>>,
        history: Option<PortfolioHistory>,
        failures: Vec<PartFailure>,
    },
    Orders(Vec<Order>),
    OrderLogs(Vec<OrderLog>),
    OrderPlaced(Order),
    OrderCancelled {
        id: String,
        message: Option<String>,
    },
    History {
        items: Vec<HistoryItem>,
        activities: Vec<Activity>,
    },
    Symbols(Vec<SymbolInfo>),
    Backtest(Box<BacktestResult>),
    Comparison(Box<ComparisonResult>),
    Replay(ReplaySet),
    Notifications(Vec<Notification>),
    /// Result of a background poll. Not paired with a counted request.
    Polled(Result<Vec<Notification>, ApiError>),
    NotificationRead(String),
    NotificationDeleted(String),
    Training {
        modules: Vec<ModuleSummary>,
        progress: UserProgress,
    },
    ModuleLoaded(Box<Module>),
    UnitLoaded(Box<Unit>),
    UnitCompleted {
        id: String,
        tokens: u32,
    },
    ProgressReset,
    Gamification {
        achievements: Vec<Achievement>,
        badges: Vec<Badge>,
        leaderboard: Vec<LeaderboardEntry>,
    },
    KeysUpdated(KeysResponse),
    Failed {
        context: &'static str,
        error: ApiError,
    },
}

/// One failed request inside a multi-request load.
#[derive(Debug)]
pub struct PartFailure {
    pub context: &'static str,
    pub error: ApiError,
}

/// Keep the value of one part of a load, or record why it is missing.
fn part<T>(
    failures: &mut Vec<PartFailure>,
    context: &'static str,
    result: Result<T, ApiError>,
) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(error) => {
            failures.push(PartFailure { context, error });
            None
        }
    }
}

/// Spawn the background worker thread. It owns its own client.
pub fn spawn_worker(
    client: ApiClient,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tradedash-worker".into())
        .spawn(move || worker_loop(client, rx, tx))
}

fn worker_loop(mut client: ApiClient, rx: Receiver<WorkerCommand>, tx: Sender<WorkerResponse>) {
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::SetToken(token)) => client.set_token(token),
            Ok(cmd) => {
                debug!(command = cmd_name(&cmd), "worker command");
                if let Some(resp) = handle_command(&mut client, cmd) {
                    if tx.send(resp).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

fn cmd_name(cmd: &WorkerCommand) -> &'static str {
    match cmd {
        WorkerCommand::SetToken(_) => "set_token",
        WorkerCommand::Login { .. } => "login",
        WorkerCommand::Register { .. } => "register",
        WorkerCommand::ForgotPassword { .. } => "forgot_password",
        WorkerCommand::ResetPassword { .. } => "reset_password",
        WorkerCommand::VerifyEmail { .. } => "verify_email",
        WorkerCommand::LoadDashboard => "load_dashboard",
        WorkerCommand::LoadPortfolio { .. } => "load_portfolio",
        WorkerCommand::LoadOrders => "load_orders",
        WorkerCommand::LoadOrderLogs => "load_order_logs",
        WorkerCommand::PlaceOrder(_) => "place_order",
        WorkerCommand::CancelOrder(_) => "cancel_order",
        WorkerCommand::LoadHistory => "load_history",
        WorkerCommand::LoadSymbols => "load_symbols",
        WorkerCommand::RunBacktest(_) => "run_backtest",
        WorkerCommand::RunComparison(_) => "run_comparison",
        WorkerCommand::LoadReplay { .. } => "load_replay",
        WorkerCommand::LoadNotifications => "load_notifications",
        WorkerCommand::PollNotifications => "poll_notifications",
        WorkerCommand::MarkNotificationRead(_) => "mark_notification_read",
        WorkerCommand::DeleteNotification(_) => "delete_notification",
        WorkerCommand::LoadTraining => "load_training",
        WorkerCommand::LoadModule(_) => "load_module",
        WorkerCommand::OpenUnit(_) => "open_unit",
        WorkerCommand::CompleteUnit { .. } => "complete_unit",
        WorkerCommand::ResetProgress => "reset_progress",
        WorkerCommand::LoadGamification => "load_gamification",
        WorkerCommand::UpdateKeys(_) => "update_keys",
        WorkerCommand::RemoveKeys => "remove_keys",
        WorkerCommand::Shutdown => "shutdown",
    }
}

fn reply<T>(
    context: &'static str,
    result: Result<T, ApiError>,
    ok: impl FnOnce(T) -> WorkerResponse,
) -> WorkerResponse {
    match result {
        Ok(v) => ok(v),
        Err(error) => WorkerResponse::Failed { context, error },
    }
}

fn handle_command(client: &mut ApiClient, cmd: WorkerCommand) -> Option<WorkerResponse> {
    let resp = match cmd {
        WorkerCommand::SetToken(_) | WorkerCommand::Shutdown => return None,
        WorkerCommand::Login { email, password } => {
            let result = client.login(&email, &password);
            if let Ok(auth) = &result {
                client.set_token(Some(auth.token.clone()));
            }
            reply("login", result, WorkerResponse::LoggedIn)
        }
        WorkerCommand::Register {
            name,
            email,
            password,
        } => reply("register", client.register(&name, &email, &password), |m| {
            WorkerResponse::AuthMessage(m.message.unwrap_or_else(|| {
                "Registration successful! Please check your email to verify your account.".into()
            }))
        }),
        WorkerCommand::ForgotPassword { email } => {
            reply("forgot password", client.forgot_password(&email), |m| {
                WorkerResponse::AuthMessage(m.message.unwrap_or_else(|| {
                    "If an account exists, a reset link has been sent.".into()
                }))
            })
        }
        WorkerCommand::ResetPassword { token, password } => reply(
            "reset password",
            client.reset_password(&token, &password),
            |m| {
                WorkerResponse::AuthMessage(
                    m.message
                        .unwrap_or_else(|| "Password reset. You can now log in.".into()),
                )
            },
        ),
        WorkerCommand::VerifyEmail { token } => reply(
            "verify email",
            client.verify_email(&token),
            |m| {
                WorkerResponse::AuthMessage(
                    m.message
                        .unwrap_or_else(|| "Email verified. You can now log in.".into()),
                )
            },
        ),
        WorkerCommand::LoadDashboard => {
            let mut failures = Vec::new();
            WorkerResponse::Dashboard {
                account: part(&mut failures, "portfolio", client.portfolio()),
                positions: part(&mut failures, "positions", client.positions()),
                logs: part(&mut failures, "order logs", client.order_logs()),
                failures,
            }
        }
        WorkerCommand::LoadPortfolio { query } => {
            let mut failures = Vec::new();
            WorkerResponse::Portfolio {
                account: part(&mut failures, "portfolio", client.portfolio()),
                positions: part(&mut failures, "positions", client.positions()),
                history: part(
                    &mut failures,
                    "portfolio history",
                    client.portfolio_history(&query),
                ),
                failures,
            }
        }
        WorkerCommand::LoadOrders => reply("orders", client.orders(), WorkerResponse::Orders),
        WorkerCommand::LoadOrderLogs => {
            reply("order logs", client.order_logs(), WorkerResponse::OrderLogs)
        }
        WorkerCommand::PlaceOrder(order) => reply(
            "place order",
            client.create_order(&order),
            WorkerResponse::OrderPlaced,
        ),
        WorkerCommand::CancelOrder(id) => {
            let result = client.cancel_order(&id);
            reply("cancel order", result, |m| WorkerResponse::OrderCancelled {
                id,
                message: m.message,
            })
        }
        WorkerCommand::LoadHistory => {
            let result = client.history().and_then(|items| {
                Ok(WorkerResponse::History {
                    items,
                    activities: client.activities()?,
                })
            });
            reply("history", result, |r| r)
        }
        WorkerCommand::LoadSymbols => reply("symbols", client.symbols(), WorkerResponse::Symbols),
        WorkerCommand::RunBacktest(req) => reply("backtest", client.run_backtest(&req), |r| {
            WorkerResponse::Backtest(Box::new(r))
        }),
        WorkerCommand::RunComparison(req) => reply(
            "comparison",
            client.market_event_comparison(&req),
            |r| WorkerResponse::Comparison(Box::new(r)),
        ),
        WorkerCommand::LoadReplay {
            strategy,
            symbols,
            from,
            to,
        } => reply(
            "replay",
            ReplaySet::fetch(client, &strategy, &symbols, from, to),
            WorkerResponse::Replay,
        ),
        WorkerCommand::LoadNotifications => reply(
            "notifications",
            client.notifications(),
            WorkerResponse::Notifications,
        ),
        WorkerCommand::PollNotifications => match poll_cycle(client) {
            Ok(Some(items)) => WorkerResponse::Polled(Ok(items)),
            Ok(None) => return None,
            Err(error) => WorkerResponse::Polled(Err(error)),
        },
        WorkerCommand::MarkNotificationRead(id) => {
            let result = client.mark_notification_read(&id);
            reply("mark read", result, |()| WorkerResponse::NotificationRead(id))
        }
        WorkerCommand::DeleteNotification(id) => {
            let result = client.delete_notification(&id);
            reply("delete notification", result, |()| {
                WorkerResponse::NotificationDeleted(id)
            })
        }
        WorkerCommand::LoadTraining => {
            let result = client.modules().and_then(|modules| {
                Ok(WorkerResponse::Training {
                    modules,
                    progress: client.progress()?,
                })
            });
            reply("training", result, |r| r)
        }
        WorkerCommand::LoadModule(id) => reply("module", client.module(&id), |m| {
            WorkerResponse::ModuleLoaded(Box::new(m))
        }),
        WorkerCommand::OpenUnit(id) => reply("unit", client.unit(&id), |u| {
            WorkerResponse::UnitLoaded(Box::new(u))
        }),
        WorkerCommand::CompleteUnit { id, update } => {
            let result = client.update_unit_progress(&id, &update);
            reply("unit progress", result, |()| WorkerResponse::UnitCompleted {
                id,
                tokens: update.tokens_earned,
            })
        }
        WorkerCommand::ResetProgress => reply(
            "reset progress",
            client.reset_progress(),
            |()| WorkerResponse::ProgressReset,
        ),
        WorkerCommand::LoadGamification => {
            let result = client.achievements().and_then(|achievements| {
                Ok(WorkerResponse::Gamification {
                    achievements,
                    badges: client.badges()?,
                    leaderboard: client.leaderboard()?,
                })
            });
            reply("gamification", result, |r| r)
        }
        WorkerCommand::UpdateKeys(keys) => reply(
            "update keys",
            client.update_alpaca_keys(&keys),
            WorkerResponse::KeysUpdated,
        ),
        WorkerCommand::RemoveKeys => reply(
            "remove keys",
            client.remove_alpaca_keys(),
            WorkerResponse::KeysUpdated,
        ),
    };
    Some(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn worker_shutdown() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, _resp_rx) = mpsc::channel();
        let client = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();

        let handle = spawn_worker(client, cmd_rx, resp_tx).unwrap();
        cmd_tx.send(WorkerCommand::SetToken(Some("t".into()))).unwrap();
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().expect("worker should join cleanly");
    }

    #[test]
    fn worker_exits_when_ui_drops_sender() {
        let (cmd_tx, cmd_rx) = mpsc::channel::<WorkerCommand>();
        let (resp_tx, _resp_rx) = mpsc::channel();
        let client = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();

        let handle = spawn_worker(client, cmd_rx, resp_tx).unwrap();
        drop(cmd_tx);
        handle.join().unwrap();
    }
}
