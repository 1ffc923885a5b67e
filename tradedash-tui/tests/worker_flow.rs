//! Worker thread against a mock server, with responses applied to app state.

use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use mockito::Matcher;
use serde_json::json;
use tradedash_core::domain::User;
use tradedash_core::{ApiClient, Session, SessionStore};
use tradedash_tui::app::{Overlay, Panel};
use tradedash_tui::response::handle_worker_response;
use tradedash_tui::worker::{spawn_worker, WorkerCommand, WorkerResponse};
use tradedash_tui::AppState;

fn user_json() -> serde_json::Value {
    json!({ "id": 7, "name": "Ada", "email": "ada@example.com", "hasAlpacaKeys": true })
}

fn next(rx: &Receiver<WorkerResponse>) -> WorkerResponse {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("worker should answer")
}

#[test]
fn login_installs_token_for_later_requests() {
    let mut server = mockito::Server::new();
    let login = server
        .mock("POST", "/api/auth/login")
        .match_body(Matcher::Json(json!({ "email": "ada@example.com", "password": "secret1" })))
        .with_status(200)
        .with_body(json!({ "token": "tok-9", "user": user_json() }).to_string())
        .create();
    let orders = server
        .mock("GET", "/api/orders")
        .match_header("authorization", "Bearer tok-9")
        .with_status(200)
        .with_body(
            json!([{ "id": "o1", "symbol": "AAPL", "qty": "3", "type": "market",
                     "side": "buy", "status": "filled", "filledAvgPrice": "190.5" }])
            .to_string(),
        )
        .create();

    let client = ApiClient::with_base_url(&format!("{}/api", server.url())).unwrap();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let handle = spawn_worker(client, cmd_rx, resp_tx).unwrap();

    cmd_tx
        .send(WorkerCommand::Login {
            email: "ada@example.com".into(),
            password: "secret1".into(),
        })
        .unwrap();
    cmd_tx.send(WorkerCommand::LoadOrders).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let (app_tx, _app_cmds) = mpsc::channel();
    let (_unused_tx, app_rx) = mpsc::channel();
    let session = SessionStore::open(dir.path().join("session.json"));
    let mut app = AppState::new(app_tx, app_rx, session, dir.path().to_path_buf(), Instant::now());
    assert_eq!(app.overlay, Overlay::Auth);

    let now = Instant::now();
    match next(&resp_rx) {
        resp @ WorkerResponse::LoggedIn(_) => handle_worker_response(&mut app, resp, now),
        other => panic!("expected login, got {other:?}"),
    }
    assert!(app.is_logged_in());
    assert_eq!(app.current_user().map(|u| u.name.as_str()), Some("Ada"));
    assert_ne!(app.overlay, Overlay::Auth);

    match next(&resp_rx) {
        resp @ WorkerResponse::Orders(_) => handle_worker_response(&mut app, resp, now),
        other => panic!("expected orders, got {other:?}"),
    }
    assert_eq!(app.orders.orders.len(), 1);
    assert_eq!(app.orders.orders[0].filled_avg_price, Some(190.5));

    cmd_tx.send(WorkerCommand::Shutdown).unwrap();
    handle.join().unwrap();
    login.assert();
    orders.assert();
}

#[test]
fn rejected_token_returns_to_login() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/api/orders")
        .with_status(401)
        .with_body(r#"{"error":"Invalid token"}"#)
        .create();

    let mut client = ApiClient::with_base_url(&format!("{}/api", server.url())).unwrap();
    client.set_token(Some("stale".into()));
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let handle = spawn_worker(client, cmd_rx, resp_tx).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut session = SessionStore::open(&path);
    let user: User = serde_json::from_value(user_json()).unwrap();
    session
        .store(Session {
            token: "stale".into(),
            user,
        })
        .unwrap();

    let (app_tx, _app_cmds) = mpsc::channel();
    let (_unused_tx, app_rx) = mpsc::channel();
    let mut app = AppState::new(app_tx, app_rx, session, dir.path().to_path_buf(), Instant::now());
    app.enter_panel(Panel::Orders);
    assert!(app.is_logged_in());

    cmd_tx.send(WorkerCommand::LoadOrders).unwrap();
    let resp = next(&resp_rx);
    assert!(matches!(resp, WorkerResponse::Failed { .. }));
    handle_worker_response(&mut app, resp, Instant::now());

    assert!(!app.is_logged_in());
    assert_eq!(app.overlay, Overlay::Auth);
    assert!(SessionStore::open(&path).token().is_none());

    drop(cmd_tx);
    handle.join().unwrap();
}

#[test]
fn dashboard_loads_logs_without_broker_keys() {
    let mut server = mockito::Server::new();
    let _portfolio = server
        .mock("GET", "/api/portfolio")
        .with_status(400)
        .with_body(r#"{"error":"Alpaca API keys not configured"}"#)
        .create();
    let _positions = server
        .mock("GET", "/api/portfolio/positions")
        .with_status(200)
        .with_body("[]")
        .create();
    let _logs = server
        .mock("GET", "/api/order-logs")
        .with_status(200)
        .with_body(
            json!([{ "id": 1, "symbol": "AAPL", "qty": 2, "side": "buy",
                     "type": "market", "status": "filled" }])
            .to_string(),
        )
        .create();

    let mut client = ApiClient::with_base_url(&format!("{}/api", server.url())).unwrap();
    client.set_token(Some("tok".into()));
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let handle = spawn_worker(client, cmd_rx, resp_tx).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut session = SessionStore::open(dir.path().join("session.json"));
    let user: User = serde_json::from_value(user_json()).unwrap();
    session.store(Session { token: "tok".into(), user }).unwrap();
    let (app_tx, _app_cmds) = mpsc::channel();
    let (_unused_tx, app_rx) = mpsc::channel();
    let mut app = AppState::new(app_tx, app_rx, session, dir.path().to_path_buf(), Instant::now());

    cmd_tx.send(WorkerCommand::LoadDashboard).unwrap();
    let resp = next(&resp_rx);
    assert!(matches!(resp, WorkerResponse::Dashboard { .. }));
    handle_worker_response(&mut app, resp, Instant::now());

    assert!(app.is_logged_in());
    assert!(app.dashboard.account.is_none());
    assert_eq!(app.dashboard.logs.len(), 1);
    assert_eq!(app.dashboard.logs[0].symbol.as_deref(), Some("AAPL"));
    assert_eq!(app.error_history.len(), 1);
    assert!(app.error_history[0].message.contains("Alpaca API keys not configured"));

    drop(cmd_tx);
    handle.join().unwrap();
}
