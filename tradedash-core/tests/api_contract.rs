//! HTTP contract tests against a mock server.
//!
//! Covers:
//! 1. Bearer token and JSON body are sent as the endpoint table says
//! 2. A backtest response yields one chart point per date
//! 3. A 401 from any call clears the stored session
//! 4. Error bodies surface the server's message
//! 5. Order creation without an id is an error; non-array order logs are empty
//! 6. Replay failures for one symbol do not abort the others

use mockito::Matcher;
use serde_json::json;
use tradedash_core::chart::equity_points;
use tradedash_core::domain::{OrderRequest, UnitProgressUpdate, User};
use tradedash_core::replay::ReplaySet;
use tradedash_core::strategy::{ParameterForm, StrategyKind};
use tradedash_core::{ApiClient, ApiError, Session, SessionStore};

// ── Helpers ──────────────────────────────────────────────────────────

fn client_for(server: &mockito::Server, token: Option<&str>) -> ApiClient {
    let mut client = ApiClient::with_base_url(&format!("{}/api", server.url())).unwrap();
    client.set_token(token.map(str::to_string));
    client
}

fn user_json() -> serde_json::Value {
    json!({ "id": 1, "name": "Ada", "email": "ada@example.com", "hasAlpacaKeys": false })
}

fn sample_user() -> User {
    serde_json::from_value(user_json()).unwrap()
}

// ── Auth ─────────────────────────────────────────────────────────────

#[test]
fn login_persists_session_and_installs_token() {
    let mut server = mockito::Server::new();
    let login = server
        .mock("POST", "/api/auth/login")
        .match_body(Matcher::Json(json!({ "email": "ada@example.com", "password": "secret1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "token": "tok-123", "user": user_json() }).to_string())
        .create();
    let orders = server
        .mock("GET", "/api/orders")
        .match_header("authorization", "Bearer tok-123")
        .with_status(200)
        .with_body("[]")
        .create();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut store = SessionStore::open(&path);
    let mut client = client_for(&server, None);

    let user = store.login(&mut client, "ada@example.com", "secret1").unwrap();
    assert_eq!(user.id, "1");
    assert_eq!(client.token(), Some("tok-123"));
    assert!(client.orders().unwrap().is_empty());

    assert_eq!(SessionStore::open(&path).token(), Some("tok-123"));
    login.assert();
    orders.assert();
}

#[test]
fn unauthorized_clears_session() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/api/portfolio")
        .with_status(401)
        .with_body(r#"{"error":"Invalid token"}"#)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut store = SessionStore::open(&path);
    store
        .store(Session { token: "stale".into(), user: sample_user() })
        .unwrap();
    let client = client_for(&server, store.token());

    let err = client.portfolio().unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert!(store.handle_auth_error(&err));
    assert!(!store.is_logged_in());
    assert!(!path.exists());
}

#[test]
fn auth_failure_message_in_500_also_counts() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/api/history")
        .with_status(500)
        .with_body(r#"{"error":"Authentication failed: jwt expired"}"#)
        .create();
    let err = client_for(&server, Some("tok")).history().unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.is_auth_failure());
}

#[test]
fn malformed_success_body_keeps_session() {
    let mut server = mockito::Server::new();
    let body = format!("[{}x]", " ".repeat(399));
    let _m = server
        .mock("GET", "/api/orders")
        .with_status(200)
        .with_body(body)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut store = SessionStore::open(&path);
    store
        .store(Session { token: "tok".into(), user: sample_user() })
        .unwrap();

    let err = client_for(&server, store.token()).orders().unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
    assert!(err.to_string().contains("401"));
    assert!(!store.handle_auth_error(&err));
    assert!(store.is_logged_in());
    assert!(path.exists());
}

#[test]
fn error_body_message_is_surfaced() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("POST", "/api/auth/register")
        .with_status(400)
        .with_body(r#"{"error":"Email already registered"}"#)
        .create();
    let err = client_for(&server, None)
        .register("Ada", "ada@example.com", "secret1")
        .unwrap_err();
    assert_eq!(err.to_string(), "Email already registered (HTTP 400)");
    assert!(!err.is_auth_failure());
}

// ── Backtest ─────────────────────────────────────────────────────────

#[test]
fn backtest_chart_has_one_point_per_date() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("POST", "/api/backtest")
        .match_header("authorization", "Bearer tok")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "symbol": "AAPL",
            "from": "2023-01-01",
            "to": "2023-12-31",
            "strategy": "volatilityBreakout",
            "params": { "period": 14.0, "k": 1.0 }
        })))
        .with_status(200)
        .with_body(
            json!({
                "dates": ["2023-01-03", "2023-01-04", "2023-01-05"],
                "equityCurve": [1.0, 1.02, 0.99],
                "signals": [0, 1, 0]
            })
            .to_string(),
        )
        .create();

    let mut form = ParameterForm::new(StrategyKind::VolatilityBreakout);
    form.symbol = "aapl".into();
    let result = client_for(&server, Some("tok"))
        .run_backtest(&form.to_request().unwrap())
        .unwrap();

    let points = equity_points(&result.dates, &result.equity_curve);
    assert_eq!(points.len(), result.dates.len());
    assert_eq!(points[2], (2.0, 0.99));
    m.assert();
}

#[test]
fn strategy_runs_hit_dedicated_endpoint() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("POST", "/api/strategies/mean-reversion-ml")
        .match_body(Matcher::PartialJson(json!({ "symbol": "SPY", "params": { "rsiThreshold": 30.0 } })))
        .with_status(200)
        .with_body(r#"{"dates":[],"equityCurve":[]}"#)
        .create();

    let mut form = ParameterForm::new(StrategyKind::MeanReversionMl);
    form.symbol = "SPY".into();
    let req = form.to_run_request().unwrap();
    client_for(&server, Some("tok"))
        .run_strategy(StrategyKind::MeanReversionMl, &req)
        .unwrap();
    m.assert();
}

// ── Orders ───────────────────────────────────────────────────────────

#[test]
fn create_order_requires_id() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("POST", "/api/orders")
        .match_body(Matcher::PartialJson(json!({ "symbol": "AAPL", "type": "market", "time_in_force": "day" })))
        .with_status(200)
        .with_body(r#"{"error":"insufficient buying power"}"#)
        .create();

    let order = OrderRequest { symbol: "AAPL".into(), ..Default::default() };
    let err = client_for(&server, Some("tok")).create_order(&order).unwrap_err();
    assert_eq!(err.to_string(), "insufficient buying power");
}

#[test]
fn order_logs_non_array_is_empty() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/api/order-logs")
        .with_status(200)
        .with_body(r#"{"message":"no logs"}"#)
        .create();
    assert!(client_for(&server, Some("tok")).order_logs().unwrap().is_empty());
}

#[test]
fn cancel_accepts_empty_body() {
    let mut server = mockito::Server::new();
    let m = server.mock("DELETE", "/api/orders/abc-1").with_status(204).create();
    client_for(&server, Some("tok")).cancel_order("abc-1").unwrap();
    m.assert();
}

// ── Replay ───────────────────────────────────────────────────────────

#[test]
fn replay_failure_is_per_symbol() {
    let mut server = mockito::Server::new();
    let _ok = server
        .mock("POST", "/api/portfolio-replay")
        .match_body(Matcher::PartialJson(json!({ "symbol": "AAPL" })))
        .with_status(200)
        .with_body(
            json!({
                "steps": [
                    { "date": "2024-01-02", "price": 180.0, "action": "buy", "equity": 10000, "position": 1 },
                    { "date": "2024-01-03", "price": 182.0, "action": "hold", "equity": 10020, "position": 1 }
                ],
                "summary": { "finalEquity": 10020, "totalTrades": 1, "wins": 1, "losses": 0, "winRate": 1.0 }
            })
            .to_string(),
        )
        .create();
    let _bad = server
        .mock("POST", "/api/portfolio-replay")
        .match_body(Matcher::PartialJson(json!({ "symbol": "NOPE" })))
        .with_status(404)
        .with_body(r#"{"error":"Symbol not found"}"#)
        .create();

    let symbols = vec!["AAPL".to_string(), "NOPE".to_string()];
    let set = ReplaySet::fetch(&client_for(&server, Some("tok")), "basicMomentum", &symbols, None, None)
        .unwrap();
    assert_eq!(set.max_steps(), 2);
    assert!(matches!(set.get("NOPE"), Some(Err(msg)) if msg.contains("Symbol not found")));
}

// ── Notifications & training ─────────────────────────────────────────

#[test]
fn poll_then_refetch() {
    let mut server = mockito::Server::new();
    let poll = server.mock("POST", "/api/notifications/poll").with_status(200).with_body("{}").create();
    let list = server
        .mock("GET", "/api/notifications")
        .with_status(200)
        .with_body(r#"[{"id":3,"type":"order_filled","message":"AAPL filled","read":false}]"#)
        .create();

    let items = tradedash_core::notifications::poll_cycle(&client_for(&server, Some("tok")))
        .unwrap()
        .unwrap();
    assert_eq!(items[0].id, "3");
    poll.assert();
    list.assert();
}

#[test]
fn poll_errors_are_swallowed() {
    let mut server = mockito::Server::new();
    let _m = server.mock("POST", "/api/notifications/poll").with_status(502).create();
    let out = tradedash_core::notifications::poll_cycle(&client_for(&server, Some("tok"))).unwrap();
    assert!(out.is_none());
}

#[test]
fn unit_progress_body_shape() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("POST", "/api/training/units/u-9/progress")
        .match_body(Matcher::Json(json!({
            "completed": true, "timeSpent": 120, "tokensEarned": 15, "score": 80
        })))
        .with_status(200)
        .with_body("{}")
        .create();
    let update = UnitProgressUpdate { completed: true, time_spent: 120, tokens_earned: 15, score: Some(80) };
    client_for(&server, Some("tok")).update_unit_progress("u-9", &update).unwrap();
    m.assert();
}
