//! Application state: single owner, main thread only.
//!
//! All UI state lives here. The worker thread communicates via channels.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Instant;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use tradedash_core::api::HistoryQuery;
use tradedash_core::domain::{
    Account, Achievement, Activity, AlpacaEnv, AlpacaKeys, Badge, BacktestResult,
    ComparisonRequest, ComparisonResult, DateRange, HistoryItem, LeaderboardEntry, Module,
    ModuleSummary, Order, OrderLog, OrderRequest, OrderSide, OrderType, PortfolioHistory,
    Position, SymbolInfo, TimeInForce, Unit, User, UserProgress,
};
use tradedash_core::forms::{
    validate_order, FieldErrors, ForgotPasswordForm, LoginForm, RegisterForm,
    ResetPasswordForm, VerifyEmailForm,
};
use tradedash_core::notifications::{NotificationFeed, PollTimer, POLL_INTERVAL};
use tradedash_core::replay::{parse_symbols, ReplaySet, ReplayStepper, PLAYBACK_INTERVAL};
use tradedash_core::strategy::{parse_date, ParameterForm, StrategyKind};
use tradedash_core::training::{AnswerSheet, UnitBody};
use tradedash_core::{ApiError, SessionStore, SESSION_EXPIRED};

use crate::form::{Field, FormState};
use crate::worker::{WorkerCommand, WorkerResponse};

const ERROR_HISTORY_CAP: usize = 50;

/// Which panel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Dashboard,
    Backtest,
    Portfolio,
    Orders,
    History,
    Replay,
    Compare,
    Training,
    Settings,
    Help,
}

impl Panel {
    pub const ALL: [Panel; 10] = [
        Panel::Dashboard,
        Panel::Backtest,
        Panel::Portfolio,
        Panel::Orders,
        Panel::History,
        Panel::Replay,
        Panel::Compare,
        Panel::Training,
        Panel::Settings,
        Panel::Help,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    /// Number key that selects the panel: 1-9, then 0 for the tenth.
    pub fn hotkey(self) -> char {
        match self.index() {
            9 => '0',
            i => char::from(b'1' + i as u8),
        }
    }

    pub fn from_hotkey(c: char) -> Option<Self> {
        match c {
            '0' => Some(Panel::Help),
            '1'..='9' => Self::from_index(c as usize - '1' as usize),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Panel::Dashboard => "Dashboard",
            Panel::Backtest => "Backtest",
            Panel::Portfolio => "Portfolio",
            Panel::Orders => "Orders",
            Panel::History => "History",
            Panel::Replay => "Replay",
            Panel::Compare => "Compare",
            Panel::Training => "Training",
            Panel::Settings => "Settings",
            Panel::Help => "Help",
        }
    }

    pub fn next(self) -> Panel {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Panel {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Auth,
    Server,
    Validation,
    Other,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Network => "NET",
            ErrorCategory::Auth => "AUTH",
            ErrorCategory::Server => "API",
            ErrorCategory::Validation => "INPUT",
            ErrorCategory::Other => "ERR",
        }
    }
}

impl From<&ApiError> for ErrorCategory {
    fn from(e: &ApiError) -> Self {
        match e {
            ApiError::Network(_) => ErrorCategory::Network,
            ApiError::Unauthorized(_) => ErrorCategory::Auth,
            ApiError::Http { .. } | ApiError::Decode(_) => ErrorCategory::Server,
            ApiError::Validation(_) => ErrorCategory::Validation,
            ApiError::Config(_) | ApiError::Session(_) => ErrorCategory::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth screens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScreen {
    Login,
    Register,
    Forgot,
    Reset,
    Verify,
}

impl AuthScreen {
    pub fn title(self) -> &'static str {
        match self {
            AuthScreen::Login => "Log in",
            AuthScreen::Register => "Create account",
            AuthScreen::Forgot => "Forgot password",
            AuthScreen::Reset => "Reset password",
            AuthScreen::Verify => "Verify email",
        }
    }

    fn fields(self) -> Vec<Field> {
        match self {
            AuthScreen::Login => vec![Field::new("Email"), Field::secret("Password")],
            AuthScreen::Register => vec![
                Field::new("Name"),
                Field::new("Email"),
                Field::secret("Password"),
                Field::secret("Confirm password"),
            ],
            AuthScreen::Forgot => vec![Field::new("Email")],
            AuthScreen::Reset => vec![
                Field::new("Reset token"),
                Field::secret("New password"),
                Field::secret("Confirm password"),
            ],
            AuthScreen::Verify => vec![Field::new("Verification token")],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthState {
    pub screen: AuthScreen,
    pub form: FormState,
    pub errors: FieldErrors,
    pub message: Option<(String, StatusLevel)>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new(AuthScreen::Login)
    }
}

impl AuthState {
    pub fn new(screen: AuthScreen) -> Self {
        let mut form = FormState::new(screen.fields());
        form.editing = true;
        Self {
            screen,
            form,
            errors: FieldErrors::default(),
            message: None,
        }
    }

    /// Switch screen, keeping the email when both screens have one.
    pub fn switch(&mut self, screen: AuthScreen) {
        let email = self.email().map(str::to_string);
        let message = self.message.take();
        *self = Self::new(screen);
        if let (Some(email), Some(idx)) = (email, self.email_index()) {
            self.form.set(idx, email);
        }
        self.message = message;
    }

    fn email_index(&self) -> Option<usize> {
        self.form.fields.iter().position(|f| f.label == "Email")
    }

    pub fn email(&self) -> Option<&str> {
        self.email_index().map(|i| self.form.value(i))
    }

    /// Validate the current screen. On success returns the command to send.
    pub fn submit(&mut self) -> Option<WorkerCommand> {
        let v = |i: usize| self.form.value(i).to_string();
        let (errors, cmd) = match self.screen {
            AuthScreen::Login => {
                let form = LoginForm {
                    email: v(0),
                    password: v(1),
                };
                (
                    form.validate(),
                    WorkerCommand::Login {
                        email: form.email.trim().to_string(),
                        password: form.password,
                    },
                )
            }
            AuthScreen::Register => {
                let form = RegisterForm {
                    name: v(0),
                    email: v(1),
                    password: v(2),
                    confirm_password: v(3),
                };
                (
                    form.validate(),
                    WorkerCommand::Register {
                        name: form.name.trim().to_string(),
                        email: form.email.trim().to_string(),
                        password: form.password,
                    },
                )
            }
            AuthScreen::Forgot => {
                let form = ForgotPasswordForm { email: v(0) };
                (
                    form.validate(),
                    WorkerCommand::ForgotPassword {
                        email: form.email.trim().to_string(),
                    },
                )
            }
            AuthScreen::Reset => {
                let form = ResetPasswordForm {
                    token: v(0),
                    password: v(1),
                    confirm_password: v(2),
                };
                (
                    form.validate(),
                    WorkerCommand::ResetPassword {
                        token: form.token.trim().to_string(),
                        password: form.password,
                    },
                )
            }
            AuthScreen::Verify => {
                let form = VerifyEmailForm { token: v(0) };
                (
                    form.validate(),
                    WorkerCommand::VerifyEmail {
                        token: form.token.trim().to_string(),
                    },
                )
            }
        };
        self.errors = errors;
        if self.errors.is_empty() {
            self.message = None;
            Some(cmd)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct DashboardState {
    pub account: Option<Account>,
    pub positions: Vec<Position>,
    pub logs: Vec<OrderLog>,
    pub filter: String,
    pub cursor: usize,
    /// Show the detail line for the selected log entry.
    pub expanded: bool,
}

impl DashboardState {
    pub fn filtered(&self) -> Vec<&OrderLog> {
        tradedash_core::export::filter_logs(&self.logs, &self.filter)
    }
}

/// A row of the backtest form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacktestRow {
    Strategy,
    Symbol,
    From,
    To,
    Param(usize),
}

#[derive(Debug, Default)]
pub struct BacktestState {
    pub form: ParameterForm,
    pub cursor: usize,
    pub result: Option<BacktestResult>,
}

impl BacktestState {
    pub fn row_count(&self) -> usize {
        4 + self.form.strategy().def().params.len()
    }

    pub fn row(&self) -> BacktestRow {
        match self.cursor {
            0 => BacktestRow::Strategy,
            1 => BacktestRow::Symbol,
            2 => BacktestRow::From,
            3 => BacktestRow::To,
            n => BacktestRow::Param(n - 4),
        }
    }

    pub fn select_strategy(&mut self, kind: StrategyKind) {
        self.form.select_strategy(kind);
        self.cursor = self.cursor.min(self.row_count() - 1);
    }
}

/// Portfolio history periods the panel cycles through.
pub const HISTORY_PERIODS: [&str; 5] = ["1D", "1W", "1M", "3M", "1A"];

#[derive(Debug, Default)]
pub struct PortfolioState {
    pub account: Option<Account>,
    pub positions: Vec<Position>,
    pub history: Option<PortfolioHistory>,
    pub period: usize,
    pub cursor: usize,
}

impl PortfolioState {
    pub fn query(&self) -> HistoryQuery {
        let period = HISTORY_PERIODS[self.period % HISTORY_PERIODS.len()];
        HistoryQuery {
            period: Some(period.to_string()),
            timeframe: Some(if period == "1D" { "15Min" } else { "1D" }.to_string()),
        }
    }
}

#[derive(Debug, Default)]
pub struct OrdersState {
    pub orders: Vec<Order>,
    pub cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryView {
    #[default]
    Orders,
    Activities,
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub items: Vec<HistoryItem>,
    pub activities: Vec<Activity>,
    pub view: HistoryView,
    pub cursor: usize,
}

impl HistoryState {
    pub fn len(&self) -> usize {
        match self.view {
            HistoryView::Orders => self.items.len(),
            HistoryView::Activities => self.activities.len(),
        }
    }
}

#[derive(Debug)]
pub struct ReplayState {
    pub strategy: StrategyKind,
    pub symbols: String,
    pub from: String,
    pub to: String,
    /// 0 strategy, 1 symbols, 2 from, 3 to.
    pub cursor: usize,
    pub set: ReplaySet,
    pub stepper: ReplayStepper,
    pub timer: PollTimer,
}

impl ReplayState {
    pub const ROWS: usize = 4;

    fn new(now: Instant) -> Self {
        Self {
            strategy: StrategyKind::MeanReversionMl,
            symbols: "AAPL".into(),
            from: String::new(),
            to: String::new(),
            cursor: 0,
            set: ReplaySet::default(),
            stepper: ReplayStepper::default(),
            timer: PollTimer::new(PLAYBACK_INTERVAL, now),
        }
    }

    /// Validated request parts: strategy id, symbols and optional dates.
    pub fn request(&self) -> Result<WorkerCommand, ApiError> {
        let symbols = parse_symbols(&self.symbols);
        if symbols.is_empty() {
            return Err(ApiError::Validation(
                "Please enter at least one symbol".into(),
            ));
        }
        let date = |field: &str, s: &str| {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                parse_date(field, s).map(Some)
            }
        };
        let from = date("Start date", &self.from)?;
        let to = date("End date", &self.to)?;
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(ApiError::Validation(
                    "Start date must be on or before end date".into(),
                ));
            }
        }
        Ok(WorkerCommand::LoadReplay {
            strategy: self.strategy.id().to_string(),
            symbols,
            from,
            to,
        })
    }

    pub fn load(&mut self, set: ReplaySet) {
        self.stepper = ReplayStepper::for_set(&set);
        self.set = set;
    }

    pub fn toggle_play(&mut self, now: Instant) {
        self.stepper.toggle_play();
        if self.stepper.is_playing() {
            self.timer.reset(now);
        }
    }
}

pub const COMPARE_FIELDS: [&str; 5] = [
    "Symbol",
    "Period A from",
    "Period A to",
    "Period B from",
    "Period B to",
];

#[derive(Debug)]
pub struct CompareState {
    pub strategy: StrategyKind,
    /// Symbol, then A from/to, then B from/to.
    pub fields: [String; 5],
    pub include_news: bool,
    /// 0 strategy, 1..=5 fields, 6 include news.
    pub cursor: usize,
    pub result: Option<ComparisonResult>,
    /// Request the current result was produced for.
    pub request: Option<ComparisonRequest>,
}

impl Default for CompareState {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::MeanReversionMl,
            fields: [
                "AAPL".into(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ],
            include_news: false,
            cursor: 0,
            result: None,
            request: None,
        }
    }
}

impl CompareState {
    pub const ROWS: usize = 7;

    pub fn request(&self) -> Result<ComparisonRequest, ApiError> {
        let symbol = self.fields[0].trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(ApiError::Validation("Please enter a symbol".into()));
        }
        let range = |label: &str, from: &str, to: &str| -> Result<DateRange, ApiError> {
            let start = parse_date(&format!("{label} start"), from)?;
            let end = parse_date(&format!("{label} end"), to)?;
            if start > end {
                return Err(ApiError::Validation(format!(
                    "{label}: start date must be on or before end date"
                )));
            }
            Ok(DateRange {
                from: start.to_string(),
                to: end.to_string(),
            })
        };
        Ok(ComparisonRequest {
            strategy: self.strategy.id().to_string(),
            symbol,
            period_a: range("Period A", &self.fields[1], &self.fields[2])?,
            period_b: range("Period B", &self.fields[3], &self.fields[4])?,
            include_news: self.include_news,
        })
    }
}

#[derive(Debug, Default)]
pub struct TrainingState {
    pub modules: Vec<ModuleSummary>,
    pub progress: Option<UserProgress>,
    pub cursor: usize,
    /// Open module with its units; `unit_cursor` moves inside it.
    pub module: Option<Module>,
    pub unit_cursor: usize,
}

/// Open training unit with its parsed content and answers.
#[derive(Debug)]
pub struct UnitViewer {
    pub unit: Unit,
    pub body: UnitBody,
    pub sheet: AnswerSheet,
    /// Question / term under the cursor.
    pub item: usize,
    /// Option / definition position under the cursor.
    pub option: usize,
    /// Flashcard answer shown.
    pub revealed: bool,
    pub opened_at: Instant,
    pub score: Option<u32>,
}

impl UnitViewer {
    pub fn new(unit: Unit, now: Instant) -> Self {
        let body = UnitBody::parse(&unit.unit_type, &unit.content);
        let sheet = AnswerSheet::new(&body);
        Self {
            unit,
            body,
            sheet,
            item: 0,
            option: 0,
            revealed: false,
            opened_at: now,
            score: None,
        }
    }

    /// How many options the current item offers (quiz options or matching
    /// definitions).
    pub fn option_count(&self) -> usize {
        match &self.body {
            UnitBody::Quiz(qs) => qs.get(self.item).map_or(0, |q| q.options.len()),
            UnitBody::Matching { definitions, .. } => definitions.len(),
            _ => 0,
        }
    }

    pub fn move_item(&mut self, delta: i64) {
        let count = self.body.item_count();
        if count == 0 {
            return;
        }
        self.item = (self.item as i64 + delta).clamp(0, count as i64 - 1) as usize;
        self.option = match &self.body {
            UnitBody::Quiz(_) => self.sheet.choice(self.item).unwrap_or(0),
            UnitBody::Matching { .. } => self.sheet.assignment(self.item).unwrap_or(0),
            _ => 0,
        };
    }

    pub fn move_option(&mut self, delta: i64) {
        let count = self.option_count();
        if count == 0 {
            return;
        }
        self.option = (self.option as i64 + delta).rem_euclid(count as i64) as usize;
    }

    /// Record the highlighted option for the current item.
    pub fn select(&mut self) {
        match &self.body {
            UnitBody::Quiz(_) => self.sheet.choose(self.item, self.option),
            UnitBody::Matching { .. } => self.sheet.assign(self.item, self.option),
            UnitBody::Flashcard { .. } => self.revealed = !self.revealed,
            _ => {}
        }
    }

    pub fn type_char(&mut self, c: char) {
        if matches!(self.body, UnitBody::FillBlank(_)) {
            let mut text = self.sheet.blank(self.item).to_string();
            text.push(c);
            self.sheet.set_blank(self.item, text);
        }
    }

    pub fn backspace(&mut self) {
        if matches!(self.body, UnitBody::FillBlank(_)) {
            let mut text = self.sheet.blank(self.item).to_string();
            text.pop();
            self.sheet.set_blank(self.item, text);
        }
    }

    pub fn submit(&mut self) -> Result<u32, ApiError> {
        let score = self.sheet.submit(&self.body)?;
        self.score = Some(score);
        Ok(score)
    }

    pub fn retry(&mut self) {
        self.sheet.retry();
        self.score = None;
        self.item = 0;
        self.option = 0;
    }

    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.opened_at).as_secs()
    }

    pub fn completion(&self, now: Instant) -> Option<WorkerCommand> {
        if !self.sheet.can_complete(&self.body) {
            return None;
        }
        Some(WorkerCommand::CompleteUnit {
            id: self.unit.id.clone(),
            update: self
                .sheet
                .completion_payload(&self.body, self.elapsed_secs(now)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamificationTab {
    #[default]
    Achievements,
    Badges,
    Leaderboard,
}

impl GamificationTab {
    pub fn next(self) -> Self {
        match self {
            GamificationTab::Achievements => GamificationTab::Badges,
            GamificationTab::Badges => GamificationTab::Leaderboard,
            GamificationTab::Leaderboard => GamificationTab::Achievements,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GamificationTab::Achievements => "Achievements",
            GamificationTab::Badges => "Badges",
            GamificationTab::Leaderboard => "Leaderboard",
        }
    }
}

#[derive(Debug, Default)]
pub struct GamificationState {
    pub tab: GamificationTab,
    pub achievements: Vec<Achievement>,
    pub badges: Vec<Badge>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub scroll: usize,
}

pub const KEY_FIELDS: [&str; 4] = [
    "Paper API key",
    "Paper secret key",
    "Live API key",
    "Live secret key",
];

#[derive(Debug)]
pub struct SettingsState {
    pub env: AlpacaEnv,
    pub keys: FormState,
    /// 0 environment, 1..=4 key fields.
    pub cursor: usize,
    pub show_keys: bool,
    pub errors: FieldErrors,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            env: AlpacaEnv::Paper,
            keys: FormState::new(KEY_FIELDS.into_iter().map(Field::secret).collect()),
            cursor: 0,
            show_keys: false,
            errors: FieldErrors::default(),
        }
    }
}

impl SettingsState {
    pub const ROWS: usize = 5;

    pub fn sync_user(&mut self, user: &User) {
        self.env = user.alpaca_env.unwrap_or_default();
    }

    pub fn keys(&self) -> AlpacaKeys {
        AlpacaKeys {
            alpaca_paper_api_key: self.keys.value(0).trim().to_string(),
            alpaca_paper_secret_key: self.keys.value(1).trim().to_string(),
            alpaca_live_api_key: self.keys.value(2).trim().to_string(),
            alpaca_live_secret_key: self.keys.value(3).trim().to_string(),
            alpaca_env: self.env,
        }
    }
}

/// A row of the new-order form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderRow {
    Symbol,
    Qty,
    Side,
    Type,
    TimeInForce,
    LimitPrice,
    StopPrice,
}

impl OrderRow {
    pub const ALL: [OrderRow; 7] = [
        OrderRow::Symbol,
        OrderRow::Qty,
        OrderRow::Side,
        OrderRow::Type,
        OrderRow::TimeInForce,
        OrderRow::LimitPrice,
        OrderRow::StopPrice,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OrderRow::Symbol => "Symbol",
            OrderRow::Qty => "Quantity",
            OrderRow::Side => "Side",
            OrderRow::Type => "Type",
            OrderRow::TimeInForce => "Time in force",
            OrderRow::LimitPrice => "Limit price",
            OrderRow::StopPrice => "Stop price",
        }
    }

    pub fn is_text(self) -> bool {
        !matches!(self, OrderRow::Side | OrderRow::Type | OrderRow::TimeInForce)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderForm {
    pub symbol: String,
    pub qty: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub limit_price: String,
    pub stop_price: String,
    pub row: usize,
    pub errors: FieldErrors,
}

impl OrderForm {
    pub fn current(&self) -> OrderRow {
        OrderRow::ALL[self.row.min(OrderRow::ALL.len() - 1)]
    }

    pub fn text_mut(&mut self, row: OrderRow) -> Option<&mut String> {
        match row {
            OrderRow::Symbol => Some(&mut self.symbol),
            OrderRow::Qty => Some(&mut self.qty),
            OrderRow::LimitPrice => Some(&mut self.limit_price),
            OrderRow::StopPrice => Some(&mut self.stop_price),
            _ => None,
        }
    }

    pub fn text(&self, row: OrderRow) -> String {
        match row {
            OrderRow::Symbol => self.symbol.clone(),
            OrderRow::Qty => self.qty.clone(),
            OrderRow::Side => self.side.to_string(),
            OrderRow::Type => self.order_type.to_string(),
            OrderRow::TimeInForce => self.time_in_force.to_string(),
            OrderRow::LimitPrice => self.limit_price.clone(),
            OrderRow::StopPrice => self.stop_price.clone(),
        }
    }

    pub fn cycle(&mut self, direction: i32) {
        match self.current() {
            OrderRow::Side => self.side = self.side.cycle(direction),
            OrderRow::Type => self.order_type = self.order_type.cycle(direction),
            OrderRow::TimeInForce => self.time_in_force = self.time_in_force.cycle(direction),
            _ => {}
        }
    }

    /// Parse and validate. Numeric fields that do not parse are reported
    /// under their own names before the order rules run.
    pub fn to_request(&mut self) -> Option<OrderRequest> {
        let mut errors = FieldErrors::default();
        let number = |raw: &str, field: &'static str, errors: &mut FieldErrors| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            match raw.parse::<f64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    errors.insert(field, "Must be a number");
                    None
                }
            }
        };
        let qty = number(&self.qty, "qty", &mut errors).unwrap_or(0.0);
        let limit_price = number(&self.limit_price, "limit_price", &mut errors);
        let stop_price = number(&self.stop_price, "stop_price", &mut errors);
        if !errors.is_empty() {
            self.errors = errors;
            return None;
        }
        let mut order = OrderRequest {
            symbol: self.symbol.clone(),
            qty,
            side: self.side,
            order_type: self.order_type,
            time_in_force: self.time_in_force,
            limit_price,
            stop_price,
        };
        self.errors = validate_order(&mut order);
        self.errors.is_empty().then_some(order)
    }
}

// ---------------------------------------------------------------------------
// Inline text editing for panel fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    BacktestSymbol,
    BacktestFrom,
    BacktestTo,
    ReplaySymbols,
    ReplayFrom,
    ReplayTo,
    CompareField(usize),
    LogFilter,
    ApiKey(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub target: EditTarget,
    pub buffer: String,
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Welcome,
    Auth,
    NewOrder,
    Unit,
    Gamification,
    Notifications,
    ErrorHistory,
    ConfirmReset,
}

/// Top-level application state.
pub struct AppState {
    // Navigation
    pub active_panel: Panel,
    pub running: bool,
    pub overlay: Overlay,

    // Session
    pub session: SessionStore,
    pub auth: AuthState,

    // Panel states
    pub dashboard: DashboardState,
    pub backtest: BacktestState,
    pub portfolio: PortfolioState,
    pub orders: OrdersState,
    pub history: HistoryState,
    pub replay: ReplayState,
    pub compare: CompareState,
    pub training: TrainingState,
    pub settings: SettingsState,

    // Overlay states
    pub unit: Option<UnitViewer>,
    pub gamification: GamificationState,
    pub new_order: OrderForm,
    pub notifications: NotificationFeed,
    pub notification_cursor: usize,
    pub notification_timer: PollTimer,

    pub symbols: Vec<SymbolInfo>,
    pub edit: Option<TextEdit>,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,
    /// Requests sent and not yet answered. Background polls are not counted.
    pub in_flight: usize,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub welcome_dismissed: bool,

    // Paths
    pub export_dir: PathBuf,
}

impl AppState {
    pub fn new(
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
        session: SessionStore,
        export_dir: PathBuf,
        now: Instant,
    ) -> Self {
        let mut settings = SettingsState::default();
        if let Some(user) = session.user() {
            settings.sync_user(user);
        }
        let overlay = if session.is_logged_in() {
            Overlay::None
        } else {
            Overlay::Auth
        };
        Self {
            active_panel: Panel::Dashboard,
            running: true,
            overlay,
            session,
            auth: AuthState::default(),
            dashboard: DashboardState::default(),
            backtest: BacktestState::default(),
            portfolio: PortfolioState::default(),
            orders: OrdersState::default(),
            history: HistoryState::default(),
            replay: ReplayState::new(now),
            compare: CompareState::default(),
            training: TrainingState::default(),
            settings,
            unit: None,
            gamification: GamificationState::default(),
            new_order: OrderForm::default(),
            notifications: NotificationFeed::default(),
            notification_cursor: 0,
            notification_timer: PollTimer::new(POLL_INTERVAL, now),
            symbols: Vec::new(),
            edit: None,
            worker_tx,
            worker_rx,
            in_flight: 0,
            status_message: None,
            error_history: VecDeque::with_capacity(ERROR_HISTORY_CAP),
            error_scroll: 0,
            welcome_dismissed: false,
            export_dir,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Queue a request on the worker.
    pub fn send(&mut self, cmd: WorkerCommand) {
        let counted = !matches!(
            cmd,
            WorkerCommand::SetToken(_) | WorkerCommand::PollNotifications
        );
        if self.worker_tx.send(cmd).is_ok() {
            if counted {
                self.in_flight += 1;
            }
        } else {
            self.push_error(
                ErrorCategory::Other,
                "background worker stopped".into(),
                String::new(),
            );
        }
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > ERROR_HISTORY_CAP {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn push_api_error(&mut self, error: &ApiError, context: &str) {
        self.push_error(ErrorCategory::from(error), error.to_string(), context.to_string());
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }

    /// Switch panel and load what it shows.
    pub fn enter_panel(&mut self, panel: Panel) {
        self.active_panel = panel;
        self.edit = None;
        self.refresh();
    }

    /// Reload the active panel's data.
    pub fn refresh(&mut self) {
        if !self.is_logged_in() {
            return;
        }
        match self.active_panel {
            Panel::Dashboard => self.send(WorkerCommand::LoadDashboard),
            Panel::Portfolio => {
                let query = self.portfolio.query();
                self.send(WorkerCommand::LoadPortfolio { query });
            }
            Panel::Orders => self.send(WorkerCommand::LoadOrders),
            Panel::History => self.send(WorkerCommand::LoadHistory),
            Panel::Training => self.send(WorkerCommand::LoadTraining),
            Panel::Backtest if self.symbols.is_empty() => self.send(WorkerCommand::LoadSymbols),
            _ => {}
        }
    }

    /// Called once a login succeeded and the session is stored.
    pub fn on_login(&mut self, now: Instant) {
        self.auth = AuthState::default();
        self.overlay = if self.welcome_dismissed {
            Overlay::None
        } else {
            Overlay::Welcome
        };
        if let Some(user) = self.session.user().cloned() {
            self.settings.sync_user(&user);
            self.set_status(format!("Welcome, {}", user.name));
        }
        self.notification_timer.reset(now);
        self.send(WorkerCommand::LoadNotifications);
        self.refresh();
    }

    /// The server rejected the token. The session store has already been
    /// cleared; drop user data and return to the login screen.
    pub fn expire_session(&mut self) {
        self.sign_out();
        self.auth.message = Some((SESSION_EXPIRED.to_string(), StatusLevel::Error));
        self.set_warning(SESSION_EXPIRED);
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.session.logout() {
            self.push_api_error(&e, "logout");
        }
        self.sign_out();
        self.set_status("Logged out");
    }

    fn sign_out(&mut self) {
        self.send(WorkerCommand::SetToken(None));
        self.dashboard = DashboardState::default();
        self.portfolio = PortfolioState::default();
        self.orders = OrdersState::default();
        self.history = HistoryState::default();
        self.training = TrainingState::default();
        self.gamification = GamificationState::default();
        self.notifications = NotificationFeed::default();
        self.settings = SettingsState::default();
        self.unit = None;
        self.edit = None;
        self.replay.stepper = ReplayStepper::for_set(&self.replay.set);
        self.auth = AuthState::default();
        self.overlay = Overlay::Auth;
    }

    /// Timers: notification polling while logged in, replay playback while
    /// playing.
    pub fn tick(&mut self, now: Instant) {
        if self.is_logged_in()
            && self.overlay != Overlay::Auth
            && self.notification_timer.due(now)
        {
            self.send(WorkerCommand::PollNotifications);
        }
        if self.replay.stepper.is_playing() && self.replay.timer.due(now) {
            self.replay.stepper.tick();
        }
    }

    /// Start editing a panel field, seeded with its current value.
    pub fn begin_edit(&mut self, target: EditTarget) {
        let buffer = match target {
            EditTarget::BacktestSymbol => self.backtest.form.symbol.clone(),
            EditTarget::BacktestFrom => self.backtest.form.from.to_string(),
            EditTarget::BacktestTo => self.backtest.form.to.to_string(),
            EditTarget::ReplaySymbols => self.replay.symbols.clone(),
            EditTarget::ReplayFrom => self.replay.from.clone(),
            EditTarget::ReplayTo => self.replay.to.clone(),
            EditTarget::CompareField(i) => self.compare.fields.get(i).cloned().unwrap_or_default(),
            EditTarget::LogFilter => self.dashboard.filter.clone(),
            EditTarget::ApiKey(i) => self.settings.keys.value(i).to_string(),
        };
        self.edit = Some(TextEdit { target, buffer });
    }

    /// Apply the edit buffer to its field. Invalid dates keep the old value
    /// and report why.
    pub fn commit_edit(&mut self) {
        let Some(TextEdit { target, buffer }) = self.edit.take() else {
            return;
        };
        match target {
            EditTarget::BacktestSymbol => {
                self.backtest.form.symbol = buffer.trim().to_ascii_uppercase();
            }
            EditTarget::BacktestFrom | EditTarget::BacktestTo => {
                let field = if target == EditTarget::BacktestFrom {
                    "Start date"
                } else {
                    "End date"
                };
                match parse_date(field, &buffer) {
                    Ok(d) if target == EditTarget::BacktestFrom => self.backtest.form.from = d,
                    Ok(d) => self.backtest.form.to = d,
                    Err(e) => self.push_api_error(&e, "backtest form"),
                }
            }
            EditTarget::ReplaySymbols => self.replay.symbols = buffer,
            EditTarget::ReplayFrom => self.replay.from = buffer.trim().to_string(),
            EditTarget::ReplayTo => self.replay.to = buffer.trim().to_string(),
            EditTarget::CompareField(i) => {
                if let Some(f) = self.compare.fields.get_mut(i) {
                    *f = buffer.trim().to_string();
                }
            }
            EditTarget::LogFilter => {
                self.dashboard.filter = buffer;
                self.dashboard.cursor = 0;
            }
            EditTarget::ApiKey(i) => self.settings.keys.set(i, buffer),
        }
    }

    pub fn open_new_order(&mut self, symbol: Option<&str>) {
        self.new_order = OrderForm {
            symbol: symbol.unwrap_or_default().to_string(),
            ..OrderForm::default()
        };
        self.overlay = Overlay::NewOrder;
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.user()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn app() -> (AppState, mpsc::Receiver<WorkerCommand>) {
        let (tx, rx) = mpsc::channel();
        let (_resp_tx, resp_rx) = mpsc::channel();
        let dir = std::env::temp_dir().join("tradedash-app-test-missing");
        let session = SessionStore::open(dir.join("session.json"));
        let app = AppState::new(tx, resp_rx, session, dir, Instant::now());
        (app, rx)
    }

    #[test]
    fn panel_cycle() {
        assert_eq!(Panel::Dashboard.next(), Panel::Backtest);
        assert_eq!(Panel::Help.next(), Panel::Dashboard);
        assert_eq!(Panel::Dashboard.prev(), Panel::Help);
    }

    #[test]
    fn panel_hotkeys_round_trip() {
        for p in Panel::ALL {
            assert_eq!(Panel::from_hotkey(p.hotkey()), Some(p));
        }
        assert_eq!(Panel::from_hotkey('0'), Some(Panel::Help));
        assert!(Panel::from_hotkey('x').is_none());
    }

    #[test]
    fn logged_out_app_starts_on_login() {
        let (app, _rx) = app();
        assert_eq!(app.overlay, Overlay::Auth);
        assert_eq!(app.auth.screen, AuthScreen::Login);
    }

    #[test]
    fn error_history_caps_at_50() {
        let (mut app, _rx) = app();
        for i in 0..60 {
            app.push_error(ErrorCategory::Other, format!("error {i}"), String::new());
        }
        assert_eq!(app.error_history.len(), 50);
        assert!(app.error_history[0].message.contains("59"));
    }

    #[test]
    fn auth_switch_keeps_email() {
        let mut auth = AuthState::default();
        auth.form.set(0, "a@b.co");
        auth.switch(AuthScreen::Register);
        assert_eq!(auth.email(), Some("a@b.co"));
        assert_eq!(auth.form.len(), 4);
        auth.switch(AuthScreen::Reset);
        assert_eq!(auth.email(), None);
    }

    #[test]
    fn verify_screen_sends_trimmed_token() {
        let mut auth = AuthState::default();
        auth.switch(AuthScreen::Verify);
        assert_eq!(auth.form.len(), 1);
        assert!(auth.submit().is_none());
        assert!(auth.errors.get("token").is_some());
        auth.form.set(0, " tok-42 ");
        match auth.submit() {
            Some(WorkerCommand::VerifyEmail { token }) => assert_eq!(token, "tok-42"),
            other => panic!("expected verify, got {other:?}"),
        }
    }

    #[test]
    fn auth_submit_validates_before_sending() {
        let mut auth = AuthState::default();
        assert!(auth.submit().is_none());
        assert!(!auth.errors.is_empty());
        auth.form.set(0, " trader@example.com ");
        auth.form.set(1, "secret1");
        match auth.submit() {
            Some(WorkerCommand::Login { email, .. }) => assert_eq!(email, "trader@example.com"),
            other => panic!("expected login, got {other:?}"),
        }
    }

    #[test]
    fn order_form_reports_bad_numbers() {
        let mut form = OrderForm {
            symbol: "aapl".into(),
            qty: "ten".into(),
            ..OrderForm::default()
        };
        assert!(form.to_request().is_none());
        assert_eq!(form.errors.get("qty"), Some("Must be a number"));

        form.qty = "10".into();
        form.limit_price = "150".into();
        let order = form.to_request().expect("market order is valid");
        assert_eq!(order.symbol, "AAPL");
        assert_eq!(order.limit_price, None);
    }

    #[test]
    fn compare_requires_both_periods() {
        let mut state = CompareState::default();
        assert!(state.request().is_err());
        state.fields[1] = "2020-02-01".into();
        state.fields[2] = "2020-04-30".into();
        state.fields[3] = "2022-01-01".into();
        state.fields[4] = "2022-06-30".into();
        let req = state.request().unwrap();
        assert_eq!(req.period_a.from, "2020-02-01");
        assert_eq!(req.strategy, "meanReversionML");
        state.fields[4] = "2021-01-01".into();
        assert!(state.request().is_err());
    }

    #[test]
    fn replay_dates_are_optional() {
        let mut state = ReplayState::new(Instant::now());
        state.symbols = "aapl, msft".into();
        match state.request().unwrap() {
            WorkerCommand::LoadReplay {
                symbols, from, to, ..
            } => {
                assert_eq!(symbols, vec!["AAPL", "MSFT"]);
                assert!(from.is_none() && to.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        state.symbols = " , ".into();
        assert!(state.request().is_err());
    }

    #[test]
    fn invalid_date_edit_keeps_old_value() {
        let (mut app, _rx) = app();
        let before = app.backtest.form.from;
        app.begin_edit(EditTarget::BacktestFrom);
        app.edit.as_mut().unwrap().buffer = "not a date".into();
        app.commit_edit();
        assert_eq!(app.backtest.form.from, before);
        assert_eq!(app.error_history.len(), 1);
    }

    #[test]
    fn switching_strategy_clamps_cursor() {
        let mut state = BacktestState::default();
        state.select_strategy(StrategyKind::AdvancedMomentum);
        state.cursor = state.row_count() - 1;
        state.select_strategy(StrategyKind::BasicMomentum);
        assert!(state.cursor < state.row_count());
    }
}
