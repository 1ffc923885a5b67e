use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

use tradedash_core::api::{BarsQuery, HistoryQuery};
use tradedash_core::chart::max_drawdown;
use tradedash_core::dashboard::{recent_fills, DashboardSummary, RECENT_FILLS};
use tradedash_core::domain::{
    AlpacaEnv, AlpacaKeys, BacktestResult, ComparisonRequest, DateRange, OrderRequest, OrderSide,
    OrderType, PeriodResult, TimeInForce, UnitProgressUpdate,
};
use tradedash_core::export::{
    backtest_csv, filter_logs, order_logs_csv, replay_csv, write_export,
};
use tradedash_core::forms::{
    validate_keys, validate_order, FieldErrors, ForgotPasswordForm, LoginForm, RegisterForm,
    ResetPasswordForm,
};
use tradedash_core::replay::{parse_symbols, ReplaySet};
use tradedash_core::strategy::{parse_date, ParamKind, ParameterForm, StrategyKind, STRATEGIES};
use tradedash_core::training::{AnswerSheet, UnitBody};
use tradedash_core::{ApiClient, ApiError, ClientConfig, SessionStore, SESSION_EXPIRED};

#[derive(Parser)]
#[command(name = "tradedash", about = "TradeDash trading platform client")]
struct Cli {
    /// Override the API base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and cache the session.
    Login {
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the cached session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// Create an account.
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Request a password reset email.
    ForgotPassword { email: String },
    /// Set a new password with a reset token.
    ResetPassword {
        token: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Verify an email address.
    Verify { token: String },
    /// Manage brokerage API keys.
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Account overview.
    Portfolio,
    /// Open positions.
    Positions,
    /// Equity history.
    PortfolioHistory {
        /// e.g. 1D, 1M, 1A
        #[arg(long)]
        period: Option<String>,
        /// e.g. 1Min, 1H, 1D
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Latest quote for a symbol.
    Quote { symbol: String },
    /// Price bars for a symbol.
    Bars {
        symbol: String,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Tradable symbols.
    Symbols {
        /// Case-insensitive filter on symbol or name.
        #[arg(long)]
        search: Option<String>,
    },
    /// Orders.
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Past orders.
    History,
    /// Account activities.
    Activities,
    /// List available strategies and their parameters.
    Strategies,
    /// Run a backtest.
    Backtest {
        #[command(flatten)]
        run: RunArgs,
        /// Write date,equity,drawdown CSV into this directory.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Run a strategy through its dedicated endpoint.
    RunStrategy {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Compare a strategy across two periods.
    Compare {
        #[arg(long)]
        strategy: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        a_from: String,
        #[arg(long)]
        a_to: String,
        #[arg(long)]
        b_from: String,
        #[arg(long)]
        b_to: String,
        #[arg(long)]
        include_news: bool,
    },
    /// Replay a strategy over one or more symbols.
    Replay {
        #[arg(long)]
        strategy: String,
        /// Comma-separated, e.g. AAPL,MSFT
        #[arg(long)]
        symbols: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Print every step instead of the summary only.
        #[arg(long)]
        steps: bool,
        /// Write the steps as CSV into this directory.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Order audit log.
    OrderLogs {
        /// Substring match on symbol or status.
        #[arg(long, default_value = "")]
        filter: String,
        /// Write the filtered log as CSV into this directory.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Notifications.
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },
    /// Training modules, units and progress.
    Training {
        #[command(subcommand)]
        action: TrainingAction,
    },
    /// Account summary with recent fills.
    Dashboard,
}

#[derive(Subcommand)]
enum KeysAction {
    /// Store keys and select the active environment.
    Set {
        #[arg(long, value_enum, default_value_t = EnvArg::Paper)]
        env: EnvArg,
        #[arg(long, default_value = "")]
        paper_key: String,
        #[arg(long, default_value = "")]
        paper_secret: String,
        #[arg(long, default_value = "")]
        live_key: String,
        #[arg(long, default_value = "")]
        live_secret: String,
    },
    /// Delete stored keys.
    Remove,
}

#[derive(Clone, Copy, ValueEnum)]
enum EnvArg {
    Paper,
    Live,
}

impl From<EnvArg> for AlpacaEnv {
    fn from(e: EnvArg) -> Self {
        match e {
            EnvArg::Paper => AlpacaEnv::Paper,
            EnvArg::Live => AlpacaEnv::Live,
        }
    }
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Open and recent orders.
    List,
    /// One order by id.
    Show { id: String },
    /// Place an order.
    New {
        symbol: String,
        qty: f64,
        #[arg(long, default_value = "buy")]
        side: OrderSide,
        #[arg(long = "type", default_value = "market")]
        order_type: OrderType,
        #[arg(long, default_value = "day")]
        tif: TimeInForce,
        #[arg(long)]
        limit_price: Option<f64>,
        #[arg(long)]
        stop_price: Option<f64>,
    },
    /// Cancel an order.
    Cancel { id: String },
}

#[derive(Subcommand)]
enum NotificationsAction {
    List,
    /// Ask the server to generate notifications, then list them.
    Poll,
    Read { id: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum TrainingAction {
    Modules,
    Module { id: String },
    /// Show a unit's content.
    Unit { id: String },
    /// Answer and complete a unit.
    Complete {
        id: String,
        /// Seconds spent on the unit.
        #[arg(long, default_value_t = 0)]
        time_spent: u64,
        /// `N=VALUE`, 1-based. Quiz: option number. Fill-in: text.
        /// Matching: definition number as listed by `training unit`.
        #[arg(long = "answer", value_parser = parse_answer)]
        answers: Vec<(usize, String)>,
    },
    Progress,
    /// Reset all training progress.
    Reset {
        #[arg(long)]
        yes: bool,
    },
    Achievements,
    Badges,
    Leaderboard,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Strategy id or endpoint slug (see `tradedash strategies`).
    #[arg(long)]
    strategy: String,
    #[arg(long)]
    symbol: String,
    #[arg(long, default_value = "2023-01-01")]
    from: String,
    #[arg(long, default_value = "2023-12-31")]
    to: String,
    /// `NAME=VALUE`, repeatable. Unset parameters use their defaults.
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, f64)>,
}

fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    Ok((name.trim().to_string(), value))
}

fn parse_answer(s: &str) -> Result<(usize, String), String> {
    let (idx, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected N=VALUE, got '{s}'"))?;
    let idx: usize = idx
        .trim()
        .parse()
        .map_err(|_| format!("'{idx}' is not an item number"))?;
    if idx == 0 {
        return Err("item numbers start at 1".into());
    }
    Ok((idx - 1, value.to_string()))
}

struct Ctx {
    client: ApiClient,
    session: SessionStore,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load()?;
    if let Some(url) = cli.base_url {
        config = config.with_base_url(url);
        config.validate()?;
    }
    init_tracing(&config.log_filter);
    tracing::debug!(base_url = %config.base_url, "using API");

    let mut client = ApiClient::new(&config)?;
    let session = SessionStore::open(&config.session_path);
    session.apply_to(&mut client);
    let mut ctx = Ctx { client, session };

    if let Err(e) = run(&mut ctx, cli.command) {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            if ctx.session.handle_auth_error(api) {
                eprintln!("{SESSION_EXPIRED}");
                std::process::exit(1);
            }
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(ctx: &mut Ctx, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email, password } => run_login(ctx, email, password),
        Commands::Logout => {
            ctx.session.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => run_whoami(ctx),
        Commands::Register {
            name,
            email,
            password,
        } => run_register(ctx, name, email, password),
        Commands::ForgotPassword { email } => {
            let form = ForgotPasswordForm { email };
            check_form(form.validate())?;
            let resp = ctx.client.forgot_password(form.email.trim())?;
            println!(
                "{}",
                resp.message
                    .unwrap_or_else(|| "If that email exists, a reset link has been sent.".into())
            );
            Ok(())
        }
        Commands::ResetPassword { token, password } => {
            let password = secret_or_prompt(password, "New password: ")?;
            let form = ResetPasswordForm {
                token,
                confirm_password: password.clone(),
                password,
            };
            check_form(form.validate())?;
            let resp = ctx.client.reset_password(form.token.trim(), &form.password)?;
            println!(
                "{}",
                resp.message.unwrap_or_else(|| "Password has been reset.".into())
            );
            Ok(())
        }
        Commands::Verify { token } => {
            let resp = ctx.client.verify_email(token.trim())?;
            println!(
                "{}",
                resp.message.unwrap_or_else(|| "Email verified.".into())
            );
            Ok(())
        }
        Commands::Keys { action } => run_keys(ctx, action),
        Commands::Portfolio => run_portfolio(ctx),
        Commands::Positions => run_positions(ctx),
        Commands::PortfolioHistory { period, timeframe } => {
            run_portfolio_history(ctx, HistoryQuery { period, timeframe })
        }
        Commands::Quote { symbol } => run_quote(ctx, &symbol),
        Commands::Bars {
            symbol,
            timeframe,
            start,
            end,
        } => run_bars(
            ctx,
            &symbol,
            BarsQuery {
                timeframe,
                start,
                end,
            },
        ),
        Commands::Symbols { search } => run_symbols(ctx, search.as_deref()),
        Commands::Orders { action } => run_orders(ctx, action),
        Commands::History => run_history(ctx),
        Commands::Activities => run_activities(ctx),
        Commands::Strategies => {
            print_strategies();
            Ok(())
        }
        Commands::Backtest { run, export } => run_backtest(ctx, &run, export),
        Commands::RunStrategy { run } => run_strategy(ctx, &run),
        Commands::Compare {
            strategy,
            symbol,
            a_from,
            a_to,
            b_from,
            b_to,
            include_news,
        } => run_compare(
            ctx,
            ComparisonRequest {
                strategy: resolve_strategy(&strategy)?.id().to_string(),
                symbol: symbol.trim().to_ascii_uppercase(),
                period_a: date_range("period A", &a_from, &a_to)?,
                period_b: date_range("period B", &b_from, &b_to)?,
                include_news,
            },
        ),
        Commands::Replay {
            strategy,
            symbols,
            from,
            to,
            steps,
            export,
        } => run_replay(ctx, &strategy, &symbols, from, to, steps, export),
        Commands::OrderLogs { filter, export } => run_order_logs(ctx, &filter, export),
        Commands::Notifications { action } => run_notifications(ctx, action),
        Commands::Training { action } => run_training(ctx, action),
        Commands::Dashboard => run_dashboard(ctx),
    }
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

fn secret_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn check_form(errors: FieldErrors) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    for (field, message) in errors.iter() {
        eprintln!("  {field}: {message}");
    }
    bail!("invalid input")
}

fn resolve_strategy(id: &str) -> Result<StrategyKind> {
    match StrategyKind::from_id(id) {
        Some(kind) => Ok(kind),
        None => bail!(
            "unknown strategy '{id}'. Available: {}",
            StrategyKind::ALL
                .iter()
                .map(|k| k.id())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn date_range(label: &str, from: &str, to: &str) -> Result<DateRange> {
    let start = parse_date(&format!("{label} start"), from)?;
    let end = parse_date(&format!("{label} end"), to)?;
    if start > end {
        bail!("{label}: start date must be on or before end date");
    }
    Ok(DateRange {
        from: start.to_string(),
        to: end.to_string(),
    })
}

fn build_form(run: &RunArgs) -> Result<ParameterForm> {
    let mut form = ParameterForm::new(resolve_strategy(&run.strategy)?);
    form.symbol = run.symbol.clone();
    form.from = parse_date("Start date", &run.from)?;
    form.to = parse_date("End date", &run.to)?;
    for (name, value) in &run.params {
        form.set_param(name, *value)?;
    }
    Ok(form)
}

fn money(v: Option<f64>) -> String {
    v.map(|x| format!("${x:.2}")).unwrap_or_else(|| "-".into())
}

fn or_dash(v: Option<&str>) -> &str {
    v.filter(|s| !s.is_empty()).unwrap_or("-")
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

fn run_login(ctx: &mut Ctx, email: String, password: Option<String>) -> Result<()> {
    let password = secret_or_prompt(password, "Password: ")?;
    let form = LoginForm { email, password };
    check_form(form.validate())?;
    let user = ctx
        .session
        .login(&mut ctx.client, form.email.trim(), &form.password)?;
    println!("Logged in as {} <{}>", user.name, user.email);
    Ok(())
}

fn run_whoami(ctx: &Ctx) -> Result<()> {
    match ctx.session.user() {
        Some(user) => {
            println!("{} <{}>", user.name, user.email);
            println!(
                "  Alpaca keys: {}",
                if user.has_alpaca_keys { "configured" } else { "not set" }
            );
            if let Some(env) = user.alpaca_env {
                println!("  Environment: {}", if env == AlpacaEnv::Live { "live" } else { "paper" });
            }
            println!("  Session file: {}", ctx.session.path().display());
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

fn run_register(ctx: &Ctx, name: String, email: String, password: Option<String>) -> Result<()> {
    let password = secret_or_prompt(password, "Password: ")?;
    let confirm = secret_or_prompt(None, "Confirm password: ")?;
    let form = RegisterForm {
        name,
        email,
        password,
        confirm_password: confirm,
    };
    check_form(form.validate())?;
    let resp = ctx
        .client
        .register(form.name.trim(), form.email.trim(), &form.password)?;
    println!(
        "{}",
        resp.message
            .unwrap_or_else(|| "Registration successful. Check your email to verify your account.".into())
    );
    Ok(())
}

fn run_keys(ctx: &mut Ctx, action: KeysAction) -> Result<()> {
    let resp = match action {
        KeysAction::Set {
            env,
            paper_key,
            paper_secret,
            live_key,
            live_secret,
        } => {
            let keys = AlpacaKeys {
                alpaca_paper_api_key: paper_key,
                alpaca_paper_secret_key: paper_secret,
                alpaca_live_api_key: live_key,
                alpaca_live_secret_key: live_secret,
                alpaca_env: env.into(),
            };
            check_form(validate_keys(&keys))?;
            ctx.client.update_alpaca_keys(&keys)?
        }
        KeysAction::Remove => ctx.client.remove_alpaca_keys()?,
    };
    if let Some(user) = resp.user {
        ctx.session.update_user(user)?;
    }
    println!("API keys updated.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Portfolio and market data
// ---------------------------------------------------------------------------

fn run_portfolio(ctx: &Ctx) -> Result<()> {
    let account = ctx.client.portfolio()?;
    println!("=== Portfolio ===");
    println!("  Portfolio value: {}", money(account.portfolio_value));
    println!("  Equity:          {}", money(account.equity));
    println!("  Cash:            {}", money(account.cash));
    println!("  Buying power:    {}", money(account.buying_power));
    println!("  Day change:      {}", money(account.day_change()));
    println!("  Status:          {}", or_dash(account.status.as_deref()));
    Ok(())
}

fn run_positions(ctx: &Ctx) -> Result<()> {
    let positions = ctx.client.positions()?;
    if positions.is_empty() {
        println!("No open positions.");
        return Ok(());
    }
    println!(
        "{:<8} {:>10} {:>12} {:>12} {:>14} {:>12} {:>8}",
        "Symbol", "Qty", "Avg Entry", "Price", "Market Value", "P/L", "P/L %"
    );
    println!("{}", "-".repeat(84));
    for p in &positions {
        println!(
            "{:<8} {:>10} {:>12.2} {:>12.2} {:>14.2} {:>12.2} {:>7.2}%",
            p.symbol,
            p.qty,
            p.avg_entry_price,
            p.current_price,
            p.market_value,
            p.unrealized_pl,
            p.unrealized_plpc * 100.0
        );
    }
    Ok(())
}

fn run_portfolio_history(ctx: &Ctx, query: HistoryQuery) -> Result<()> {
    let history = ctx.client.portfolio_history(&query)?;
    let equity = history.equity_filled();
    if equity.is_empty() {
        println!("No portfolio history.");
        return Ok(());
    }
    println!("{:<22} {:>14}", "Time", "Equity");
    for (ts, eq) in history.timestamp.iter().zip(&equity) {
        let when = chrono::DateTime::from_timestamp(*ts, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| ts.to_string());
        println!("{:<22} {:>14.2}", when, eq);
    }
    println!();
    println!("  Max drawdown: {:.2}%", max_drawdown(&equity) * 100.0);
    Ok(())
}

fn run_quote(ctx: &Ctx, symbol: &str) -> Result<()> {
    let symbol = symbol.trim().to_ascii_uppercase();
    let quote = ctx.client.quote(&symbol)?;
    println!("=== {} ===", quote.symbol.as_deref().unwrap_or(&symbol));
    println!("  Bid: {} x {}", money(quote.bid_price), quote.bid_size.unwrap_or(0.0));
    println!("  Ask: {} x {}", money(quote.ask_price), quote.ask_size.unwrap_or(0.0));
    println!("  Mid: {}", money(quote.mid()));
    println!("  At:  {}", or_dash(quote.timestamp.as_deref()));
    Ok(())
}

fn run_bars(ctx: &Ctx, symbol: &str, query: BarsQuery) -> Result<()> {
    let bars = ctx.client.bars(&symbol.trim().to_ascii_uppercase(), &query)?;
    if bars.is_empty() {
        println!("No bars.");
        return Ok(());
    }
    println!(
        "{:<22} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "Time", "Open", "High", "Low", "Close", "Volume"
    );
    for b in &bars {
        println!(
            "{:<22} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12.0}",
            b.timestamp, b.open, b.high, b.low, b.close, b.volume
        );
    }
    Ok(())
}

fn run_symbols(ctx: &Ctx, search: Option<&str>) -> Result<()> {
    let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    let symbols = ctx.client.symbols()?;
    for s in symbols.iter().filter(|s| {
        needle.is_empty()
            || s.symbol.to_lowercase().contains(&needle)
            || s.name.to_lowercase().contains(&needle)
    }) {
        println!("{:<8} {:<8} {}", s.symbol, s.exchange, s.name);
    }
    Ok(())
}

fn run_dashboard(ctx: &Ctx) -> Result<()> {
    let account = ctx.client.portfolio()?;
    let positions = ctx.client.positions()?;
    let logs = ctx.client.order_logs()?;
    let summary = DashboardSummary::build(Some(&account), &positions, &logs);

    println!("=== Dashboard ===");
    println!("  Portfolio value: {}", money(summary.portfolio_value));
    println!("  Buying power:    {}", money(summary.buying_power));
    println!("  Cash:            {}", money(summary.cash));
    println!("  Day change:      {}", money(summary.day_change));
    println!("  Open positions:  {}", summary.open_positions);
    println!("  Unrealized P/L:  ${:.2}", summary.unrealized_pl);
    println!("  Total trades:    {}", summary.total_trades);
    println!();
    println!("Recent fills:");
    let fills = recent_fills(&logs, RECENT_FILLS);
    if fills.is_empty() {
        println!("  (none)");
    }
    for log in fills {
        println!(
            "  {:<8} {:<5} {:>8} {}",
            or_dash(log.symbol.as_deref()),
            or_dash(log.side.as_deref()),
            log.qty.unwrap_or(0.0),
            or_dash(log.filled_at.as_deref().or(log.submitted_at.as_deref()))
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Orders and history
// ---------------------------------------------------------------------------

fn run_orders(ctx: &Ctx, action: OrdersAction) -> Result<()> {
    match action {
        OrdersAction::List => {
            let orders = ctx.client.orders()?;
            if orders.is_empty() {
                println!("No orders.");
                return Ok(());
            }
            println!(
                "{:<38} {:<8} {:<5} {:>8} {:<11} {:<10} {}",
                "ID", "Symbol", "Side", "Qty", "Type", "Status", "Created"
            );
            for o in &orders {
                println!(
                    "{:<38} {:<8} {:<5} {:>8} {:<11} {:<10} {}",
                    o.id,
                    o.symbol,
                    or_dash(o.side.as_deref()),
                    o.qty,
                    o.kind,
                    o.status,
                    or_dash(o.created_at.as_deref())
                );
            }
        }
        OrdersAction::Show { id } => {
            let o = ctx.client.order(&id)?;
            println!("=== Order {} ===", o.id);
            println!("  Symbol: {}", o.symbol);
            println!("  Side:   {}", or_dash(o.side.as_deref()));
            println!("  Qty:    {}", o.qty);
            println!("  Type:   {}", o.kind);
            println!("  Status: {} ({:?})", o.status, o.status_class());
            println!("  Filled: {}", money(o.filled_avg_price));
        }
        OrdersAction::New {
            symbol,
            qty,
            side,
            order_type,
            tif,
            limit_price,
            stop_price,
        } => {
            let mut order = OrderRequest {
                symbol,
                qty,
                side,
                order_type,
                time_in_force: tif,
                limit_price,
                stop_price,
            };
            check_form(validate_order(&mut order))?;
            let placed = ctx.client.create_order(&order)?;
            println!(
                "Order placed: {} {} {} ({})",
                order.side, order.qty, order.symbol, placed.id
            );
        }
        OrdersAction::Cancel { id } => {
            let resp = ctx.client.cancel_order(&id)?;
            println!(
                "{}",
                resp.message.unwrap_or_else(|| format!("Order {id} cancelled."))
            );
        }
    }
    Ok(())
}

fn run_history(ctx: &Ctx) -> Result<()> {
    let items = ctx.client.history()?;
    if items.is_empty() {
        println!("No order history.");
        return Ok(());
    }
    println!(
        "{:<8} {:>8} {:<11} {:<10} {:>10} {}",
        "Symbol", "Qty", "Type", "Status", "Price", "Created"
    );
    for h in &items {
        println!(
            "{:<8} {:>8} {:<11} {:<10} {:>10} {}",
            h.symbol,
            h.qty,
            h.kind,
            h.status,
            h.price.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".into()),
            or_dash(h.created_at.as_deref())
        );
    }
    Ok(())
}

fn run_activities(ctx: &Ctx) -> Result<()> {
    let items = ctx.client.activities()?;
    if items.is_empty() {
        println!("No activities.");
        return Ok(());
    }
    println!(
        "{:<12} {:<8} {:<5} {:>8} {:>10} {:>12} {}",
        "Type", "Symbol", "Side", "Qty", "Price", "Net", "When"
    );
    for a in &items {
        println!(
            "{:<12} {:<8} {:<5} {:>8} {:>10} {:>12} {}",
            a.activity_type,
            or_dash(a.symbol.as_deref()),
            or_dash(a.side.as_deref()),
            a.qty.map(|q| q.to_string()).unwrap_or_else(|| "-".into()),
            a.price.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".into()),
            a.net_amount.map(|n| format!("{n:.2}")).unwrap_or_else(|| "-".into()),
            or_dash(Some(a.when()))
        );
    }
    Ok(())
}

fn run_order_logs(ctx: &Ctx, filter: &str, export: Option<PathBuf>) -> Result<()> {
    let logs = ctx.client.order_logs()?;
    let selected = filter_logs(&logs, filter);
    println!(
        "{:<8} {:>8} {:<5} {:<11} {:<10} {:<26} {}",
        "Symbol", "Qty", "Side", "Type", "Status", "Submitted", "Error"
    );
    for log in &selected {
        println!(
            "{:<8} {:>8} {:<5} {:<11} {:<10} {:<26} {}",
            or_dash(log.symbol.as_deref()),
            log.qty.map(|q| q.to_string()).unwrap_or_else(|| "-".into()),
            or_dash(log.side.as_deref()),
            or_dash(log.kind.as_deref()),
            or_dash(log.status.as_deref()),
            or_dash(log.submitted_at.as_deref()),
            or_dash(log.error.as_deref())
        );
    }
    println!("{} of {} entries", selected.len(), logs.len());

    if let Some(dir) = export {
        match order_logs_csv(&selected)? {
            Some(csv) => {
                let path = write_export(&dir, "order_logs", &csv)?;
                println!("Exported to {}", path.display());
            }
            None => println!("Nothing to export."),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Strategies, backtests, comparison, replay
// ---------------------------------------------------------------------------

fn print_strategies() {
    for def in &STRATEGIES {
        println!("=== {} ({}) ===", def.label, def.kind.id());
        println!("  {}", def.description);
        for p in def.params {
            let range = match p.kind {
                ParamKind::Select => p
                    .options
                    .iter()
                    .map(|(_, label)| *label)
                    .collect::<Vec<_>>()
                    .join(" | "),
                _ => format!(
                    "{}..{} step {}",
                    p.format(p.min),
                    p.format(p.max),
                    p.format(p.step)
                ),
            };
            println!(
                "  {:<22} default {:<8} {}",
                p.name,
                p.format(p.default),
                range
            );
        }
        println!();
    }
}

fn print_result(title: &str, result: &BacktestResult) {
    println!("=== {title} ===");
    println!("  Points:        {}", result.dates.len());
    if let (Some(first), Some(last)) = (result.dates.first(), result.dates.last()) {
        println!("  Period:        {first} .. {last}");
    }
    println!("  Final equity:  {}", money(result.final_equity()));
    if let Some(r) = result.total_return() {
        println!("  Total return:  {:.2}%", r * 100.0);
    }
    println!(
        "  Max drawdown:  {:.2}%",
        max_drawdown(&result.equity_curve) * 100.0
    );
    for (name, value) in result.scalar_metrics() {
        println!("  {:<14} {:.4}", format!("{name}:"), value);
    }
}

fn run_backtest(ctx: &Ctx, run: &RunArgs, export: Option<PathBuf>) -> Result<()> {
    let form = build_form(run)?;
    let req = form.to_request()?;
    let result = ctx.client.run_backtest(&req)?;
    print_result(
        &format!("{} on {}", form.strategy().label(), req.symbol),
        &result,
    );
    if let Some(dir) = export {
        let csv = backtest_csv(&result)?;
        let path = write_export(&dir, &format!("backtest_{}", req.symbol), &csv)?;
        println!("Exported to {}", path.display());
    }
    Ok(())
}

fn run_strategy(ctx: &Ctx, run: &RunArgs) -> Result<()> {
    let form = build_form(run)?;
    let req = form.to_run_request()?;
    let result = ctx.client.run_strategy(form.strategy(), &req)?;
    print_result(
        &format!("{} on {}", form.strategy().label(), req.symbol),
        &result,
    );
    Ok(())
}

fn print_period(label: &str, range: &DateRange, period: &PeriodResult) {
    println!("--- {label}: {} .. {} ---", range.from, range.to);
    println!(
        "  Final equity: {}",
        money(period.equity_curve.last().copied())
    );
    println!(
        "  Max drawdown: {:.2}%",
        max_drawdown(&period.equity_curve) * 100.0
    );
    println!(
        "  Trades:       {} ({} wins / {} losses, {:.1}% win rate)",
        period.trades.len(),
        period.win_loss.wins,
        period.win_loss.losses,
        period.win_loss.win_rate
    );
    if let Some(v) = period.volatility {
        println!("  Volatility:   {v:.4}");
    }
}

fn run_compare(ctx: &Ctx, req: ComparisonRequest) -> Result<()> {
    let result = ctx.client.market_event_comparison(&req)?;
    println!("=== {} on {} ===", req.strategy, req.symbol);
    print_period("Period A", &req.period_a, &result.period_a);
    print_period("Period B", &req.period_b, &result.period_b);
    if let Some(score) = result.confidence_score {
        println!();
        println!("  Confidence score: {score:.2}");
    }
    if req.include_news {
        println!("  News headlines: not implemented");
    }
    Ok(())
}

fn run_replay(
    ctx: &Ctx,
    strategy: &str,
    symbols: &str,
    from: Option<String>,
    to: Option<String>,
    show_steps: bool,
    export: Option<PathBuf>,
) -> Result<()> {
    let kind = resolve_strategy(strategy)?;
    let symbols = parse_symbols(symbols);
    if symbols.is_empty() {
        bail!("Please enter at least one symbol");
    }
    let from = from.map(|s| parse_date("Start date", &s)).transpose()?;
    let to = to.map(|s| parse_date("End date", &s)).transpose()?;

    let set = ReplaySet::fetch(&ctx.client, kind.id(), &symbols, from, to)?;
    for (symbol, outcome) in set.entries() {
        match outcome {
            Ok(replay) => {
                let s = &replay.summary;
                println!("=== {symbol} ===");
                println!("  Steps:        {}", replay.steps.len());
                println!("  Final equity: {}", money(s.final_equity));
                println!(
                    "  Trades:       {} ({} wins / {} losses)",
                    s.total_trades, s.wins, s.losses
                );
                if let Some(rate) = s.win_rate {
                    println!("  Win rate:     {rate:.1}%");
                }
                if show_steps {
                    println!("  {:<12} {:>10} {:<5} {:>12}", "Date", "Price", "Act", "Equity");
                    for step in &replay.steps {
                        println!(
                            "  {:<12} {:>10} {:<5} {:>12.2}",
                            step.date,
                            step.price.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".into()),
                            step.action.as_str(),
                            step.equity
                        );
                    }
                }
            }
            Err(message) => println!("=== {symbol} === failed: {message}"),
        }
    }

    if let Some(dir) = export {
        if set.loaded().next().is_none() {
            println!("Nothing to export.");
        } else {
            let path = write_export(&dir, "portfolio_replay", &replay_csv(&set)?)?;
            println!("Exported to {}", path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

fn run_notifications(ctx: &Ctx, action: NotificationsAction) -> Result<()> {
    match action {
        NotificationsAction::List => print_notifications(ctx),
        NotificationsAction::Poll => {
            ctx.client.poll_notifications()?;
            print_notifications(ctx)
        }
        NotificationsAction::Read { id } => {
            ctx.client.mark_notification_read(&id)?;
            println!("Marked {id} as read.");
            Ok(())
        }
        NotificationsAction::Delete { id } => {
            ctx.client.delete_notification(&id)?;
            println!("Deleted {id}.");
            Ok(())
        }
    }
}

fn print_notifications(ctx: &Ctx) -> Result<()> {
    let items = ctx.client.notifications()?;
    if items.is_empty() {
        println!("No notifications.");
        return Ok(());
    }
    let unread = items.iter().filter(|n| !n.read).count();
    println!("{} notifications, {} unread", items.len(), unread);
    for n in &items {
        println!(
            "{} {:<10} {:<20} {}  {}",
            if n.read { " " } else { "*" },
            n.id,
            n.title(),
            n.message,
            or_dash(n.created_at.as_deref())
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

/// Stable per-unit seed so `training unit` and `training complete` agree on
/// the matching definition order.
fn unit_rng(unit_id: &str) -> StdRng {
    let seed: [u8; 32] = *blake3::hash(unit_id.as_bytes()).as_bytes();
    StdRng::from_seed(seed)
}

fn print_body(body: &UnitBody, sheet: &AnswerSheet) {
    match body {
        UnitBody::Definition {
            definition,
            explanation,
        } => {
            println!("{definition}");
            if let Some(e) = explanation {
                println!();
                println!("{e}");
            }
        }
        UnitBody::Example {
            example,
            key_points,
        } => {
            println!("{example}");
            if !key_points.is_empty() {
                println!();
                println!("Key points:");
                for point in key_points {
                    println!("  - {point}");
                }
            }
        }
        UnitBody::FillBlank(questions) => {
            for (i, q) in questions.iter().enumerate() {
                println!("{}. {}", i + 1, q.text);
            }
        }
        UnitBody::Matching { terms, .. } => {
            println!("Terms:");
            for (i, term) in terms.iter().enumerate() {
                println!("  {}. {term}", i + 1);
            }
            println!("Definitions:");
            for (i, def) in sheet.shuffled_definitions(body).iter().enumerate() {
                println!("  {}. {def}", i + 1);
            }
        }
        UnitBody::Flashcard { question, answer } => {
            println!("Q: {question}");
            println!("A: {answer}");
        }
        UnitBody::Quiz(questions) => {
            for (i, q) in questions.iter().enumerate() {
                println!(
                    "{}. {}",
                    i + 1,
                    q.question.as_deref().unwrap_or("Select the correct answer")
                );
                for (j, opt) in q.options.iter().enumerate() {
                    println!("   {}) {opt}", j + 1);
                }
            }
        }
        UnitBody::Text(text) => println!("{text}"),
    }
}

fn run_training(ctx: &Ctx, action: TrainingAction) -> Result<()> {
    match action {
        TrainingAction::Modules => {
            let modules = ctx.client.modules()?;
            println!(
                "{:<6} {:<36} {:<14} {:>9} {}",
                "ID", "Title", "Phase", "Progress", ""
            );
            for m in &modules {
                println!(
                    "{:<6} {:<36} {:<14} {:>3}/{:<3} {:>3.0}% {}",
                    m.id,
                    m.title,
                    m.phase,
                    m.completed_units,
                    m.total_units,
                    m.progress,
                    if m.is_unlocked { "" } else { "(locked)" }
                );
            }
        }
        TrainingAction::Module { id } => {
            let module = ctx.client.module(&id)?;
            println!("=== {} ===", module.summary.title);
            println!("  {}", module.summary.description);
            println!(
                "  {} of {} units completed",
                module.completed_count(),
                module.units.len()
            );
            for u in &module.units {
                println!(
                    "  [{}] {:<6} {:<12} {}",
                    if u.is_completed { "x" } else { " " },
                    u.id,
                    u.unit_type,
                    u.title
                );
            }
        }
        TrainingAction::Unit { id } => {
            let unit = ctx.client.unit(&id)?;
            let body = UnitBody::parse(&unit.unit_type, &unit.content);
            let sheet = AnswerSheet::with_rng(&body, &mut unit_rng(&unit.id));
            println!("=== {} ({}) ===", unit.title, body.unit_type().label());
            if let Some(m) = &unit.module {
                println!("Module: {}", m.title);
            }
            println!();
            print_body(&body, &sheet);
            if unit.is_completed {
                println!();
                println!("(completed)");
            }
        }
        TrainingAction::Complete {
            id,
            time_spent,
            answers,
        } => {
            let unit = ctx.client.unit(&id)?;
            let body = UnitBody::parse(&unit.unit_type, &unit.content);
            let payload = grade(&unit.id, &body, &answers, time_spent)?;
            ctx.client.update_unit_progress(&unit.id, &payload)?;
            match payload.score {
                Some(score) => println!("Score: {score}%"),
                None => println!("Unit completed."),
            }
            println!("Tokens earned: {}", payload.tokens_earned);
        }
        TrainingAction::Progress => {
            let p = ctx.client.progress()?;
            println!("=== Training progress ===");
            println!("  Phase:           {}", p.current_phase);
            println!(
                "  Units:           {}/{} ({:.0}%)",
                p.completed_units,
                p.total_units,
                p.percent()
            );
            println!("  Quizzes:         {}", p.completed_quizzes);
            println!("  Tokens:          {}", p.total_tokens);
            println!("  Streak:          {} days", p.streak_days);
            println!("  Achievements:    {}", p.achievements);
            println!("  Badges:          {}", p.badges);
        }
        TrainingAction::Reset { yes } => {
            if !yes {
                bail!("this erases all training progress; pass --yes to confirm");
            }
            ctx.client.reset_progress()?;
            println!("Training progress reset.");
        }
        TrainingAction::Achievements => {
            for a in ctx.client.achievements()? {
                println!(
                    "[{}] {} {:<28} +{:<4} {}",
                    if a.earned { "x" } else { " " },
                    a.icon,
                    a.name,
                    a.tokens_reward,
                    a.description
                );
            }
        }
        TrainingAction::Badges => {
            for b in ctx.client.badges()? {
                println!(
                    "[{}] {} {:<28} {}",
                    if b.earned { "x" } else { " " },
                    b.icon,
                    b.name,
                    b.requirement
                );
            }
        }
        TrainingAction::Leaderboard => {
            println!(
                "{:<4} {:<24} {:>8} {:<14} {:>6}",
                "#", "Name", "Tokens", "Phase", "Units"
            );
            for (rank, e) in ctx.client.leaderboard()?.iter().enumerate() {
                println!(
                    "{:<4} {:<24} {:>8} {:<14} {:>6}",
                    rank + 1,
                    e.name,
                    e.tokens,
                    e.current_phase,
                    e.completed_units
                );
            }
        }
    }
    Ok(())
}

/// Apply command-line answers to a fresh sheet and build the completion body.
fn grade(
    unit_id: &str,
    body: &UnitBody,
    answers: &[(usize, String)],
    time_spent: u64,
) -> Result<UnitProgressUpdate> {
    let mut sheet = AnswerSheet::with_rng(body, &mut unit_rng(unit_id));
    for (idx, value) in answers {
        match body {
            UnitBody::Quiz(_) | UnitBody::Matching { .. } => {
                let n: usize = value
                    .trim()
                    .parse()
                    .with_context(|| format!("answer {} must be a number", idx + 1))?;
                if n == 0 {
                    bail!("answer {} must be 1 or more", idx + 1);
                }
                if matches!(body, UnitBody::Quiz(_)) {
                    sheet.choose(*idx, n - 1);
                } else {
                    sheet.assign(*idx, n - 1);
                }
            }
            UnitBody::FillBlank(_) => sheet.set_blank(*idx, value.clone()),
            _ => bail!("this unit takes no answers"),
        }
    }
    if body.unit_type().requires_submission() {
        sheet.submit(body)?;
    }
    Ok(sheet.completion_payload(body, time_spent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradedash_core::training::QuizQuestion;

    #[test]
    fn param_pairs_parse() {
        assert_eq!(parse_param("window=20").unwrap(), ("window".into(), 20.0));
        assert!(parse_param("window").is_err());
        assert!(parse_param("window=abc").is_err());
    }

    #[test]
    fn answers_are_one_based() {
        assert_eq!(parse_answer("2=b").unwrap(), (1, "b".into()));
        assert!(parse_answer("0=a").is_err());
    }

    #[test]
    fn unit_rng_is_stable() {
        let body = UnitBody::Matching {
            terms: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            definitions: vec!["1".into(), "2".into(), "3".into(), "4".into()],
        };
        let first = AnswerSheet::with_rng(&body, &mut unit_rng("u-7"));
        let second = AnswerSheet::with_rng(&body, &mut unit_rng("u-7"));
        assert_eq!(
            first.shuffled_definitions(&body),
            second.shuffled_definitions(&body)
        );
    }

    #[test]
    fn unit_rng_depends_on_unit_id() {
        use rand::RngCore;
        let draws = |id: &str| {
            let mut rng = unit_rng(id);
            [rng.next_u64(), rng.next_u64()]
        };
        assert_eq!(draws("u-7"), draws("u-7"));
        assert_ne!(draws("u-7"), draws("u-8"));
    }

    #[test]
    fn grade_quiz() {
        let body = UnitBody::Quiz(vec![
            QuizQuestion {
                question: Some("2+2".into()),
                options: vec!["3".into(), "4".into()],
                correct_answer: 1,
            },
            QuizQuestion {
                question: None,
                options: vec!["x".into(), "y".into()],
                correct_answer: 0,
            },
        ]);
        let payload = grade("q", &body, &[(0, "2".into()), (1, "1".into())], 10).unwrap();
        assert_eq!(payload.score, Some(100));
        assert_eq!(payload.tokens_earned, 20);
        assert!(grade("q", &body, &[(0, "2".into())], 10).is_err());
    }

    #[test]
    fn strategy_lookup_lists_choices() {
        let err = resolve_strategy("nope").unwrap_err().to_string();
        assert!(err.starts_with("unknown strategy 'nope'"));
        assert!(err.contains("basicMomentum"));
        assert_eq!(
            resolve_strategy("volatility-breakout").unwrap(),
            StrategyKind::VolatilityBreakout
        );
    }

    #[test]
    fn cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "tradedash",
            "orders",
            "new",
            "aapl",
            "5",
            "--side",
            "sell",
            "--type",
            "limit",
            "--limit-price",
            "190.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Orders {
                action:
                    OrdersAction::New {
                        side, order_type, ..
                    },
            } => {
                assert_eq!(side, OrderSide::Sell);
                assert_eq!(order_type, OrderType::Limit);
            }
            _ => panic!("wrong command"),
        }
    }
}
