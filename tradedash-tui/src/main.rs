use std::fs::{self, File};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use tradedash_core::config::app_dir;
use tradedash_core::{ApiClient, ClientConfig, SessionStore};
use tradedash_tui::worker::{self, WorkerCommand};
use tradedash_tui::{input, persistence, response, ui, AppState};

fn main() -> Result<()> {
    // Restore the terminal before the default hook prints the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    let config = ClientConfig::load().context("loading configuration")?;
    init_tracing(&config.log_filter)?;

    let state_path = app_dir().join("ui_state.json");
    let export_dir = dirs::download_dir().unwrap_or_else(|| app_dir().join("exports"));
    let persisted = persistence::load(&state_path);

    let session = SessionStore::open(config.session_path.clone());
    let mut client = ApiClient::new(&config)?;
    session.apply_to(&mut client);
    info!(base_url = client.base_url(), logged_in = session.is_logged_in(), "starting");

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle =
        worker::spawn_worker(client, cmd_rx, resp_tx).context("spawning worker thread")?;

    let mut app = AppState::new(cmd_tx.clone(), resp_rx, session, export_dir, Instant::now());
    persistence::apply(&mut app, persisted);
    if app.is_logged_in() {
        app.on_login(Instant::now());
    }

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    if let Err(e) = persistence::save(&state_path, &persistence::extract(&app)) {
        warn!(error = %e, "could not save UI state");
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Log to a file: stderr belongs to the terminal UI.
fn init_tracing(filter: &str) -> Result<()> {
    let dir = app_dir();
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path: PathBuf = dir.join("tradedash.log");
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let now = Instant::now();
        while let Ok(resp) = app.worker_rx.try_recv() {
            response::handle_worker_response(app, resp, now);
        }
        app.tick(now);

        // 50ms poll gives roughly 20 FPS.
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key, Instant::now());
            }
        }

        if !app.running {
            break;
        }
    }
    Ok(())
}
