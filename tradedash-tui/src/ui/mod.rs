//! Top-level UI layout: one panel at a time with a status bar.

pub mod auth;
pub mod backtest_panel;
pub mod compare_panel;
pub mod dashboard_panel;
pub mod help_panel;
pub mod history_panel;
pub mod orders_panel;
pub mod overlays;
pub mod portfolio_panel;
pub mod replay_panel;
pub mod settings_panel;
pub mod status_bar;
pub mod training_panel;
pub mod widgets;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

use crate::app::{AppState, Overlay, Panel};
use crate::theme;

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &AppState) {
    // Split: main area + 1-line status bar.
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let main_area = chunks[0];
    let status_area = chunks[1];

    draw_panel(f, main_area, app);
    status_bar::render(f, status_area, app);

    match app.overlay {
        Overlay::Welcome => overlays::render_welcome(f, main_area, app),
        Overlay::Auth => auth::render(f, main_area, app),
        Overlay::NewOrder => overlays::render_new_order(f, main_area, app),
        Overlay::Unit => training_panel::render_unit(f, main_area, app),
        Overlay::Gamification => overlays::render_gamification(f, main_area, app),
        Overlay::Notifications => overlays::render_notifications(f, main_area, app),
        Overlay::ErrorHistory => overlays::render_error_history(f, main_area, app),
        Overlay::ConfirmReset => overlays::render_confirm_reset(f, main_area),
        Overlay::None => {}
    }
}

fn draw_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let panel = app.active_panel;

    let mut title = format!(" {} [{}] ", panel.label(), panel.hotkey());
    if app.is_busy() {
        title.push_str("(loading...) ");
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(true))
        .title(title)
        .title_style(theme::panel_title(true));

    let inner = block.inner(area);
    f.render_widget(block, area);

    if !app.is_logged_in() && panel != Panel::Help {
        widgets::empty_message(f, inner, &["Log in to load your account."]);
        return;
    }

    match panel {
        Panel::Dashboard => dashboard_panel::render(f, inner, app),
        Panel::Backtest => backtest_panel::render(f, inner, app),
        Panel::Portfolio => portfolio_panel::render(f, inner, app),
        Panel::Orders => orders_panel::render(f, inner, app),
        Panel::History => history_panel::render(f, inner, app),
        Panel::Replay => replay_panel::render(f, inner, app),
        Panel::Compare => compare_panel::render(f, inner, app),
        Panel::Training => training_panel::render(f, inner, app),
        Panel::Settings => settings_panel::render(f, inner, app),
        Panel::Help => help_panel::render(f, inner, app),
    }
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
