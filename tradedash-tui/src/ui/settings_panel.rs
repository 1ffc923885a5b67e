//! Panel 9: account info and Alpaca API keys.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use tradedash_core::domain::AlpacaEnv;

use crate::app::{AppState, EditTarget, KEY_FIELDS};
use crate::theme;
use crate::ui::widgets::form_row;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(8)])
        .split(area);

    render_user(f, chunks[0], app);
    render_keys(f, chunks[1], app);
}

fn render_user(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(user) = app.current_user() else {
        return;
    };
    let keys = if user.has_alpaca_keys {
        Span::styled("configured", theme::positive())
    } else {
        Span::styled("not configured", theme::warning())
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("Name    ", theme::muted()),
            Span::styled(user.name.clone(), theme::text()),
        ]),
        Line::from(vec![
            Span::styled("Email   ", theme::muted()),
            Span::styled(user.email.clone(), theme::text()),
        ]),
        Line::from(vec![Span::styled("Keys    ", theme::muted()), keys]),
    ];
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(theme::muted());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_keys(f: &mut Frame, area: Rect, app: &AppState) {
    let s = &app.settings;
    let env = match s.env {
        AlpacaEnv::Paper => "< Paper >",
        AlpacaEnv::Live => "< Live >",
    };
    let mut lines = vec![form_row("Environment", env.to_string(), s.cursor == 0, None)];

    for (i, label) in KEY_FIELDS.iter().enumerate() {
        let editing = app
            .edit
            .as_ref()
            .filter(|e| e.target == EditTarget::ApiKey(i))
            .map(|e| e.buffer.as_str());
        let field = &s.keys.fields[i];
        let value = if field.value.is_empty() {
            "(empty)".to_string()
        } else if s.show_keys {
            field.value.clone()
        } else {
            field.display()
        };
        lines.push(form_row(label, value, s.cursor == i + 1, editing));
    }

    lines.push(Line::from(""));
    for (field, message) in s.errors.iter() {
        lines.push(Line::from(Span::styled(
            format!("{field}: {message}"),
            theme::negative(),
        )));
    }
    if s.env == AlpacaEnv::Live {
        lines.push(Line::from(Span::styled(
            "Live trading uses real money.",
            theme::warning(),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Enter edit  v show/hide  s save  D remove keys  L log out",
        theme::muted(),
    )));
    f.render_widget(Paragraph::new(lines), area);
}
