//! Bottom status bar: user, unread count, last status message.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{AppState, Panel, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = Vec::new();

    let hints: Vec<String> = Panel::ALL
        .iter()
        .map(|p| format!("{}:{}", p.hotkey(), p.label()))
        .collect();
    spans.push(Span::styled(format!(" {}", hints.join(" ")), theme::muted()));
    spans.push(Span::raw(" | "));

    match app.current_user() {
        Some(user) => {
            spans.push(Span::styled(user.name.clone(), theme::accent()));
            let unread = app.notifications.unread_count();
            if unread > 0 {
                spans.push(Span::styled(format!(" [{unread} new, N]"), theme::warning()));
            }
        }
        None => spans.push(Span::styled("logged out", theme::muted())),
    }

    spans.push(Span::raw(" | "));

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
