//! Login / register / password reset / email verification screens.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{AppState, AuthScreen, StatusLevel};
use crate::theme;
use crate::ui::centered_rect;

/// Field label → key used by the core validators.
fn error_key(screen: AuthScreen, label: &str) -> &'static str {
    match (screen, label) {
        (_, "Name") => "name",
        (_, "Email") => "email",
        (AuthScreen::Reset, "Reset token") => "token",
        (AuthScreen::Verify, "Verification token") => "token",
        (_, "Password") | (_, "New password") => "password",
        (_, "Confirm password") => "confirmPassword",
        _ => "",
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let auth = &app.auth;
    let popup = centered_rect(60, 70, area);
    f.render_widget(Clear, popup);

    let mut lines = vec![
        Line::from(Span::styled("TradeDash", theme::accent_bold())),
        Line::from(""),
    ];

    if let Some((msg, level)) = &auth.message {
        let style = match level {
            StatusLevel::Info => theme::positive(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        lines.push(Line::from(Span::styled(msg.clone(), style)));
        lines.push(Line::from(""));
    }

    for (i, field) in auth.form.fields.iter().enumerate() {
        let focused = i == auth.form.focus;
        let marker = if focused { "> " } else { "  " };
        let value = if focused {
            Span::styled(format!("{}_", field.display()), theme::accent())
        } else {
            Span::styled(field.display(), theme::text())
        };
        lines.push(Line::from(vec![
            Span::styled(marker, theme::accent()),
            Span::styled(format!("{:<18}", field.label), theme::muted()),
            value,
        ]));
        if let Some(err) = auth.errors.get(error_key(auth.screen, field.label)) {
            lines.push(Line::from(Span::styled(
                format!("  {:<18}{err}", ""),
                theme::negative(),
            )));
        }
    }

    lines.push(Line::from(""));
    let hint = match auth.screen {
        AuthScreen::Login => {
            "Enter: log in   Ctrl+R: register   Ctrl+F: forgot password   Ctrl+V: verify email   Esc: quit"
        }
        AuthScreen::Register => "Enter: create account   Ctrl+L: back to login   Esc: back",
        AuthScreen::Forgot => "Enter: send reset link   Ctrl+T: have a token   Esc: back",
        AuthScreen::Reset => "Enter: reset password   Ctrl+L: back to login   Esc: back",
        AuthScreen::Verify => "Enter: verify email   Ctrl+L: back to login   Esc: back",
    };
    lines.push(Line::from(Span::styled(hint, theme::muted())));
    if app.is_busy() {
        lines.push(Line::from(Span::styled("Working...", theme::warning())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(format!(" {} ", auth.screen.title()))
        .title_style(theme::accent_bold());

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup,
    );
}
