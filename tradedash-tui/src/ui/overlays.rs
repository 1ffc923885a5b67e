//! Modal overlays drawn on top of the active panel.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{AppState, GamificationTab, OrderRow};
use crate::theme::{self, THEME};
use crate::ui::centered_rect;
use crate::ui::widgets::{or_dash, scroll_offset};

fn popup_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(format!(" {title} "))
        .title_style(theme::accent_bold())
}

pub fn render_welcome(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(60, 50, area);
    f.render_widget(Clear, popup);

    let name = app.current_user().map_or("trader", |u| u.name.as_str());
    let lines = vec![
        Line::from(Span::styled(format!("Welcome, {name}"), theme::accent_bold())),
        Line::from(""),
        Line::from("Paper-trade, backtest strategies and work through the training"),
        Line::from("modules, all from the terminal."),
        Line::from(""),
        Line::from(Span::styled("  1-9, 0   switch panels", theme::muted())),
        Line::from(Span::styled("  j/k      move    h/l  adjust", theme::muted())),
        Line::from(Span::styled("  g        run     x    export CSV", theme::muted())),
        Line::from(Span::styled("  N        notifications   e  error log", theme::muted())),
        Line::from(Span::styled("  ?        help    q    quit", theme::muted())),
        Line::from(""),
        Line::from(Span::styled("Press any key to continue", theme::warning())),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .block(popup_block("TradeDash"))
            .wrap(Wrap { trim: false }),
        popup,
    );
}

pub fn render_error_history(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let mut lines: Vec<Line> = Vec::new();
    if app.error_history.is_empty() {
        lines.push(Line::from(Span::styled("No errors recorded.", theme::muted())));
    }
    for record in app.error_history.iter().skip(app.error_scroll) {
        lines.push(Line::from(vec![
            Span::styled(
                record.timestamp.format("%H:%M:%S ").to_string(),
                theme::muted(),
            ),
            Span::styled(format!("[{}] ", record.category.label()), theme::warning()),
            Span::styled(record.message.clone(), theme::negative()),
        ]));
        if !record.context.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("         {}", record.context),
                theme::muted(),
            )));
        }
    }

    f.render_widget(
        Paragraph::new(lines)
            .block(popup_block(&format!(
                "Errors ({})  j/k scroll  Esc close",
                app.error_history.len()
            )))
            .wrap(Wrap { trim: false }),
        popup,
    );
}

pub fn render_notifications(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(70, 70, area);
    f.render_widget(Clear, popup);

    let height = popup.height.saturating_sub(2) as usize / 2;
    let start = scroll_offset(app.notification_cursor, height);
    let mut lines: Vec<Line> = Vec::new();
    if app.notifications.is_empty() {
        lines.push(Line::from(Span::styled("No notifications.", theme::muted())));
    }
    for (i, n) in app.notifications.items().iter().enumerate().skip(start) {
        let selected = i == app.notification_cursor;
        let dot = if n.read { "  " } else { "● " };
        let title_style = if selected {
            theme::selected()
        } else if n.read {
            theme::muted()
        } else {
            theme::accent_bold()
        };
        lines.push(Line::from(vec![
            Span::styled(dot, theme::warning()),
            Span::styled(n.title().to_string(), title_style),
            Span::styled(format!("  {}", or_dash(n.created_at.as_deref())), theme::muted()),
        ]));
        lines.push(Line::from(Span::styled(format!("  {}", n.message), theme::text())));
    }

    let title = format!(
        "Notifications ({} unread)  r read  d delete  Esc close",
        app.notifications.unread_count()
    );
    f.render_widget(
        Paragraph::new(lines)
            .block(popup_block(&title))
            .wrap(Wrap { trim: false }),
        popup,
    );
}

pub fn render_confirm_reset(f: &mut Frame, area: Rect) {
    let popup = centered_rect(50, 25, area);
    f.render_widget(Clear, popup);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Reset all training progress? Tokens, badges and completed units",
            theme::warning(),
        )),
        Line::from(Span::styled("will be cleared.", theme::warning())),
        Line::from(""),
        Line::from(Span::styled("y: reset   any other key: cancel", theme::muted())),
    ];
    f.render_widget(
        Paragraph::new(lines).block(popup_block("Reset progress")),
        popup,
    );
}

pub fn render_new_order(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(55, 60, area);
    f.render_widget(Clear, popup);
    let form = &app.new_order;

    let mut lines = vec![Line::from("")];
    for (i, row) in OrderRow::ALL.iter().enumerate() {
        let selected = i == form.row;
        let text = form.text(*row);
        let value = if row.is_text() {
            if selected {
                format!("{text}_")
            } else {
                text
            }
        } else {
            format!("< {text} >")
        };
        let style = match row {
            OrderRow::Side => ratatui::style::Style::default().fg(THEME.side_color(&form.text(*row))),
            _ if selected => theme::selected(),
            _ => theme::text(),
        };
        lines.push(Line::from(vec![
            Span::styled(if selected { "> " } else { "  " }, theme::accent()),
            Span::styled(format!("{:<16}", row.label()), theme::muted()),
            Span::styled(value, style),
        ]));
    }

    if !form.errors.is_empty() {
        lines.push(Line::from(""));
        for (_, msg) in form.errors.iter() {
            lines.push(Line::from(Span::styled(format!("  {msg}"), theme::negative())));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Up/Down field  Left/Right change  Enter submit  Esc cancel",
        theme::muted(),
    )));

    f.render_widget(Paragraph::new(lines).block(popup_block("New order")), popup);
}

pub fn render_gamification(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(75, 75, area);
    f.render_widget(Clear, popup);
    let g = &app.gamification;

    let tabs: Vec<Span> = [
        GamificationTab::Achievements,
        GamificationTab::Badges,
        GamificationTab::Leaderboard,
    ]
    .iter()
    .flat_map(|t| {
        let style = if *t == g.tab {
            theme::selected()
        } else {
            theme::muted()
        };
        [Span::styled(format!(" {} ", t.label()), style), Span::raw(" ")]
    })
    .collect();

    let mut lines = vec![Line::from(tabs), Line::from("")];
    let earned = |yes: bool| {
        if yes {
            Span::styled("✓ ", theme::positive())
        } else {
            Span::styled("  ", theme::muted())
        }
    };

    match g.tab {
        GamificationTab::Achievements => {
            for a in g.achievements.iter().skip(g.scroll) {
                lines.push(Line::from(vec![
                    earned(a.earned),
                    Span::styled(format!("{} {:<28}", a.icon, a.name), theme::text()),
                    Span::styled(format!("+{:<5}", a.tokens_reward), theme::warning()),
                    Span::styled(a.description.clone(), theme::muted()),
                ]));
            }
        }
        GamificationTab::Badges => {
            for b in g.badges.iter().skip(g.scroll) {
                lines.push(Line::from(vec![
                    earned(b.earned),
                    Span::styled(format!("{} {:<28}", b.icon, b.name), theme::text()),
                    Span::styled(b.requirement.clone(), theme::muted()),
                ]));
            }
        }
        GamificationTab::Leaderboard => {
            lines.push(Line::from(Span::styled(
                format!("{:<5}{:<24}{:>8}  {:<14}{:>6}", "#", "Name", "Tokens", "Phase", "Units"),
                theme::neutral(),
            )));
            let me = app.current_user().map(|u| u.id.as_str());
            for (i, e) in g.leaderboard.iter().enumerate().skip(g.scroll) {
                let style = if Some(e.id.as_str()) == me {
                    theme::accent_bold()
                } else {
                    theme::text()
                };
                lines.push(Line::from(Span::styled(
                    format!(
                        "{:<5}{:<24}{:>8}  {:<14}{:>6}",
                        i + 1,
                        e.name,
                        e.tokens,
                        e.current_phase,
                        e.completed_units
                    ),
                    style,
                )));
            }
        }
    }

    f.render_widget(
        Paragraph::new(lines).block(popup_block("Achievements  Tab switch  Esc close")),
        popup,
    );
}
