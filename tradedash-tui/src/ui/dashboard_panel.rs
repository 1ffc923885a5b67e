//! Panel 1: account summary, recent fills and the filterable order log.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use tradedash_core::dashboard::{recent_fills, DashboardSummary, RECENT_FILLS};
use tradedash_core::domain::{OrderLog, OrderStatus};

use crate::app::{AppState, EditTarget};
use crate::theme::{self, THEME};
use crate::ui::widgets::{money, or_dash, scroll_offset, signed_money};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(RECENT_FILLS as u16 + 2),
            Constraint::Min(5),
        ])
        .split(area);

    render_summary(f, chunks[0], app);
    render_recent(f, chunks[1], app);
    render_logs(f, chunks[2], app);
}

fn render_summary(f: &mut Frame, area: Rect, app: &AppState) {
    let d = &app.dashboard;
    let s = DashboardSummary::build(d.account.as_ref(), &d.positions, &d.logs);

    let stat = |label: &str, value: String, style: Style| {
        vec![
            Span::styled(format!("{label}: "), theme::muted()),
            Span::styled(format!("{value:<16}"), style),
        ]
    };

    let mut row1 = stat("Portfolio", money(s.portfolio_value), theme::accent_bold());
    row1.extend(stat("Buying power", money(s.buying_power), theme::text()));
    row1.extend(stat("Cash", money(s.cash), theme::text()));

    let day = s.day_change.unwrap_or(0.0);
    let mut row2 = stat(
        "Day change",
        s.day_change.map_or("-".into(), signed_money),
        theme::pnl(day),
    );
    row2.extend(stat("Positions", s.open_positions.to_string(), theme::text()));
    row2.extend(stat(
        "Unrealized P/L",
        signed_money(s.unrealized_pl),
        theme::pnl(s.unrealized_pl),
    ));
    row2.extend(stat("Trades", s.total_trades.to_string(), theme::text()));

    let lines = vec![Line::from(""), Line::from(row1), Line::from(row2)];
    f.render_widget(Paragraph::new(lines), area);
}

fn render_recent(f: &mut Frame, area: Rect, app: &AppState) {
    let fills = recent_fills(&app.dashboard.logs, RECENT_FILLS);
    let mut lines: Vec<Line> = Vec::new();
    if fills.is_empty() {
        lines.push(Line::from(Span::styled("No filled orders yet.", theme::muted())));
    }
    for log in fills {
        let side = log.side.as_deref().unwrap_or("");
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<6}", side.to_uppercase()),
                Style::default().fg(THEME.side_color(side)),
            ),
            Span::styled(
                format!(
                    "{:<8}{:>8}  ",
                    or_dash(log.symbol.as_deref()),
                    log.qty.map(|q| q.to_string()).unwrap_or_default()
                ),
                theme::text(),
            ),
            Span::styled(
                or_dash(log.filled_at.as_deref().or(log.submitted_at.as_deref())).to_string(),
                theme::muted(),
            ),
        ]));
    }
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(theme::muted())
        .title(Span::styled(" Recent fills ", theme::neutral()));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_logs(f: &mut Frame, area: Rect, app: &AppState) {
    let d = &app.dashboard;
    let logs = d.filtered();

    let filter = match &app.edit {
        Some(edit) if edit.target == EditTarget::LogFilter => {
            Span::styled(format!("/{}_", edit.buffer), theme::warning())
        }
        _ if !d.filter.is_empty() => Span::styled(format!("/{}", d.filter), theme::accent()),
        _ => Span::styled("/ filter", theme::muted()),
    };

    let mut lines = vec![
        Line::from(vec![
            filter,
            Span::styled(
                format!("   {} of {} entries   Enter details  x export CSV  n new order", logs.len(), d.logs.len()),
                theme::muted(),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "{:<8}{:>8}  {:<6}{:<12}{:<18}{:<22}{}",
                "Symbol", "Qty", "Side", "Type", "Status", "Submitted", "Filled"
            ),
            theme::neutral(),
        )),
    ];

    let detail_rows = if d.expanded { 2 } else { 0 };
    let height = (area.height as usize).saturating_sub(4 + detail_rows);
    let start = scroll_offset(d.cursor, height);
    for (i, log) in logs.iter().enumerate().skip(start).take(height) {
        lines.push(log_row(log, i == d.cursor));
        if i == d.cursor && d.expanded {
            lines.push(Line::from(Span::styled(
                format!("    id {}", or_dash(Some(log.id.as_str()))),
                theme::muted(),
            )));
            lines.push(Line::from(Span::styled(
                format!("    error: {}", or_dash(log.error.as_deref())),
                if log.error.as_deref().is_some_and(|e| !e.is_empty()) {
                    theme::negative()
                } else {
                    theme::muted()
                },
            )));
        }
    }
    if logs.is_empty() {
        lines.push(Line::from(Span::styled("No order logs match.", theme::muted())));
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(theme::muted())
        .title(Span::styled(" Order log ", theme::neutral()));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn log_row(log: &OrderLog, selected: bool) -> Line<'static> {
    let status = log.status.as_deref().unwrap_or("");
    let text = format!(
        "{:<8}{:>8}  {:<6}{:<12}",
        or_dash(log.symbol.as_deref()),
        log.qty.map(|q| q.to_string()).unwrap_or_default(),
        or_dash(log.side.as_deref()),
        or_dash(log.kind.as_deref()),
    );
    let times = format!(
        "{:<22}{}",
        or_dash(log.submitted_at.as_deref()),
        or_dash(log.filled_at.as_deref())
    );
    if selected {
        return Line::from(Span::styled(
            format!("{text}{status:<18}{times}"),
            theme::selected(),
        ));
    }
    Line::from(vec![
        Span::styled(text, theme::text()),
        Span::styled(
            format!("{status:<18}"),
            Style::default().fg(THEME.status_color(OrderStatus::classify(status))),
        ),
        Span::styled(times, theme::muted()),
    ])
}
