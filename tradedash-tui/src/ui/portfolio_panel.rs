//! Panel 3: account values, equity history chart and open positions.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use tradedash_core::chart::indexed_points;

use crate::app::{AppState, HISTORY_PERIODS};
use crate::theme::{self, THEME};
use crate::ui::widgets::{empty_message, fmt_whole, line_chart, money, scroll_offset, signed_money, Series};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Percentage(45),
            Constraint::Min(4),
        ])
        .split(area);

    render_header(f, chunks[0], app);
    render_history(f, chunks[1], app);
    render_positions(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &AppState) {
    let p = &app.portfolio;
    let acct = p.account.as_ref();
    let day = acct.and_then(|a| a.day_change());

    let mut spans = vec![
        Span::styled("Equity ", theme::muted()),
        Span::styled(money(acct.and_then(|a| a.equity)), theme::accent_bold()),
        Span::styled("   Day ", theme::muted()),
        Span::styled(
            day.map_or("-".into(), signed_money),
            theme::pnl(day.unwrap_or(0.0)),
        ),
        Span::styled("   Status ", theme::muted()),
        Span::styled(
            acct.and_then(|a| a.status.clone()).unwrap_or_else(|| "-".into()),
            theme::text(),
        ),
        Span::styled("   Period ", theme::muted()),
    ];
    for (i, label) in HISTORY_PERIODS.iter().enumerate() {
        let style = if i == p.period % HISTORY_PERIODS.len() {
            theme::selected()
        } else {
            theme::muted()
        };
        spans.push(Span::styled(format!(" {label} "), style));
    }
    spans.push(Span::styled("  (h/l)", theme::muted()));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_history(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(history) = &app.portfolio.history else {
        empty_message(f, area, &["Loading portfolio history..."]);
        return;
    };
    let equity = history.equity_filled();
    if equity.is_empty() {
        empty_message(f, area, &["No history for this period."]);
        return;
    }
    let labels: Vec<String> = [history.timestamp.first(), history.timestamp.last()]
        .into_iter()
        .flatten()
        .filter_map(|&ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .collect();
    let points = indexed_points(&equity);
    line_chart(
        f,
        area,
        &[Series {
            name: "Equity".into(),
            points: &points,
            color: THEME.accent,
        }],
        &labels,
        "Equity",
        fmt_whole,
    );
}

fn render_positions(f: &mut Frame, area: Rect, app: &AppState) {
    let p = &app.portfolio;
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{:<8}{:<6}{:>10}{:>12}{:>12}{:>14}{:>14}{:>9}",
            "Symbol", "Side", "Qty", "Avg entry", "Price", "Value", "P/L", "P/L %"
        ),
        theme::neutral(),
    ))];

    if p.positions.is_empty() {
        lines.push(Line::from(Span::styled("No open positions.", theme::muted())));
    }
    let height = (area.height as usize).saturating_sub(3);
    let start = scroll_offset(p.cursor, height);
    for (i, pos) in p.positions.iter().enumerate().skip(start).take(height) {
        let body = format!(
            "{:<8}{:<6}{:>10}{:>12}{:>12}{:>14}",
            pos.symbol,
            pos.side,
            pos.qty,
            money(Some(pos.avg_entry_price)),
            money(Some(pos.current_price)),
            money(Some(pos.market_value)),
        );
        let pl = format!(
            "{:>14}{:>9}",
            signed_money(pos.unrealized_pl),
            format!("{:+.2}%", pos.unrealized_plpc * 100.0)
        );
        if i == p.cursor {
            lines.push(Line::from(Span::styled(format!("{body}{pl}"), theme::selected())));
        } else {
            lines.push(Line::from(vec![
                Span::styled(body, Style::default().fg(THEME.text_primary)),
                Span::styled(pl, theme::pnl(pos.unrealized_pl)),
            ]));
        }
    }
    lines.push(Line::from(Span::styled(
        "j/k select  n order for selected symbol  r refresh",
        theme::muted(),
    )));

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(theme::muted())
        .title(Span::styled(" Positions ", theme::neutral()));
    f.render_widget(Paragraph::new(lines).block(block), area);
}
