//! Panel 7: one strategy over two date ranges, side by side.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use tradedash_core::chart::{date_labels, indexed_points, trade_markers};
use tradedash_core::domain::{ComparisonResult, PeriodResult};

use crate::app::{AppState, EditTarget, COMPARE_FIELDS};
use crate::theme::{self, THEME};
use crate::ui::widgets::{empty_message, fmt_whole, form_row, line_chart, Series};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(20)])
        .split(area);

    render_form(f, chunks[0], app);
    match &app.compare.result {
        Some(result) => render_result(f, chunks[1], app, result),
        None => empty_message(
            f,
            chunks[1],
            &["Fill in both periods and press g to compare."],
        ),
    }
}

fn render_form(f: &mut Frame, area: Rect, app: &AppState) {
    let c = &app.compare;
    let mut lines = vec![form_row(
        "Strategy",
        format!("< {} >", c.strategy.label()),
        c.cursor == 0,
        None,
    )];
    for (i, label) in COMPARE_FIELDS.iter().enumerate() {
        let editing = app
            .edit
            .as_ref()
            .filter(|e| e.target == EditTarget::CompareField(i))
            .map(|e| e.buffer.as_str());
        let value = if c.fields[i].is_empty() {
            "YYYY-MM-DD".to_string()
        } else {
            c.fields[i].clone()
        };
        lines.push(form_row(label, value, c.cursor == i + 1, editing));
    }
    lines.push(form_row(
        "Include news",
        if c.include_news { "[x]" } else { "[ ]" }.to_string(),
        c.cursor == 6,
        None,
    ));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "j/k row  Enter edit  h/l toggle  g compare",
        theme::muted(),
    )));

    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(theme::muted());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn period_label(app: &AppState, a: bool) -> String {
    match &app.compare.request {
        Some(req) => {
            let range = if a { &req.period_a } else { &req.period_b };
            format!("{} to {}", range.from, range.to)
        }
        None => String::new(),
    }
}

fn render_result(f: &mut Frame, area: Rect, app: &AppState, result: &ComparisonResult) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(7)])
        .split(area);

    let a = indexed_points(&result.period_a.equity_curve);
    let b = indexed_points(&result.period_b.equity_curve);
    line_chart(
        f,
        chunks[0],
        &[
            Series {
                name: format!("A {}", period_label(app, true)),
                points: &a,
                color: THEME.series_color(0),
            },
            Series {
                name: format!("B {}", period_label(app, false)),
                points: &b,
                color: THEME.series_color(1),
            },
        ],
        &date_labels(result.labels()),
        "Equity",
        fmt_whole,
    );

    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{:<4}{:>6}{:>8}{:>10}{:>12}   {}",
            "", "Wins", "Losses", "Win rate", "Volatility", "Trades"
        ),
        theme::neutral(),
    ))];
    lines.push(period_line("A", &result.period_a));
    lines.push(period_line("B", &result.period_b));
    lines.push(Line::from(""));
    if let Some(conf) = result.confidence_score {
        lines.push(Line::from(vec![
            Span::styled("Confidence ", theme::muted()),
            Span::styled(format!("{conf:.2}"), theme::accent_bold()),
        ]));
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(theme::muted());
    f.render_widget(Paragraph::new(lines).block(block), chunks[1]);
}

fn period_line(label: &str, p: &PeriodResult) -> Line<'static> {
    let wl = &p.win_loss;
    let mut spans = vec![Span::styled(
        format!(
            "{label:<4}{:>6}{:>8}{:>9.1}%{:>12}   ",
            wl.wins,
            wl.losses,
            wl.win_rate,
            p.volatility.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".into())
        ),
        theme::text(),
    )];
    for marker in trade_markers(&p.trades) {
        spans.push(Span::styled(
            marker.glyph().to_string(),
            Style::default().fg(THEME.marker_color(marker)),
        ));
    }
    if p.trades.is_empty() {
        spans.push(Span::styled("none", theme::muted()));
    }
    Line::from(spans)
}
