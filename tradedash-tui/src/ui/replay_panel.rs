//! Panel 6: step-by-step portfolio replay across several symbols.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use tradedash_core::chart::{date_labels, indexed_points};

use crate::app::{AppState, EditTarget};
use crate::theme::{self, THEME};
use crate::ui::widgets::{empty_message, fmt_whole, form_row, line_chart, money, Series};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(app.replay.set.entries().len().min(6) as u16 + 2),
        ])
        .split(area);

    render_form(f, chunks[0], app);
    if app.replay.set.is_empty() {
        empty_message(
            f,
            chunks[2],
            &["Enter comma-separated symbols and press g to load a replay."],
        );
        return;
    }
    render_progress(f, chunks[1], app);
    render_chart(f, chunks[2], app);
    render_steps(f, chunks[3], app);
}

fn render_form(f: &mut Frame, area: Rect, app: &AppState) {
    let r = &app.replay;
    let editing = |target: EditTarget| {
        app.edit
            .as_ref()
            .filter(|e| e.target == target)
            .map(|e| e.buffer.as_str())
    };
    let optional = |s: &str| {
        if s.is_empty() {
            "(server default)".to_string()
        } else {
            s.to_string()
        }
    };
    let lines = vec![
        form_row("Strategy", format!("< {} >", r.strategy.label()), r.cursor == 0, None),
        form_row("Symbols", r.symbols.clone(), r.cursor == 1, editing(EditTarget::ReplaySymbols)),
        form_row("From", optional(&r.from), r.cursor == 2, editing(EditTarget::ReplayFrom)),
        form_row("To", optional(&r.to), r.cursor == 3, editing(EditTarget::ReplayTo)),
        Line::from(Span::styled(
            "g load  Space play/pause  h/l step  Home/End jump  s strategy  x export",
            theme::muted(),
        )),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

fn render_progress(f: &mut Frame, area: Rect, app: &AppState) {
    let stepper = &app.replay.stepper;
    let ratio = if stepper.max_steps() <= 1 {
        1.0
    } else {
        stepper.step() as f64 / (stepper.max_steps() - 1) as f64
    };
    let state = if stepper.is_playing() { "playing" } else { "paused" };
    let gauge = Gauge::default()
        .gauge_style(theme::accent())
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!(
            "Step {} / {}  ({state})",
            stepper.step() + 1,
            stepper.max_steps()
        ));
    f.render_widget(gauge, area);
}

fn render_chart(f: &mut Frame, area: Rect, app: &AppState) {
    let overlay = app.replay.set.overlay_series(app.replay.stepper.step());
    let points: Vec<(String, Vec<(f64, f64)>)> = overlay
        .series
        .iter()
        .map(|(symbol, values)| (symbol.clone(), indexed_points(values)))
        .collect();
    let series: Vec<Series> = points
        .iter()
        .enumerate()
        .map(|(i, (symbol, pts))| Series {
            name: symbol.clone(),
            points: pts,
            color: THEME.series_color(i),
        })
        .collect();
    line_chart(
        f,
        area,
        &series,
        &date_labels(&overlay.dates),
        "Equity",
        fmt_whole,
    );
}

fn render_steps(f: &mut Frame, area: Rect, app: &AppState) {
    let step = app.replay.stepper.step();
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{:<8}{:<12}{:>10}  {:<6}{:>14}   {}",
            "Symbol", "Date", "Price", "Action", "Equity", "Summary"
        ),
        theme::neutral(),
    ))];

    for (symbol, result) in app.replay.set.entries() {
        match result {
            Ok(replay) => {
                let visible = app.replay.set.visible_steps(symbol, step);
                let Some(current) = visible.last() else {
                    lines.push(Line::from(Span::styled(
                        format!("{symbol:<8}no steps"),
                        theme::muted(),
                    )));
                    continue;
                };
                let s = &replay.summary;
                lines.push(Line::from(vec![
                    Span::styled(
                        format!(
                            "{symbol:<8}{:<12}{:>10}  ",
                            current.date,
                            current.price.map(|p| format!("{p:.2}")).unwrap_or_default()
                        ),
                        theme::text(),
                    ),
                    Span::styled(
                        format!("{:<6}", current.action.as_str()),
                        Style::default().fg(THEME.action_color(current.action)),
                    ),
                    Span::styled(format!("{:>14}   ", money(Some(current.equity))), theme::accent()),
                    Span::styled(
                        format!(
                            "{} trades, {}W/{}L, final {}",
                            s.total_trades,
                            s.wins,
                            s.losses,
                            money(s.final_equity)
                        ),
                        theme::muted(),
                    ),
                ]));
            }
            Err(message) => lines.push(Line::from(Span::styled(
                format!("{symbol:<8}failed: {message}"),
                theme::negative(),
            ))),
        }
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(theme::muted());
    f.render_widget(Paragraph::new(lines).block(block), area);
}
