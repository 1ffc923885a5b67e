//! Panel 8: training modules, their units, and the unit viewer overlay.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};
use ratatui::Frame;

use tradedash_core::training::UnitBody;

use crate::app::{AppState, UnitViewer};
use crate::theme;
use crate::ui::centered_rect;
use crate::ui::widgets::{empty_message, scroll_offset};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    render_progress(f, chunks[0], app);
    match &app.training.module {
        Some(_) => render_units(f, chunks[1], app),
        None => render_modules(f, chunks[1], app),
    }
}

fn render_progress(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(p) = &app.training.progress else {
        empty_message(f, area, &["Loading progress..."]);
        return;
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Tokens ", theme::muted()),
            Span::styled(p.total_tokens.to_string(), theme::warning()),
            Span::styled("   Phase ", theme::muted()),
            Span::styled(p.current_phase.clone(), theme::text()),
            Span::styled("   Streak ", theme::muted()),
            Span::styled(format!("{} days", p.streak_days), theme::text()),
            Span::styled("   Quizzes ", theme::muted()),
            Span::styled(p.completed_quizzes.to_string(), theme::text()),
            Span::styled(
                format!("   {} achievements, {} badges (g)", p.achievements, p.badges),
                theme::muted(),
            ),
        ])),
        rows[0],
    );
    f.render_widget(
        Gauge::default()
            .gauge_style(theme::positive())
            .ratio((p.percent() / 100.0).clamp(0.0, 1.0))
            .label(format!(
                "{}/{} units  {:.0}%",
                p.completed_units,
                p.total_units,
                p.percent()
            )),
        rows[1],
    );
}

fn render_modules(f: &mut Frame, area: Rect, app: &AppState) {
    let t = &app.training;
    if t.modules.is_empty() {
        empty_message(f, area, &["No training modules."]);
        return;
    }

    let mut lines = Vec::new();
    let height = (area.height as usize).saturating_sub(1);
    let start = scroll_offset(t.cursor, height);
    for (i, m) in t.modules.iter().enumerate().skip(start).take(height) {
        let lock = if m.is_unlocked { "  " } else { "🔒" };
        let text = format!(
            "{lock} {:<10}{:<40}{:>4}/{:<4}{:>5.0}%",
            m.phase, m.title, m.completed_units, m.total_units, m.progress
        );
        let style = if i == t.cursor {
            theme::selected()
        } else if m.is_unlocked {
            theme::text()
        } else {
            theme::muted()
        };
        lines.push(Line::from(Span::styled(text, style)));
    }
    lines.push(Line::from(Span::styled(
        "Enter open module  g achievements  R reset progress",
        theme::muted(),
    )));
    f.render_widget(Paragraph::new(lines), area);
}

fn render_units(f: &mut Frame, area: Rect, app: &AppState) {
    let t = &app.training;
    let Some(module) = &t.module else { return };

    let mut lines = vec![
        Line::from(Span::styled(module.summary.title.clone(), theme::accent_bold())),
        Line::from(Span::styled(module.summary.description.clone(), theme::muted())),
        Line::from(""),
    ];
    for (i, unit) in module.units.iter().enumerate() {
        let mark = if unit.is_completed {
            Span::styled("✓ ", theme::positive())
        } else {
            Span::raw("  ")
        };
        let style = if i == t.unit_cursor {
            theme::selected()
        } else {
            theme::text()
        };
        lines.push(Line::from(vec![
            mark,
            Span::styled(format!("{:>2}. {:<40}", unit.order, unit.title), style),
            Span::styled(format!(" {}", unit.unit_type), theme::muted()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "{}/{} completed   Enter open unit  Esc back",
            module.completed_count(),
            module.units.len()
        ),
        theme::muted(),
    )));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

/// Unit viewer overlay.
pub fn render_unit(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(viewer) = &app.unit else { return };
    let popup = centered_rect(80, 85, area);
    f.render_widget(Clear, popup);

    let mut lines = match &viewer.body {
        UnitBody::Definition {
            definition,
            explanation,
        } => {
            let mut l = vec![Line::from(Span::styled(definition.clone(), theme::text()))];
            if let Some(e) = explanation {
                l.push(Line::from(""));
                l.push(Line::from(Span::styled(e.clone(), theme::muted())));
            }
            l
        }
        UnitBody::Example {
            example,
            key_points,
        } => {
            let mut l = vec![Line::from(Span::styled(example.clone(), theme::text()))];
            if !key_points.is_empty() {
                l.push(Line::from(""));
                l.push(Line::from(Span::styled("Key points", theme::neutral())));
                l.extend(
                    key_points
                        .iter()
                        .map(|p| Line::from(Span::styled(format!("  • {p}"), theme::text()))),
                );
            }
            l
        }
        UnitBody::Flashcard { question, answer } => {
            let mut l = vec![
                Line::from(Span::styled(question.clone(), theme::accent_bold())),
                Line::from(""),
            ];
            if viewer.revealed {
                l.push(Line::from(Span::styled(answer.clone(), theme::text())));
            } else {
                l.push(Line::from(Span::styled("Space to reveal", theme::muted())));
            }
            l
        }
        UnitBody::Quiz(_) => quiz_lines(viewer),
        UnitBody::FillBlank(_) => blank_lines(viewer),
        UnitBody::Matching { .. } => matching_lines(viewer),
        UnitBody::Text(text) => text
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), theme::text())))
            .collect(),
    };

    lines.push(Line::from(""));
    if let Some(score) = viewer.score {
        let style = if score >= 70 {
            theme::positive()
        } else {
            theme::warning()
        };
        lines.push(Line::from(Span::styled(format!("Score: {score}%"), style)));
    }
    lines.push(Line::from(Span::styled(hint(viewer), theme::muted())));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(true))
        .title(format!(
            " {} ({}) ",
            viewer.unit.title,
            viewer.body.unit_type().label()
        ))
        .title_style(theme::panel_title(true));
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup,
    );
}

fn hint(viewer: &UnitViewer) -> &'static str {
    let scored = viewer.body.unit_type().requires_submission();
    match (scored, viewer.sheet.is_submitted()) {
        (true, true) => "Enter complete  r retry  Esc close",
        (true, false) => match viewer.body {
            UnitBody::FillBlank(_) => "Type answers  Tab next  Enter submit  Esc close",
            UnitBody::Matching { .. } => {
                "j/k term  h/l definition  Space assign  Backspace clear  Enter submit"
            }
            _ => "j/k question  h/l option  Space choose  Enter submit  Esc close",
        },
        (false, _) => match viewer.body {
            UnitBody::Flashcard { .. } => "Space flip  Enter complete  Esc close",
            _ => "Enter complete  Esc close",
        },
    }
}

/// Mark for a submitted item.
fn verdict(viewer: &UnitViewer, idx: usize) -> Span<'static> {
    if !viewer.sheet.is_submitted() {
        return Span::raw("");
    }
    if viewer.sheet.is_correct(&viewer.body, idx) {
        Span::styled(" ✓", theme::positive())
    } else {
        Span::styled(" ✗", theme::negative())
    }
}

fn item_style(viewer: &UnitViewer, idx: usize) -> ratatui::style::Style {
    if idx == viewer.item {
        theme::accent_bold()
    } else {
        theme::text()
    }
}

fn quiz_lines(viewer: &UnitViewer) -> Vec<Line<'static>> {
    let UnitBody::Quiz(questions) = &viewer.body else {
        return Vec::new();
    };
    let mut lines = Vec::new();
    for (qi, q) in questions.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!(
                    "{}. {}",
                    qi + 1,
                    q.question.as_deref().unwrap_or("(no question text)")
                ),
                item_style(viewer, qi),
            ),
            verdict(viewer, qi),
        ]));
        for (oi, option) in q.options.iter().enumerate() {
            let chosen = viewer.sheet.choice(qi) == Some(oi);
            let marker = if chosen { "(•)" } else { "( )" };
            let style = if qi == viewer.item && oi == viewer.option {
                theme::selected()
            } else if viewer.sheet.is_submitted() && oi == q.correct_answer {
                theme::positive()
            } else {
                theme::text()
            };
            lines.push(Line::from(Span::styled(format!("   {marker} {option}"), style)));
        }
        lines.push(Line::from(""));
    }
    lines
}

fn blank_lines(viewer: &UnitViewer) -> Vec<Line<'static>> {
    let UnitBody::FillBlank(questions) = &viewer.body else {
        return Vec::new();
    };
    let mut lines = Vec::new();
    for (qi, q) in questions.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("{}. {}", qi + 1, q.text), item_style(viewer, qi)),
            verdict(viewer, qi),
        ]));
        let cursor = if qi == viewer.item && !viewer.sheet.is_submitted() {
            "_"
        } else {
            ""
        };
        let mut answer = vec![Span::styled(
            format!("   > {}{cursor}", viewer.sheet.blank(qi)),
            theme::accent(),
        )];
        if viewer.sheet.is_submitted() && !viewer.sheet.is_correct(&viewer.body, qi) {
            answer.push(Span::styled(format!("   ({})", q.answer), theme::muted()));
        }
        lines.push(Line::from(answer));
    }
    lines
}

fn matching_lines(viewer: &UnitViewer) -> Vec<Line<'static>> {
    let UnitBody::Matching { terms, .. } = &viewer.body else {
        return Vec::new();
    };
    let definitions = viewer.sheet.shuffled_definitions(&viewer.body);
    let mut lines = vec![Line::from(Span::styled("Terms", theme::neutral()))];
    for (ti, term) in terms.iter().enumerate() {
        let assigned = viewer
            .sheet
            .assignment(ti)
            .map(|p| format!("{}", p + 1))
            .unwrap_or_else(|| "-".into());
        lines.push(Line::from(vec![
            Span::styled(format!("  {term:<28} → {assigned}"), item_style(viewer, ti)),
            verdict(viewer, ti),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Definitions", theme::neutral())));
    for (pi, def) in definitions.iter().enumerate() {
        let style = if pi == viewer.option {
            theme::selected()
        } else if viewer.sheet.is_assigned(pi) {
            theme::muted()
        } else {
            theme::text()
        };
        lines.push(Line::from(Span::styled(format!("  {}. {def}", pi + 1), style)));
    }
    lines
}
