//! Small rendering helpers shared by the panels.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use tradedash_core::chart::series_bounds;

use crate::theme;

/// `$1,234.56`, or `-` when missing.
pub fn money(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let sign = if v < 0.0 { "-" } else { "" };
            let cents = (v.abs() * 100.0).round() as u64;
            let whole = (cents / 100).to_string();
            let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
            for (i, c) in whole.chars().enumerate() {
                if i > 0 && (whole.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(c);
            }
            format!("{sign}${grouped}.{:02}", cents % 100)
        }
        _ => "-".to_string(),
    }
}

/// Signed money for P/L columns.
pub fn signed_money(v: f64) -> String {
    if v >= 0.0 {
        format!("+{}", money(Some(v)))
    } else {
        money(Some(v))
    }
}

pub fn pct(fraction: f64) -> String {
    format!("{:+.2}%", fraction * 100.0)
}

pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

/// First visible row so that `cursor` stays on screen in `height` rows.
pub fn scroll_offset(cursor: usize, height: usize) -> usize {
    if height == 0 {
        0
    } else {
        cursor.saturating_sub(height - 1)
    }
}

/// `label: value` form row. `editing` replaces the value with the edit
/// buffer and a caret.
pub fn form_row(label: &str, value: String, selected: bool, editing: Option<&str>) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let value_span = match editing {
        Some(buffer) => Span::styled(format!("{buffer}_"), theme::warning()),
        None if selected => Span::styled(value, theme::selected()),
        None => Span::styled(value, theme::text()),
    };
    Line::from(vec![
        Span::styled(marker.to_string(), theme::accent()),
        Span::styled(format!("{label:<18}"), theme::muted()),
        value_span,
    ])
}

pub fn empty_message(f: &mut Frame, area: Rect, lines: &[&str]) {
    let mut text = vec![Line::from(""), Line::from("")];
    text.extend(
        lines
            .iter()
            .map(|l| Line::from(Span::styled(l.to_string(), theme::muted()))),
    );
    f.render_widget(Paragraph::new(text), area);
}

/// One line series for [`line_chart`].
pub struct Series<'a> {
    pub name: String,
    pub points: &'a [(f64, f64)],
    pub color: Color,
}

/// Index-x line chart with first/middle/last date labels.
pub fn line_chart(
    f: &mut Frame,
    area: Rect,
    series: &[Series<'_>],
    x_labels: &[String],
    y_title: &str,
    y_fmt: fn(f64) -> String,
) {
    let (y_min, y_max) = series_bounds(series.iter().map(|s| s.points));
    let x_max = series
        .iter()
        .map(|s| s.points.len())
        .max()
        .unwrap_or(0)
        .saturating_sub(1) as f64;

    let datasets: Vec<Dataset> = series
        .iter()
        .map(|s| {
            Dataset::default()
                .name(s.name.clone())
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(s.color))
                .graph_type(GraphType::Line)
                .data(s.points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .style(theme::muted())
                .bounds([0.0, x_max.max(1.0)])
                .labels(
                    x_labels
                        .iter()
                        .map(|l| Span::styled(l.clone(), theme::muted()))
                        .collect::<Vec<_>>(),
                ),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled(y_title.to_string(), theme::muted()))
                .style(theme::muted())
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::styled(y_fmt(y_min), theme::muted()),
                    Span::styled(y_fmt(y_max), theme::muted()),
                ]),
        );

    f.render_widget(chart, area);
}

pub fn fmt_whole(v: f64) -> String {
    format!("{v:.0}")
}

pub fn fmt_pct(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_groups_thousands() {
        assert_eq!(money(Some(1234567.891)), "$1,234,567.89");
        assert_eq!(money(Some(-50.5)), "-$50.50");
        assert_eq!(money(Some(0.0)), "$0.00");
        assert_eq!(money(None), "-");
        assert_eq!(signed_money(12.0), "+$12.00");
    }

    #[test]
    fn scroll_keeps_cursor_visible() {
        assert_eq!(scroll_offset(3, 10), 0);
        assert_eq!(scroll_offset(12, 10), 3);
        assert_eq!(scroll_offset(5, 0), 0);
    }

    proptest::proptest! {
        #[test]
        fn cursor_row_is_always_on_screen(cursor in 0usize..10_000, height in 1usize..200) {
            let start = scroll_offset(cursor, height);
            proptest::prop_assert!(start <= cursor);
            proptest::prop_assert!(cursor - start < height);
        }
    }
}
