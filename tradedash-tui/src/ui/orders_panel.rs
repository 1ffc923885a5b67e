//! Panel 4: open and recent orders.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::AppState;
use crate::theme::{self, THEME};
use crate::ui::widgets::{money, or_dash, scroll_offset};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let o = &app.orders;
    let mut lines = vec![
        Line::from(Span::styled(
            "n new order  c cancel selected  r refresh",
            theme::muted(),
        )),
        Line::from(Span::styled(
            format!(
                "{:<8}{:<6}{:>8}  {:<12}{:<18}{:>12}  {}",
                "Symbol", "Side", "Qty", "Type", "Status", "Avg fill", "Created"
            ),
            theme::neutral(),
        )),
    ];

    if o.orders.is_empty() {
        lines.push(Line::from(Span::styled("No orders.", theme::muted())));
    }

    let height = (area.height as usize).saturating_sub(2);
    let start = scroll_offset(o.cursor, height);
    for (i, order) in o.orders.iter().enumerate().skip(start).take(height) {
        let side = order.side.as_deref().unwrap_or("");
        let head = format!("{:<8}", order.symbol);
        let side_text = format!("{:<6}", side);
        let mid = format!("{:>8}  {:<12}", order.qty, order.kind);
        let status = format!("{:<18}", order.status);
        let tail = format!(
            "{:>12}  {}",
            money(order.filled_avg_price),
            or_dash(order.created_at.as_deref())
        );
        if i == o.cursor {
            lines.push(Line::from(Span::styled(
                format!("{head}{side_text}{mid}{status}{tail}"),
                theme::selected(),
            )));
            continue;
        }
        lines.push(Line::from(vec![
            Span::styled(head, theme::text()),
            Span::styled(side_text, Style::default().fg(THEME.side_color(side))),
            Span::styled(mid, theme::text()),
            Span::styled(status, Style::default().fg(THEME.status_color(order.status_class()))),
            Span::styled(tail, theme::muted()),
        ]));
    }

    f.render_widget(Paragraph::new(lines), area);
}
