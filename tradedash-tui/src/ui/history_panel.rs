//! Panel 5: order history and account activities.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use tradedash_core::domain::OrderStatus;

use crate::app::{AppState, HistoryView};
use crate::theme::{self, THEME};
use crate::ui::widgets::{money, or_dash, scroll_offset};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let h = &app.history;
    let tab = |view: HistoryView, label: &'static str| {
        let style = if h.view == view {
            theme::selected()
        } else {
            theme::muted()
        };
        Span::styled(format!(" {label} "), style)
    };

    let mut lines = vec![
        Line::from(vec![
            tab(HistoryView::Orders, "Orders"),
            Span::raw(" "),
            tab(HistoryView::Activities, "Activities"),
            Span::styled("   h/l switch", theme::muted()),
        ]),
        Line::from(""),
    ];

    let height = (area.height as usize).saturating_sub(3);
    let start = scroll_offset(h.cursor, height);

    match h.view {
        HistoryView::Orders => {
            lines.push(Line::from(Span::styled(
                format!(
                    "{:<8}{:<8}{:>8}{:>12}  {:<12}{}",
                    "Symbol", "Type", "Qty", "Price", "Status", "Created"
                ),
                theme::neutral(),
            )));
            for (i, item) in h.items.iter().enumerate().skip(start).take(height) {
                let text = format!(
                    "{:<8}{:<8}{:>8}{:>12}  {:<12}{}",
                    item.symbol,
                    item.kind,
                    item.qty,
                    money(item.price),
                    item.status,
                    or_dash(item.created_at.as_deref())
                );
                let style = if i == h.cursor {
                    theme::selected()
                } else {
                    Style::default().fg(THEME.status_color(OrderStatus::classify(&item.status)))
                };
                lines.push(Line::from(Span::styled(text, style)));
            }
            if h.items.is_empty() {
                lines.push(Line::from(Span::styled("No order history.", theme::muted())));
            }
        }
        HistoryView::Activities => {
            lines.push(Line::from(Span::styled(
                format!(
                    "{:<10}{:<8}{:<6}{:>8}{:>12}{:>14}  {}",
                    "Activity", "Symbol", "Side", "Qty", "Price", "Net", "When"
                ),
                theme::neutral(),
            )));
            for (i, a) in h.activities.iter().enumerate().skip(start).take(height) {
                let text = format!(
                    "{:<10}{:<8}{:<6}{:>8}{:>12}{:>14}  {}",
                    a.activity_type,
                    or_dash(a.symbol.as_deref()),
                    or_dash(a.side.as_deref()),
                    a.qty.map(|q| q.to_string()).unwrap_or_default(),
                    money(a.price),
                    money(a.net_amount),
                    a.when()
                );
                let style = if i == h.cursor {
                    theme::selected()
                } else {
                    Style::default().fg(THEME.side_color(a.side.as_deref().unwrap_or("")))
                };
                lines.push(Line::from(Span::styled(text, style)));
            }
            if h.activities.is_empty() {
                lines.push(Line::from(Span::styled("No activities.", theme::muted())));
            }
        }
    }

    f.render_widget(Paragraph::new(lines), area);
}
