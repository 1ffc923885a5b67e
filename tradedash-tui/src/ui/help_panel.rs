//! Panel 0: keyboard shortcuts.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, _app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Global");
    key(&mut lines, "1-9, 0", "Switch to panel by number");
    key(&mut lines, "Tab / Shift+Tab", "Cycle panels forward / back");
    key(&mut lines, "r", "Refresh the current panel");
    key(&mut lines, "N", "Notifications");
    key(&mut lines, "e", "Error history");
    key(&mut lines, "?", "This help");
    key(&mut lines, "q / Ctrl+C", "Quit");
    lines.push(Line::from(""));

    section(&mut lines, "1 Dashboard");
    key(&mut lines, "j / k, Enter", "Select and expand order log entries");
    key(&mut lines, "/ , Esc", "Filter logs / clear filter");
    key(&mut lines, "n", "New order");
    key(&mut lines, "x", "Export filtered logs to CSV");
    lines.push(Line::from(""));

    section(&mut lines, "2 Backtest");
    key(&mut lines, "j / k", "Move between rows");
    key(&mut lines, "h / l", "Cycle strategy or symbol, adjust parameter");
    key(&mut lines, "Enter", "Edit the selected field");
    key(&mut lines, "d", "Reset parameters to defaults");
    key(&mut lines, "g", "Run backtest");
    key(&mut lines, "x", "Export result to CSV");
    lines.push(Line::from(""));

    section(&mut lines, "3 Portfolio / 4 Orders / 5 History");
    key(&mut lines, "h / l", "Change history period (Portfolio), switch view (History)");
    key(&mut lines, "n", "New order");
    key(&mut lines, "c", "Cancel the selected open order");
    lines.push(Line::from(""));

    section(&mut lines, "6 Replay");
    key(&mut lines, "s / S", "Next / previous strategy");
    key(&mut lines, "g", "Load replay for all symbols");
    key(&mut lines, "Space", "Play / pause");
    key(&mut lines, "h / l, Home / End", "Step back / forward, jump");
    key(&mut lines, "x", "Export replay to CSV");
    lines.push(Line::from(""));

    section(&mut lines, "7 Compare");
    key(&mut lines, "h / l / Space", "Cycle strategy, toggle news");
    key(&mut lines, "Enter / g", "Edit date / run comparison");
    lines.push(Line::from(""));

    section(&mut lines, "8 Training");
    key(&mut lines, "Enter / Esc", "Open module or unit / back");
    key(&mut lines, "g", "Achievements, badges and leaderboard");
    key(&mut lines, "R", "Reset progress (asks first)");
    key(&mut lines, "Space / Enter", "Choose answer / submit, then complete");
    lines.push(Line::from(""));

    section(&mut lines, "9 Settings");
    key(&mut lines, "Enter", "Edit key or toggle environment");
    key(&mut lines, "v / s / D", "Show keys / save / remove");
    key(&mut lines, "L", "Log out");

    f.render_widget(Paragraph::new(lines), area);
}

fn section<'a>(lines: &mut Vec<Line<'a>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key<'a>(lines: &mut Vec<Line<'a>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {:>20}  ", keys), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}
