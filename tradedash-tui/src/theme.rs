//! Color palette and style helpers for the dashboard.
//!
//! Dark background with neon accents:
//! - **Accent**: cyan (focus, titles, selected rows)
//! - **Positive**: green (gains, buys, filled orders)
//! - **Negative**: pink (losses, sells, errors)
//! - **Warning**: orange (pending state, alerts)
//! - **Neutral**: purple (secondary headings)
//! - **Muted**: steel blue (hints, disabled items)

use ratatui::style::{Color, Modifier, Style};

use tradedash_core::chart::TradeMarker;
use tradedash_core::domain::{OrderStatus, ReplayAction};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: Color,
    pub accent: Color,
    pub positive: Color,
    pub negative: Color,
    pub warning: Color,
    pub neutral: Color,
    pub muted: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::neon()
    }
}

impl Theme {
    pub const fn neon() -> Self {
        Self {
            background: Color::Rgb(18, 18, 20),
            accent: Color::Rgb(0, 255, 255),
            positive: Color::Rgb(0, 255, 128),
            negative: Color::Rgb(255, 20, 147),
            warning: Color::Rgb(255, 140, 0),
            neutral: Color::Rgb(147, 112, 219),
            muted: Color::Rgb(100, 149, 237),
            text_primary: Color::White,
            text_secondary: Color::Rgb(170, 170, 170),
        }
    }

    /// Gains green, losses pink. Zero counts as a gain.
    pub fn pnl_color(&self, value: f64) -> Color {
        if value >= 0.0 {
            self.positive
        } else {
            self.negative
        }
    }

    pub fn side_color(&self, side: &str) -> Color {
        match side.to_ascii_lowercase().as_str() {
            "buy" | "long" => self.positive,
            "sell" | "short" => self.negative,
            _ => self.text_secondary,
        }
    }

    pub fn status_color(&self, status: OrderStatus) -> Color {
        match status {
            OrderStatus::Filled => self.positive,
            OrderStatus::Open => self.warning,
            OrderStatus::Cancelled => self.muted,
            OrderStatus::Other => self.text_secondary,
        }
    }

    pub fn action_color(&self, action: ReplayAction) -> Color {
        match action {
            ReplayAction::Buy => self.positive,
            ReplayAction::Sell => self.negative,
            ReplayAction::Hold => self.muted,
        }
    }

    pub fn marker_color(&self, marker: TradeMarker) -> Color {
        match marker {
            TradeMarker::Win => self.positive,
            TradeMarker::Loss => self.negative,
            TradeMarker::Flat => self.neutral,
        }
    }

    /// Distinct colors for overlaid series, cycling.
    pub fn series_color(&self, idx: usize) -> Color {
        const CYCLE: [Color; 6] = [
            Color::Rgb(0, 255, 255),
            Color::Rgb(255, 140, 0),
            Color::Rgb(0, 255, 128),
            Color::Rgb(147, 112, 219),
            Color::Rgb(255, 20, 147),
            Color::Rgb(255, 255, 102),
        ];
        CYCLE[idx % CYCLE.len()]
    }
}

pub const THEME: Theme = Theme::neon();

pub fn accent() -> Style {
    Style::default().fg(THEME.accent)
}

pub fn accent_bold() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().fg(THEME.muted)
}

pub fn neutral() -> Style {
    Style::default().fg(THEME.neutral)
}

pub fn positive() -> Style {
    Style::default().fg(THEME.positive)
}

pub fn negative() -> Style {
    Style::default().fg(THEME.negative)
}

pub fn warning() -> Style {
    Style::default().fg(THEME.warning)
}

pub fn text() -> Style {
    Style::default().fg(THEME.text_primary)
}

pub fn pnl(value: f64) -> Style {
    Style::default().fg(THEME.pnl_color(value))
}

pub fn selected() -> Style {
    accent().add_modifier(Modifier::REVERSED)
}

pub fn panel_border(active: bool) -> Style {
    if active {
        accent()
    } else {
        muted()
    }
}

pub fn panel_title(active: bool) -> Style {
    if active {
        accent_bold()
    } else {
        muted()
    }
}
