//! Portfolio replay: per-symbol precomputed steps and a shared step cursor.
//!
//! The server computes every snapshot up front. The client only moves a
//! cursor through them and overlays the visible window across symbols.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::domain::{PortfolioReplay, ReplayRequest, ReplayStep};
use crate::error::ApiError;

/// Delay between automatic steps while playing.
pub const PLAYBACK_INTERVAL: Duration = Duration::from_millis(500);

/// Split a comma-separated symbol list: trimmed, uppercased, empties and
/// repeats dropped, order kept.
pub fn parse_symbols(input: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    input
        .split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Replay results keyed by symbol, in request order. A failed symbol keeps
/// its error message and does not affect the others.
#[derive(Debug, Clone, Default)]
pub struct ReplaySet {
    entries: Vec<(String, Result<PortfolioReplay, String>)>,
}

impl ReplaySet {
    pub fn from_results(entries: Vec<(String, Result<PortfolioReplay, String>)>) -> Self {
        Self { entries }
    }

    /// Request one replay per symbol. Per-symbol failures are recorded; an
    /// authentication failure aborts the whole batch since every later
    /// request would be rejected too.
    pub fn fetch(
        client: &ApiClient,
        strategy: &str,
        symbols: &[String],
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Self, ApiError> {
        let mut entries = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let req = ReplayRequest {
                strategy: strategy.to_string(),
                symbol: symbol.clone(),
                from,
                to,
            };
            match client.portfolio_replay(&req) {
                Ok(replay) => {
                    debug!(symbol = %symbol, steps = replay.steps.len(), "replay loaded");
                    entries.push((symbol.clone(), Ok(replay)));
                }
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "replay failed for symbol");
                    entries.push((symbol.clone(), Err(e.to_string())));
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }

    pub fn entries(&self) -> &[(String, Result<PortfolioReplay, String>)] {
        &self.entries
    }

    pub fn get(&self, symbol: &str) -> Option<&Result<PortfolioReplay, String>> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, r)| r)
    }

    /// Successful replays only.
    pub fn loaded(&self) -> impl Iterator<Item = (&str, &PortfolioReplay)> {
        self.entries
            .iter()
            .filter_map(|(s, r)| r.as_ref().ok().map(|p| (s.as_str(), p)))
    }

    /// Longest step count across loaded symbols, at least 1.
    pub fn max_steps(&self) -> usize {
        self.loaded().map(|(_, p)| p.steps.len()).max().unwrap_or(0).max(1)
    }

    /// Steps up to and including `step` for one symbol.
    pub fn visible_steps(&self, symbol: &str, step: usize) -> &[ReplayStep] {
        match self.get(symbol) {
            Some(Ok(p)) => {
                let end = (step + 1).min(p.steps.len());
                &p.steps[..end]
            }
            _ => &[],
        }
    }

    /// Equity overlay for the visible window: the sorted union of dates and
    /// one series per loaded symbol. Dates a symbol lacks carry its last seen
    /// equity forward; before its first match, its first visible equity.
    pub fn overlay_series(&self, step: usize) -> Overlay {
        let windows: Vec<(&str, &[ReplayStep])> = self
            .loaded()
            .map(|(s, _)| (s, self.visible_steps(s, step)))
            .collect();

        let dates: Vec<String> = windows
            .iter()
            .flat_map(|(_, steps)| steps.iter().map(|st| st.date.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let series = windows
            .into_iter()
            .map(|(symbol, steps)| {
                let mut last = steps.first().map(|s| s.equity).unwrap_or(0.0);
                let mut cursor = steps.iter().peekable();
                let values = dates
                    .iter()
                    .map(|date| {
                        // Steps are date-ordered, so one forward pass suffices.
                        while let Some(st) = cursor.peek() {
                            if st.date.as_str() > date.as_str() {
                                break;
                            }
                            last = st.equity;
                            cursor.next();
                        }
                        last
                    })
                    .collect();
                (symbol.to_string(), values)
            })
            .collect();

        Overlay { dates, series }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub dates: Vec<String>,
    pub series: Vec<(String, Vec<f64>)>,
}

/// Cursor over replay steps with play/pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStepper {
    step: usize,
    max_steps: usize,
    playing: bool,
}

impl Default for ReplayStepper {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ReplayStepper {
    pub fn new(max_steps: usize) -> Self {
        Self {
            step: 0,
            max_steps: max_steps.max(1),
            playing: false,
        }
    }

    pub fn for_set(set: &ReplaySet) -> Self {
        Self::new(set.max_steps())
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn at_end(&self) -> bool {
        self.step + 1 >= self.max_steps
    }

    /// Manual step: moves by `delta`, clamped, and pauses playback.
    pub fn step_by(&mut self, delta: i64) {
        self.playing = false;
        let last = (self.max_steps - 1) as i64;
        self.step = (self.step as i64 + delta).clamp(0, last) as usize;
    }

    pub fn jump_to_start(&mut self) {
        self.playing = false;
        self.step = 0;
    }

    pub fn jump_to_end(&mut self) {
        self.playing = false;
        self.step = self.max_steps - 1;
    }

    /// Start or pause. Starting from the last step rewinds first.
    pub fn toggle_play(&mut self) {
        if self.playing {
            self.playing = false;
        } else {
            if self.at_end() {
                self.step = 0;
            }
            self.playing = true;
        }
    }

    /// One playback tick. Returns whether the cursor moved; playback stops
    /// on reaching the last step.
    pub fn tick(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        if self.at_end() {
            self.playing = false;
            return false;
        }
        self.step += 1;
        if self.at_end() {
            self.playing = false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReplayAction, ReplaySummary};

    fn step(date: &str, equity: f64) -> ReplayStep {
        ReplayStep {
            date: date.into(),
            price: Some(1.0),
            action: ReplayAction::Hold,
            equity,
            position: serde_json::Value::Null,
            trade_info: None,
        }
    }

    fn replay(steps: Vec<ReplayStep>) -> PortfolioReplay {
        PortfolioReplay {
            steps,
            summary: ReplaySummary::default(),
        }
    }

    fn sample_set() -> ReplaySet {
        ReplaySet::from_results(vec![
            (
                "AAPL".into(),
                Ok(replay(vec![
                    step("2024-01-02", 100.0),
                    step("2024-01-03", 101.0),
                    step("2024-01-05", 103.0),
                ])),
            ),
            (
                "MSFT".into(),
                Ok(replay(vec![step("2024-01-03", 200.0), step("2024-01-04", 190.0)])),
            ),
            ("XYZ".into(), Err("Symbol not found".into())),
        ])
    }

    #[test]
    fn symbols_are_normalized() {
        assert_eq!(parse_symbols(" aapl, ,msft,AAPL,"), vec!["AAPL", "MSFT"]);
        assert!(parse_symbols(" , ").is_empty());
    }

    #[test]
    fn max_steps_ignores_failures() {
        let set = sample_set();
        assert_eq!(set.max_steps(), 3);
        assert_eq!(ReplaySet::default().max_steps(), 1);
        assert!(matches!(set.get("XYZ"), Some(Err(_))));
    }

    #[test]
    fn stepper_clamps_and_pauses() {
        let mut s = ReplayStepper::new(3);
        s.step_by(-1);
        assert_eq!(s.step(), 0);
        s.toggle_play();
        assert!(s.is_playing());
        s.step_by(10);
        assert_eq!(s.step(), 2);
        assert!(!s.is_playing());
    }

    #[test]
    fn playback_stops_at_end() {
        let mut s = ReplayStepper::new(3);
        s.toggle_play();
        assert!(s.tick());
        assert!(s.tick());
        assert!(!s.is_playing());
        assert!(!s.tick());
        assert_eq!(s.step(), 2);
        s.toggle_play();
        assert_eq!(s.step(), 0);
    }

    #[test]
    fn visible_window_grows_with_step() {
        let set = sample_set();
        assert_eq!(set.visible_steps("AAPL", 0).len(), 1);
        assert_eq!(set.visible_steps("MSFT", 2).len(), 2);
        assert!(set.visible_steps("XYZ", 2).is_empty());
    }

    #[test]
    fn overlay_forward_fills() {
        let overlay = sample_set().overlay_series(2);
        assert_eq!(
            overlay.dates,
            vec!["2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]
        );
        assert_eq!(overlay.series[0].0, "AAPL");
        assert_eq!(overlay.series[0].1, vec![100.0, 101.0, 101.0, 103.0]);
        assert_eq!(overlay.series[1].1, vec![200.0, 200.0, 190.0, 190.0]);
    }
}
