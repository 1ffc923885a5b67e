//! Strategy catalog and the backtest parameter form.
//!
//! The catalog is static: four server-side strategies, each with a schema of
//! numeric parameters. The form keeps a parameter map that always matches the
//! selected strategy's schema and packages it into a [`BacktestRequest`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::domain::{BacktestRequest, StrategyRunRequest};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    BasicMomentum,
    AdvancedMomentum,
    MeanReversionMl,
    VolatilityBreakout,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::BasicMomentum,
        StrategyKind::AdvancedMomentum,
        StrategyKind::MeanReversionMl,
        StrategyKind::VolatilityBreakout,
    ];

    /// Identifier sent in request bodies.
    pub fn id(self) -> &'static str {
        match self {
            StrategyKind::BasicMomentum => "basicMomentum",
            StrategyKind::AdvancedMomentum => "advancedMomentum",
            StrategyKind::MeanReversionMl => "meanReversionML",
            StrategyKind::VolatilityBreakout => "volatilityBreakout",
        }
    }

    /// Dedicated run endpoint under `/strategies`.
    pub fn endpoint(self) -> &'static str {
        match self {
            StrategyKind::BasicMomentum => "/strategies/basic-momentum",
            StrategyKind::AdvancedMomentum => "/strategies/advanced-momentum",
            StrategyKind::MeanReversionMl => "/strategies/mean-reversion-ml",
            StrategyKind::VolatilityBreakout => "/strategies/volatility-breakout",
        }
    }

    /// Accepts the wire id or the endpoint slug, case-insensitively.
    pub fn from_id(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|k| {
            k.id().eq_ignore_ascii_case(s)
                || k.endpoint().trim_start_matches("/strategies/").eq_ignore_ascii_case(s)
        })
    }

    pub fn def(self) -> &'static StrategyDef {
        // ALL and STRATEGIES share ordering.
        &STRATEGIES[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.def().label
    }

    pub fn cycle(self, direction: i32) -> Self {
        let idx = self as i32;
        Self::ALL[(idx + direction).rem_euclid(Self::ALL.len() as i32) as usize]
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Number,
    Range,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
    pub description: &'static str,
    /// Only used by `Select` parameters.
    pub options: &'static [(f64, &'static str)],
}

impl ParamSpec {
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Decimal places implied by the step, for display and rounding.
    pub fn decimals(&self) -> usize {
        if self.step >= 1.0 || self.step <= 0.0 {
            0
        } else {
            (-self.step.log10()).ceil() as usize
        }
    }

    /// Snap to the step grid anchored at `min`, clamped to the range.
    pub fn snap(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        let snapped = if self.step > 0.0 {
            self.min + ((clamped - self.min) / self.step).round() * self.step
        } else {
            clamped
        };
        let scale = 10f64.powi(self.decimals() as i32);
        ((snapped * scale).round() / scale).clamp(self.min, self.max)
    }

    pub fn format(&self, value: f64) -> String {
        format!("{value:.prec$}", prec = self.decimals())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyDef {
    pub kind: StrategyKind,
    pub label: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl StrategyDef {
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

const fn number(
    name: &'static str,
    label: &'static str,
    min: f64,
    max: f64,
    step: f64,
    default: f64,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        name,
        label,
        kind: ParamKind::Number,
        min,
        max,
        step,
        default,
        description,
        options: &[],
    }
}

const fn range(
    name: &'static str,
    label: &'static str,
    min: f64,
    max: f64,
    step: f64,
    default: f64,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        kind: ParamKind::Range,
        ..number(name, label, min, max, step, default, description)
    }
}

pub static STRATEGIES: [StrategyDef; 4] = [
    StrategyDef {
        kind: StrategyKind::BasicMomentum,
        label: "Basic Momentum",
        description: "Simple momentum strategy based on rolling returns",
        params: &[number(
            "window",
            "Lookback Window",
            5.0,
            100.0,
            1.0,
            20.0,
            "Number of days to look back for momentum calculation",
        )],
    },
    StrategyDef {
        kind: StrategyKind::AdvancedMomentum,
        label: "Advanced Momentum",
        description: "Multi-asset momentum strategy with top percentile selection",
        params: &[
            number(
                "lookback",
                "Lookback Period",
                5.0,
                100.0,
                1.0,
                20.0,
                "Number of days to look back for momentum calculation",
            ),
            range(
                "topPercent",
                "Top Percentile",
                0.05,
                0.5,
                0.05,
                0.2,
                "Percentage of top performing assets to select",
            ),
        ],
    },
    StrategyDef {
        kind: StrategyKind::MeanReversionMl,
        label: "Mean Reversion ML",
        description: "Mean reversion strategy using RSI and future price prediction",
        params: &[
            number("window", "RSI Window", 5.0, 50.0, 1.0, 14.0, "Window size for RSI calculation"),
            range(
                "xPct",
                "Price Increase Threshold",
                0.005,
                0.05,
                0.001,
                0.01,
                "Minimum price increase percentage to trigger signal",
            ),
            number(
                "yDays",
                "Future Look Days",
                1.0,
                20.0,
                1.0,
                5.0,
                "Number of days to look ahead for price prediction",
            ),
            number(
                "rsiThreshold",
                "RSI Threshold",
                10.0,
                50.0,
                5.0,
                30.0,
                "RSI level below which to consider oversold conditions",
            ),
        ],
    },
    StrategyDef {
        kind: StrategyKind::VolatilityBreakout,
        label: "Volatility Breakout",
        description: "Breakout strategy based on Average True Range (ATR)",
        params: &[
            number("period", "ATR Period", 5.0, 50.0, 1.0, 14.0, "Period for ATR calculation"),
            range(
                "k",
                "Breakout Multiplier",
                0.5,
                3.0,
                0.1,
                1.0,
                "Multiplier for ATR to determine breakout level",
            ),
        ],
    },
];

pub fn default_params(kind: StrategyKind) -> BTreeMap<String, f64> {
    kind.def()
        .params
        .iter()
        .map(|p| (p.name.to_string(), p.default))
        .collect()
}

/// Parse a `YYYY-MM-DD` date, reporting which field was wrong.
pub fn parse_date(field: &str, s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("{field} must be a date like 2023-01-31")))
}

/// Backtest form state: strategy, parameters, symbol and date range.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterForm {
    strategy: StrategyKind,
    params: BTreeMap<String, f64>,
    pub symbol: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Default for ParameterForm {
    fn default() -> Self {
        Self::new(StrategyKind::BasicMomentum)
    }
}

impl ParameterForm {
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            params: default_params(strategy),
            symbol: String::new(),
            from: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            to: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
        }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn params(&self) -> &BTreeMap<String, f64> {
        &self.params
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    /// Switch strategy. Parameters reset to the new strategy's defaults even
    /// when the same strategy is reselected.
    pub fn select_strategy(&mut self, kind: StrategyKind) {
        self.strategy = kind;
        self.params = default_params(kind);
    }

    fn spec(&self, name: &str) -> Result<&'static ParamSpec, ApiError> {
        self.strategy.def().param(name).ok_or_else(|| {
            ApiError::Validation(format!(
                "unknown parameter '{name}' for {}",
                self.strategy.label()
            ))
        })
    }

    pub fn set_param(&mut self, name: &str, value: f64) -> Result<(), ApiError> {
        let spec = self.spec(name)?;
        if !spec.contains(value) {
            return Err(ApiError::Validation(format!(
                "{} must be between {} and {}",
                spec.label,
                spec.format(spec.min),
                spec.format(spec.max)
            )));
        }
        self.params.insert(name.to_string(), value);
        Ok(())
    }

    /// Step a parameter up or down by its step size. Select parameters move
    /// through their options instead.
    pub fn nudge(&mut self, name: &str, direction: i32) -> Result<f64, ApiError> {
        let spec = self.spec(name)?;
        let current = self.value(name).unwrap_or(spec.default);
        let next = if spec.kind == ParamKind::Select && !spec.options.is_empty() {
            let idx = spec
                .options
                .iter()
                .position(|(v, _)| *v == current)
                .unwrap_or(0) as i32;
            let len = spec.options.len() as i32;
            spec.options[(idx + direction).rem_euclid(len) as usize].0
        } else {
            spec.snap(current + f64::from(direction) * spec.step)
        };
        self.params.insert(name.to_string(), next);
        Ok(next)
    }

    fn validated_symbol(&self) -> Result<String, ApiError> {
        let symbol = self.symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(ApiError::Validation("Please select a symbol".into()));
        }
        if self.from > self.to {
            return Err(ApiError::Validation(
                "Start date must be on or before end date".into(),
            ));
        }
        for spec in self.strategy.def().params {
            let v = self.value(spec.name).unwrap_or(spec.default);
            if !spec.contains(v) {
                return Err(ApiError::Validation(format!(
                    "{} must be between {} and {}",
                    spec.label,
                    spec.format(spec.min),
                    spec.format(spec.max)
                )));
            }
        }
        Ok(symbol)
    }

    pub fn to_request(&self) -> Result<BacktestRequest, ApiError> {
        Ok(BacktestRequest {
            symbol: self.validated_symbol()?,
            from: self.from,
            to: self.to,
            strategy: self.strategy.id().to_string(),
            params: self.params.clone(),
        })
    }

    pub fn to_run_request(&self) -> Result<StrategyRunRequest, ApiError> {
        self.to_request().map(|req| StrategyRunRequest::from(&req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_kind_order() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.def().kind, kind);
        }
    }

    #[test]
    fn defaults_match_schema() {
        let p = default_params(StrategyKind::MeanReversionMl);
        assert_eq!(p.len(), 4);
        assert_eq!(p["window"], 14.0);
        assert_eq!(p["xPct"], 0.01);
        assert_eq!(p["yDays"], 5.0);
        assert_eq!(p["rsiThreshold"], 30.0);
    }

    #[test]
    fn switching_strategy_resets_params() {
        let mut form = ParameterForm::default();
        form.set_param("window", 50.0).unwrap();
        form.select_strategy(StrategyKind::VolatilityBreakout);
        assert_eq!(form.params(), &default_params(StrategyKind::VolatilityBreakout));
        form.select_strategy(StrategyKind::BasicMomentum);
        assert_eq!(form.value("window"), Some(20.0));
    }

    #[test]
    fn out_of_range_rejected() {
        let mut form = ParameterForm::new(StrategyKind::AdvancedMomentum);
        assert!(form.set_param("topPercent", 0.6).is_err());
        assert!(form.set_param("nope", 1.0).is_err());
        assert_eq!(form.value("topPercent"), Some(0.2));
    }

    #[test]
    fn nudge_snaps_to_grid_and_clamps() {
        let mut form = ParameterForm::new(StrategyKind::VolatilityBreakout);
        assert_eq!(form.nudge("k", 1).unwrap(), 1.1);
        form.set_param("k", 2.95).unwrap();
        assert_eq!(form.nudge("k", 1).unwrap(), 3.0);
        assert_eq!(form.nudge("k", 1).unwrap(), 3.0);
        form.set_param("period", 5.0).unwrap();
        assert_eq!(form.nudge("period", -1).unwrap(), 5.0);
    }

    #[test]
    fn request_requires_symbol_and_ordered_dates() {
        let mut form = ParameterForm::default();
        assert!(form.to_request().is_err());
        form.symbol = " spy ".into();
        let req = form.to_request().unwrap();
        assert_eq!(req.symbol, "SPY");
        assert_eq!(req.strategy, "basicMomentum");
        assert_eq!(req.params["window"], 20.0);

        form.from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(form.to_request().is_err());
    }

    #[test]
    fn endpoints_and_ids_parse() {
        assert_eq!(
            StrategyKind::from_id("mean-reversion-ml"),
            Some(StrategyKind::MeanReversionMl)
        );
        assert_eq!(
            StrategyKind::from_id("meanreversionml"),
            Some(StrategyKind::MeanReversionMl)
        );
        assert_eq!(StrategyKind::from_id("martingale"), None);
        assert_eq!(
            StrategyKind::VolatilityBreakout.endpoint(),
            "/strategies/volatility-breakout"
        );
    }
}
