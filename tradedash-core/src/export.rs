//! CSV export for order logs, replay steps and backtest equity.
//!
//! Every field is quoted. Exports are written as
//! `<dir>/<stem>_<YYYYmmdd_HHMMSS>.csv`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::chart::drawdown_series;
use crate::domain::{BacktestResult, OrderLog};
use crate::replay::ReplaySet;

pub const ORDER_LOG_HEADERS: [&str; 8] = [
    "Symbol",
    "Qty",
    "Side",
    "Type",
    "Status",
    "Submitted",
    "Filled",
    "Error",
];

pub const REPLAY_HEADERS: [&str; 7] = [
    "Symbol",
    "Date",
    "Price",
    "Action",
    "Equity",
    "Position",
    "TradeInfo",
];

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(vec![])
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Case-insensitive substring match on symbol or status. An empty filter
/// keeps every entry.
pub fn filter_logs<'a>(logs: &'a [OrderLog], filter: &str) -> Vec<&'a OrderLog> {
    let needle = filter.trim().to_lowercase();
    if needle.is_empty() {
        return logs.iter().collect();
    }
    let hit = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains(&needle))
    };
    logs.iter()
        .filter(|log| hit(&log.symbol) || hit(&log.status))
        .collect()
}

/// RFC 3339 timestamps in local time; anything else passes through.
fn local_time(raw: Option<&str>) -> String {
    match raw {
        None | Some("") => "-".to_string(),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| {
                dt.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|_| s.to_string()),
    }
}

fn qty_text(qty: Option<f64>) -> String {
    qty.map(|q| q.to_string()).unwrap_or_default()
}

/// CSV of the filtered logs, or `None` when the filter leaves nothing.
pub fn order_logs_csv(logs: &[&OrderLog]) -> Result<Option<String>> {
    if logs.is_empty() {
        return Ok(None);
    }
    let mut wtr = writer();
    wtr.write_record(ORDER_LOG_HEADERS)?;
    for log in logs {
        wtr.write_record([
            log.symbol.as_deref().unwrap_or(""),
            qty_text(log.qty).as_str(),
            log.side.as_deref().unwrap_or(""),
            log.kind.as_deref().unwrap_or(""),
            log.status.as_deref().unwrap_or(""),
            local_time(log.submitted_at.as_deref()).as_str(),
            local_time(log.filled_at.as_deref()).as_str(),
            log.error.as_deref().filter(|e| !e.is_empty()).unwrap_or("-"),
        ])?;
    }
    finish(wtr).map(Some)
}

fn json_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One row per step per successfully loaded symbol, under a single header.
pub fn replay_csv(set: &ReplaySet) -> Result<String> {
    let mut wtr = writer();
    wtr.write_record(REPLAY_HEADERS)?;
    for (symbol, replay) in set.loaded() {
        for step in &replay.steps {
            wtr.write_record([
                symbol,
                step.date.as_str(),
                step.price.map(|p| p.to_string()).unwrap_or_default().as_str(),
                step.action.as_str(),
                step.equity.to_string().as_str(),
                json_cell(&step.position).as_str(),
                step.trade_info
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_default()
                    .as_str(),
            ])?;
        }
    }
    finish(wtr)
}

/// `date,equity,drawdown` for a backtest result.
pub fn backtest_csv(result: &BacktestResult) -> Result<String> {
    let drawdown = drawdown_series(&result.equity_curve);
    let mut wtr = writer();
    wtr.write_record(["date", "equity", "drawdown"])?;
    for ((date, eq), dd) in result.dates.iter().zip(&result.equity_curve).zip(&drawdown) {
        wtr.write_record([date.as_str(), format!("{eq:.2}").as_str(), format!("{dd:.6}").as_str()])?;
    }
    finish(wtr)
}

/// Write `content` to a timestamped file under `dir`, creating it if needed.
pub fn write_export(dir: &Path, stem: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir: {}", dir.display()))?;
    let path = dir.join(format!(
        "{stem}_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    std::fs::write(&path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(symbol: &str, status: &str) -> OrderLog {
        OrderLog {
            id: symbol.into(),
            symbol: Some(symbol.into()),
            qty: Some(2.0),
            side: Some("buy".into()),
            kind: Some("market".into()),
            status: Some(status.into()),
            ..Default::default()
        }
    }

    #[test]
    fn filter_matches_symbol_or_status() {
        let logs = vec![log("AAPL", "filled"), log("MSFT", "rejected"), log("TSLA", "filled")];
        assert_eq!(filter_logs(&logs, "").len(), 3);
        assert_eq!(filter_logs(&logs, "aap").len(), 1);
        assert_eq!(filter_logs(&logs, "FILL").len(), 2);
        assert!(filter_logs(&logs, "zzz").is_empty());
    }

    #[test]
    fn empty_selection_exports_nothing() {
        assert!(order_logs_csv(&[]).unwrap().is_none());
    }

    #[test]
    fn missing_fields_become_dashes() {
        let entry = log("AAPL", "filled");
        let csv = order_logs_csv(&[&entry]).unwrap().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            r#""Symbol","Qty","Side","Type","Status","Submitted","Filled","Error""#
        );
        assert_eq!(lines[1], r#""AAPL","2","buy","market","filled","-","-","-""#);
    }

    #[test]
    fn backtest_rows_align_with_dates() {
        let result = BacktestResult {
            dates: vec!["2024-01-02".into(), "2024-01-03".into()],
            equity_curve: vec![100.0, 90.0],
            ..Default::default()
        };
        let csv = backtest_csv(&result).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], r#""2024-01-03","90.00","-0.100000""#);
    }

    #[test]
    fn export_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(&dir.path().join("out"), "order_logs", "a,b\n").unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("order_logs_"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b\n");
    }
}
