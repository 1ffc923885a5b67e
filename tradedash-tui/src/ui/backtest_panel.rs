//! Panel 2: strategy parameters on the left, equity and drawdown on the right.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use tradedash_core::chart::{date_labels, drawdown_series, equity_points, indexed_points, max_drawdown};
use tradedash_core::domain::BacktestResult;
use tradedash_core::strategy::ParamKind;

use crate::app::{AppState, BacktestRow, EditTarget};
use crate::theme::{self, THEME};
use crate::ui::widgets::{
    empty_message, fmt_pct, fmt_whole, form_row, line_chart, money, pct, Series,
};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(20)])
        .split(area);

    render_form(f, chunks[0], app);
    match &app.backtest.result {
        Some(result) if !result.equity_curve.is_empty() => render_result(f, chunks[1], result),
        _ => empty_message(
            f,
            chunks[1],
            &["Set parameters and press g to run a backtest."],
        ),
    }
}

fn render_form(f: &mut Frame, area: Rect, app: &AppState) {
    let bt = &app.backtest;
    let form = &bt.form;
    let kind = form.strategy();
    let editing = |target: EditTarget| {
        app.edit
            .as_ref()
            .filter(|e| e.target == target)
            .map(|e| e.buffer.as_str())
    };

    let mut lines = vec![
        form_row(
            "Strategy",
            format!("< {} >", kind.label()),
            bt.row() == BacktestRow::Strategy,
            None,
        ),
        form_row(
            "Symbol",
            form.symbol.clone(),
            bt.row() == BacktestRow::Symbol,
            editing(EditTarget::BacktestSymbol),
        ),
        form_row(
            "From",
            form.from.to_string(),
            bt.row() == BacktestRow::From,
            editing(EditTarget::BacktestFrom),
        ),
        form_row(
            "To",
            form.to.to_string(),
            bt.row() == BacktestRow::To,
            editing(EditTarget::BacktestTo),
        ),
        Line::from(""),
        Line::from(Span::styled("Parameters", theme::neutral())),
    ];

    for (i, spec) in kind.def().params.iter().enumerate() {
        let value = form.value(spec.name).unwrap_or(spec.default);
        let text = match spec.kind {
            ParamKind::Select => spec
                .options
                .iter()
                .find(|(v, _)| *v == value)
                .map_or_else(|| spec.format(value), |(_, name)| format!("< {name} >")),
            _ => format!(
                "{}  ({}..{})",
                spec.format(value),
                spec.format(spec.min),
                spec.format(spec.max)
            ),
        };
        lines.push(form_row(
            spec.label,
            text,
            bt.row() == BacktestRow::Param(i),
            None,
        ));
    }

    lines.push(Line::from(""));
    if !app.symbols.is_empty() {
        let known = app
            .symbols
            .iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(&form.symbol));
        let text = known.map_or_else(
            || format!("{} not in the symbol list", form.symbol),
            |s| s.label(),
        );
        let style = if known.is_some() {
            theme::muted()
        } else {
            theme::warning()
        };
        lines.push(Line::from(Span::styled(text, style)));
    }
    lines.push(Line::from(Span::styled(
        "j/k row  h/l adjust  Enter edit  d defaults",
        theme::muted(),
    )));
    lines.push(Line::from(Span::styled("g run  x export CSV", theme::muted())));

    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(theme::muted());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_result(f: &mut Frame, area: Rect, result: &BacktestResult) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(65),
            Constraint::Min(5),
        ])
        .split(area);

    let total = result.total_return().unwrap_or(0.0);
    let mdd = max_drawdown(&result.equity_curve);
    let header = vec![
        Span::styled(" Final equity ", theme::muted()),
        Span::styled(money(result.final_equity()), theme::accent_bold()),
        Span::styled("   Return ", theme::muted()),
        Span::styled(pct(total), theme::pnl(total)),
        Span::styled("   Max DD ", theme::muted()),
        Span::styled(pct(mdd), theme::negative()),
    ];
    let mut metrics = Vec::new();
    for (name, value) in result.scalar_metrics().into_iter().take(6) {
        metrics.push(Span::styled(format!(" {name} "), theme::muted()));
        metrics.push(Span::styled(format!("{value:.2} "), theme::text()));
    }
    f.render_widget(
        Paragraph::new(vec![Line::from(header), Line::from(metrics)]),
        chunks[0],
    );

    let labels = date_labels(&result.dates);
    let equity = equity_points(&result.dates, &result.equity_curve);
    line_chart(
        f,
        chunks[1],
        &[Series {
            name: "Equity".into(),
            points: &equity,
            color: THEME.accent,
        }],
        &labels,
        "Equity",
        fmt_whole,
    );

    let drawdown = indexed_points(&drawdown_series(&result.equity_curve));
    line_chart(
        f,
        chunks[2],
        &[Series {
            name: "Drawdown".into(),
            points: &drawdown,
            color: THEME.negative,
        }],
        &labels,
        "Drawdown",
        fmt_pct,
    );
}
