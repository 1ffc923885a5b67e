//! Property tests for client-side invariants.
//!
//! 1. Drawdown is never positive and is zero at running highs
//! 2. The replay cursor stays in `[0, max_steps - 1]` under any input
//! 3. Nudged strategy parameters stay inside their declared range
//! 4. Order-log CSV has one row per filtered entry plus a header

use proptest::prelude::*;
use tradedash_core::chart::{drawdown_series, max_drawdown};
use tradedash_core::domain::OrderLog;
use tradedash_core::export::{filter_logs, order_logs_csv};
use tradedash_core::replay::ReplayStepper;
use tradedash_core::strategy::{ParameterForm, StrategyKind};

fn arb_equity() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1_000_000.0_f64, 0..200)
}

#[derive(Debug, Clone)]
enum StepOp {
    By(i64),
    Toggle,
    Tick,
    Start,
    End,
}

fn arb_op() -> impl Strategy<Value = StepOp> {
    prop_oneof![
        (-50i64..50).prop_map(StepOp::By),
        Just(StepOp::Toggle),
        Just(StepOp::Tick),
        Just(StepOp::Start),
        Just(StepOp::End),
    ]
}

proptest! {
    #[test]
    fn drawdown_non_positive_and_zero_at_highs(eq in arb_equity()) {
        let dd = drawdown_series(&eq);
        prop_assert_eq!(dd.len(), eq.len());
        let mut peak = f64::NEG_INFINITY;
        for (v, d) in eq.iter().zip(&dd) {
            prop_assert!(*d <= 0.0);
            prop_assert!(*d >= -1.0);
            if *v >= peak {
                peak = *v;
                prop_assert_eq!(*d, 0.0);
            }
        }
        let worst = dd.iter().copied().fold(0.0, f64::min);
        prop_assert_eq!(max_drawdown(&eq), worst);
    }

    #[test]
    fn stepper_stays_in_bounds(max in 0usize..50, ops in prop::collection::vec(arb_op(), 0..100)) {
        let mut s = ReplayStepper::new(max);
        for op in ops {
            match op {
                StepOp::By(d) => s.step_by(d),
                StepOp::Toggle => s.toggle_play(),
                StepOp::Tick => { s.tick(); }
                StepOp::Start => s.jump_to_start(),
                StepOp::End => s.jump_to_end(),
            }
            prop_assert!(s.step() < s.max_steps());
            prop_assert!(s.max_steps() >= 1);
        }
    }

    #[test]
    fn nudged_params_stay_in_range(
        kind_idx in 0usize..4,
        moves in prop::collection::vec((0usize..4, -3i32..=3), 0..60),
    ) {
        let kind = StrategyKind::ALL[kind_idx];
        let mut form = ParameterForm::new(kind);
        let specs = kind.def().params;
        for (p, dir) in moves {
            let spec = &specs[p % specs.len()];
            form.nudge(spec.name, dir).unwrap();
        }
        for spec in specs {
            let v = form.value(spec.name).unwrap();
            prop_assert!(spec.contains(v), "{} = {} outside [{}, {}]", spec.name, v, spec.min, spec.max);
        }
    }

    #[test]
    fn csv_rows_match_filtered_logs(
        entries in prop::collection::vec(("[A-Z]{1,4}", prop_oneof!["filled", "rejected", "new"]), 0..30),
        filter in prop_oneof![Just(String::new()), "[a-z]{1,2}"],
    ) {
        let logs: Vec<OrderLog> = entries
            .into_iter()
            .enumerate()
            .map(|(i, (symbol, status))| OrderLog {
                id: i.to_string(),
                symbol: Some(symbol),
                status: Some(status.to_string()),
                ..Default::default()
            })
            .collect();
        let filtered = filter_logs(&logs, &filter);
        match order_logs_csv(&filtered).unwrap() {
            None => prop_assert!(filtered.is_empty()),
            Some(csv) => prop_assert_eq!(csv.lines().count(), filtered.len() + 1),
        }
    }
}
