//! Span fields emitted for invocations and step ops.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use durable_step_sdk::{
    create_step_span, run_invocation, Context, InvocationInput, OpOpts, StepError, StepOp,
    StepOpCode,
};
use proptest::prelude::*;
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;

use common::*;

fn capture() -> (CapturedSpans, impl tracing::Subscriber) {
    let spans: CapturedSpans = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(TestLayer {
        spans: spans.clone(),
    });
    (spans, subscriber)
}

fn spans_named(spans: &CapturedSpans, name: &str) -> Vec<HashMap<String, String>> {
    spans
        .lock()
        .unwrap()
        .iter()
        .filter(|(span, _)| span == name)
        .map(|(_, fields)| fields.clone())
        .collect()
}

#[tokio::test]
async fn test_invocation_and_step_spans() {
    async fn handler(ctx: Context) -> Result<(), StepError> {
        ctx.step.run("step", || async { Ok(1u8) }).await?;
        Ok(())
    }

    let (spans, subscriber) = capture();
    let _guard = tracing::subscriber::set_default(subscriber);

    let input = InvocationInput::new(json!({}))
        .with_run_id("run-42")
        .with_attempt(3);
    let output = run_invocation(&handler, input, &config_at(epoch())).await;
    assert!(output.is_pending());

    let invocation = spans_named(&spans, "invocation");
    assert_eq!(invocation.len(), 1);
    assert_eq!(invocation[0]["run_id"], "run-42");
    assert_eq!(invocation[0]["attempt"], "3");

    let steps = spans_named(&spans, "step");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["op"], "Step");
    assert_eq!(steps[0]["id"], "step");
    assert_eq!(steps[0]["hash"], RUN_STEP);
    assert_eq!(steps[0]["pos"], "0");
}

#[tokio::test]
async fn test_memoized_steps_open_no_span() {
    async fn handler(ctx: Context) -> Result<(), StepError> {
        ctx.step.sleep("1m").await?;
        ctx.step.sleep("1m").await?;
        Ok(())
    }

    let (spans, subscriber) = capture();
    let _guard = tracing::subscriber::set_default(subscriber);

    let input = input_with(json!({}), &[(SLEEP_1M, null_step())]);
    let output = run_invocation(&handler, input, &config_at(epoch())).await;
    assert_eq!(pending_op(&output).hash, SLEEP_1M_REPEAT);

    let steps = spans_named(&spans, "step");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["hash"], SLEEP_1M_REPEAT);
    assert_eq!(steps[0]["pos"], "1");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Every step span carries the op's code, id, hash and position.
    #[test]
    fn prop_step_span_includes_op_fields(
        code in prop_oneof![
            Just(StepOpCode::RunStep),
            Just(StepOpCode::Sleep),
            Just(StepOpCode::WaitForEvent),
        ],
        id in "[a-z][a-z0-9/._-]{0,31}",
        hash in "[0-9a-f]{40}",
        pos in 0usize..1000,
    ) {
        let op = StepOp::new(code, id.clone(), OpOpts::default(), hash.clone(), pos);
        let (spans, subscriber) = capture();

        tracing::subscriber::with_default(subscriber, || {
            let span = create_step_span(&op);
            let _entered = span.enter();
        });

        let steps = spans_named(&spans, "step");
        prop_assert_eq!(steps.len(), 1);
        prop_assert_eq!(&steps[0]["op"], &code.to_string());
        prop_assert_eq!(&steps[0]["id"], &id);
        prop_assert_eq!(&steps[0]["hash"], &hash);
        prop_assert_eq!(&steps[0]["pos"], &pos.to_string());
        prop_assert!(!steps[0].contains_key("status"));
    }
}
