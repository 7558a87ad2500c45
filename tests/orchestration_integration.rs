//! Integration tests for orchestration through the public API
//!
//! These tests compose the primitives the way a request handler would and
//! check that every report ends up in the chain handed back to the caller.

use cascade::diagnostic::ErrorValue;
use cascade::flow::Task;
use cascade::{
    map, map_series, parallel, task, Context, Diagnostic, DiagnosticConfig, DiagnosticFactory,
    Done, Error, Key, Keyed, LogInput, LogParts, Next, StatusCode, Waterfall,
};
use serde_json::{json, Map, Value};
use std::time::Duration;

fn user_payload(id: u64) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("user_id".to_string(), json!(id));
    payload
}

/// A pipeline step that fans out internally and forwards the nested chain
#[tokio::test]
async fn test_nested_fan_out_inside_pipeline() {
    let outcome = Waterfall::new()
        .step(|_ctx, next: Next, _args| async move {
            next.pass([json!([1, 2, 3])]);
        })
        .step(|_ctx, next: Next, args: Vec<Value>| async move {
            let ids: Vec<u64> = args
                .first()
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
                .unwrap_or_default();

            let lookup = map(ids, |ctx: Context, done: Done<Value>, id: u64, _key| async move {
                tokio::time::sleep(Duration::from_millis(10 / id)).await;
                done.call(
                    ctx.factory().ok(format!("loaded {}", id)).with_payload(user_payload(id)),
                    Some(json!({ "id": id })),
                );
            })
            .run()
            .await;

            match lookup {
                Ok(found) => {
                    let users: Vec<Value> = found
                        .results
                        .into_entries()
                        .into_iter()
                        .filter_map(|(_, user)| user)
                        .collect();
                    next.call(found.chain, vec![Value::Array(users)]);
                }
                Err(err) => next.break_with(ErrorValue::from(err)),
            }
        })
        .run()
        .await
        .unwrap();

    assert!(!outcome.failed());
    assert_eq!(outcome.chain.len(), 3);
    assert_eq!(outcome.values, vec![json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }])]);
    assert!(outcome
        .chain
        .iter()
        .all(|record| record.payload().contains_key("user_id")));
}

#[tokio::test]
async fn test_failing_pipeline_converts_at_the_boundary() {
    let outcome = Waterfall::new()
        .step(|ctx: Context, next: Next, _args| async move {
            ctx.log(ctx.factory().accepted("validated"));
            next.done();
        })
        .step(|ctx: Context, next: Next, _args| async move {
            let parts = LogParts::new()
                .status(StatusCode::CONFLICT)
                .message("email already registered")
                .payload(user_payload(7));
            match LogInput::try_from(parts) {
                Ok(input) => next.report(input),
                Err(err) => next.break_with(ctx.factory().bad_request(err.to_string())),
            }
        })
        .step(|_ctx, _next: Next, _args| async move {
            unreachable!("runs only when the chain is healthy");
        })
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.chain.status(), 409);
    assert_eq!(outcome.chain.payload().get("user_id"), Some(&json!(7)));

    match outcome.chain.into_result() {
        Err(Error::Failed { status, message }) => {
            assert_eq!(status, 409);
            assert_eq!(message, "email already registered");
        }
        other => panic!("expected a failed result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_configured_factory_applies_to_every_record() {
    let config = DiagnosticConfig::from_toml_str(
        r#"
default_status = 503
display = "Try again later."
"#,
    )
    .unwrap();
    let factory = DiagnosticFactory::new(config);

    let outcome = parallel(Keyed::map([
        (
            "cache",
            task(|ctx: Context, done: Done<()>| async move {
                done.fail(ctx.factory().normalize("cache unreachable"));
            }),
        ),
        (
            "db",
            task(|_ctx, done: Done<()>| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.finish();
            }),
        ),
    ]))
    .factory(factory)
    .run()
    .await
    .unwrap();

    assert_eq!(outcome.chain.status(), 503);
    assert_eq!(outcome.chain.display(), Some("Try again later."));
}

#[tokio::test]
async fn test_series_of_pipelines() {
    let worker = |_ctx: Context, done: Done<usize>, name: &'static str, _key: Key| async move {
        let run = Waterfall::new()
            .step(move |ctx: Context, next: Next, _args| async move {
                next.call(ctx.factory().created(name), vec![json!(name.len())]);
            })
            .run()
            .await;

        match run {
            Ok(inner) => {
                let length = inner.values.first().and_then(Value::as_u64).map(|n| n as usize);
                done.call(inner.chain, length);
            }
            Err(err) => done.fail(ErrorValue::from(err)),
        }
    };

    let outcome = map_series(vec!["alpha", "beta"], worker).run().await.unwrap();

    let messages: Vec<&str> = outcome.chain.history().iter().filter_map(|r| r.message()).collect();
    assert_eq!(messages, vec!["alpha", "beta"]);
    assert_eq!(outcome.results, Keyed::list([Some(5), Some(4)]));
}

#[tokio::test]
async fn test_abandoned_run_reports_instead_of_hanging() {
    let tasks: Vec<Box<dyn Task<u8>>> = vec![
        task(|_ctx, done: Done<u8>| async move { done.ok(1) }),
        task(|_ctx, done: Done<u8>| async move { drop(done) }),
    ];

    let result = tokio::time::timeout(Duration::from_secs(1), parallel(tasks).run())
        .await
        .expect("an abandoned run resolves on its own");

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Abandoned { primitive: "parallel", .. }));
    assert_eq!(err.status(), 500);
}

#[test]
fn test_merge_outside_any_run() {
    let f = DiagnosticFactory::default();
    let earlier = f.ok("read config");
    let later = f.not_found("no such user");

    let chain = Diagnostic::merge(earlier, later);
    assert_eq!(chain.status(), 404);
    assert_eq!(chain.previous().map(|r| r.status()), Some(200));
    assert_eq!(Diagnostic::merge(chain.clone(), Diagnostic::none()), chain);
}

#[test]
fn test_run_from_synchronous_code() {
    let outcome = tokio_test::block_on(
        map(vec![2, 3], |_ctx, done: Done<i32>, item: i32, _key| async move {
            done.ok(item * item)
        })
        .run(),
    )
    .unwrap();

    assert_eq!(outcome.results.into_complete(), Some(Keyed::list([4, 9])));
}
