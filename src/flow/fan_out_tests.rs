//! Tests for keyed and named fan-out

use super::context::Context;
use super::fan_out::*;
use super::keyed::{Key, Keyed};
use crate::diagnostic::DiagnosticFactory;
use crate::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

mod map_tests {
    use super::*;

    #[tokio::test]
    async fn test_map_with_synchronous_worker() {
        let outcome = map(vec!["one", "two", "three"], |_ctx, done: Done<String>, item, key| {
            async move { done.ok(format!("{}{}", item, key)) }
        })
        .run()
        .await
        .unwrap();

        assert!(outcome.chain.is_none());
        assert_eq!(
            outcome.results,
            Keyed::list([Some("one0".to_string()), Some("two1".to_string()), Some("three2".to_string())])
        );
    }

    #[tokio::test]
    async fn test_map_over_named_entries() {
        let items = Keyed::map([("first", "Hey"), ("second", "1"), ("third", "two")]);

        let outcome = map(items, |_ctx, done: Done<String>, item, _key| async move {
            tokio::task::yield_now().await;
            done.ok(item.to_string());
        })
        .run()
        .await
        .unwrap();

        let complete = outcome.results.into_complete().unwrap();
        assert!(!complete.is_list());
        assert_eq!(complete.keys(), vec![Key::from("first"), Key::from("second"), Key::from("third")]);
        let joined: Vec<&str> = (0..complete.len()).map(|i| complete[i].as_str()).collect();
        assert_eq!(joined.join(" "), "Hey 1 two");
    }

    #[tokio::test]
    async fn test_results_keep_key_order_when_completion_is_reversed() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let order = finished.clone();

        let outcome = map(vec![0u64, 1, 2], move |_ctx, done: Done<u64>, item: u64, _key| {
            let order = order.clone();
            async move {
                sleep(Duration::from_millis((3 - item) * 15)).await;
                order.lock().unwrap().push(item);
                done.ok(item * 10);
            }
        })
        .run()
        .await
        .unwrap();

        assert_eq!(*finished.lock().unwrap(), vec![2, 1, 0]);
        assert_eq!(outcome.results, Keyed::list([Some(0), Some(10), Some(20)]));
    }

    #[tokio::test]
    async fn test_every_worker_starts_before_any_completes() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let log = events.clone();

        map(vec![1, 2, 3], move |_ctx, done: Done<i32>, item: i32, _key| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(format!("start {}", item));
                tokio::task::yield_now().await;
                log.lock().unwrap().push(format!("done {}", item));
                done.ok(item);
            }
        })
        .run()
        .await
        .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(events[..3], ["start 1", "start 2", "start 3"]);
    }

    #[tokio::test]
    async fn test_empty_input_completes_immediately() {
        let outcome = map(Vec::<i32>::new(), |_ctx, done: Done<i32>, item: i32, _key| async move {
            done.ok(item)
        })
        .run()
        .await
        .unwrap();

        assert!(outcome.chain.is_none());
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_collected_without_short_circuit() {
        let outcome = map(vec![1, 2, 3], |ctx: Context, done: Done<i32>, item: i32, _key| async move {
            sleep(Duration::from_millis(item as u64 * 5)).await;
            match item {
                2 => done.fail(ctx.factory().not_found("missing 2")),
                _ => done.ok(item),
            }
        })
        .run()
        .await
        .unwrap();

        assert_eq!(outcome.chain.status(), 404);
        assert!(outcome.failed());
        assert_eq!(outcome.results, Keyed::list([Some(1), None, Some(3)]));
    }

    #[tokio::test]
    async fn test_worst_failure_wins_regardless_of_order() {
        let outcome = map(vec![503u16, 404], |ctx: Context, done: Done<()>, status: u16, _key| {
            async move {
                // The 404 lands last and heads the chain.
                let delay = if status == 503 { 5 } else { 20 };
                sleep(Duration::from_millis(delay)).await;
                done.fail(ctx.factory().record(status, "upstream"));
            }
        })
        .run()
        .await
        .unwrap();

        assert_eq!(outcome.chain.len(), 2);
        assert_eq!(outcome.chain.status(), 404);
        assert_eq!(outcome.chain.highest_level(), 503);
    }

    #[tokio::test]
    async fn test_call_reports_and_stores() {
        let outcome = map(vec!["a"], |ctx: Context, done: Done<&'static str>, _item, _key| {
            async move { done.call(ctx.factory().created("made"), Some("value")) }
        })
        .run()
        .await
        .unwrap();

        assert_eq!(outcome.chain.status(), 201);
        assert_eq!(outcome.results.value(0usize), Some(&"value"));
    }

    #[tokio::test]
    async fn test_dropped_done_abandons_run() {
        let result = map(vec![1, 2, 3], |_ctx, done: Done<i32>, item: i32, _key| async move {
            if item != 2 {
                done.ok(item);
            }
        })
        .run()
        .await;

        match result {
            Err(Error::Abandoned { primitive, position }) => {
                assert_eq!(primitive, "map");
                assert_eq!(position, "key 1");
            }
            other => panic!("expected abandonment, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_done_from_spawned_task() {
        let outcome = map(vec![4, 5], |_ctx, done: Done<i32>, item: i32, _key| async move {
            tokio::spawn(async move {
                sleep(Duration::from_millis(5)).await;
                done.ok(item * 2);
            });
        })
        .run()
        .await
        .unwrap();

        assert_eq!(outcome.results, Keyed::list([Some(8), Some(10)]));
    }

    #[tokio::test]
    async fn test_seed_is_oldest_record() {
        let f = DiagnosticFactory::default();
        let outcome = map(vec![1], |ctx: Context, done: Done<i32>, item: i32, _key| async move {
            done.call(ctx.factory().accepted("worker"), Some(item));
        })
        .seed(f.created("seed"))
        .run()
        .await
        .unwrap();

        let statuses: Vec<u16> = outcome.chain.history().iter().map(|r| r.status()).collect();
        assert_eq!(statuses, vec![201, 202]);
    }
}

mod parallel_tests {
    use super::*;

    fn delayed(millis: u64, value: &'static str) -> Box<dyn Task<&'static str>> {
        task(move |_ctx, done: Done<&'static str>| async move {
            sleep(Duration::from_millis(millis)).await;
            done.ok(value);
        })
    }

    #[tokio::test]
    async fn test_named_tasks_land_at_their_names() {
        let outcome = parallel(Keyed::map([
            ("ONE", delayed(30, "one")),
            ("TWO", delayed(10, "two")),
            ("THREE", delayed(20, "three")),
        ]))
        .run()
        .await
        .unwrap();

        assert!(outcome.chain.is_none());
        assert_eq!(outcome.results.value("ONE"), Some(&"one"));
        assert_eq!(outcome.results.value("TWO"), Some(&"two"));
        assert_eq!(outcome.results.value("THREE"), Some(&"three"));
        assert_eq!(
            outcome.results.keys(),
            vec![Key::from("ONE"), Key::from("TWO"), Key::from("THREE")]
        );
    }

    #[tokio::test]
    async fn test_positional_tasks() {
        let outcome = parallel(vec![delayed(15, "slow"), delayed(0, "fast")])
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.results, Keyed::list([Some("slow"), Some("fast")]));
    }

    #[tokio::test]
    async fn test_tasks_log_into_shared_chain() {
        let outcome = parallel(Keyed::map([
            (
                "audit",
                task(|ctx: Context, done: Done<u8>| async move {
                    ctx.log(ctx.factory().accepted("queued"));
                    done.finish();
                }),
            ),
            (
                "write",
                task(|ctx: Context, done: Done<u8>| async move {
                    sleep(Duration::from_millis(5)).await;
                    done.call(ctx.factory().service_unavailable("store offline"), Some(1));
                }),
            ),
        ]))
        .run()
        .await
        .unwrap();

        assert_eq!(outcome.chain.len(), 2);
        assert_eq!(outcome.chain.status(), 503);
        assert_eq!(outcome.results.value("audit"), None);
        assert_eq!(outcome.results.value("write"), Some(&1));
    }

    #[tokio::test]
    async fn test_empty_parallel() {
        let outcome = parallel(Vec::<Box<dyn Task<()>>>::new()).run().await.unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.chain.is_none());
    }

    #[tokio::test]
    async fn test_dropped_task_callback_abandons_run() {
        let result = parallel(Keyed::map([
            ("kept", delayed(0, "x")),
            ("lost", task(|_ctx, done: Done<&'static str>| async move { drop(done) })),
        ]))
        .run()
        .await;

        assert!(matches!(
            result,
            Err(Error::Abandoned { primitive: "parallel", ref position }) if position == "key lost"
        ));
    }
}
