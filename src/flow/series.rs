//! Sequential keyed map
//!
//! Same worker contract as [`map`](super::fan_out::map), but one key at a
//! time in enumeration order. The next worker starts only after the previous
//! key completed and the driver yielded back to the runtime. A failing chain
//! stops the series early with the results gathered so far.

use super::context::Context;
use super::fan_out::{Completion, Done, FanOutOutcome};
use super::keyed::{Key, Keyed};
use crate::diagnostic::{DiagnosticFactory, LogInput};
use crate::error::{Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::marker::PhantomData;
use tokio::sync::mpsc;
use tracing::{debug, debug_span, trace, warn, Instrument};
use uuid::Uuid;

/// Apply one worker to every entry of a keyed collection, one at a time
pub struct MapSeries<I, R, F> {
    items: Keyed<I>,
    worker: F,
    seed: LogInput,
    factory: DiagnosticFactory,
    _result: PhantomData<fn() -> R>,
}

/// Start building a sequential keyed map
pub fn map_series<I, R, F, Fut>(items: impl Into<Keyed<I>>, worker: F) -> MapSeries<I, R, F>
where
    F: FnMut(Context, Done<R>, I, Key) -> Fut,
    Fut: Future<Output = ()>,
{
    MapSeries {
        items: items.into(),
        worker,
        seed: LogInput::Empty,
        factory: DiagnosticFactory::default(),
        _result: PhantomData,
    }
}

impl<I, R, F, Fut> MapSeries<I, R, F>
where
    F: FnMut(Context, Done<R>, I, Key) -> Fut,
    Fut: Future<Output = ()>,
{
    pub fn seed(mut self, seed: impl Into<LogInput>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn factory(mut self, factory: DiagnosticFactory) -> Self {
        self.factory = factory;
        self
    }

    pub async fn run(self) -> Result<FanOutOutcome<R>> {
        let ctx = Context::seeded(self.factory, self.seed);
        let span = debug_span!("map_series", run_id = %Uuid::new_v4(), items = self.items.len());
        series(ctx, self.items, self.worker).instrument(span).await
    }
}

async fn series<I, R, F, Fut>(
    ctx: Context,
    items: Keyed<I>,
    mut worker: F,
) -> Result<FanOutOutcome<R>>
where
    F: FnMut(Context, Done<R>, I, Key) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut results = items.empty_like::<R>();
    let total = items.len();
    let mut in_flight = FuturesUnordered::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    debug!("map_series processing {} items", total);

    for (position, (key, item)) in items.into_entries().into_iter().enumerate() {
        if position > 0 {
            tokio::task::yield_now().await;
        }

        trace!("map_series starting key {}", key);
        let done = Done::new(key.clone(), tx.clone());
        in_flight.push(worker(ctx.clone(), done, item, key.clone()));

        // Earlier workers that already completed may still be running.
        let completion = loop {
            tokio::select! {
                biased;
                completion = rx.recv() => break completion,
                Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
            }
        };

        match completion {
            Some(Completion::Finished {
                key,
                diagnostic,
                result,
            }) => {
                results.set(&key, result);
                ctx.log(diagnostic);
            }
            Some(Completion::Dropped { key }) => {
                warn!("map_series worker for key {} dropped its callback", key);
                return Err(Error::abandoned("map_series", format!("key {}", key)));
            }
            None => return Err(Error::abandoned("map_series", format!("key {}", key))),
        }

        if ctx.failed() {
            debug!(
                "map_series stopped after {} of {} items (status {})",
                position + 1,
                total,
                ctx.highest_level()
            );
            return Ok(FanOutOutcome {
                chain: ctx.take_chain(),
                results,
            });
        }
    }

    debug!("map_series complete");
    Ok(FanOutOutcome {
        chain: ctx.take_chain(),
        results,
    })
}
