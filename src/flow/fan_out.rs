//! Keyed and named fan-out
//!
//! Every worker is launched up front, in key order, each with its own
//! single-use [`Done`] callback. Completions may arrive in any order; each
//! one stores its result at its own key and folds its diagnostic into the
//! shared chain. The run finishes once every key has completed. Failures are
//! collected, never short-circuited.

use super::context::Context;
use super::keyed::{Key, Keyed};
use crate::diagnostic::{Diagnostic, DiagnosticFactory, LogInput};
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use tokio::sync::mpsc;
use tracing::{debug, debug_span, trace, warn, Instrument};
use uuid::Uuid;

/// Final state of a fan-out run
#[derive(Debug, Clone, PartialEq)]
pub struct FanOutOutcome<R> {
    pub chain: Diagnostic,
    /// Results at their input keys; `None` where a worker supplied nothing
    pub results: Keyed<Option<R>>,
}

impl<R> FanOutOutcome<R> {
    pub fn failed(&self) -> bool {
        self.chain.failed()
    }
}

#[derive(Debug)]
pub(crate) enum Completion<R> {
    Finished {
        key: Key,
        diagnostic: LogInput,
        result: Option<R>,
    },
    Dropped {
        key: Key,
    },
}

/// Completion callback for one key. Consumed by use, so it fires at most once.
#[derive(Debug)]
pub struct Done<R> {
    key: Key,
    tx: Option<mpsc::UnboundedSender<Completion<R>>>,
}

impl<R> Done<R> {
    pub(crate) fn new(key: Key, tx: mpsc::UnboundedSender<Completion<R>>) -> Self {
        Self { key, tx: Some(tx) }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Complete this key, reporting `diagnostic` and storing `result`
    pub fn call(mut self, diagnostic: impl Into<LogInput>, result: Option<R>) {
        if let Some(tx) = self.tx.take() {
            let completion = Completion::Finished {
                key: self.key.clone(),
                diagnostic: diagnostic.into(),
                result,
            };
            if tx.send(completion).is_err() {
                trace!("Completion for key {} arrived after the run finished", self.key);
            }
        }
    }

    pub fn ok(self, result: R) {
        self.call((), Some(result));
    }

    /// Complete with a diagnostic and no result
    pub fn fail(self, diagnostic: impl Into<LogInput>) {
        self.call(diagnostic, None);
    }

    /// Complete with nothing to report
    pub fn finish(self) {
        self.call((), None);
    }
}

impl<R> Drop for Done<R> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Completion::Dropped {
                key: self.key.clone(),
            });
        }
    }
}

/// A named or positional task for [`Parallel`]
pub trait Task<R>: Send {
    fn start(self: Box<Self>, ctx: Context, done: Done<R>) -> BoxFuture<'static, ()>;
}

impl<R, F, Fut> Task<R> for F
where
    F: FnOnce(Context, Done<R>) -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn start(self: Box<Self>, ctx: Context, done: Done<R>) -> BoxFuture<'static, ()> {
        Box::pin((*self)(ctx, done))
    }
}

/// Box a closure as a [`Task`]
pub fn task<R, F, Fut>(f: F) -> Box<dyn Task<R>>
where
    R: 'static,
    F: FnOnce(Context, Done<R>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(f)
}

/// Apply one worker to every entry of a keyed collection concurrently
pub struct KeyedFanOut<I, R, F> {
    items: Keyed<I>,
    worker: F,
    seed: LogInput,
    factory: DiagnosticFactory,
    _result: PhantomData<fn() -> R>,
}

/// Start building a keyed fan-out
pub fn map<I, R, F, Fut>(items: impl Into<Keyed<I>>, worker: F) -> KeyedFanOut<I, R, F>
where
    F: FnMut(Context, Done<R>, I, Key) -> Fut,
    Fut: Future<Output = ()>,
{
    KeyedFanOut {
        items: items.into(),
        worker,
        seed: LogInput::Empty,
        factory: DiagnosticFactory::default(),
        _result: PhantomData,
    }
}

impl<I, R, F, Fut> KeyedFanOut<I, R, F>
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
        let span = debug_span!("map", run_id = %Uuid::new_v4(), items = self.items.len());
        fan_out("map", ctx, self.items, self.worker)
            .instrument(span)
            .await
    }
}

/// Run a set of independent tasks concurrently
pub struct Parallel<R> {
    tasks: Keyed<Box<dyn Task<R>>>,
    seed: LogInput,
    factory: DiagnosticFactory,
}

/// Start building a named (or positional) fan-out
pub fn parallel<R>(tasks: impl Into<Keyed<Box<dyn Task<R>>>>) -> Parallel<R> {
    Parallel {
        tasks: tasks.into(),
        seed: LogInput::Empty,
        factory: DiagnosticFactory::default(),
    }
}

impl<R> Parallel<R> {
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
        let span = debug_span!("parallel", run_id = %Uuid::new_v4(), tasks = self.tasks.len());
        fan_out("parallel", ctx, self.tasks, |ctx, done, task: Box<dyn Task<R>>, _key| {
            task.start(ctx, done)
        })
        .instrument(span)
        .await
    }
}

pub(crate) async fn fan_out<I, R, F, Fut>(
    primitive: &'static str,
    ctx: Context,
    items: Keyed<I>,
    mut worker: F,
) -> Result<FanOutOutcome<R>>
where
    F: FnMut(Context, Done<R>, I, Key) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut results = items.empty_like::<R>();
    let mut waiting: HashSet<Key> = HashSet::with_capacity(items.len());
    let mut in_flight = FuturesUnordered::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    debug!("{} launching {} workers", primitive, items.len());

    for (key, item) in items.into_entries() {
        waiting.insert(key.clone());
        trace!("{} launching key {}", primitive, key);
        let done = Done::new(key.clone(), tx.clone());
        in_flight.push(worker(ctx.clone(), done, item, key));
    }

    // Completions sent during launch are still queued, so nothing is
    // counted before every key is marked waiting.
    drop(tx);

    loop {
        if waiting.is_empty() {
            debug!("{} complete (status {})", primitive, ctx.highest_level());
            return Ok(FanOutOutcome {
                chain: ctx.take_chain(),
                results,
            });
        }

        let completion = tokio::select! {
            biased;
            completion = rx.recv() => completion,
            Some(()) = in_flight.next(), if !in_flight.is_empty() => continue,
        };

        match completion {
            Some(Completion::Finished {
                key,
                diagnostic,
                result,
            }) => {
                trace!("{} key {} completed", primitive, key);
                waiting.remove(&key);
                results.set(&key, result);
                ctx.log(diagnostic);
            }
            Some(Completion::Dropped { key }) => {
                warn!("{} worker for key {} dropped its callback", primitive, key);
                return Err(Error::abandoned(primitive, format!("key {}", key)));
            }
            None => {
                let pending: Vec<String> = waiting.iter().map(Key::to_string).collect();
                return Err(Error::abandoned(primitive, pending.join(", ")));
            }
        }
    }
}
