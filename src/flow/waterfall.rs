//! Sequential pipeline with short-circuit
//!
//! Steps run one at a time. Each step receives the run's [`Context`], a
//! [`Next`] continuation and the values the previous step passed on. Calling
//! the continuation only queues a signal; the driver picks it up on its next
//! loop turn, folds the reported diagnostic into the chain and then either
//! starts the following step or finishes the run.
//!
//! The run finishes when the last step continues, when the chain is failing
//! (any status >= 400), or when a step calls [`Next::break_with`]. A
//! continuation that is called again after it already advanced the run is
//! ignored, unless the step it would re-run opted in with
//! [`Next::enable_reinvoke`].

use super::context::Context;
use crate::diagnostic::{Diagnostic, DiagnosticFactory, LogInput};
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, debug_span, trace, warn, Instrument};
use uuid::Uuid;

/// One stage of a [`Waterfall`]
pub trait Step: Send {
    fn run(&mut self, ctx: Context, next: Next, args: Vec<Value>) -> BoxFuture<'static, ()>;
}

impl<F, Fut> Step for F
where
    F: FnMut(Context, Next, Vec<Value>) -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn run(&mut self, ctx: Context, next: Next, args: Vec<Value>) -> BoxFuture<'static, ()> {
        Box::pin(self(ctx, next, args))
    }
}

/// Final state of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub chain: Diagnostic,
    /// Values passed to the continuation that finished the run
    pub values: Vec<Value>,
}

impl PipelineOutcome {
    pub fn failed(&self) -> bool {
        self.chain.failed()
    }
}

#[derive(Debug)]
enum Signal {
    Continue {
        node: usize,
        diagnostic: LogInput,
        values: Vec<Value>,
        halt: bool,
    },
    Released,
}

#[derive(Debug)]
struct Shared {
    allow_reinvoke: Vec<AtomicBool>,
    live: AtomicUsize,
}

impl Shared {
    fn new(nodes: usize) -> Self {
        Self {
            allow_reinvoke: (0..nodes).map(|_| AtomicBool::new(false)).collect(),
            live: AtomicUsize::new(0),
        }
    }

    fn allows_reinvoke(&self, node: usize) -> bool {
        self.allow_reinvoke
            .get(node)
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    fn set_reinvoke(&self, node: usize, allowed: bool) {
        if let Some(flag) = self.allow_reinvoke.get(node) {
            flag.store(allowed, Ordering::Release);
        }
    }
}

/// Continuation handed to a pipeline step.
///
/// Clones share identity: they all continue from the same step.
#[derive(Debug)]
pub struct Next {
    node: usize,
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<Signal>,
}

impl Next {
    fn new(node: usize, shared: Arc<Shared>, tx: mpsc::UnboundedSender<Signal>) -> Self {
        shared.live.fetch_add(1, Ordering::AcqRel);
        Self { node, shared, tx }
    }

    /// Report `diagnostic` and hand `values` to the next step
    pub fn call(&self, diagnostic: impl Into<LogInput>, values: Vec<Value>) {
        self.send(diagnostic.into(), values, false);
    }

    /// Continue with nothing to report and nothing to pass on
    pub fn done(&self) {
        self.call((), Vec::new());
    }

    /// Continue, passing values positionally to the next step
    pub fn pass(&self, values: impl IntoIterator<Item = Value>) {
        self.call((), values.into_iter().collect());
    }

    /// Report a diagnostic and continue without values
    pub fn report(&self, diagnostic: impl Into<LogInput>) {
        self.call(diagnostic, Vec::new());
    }

    /// Finish the run after folding `diagnostic`, skipping every later step
    pub fn break_with(&self, diagnostic: impl Into<LogInput>) {
        self.send(diagnostic.into(), Vec::new(), true);
    }

    /// Let the step holding this continuation be run again when its
    /// predecessor continues more than once
    pub fn enable_reinvoke(&self) {
        self.shared.set_reinvoke(self.node, true);
    }

    pub fn prevent_reinvoke(&self) {
        self.shared.set_reinvoke(self.node, false);
    }

    fn send(&self, diagnostic: LogInput, values: Vec<Value>, halt: bool) {
        let signal = Signal::Continue {
            node: self.node,
            diagnostic,
            values,
            halt,
        };
        if self.tx.send(signal).is_err() {
            trace!("Continuation for step {} called after the run finished", self.node);
        }
    }
}

impl Clone for Next {
    fn clone(&self) -> Self {
        Self::new(self.node, self.shared.clone(), self.tx.clone())
    }
}

impl Drop for Next {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::AcqRel);
        let _ = self.tx.send(Signal::Released);
    }
}

/// Builder for a sequential pipeline
pub struct Waterfall {
    steps: Vec<Box<dyn Step>>,
    seed: LogInput,
    factory: DiagnosticFactory,
}

impl Default for Waterfall {
    fn default() -> Self {
        Self::new()
    }
}

impl Waterfall {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            seed: LogInput::Empty,
            factory: DiagnosticFactory::default(),
        }
    }

    pub fn from_steps(steps: Vec<Box<dyn Step>>) -> Self {
        Self {
            steps,
            ..Self::new()
        }
    }

    /// Append a step
    pub fn step<F, Fut>(mut self, step: F) -> Self
    where
        F: FnMut(Context, Next, Vec<Value>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    /// Start the chain from an existing diagnostic
    pub fn seed(mut self, seed: impl Into<LogInput>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn factory(mut self, factory: DiagnosticFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step and return the final chain and values
    pub async fn run(self) -> Result<PipelineOutcome> {
        let ctx = Context::seeded(self.factory, self.seed);
        let span = debug_span!("waterfall", run_id = %Uuid::new_v4(), steps = self.steps.len());
        drive(self.steps, ctx).instrument(span).await
    }

    /// Run, then hand the final chain and values to `on_done` exactly once.
    ///
    /// The context passed to `on_done` still holds the final chain, so
    /// reports logged there land on top of it.
    pub async fn run_with<T>(
        self,
        on_done: impl FnOnce(&Context, Diagnostic, Vec<Value>) -> T,
    ) -> Result<T> {
        let ctx = Context::seeded(self.factory, self.seed);
        let span = debug_span!("waterfall", run_id = %Uuid::new_v4(), steps = self.steps.len());
        let outcome = drive(self.steps, ctx.clone()).instrument(span).await?;
        ctx.log(outcome.chain.clone());
        Ok(on_done(&ctx, outcome.chain, outcome.values))
    }
}

/// Shorthand for [`Waterfall::from_steps`]
pub fn waterfall(steps: Vec<Box<dyn Step>>) -> Waterfall {
    Waterfall::from_steps(steps)
}

async fn drive(mut steps: Vec<Box<dyn Step>>, ctx: Context) -> Result<PipelineOutcome> {
    let total = steps.len();
    let shared = Arc::new(Shared::new(total + 1));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut called = vec![false; total + 1];
    let mut in_flight = FuturesUnordered::new();
    let mut current = 0;

    debug!("Waterfall starting with {} steps", total);

    // The first step starts from the loop like every other, never inline.
    let _ = tx.send(Signal::Continue {
        node: 0,
        diagnostic: LogInput::Empty,
        values: Vec::new(),
        halt: false,
    });

    loop {
        let signal = tokio::select! {
            biased;
            signal = rx.recv() => signal,
            Some(()) = in_flight.next(), if !in_flight.is_empty() => continue,
        };

        match signal {
            Some(Signal::Continue {
                node,
                diagnostic,
                values,
                halt,
            }) => {
                ctx.log(diagnostic);

                if called[node] && !shared.allows_reinvoke(node + 1) {
                    trace!("Ignoring repeated continuation into step {}", node);
                } else {
                    called[node] = true;

                    if node == total || halt || ctx.failed() {
                        let chain = ctx.take_chain();
                        if node < total {
                            debug!(
                                "Waterfall stopped before step {} of {} (status {}, break: {})",
                                node,
                                total,
                                chain.highest_level(),
                                halt
                            );
                        } else {
                            debug!("Waterfall finished all {} steps", total);
                        }
                        return Ok(PipelineOutcome { chain, values });
                    }

                    shared.set_reinvoke(node + 1, false);
                    let next = Next::new(node + 1, shared.clone(), tx.clone());
                    trace!("Running step {}", node);
                    current = node;
                    in_flight.push(steps[node].run(ctx.clone(), next, values));
                }
            }
            Some(Signal::Released) => {}
            None => return Err(Error::abandoned("waterfall", format!("step {}", current))),
        }

        if shared.live.load(Ordering::Acquire) == 0 && rx.is_empty() {
            warn!("Waterfall step {} dropped its continuation without calling it", current);
            return Err(Error::abandoned("waterfall", format!("step {}", current)));
        }
    }
}
