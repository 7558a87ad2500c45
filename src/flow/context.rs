//! Per-run execution context
//!
//! One context exists per orchestration call. Every step of that call gets a
//! clone of the same handle and reports into the same chain.

use crate::diagnostic::{Diagnostic, DiagnosticFactory, LogInput};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// Shared diagnostic state for a single orchestration call
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug, Default)]
struct ContextInner {
    chain: Mutex<Diagnostic>,
    factory: DiagnosticFactory,
}

impl Context {
    pub fn new(factory: DiagnosticFactory) -> Self {
        Self::seeded(factory, ())
    }

    /// Start from a caller-provided chain
    pub fn seeded(factory: DiagnosticFactory, seed: impl Into<LogInput>) -> Self {
        let chain = factory.normalize(seed);
        Self {
            inner: Arc::new(ContextInner {
                chain: Mutex::new(chain),
                factory,
            }),
        }
    }

    /// Fold a report into the running chain
    pub fn log(&self, input: impl Into<LogInput>) {
        let diagnostic = self.inner.factory.normalize(input);
        if diagnostic.is_none() {
            return;
        }
        trace!("Context logged status {}", diagnostic.status());
        let mut chain = self.lock();
        let current = std::mem::take(&mut *chain);
        *chain = Diagnostic::merge(current, diagnostic);
    }

    /// Snapshot of the chain so far
    pub fn chain(&self) -> Diagnostic {
        self.lock().clone()
    }

    pub fn failed(&self) -> bool {
        self.lock().failed()
    }

    pub fn highest_level(&self) -> u16 {
        self.lock().highest_level()
    }

    /// The factory this run builds records with
    pub fn factory(&self) -> &DiagnosticFactory {
        &self.inner.factory
    }

    pub(crate) fn take_chain(&self) -> Diagnostic {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Diagnostic> {
        // Poisoned only if a step panicked while holding the lock.
        self.inner
            .chain
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
