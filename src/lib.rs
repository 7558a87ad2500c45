//! # Cascade
//!
//! Async control flow with a mergeable, HTTP-style diagnostic chain.
//!
//! Steps report what happened as status-coded records. Every orchestration
//! call folds those reports into one chain that is handed back when the run
//! finishes, failing or not.
//!
//! ## Usage
//!
//! ```no_run
//! use cascade::flow::{Context, Next, Waterfall};
//!
//! # async fn demo() -> cascade::Result<()> {
//! let outcome = Waterfall::new()
//!     .step(|ctx: Context, next: Next, _args| async move {
//!         next.report(ctx.factory().created("user stored"));
//!     })
//!     .step(|_ctx, next: Next, _args| async move { next.done() })
//!     .run()
//!     .await?;
//!
//! assert_eq!(outcome.chain.status(), 201);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `config` - Defaults applied when records are built
//! - `diagnostic` - Records, the chain, merge and normalisation
//! - `error` - Error types for the library
//! - `flow` - Pipeline, keyed map, parallel and sequential map
//! - `logging` - Optional `tracing` subscriber setup
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod flow;
pub mod logging;

pub use config::DiagnosticConfig;
pub use diagnostic::{Diagnostic, DiagnosticFactory, LogInput, LogParts, Record, StatusCode};
pub use error::{ArgumentShapeError, Error, Result};
pub use flow::{
    map, map_series, parallel, task, waterfall, Context, Done, FanOutOutcome, Key, Keyed, Next,
    PipelineOutcome, Waterfall,
};
