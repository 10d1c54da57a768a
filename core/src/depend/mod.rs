//! Dependency tasks of scheduled jobs.
//!
//! ```text
//! producer ──add──▶ Dependencies (bounded mpsc)
//!                        │ dispatcher (one loop)
//!                        ▼
//!                 one tokio task per dequeued DependencyTask
//!                        │
//!        ExecEngine ─▶ finish / swap endpoints ─▶ DependFilter ─▶ CompletionReporter
//! ```

mod cancel;
mod dependencies;
mod exec;
mod report;
mod traits;
mod types;

pub use cancel::CancelSignal;
pub use dependencies::Dependencies;
pub use exec::DependExecutor;
pub use report::{deliver, ReportOutcome, DEPEND_DONE_METHOD};
pub use traits::{CompletionReporter, DependFilter, ExecEngine, NeverSuppress};
pub use types::{strip_trailing_nuls, CompletionRecord, DependencyTask};
