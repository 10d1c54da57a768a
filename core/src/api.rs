//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `depexec_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AgentConfig, AppConfig, DependencyConfig, LoggingConfig,
    RpcConfig,
};
pub use crate::context::Services;
pub use crate::depend::{
    deliver, CancelSignal, CompletionRecord, CompletionReporter, DependExecutor, DependFilter,
    Dependencies, DependencyTask, ExecEngine, NeverSuppress, ReportOutcome, DEPEND_DONE_METHOD,
};
pub use crate::error::{CliError, ExecError, QueueError, ReportError};
