use std::path::Path;

use async_trait::async_trait;

use crate::error::ExecError;

use super::cancel::CancelSignal;
use super::types::{CompletionRecord, DependencyTask};

/// Runs command pipelines on behalf of dependency tasks.
#[async_trait]
pub trait ExecEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Execute `command_groups` until completion or until `cancel` fires.
    ///
    /// Captured output is appended to `output` even when an error is
    /// returned. The artifact `log_id` is written under `log_dir`.
    async fn execute(
        &self,
        cancel: CancelSignal,
        log_id: &str,
        command_groups: &[Vec<String>],
        log_dir: &Path,
        output: &mut Vec<u8>,
    ) -> Result<(), ExecError>;
}

/// Decides whether a finished task is reported to the control plane.
pub trait DependFilter: Send + Sync {
    fn name(&self) -> &str;
    fn should_suppress(&self, task: &DependencyTask) -> bool;
}

/// Transport for the `Logic.DependDone` notification.
#[async_trait]
pub trait CompletionReporter: Send + Sync {
    fn name(&self) -> &str;

    /// Address of the control-plane server, used in failure logs.
    fn server_addr(&self) -> &str;

    /// `Ok(accepted)` when the call completed, `Err` on transport failure.
    async fn report_done(&self, record: CompletionRecord) -> anyhow::Result<bool>;
}

/// Reports everything.
pub struct NeverSuppress;

impl DependFilter for NeverSuppress {
    fn name(&self) -> &str {
        "never"
    }

    fn should_suppress(&self, _task: &DependencyTask) -> bool {
        false
    }
}
