use crate::error::ReportError;

use super::exec::DependExecutor;
use super::traits::CompletionReporter;
use super::types::{CompletionRecord, DependencyTask};

pub const DEPEND_DONE_METHOD: &str = "Logic.DependDone";

/// What happened to a finished task's completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Suppressed,
    Accepted,
    Rejected,
    TransportFailed,
}

/// Single delivery attempt of a completion record.
pub async fn deliver(
    reporter: &dyn CompletionReporter,
    record: CompletionRecord,
) -> Result<(), ReportError> {
    match reporter.report_done(record).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ReportError::Rejected),
        Err(source) => Err(ReportError::Transport {
            addr: reporter.server_addr().to_string(),
            source,
        }),
    }
}

impl DependExecutor {
    /// Report a post-processed task unless the filter suppresses it.
    /// Failures are logged and never retried.
    pub async fn report(&self, task: &DependencyTask) -> ReportOutcome {
        let services = self.services();
        if services.filter.should_suppress(task) {
            tracing::debug!(
                target: "depexec.report",
                stage = "depend.report.suppressed",
                filter = services.filter.name(),
                job_id = task.job_id,
                id = %task.id
            );
            return ReportOutcome::Suppressed;
        }

        match deliver(services.reporter.as_ref(), task.to_record()).await {
            Ok(()) => {
                tracing::debug!(
                    target: "depexec.report",
                    stage = "depend.report.accepted",
                    job_id = task.job_id,
                    id = %task.id
                );
                ReportOutcome::Accepted
            }
            Err(ReportError::Transport { addr, source }) => {
                tracing::error!(
                    target: "depexec.report",
                    "{} error: {:#} server addr: {}",
                    DEPEND_DONE_METHOD,
                    source,
                    addr
                );
                ReportOutcome::TransportFailed
            }
            Err(ReportError::Rejected) => {
                tracing::error!(
                    target: "depexec.report",
                    "task {} {:?} call {} failed: not accepted by server",
                    task.name,
                    task.commands,
                    DEPEND_DONE_METHOD
                );
                ReportOutcome::Rejected
            }
        }
    }
}
