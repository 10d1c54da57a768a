use std::path::PathBuf;
use std::time::Instant;

use crate::config::AppConfig;
use crate::context::Services;

use super::cancel::CancelSignal;
use super::report::ReportOutcome;
use super::types::DependencyTask;

/// Runs one dependency task end to end: execute, post-process, report.
pub struct DependExecutor {
    services: Services,
    log_dir: PathBuf,
    default_timeout_secs: i64,
}

impl DependExecutor {
    pub fn new(cfg: &AppConfig, services: Services) -> Self {
        Self {
            services,
            log_dir: cfg.depend_log_dir(),
            default_timeout_secs: cfg.dependency.default_timeout_secs,
        }
    }

    pub(crate) fn services(&self) -> &Services {
        &self.services
    }

    /// Hand a suppressed task to the local inbox, if one is configured.
    pub fn deliver_local(&self, task: DependencyTask) {
        let Some(inbox) = self.services.local_inbox.as_ref() else {
            return;
        };
        let id = task.id.clone();
        if inbox.send(task).is_err() {
            tracing::warn!(target: "depexec.report", id = %id, "local inbox closed, dropping task");
        }
    }

    pub async fn exec(&self, mut task: DependencyTask) -> (DependencyTask, ReportOutcome) {
        self.run(&mut task).await;
        let outcome = self.report(&task).await;
        (task, outcome)
    }

    /// Execute the task's pipeline and record the result on it. Errors,
    /// timeouts included, end up in `task.err`.
    pub async fn run(&self, task: &mut DependencyTask) {
        task.normalize_timeout(self.default_timeout_secs);

        let cancel = CancelSignal::after_secs(task.timeout);
        let command_groups = vec![task.commands.clone()];
        let log_id = task.log_id();
        let mut output = Vec::new();

        let start = Instant::now();
        let result = self
            .services
            .engine
            .execute(cancel, &log_id, &command_groups, &self.log_dir, &mut output)
            .await;
        let cost = start.elapsed();

        tracing::info!(
            target: "depexec.exec",
            stage = "depend.exec.done",
            job_id = task.job_id,
            id = %task.id,
            name = %task.name,
            commands = ?task.commands,
            cost_secs = format_args!("{:.4}", cost.as_secs_f64()),
            error = ?result.as_ref().err()
        );

        task.finish(result, output);
        task.swap_endpoints();
    }
}
