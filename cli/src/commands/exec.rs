use depexec_core::api::{self as core_api, DependExecutor, DependencyTask, ReportOutcome};
use depexec_plugins::factory;

use crate::commands::cli::ExecArgs;

pub fn task_from_args(args: &ExecArgs) -> DependencyTask {
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    DependencyTask::new(args.job_id, args.process_id, id)
        .with_name(args.name.clone())
        .with_commands(args.command.clone())
        .with_endpoints(args.from.clone(), args.dest.clone())
        .with_timeout(args.timeout)
}

/// Exit codes: 0 ok, 1 the command failed, 3 the report was not delivered.
pub async fn handle_exec(
    args: ExecArgs,
    cfg: &core_api::AppConfig,
) -> Result<i32, core_api::CliError> {
    let (services, _inbox) = factory::build_services(cfg)?;
    let executor = DependExecutor::new(cfg, services);

    let (task, outcome) = executor.exec(task_from_args(&args)).await;

    let log = String::from_utf8_lossy(&task.log_content);
    if !log.is_empty() {
        print!("{}", log);
    }
    tracing::info!(
        id = %task.id,
        done = task.done,
        outcome = ?outcome,
        error = %task.error_message(),
        "dependency finished"
    );

    let code = match (&task.err, outcome) {
        (Some(_), _) => 1,
        (None, ReportOutcome::Rejected | ReportOutcome::TransportFailed) => 3,
        (None, _) => 0,
    };
    Ok(code)
}
