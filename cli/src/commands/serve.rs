use depexec_core::api::{self as core_api, Dependencies, DependencyTask};
use depexec_plugins::factory;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::commands::cli::ServeArgs;

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_task_line(line: &str) -> Result<Option<DependencyTask>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

pub async fn handle_serve(
    args: ServeArgs,
    cfg: &core_api::AppConfig,
) -> Result<i32, core_api::CliError> {
    let (services, inbox) = factory::build_services(cfg)?;
    let deps = Dependencies::new(cfg, services);
    deps.run()?;

    let local = inbox.map(|mut rx| {
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                tracing::info!(
                    job_id = task.job_id,
                    process_id = task.process_id,
                    id = %task.id,
                    error = %task.error_message(),
                    "dependency delivered locally"
                );
            }
        })
    });

    let accepted = if args.input == "-" {
        feed(BufReader::new(tokio::io::stdin()), &deps).await?
    } else {
        let file = tokio::fs::File::open(&args.input).await?;
        feed(BufReader::new(file), &deps).await?
    };

    deps.shutdown().await;
    drop(deps);
    if let Some(handle) = local {
        let _ = handle.await;
    }

    tracing::info!(accepted = accepted, "input drained");
    Ok(0)
}

async fn feed<R: AsyncBufRead + Unpin>(
    reader: R,
    deps: &Dependencies,
) -> Result<usize, core_api::CliError> {
    let mut lines = reader.lines();
    let mut accepted = 0usize;
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        match parse_task_line(&line) {
            Ok(Some(task)) => {
                deps.add(task).await?;
                accepted += 1;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(line = line_no, "skipping invalid task descriptor: {}", e);
            }
        }
    }
    Ok(accepted)
}
