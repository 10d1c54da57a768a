use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use depexec_core::api::{CancelSignal, ExecEngine, ExecError};
use futures::future::join_all;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinSet;

/// How long pipes may keep draining after a timed-out pipeline was killed.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

type Sink = Arc<Mutex<Vec<u8>>>;

/// Runs command groups as a process pipeline.
///
/// A group with a single string goes through `<shell> -c`; longer groups are
/// an argv. Stage N's stdout feeds stage N+1's stdin. Captured output combines
/// the last stage's stdout with every stage's stderr, chunk by chunk in the
/// order they are read.
///
/// On unix every stage leads its own process group, and a timeout kills the
/// whole group, so commands started by a stage go down with it.
pub struct ShellExecEngine {
    shell: String,
}

impl ShellExecEngine {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn command_for(&self, group: &[String]) -> Command {
        let mut cmd = if group.len() == 1 {
            let mut c = Command::new(&self.shell);
            c.arg("-c").arg(&group[0]);
            c
        } else {
            let mut c = Command::new(&group[0]);
            c.args(&group[1..]);
            c
        };
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn spawn_pipeline(&self, groups: &[&Vec<String>]) -> Result<Vec<Child>, ExecError> {
        let mut children: Vec<Child> = Vec::with_capacity(groups.len());
        let mut next_stdin: Option<Stdio> = None;

        for (i, group) in groups.iter().enumerate() {
            let mut cmd = self.command_for(group);
            cmd.stdin(next_stdin.take().unwrap_or_else(Stdio::null));

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    kill_all(&mut children);
                    return Err(ExecError::Spawn(format!("{}: {}", group.join(" "), e)));
                }
            };

            if i + 1 < groups.len() {
                let stdout = child
                    .stdout
                    .take()
                    .ok_or_else(|| ExecError::Io("stage stdout not captured".into()))?;
                let stdio: Stdio = stdout.try_into()?;
                next_stdin = Some(stdio);
            }
            children.push(child);
        }
        Ok(children)
    }

    async fn run_pipeline(
        &self,
        cancel: &CancelSignal,
        command_groups: &[Vec<String>],
        output: &mut Vec<u8>,
    ) -> Result<(), ExecError> {
        let groups: Vec<&Vec<String>> = command_groups.iter().filter(|g| !g.is_empty()).collect();
        if groups.is_empty() {
            return Err(ExecError::InvalidCommand("empty command pipeline".into()));
        }

        let mut children = self.spawn_pipeline(&groups)?;

        // Captured bytes live outside the deadline race so a kill keeps them.
        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let mut pumps = JoinSet::new();
        if let Some(stdout) = children.last_mut().and_then(|c| c.stdout.take()) {
            pumps.spawn(pump(stdout, "stdout", sink.clone()));
        }
        for stderr in children.iter_mut().filter_map(|c| c.stderr.take()) {
            pumps.spawn(pump(stderr, "stderr", sink.clone()));
        }

        let finished = {
            let done = async {
                let statuses = join_all(children.iter_mut().map(|c| c.wait())).await;
                while pumps.join_next().await.is_some() {}
                statuses
            };
            tokio::select! {
                statuses = done => Some(statuses),
                _ = cancel.cancelled() => None,
            }
        };

        let Some(statuses) = finished else {
            kill_all(&mut children);
            for child in children.iter_mut() {
                let _ = child.wait().await;
            }
            let drained = tokio::time::timeout(DRAIN_GRACE, async {
                while pumps.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                tracing::warn!(
                    target: "depexec.exec",
                    "pipes still open {:?} after kill, output truncated",
                    DRAIN_GRACE
                );
                pumps.abort_all();
            }
            output.extend_from_slice(&take_captured(&sink));
            return Err(ExecError::Timeout {
                secs: cancel.timeout_secs(),
            });
        };

        output.extend_from_slice(&take_captured(&sink));

        let last: Option<ExitStatus> = match statuses.into_iter().last() {
            Some(status) => Some(status?),
            None => None,
        };
        match last {
            Some(status) if !status.success() => Err(ExecError::ExitStatus {
                code: status.code().unwrap_or(-1),
            }),
            _ => Ok(()),
        }
    }
}

/// Kill every stage, together with anything it started.
fn kill_all(children: &mut [Child]) {
    for child in children.iter_mut() {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // Each stage leads a process group whose id is its pid.
            unsafe {
                libc::killpg(pid as libc::pid_t, libc::SIGKILL);
            }
        }
        let _ = child.start_kill();
    }
}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, stream: &'static str, sink: Sink) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let mut captured = sink.lock().unwrap_or_else(|e| e.into_inner());
                captured.extend_from_slice(&buf[..n]);
            }
            Err(e) => {
                tracing::warn!(
                    target: "depexec.exec",
                    stream = stream,
                    "read pipeline output failed: {}",
                    e
                );
                break;
            }
        }
    }
}

fn take_captured(sink: &Sink) -> Vec<u8> {
    std::mem::take(&mut *sink.lock().unwrap_or_else(|e| e.into_inner()))
}

async fn write_log(
    log_dir: &Path,
    log_id: &str,
    command_groups: &[Vec<String>],
    output: &[u8],
    result: &Result<(), ExecError>,
) -> std::io::Result<()> {
    tokio::fs::create_dir_all(log_dir).await?;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(log_id))
        .await?;

    let header = format!(
        "[{}] exec {:?}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        command_groups
    );
    file.write_all(header.as_bytes()).await?;
    file.write_all(output).await?;
    if let Err(e) = result {
        file.write_all(format!("\n[error] {}\n", e).as_bytes())
            .await?;
    }
    file.flush().await
}

#[async_trait]
impl ExecEngine for ShellExecEngine {
    fn name(&self) -> &str {
        "shell"
    }

    async fn execute(
        &self,
        cancel: CancelSignal,
        log_id: &str,
        command_groups: &[Vec<String>],
        log_dir: &Path,
        output: &mut Vec<u8>,
    ) -> Result<(), ExecError> {
        tracing::debug!(
            target: "depexec.exec",
            stage = "shell.exec.in",
            log_id = %log_id,
            groups = command_groups.len(),
            timeout_secs = cancel.timeout_secs()
        );

        let result = self.run_pipeline(&cancel, command_groups, output).await;

        if let Err(e) = write_log(log_dir, log_id, command_groups, output, &result).await {
            tracing::warn!(
                target: "depexec.exec",
                log_dir = %log_dir.display(),
                log_id = %log_id,
                "write dependency log failed: {}",
                e
            );
        }

        tracing::debug!(
            target: "depexec.exec",
            stage = "shell.exec.out",
            log_id = %log_id,
            bytes = output.len(),
            ok = result.is_ok()
        );
        result
    }
}
