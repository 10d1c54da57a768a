#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use depexec_core::api::{
    AppConfig, CancelSignal, CompletionRecord, CompletionReporter, DependFilter, DependencyTask,
    ExecEngine, ExecError, Services,
};

/// How the scripted engine answers one command.
#[derive(Clone)]
pub enum Step {
    Succeed(Vec<u8>),
    Fail(ExecError, Vec<u8>),
    /// Sleep, then succeed with the given output.
    Sleep(Duration, Vec<u8>),
    /// Block until the deadline, then report a timeout.
    Hang,
}

/// Engine keyed by the first command string of the pipeline.
#[derive(Default)]
pub struct ScriptedEngine {
    steps: Mutex<Vec<(String, Step)>>,
    pub started: Mutex<Vec<String>>,
    pub finished: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn on(self, command: &str, step: Step) -> Self {
        self.steps.lock().unwrap().push((command.to_string(), step));
        self
    }

    fn step_for(&self, command: &str) -> Step {
        self.steps
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| c == command)
            .map(|(_, s)| s.clone())
            .unwrap_or(Step::Succeed(Vec::new()))
    }
}

#[async_trait]
impl ExecEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(
        &self,
        cancel: CancelSignal,
        log_id: &str,
        command_groups: &[Vec<String>],
        _log_dir: &Path,
        output: &mut Vec<u8>,
    ) -> Result<(), ExecError> {
        self.started.lock().unwrap().push(log_id.to_string());
        let command = command_groups
            .first()
            .and_then(|g| g.first())
            .cloned()
            .unwrap_or_default();

        let result = match self.step_for(&command) {
            Step::Succeed(out) => {
                output.extend_from_slice(&out);
                Ok(())
            }
            Step::Fail(err, out) => {
                output.extend_from_slice(&out);
                Err(err)
            }
            Step::Sleep(d, out) => {
                tokio::time::sleep(d).await;
                output.extend_from_slice(&out);
                Ok(())
            }
            Step::Hang => {
                cancel.cancelled().await;
                Err(ExecError::Timeout {
                    secs: cancel.timeout_secs(),
                })
            }
        };
        self.finished.lock().unwrap().push(log_id.to_string());
        result
    }
}

/// Reporter answering from a script of replies, then accepting.
#[derive(Default)]
pub struct CountingReporter {
    pub calls: AtomicUsize,
    pub records: Mutex<Vec<CompletionRecord>>,
    replies: Mutex<VecDeque<Option<bool>>>,
}

impl CountingReporter {
    pub fn replying(replies: impl IntoIterator<Item = Option<bool>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn record_for(&self, id: &str) -> Option<CompletionRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

#[async_trait]
impl CompletionReporter for CountingReporter {
    fn name(&self) -> &str {
        "counting"
    }

    fn server_addr(&self) -> &str {
        "http://admin.test:20000"
    }

    async fn report_done(&self, record: CompletionRecord) -> anyhow::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(record);
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(accepted)) => Ok(accepted),
            Some(None) => Err(anyhow::anyhow!("connection refused")),
            None => Ok(true),
        }
    }
}

/// Suppresses tasks whose id is listed.
#[derive(Default)]
pub struct IdFilter(pub Vec<String>);

impl DependFilter for IdFilter {
    fn name(&self) -> &str {
        "ids"
    }

    fn should_suppress(&self, task: &DependencyTask) -> bool {
        self.0.iter().any(|id| id == &task.id)
    }
}

/// Formatted tracing output collected for assertions.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's events into a buffer until the guard drops. Tasks
/// spawned on a current-thread runtime are covered too.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_writer(move || writer.clone())
            .with_ansi(false),
    );
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

pub fn services(
    engine: Arc<ScriptedEngine>,
    filter: IdFilter,
    reporter: Arc<CountingReporter>,
) -> Services {
    Services {
        engine,
        filter: Arc::new(filter),
        reporter,
        local_inbox: None,
    }
}

pub fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.agent.log_path = std::env::temp_dir()
        .join("depexec-tests")
        .to_string_lossy()
        .to_string();
    cfg
}

pub fn task(id: &str, command: &str) -> DependencyTask {
    DependencyTask::new(1, 1, id)
        .with_name(id)
        .with_commands([command])
        .with_endpoints("agent-a", "agent-b")
}
