use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::AppConfig;
use crate::context::Services;
use crate::error::QueueError;

use super::exec::DependExecutor;
use super::report::ReportOutcome;
use super::types::DependencyTask;

/// Bounded intake of dependency tasks plus the dispatcher that drains it.
///
/// `add` waits while the queue is full. Once [`Dependencies::run`] is called
/// a single background loop dequeues tasks in FIFO order and spawns one
/// execution per task.
pub struct Dependencies {
    tx: Mutex<Option<mpsc::Sender<DependencyTask>>>,
    rx: Mutex<Option<mpsc::Receiver<DependencyTask>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    executor: Arc<DependExecutor>,
    limit: Option<Arc<Semaphore>>,
}

impl Dependencies {
    pub fn new(cfg: &AppConfig, services: Services) -> Self {
        let (tx, rx) = mpsc::channel(cfg.dependency.queue_capacity.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            dispatcher: Mutex::new(None),
            executor: Arc::new(DependExecutor::new(cfg, services)),
            limit: cfg
                .dependency
                .max_concurrency
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    /// Enqueue a task, waiting for room when the queue is full.
    pub async fn add(&self, task: DependencyTask) -> Result<(), QueueError> {
        let tx = self.sender()?;
        tx.send(task).await.map_err(|_| QueueError::Closed)
    }

    /// Enqueue without waiting. Returns the task back when the queue is full.
    pub fn try_add(&self, task: DependencyTask) -> Result<(), (QueueError, DependencyTask)> {
        let tx = match self.sender() {
            Ok(tx) => tx,
            Err(e) => return Err((e, task)),
        };
        tx.try_send(task).map_err(|err| match err {
            mpsc::error::TrySendError::Full(t) => (QueueError::Full, t),
            mpsc::error::TrySendError::Closed(t) => (QueueError::Closed, t),
        })
    }

    fn sender(&self) -> Result<mpsc::Sender<DependencyTask>, QueueError> {
        self.tx
            .lock()
            .map_err(|_| QueueError::Closed)?
            .clone()
            .ok_or(QueueError::Closed)
    }

    /// Start the dispatcher loop. Must be called from within a tokio runtime.
    pub fn run(&self) -> Result<(), QueueError> {
        let rx = self
            .rx
            .lock()
            .map_err(|_| QueueError::AlreadyRunning)?
            .take()
            .ok_or(QueueError::AlreadyRunning)?;

        let handle = tokio::spawn(dispatch(rx, self.executor.clone(), self.limit.clone()));
        if let Ok(mut guard) = self.dispatcher.lock() {
            *guard = Some(handle);
        }
        Ok(())
    }

    /// Close intake and wait for every queued and in-flight task to finish.
    /// Starts the dispatcher first when `run` was never called.
    pub async fn shutdown(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
        if self.run().is_ok() {
            tracing::debug!(
                target: "depexec.queue",
                stage = "depend.dispatcher.drain",
                "dispatcher started to drain queued tasks"
            );
        }
        let handle = self.dispatcher.lock().ok().and_then(|mut g| g.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(target: "depexec.queue", "dispatcher terminated: {}", e);
            }
        }
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<DependencyTask>,
    executor: Arc<DependExecutor>,
    limit: Option<Arc<Semaphore>>,
) {
    let mut inflight = JoinSet::new();

    while let Some(task) = rx.recv().await {
        tracing::debug!(
            target: "depexec.queue",
            stage = "depend.dequeue",
            job_id = task.job_id,
            process_id = task.process_id,
            id = %task.id
        );

        // With a limit the dispatcher waits here, so a full pool backs up
        // into the intake queue.
        let permit = match &limit {
            Some(sem) => sem.clone().acquire_owned().await.ok(),
            None => None,
        };

        let executor = executor.clone();
        inflight.spawn(async move {
            let _permit = permit;
            let (task, outcome) = executor.exec(task).await;
            if outcome == ReportOutcome::Suppressed {
                executor.deliver_local(task);
            }
        });

        while let Some(res) = inflight.try_join_next() {
            log_join(res);
        }
    }

    while let Some(res) = inflight.join_next().await {
        log_join(res);
    }
    tracing::debug!(target: "depexec.queue", stage = "depend.dispatcher.stopped");
}

fn log_join(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        tracing::error!(target: "depexec.queue", "dependency execution aborted: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::depend::{
        CancelSignal, CompletionRecord, CompletionReporter, ExecEngine, NeverSuppress,
    };
    use crate::error::ExecError;

    struct NoopEngine;

    #[async_trait]
    impl ExecEngine for NoopEngine {
        fn name(&self) -> &str {
            "noop"
        }

        async fn execute(
            &self,
            _cancel: CancelSignal,
            _log_id: &str,
            _command_groups: &[Vec<String>],
            _log_dir: &Path,
            _output: &mut Vec<u8>,
        ) -> Result<(), ExecError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl CompletionReporter for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn server_addr(&self) -> &str {
            "test"
        }

        async fn report_done(&self, _record: CompletionRecord) -> anyhow::Result<bool> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn deps(capacity: usize) -> (Dependencies, Arc<Counter>) {
        let mut cfg = AppConfig::default();
        cfg.dependency.queue_capacity = capacity;
        let reporter = Arc::new(Counter::default());
        let services = Services {
            engine: Arc::new(NoopEngine),
            filter: Arc::new(NeverSuppress),
            reporter: reporter.clone(),
            local_inbox: None,
        };
        (Dependencies::new(&cfg, services), reporter)
    }

    #[tokio::test]
    async fn try_add_reports_full_queue() {
        let (deps, _) = deps(2);
        deps.try_add(DependencyTask::new(1, 1, "a")).unwrap();
        deps.try_add(DependencyTask::new(1, 1, "b")).unwrap();
        let (err, task) = deps.try_add(DependencyTask::new(1, 1, "c")).unwrap_err();
        assert_eq!(err, QueueError::Full);
        assert_eq!(task.id, "c");
    }

    #[test]
    fn add_waits_when_full() {
        let (deps, _) = deps(1);
        let mut first = tokio_test::task::spawn(deps.add(DependencyTask::new(1, 1, "a")));
        tokio_test::assert_ready_ok!(first.poll());

        let mut second = tokio_test::task::spawn(deps.add(DependencyTask::new(1, 1, "b")));
        tokio_test::assert_pending!(second.poll());
    }

    #[tokio::test]
    async fn run_twice_is_rejected() {
        let (deps, _) = deps(4);
        deps.run().unwrap();
        assert_eq!(deps.run().unwrap_err(), QueueError::AlreadyRunning);
        deps.shutdown().await;
    }

    #[tokio::test]
    async fn add_after_shutdown_is_closed() {
        let (deps, _) = deps(4);
        deps.run().unwrap();
        deps.shutdown().await;
        let err = deps.add(DependencyTask::new(1, 1, "late")).await.unwrap_err();
        assert_eq!(err, QueueError::Closed);
    }

    #[tokio::test]
    async fn shutdown_without_run_still_executes_queued_tasks() {
        let (deps, reporter) = deps(8);
        for i in 0..3 {
            deps.add(DependencyTask::new(1, 1, format!("q{i}")).with_commands(["true"]))
                .await
                .unwrap();
        }
        tokio::time::timeout(Duration::from_secs(5), deps.shutdown())
            .await
            .unwrap();
        assert_eq!(reporter.0.load(Ordering::SeqCst), 3);
        assert_eq!(deps.run().unwrap_err(), QueueError::AlreadyRunning);
    }

    #[tokio::test]
    async fn shutdown_drains_queued_tasks() {
        let (deps, reporter) = deps(8);
        for i in 0..5 {
            deps.add(DependencyTask::new(1, 1, format!("t{i}")).with_commands(["true"]))
                .await
                .unwrap();
        }
        deps.run().unwrap();
        tokio::time::timeout(Duration::from_secs(5), deps.shutdown())
            .await
            .unwrap();
        assert_eq!(reporter.0.load(Ordering::SeqCst), 5);
    }
}
