use thiserror::Error;

/// Failure of a dependency command pipeline.
///
/// Kept on the task after execution and sent to the control plane as text,
/// so it is `Clone` and carries no live sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("execution timeout after {secs}s")]
    Timeout { secs: i64 },

    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("exit status {code}")]
    ExitStatus { code: i32 },

    #[error("io error: {0}")]
    Io(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl ExecError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<std::io::Error> for ExecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Outcome of a failed completion report. Both kinds are terminal.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("transport to {addr} failed: {source}")]
    Transport {
        addr: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("server did not accept the completion")]
    Rejected,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("dependency queue is closed")]
    Closed,

    #[error("dependency queue is full")]
    Full,

    #[error("dispatcher already running")]
    AlreadyRunning,
}
