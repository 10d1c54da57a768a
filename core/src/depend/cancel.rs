use std::time::Duration;

use tokio::time::Instant;

/// Deadline-bound cancellation handed to the exec engine.
///
/// The engine must stop the running pipeline once [`CancelSignal::cancelled`]
/// resolves and report [`crate::error::ExecError::Timeout`].
#[derive(Debug, Clone, Copy)]
pub struct CancelSignal {
    deadline: Instant,
    timeout_secs: i64,
}

impl CancelSignal {
    /// Deadline `timeout_secs` from now. Negative values expire immediately.
    pub fn after_secs(timeout_secs: i64) -> Self {
        let secs = u64::try_from(timeout_secs).unwrap_or(0);
        Self {
            deadline: Instant::now() + Duration::from_secs(secs),
            timeout_secs,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout_secs(&self) -> i64 {
        self.timeout_secs
    }

    pub fn is_cancelled(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub async fn cancelled(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }
}
