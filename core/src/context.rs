use std::sync::Arc;

use tokio::sync::mpsc;

use crate::depend::{CompletionReporter, DependFilter, DependencyTask, ExecEngine};

/// Collaborators consumed by the dependency coordinator.
#[derive(Clone)]
pub struct Services {
    pub engine: Arc<dyn ExecEngine>,
    pub filter: Arc<dyn DependFilter>,
    pub reporter: Arc<dyn CompletionReporter>,
    /// Receives finished tasks whose report was suppressed.
    pub local_inbox: Option<mpsc::UnboundedSender<DependencyTask>>,
}
