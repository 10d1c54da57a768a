use depexec_core::api::{DependFilter, DependencyTask};

/// Suppresses remote reporting for dependencies that come back to this agent.
///
/// After the endpoint swap `dest` names the side that must consume the
/// result. When that is the agent itself the control plane has nothing to
/// learn and the task is delivered through the local inbox instead.
pub struct LocalDeliveryFilter {
    local_addr: String,
}

impl LocalDeliveryFilter {
    pub fn new(local_addr: impl Into<String>) -> Self {
        Self {
            local_addr: local_addr.into().trim().to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.local_addr.is_empty()
    }
}

impl DependFilter for LocalDeliveryFilter {
    fn name(&self) -> &str {
        "local_delivery"
    }

    fn should_suppress(&self, task: &DependencyTask) -> bool {
        self.is_enabled() && task.dest == self.local_addr
    }
}
