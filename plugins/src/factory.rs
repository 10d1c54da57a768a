use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use depexec_core::api::{
    AppConfig, CompletionReporter, DependFilter, DependencyTask, ExecEngine, NeverSuppress,
    Services,
};

use crate::policy::LocalDeliveryFilter;
use crate::rpc::RpcCompletionReporter;
use crate::runner::ShellExecEngine;

pub type LocalInbox = mpsc::UnboundedReceiver<DependencyTask>;

pub fn build_engine(cfg: &AppConfig) -> Arc<dyn ExecEngine> {
    Arc::new(ShellExecEngine::new(cfg.dependency.shell.clone()))
}

pub fn build_reporter(cfg: &AppConfig) -> Result<Arc<dyn CompletionReporter>> {
    Ok(Arc::new(RpcCompletionReporter::new(
        cfg.agent.admin_addr.clone(),
        cfg.rpc.api_key.clone(),
        cfg.rpc.timeout_ms,
    )?))
}

pub fn build_filter(cfg: &AppConfig) -> Arc<dyn DependFilter> {
    let filter = LocalDeliveryFilter::new(cfg.agent.local_addr.clone());
    if filter.is_enabled() {
        Arc::new(filter)
    } else {
        Arc::new(NeverSuppress)
    }
}

/// Build the production collaborators. The inbox is returned only when a
/// local address is configured.
pub fn build_services(cfg: &AppConfig) -> Result<(Services, Option<LocalInbox>)> {
    let filter = build_filter(cfg);
    let (local_inbox, inbox_rx) = if cfg.agent.local_addr.trim().is_empty() {
        (None, None)
    } else {
        let (tx, rx) = mpsc::unbounded_channel();
        (Some(tx), Some(rx))
    };

    let services = Services {
        engine: build_engine(cfg),
        filter,
        reporter: build_reporter(cfg)?,
        local_inbox,
    };
    Ok((services, inbox_rx))
}
