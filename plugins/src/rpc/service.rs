use anyhow::Result;
use async_trait::async_trait;
use depexec_core::api::{CompletionRecord, CompletionReporter, DEPEND_DONE_METHOD};

use super::http_client::HttpRpcClient;

/// Reports finished dependencies to the control plane.
pub struct RpcCompletionReporter {
    client: HttpRpcClient,
}

impl RpcCompletionReporter {
    pub fn new(admin_addr: String, api_key: String, timeout_ms: u64) -> Result<Self> {
        let client = HttpRpcClient::new(admin_addr, api_key, timeout_ms)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CompletionReporter for RpcCompletionReporter {
    fn name(&self) -> &str {
        "rpc"
    }

    fn server_addr(&self) -> &str {
        self.client.base_url()
    }

    async fn report_done(&self, record: CompletionRecord) -> Result<bool> {
        tracing::debug!(
            target: "depexec.rpc",
            stage = "rpc.depend_done.in",
            id = %record.id,
            job_id = record.job_entry_id,
            process_id = record.process_id,
            log_bytes = record.log_content.len()
        );
        let reply: Option<bool> = self.client.call(DEPEND_DONE_METHOD, record).await?;
        let accepted = reply.unwrap_or(false);
        tracing::debug!(
            target: "depexec.rpc",
            stage = "rpc.depend_done.out",
            accepted = accepted
        );
        Ok(accepted)
    }
}
