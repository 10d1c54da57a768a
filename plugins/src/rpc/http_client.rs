use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::{error::Error as StdError, fmt};

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcHttpErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Status,
    Remote,
    Unknown,
}

impl RpcHttpErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Status => "status",
            Self::Remote => "remote",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RpcHttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct RpcHttpError {
    kind: RpcHttpErrorKind,
    status: Option<u16>,
    method: String,
    message: String,
    source: Option<anyhow::Error>,
}

impl RpcHttpError {
    pub fn kind(&self) -> RpcHttpErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    fn from_reqwest(err: reqwest::Error, method: &str) -> Self {
        let kind = if err.is_timeout() {
            RpcHttpErrorKind::Timeout
        } else if err.is_connect() {
            RpcHttpErrorKind::Connect
        } else if err.is_request() {
            RpcHttpErrorKind::Request
        } else if err.is_body() {
            RpcHttpErrorKind::Body
        } else if err.is_decode() {
            RpcHttpErrorKind::Decode
        } else {
            RpcHttpErrorKind::Unknown
        };
        RpcHttpError {
            kind,
            status: err.status().map(|s| s.as_u16()),
            method: method.to_string(),
            message: err.to_string(),
            source: Some(anyhow::Error::new(err)),
        }
    }

    fn status_error(status: u16, method: &str, preview: String) -> Self {
        RpcHttpError {
            kind: RpcHttpErrorKind::Status,
            status: Some(status),
            method: method.to_string(),
            message: preview,
            source: None,
        }
    }

    fn decode_error(status: u16, method: &str, err: serde_json::Error, preview: String) -> Self {
        RpcHttpError {
            kind: RpcHttpErrorKind::Decode,
            status: Some(status),
            method: method.to_string(),
            message: format!("failed to decode response body: {} | body={}", err, preview),
            source: Some(anyhow::Error::new(err)),
        }
    }

    fn remote_error(status: u16, method: &str, error: &Value) -> Self {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        RpcHttpError {
            kind: RpcHttpErrorKind::Remote,
            status: Some(status),
            method: method.to_string(),
            message,
            source: None,
        }
    }
}

impl fmt::Display for RpcHttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc error kind={} method={}", self.kind, self.method)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl StdError for RpcHttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    method: &'a str,
    params: [P; 1],
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    #[serde(default)]
    error: Value,
}

/// JSON-RPC over HTTP POST to `<base_url>/rpc`.
pub struct HttpRpcClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    url_rpc: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(base_url: String, api_key: String, timeout_ms: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()?;
        let normalized = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            api_key,
            http,
            url_rpc: format!("{}/rpc", normalized),
            base_url: normalized,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }

    /// Invoke `method` with a single parameter. `Ok(None)` means the server
    /// answered without a result.
    pub async fn call<P, R>(&self, method: &str, params: P) -> anyhow::Result<Option<R>>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            target: "depexec.rpc",
            stage = "rpc.http.call.in",
            url = %self.url_rpc,
            method = %method,
            id = id
        );

        let body = RpcRequest {
            method,
            params: [params],
            id,
        };
        let req = self.http.post(&self.url_rpc).json(&body);
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|err| RpcHttpError::from_reqwest(err, method))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|err| RpcHttpError::from_reqwest(err, method))?;

        if !status.is_success() {
            return Err(
                RpcHttpError::status_error(status.as_u16(), method, preview_body(&text)).into(),
            );
        }

        let parsed: RpcResponse<R> = serde_json::from_str(&text).map_err(|err| {
            RpcHttpError::decode_error(status.as_u16(), method, err, preview_body(&text))
        })?;

        if !parsed.error.is_null() {
            return Err(RpcHttpError::remote_error(status.as_u16(), method, &parsed.error).into());
        }

        tracing::debug!(
            target: "depexec.rpc",
            stage = "rpc.http.call.out",
            method = %method,
            id = id,
            status = %status
        );
        Ok(parsed.result)
    }
}
