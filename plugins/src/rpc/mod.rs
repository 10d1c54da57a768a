pub mod http_client;
pub mod service;

pub use http_client::{HttpRpcClient, RpcHttpError, RpcHttpErrorKind};
pub use service::RpcCompletionReporter;
