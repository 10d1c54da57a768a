mod load;
mod types;

pub use load::{get_data_dir, load_default, load_from_path};
pub use types::{
    AgentConfig, AppConfig, DependencyConfig, LoggingConfig, RpcConfig, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_TIMEOUT_SECS,
};
