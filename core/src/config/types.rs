use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub dependency: DependencyConfig,

    #[serde(default)]
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "depexec_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// Identity of this agent and where it talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Root directory for job logs. Dependency logs live in a subdirectory.
    #[serde(default)]
    pub log_path: String,

    /// Control-plane server address.
    #[serde(default = "default_admin_addr")]
    pub admin_addr: String,

    /// Address under which the control plane knows this agent. Dependencies
    /// whose destination is this address are delivered locally.
    #[serde(default)]
    pub local_addr: String,
}

fn default_admin_addr() -> String {
    "http://127.0.0.1:20000".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_path: String::new(),
            admin_addr: default_admin_addr(),
            local_addr: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Intake queue capacity; producers wait once it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Timeout applied to tasks that arrive with `timeout == 0`. Defaults to
    /// [`DEFAULT_TIMEOUT_SECS`]; overriding it replaces the fixed 600s.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: i64,

    /// Upper bound on concurrently executing tasks. Unset means one
    /// execution per dequeued task with no limit.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    #[serde(default = "default_log_subdir")]
    pub log_subdir: String,

    /// Shell used for single-string command groups.
    #[serde(default = "default_shell")]
    pub shell: String,
}

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: i64 = 600;

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_timeout_secs() -> i64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_log_subdir() -> String {
    "depend_job".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            default_timeout_secs: default_timeout_secs(),
            max_concurrency: None,
            log_subdir: default_log_subdir(),
            shell: default_shell(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub api_key: String,
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_rpc_timeout_ms(),
            api_key: String::new(),
        }
    }
}

impl AppConfig {
    /// Directory that receives `{job_id}-{id}.log` artifacts.
    pub fn depend_log_dir(&self) -> std::path::PathBuf {
        let root = if self.agent.log_path.trim().is_empty() {
            std::env::temp_dir().join("depexec").join("logs")
        } else {
            std::path::PathBuf::from(&self.agent.log_path)
        };
        root.join(&self.dependency.log_subdir)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.dependency.queue_capacity == 0 {
            return Err("dependency.queue_capacity must be at least 1".into());
        }
        if self.dependency.default_timeout_secs < 1 {
            return Err("dependency.default_timeout_secs must be at least 1".into());
        }
        if self.dependency.max_concurrency == Some(0) {
            return Err("dependency.max_concurrency must be at least 1 when set".into());
        }
        if self.agent.admin_addr.trim().is_empty() {
            return Err("agent.admin_addr must not be empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.dependency.queue_capacity, 100);
        assert_eq!(cfg.dependency.default_timeout_secs, 600);
        assert_eq!(cfg.dependency.max_concurrency, None);
        assert_eq!(cfg.dependency.log_subdir, "depend_job");
        assert_eq!(cfg.agent.admin_addr, "http://127.0.0.1:20000");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [agent]
            log_path = "/var/log/cron"
            admin_addr = "http://admin:20000"

            [dependency]
            max_concurrency = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.dependency.max_concurrency, Some(8));
        assert_eq!(cfg.dependency.queue_capacity, 100);
        assert_eq!(
            cfg.depend_log_dir(),
            std::path::PathBuf::from("/var/log/cron/depend_job")
        );
    }

    #[test]
    fn validate_rejects_zero_capacity_and_concurrency() {
        let mut cfg = AppConfig::default();
        cfg.dependency.queue_capacity = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.dependency.max_concurrency = Some(0);
        assert!(cfg.validate().is_err());
    }
}
