use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// A dependent sub-task spawned by a parent scheduled job.
///
/// Producers fill in the descriptor fields; `done`, `err` and `log_content`
/// are written once by the execution unit that owns the task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyTask {
    pub job_id: i64,
    /// Invocation of the parent job this dependency belongs to.
    pub process_id: i64,
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub commands: Vec<String>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub dest: String,
    /// Seconds. Zero means unset.
    #[serde(default)]
    pub timeout: i64,

    #[serde(skip)]
    pub done: bool,
    #[serde(skip)]
    pub err: Option<ExecError>,
    #[serde(skip)]
    pub log_content: Vec<u8>,
}

impl DependencyTask {
    pub fn new(job_id: i64, process_id: i64, id: impl Into<String>) -> Self {
        Self {
            job_id,
            process_id,
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_endpoints(mut self, from: impl Into<String>, dest: impl Into<String>) -> Self {
        self.from = from.into();
        self.dest = dest.into();
        self
    }

    pub fn with_timeout(mut self, secs: i64) -> Self {
        self.timeout = secs;
        self
    }

    /// Replace an unset (zero) timeout with `default_secs`.
    pub fn normalize_timeout(&mut self, default_secs: i64) {
        if self.timeout == 0 {
            self.timeout = default_secs;
        }
    }

    /// Name of the log artifact written by the exec engine.
    pub fn log_id(&self) -> String {
        format!("{}-{}.log", self.job_id, self.id)
    }

    /// Record the execution result. Trailing NUL padding is dropped from the
    /// captured output.
    pub fn finish(&mut self, result: Result<(), ExecError>, output: Vec<u8>) {
        self.log_content = strip_trailing_nuls(output);
        self.done = true;
        self.err = result.err();
    }

    /// Reverse the direction of the task after it ran.
    pub fn swap_endpoints(&mut self) {
        std::mem::swap(&mut self.from, &mut self.dest);
    }

    pub fn error_message(&self) -> String {
        self.err.as_ref().map(|e| e.to_string()).unwrap_or_default()
    }

    pub fn to_record(&self) -> CompletionRecord {
        CompletionRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            dest: self.dest.clone(),
            from: self.from.clone(),
            process_id: self.process_id,
            job_entry_id: self.job_id,
            commands: self.commands.clone(),
            log_content: self.log_content.clone(),
            err: self.error_message(),
            timeout: self.timeout,
        }
    }
}

pub fn strip_trailing_nuls(mut buf: Vec<u8>) -> Vec<u8> {
    let end = buf.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    buf.truncate(end);
    buf
}

/// Payload of the `Logic.DependDone` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "destination")]
    pub dest: String,
    #[serde(rename = "source")]
    pub from: String,
    #[serde(rename = "processID")]
    pub process_id: i64,
    #[serde(rename = "parentJobID")]
    pub job_entry_id: i64,
    pub commands: Vec<String>,
    #[serde(rename = "logContent", with = "base64_bytes")]
    pub log_content: Vec<u8>,
    #[serde(rename = "errorMessage")]
    pub err: String,
    #[serde(rename = "timeoutSeconds")]
    pub timeout: i64,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
