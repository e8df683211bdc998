//! Execution backends.
//!
//! A sandbox runs one complete program in a fresh execution context and
//! hands back whatever the runtime printed. It does not know about test
//! cases, markers or scoring; that is the harness's job.

mod docker;
mod process;

pub use docker::DockerSandbox;
pub use process::ProcessSandbox;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::{EngineConfig, SandboxKind};
use crate::error::Result;

/// Raw result of running one program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the runtime was killed or never reported a status.
    pub exit_code: Option<i64>,
    pub timed_out: bool,
    /// Set when either stream hit the output cap.
    pub truncated: bool,
    pub duration_ms: u64,
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run `program` to completion or until `timeout` elapses, whichever
    /// comes first. Errors mean the backend itself failed.
    async fn execute(&self, program: &str, timeout: Duration) -> Result<Execution>;

    /// Version string of the runtime behind this sandbox.
    async fn check(&self) -> Result<String>;
}

/// Build the backend selected by `config`.
pub fn from_config(config: &EngineConfig) -> Result<Arc<dyn Sandbox>> {
    Ok(match config.sandbox {
        SandboxKind::Process => Arc::new(ProcessSandbox::new(config)),
        SandboxKind::Docker => Arc::new(DockerSandbox::new(config)?),
    })
}

/// Read `reader` to the end, keeping at most `limit` bytes. The rest is
/// drained so the writer never blocks on a full pipe.
pub(crate) async fn read_capped<R>(mut reader: R, limit: usize) -> std::io::Result<(String, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut kept).await?;
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((String::from_utf8_lossy(&kept).into_owned(), dropped > 0))
}

/// Append `chunk` to `buffer` without letting it grow past `limit`.
pub(crate) fn push_capped(buffer: &mut String, chunk: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(buffer.len());
    if chunk.len() <= room {
        buffer.push_str(&String::from_utf8_lossy(chunk));
        false
    } else {
        buffer.push_str(&String::from_utf8_lossy(&chunk[..room]));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_capped_drains_the_rest() {
        let data = b"0123456789".to_vec();
        let (kept, truncated) = read_capped(&data[..], 4).await.unwrap();
        assert_eq!(kept, "0123");
        assert!(truncated);

        let (kept, truncated) = read_capped(&data[..], 64).await.unwrap();
        assert_eq!(kept, "0123456789");
        assert!(!truncated);
    }

    #[test]
    fn test_push_capped() {
        let mut buffer = String::new();
        assert!(!push_capped(&mut buffer, b"abc", 5));
        assert!(push_capped(&mut buffer, b"defg", 5));
        assert_eq!(buffer, "abcde");
        assert!(push_capped(&mut buffer, b"h", 5));
        assert_eq!(buffer, "abcde");
    }

    #[test]
    fn test_default_config_selects_process_backend() {
        let sandbox = from_config(&EngineConfig::default()).unwrap();
        assert_eq!(sandbox.name(), "process");
    }
}
