//! Local subprocess backend.
//!
//! Every program gets its own temporary directory and its own `node`
//! process started with an empty environment. The process is killed when
//! the timeout fires or when the execution future is dropped.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{read_capped, Execution, Sandbox};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

const PROGRAM_FILE: &str = "main.js";

pub struct ProcessSandbox {
    node_binary: String,
    node_args: Vec<String>,
    max_output_bytes: usize,
}

impl ProcessSandbox {
    pub fn new(config: &EngineConfig) -> Self {
        let mut node_args = config.node_args.clone();
        if config.memory_limit_mb > 0 {
            node_args.push(format!("--max-old-space-size={}", config.memory_limit_mb));
        }
        Self {
            node_binary: config.node_binary.clone(),
            node_args,
            max_output_bytes: config.max_output_bytes,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.node_binary);
        command.env_clear();
        // The binary is still looked up on the host's PATH.
        if let Some(path) = std::env::var_os("PATH") {
            command.env("PATH", path);
        }
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Spawn {
            program: self.node_binary.clone(),
            source,
        }
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn execute(&self, program: &str, timeout: Duration) -> Result<Execution> {
        let workdir = tempfile::Builder::new().prefix("verdict-").tempdir()?;
        tokio::fs::write(workdir.path().join(PROGRAM_FILE), program).await?;

        let mut child = self
            .command()
            .args(&self.node_args)
            .arg(PROGRAM_FILE)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let start = Instant::now();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.max_output_bytes;

        let run = async {
            let read_out = async move {
                match stdout {
                    Some(pipe) => read_capped(pipe, limit).await,
                    None => Ok((String::new(), false)),
                }
            };
            let read_err = async move {
                match stderr {
                    Some(pipe) => read_capped(pipe, limit).await,
                    None => Ok((String::new(), false)),
                }
            };
            let (out, err, status) = tokio::join!(read_out, read_err, child.wait());
            Ok::<_, std::io::Error>((out?, err?, status?))
        };

        let execution = match tokio::time::timeout(timeout, run).await {
            Ok(finished) => {
                let ((stdout, out_cut), (stderr, err_cut), status) = finished?;
                Execution {
                    stdout,
                    stderr,
                    exit_code: status.code().map(i64::from),
                    timed_out: false,
                    truncated: out_cut || err_cut,
                    duration_ms: start.elapsed().as_millis() as u64,
                }
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed-out runtime");
                }
                Execution {
                    timed_out: true,
                    duration_ms: start.elapsed().as_millis() as u64,
                    ..Execution::default()
                }
            }
        };

        debug!(
            exit_code = ?execution.exit_code,
            timed_out = execution.timed_out,
            duration_ms = execution.duration_ms,
            "Runtime finished"
        );
        Ok(execution)
    }

    async fn check(&self) -> Result<String> {
        let output = self
            .command()
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_limit_becomes_heap_flag() {
        let config = EngineConfig {
            memory_limit_mb: 128,
            node_args: vec!["--no-warnings".to_string()],
            ..EngineConfig::default()
        };
        let sandbox = ProcessSandbox::new(&config);
        assert_eq!(sandbox.node_args, ["--no-warnings", "--max-old-space-size=128"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let config = EngineConfig {
            node_binary: "verdict-no-such-runtime".to_string(),
            ..EngineConfig::default()
        };
        let sandbox = ProcessSandbox::new(&config);
        let err = sandbox
            .execute("1", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }), "{err}");
    }
}
