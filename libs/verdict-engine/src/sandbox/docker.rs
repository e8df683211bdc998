//! Container backend.
//!
//! One throwaway container per program: network disabled, memory, CPU and
//! process count capped, removed by a drop guard no matter how execution ends.
//! The program travels base64-encoded in an environment variable and is
//! decoded to a file inside the container before `node` runs it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::stream::StreamExt;
use tracing::{debug, info, warn};

use super::{push_capped, Execution, Sandbox};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// A single environment string may not exceed 128 KiB on Linux.
const MAX_ENCODED_PROGRAM_BYTES: usize = 120 * 1024;
const PIDS_LIMIT: i64 = 64;

const LAUNCH_SCRIPT: &str =
    "printf '%s' \"$VERDICT_PROGRAM\" | base64 -d > /tmp/main.js && exec node /tmp/main.js";

/// Removes the container when dropped, even if execution was cancelled.
struct ContainerGuard {
    docker: Docker,
    container_id: String,
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        let docker = self.docker.clone();
        let container_id = std::mem::take(&mut self.container_id);
        tokio::spawn(async move {
            let options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            if let Err(e) = docker.remove_container(&container_id, Some(options)).await {
                warn!(container = %container_id, error = %e, "Failed to remove container");
            }
        });
    }
}

pub struct DockerSandbox {
    docker: Docker,
    image: String,
    memory_bytes: i64,
    nano_cpus: i64,
    max_output_bytes: usize,
}

impl DockerSandbox {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self {
            docker,
            image: config.docker_image.clone(),
            memory_bytes: (config.memory_limit_mb as i64) * 1024 * 1024,
            nano_cpus: (config.cpu_limit * 1_000_000_000.0) as i64,
            max_output_bytes: config.max_output_bytes,
        })
    }

    /// Pull the runtime image unless it is already cached.
    async fn ensure_image(&self) -> Result<()> {
        if self.docker.inspect_image(&self.image).await.is_ok() {
            debug!(image = %self.image, "Image cache hit");
            return Ok(());
        }

        warn!(image = %self.image, "Image cache miss, pulling");
        let options = Some(CreateImageOptions {
            from_image: self.image.as_str(),
            ..Default::default()
        });
        let mut stream = self.docker.create_image(options, None, None);
        while let Some(progress) = stream.next().await {
            progress?;
        }
        info!(image = %self.image, "Image pulled");
        Ok(())
    }

    fn container_config(&self, encoded: String) -> Config<String> {
        Config {
            image: Some(self.image.clone()),
            cmd: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                LAUNCH_SCRIPT.to_string(),
            ]),
            env: Some(vec![format!("VERDICT_PROGRAM={encoded}")]),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            network_disabled: Some(true),
            host_config: Some(HostConfig {
                memory: Some(self.memory_bytes),
                memory_swap: Some(self.memory_bytes),
                nano_cpus: Some(self.nano_cpus),
                pids_limit: Some(PIDS_LIMIT),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    async fn collect(&self, container_id: &str) -> (String, String, bool, Option<i64>) {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut truncated = false;
        let limit = self.max_output_bytes;

        let options = Some(LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: true,
            ..Default::default()
        });
        let mut logs = self.docker.logs(container_id, options);
        while let Some(output) = logs.next().await {
            match output {
                Ok(LogOutput::StdOut { message }) => {
                    truncated |= push_capped(&mut stdout, &message, limit);
                }
                Ok(LogOutput::StdErr { message }) => {
                    truncated |= push_capped(&mut stderr, &message, limit);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(container = %container_id, error = %e, "Error reading container logs");
                    break;
                }
            }
        }

        let options = Some(WaitContainerOptions {
            condition: "not-running",
        });
        let mut wait = self.docker.wait_container(container_id, options);
        let exit_code = match wait.next().await {
            Some(Ok(response)) => Some(response.status_code),
            // Non-zero exits arrive as errors from the wait endpoint.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Some(code),
            Some(Err(e)) => {
                warn!(container = %container_id, error = %e, "Failed to read exit code");
                None
            }
            None => None,
        };

        (stdout, stderr, truncated, exit_code)
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn execute(&self, program: &str, timeout: Duration) -> Result<Execution> {
        let encoded = general_purpose::STANDARD.encode(program);
        if encoded.len() > MAX_ENCODED_PROGRAM_BYTES {
            return Err(EngineError::ProgramTooLarge {
                limit: MAX_ENCODED_PROGRAM_BYTES / 4 * 3,
            });
        }

        self.ensure_image().await?;

        let name = format!("verdict-{}", uuid::Uuid::new_v4());
        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };
        let container = self
            .docker
            .create_container(Some(options), self.container_config(encoded))
            .await?;
        let container_id = container.id;
        let _guard = ContainerGuard {
            docker: self.docker.clone(),
            container_id: container_id.clone(),
        };

        let start = Instant::now();
        self.docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await?;

        let execution = match tokio::time::timeout(timeout, self.collect(&container_id)).await {
            Ok((stdout, stderr, truncated, exit_code)) => Execution {
                stdout,
                stderr,
                exit_code,
                timed_out: false,
                truncated,
                duration_ms: start.elapsed().as_millis() as u64,
            },
            Err(_) => {
                if let Err(e) = self
                    .docker
                    .kill_container(&container_id, None::<KillContainerOptions<String>>)
                    .await
                {
                    warn!(container = %container_id, error = %e, "Failed to kill timed-out container");
                }
                Execution {
                    timed_out: true,
                    duration_ms: start.elapsed().as_millis() as u64,
                    ..Execution::default()
                }
            }
        };

        debug!(
            container = %container_id,
            exit_code = ?execution.exit_code,
            timed_out = execution.timed_out,
            duration_ms = execution.duration_ms,
            "Container finished"
        );
        Ok(execution)
    }

    async fn check(&self) -> Result<String> {
        let version = self.docker.version().await?;
        Ok(format!(
            "docker {} ({})",
            version.version.unwrap_or_default(),
            self.image
        ))
    }
}
