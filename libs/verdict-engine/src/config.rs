// Engine configuration: JSON file first, then VERDICT_* environment overrides.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/verdict.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    Process,
    Docker,
}

impl FromStr for SandboxKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" | "local" => Ok(SandboxKind::Process),
            "docker" => Ok(SandboxKind::Docker),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock limit for one test case.
    pub case_timeout_ms: u64,
    pub sandbox: SandboxKind,
    pub node_binary: String,
    /// Extra flags passed to `node` before the program file.
    pub node_args: Vec<String>,
    pub docker_image: String,
    pub memory_limit_mb: u32,
    pub cpu_limit: f32,
    pub max_parallel_cases: usize,
    pub max_source_bytes: usize,
    /// Cap applied to each output stream separately.
    pub max_output_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            case_timeout_ms: 3000,
            sandbox: SandboxKind::Process,
            node_binary: "node".to_string(),
            node_args: Vec::new(),
            docker_image: "node:20-alpine".to_string(),
            memory_limit_mb: 256,
            cpu_limit: 0.5,
            max_parallel_cases: 1,
            max_source_bytes: 1024 * 1024,
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl EngineConfig {
    /// Load from `path`, or from `VERDICT_CONFIG` / `config/verdict.json`
    /// when no path is given. A missing default file means built-in
    /// defaults; environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("VERDICT_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `VERDICT_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VERDICT_CASE_TIMEOUT_MS") {
            self.case_timeout_ms = parse("VERDICT_CASE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("VERDICT_SANDBOX") {
            self.sandbox = parse("VERDICT_SANDBOX", &v)?;
        }
        if let Some(v) = lookup("VERDICT_NODE_BINARY") {
            self.node_binary = v;
        }
        if let Some(v) = lookup("VERDICT_DOCKER_IMAGE") {
            self.docker_image = v;
        }
        if let Some(v) = lookup("VERDICT_MEMORY_LIMIT_MB") {
            self.memory_limit_mb = parse("VERDICT_MEMORY_LIMIT_MB", &v)?;
        }
        if let Some(v) = lookup("VERDICT_CPU_LIMIT") {
            self.cpu_limit = parse("VERDICT_CPU_LIMIT", &v)?;
        }
        if let Some(v) = lookup("VERDICT_MAX_PARALLEL_CASES") {
            self.max_parallel_cases = parse("VERDICT_MAX_PARALLEL_CASES", &v)?;
        }
        if let Some(v) = lookup("VERDICT_MAX_SOURCE_BYTES") {
            self.max_source_bytes = parse("VERDICT_MAX_SOURCE_BYTES", &v)?;
        }
        if let Some(v) = lookup("VERDICT_MAX_OUTPUT_BYTES") {
            self.max_output_bytes = parse("VERDICT_MAX_OUTPUT_BYTES", &v)?;
        }
        Ok(())
    }

    pub fn case_timeout(&self) -> Duration {
        Duration::from_millis(self.case_timeout_ms)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}
