//! Error taxonomy for the evaluation engine.
//!
//! Adapter errors are terminal for a request but never escape as HTTP
//! errors: the executor turns them into an all-failing result. Engine errors
//! mean the execution infrastructure itself broke and surface as internal
//! faults.

use thiserror::Error;
use verdict_common::types::Language;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("Function not found: no callable declaration in {language} source")]
    FunctionNotFound { language: Language },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Unsupported construct on line {line}: {construct}")]
    UnsupportedConstruct { line: usize, construct: String },
}

impl AdapterError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        AdapterError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn unsupported(line: usize, construct: impl Into<String>) -> Self {
        AdapterError::UnsupportedConstruct {
            line,
            construct: construct.into(),
        }
    }
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to launch runtime '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error during execution: {0}")]
    Io(#[from] std::io::Error),

    #[error("Docker operation failed: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Program exceeds maximum size of {limit} bytes")]
    ProgramTooLarge { limit: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}
