//! Grader configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! Every value has a default, so an empty environment yields the stock limits
//! (2 seconds, 256 MB).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ADDRESS_SPACE_FACTOR, DEFAULT_COMPILE_TIMEOUT_MS, DEFAULT_CPP_COMPILER,
    DEFAULT_C_COMPILER, DEFAULT_MEMORY_LIMIT_MB, DEFAULT_OUTPUT_LIMIT_BYTES,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIME_LIMIT_MS, MIN_POLL_INTERVAL_MS,
};

/// Main grader configuration
#[derive(Debug, Clone)]
pub struct GraderConfig {
    pub execution: ExecutionConfig,
    pub compiler: CompilerConfig,
    pub storage: StorageConfig,
    pub rust_log: String,
}

/// Limits applied while the compiled program runs
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Wall-clock time limit in milliseconds
    pub time_limit_ms: u64,
    /// Resident memory ceiling in megabytes
    pub memory_limit_mb: u64,
    /// Interval between resident memory samples in milliseconds
    pub poll_interval_ms: u64,
    /// Cap on captured bytes per output stream
    pub output_limit_bytes: u64,
    /// Hard address space rlimit as a multiple of the memory ceiling (0 = off)
    pub address_space_factor: u64,
}

/// Toolchain selection and compile step bounds
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub c_compiler: String,
    pub cpp_compiler: String,
    pub compile_timeout_ms: u64,
}

/// Scratch storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory under which per-request workspaces are created
    pub work_dir: PathBuf,
}

impl GraderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            execution: ExecutionConfig::from_env()?,
            compiler: CompilerConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "gradebox=info".to_string()),
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject values that would make a grading run meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execution.time_limit_ms == 0 {
            return Err(ConfigError::InvalidValue("GRADER_TIME_LIMIT_MS".to_string()));
        }
        if self.execution.memory_limit_mb == 0 {
            return Err(ConfigError::InvalidValue("GRADER_MEMORY_LIMIT_MB".to_string()));
        }
        if self.execution.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::InvalidValue("GRADER_POLL_INTERVAL_MS".to_string()));
        }
        if self.compiler.compile_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("GRADER_COMPILE_TIMEOUT_MS".to_string()));
        }
        Ok(())
    }
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            execution: ExecutionConfig::default(),
            compiler: CompilerConfig::default(),
            storage: StorageConfig::default(),
            rust_log: "gradebox=info".to_string(),
        }
    }
}

impl ExecutionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            time_limit_ms: parse_var("GRADER_TIME_LIMIT_MS", DEFAULT_TIME_LIMIT_MS)?,
            memory_limit_mb: parse_var("GRADER_MEMORY_LIMIT_MB", DEFAULT_MEMORY_LIMIT_MB)?,
            poll_interval_ms: parse_var("GRADER_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            output_limit_bytes: parse_var("GRADER_OUTPUT_LIMIT_BYTES", DEFAULT_OUTPUT_LIMIT_BYTES)?,
            address_space_factor: parse_var(
                "GRADER_ADDRESS_SPACE_FACTOR",
                DEFAULT_ADDRESS_SPACE_FACTOR,
            )?,
        })
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_mb.saturating_mul(1024 * 1024)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            address_space_factor: DEFAULT_ADDRESS_SPACE_FACTOR,
        }
    }
}

impl CompilerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            c_compiler: env::var("GRADER_CC").unwrap_or_else(|_| DEFAULT_C_COMPILER.to_string()),
            cpp_compiler: env::var("GRADER_CXX")
                .unwrap_or_else(|_| DEFAULT_CPP_COMPILER.to_string()),
            compile_timeout_ms: parse_var("GRADER_COMPILE_TIMEOUT_MS", DEFAULT_COMPILE_TIMEOUT_MS)?,
        })
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            c_compiler: DEFAULT_C_COMPILER.to_string(),
            cpp_compiler: DEFAULT_CPP_COMPILER.to_string(),
            compile_timeout_ms: DEFAULT_COMPILE_TIMEOUT_MS,
        }
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            work_dir: env::var("GRADER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
        })
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            work_dir: env::temp_dir(),
        }
    }
}

/// Read `name` from the environment, falling back to `default` when unset
fn parse_var<T: FromStr + ToString>(name: &str, default: T) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = GraderConfig::default();
        assert_eq!(config.execution.time_limit(), Duration::from_millis(2000));
        assert_eq!(config.execution.memory_limit_bytes(), 256 * 1024 * 1024);
        assert_eq!(config.compiler.c_compiler, "gcc");
        assert_eq!(config.compiler.cpp_compiler, "g++");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = GraderConfig::default();
        config.execution.time_limit_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(name)) if name == "GRADER_TIME_LIMIT_MS"
        ));

        let mut config = GraderConfig::default();
        config.execution.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_memory_limit_saturates() {
        let execution = ExecutionConfig {
            memory_limit_mb: u64::MAX,
            ..ExecutionConfig::default()
        };
        assert_eq!(execution.memory_limit_bytes(), u64::MAX);
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: u64 = parse_var("GRADER_TEST_SURELY_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
