//! YAML configuration for the deposit service.
//!
//! ```yaml
//! server:
//!   listen: "0.0.0.0:8084"
//! service:
//!   namespace: "default"
//! journal:
//!   path: "deposits.journal"
//! retry:
//!   initial-interval-ms: 1000
//!   backoff-coefficient: 2.0
//!   maximum-interval-ms: 60000
//!   maximum-attempts: 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use depositflow::retry::RetryPolicy;

/// Error raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config path could not be read.
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    /// The config path points at a directory.
    #[error("{0} is a directory")]
    IsDirectory(PathBuf),

    /// The YAML failed to parse.
    #[error("config parse: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,
    /// Service identity settings.
    #[serde(default)]
    pub service: ServiceSection,
    /// Write-ahead journal settings.
    #[serde(default)]
    pub journal: JournalSection,
    /// Retry policy applied to every pipeline step.
    #[serde(default)]
    pub retry: RetrySection,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerSection {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8084".to_string()
}

/// Service identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceSection {
    /// Logical namespace this process serves.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Write-ahead journal settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JournalSection {
    /// Journal file path. Omitted means an in-memory journal: runs will
    /// not survive a process restart.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Retry policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetrySection {
    /// Backoff before the second attempt, in milliseconds.
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    /// Multiplicative growth per attempt.
    #[serde(default = "default_backoff_coefficient")]
    pub backoff_coefficient: f64,
    /// Cap on the computed backoff, in milliseconds.
    #[serde(default = "default_maximum_interval_ms")]
    pub maximum_interval_ms: u64,
    /// Hard ceiling on attempts per step.
    #[serde(default = "default_maximum_attempts")]
    pub maximum_attempts: u32,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            backoff_coefficient: default_backoff_coefficient(),
            maximum_interval_ms: default_maximum_interval_ms(),
            maximum_attempts: default_maximum_attempts(),
        }
    }
}

fn default_initial_interval_ms() -> u64 {
    1000
}

fn default_backoff_coefficient() -> f64 {
    2.0
}

fn default_maximum_interval_ms() -> u64 {
    60_000
}

fn default_maximum_attempts() -> u32 {
    3
}

impl RetrySection {
    /// Converts the section into the core retry policy.
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_initial_interval(Duration::from_millis(self.initial_interval_ms))
            .with_backoff_coefficient(self.backoff_coefficient)
            .with_maximum_interval(Duration::from_millis(self.maximum_interval_ms))
            .with_maximum_attempts(self.maximum_attempts)
    }
}

/// Loads configuration from a YAML file.
pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let info = std::fs::metadata(path)?;
    if info.is_dir() {
        return Err(ConfigError::IsDirectory(path.to_path_buf()));
    }

    let raw = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_load_full_config() {
        let yaml = r#"
server:
  listen: "127.0.0.1:9000"
service:
  namespace: payments
journal:
  path: runs.journal
retry:
  initial-interval-ms: 10
  backoff-coefficient: 3.0
  maximum-interval-ms: 500
  maximum-attempts: 5
"#;
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{yaml}").expect("write");

        let config = load(file.path()).expect("load");
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.service.namespace, "payments");
        assert_eq!(config.journal.path, Some(PathBuf::from("runs.journal")));
        assert_eq!(config.retry.maximum_attempts, 5);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "service:\n  namespace: payments\n").expect("write");

        let config = load(file.path()).expect("load");
        assert_eq!(config.server.listen, "0.0.0.0:8084");
        assert_eq!(config.service.namespace, "payments");
        assert_eq!(config.journal.path, None);
        assert_eq!(config.retry.initial_interval_ms, 1000);
    }

    #[test]
    fn test_directory_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load(dir.path()).expect_err("must reject directory");
        assert!(matches!(err, ConfigError::IsDirectory(_)));
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = load("/definitely/not/here.yaml").expect_err("must fail");
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_retry_section_to_policy() {
        let section = RetrySection {
            initial_interval_ms: 250,
            backoff_coefficient: 2.0,
            maximum_interval_ms: 1000,
            maximum_attempts: 4,
        };

        let policy = section.to_policy();
        assert_eq!(policy.initial_interval, Duration::from_millis(250));
        assert_eq!(policy.maximum_interval, Duration::from_millis(1000));
        assert_eq!(policy.max_attempts(), 4);
    }
}
