//! Layered node configuration (SPEC_FULL §4.10): built-in defaults,
//! overridden by an optional TOML file, overridden by `GRIDNODE_*`
//! environment variables (via clap's `env` attribute on [`ConfigOverrides`]).

use std::path::{Path, PathBuf};

use clap::Args;
use gridnode_types::error::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_substrate_gateway_url() -> String {
    "http://127.0.0.1:9944".into()
}

fn default_kyc_url() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_job_timeout_secs() -> u64 {
    300
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_kyc_retry_attempts() -> u32 {
    5
}

/// The node's runtime configuration, in the precedence order described in
/// SPEC_FULL §4.10: struct defaults, then an optional TOML file, then
/// environment overrides applied on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node_id: u64,
    pub data_dir: PathBuf,
    pub substrate_gateway_url: String,
    pub kyc_url: String,
    pub job_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub kyc_retry_attempts: u32,
    pub rerun_all_on_boot: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            data_dir: default_data_dir(),
            substrate_gateway_url: default_substrate_gateway_url(),
            kyc_url: default_kyc_url(),
            job_timeout_secs: default_job_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            kyc_retry_attempts: default_kyc_retry_attempts(),
            rerun_all_on_boot: false,
        }
    }
}

/// Command-line / environment overrides, flattened into every subcommand
/// that needs a `NodeConfig`. `clap`'s `env` attribute reads `GRIDNODE_*`
/// when the flag itself isn't passed, giving us the env layer for free.
#[derive(Debug, Args)]
pub struct ConfigOverrides {
    /// Path to a TOML config file. Defaults are used for anything the file
    /// doesn't set; this flag's own overrides apply on top of the file.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(long, env = "GRIDNODE_NODE_ID")]
    pub node_id: Option<u64>,

    #[clap(long, env = "GRIDNODE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[clap(long, env = "GRIDNODE_SUBSTRATE_GATEWAY_URL")]
    pub substrate_gateway_url: Option<String>,

    #[clap(long, env = "GRIDNODE_KYC_URL")]
    pub kyc_url: Option<String>,

    #[clap(long, env = "GRIDNODE_JOB_TIMEOUT_SECS")]
    pub job_timeout_secs: Option<u64>,

    #[clap(long, env = "GRIDNODE_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    #[clap(long, env = "GRIDNODE_KYC_RETRY_ATTEMPTS")]
    pub kyc_retry_attempts: Option<u32>,

    #[clap(long, env = "GRIDNODE_RERUN_ALL_ON_BOOT")]
    pub rerun_all_on_boot: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("data_dir must not be empty")]
    EmptyDataDir,
    #[error("{field} must be a positive number of seconds, got {value}")]
    NonPositiveTimeout { field: &'static str, value: u64 },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "config.read",
            Self::Parse { .. } => "config.parse",
            Self::EmptyDataDir => "config.empty_data_dir",
            Self::NonPositiveTimeout { .. } => "config.non_positive_timeout",
        }
    }
}

impl NodeConfig {
    /// Loads defaults, layers an optional TOML file over them, then layers
    /// `overrides` over the result, and validates the outcome.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut cfg = match &overrides.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(v) = overrides.node_id {
            cfg.node_id = v;
        }
        if let Some(v) = &overrides.data_dir {
            cfg.data_dir = v.clone();
        }
        if let Some(v) = &overrides.substrate_gateway_url {
            cfg.substrate_gateway_url = v.clone();
        }
        if let Some(v) = &overrides.kyc_url {
            cfg.kyc_url = v.clone();
        }
        if let Some(v) = overrides.job_timeout_secs {
            cfg.job_timeout_secs = v;
        }
        if let Some(v) = overrides.http_timeout_secs {
            cfg.http_timeout_secs = v;
        }
        if let Some(v) = overrides.kyc_retry_attempts {
            cfg.kyc_retry_attempts = v;
        }
        if let Some(v) = overrides.rerun_all_on_boot {
            cfg.rerun_all_on_boot = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }
        if self.job_timeout_secs == 0 {
            return Err(ConfigError::NonPositiveTimeout {
                field: "job_timeout_secs",
                value: 0,
            });
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::NonPositiveTimeout {
                field: "http_timeout_secs",
                value: 0,
            });
        }
        Ok(())
    }

    pub fn queue_dir(&self) -> PathBuf {
        self.data_dir.join("jobs")
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> ConfigOverrides {
        ConfigOverrides {
            config: None,
            node_id: None,
            data_dir: None,
            substrate_gateway_url: None,
            kyc_url: None,
            job_timeout_secs: None,
            http_timeout_secs: None,
            kyc_retry_attempts: None,
            rerun_all_on_boot: None,
        }
    }

    #[test]
    fn defaults_validate_cleanly() {
        let cfg = NodeConfig::load(&no_overrides()).unwrap();
        assert_eq!(cfg.job_timeout_secs, 300);
        assert!(!cfg.rerun_all_on_boot);
    }

    #[test]
    fn override_wins_over_default() {
        let mut overrides = no_overrides();
        overrides.node_id = Some(42);
        overrides.rerun_all_on_boot = Some(true);
        let cfg = NodeConfig::load(&overrides).unwrap();
        assert_eq!(cfg.node_id, 42);
        assert!(cfg.rerun_all_on_boot);
    }

    #[test]
    fn file_is_layered_under_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridnode.toml");
        std::fs::write(&path, "node_id = 7\ndata_dir = \"/var/lib/gridnode\"\n").unwrap();

        let mut overrides = no_overrides();
        overrides.config = Some(path);
        overrides.node_id = Some(99);
        let cfg = NodeConfig::load(&overrides).unwrap();
        assert_eq!(cfg.node_id, 99, "flag override beats the file value");
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/gridnode"));
    }

    #[test]
    fn zero_job_timeout_is_rejected() {
        let mut overrides = no_overrides();
        overrides.job_timeout_secs = Some(0);
        let err = NodeConfig::load(&overrides).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveTimeout { .. }));
    }
}
