//! Configuration types for channel-harvester

use crate::error::{ConfigLoadError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for [`ChannelHarvester`](crate::ChannelHarvester)
///
/// Every field has a default, so an empty document is a valid configuration.
/// Sub-configs group settings by the component that reads them:
/// - [`extraction`](ExtractionConfig) - where archives are unpacked
/// - [`discovery`](DiscoveryConfig) - how join requests are issued
/// - [`ingestion`](IngestionConfig) - message processing limits
/// - [`logging`](LoggingConfig) - tracing subscriber setup
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvesterConfig {
    /// Declarative catalog of channels and patterns (default: "channels.yaml")
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Root directory attachments are downloaded into (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Archive extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Channel discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Message ingestion settings
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            download_dir: default_download_dir(),
            extraction: ExtractionConfig::default(),
            discovery: DiscoveryConfig::default(),
            ingestion: IngestionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HarvesterConfig {
    /// Load a configuration document from disk
    ///
    /// Files ending in `.json` are parsed as JSON; anything else is parsed as YAML.
    /// The loaded configuration is validated before being returned.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigLoadError::NotFound {
                    path: path.to_path_buf(),
                }
                .into());
            }
            Err(source) => {
                return Err(ConfigLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                }
                .into());
            }
        };

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config: Self = if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigLoadError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            Self::from_yaml_str(&content).map_err(|e| match e {
                Error::ConfigLoad(ConfigLoadError::Parse { reason, .. }) => {
                    Error::ConfigLoad(ConfigLoadError::Parse {
                        path: path.to_path_buf(),
                        reason,
                    })
                }
                other => other,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration document (an empty document yields defaults)
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| {
            ConfigLoadError::Parse {
                path: PathBuf::new(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.download_dir.as_os_str().is_empty() {
            return Err(Error::config("download_dir", "must not be empty"));
        }
        if self.ingestion.max_concurrent_messages == 0 {
            return Err(Error::config(
                "ingestion.max_concurrent_messages",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Archive extraction configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Root directory for extracted files (None = next to the downloaded archive)
    ///
    /// Each archive is unpacked into its own subdirectory named `<stem>_<extension>`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Channel discovery configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Skip join requests for channels already requested during the same discovery run
    ///
    /// Off by default: a channel listed explicitly and also matched by a pattern is
    /// requested twice, relying on the client treating repeated joins as harmless.
    #[serde(default)]
    pub dedupe_joins: bool,
}

/// Message ingestion configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum number of messages processed at the same time (default: 4)
    #[serde(default = "default_max_concurrent_messages")]
    pub max_concurrent_messages: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_messages: default_max_concurrent_messages(),
        }
    }
}

/// Logging configuration consumed by [`telemetry::init`](crate::telemetry::init)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set (default: "info")
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Include the event target (module path) in each line
    #[serde(default)]
    pub with_target: bool,

    /// Colorize output
    #[serde(default = "default_true")]
    pub ansi: bool,

    /// Write a daily rolling log file into this directory instead of stderr
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            with_target: false,
            ansi: true,
            log_dir: None,
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("channels.yaml")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent_messages() -> usize {
    4
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
