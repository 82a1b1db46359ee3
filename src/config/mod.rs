/// Configuration management for reparto
///
/// The declarative topology description consumed by
/// [`Cluster::from_config`](crate::cluster::Cluster::from_config): global
/// database/table counts plus either one default data source reused for
/// every database index or an explicit per-shard override list.
use crate::error::ConfigError;
use crate::node::DataSource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Main cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of database shards; 0 means a single unsharded database
    pub db_count: usize,
    /// Number of physical tables per logical table per database
    pub table_count: u64,
    /// Default master data source, reused for every shard unless `shards`
    /// overrides are given
    pub source: DataSource,
    /// Default slave data sources
    pub slaves: Vec<DataSource>,
    /// Per-shard overrides; when non-empty they must cover every database
    /// index exactly once
    pub shards: Vec<ShardConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// One shard's override of the global data sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardConfig {
    pub db_index: usize,
    pub source: DataSource,
    #[serde(default)]
    pub slaves: Vec<DataSource>,
    /// Table count override for this shard
    #[serde(default)]
    pub table_count: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            db_count: 1,
            table_count: 1,
            source: DataSource::default(),
            slaves: Vec::new(),
            shards: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClusterConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: ClusterConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Zero counts mean "unsharded", matching the wire format's omitted
    /// fields.
    pub fn effective_db_count(&self) -> usize {
        self.db_count.max(1)
    }

    pub fn effective_table_count(&self) -> u64 {
        self.table_count.max(1)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let db_count = self.effective_db_count();

        if self.shards.is_empty() {
            validate_source("source", &self.source)?;
            for (i, slave) in self.slaves.iter().enumerate() {
                validate_source(&format!("slaves[{i}]"), slave)?;
            }
        } else {
            // the override list must expand to exactly one shard per
            // database index: gaps or duplicates would misroute silently
            if self.shards.len() != db_count {
                return Err(ConfigError::ValidationError(format!(
                    "{} shard overrides configured for {} databases",
                    self.shards.len(),
                    db_count
                )));
            }

            let mut seen = HashSet::new();
            for shard in &self.shards {
                if shard.db_index >= db_count {
                    return Err(ConfigError::ValidationError(format!(
                        "shard db_index {} out of range for {} databases",
                        shard.db_index, db_count
                    )));
                }
                if !seen.insert(shard.db_index) {
                    return Err(ConfigError::ValidationError(format!(
                        "duplicate shard db_index {}",
                        shard.db_index
                    )));
                }
                validate_source(&format!("shards[{}].source", shard.db_index), &shard.source)?;
                for (i, slave) in shard.slaves.iter().enumerate() {
                    validate_source(
                        &format!("shards[{}].slaves[{i}]", shard.db_index),
                        slave,
                    )?;
                }
            }
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}",
                    self.logging.level
                )))
            }
        }

        Ok(())
    }

    /// Starter configuration written by `reparto config`.
    pub fn example() -> Self {
        Self {
            db_count: 2,
            table_count: 4,
            source: DataSource {
                username: "app".to_string(),
                password: "change-me".to_string(),
                host: "10.0.1.10".to_string(),
                database: "app".to_string(),
                ..DataSource::default()
            },
            slaves: vec![
                DataSource {
                    username: "app_ro".to_string(),
                    password: "change-me".to_string(),
                    host: "10.0.1.11".to_string(),
                    database: "app".to_string(),
                    ..DataSource::default()
                },
                DataSource {
                    username: "app_ro".to_string(),
                    password: "change-me".to_string(),
                    host: "10.0.1.12".to_string(),
                    database: "app".to_string(),
                    ..DataSource::default()
                },
            ],
            ..Default::default()
        }
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        Self::example().save_to_file(path)
    }
}

fn validate_source(name: &str, source: &DataSource) -> Result<(), ConfigError> {
    if source.dsn.is_empty() && source.host.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{name}: either dsn or host is required"
        )));
    }
    Ok(())
}
