//! Bridge configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `~/.config/omnifocus-mcp/config.{toml,json,yaml}` or an explicit `--config` file
//! 3. environment variables, e.g. `OMNIFOCUS_MCP__EXECUTOR__TIMEOUT_MS=60000`

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::omnifocus::client::CacheDomain;

pub const ENV_PREFIX: &str = "OMNIFOCUS_MCP";
pub const ENV_SEPARATOR: &str = "__";
pub const CONFIG_DIR_NAME: &str = "omnifocus-mcp";
pub const CONFIG_FILE_STEM: &str = "config";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
// 10 MiB covers a full flattenedTasks dump of a large database
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_OSASCRIPT: &str = "osascript";
pub const DEFAULT_APPLICATION: &str = "OmniFocus";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub executor: ExecutorConfig,
    pub cache: CacheTtls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Wall-clock limit for one script invocation
    pub timeout_ms: u64,
    /// Cap on captured stdout/stderr, per stream
    pub max_output_bytes: usize,
    /// Interpreter used to reach the automation target
    pub osascript_path: String,
    /// Application name passed to JXA `Application(...)`
    pub application: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            osascript_path: DEFAULT_OSASCRIPT.to_string(),
            application: DEFAULT_APPLICATION.to_string(),
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Per-domain cache lifetimes in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub tasks_ms: u64,
    pub projects_ms: u64,
    pub folders_ms: u64,
    pub tags_ms: u64,
    pub database_ms: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            tasks_ms: 30_000,
            projects_ms: 60_000,
            folders_ms: 120_000,
            tags_ms: 120_000,
            database_ms: 60_000,
        }
    }
}

impl CacheTtls {
    pub fn for_domain(&self, domain: CacheDomain) -> Duration {
        let ms = match domain {
            CacheDomain::Tasks => self.tasks_ms,
            CacheDomain::Projects => self.projects_ms,
            CacheDomain::Folders => self.folders_ms,
            CacheDomain::Tags => self.tags_ms,
            CacheDomain::Database => self.database_ms,
        };
        Duration::from_millis(ms)
    }

    /// Same lifetime for every domain (mainly for tests)
    pub fn uniform(ms: u64) -> Self {
        Self {
            tasks_ms: ms,
            projects_ms: ms,
            folders_ms: ms,
            tags_ms: ms,
            database_ms: ms,
        }
    }
}

impl BridgeConfig {
    /// Load the merged configuration. An explicit `path` must exist; the
    /// default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&BridgeConfig::default())
            .context("Failed to seed configuration defaults")?;

        let mut builder = config::Config::builder().add_source(defaults);

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow!("Config file not found: {}", path.display()));
                }
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(stem) = default_config_stem() {
                    debug!("Looking for optional configuration at {}.*", stem.display());
                    builder = builder.add_source(
                        config::File::with_name(&stem.to_string_lossy()).required(false),
                    );
                }
            }
        }

        let merged = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let config: BridgeConfig = merged
            .try_deserialize()
            .context("Invalid configuration values")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.executor.timeout_ms == 0 {
            return Err(anyhow!("executor.timeout_ms must be greater than zero"));
        }
        if self.executor.max_output_bytes == 0 {
            return Err(anyhow!("executor.max_output_bytes must be greater than zero"));
        }
        if self.executor.osascript_path.trim().is_empty() {
            return Err(anyhow!("executor.osascript_path cannot be empty"));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

/// `~/.config/omnifocus-mcp/config` (extension resolved by the loader)
pub fn default_config_stem() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_STEM))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn ttl_lookup_by_domain() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.for_domain(CacheDomain::Tasks), Duration::from_secs(30));
        assert_eq!(ttls.for_domain(CacheDomain::Folders), Duration::from_secs(120));
    }

    #[test]
    #[serial]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[executor]\ntimeout_ms = 5000\n\n[cache]\ntags_ms = 10").unwrap();

        let config = BridgeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.executor.timeout_ms, 5000);
        assert_eq!(config.executor.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
        assert_eq!(config.cache.tags_ms, 10);
        assert_eq!(config.cache.tasks_ms, 30_000);
    }

    #[test]
    #[serial]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[executor]\ntimeout_ms = 5000").unwrap();

        std::env::set_var("OMNIFOCUS_MCP__EXECUTOR__TIMEOUT_MS", "7000");
        let loaded = BridgeConfig::load(Some(file.path()));
        std::env::remove_var("OMNIFOCUS_MCP__EXECUTOR__TIMEOUT_MS");

        assert_eq!(loaded.unwrap().executor.timeout_ms, 7000);
    }

    #[test]
    #[serial]
    fn missing_explicit_file_is_an_error() {
        let err = BridgeConfig::load(Some(Path::new("/nonexistent/omnifocus.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = BridgeConfig::default();
        config.executor.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
