//! `starkcodec.yaml`: optional CLI configuration.
//!
//! ```yaml
//! log:
//!   level: info
//!   json: false
//!   components:
//!     starkcodec-cairo: debug
//! resolver:
//!   getter_names: [get_implementation, implementation]
//!   implementation_pattern: implement
//! cache:
//!   capacity: 4096
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use starkcodec_cairo::ResolverConfig;
use starkcodec_observability::LogConfig;
use starkcodec_registry::CacheConfig;
use std::path::Path;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "STARKCODEC_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl CliConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // an empty file is a valid, all-defaults config
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("parse YAML config")
    }

    /// Load from `path`, else from `$STARKCODEC_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(std::path::PathBuf::from);
        match path.map(Path::to_path_buf).or(from_env) {
            Some(p) => {
                let yaml = std::fs::read_to_string(&p)
                    .with_context(|| format!("read config file '{}'", p.display()))?;
                Self::from_yaml(&yaml).with_context(|| format!("in config file '{}'", p.display()))
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg = CliConfig::from_yaml(
            "log:\n  level: debug\nresolver:\n  getter_names: [impl_of]\n",
        )
        .unwrap();
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.resolver.getter_names, vec!["impl_of".to_string()]);
        assert_eq!(cfg.resolver.upgrade_pattern, "upgrade");
        assert_eq!(cfg.cache, CacheConfig::default());
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(CliConfig::from_yaml("").unwrap(), CliConfig::default());
    }

    #[test]
    fn malformed_capacity_is_rejected() {
        assert!(CliConfig::from_yaml("cache:\n  capacity: lots\n").is_err());
    }
}
