// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_PARALLELISM, MAX_PARALLELISM};
use crate::errors::{ConfigError, FailureStrategy};
use crate::graph::Address;
use crate::orchestrator::RunOptions;
use crate::transform::TargetMode;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Engine settings for one invocation.
///
/// Every field is optional in YAML.
///
/// # Fields
/// * `parallelism` - vertices evaluated concurrently (default 10, must be at least 1)
/// * `failure_strategy` - `continue_on_error` (default) or `fail_fast`
/// * `timeout_seconds` - deadline for the whole walk; none by default
/// * `refresh` - re-read every recorded object before planning
/// * `targets` - restrict the operation to these addresses
/// * `target_mode` - `with_dependencies` (default) or `with_dependents`
///
/// # Example
/// ```yaml
/// parallelism: 4
/// failure_strategy: fail_fast
/// timeout_seconds: 300
/// refresh: true
/// targets:
///   - mem_subnet.a
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub refresh: bool,
    #[serde(default)]
    pub targets: Vec<Address>,
    #[serde(default)]
    pub target_mode: TargetMode,
}

fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            failure_strategy: FailureStrategy::default(),
            timeout_seconds: None,
            refresh: false,
            targets: Vec::new(),
            target_mode: TargetMode::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid("parallelism must be at least 1".into()));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(ConfigError::Invalid(format!(
                "parallelism {} exceeds the maximum of {}",
                self.parallelism, MAX_PARALLELISM
            )));
        }
        if self.timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid("timeout_seconds must be positive".into()));
        }
        Ok(())
    }

    pub fn to_run_options(&self) -> RunOptions {
        RunOptions {
            parallelism: self.parallelism,
            failure_strategy: self.failure_strategy,
            timeout: self.timeout_seconds.map(Duration::from_secs),
            refresh: self.refresh,
            targets: self.targets.clone(),
            target_mode: self.target_mode,
            ..RunOptions::default()
        }
    }
}

/// Parse engine settings from YAML text.
pub fn parse_engine_config(text: &str) -> Result<EngineConfig, ConfigError> {
    let cfg: EngineConfig = serde_yaml::from_str(text)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load and validate engine settings from a YAML file.
pub fn load_engine_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_engine_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let cfg = parse_engine_config("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.parallelism, 10);
        assert_eq!(cfg.failure_strategy, FailureStrategy::ContinueOnError);
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
parallelism: 4
failure_strategy: fail_fast
timeout_seconds: 30
refresh: true
targets: [mem_subnet.a, module.net]
target_mode: with_dependents
"#;
        let cfg = parse_engine_config(yaml).unwrap();
        assert_eq!(cfg.parallelism, 4);
        assert_eq!(cfg.targets, vec![Address::new("mem_subnet.a"), Address::new("module.net")]);

        let options = cfg.to_run_options();
        assert_eq!(options.parallelism, 4);
        assert_eq!(options.failure_strategy, FailureStrategy::FailFast);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert!(options.refresh);
        assert_eq!(options.target_mode, TargetMode::WithDependents);
    }

    #[test]
    fn test_zero_parallelism_is_rejected() {
        let err = parse_engine_config("parallelism: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_failure_strategy_is_a_yaml_error() {
        let err = parse_engine_config("failure_strategy: best_effort").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_load_engine_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "parallelism: 2\n").unwrap();
        assert_eq!(load_engine_config(&path).unwrap().parallelism, 2);
    }
}
