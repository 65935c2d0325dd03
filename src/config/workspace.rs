// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use super::{ConfigTree, OutputConfig, ProviderConfig, ResourceConfig, TemplateExpression};
use crate::errors::ConfigError;
use crate::graph::{Address, Lifecycle};

/// Infrastructure declared in a YAML file.
///
/// String values may interpolate other vertices with `${address.attribute}`;
/// each interpolation becomes a dependency edge.
///
/// # Example
/// ```yaml
/// providers:
///   - address: provider.mem
///     config:
///       region: west
/// resources:
///   - address: mem_network.main
///     config:
///       cidr: 10.0.0.0/16
///   - address: mem_subnet.a
///     config:
///       network_id: ${mem_network.main.id}
///     lifecycle:
///       create_before_destroy: true
/// outputs:
///   - address: output.subnet_id
///     value: ${mem_subnet.a.id}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub providers: Vec<ProviderBlock>,
    #[serde(default)]
    pub resources: Vec<ResourceBlock>,
    #[serde(default)]
    pub outputs: Vec<OutputBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderBlock {
    pub address: Address,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceBlock {
    pub address: Address,
    #[serde(default)]
    pub provider: Option<Address>,
    #[serde(default)]
    pub depends_on: Vec<Address>,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputBlock {
    pub address: Address,
    pub value: Value,
}

impl Workspace {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let workspace: Workspace = serde_yaml::from_str(text)?;
        workspace.check()?;
        Ok(workspace)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    fn check(&self) -> Result<(), ConfigError> {
        for provider in &self.providers {
            if provider.address.provider_type().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is not a provider address (expected provider.<type>[.<alias>])",
                    provider.address
                )));
            }
        }
        for output in &self.outputs {
            if !output.address.is_output() {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is not an output address (expected [module.<name>.]output.<name>)",
                    output.address
                )));
            }
        }
        for resource in &self.resources {
            if resource.address.is_provider()
                || resource.address.is_output()
                || resource.address.is_module()
            {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is not a resource address",
                    resource.address
                )));
            }
        }
        Ok(())
    }
}

impl ConfigTree for Workspace {
    fn resources(&self) -> Vec<ResourceConfig> {
        self.resources
            .iter()
            .map(|block| {
                let config = Arc::new(TemplateExpression::new(block.config.clone()));
                let mut resource = ResourceConfig::new(block.address.clone(), config)
                    .depends_on(block.depends_on.iter().cloned())
                    .with_lifecycle(block.lifecycle);
                resource.provider = block.provider.clone();
                resource
            })
            .collect()
    }

    fn providers(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .map(|block| ProviderConfig::template(block.address.clone(), block.config.clone()))
            .collect()
    }

    fn outputs(&self) -> Vec<OutputConfig> {
        self.outputs
            .iter()
            .map(|block| OutputConfig::template(block.address.clone(), block.value.clone()))
            .collect()
    }
}
