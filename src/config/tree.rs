// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Read-only view of declared configuration consumed by the transformers.

use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::{Expression, TemplateExpression};
use crate::graph::{Address, Lifecycle};

/// A declared resource instance.
#[derive(Clone)]
pub struct ResourceConfig {
    pub address: Address,
    /// Explicit provider configuration. When absent the provider is implied
    /// by the resource type prefix (`mem_subnet` -> `provider.mem`).
    pub provider: Option<Address>,
    /// Every address the resource reads from, plus explicit ordering-only
    /// dependencies.
    pub references: BTreeSet<Address>,
    pub config: Arc<dyn Expression>,
    pub lifecycle: Lifecycle,
}

impl ResourceConfig {
    pub fn new(address: impl Into<Address>, config: Arc<dyn Expression>) -> Self {
        let references = config.references();
        Self {
            address: address.into(),
            provider: None,
            references,
            config,
            lifecycle: Lifecycle::default(),
        }
    }

    /// Resource whose configuration is a JSON template.
    pub fn template(address: impl Into<Address>, template: Value) -> Self {
        Self::new(address, Arc::new(TemplateExpression::new(template)))
    }

    pub fn with_provider(mut self, provider: impl Into<Address>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Adds ordering-only dependencies (`depends_on`).
    pub fn depends_on<I, A>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.references.extend(addresses.into_iter().map(Into::into));
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }
}

/// A declared provider configuration.
#[derive(Clone)]
pub struct ProviderConfig {
    pub address: Address,
    pub references: BTreeSet<Address>,
    pub config: Arc<dyn Expression>,
}

impl ProviderConfig {
    pub fn new(address: impl Into<Address>, config: Arc<dyn Expression>) -> Self {
        let references = config.references();
        Self {
            address: address.into(),
            references,
            config,
        }
    }

    pub fn template(address: impl Into<Address>, template: Value) -> Self {
        Self::new(address, Arc::new(TemplateExpression::new(template)))
    }
}

/// A declared output value.
#[derive(Clone)]
pub struct OutputConfig {
    pub address: Address,
    pub references: BTreeSet<Address>,
    pub expression: Arc<dyn Expression>,
}

impl OutputConfig {
    pub fn new(address: impl Into<Address>, expression: Arc<dyn Expression>) -> Self {
        let references = expression.references();
        Self {
            address: address.into(),
            references,
            expression,
        }
    }

    pub fn template(address: impl Into<Address>, template: Value) -> Self {
        Self::new(address, Arc::new(TemplateExpression::new(template)))
    }
}

/// Declared configuration for one operation.
pub trait ConfigTree: Send + Sync {
    fn resources(&self) -> Vec<ResourceConfig>;

    fn providers(&self) -> Vec<ProviderConfig>;

    fn outputs(&self) -> Vec<OutputConfig> {
        Vec::new()
    }

    /// Every module that declares something, including parents of nested
    /// modules. Derived from declared addresses by default.
    fn modules(&self) -> BTreeSet<Address> {
        let mut modules = BTreeSet::new();
        let declared = self
            .resources()
            .into_iter()
            .map(|r| r.address)
            .chain(self.outputs().into_iter().map(|o| o.address));
        for address in declared {
            let mut current = address.module_path();
            while let Some(module) = current {
                current = module.module_path();
                if !modules.insert(module) {
                    break;
                }
            }
        }
        modules
    }
}

/// A configuration tree assembled in code.
#[derive(Clone, Default)]
pub struct StaticConfig {
    pub resources: Vec<ResourceConfig>,
    pub providers: Vec<ProviderConfig>,
    pub outputs: Vec<OutputConfig>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, resource: ResourceConfig) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn output(mut self, output: OutputConfig) -> Self {
        self.outputs.push(output);
        self
    }
}

impl ConfigTree for StaticConfig {
    fn resources(&self) -> Vec<ResourceConfig> {
        self.resources.clone()
    }

    fn providers(&self) -> Vec<ProviderConfig> {
        self.providers.clone()
    }

    fn outputs(&self) -> Vec<OutputConfig> {
        self.outputs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_references_become_resource_references() {
        let resource = ResourceConfig::template(
            "mem_subnet.a",
            json!({ "network": "${mem_network.main.id}" }),
        )
        .depends_on(["mem_zone.a"]);
        assert_eq!(
            resource.references,
            BTreeSet::from([Address::new("mem_network.main"), Address::new("mem_zone.a")])
        );
    }

    #[test]
    fn test_modules_include_nested_parents() {
        let config = StaticConfig::new()
            .resource(ResourceConfig::template("module.a.module.b.mem_x.y", json!({})))
            .resource(ResourceConfig::template("mem_x.root", json!({})))
            .output(OutputConfig::template("module.c.output.id", json!("x")));
        assert_eq!(
            config.modules(),
            BTreeSet::from([
                Address::new("module.a"),
                Address::new("module.a.module.b"),
                Address::new("module.c"),
            ])
        );
    }
}
