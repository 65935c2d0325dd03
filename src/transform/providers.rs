// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::{BuildInput, GraphTransformer};
use crate::config::TemplateExpression;
use crate::errors::ConstructionError;
use crate::graph::{Address, Graph, ProviderVertex, Vertex};
use crate::observability::messages::provider::ProviderInstantiated;
use crate::observability::messages::StructuredLog;
use crate::traits::ProviderHandle;

/// Binds every resource to a provider configuration.
///
/// The provider for a resource is, in order of preference: the one named in
/// its configuration, the one recorded in state (orphans), or the one implied
/// by its type prefix. A provider configuration that is referenced but not
/// declared is created with an empty configuration, as long as its type is
/// registered. Each provider vertex gets exactly one instantiated handle,
/// shared by all of its resources.
pub struct ProviderTransformer;

impl GraphTransformer for ProviderTransformer {
    fn name(&self) -> &'static str {
        "providers"
    }

    fn transform(&self, graph: &mut Graph, input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        for provider in input.config.providers() {
            let provider_type = provider_type_of(&provider.address)?;
            graph.add_vertex(Vertex::Provider(ProviderVertex {
                address: provider.address,
                provider_type,
                config: provider.config,
                references: provider.references,
                handle: None,
            }))?;
        }

        // === BIND RESOURCES ===
        let mut bindings = Vec::new();
        for vertex in graph.vertices() {
            let Some(resource) = vertex.as_resource() else {
                continue;
            };
            let provider = resource
                .provider
                .clone()
                .or_else(|| resource.address.implied_provider())
                .ok_or_else(|| ConstructionError::MissingProvider {
                    address: resource.address.clone(),
                })?;
            bindings.push((resource.address.clone(), provider));
        }

        let implicit: BTreeSet<Address> = bindings
            .iter()
            .map(|(_, provider)| provider.clone())
            .filter(|provider| !graph.contains(provider))
            .collect();
        for address in implicit {
            let provider_type = provider_type_of(&address)?;
            graph.add_vertex(Vertex::Provider(ProviderVertex {
                address,
                provider_type,
                config: Arc::new(TemplateExpression::new(json!({}))),
                references: BTreeSet::new(),
                handle: None,
            }))?;
        }

        // === INSTANTIATE ===
        for vertex in graph.vertices_mut() {
            let Some(provider) = vertex.as_provider_mut() else {
                continue;
            };
            let instance = input
                .providers
                .instantiate(&provider.provider_type, &provider.address)
                .ok_or_else(|| ConstructionError::UnknownProviderType {
                    address: provider.address.clone(),
                    provider_type: provider.provider_type.clone(),
                })?;
            ProviderInstantiated {
                address: &provider.address,
                provider_type: &provider.provider_type,
            }
            .log();
            provider.handle = Some(ProviderHandle::new(provider.address.clone(), instance));
        }

        // === WIRE ===
        for (resource, provider) in bindings {
            let handle = graph
                .vertex(&provider)
                .and_then(Vertex::as_provider)
                .and_then(|p| p.handle.clone());
            if let Some(vertex) = graph.vertex_mut(&resource).and_then(Vertex::as_resource_mut) {
                vertex.provider = Some(provider.clone());
                vertex.provider_handle = handle;
            }
            graph.add_edge(&provider, &resource)?;
        }
        Ok(())
    }
}

fn provider_type_of(address: &Address) -> Result<String, ConstructionError> {
    address
        .provider_type()
        .map(str::to_string)
        .ok_or_else(|| ConstructionError::PassFailed {
            pass: "providers",
            reason: format!("'{}' is not a provider configuration address", address),
        })
}

/// Drops provider vertices that no remaining resource uses.
///
/// Runs after target filtering, so a plan scoped to one provider's resources
/// never configures the others.
pub struct PruneProvidersTransformer;

impl GraphTransformer for PruneProvidersTransformer {
    fn name(&self) -> &'static str {
        "prune_providers"
    }

    fn transform(&self, graph: &mut Graph, _input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        let unused: Vec<Address> = graph
            .vertices()
            .filter(|v| v.as_provider().is_some())
            .map(|v| v.address().clone())
            .filter(|address| graph.successors(address).is_empty())
            .collect();
        for address in unused {
            graph.remove_vertex(&address);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderConfig, ResourceConfig, StaticConfig};
    use crate::orchestrator::OperationKind;
    use crate::state::{ResourceObject, StateDocument};
    use crate::transform::test_support::*;
    use crate::transform::{ConfigResourceTransformer, OrphanResourceTransformer};

    fn build(config: &StaticConfig, state: &StateDocument) -> Result<Graph, ConstructionError> {
        let registry = mem_registry();
        let input = input(config, state, &registry, OperationKind::Plan);
        let mut graph = Graph::new();
        ConfigResourceTransformer.transform(&mut graph, &input)?;
        OrphanResourceTransformer.transform(&mut graph, &input)?;
        ProviderTransformer.transform(&mut graph, &input)?;
        Ok(graph)
    }

    #[test]
    fn test_implied_provider_is_created_and_shared() {
        let config = StaticConfig::new()
            .resource(ResourceConfig::template("mem_x.a", json!({})))
            .resource(ResourceConfig::template("mem_y.b", json!({})));
        let graph = build(&config, &StateDocument::new()).unwrap();

        let provider = Address::new("provider.mem");
        assert!(graph.has_edge(&provider, &Address::new("mem_x.a")));
        assert!(graph.has_edge(&provider, &Address::new("mem_y.b")));
        let a = graph.vertex(&Address::new("mem_x.a")).and_then(Vertex::as_resource).unwrap();
        assert_eq!(a.provider, Some(provider.clone()));
        assert_eq!(a.provider_handle.as_ref().map(|h| h.address()), Some(&provider));
    }

    #[test]
    fn test_explicit_provider_wins() {
        let config = StaticConfig::new()
            .provider(ProviderConfig::template("provider.mem.west", json!({ "region": "west" })))
            .resource(ResourceConfig::template("mem_x.a", json!({})).with_provider("provider.mem.west"));
        let graph = build(&config, &StateDocument::new()).unwrap();
        assert!(graph.has_edge(&Address::new("provider.mem.west"), &Address::new("mem_x.a")));
        assert!(!graph.contains(&Address::new("provider.mem")));
    }

    #[test]
    fn test_orphan_uses_recorded_provider() {
        let state = StateDocument::new().with_resource(
            "mem_x.old",
            ResourceObject::new(json!({}), Address::new("provider.mem.east")),
        );
        let graph = build(&StaticConfig::new(), &state).unwrap();
        assert!(graph.has_edge(&Address::new("provider.mem.east"), &Address::new("mem_x.old")));
    }

    #[test]
    fn test_unregistered_provider_type() {
        let config = StaticConfig::new().resource(ResourceConfig::template("cloud_vm.a", json!({})));
        let err = build(&config, &StateDocument::new()).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::UnknownProviderType {
                address: Address::new("provider.cloud"),
                provider_type: "cloud".to_string(),
            }
        );
    }

    #[test]
    fn test_unused_providers_are_pruned() {
        let config = StaticConfig::new()
            .provider(ProviderConfig::template("provider.mem.idle", json!({})))
            .resource(ResourceConfig::template("mem_x.a", json!({})));
        let state = StateDocument::new();
        let registry = mem_registry();
        let input = input(&config, &state, &registry, OperationKind::Plan);
        let mut graph = build(&config, &state).unwrap();
        assert!(graph.contains(&Address::new("provider.mem.idle")));

        PruneProvidersTransformer.transform(&mut graph, &input).unwrap();
        assert!(!graph.contains(&Address::new("provider.mem.idle")));
        assert!(graph.contains(&Address::new("provider.mem")));
    }
}
