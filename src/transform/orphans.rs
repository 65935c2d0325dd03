// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{BuildInput, GraphTransformer};
use crate::errors::ConstructionError;
use crate::graph::{Graph, ResourceMode, ResourceVertex, Vertex};

/// Adds a delete-only vertex for every object in prior state whose address
/// is no longer declared.
pub struct OrphanResourceTransformer;

impl GraphTransformer for OrphanResourceTransformer {
    fn name(&self) -> &'static str {
        "orphan_resources"
    }

    fn transform(&self, graph: &mut Graph, input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        for (address, object) in &input.prior_state.resources {
            if graph.contains(address) {
                continue;
            }
            graph.add_vertex(Vertex::Resource(ResourceVertex::orphan(
                address.clone(),
                object.provider.clone(),
                object.dependencies.clone(),
            )))?;
        }
        Ok(())
    }
}

/// Orders deletions: an orphan is deleted before everything it depended on
/// in prior state.
///
/// Declared dependencies get the edge too, since a replacement deletes them.
/// Declared vertices never reference an orphan, so no cycle can form.
pub struct DestroyOrderingTransformer;

impl GraphTransformer for DestroyOrderingTransformer {
    fn name(&self) -> &'static str {
        "destroy_ordering"
    }

    fn transform(&self, graph: &mut Graph, _input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        let mut edges = Vec::new();
        for vertex in graph.vertices() {
            let Some(resource) = vertex.as_resource() else {
                continue;
            };
            let ResourceMode::Orphan { prior_dependencies } = &resource.mode else {
                continue;
            };
            for dependency in prior_dependencies {
                if graph.contains(dependency) {
                    edges.push((resource.address.clone(), dependency.clone()));
                }
            }
        }
        for (dependent, dependency) in edges {
            graph.add_edge(&dependent, &dependency)?;
        }
        Ok(())
    }
}
