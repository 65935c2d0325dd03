// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use super::{BuildInput, GraphTransformer};
use crate::errors::ConstructionError;
use crate::graph::{Graph, ModuleBoundaryVertex, OutputVertex, ResourceMode, ResourceVertex, Vertex};

/// Adds one vertex per declared resource instance.
pub struct ConfigResourceTransformer;

impl GraphTransformer for ConfigResourceTransformer {
    fn name(&self) -> &'static str {
        "config_resources"
    }

    fn transform(&self, graph: &mut Graph, input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        for resource in input.config.resources() {
            let vertex = ResourceVertex {
                address: resource.address,
                mode: ResourceMode::Desired(resource.config),
                references: resource.references,
                lifecycle: resource.lifecycle,
                provider: resource.provider,
                provider_handle: None,
            };
            graph.add_vertex(Vertex::Resource(vertex))?;
        }
        Ok(())
    }
}

/// Adds one vertex per declared output value.
pub struct OutputTransformer;

impl GraphTransformer for OutputTransformer {
    fn name(&self) -> &'static str {
        "outputs"
    }

    fn transform(&self, graph: &mut Graph, input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        for output in input.config.outputs() {
            graph.add_vertex(Vertex::Output(OutputVertex {
                address: output.address,
                expression: output.expression,
                references: output.references,
            }))?;
        }
        Ok(())
    }
}

/// Adds a boundary vertex for every module, depending on everything inside
/// the module (including nested module boundaries).
///
/// Whatever reads `module.<name>` as a whole waits for the module to finish.
pub struct ModuleBoundaryTransformer;

impl GraphTransformer for ModuleBoundaryTransformer {
    fn name(&self) -> &'static str {
        "module_boundaries"
    }

    fn transform(&self, graph: &mut Graph, input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        let members = graph.addresses();
        for module in input.config.modules() {
            let references: BTreeSet<_> = members
                .iter()
                .filter(|address| address.is_within(&module))
                .cloned()
                .collect();
            graph.add_vertex(Vertex::ModuleBoundary(ModuleBoundaryVertex {
                address: module,
                references,
            }))?;
        }

        // Nested boundaries close before their parents.
        let boundaries: Vec<_> = graph
            .vertices()
            .filter(|v| matches!(v, Vertex::ModuleBoundary(_)))
            .map(|v| v.address().clone())
            .collect();
        for outer in &boundaries {
            let nested: Vec<_> = boundaries
                .iter()
                .filter(|inner| inner.is_within(outer))
                .cloned()
                .collect();
            if let Some(Vertex::ModuleBoundary(boundary)) = graph.vertex_mut(outer) {
                boundary.references.extend(nested);
            }
        }
        Ok(())
    }
}
