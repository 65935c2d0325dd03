// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{BuildInput, GraphTransformer};
use crate::errors::ConstructionError;
use crate::graph::{Address, Graph};

/// Turns every declared reference into an edge from the referenced vertex to
/// the referencing one.
pub struct ReferenceTransformer;

impl GraphTransformer for ReferenceTransformer {
    fn name(&self) -> &'static str {
        "references"
    }

    fn transform(&self, graph: &mut Graph, _input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        let mut edges: Vec<(Address, Address)> = Vec::new();
        for vertex in graph.vertices() {
            for reference in vertex.references() {
                if !graph.contains(reference) {
                    return Err(ConstructionError::PassFailed {
                        pass: self.name(),
                        reason: format!("'{}' references undeclared '{}'", vertex.address(), reference),
                    });
                }
                edges.push((reference.clone(), vertex.address().clone()));
            }
        }
        for (from, to) in edges {
            graph.add_edge(&from, &to)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResourceConfig, StaticConfig};
    use crate::orchestrator::OperationKind;
    use crate::state::StateDocument;
    use crate::transform::test_support::*;
    use crate::transform::ConfigResourceTransformer;
    use serde_json::json;

    #[test]
    fn test_reference_and_depends_on_become_edges() {
        let config = StaticConfig::new()
            .resource(ResourceConfig::template("mem_x.a", json!({})))
            .resource(ResourceConfig::template("mem_x.b", json!({})))
            .resource(
                ResourceConfig::template("mem_x.c", json!({ "a": "${mem_x.a.id}" })).depends_on(["mem_x.b"]),
            );
        let state = StateDocument::new();
        let registry = mem_registry();
        let build = input(&config, &state, &registry, OperationKind::Plan);
        let mut graph = Graph::new();
        ConfigResourceTransformer.transform(&mut graph, &build).unwrap();
        ReferenceTransformer.transform(&mut graph, &build).unwrap();

        assert_eq!(
            graph.predecessors(&Address::new("mem_x.c")),
            vec![Address::new("mem_x.a"), Address::new("mem_x.b")]
        );
    }

    #[test]
    fn test_undeclared_reference_names_both_ends() {
        let config = StaticConfig::new()
            .resource(ResourceConfig::template("mem_x.a", json!({ "n": "${mem_x.nope.id}" })));
        let state = StateDocument::new();
        let registry = mem_registry();
        let build = input(&config, &state, &registry, OperationKind::Plan);
        let mut graph = Graph::new();
        ConfigResourceTransformer.transform(&mut graph, &build).unwrap();

        let err = ReferenceTransformer.transform(&mut graph, &build).unwrap_err();
        assert_eq!(
            err.to_string(),
            "transformer 'references' failed: 'mem_x.a' references undeclared 'mem_x.nope'"
        );
    }
}
