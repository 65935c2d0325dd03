// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Graph construction.
//!
//! A graph is assembled by an ordered list of [`GraphTransformer`] passes.
//! Each pass runs exactly once, sees the graph left by the passes before it,
//! and has read-only access to configuration, prior state and the provider
//! registry through [`BuildInput`]. The first failing pass aborts
//! construction; no partial graph ever leaves [`TransformPipeline::build`].
//!
//! The default pipeline for plan and apply is:
//!
//! | pass                 | effect                                                        |
//! |----------------------|---------------------------------------------------------------|
//! | `config_resources`   | one vertex per declared resource                              |
//! | `orphan_resources`   | one delete-only vertex per state entry no longer declared     |
//! | `outputs`            | one vertex per declared output                                |
//! | `module_boundaries`  | one boundary vertex per module, after all of its members      |
//! | `providers`          | provider vertices, handle instantiation, provider -> resource |
//! | `references`         | an edge for every declared reference                          |
//! | `destroy_ordering`   | orphans are deleted before the orphans they depended on       |
//! | `targets`            | drops everything outside the target selection                 |
//! | `prune_providers`    | drops provider vertices nothing uses                          |
//!
//! Validate skips `orphan_resources` and `destroy_ordering`: it never looks
//! at state.

mod config;
mod orphans;
mod providers;
mod references;
mod targets;

pub use config::{ConfigResourceTransformer, ModuleBoundaryTransformer, OutputTransformer};
pub use orphans::{DestroyOrderingTransformer, OrphanResourceTransformer};
pub use providers::{PruneProvidersTransformer, ProviderTransformer};
pub use references::ReferenceTransformer;
pub use targets::{TargetMode, TargetsTransformer};

use crate::config::{ConfigTree, ProviderRegistry};
use crate::errors::ConstructionError;
use crate::graph::{Address, Graph};
use crate::observability::messages::graph::{ConstructionFailed, GraphBuilt, TransformerApplied};
use crate::observability::messages::StructuredLog;
use crate::orchestrator::OperationKind;
use crate::state::StateDocument;

/// Read-only inputs shared by every pass.
pub struct BuildInput<'a> {
    pub config: &'a dyn ConfigTree,
    pub prior_state: &'a StateDocument,
    pub providers: &'a ProviderRegistry,
    pub operation: OperationKind,
    pub targets: &'a [Address],
    pub target_mode: TargetMode,
}

/// One construction pass.
pub trait GraphTransformer: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(&self, graph: &mut Graph, input: &BuildInput<'_>) -> Result<(), ConstructionError>;
}

#[derive(Default)]
pub struct TransformPipeline {
    passes: Vec<Box<dyn GraphTransformer>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pass: impl GraphTransformer + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// The standard pass list for an operation.
    pub fn for_operation(operation: OperationKind) -> Self {
        let pipeline = Self::new().with(ConfigResourceTransformer);
        let pipeline = match operation {
            OperationKind::Validate => pipeline,
            OperationKind::Plan | OperationKind::Apply => pipeline.with(OrphanResourceTransformer),
        };
        let pipeline = pipeline
            .with(OutputTransformer)
            .with(ModuleBoundaryTransformer)
            .with(ProviderTransformer)
            .with(ReferenceTransformer);
        let pipeline = match operation {
            OperationKind::Validate => pipeline,
            OperationKind::Plan | OperationKind::Apply => pipeline.with(DestroyOrderingTransformer),
        };
        pipeline.with(TargetsTransformer).with(PruneProvidersTransformer)
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs every pass in order on a fresh graph.
    pub fn build(&self, input: &BuildInput<'_>) -> Result<Graph, ConstructionError> {
        let mut graph = Graph::new();
        for pass in &self.passes {
            if let Err(err) = pass.transform(&mut graph, input) {
                ConstructionFailed {
                    pass: pass.name(),
                    error: &err,
                }
                .log();
                return Err(err);
            }
            TransformerApplied {
                pass: pass.name(),
                vertex_count: graph.len(),
                edge_count: graph.edge_count(),
            }
            .log();
        }
        GraphBuilt {
            operation: input.operation.as_str(),
            vertex_count: graph.len(),
            edge_count: graph.edge_count(),
        }
        .log();
        Ok(graph)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::config::{ResourceConfig, StaticConfig};
    use serde_json::json;

    #[test]
    fn test_pass_order() {
        assert_eq!(
            TransformPipeline::for_operation(OperationKind::Plan).pass_names(),
            vec![
                "config_resources",
                "orphan_resources",
                "outputs",
                "module_boundaries",
                "providers",
                "references",
                "destroy_ordering",
                "targets",
                "prune_providers",
            ]
        );
        let validate = TransformPipeline::for_operation(OperationKind::Validate).pass_names();
        assert!(!validate.contains(&"orphan_resources"));
        assert!(!validate.contains(&"destroy_ordering"));
    }

    #[test]
    fn test_failing_pass_returns_no_graph() {
        let config = StaticConfig::new()
            .resource(ResourceConfig::template("mem_x.a", json!("${mem_x.missing.id}")));
        let state = StateDocument::new();
        let registry = mem_registry();
        let err = TransformPipeline::for_operation(OperationKind::Plan)
            .build(&input(&config, &state, &registry, OperationKind::Plan))
            .unwrap_err();
        assert!(matches!(err, ConstructionError::PassFailed { pass: "references", .. }));
    }

    #[test]
    fn test_linear_chain_graph() {
        let config = StaticConfig::new()
            .resource(ResourceConfig::template("mem_x.a", json!({})))
            .resource(ResourceConfig::template("mem_x.b", json!({ "a": "${mem_x.a.id}" })))
            .resource(ResourceConfig::template("mem_x.c", json!({ "b": "${mem_x.b.id}" })));
        let state = StateDocument::new();
        let registry = mem_registry();
        let graph = TransformPipeline::for_operation(OperationKind::Plan)
            .build(&input(&config, &state, &registry, OperationKind::Plan))
            .unwrap();
        assert_eq!(
            graph.topological_order().unwrap(),
            vec![
                Address::new("provider.mem"),
                Address::new("mem_x.a"),
                Address::new("mem_x.b"),
                Address::new("mem_x.c"),
            ]
        );
    }
}
