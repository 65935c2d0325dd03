// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::BTreeSet;

use super::{BuildInput, GraphTransformer};
use crate::errors::ConstructionError;
use crate::graph::{Address, Graph};
use crate::observability::messages::graph::TargetsApplied;
use crate::observability::messages::StructuredLog;

/// Which neighbours of a targeted vertex stay in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// Targets and everything they depend on. Used by plan and apply.
    #[default]
    WithDependencies,
    /// Targets, everything that depends on them, and whatever those need.
    WithDependents,
}

/// Restricts the graph to the target selection.
///
/// Filtering happens during construction, before cycle validation and before
/// the walk, so vertices outside the selection never exist as far as the
/// walker is concerned. No-op when there are no targets.
pub struct TargetsTransformer;

impl GraphTransformer for TargetsTransformer {
    fn name(&self) -> &'static str {
        "targets"
    }

    fn transform(&self, graph: &mut Graph, input: &BuildInput<'_>) -> Result<(), ConstructionError> {
        if input.targets.is_empty() {
            return Ok(());
        }

        let addresses = graph.addresses();
        let mut matched = BTreeSet::new();
        for target in input.targets {
            let hits: Vec<&Address> = addresses.iter().filter(|a| a.matches_target(target)).collect();
            if hits.is_empty() {
                return Err(ConstructionError::UnknownTarget { target: target.clone() });
            }
            matched.extend(hits.into_iter().cloned());
        }

        let mut keep = matched.clone();
        if input.target_mode == TargetMode::WithDependents {
            for address in &matched {
                keep.extend(graph.descendants(address)?);
            }
        }
        let roots: Vec<Address> = keep.iter().cloned().collect();
        for address in &roots {
            keep.extend(graph.ancestors(address)?);
        }

        let removed = graph.retain(&keep);
        TargetsApplied {
            target_count: input.targets.len(),
            kept: graph.len(),
            removed: removed.len(),
        }
        .log();
        Ok(())
    }
}
