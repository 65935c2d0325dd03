// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrent graph walk and the per-operation vertex evaluators.

pub mod context;
pub mod evaluators;
pub mod plan;
pub mod ready_queue;
pub mod report;
pub mod walker;

pub use context::WalkContext;
pub use evaluators::{evaluator_for, ApplyEvaluator, PlanEvaluator, ValidateEvaluator};
pub use plan::{Action, Plan, PlanSummary, PlannedChange};
pub use report::{SkipReason, VertexStatus, WalkReport};
pub use walker::Walker;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Scope;
use crate::errors::VertexError;
use crate::graph::Vertex;

/// What a completed vertex hands to its dependents.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexOutput {
    /// The value dependents see when they reference this vertex.
    pub value: Value,
    /// The change a resource planned or applied.
    pub change: Option<PlannedChange>,
}

impl VertexOutput {
    pub fn value(value: Value) -> Self {
        Self { value, change: None }
    }
}

/// Operation-specific evaluation of a single vertex.
///
/// `scope` holds exactly the values of the vertex's direct predecessors.
/// Implementations record provider effects in `ctx.state` and append
/// warnings to `ctx.diagnostics`; errors are returned, not appended.
#[async_trait]
pub trait VertexEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        vertex: &Vertex,
        scope: &Scope,
        ctx: &WalkContext,
    ) -> Result<VertexOutput, VertexError>;
}
