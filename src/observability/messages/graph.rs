// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph construction and validation.
//!
//! This module contains message types for logging events related to:
//! * Individual transformer passes
//! * Target filtering
//! * Cyclic dependency detection
//! * Construction failures

use crate::graph::Address;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A transformer pass finished.
///
/// # Log Level
/// `debug!` - One line per pass per operation
pub struct TransformerApplied<'a> {
    pub pass: &'a str,
    pub vertex_count: usize,
    pub edge_count: usize,
}

impl Display for TransformerApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Transformer '{}' applied: {} vertices, {} edges",
            self.pass, self.vertex_count, self.edge_count
        )
    }
}

impl StructuredLog for TransformerApplied<'_> {
    fn log(&self) {
        tracing::debug!(
            pass = self.pass,
            vertex_count = self.vertex_count,
            edge_count = self.edge_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "transformer",
            span_name = name,
            pass = self.pass,
            vertex_count = self.vertex_count,
            edge_count = self.edge_count,
        )
    }
}

/// The pipeline produced a graph for an operation.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use terrawalk::observability::messages::graph::GraphBuilt;
///
/// let msg = GraphBuilt {
///     operation: "apply",
///     vertex_count: 8,
///     edge_count: 9,
/// };
///
/// assert_eq!(msg.to_string(), "Built apply graph: 8 vertices, 9 edges");
/// ```
pub struct GraphBuilt<'a> {
    pub operation: &'a str,
    pub vertex_count: usize,
    pub edge_count: usize,
}

impl Display for GraphBuilt<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Built {} graph: {} vertices, {} edges",
            self.operation, self.vertex_count, self.edge_count
        )
    }
}

impl StructuredLog for GraphBuilt<'_> {
    fn log(&self) {
        tracing::info!(
            operation = self.operation,
            vertex_count = self.vertex_count,
            edge_count = self.edge_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph_built",
            span_name = name,
            operation = self.operation,
            vertex_count = self.vertex_count,
            edge_count = self.edge_count,
        )
    }
}

/// Target filtering removed vertices from the graph.
///
/// # Log Level
/// `info!` - Changes what the operation will touch
pub struct TargetsApplied {
    pub target_count: usize,
    pub kept: usize,
    pub removed: usize,
}

impl Display for TargetsApplied {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Applied {} target(s): kept {} vertices, removed {}",
            self.target_count, self.kept, self.removed
        )
    }
}

impl StructuredLog for TargetsApplied {
    fn log(&self) {
        tracing::info!(
            target_count = self.target_count,
            kept = self.kept,
            removed = self.removed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "targets",
            span_name = name,
            target_count = self.target_count,
            kept = self.kept,
        )
    }
}

/// Cyclic dependency detected in a built graph.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct CycleDetected<'a> {
    pub cycle: &'a [Address],
}

impl CycleDetected<'_> {
    fn rendered(&self) -> String {
        let mut parts: Vec<&str> = self.cycle.iter().map(Address::as_str).collect();
        if let Some(first) = self.cycle.first() {
            parts.push(first.as_str());
        }
        parts.join(" -> ")
    }
}

impl Display for CycleDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cyclic dependency detected: {}", self.rendered())
    }
}

impl StructuredLog for CycleDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = %self.rendered(),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "cycle",
            span_name = name,
            cycle = %self.rendered(),
            cycle_length = self.cycle.len(),
        )
    }
}

/// A transformer pass rejected the configuration.
///
/// # Log Level
/// `error!` - The operation cannot proceed
pub struct ConstructionFailed<'a> {
    pub pass: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ConstructionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Graph construction failed in '{}': {}", self.pass, self.error)
    }
}

impl StructuredLog for ConstructionFailed<'_> {
    fn log(&self) {
        tracing::error!(pass = self.pass, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("construction_failed", span_name = name, pass = self.pass)
    }
}
