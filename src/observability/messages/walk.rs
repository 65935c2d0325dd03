// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the concurrent walk.
//!
//! This module contains message types for logging events related to:
//! * Walk lifecycle (start, completion, abort)
//! * Vertex execution (start, completion, failure, skip)

use crate::graph::Address;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Walk started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use terrawalk::observability::messages::walk::WalkStarted;
///
/// let msg = WalkStarted {
///     operation: "apply",
///     vertex_count: 5,
///     parallelism: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct WalkStarted<'a> {
    pub operation: &'a str,
    pub vertex_count: usize,
    pub parallelism: usize,
}

impl Display for WalkStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting {} walk: {} vertices, parallelism={}",
            self.operation, self.vertex_count, self.parallelism
        )
    }
}

impl StructuredLog for WalkStarted<'_> {
    fn log(&self) {
        tracing::info!(
            operation = self.operation,
            vertex_count = self.vertex_count,
            parallelism = self.parallelism,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "walk",
            span_name = name,
            operation = self.operation,
            vertex_count = self.vertex_count,
            parallelism = self.parallelism,
        )
    }
}

/// Walk finished, whether or not every vertex completed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WalkCompleted<'a> {
    pub operation: &'a str,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl Display for WalkCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} walk finished in {:?}: {} completed, {} failed, {} skipped",
            self.operation, self.duration, self.completed, self.failed, self.skipped
        )
    }
}

impl StructuredLog for WalkCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            operation = self.operation,
            completed = self.completed,
            failed = self.failed,
            skipped = self.skipped,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "walk_completed",
            span_name = name,
            operation = self.operation,
            duration = ?self.duration,
        )
    }
}

/// A fatal condition stopped the walk from admitting new vertices.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct WalkAborted<'a> {
    pub reason: &'a dyn std::error::Error,
    pub in_flight: usize,
}

impl Display for WalkAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Walk aborted: {} (waiting for {} in-flight vertices)",
            self.reason, self.in_flight
        )
    }
}

impl StructuredLog for WalkAborted<'_> {
    fn log(&self) {
        tracing::error!(reason = %self.reason, in_flight = self.in_flight, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("walk_aborted", span_name = name, in_flight = self.in_flight)
    }
}

/// Vertex handed to a worker.
///
/// # Log Level
/// `debug!` - One line per vertex
pub struct VertexStarted<'a> {
    pub address: &'a Address,
    pub in_flight: usize,
}

impl Display for VertexStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Vertex '{}' started ({} in flight)", self.address, self.in_flight)
    }
}

impl StructuredLog for VertexStarted<'_> {
    fn log(&self) {
        tracing::debug!(address = %self.address, in_flight = self.in_flight, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("vertex", span_name = name, address = %self.address)
    }
}

/// Vertex completed.
///
/// # Log Level
/// `debug!` - One line per vertex
pub struct VertexCompleted<'a> {
    pub address: &'a Address,
}

impl Display for VertexCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Vertex '{}' completed", self.address)
    }
}

impl StructuredLog for VertexCompleted<'_> {
    fn log(&self) {
        tracing::debug!(address = %self.address, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("vertex_completed", span_name = name, address = %self.address)
    }
}

/// Vertex failed; its descendants will be skipped.
///
/// # Log Level
/// `warn!` - Recorded as a diagnostic, the walk continues
pub struct VertexFailed<'a> {
    pub address: &'a Address,
    pub error: &'a dyn std::error::Error,
}

impl Display for VertexFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Vertex '{}' failed: {}", self.address, self.error)
    }
}

impl StructuredLog for VertexFailed<'_> {
    fn log(&self) {
        tracing::warn!(address = %self.address, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("vertex_failed", span_name = name, address = %self.address)
    }
}

/// Vertex skipped because an upstream vertex failed.
///
/// # Log Level
/// `info!` - Expected consequence of an earlier failure
pub struct VertexSkipped<'a> {
    pub address: &'a Address,
    pub upstream: &'a Address,
}

impl Display for VertexSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex '{}' skipped: upstream '{}' failed",
            self.address, self.upstream
        )
    }
}

impl StructuredLog for VertexSkipped<'_> {
    fn log(&self) {
        tracing::info!(address = %self.address, upstream = %self.upstream, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "vertex_skipped",
            span_name = name,
            address = %self.address,
            upstream = %self.upstream,
        )
    }
}
