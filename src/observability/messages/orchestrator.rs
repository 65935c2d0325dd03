// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the operation lifecycle.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Operation requested.
///
/// # Log Level
/// `info!` - Important operational event
pub struct OperationStarted<'a> {
    pub operation: &'a str,
    pub parallelism: usize,
    pub target_count: usize,
}

impl Display for OperationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting {} (parallelism={}, targets={})",
            self.operation, self.parallelism, self.target_count
        )
    }
}

impl StructuredLog for OperationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            operation = self.operation,
            parallelism = self.parallelism,
            target_count = self.target_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "operation",
            span_name = name,
            operation = self.operation,
            parallelism = self.parallelism,
        )
    }
}

/// Phase transition.
///
/// # Log Level
/// `debug!` - Internal state machine step
pub struct PhaseChanged<'a> {
    pub operation: &'a str,
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for PhaseChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: {} -> {}", self.operation, self.from, self.to)
    }
}

impl StructuredLog for PhaseChanged<'_> {
    fn log(&self) {
        tracing::debug!(operation = self.operation, from = self.from, to = self.to, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("phase", span_name = name, operation = self.operation, to = self.to)
    }
}

/// Operation reached a terminal phase.
///
/// # Log Level
/// `info!` for completed operations, `error!` for failed ones
///
/// # Example
/// ```
/// use terrawalk::observability::messages::orchestrator::OperationFinished;
/// use std::time::Duration;
///
/// let msg = OperationFinished {
///     operation: "plan",
///     phase: "completed",
///     error_count: 0,
///     warning_count: 1,
///     duration: Duration::from_millis(40),
/// };
///
/// assert!(msg.to_string().starts_with("plan completed"));
/// ```
pub struct OperationFinished<'a> {
    pub operation: &'a str,
    pub phase: &'a str,
    pub error_count: usize,
    pub warning_count: usize,
    pub duration: Duration,
}

impl Display for OperationFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} in {:?}: {} error(s), {} warning(s)",
            self.operation, self.phase, self.duration, self.error_count, self.warning_count
        )
    }
}

impl StructuredLog for OperationFinished<'_> {
    fn log(&self) {
        if self.phase == "failed" {
            tracing::error!(
                operation = self.operation,
                phase = self.phase,
                error_count = self.error_count,
                warning_count = self.warning_count,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::info!(
                operation = self.operation,
                phase = self.phase,
                error_count = self.error_count,
                warning_count = self.warning_count,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "operation_finished",
            span_name = name,
            operation = self.operation,
            phase = self.phase,
        )
    }
}

/// State persisted after apply.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StateSaved {
    pub serial: u64,
    pub resource_count: usize,
}

impl Display for StateSaved {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "State saved: serial {}, {} resource(s)",
            self.serial, self.resource_count
        )
    }
}

impl StructuredLog for StateSaved {
    fn log(&self) {
        tracing::info!(serial = self.serial, resource_count = self.resource_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("state_saved", span_name = name, serial = self.serial)
    }
}

/// State store load or save failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct StateStoreFailed<'a> {
    pub action: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StateStoreFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Failed to {} state: {}", self.action, self.error)
    }
}

impl StructuredLog for StateStoreFailed<'_> {
    fn log(&self) {
        tracing::error!(action = self.action, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("state_store_failed", span_name = name, action = self.action)
    }
}
