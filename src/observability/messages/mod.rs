// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Organization
//!
//! * `graph` - construction pipeline and validation
//! * `walk` - concurrent walk of a validated graph
//! * `orchestrator` - operation lifecycle
//! * `provider` - provider interactions

use tracing::Span;

pub mod graph;
pub mod orchestrator;
pub mod provider;
pub mod walk;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog {
    /// Emits the message as a `tracing` event.
    fn log(&self);

    /// Opens a span carrying the same fields as the event.
    fn span(&self, name: &str) -> Span;
}
