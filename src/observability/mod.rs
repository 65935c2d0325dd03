// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Log lines are emitted through message structs rather than ad-hoc format
//! strings. Each struct implements `Display` for the human-readable line and
//! [`messages::StructuredLog`] to emit it with typed `tracing` fields at the
//! level that fits the event.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::graph` - graph construction, transformer passes and cycle detection
//! * `messages::walk` - walker lifecycle and per-vertex events
//! * `messages::orchestrator` - operation phases and state persistence
//! * `messages::provider` - provider calls and applied changes
//!
//! # Usage
//!
//! ```rust
//! use terrawalk::observability::messages::StructuredLog;
//! use terrawalk::observability::messages::walk::WalkStarted;
//!
//! WalkStarted {
//!     operation: "plan",
//!     vertex_count: 12,
//!     parallelism: 10,
//! }
//! .log();
//! ```
//!
//! The library never installs a subscriber; the binary does.

pub mod messages;
