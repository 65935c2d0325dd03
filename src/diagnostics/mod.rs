// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors and warnings produced while building and walking a graph.
//!
//! Vertices running concurrently append into a shared [`DiagnosticsAggregator`]
//! in whatever order they finish. The aggregator is drained once, after the
//! walk, and sorted by the position of the originating vertex in the graph's
//! deterministic topological order so the output does not depend on timing.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::graph::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A single error or warning, optionally attributed to a vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub address: Option<Address>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            address: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        write!(f, "{}: {}", level, self.summary)?;
        if let Some(address) = &self.address {
            write!(f, " (at {})", address)?;
        }
        if !self.detail.is_empty() {
            write!(f, "\n  {}", self.detail)?;
        }
        Ok(())
    }
}

/// Ordered, owned collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First error summary, handy for turning a diagnostic set into a message.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.errors().next()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(value: Vec<Diagnostic>) -> Self {
        Self(value)
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(value: Diagnostic) -> Self {
        Self(vec![value])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Thread-safe append-only sink shared by every worker of a walk.
///
/// Appends only hold the lock for the push itself.
#[derive(Debug, Default)]
pub struct DiagnosticsAggregator {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }

    pub fn append_all(&self, diagnostics: Diagnostics) {
        if diagnostics.is_empty() {
            return;
        }
        self.entries.lock().extend(diagnostics);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.lock().iter().any(Diagnostic::is_error)
    }

    /// Drains the sink, ordering entries by graph position, then address.
    ///
    /// Entries without an address come first; addresses missing from
    /// `positions` come last. The sort is stable, so entries from the same
    /// vertex keep the order that vertex appended them in.
    pub fn finish(&self, positions: &HashMap<Address, usize>) -> Diagnostics {
        let mut entries = std::mem::take(&mut *self.entries.lock());
        let key = |d: &Diagnostic| {
            d.address
                .as_ref()
                .map(|addr| (positions.get(addr).copied().unwrap_or(usize::MAX), addr.clone()))
        };
        entries.sort_by_cached_key(key);
        Diagnostics(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_finish_orders_by_graph_position() {
        let sink = DiagnosticsAggregator::new();
        sink.append(Diagnostic::error("late", "").with_address(Address::new("c")));
        sink.append(Diagnostic::warning("early", "").with_address(Address::new("a")));
        sink.append(Diagnostic::error("global", ""));

        let positions = HashMap::from([(Address::new("a"), 0), (Address::new("c"), 2)]);
        let diagnostics = sink.finish(&positions);

        let summaries: Vec<&str> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["global", "early", "late"]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_finish_orders_unpositioned_entries_by_address() {
        let sink = DiagnosticsAggregator::new();
        sink.append(Diagnostic::warning("zeta", "").with_address(Address::new("mem_x.z")));
        sink.append(Diagnostic::warning("alpha first", "").with_address(Address::new("mem_x.a")));
        sink.append(Diagnostic::warning("placed", "").with_address(Address::new("mem_x.p")));
        sink.append(Diagnostic::warning("alpha second", "").with_address(Address::new("mem_x.a")));

        let positions = HashMap::from([(Address::new("mem_x.p"), 0)]);
        let diagnostics = sink.finish(&positions);

        let summaries: Vec<&str> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["placed", "alpha first", "alpha second", "zeta"]);
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::warning("just a warning", ""));
        assert!(!diagnostics.has_errors());
        diagnostics.push(Diagnostic::error("broken", "detail"));
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let sink = Arc::new(DiagnosticsAggregator::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..25 {
                    sink.append(
                        Diagnostic::warning(format!("{}-{}", i, j), "")
                            .with_address(Address::new(format!("v{}", i))),
                    );
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(sink.len(), 16 * 25);
    }

    #[test]
    fn test_display_includes_address_and_detail() {
        let d = Diagnostic::error("Provider failed", "boom").with_address(Address::new("mem_x.a"));
        assert_eq!(d.to_string(), "Error: Provider failed (at mem_x.a)\n  boom");
    }
}
