// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::{PlannedChange, VertexOutput};
use crate::errors::FatalError;
use crate::graph::Address;

/// Why a vertex never ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// One or more ancestors failed. `upstream` is the failed root earliest
    /// in graph order; `roots` lists every failed root that reaches this
    /// vertex.
    UpstreamFailed {
        upstream: Address,
        roots: Vec<Address>,
    },
    /// Fail-fast stopped admitting vertices.
    Halted,
    /// A fatal error ended the walk.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexStatus {
    Completed,
    Failed,
    Skipped(SkipReason),
}

/// Outcome of one walk.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub statuses: BTreeMap<Address, VertexStatus>,
    /// Vertices in the order they were dispatched.
    pub started: Vec<Address>,
    pub outputs: BTreeMap<Address, VertexOutput>,
    /// Position of every vertex in the graph's topological order.
    pub positions: HashMap<Address, usize>,
    pub fatal: Option<FatalError>,
    pub duration: Duration,
}

impl WalkReport {
    pub fn status(&self, address: &Address) -> Option<&VertexStatus> {
        self.statuses.get(address)
    }

    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, VertexStatus::Completed))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, VertexStatus::Failed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, VertexStatus::Skipped(_)))
    }

    pub fn anything_ran(&self) -> bool {
        !self.started.is_empty()
    }

    /// True if every vertex completed.
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none() && self.statuses.values().all(|s| *s == VertexStatus::Completed)
    }

    /// Planned or applied changes of completed resources, in graph order.
    pub fn changes(&self) -> Vec<PlannedChange> {
        let mut changes: Vec<&PlannedChange> = self
            .outputs
            .values()
            .filter_map(|output| output.change.as_ref())
            .collect();
        changes.sort_by_key(|c| self.positions.get(&c.address).copied().unwrap_or(usize::MAX));
        changes.into_iter().cloned().collect()
    }

    fn count(&self, predicate: impl Fn(&VertexStatus) -> bool) -> usize {
        self.statuses.values().filter(|s| predicate(s)).count()
    }
}
