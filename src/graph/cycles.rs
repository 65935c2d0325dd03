// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cycle detection.
//!
//! Strongly connected components are found with Tarjan's algorithm. A
//! component is a cycle if it has more than one member, or a single member
//! with an edge to itself. Each cycle is reported as an ordered address list
//! that walks the cycle's edges once, starting from its smallest address:
//! for `a -> b -> c -> a` the result is `[a, b, c]`.

use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use std::collections::HashSet;

use super::{Address, Graph};
use crate::errors::GraphError;

impl Graph {
    /// Fails with [`GraphError::Cycle`] naming the first cycle found.
    ///
    /// Must succeed before a graph is walked.
    pub fn validate(&self) -> Result<(), GraphError> {
        match self.cycles().into_iter().next() {
            Some(cycle) => Err(GraphError::Cycle { cycle }),
            None => Ok(()),
        }
    }

    /// Every non-trivial cycle, sorted by the first address of each.
    pub fn cycles(&self) -> Vec<Vec<Address>> {
        let mut cycles: Vec<Vec<Address>> = tarjan_scc(&self.inner)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self.inner.find_edge(component[0], component[0]).is_some()
            })
            .map(|component| self.ordered_cycle(&component))
            .collect();
        cycles.sort();
        cycles
    }

    pub(super) fn first_cycle_error(&self) -> GraphError {
        match self.cycles().into_iter().next() {
            Some(cycle) => GraphError::Cycle { cycle },
            None => GraphError::Cycle { cycle: Vec::new() },
        }
    }

    fn ordered_cycle(&self, component: &[NodeIndex]) -> Vec<Address> {
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let Some(&start) = component
            .iter()
            .min_by(|a, b| self.inner[**a].address().cmp(self.inner[**b].address()))
        else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut visited = HashSet::from([start]);
        self.extend_cycle_path(start, &members, &mut visited, &mut path);
        path.iter()
            .map(|&idx| self.inner[idx].address().clone())
            .collect()
    }

    /// Depth-first search inside one component for a path back to `start`.
    ///
    /// Successors are visited in address order so the reported cycle is
    /// stable. Every member of a strongly connected component reaches
    /// `start`, so the search always closes the loop.
    fn extend_cycle_path(
        &self,
        start: NodeIndex,
        members: &HashSet<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
    ) -> bool {
        let Some(&current) = path.last() else {
            return false;
        };
        let mut next: Vec<NodeIndex> = self
            .inner
            .neighbors_directed(current, Direction::Outgoing)
            .filter(|n| members.contains(n))
            .collect();
        next.sort_by(|a, b| self.inner[*a].address().cmp(self.inner[*b].address()));
        next.dedup();

        for neighbor in next {
            if neighbor == start {
                return true;
            }
            if visited.insert(neighbor) {
                path.push(neighbor);
                if self.extend_cycle_path(start, members, visited, path) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }
}
