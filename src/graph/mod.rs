// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Operation graph: addressed vertices and "must complete before" edges.
//!
//! An edge `from -> to` means `from` must finish before `to` begins. The graph
//! is built fresh for every operation by the transformer pipeline, validated
//! once (see [`Graph::validate`]) and then handed, read-only, to the walker.
//!
//! Storage is a `petgraph` `StableDiGraph` so that transformers can remove
//! vertices (target filtering, pruning) without invalidating the indices held
//! by the address lookup.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use terrawalk::config::TemplateExpression;
//! use terrawalk::graph::{Address, Graph, ResourceVertex, Vertex};
//!
//! let mut graph = Graph::new();
//! for name in ["mem_x.a", "mem_x.b"] {
//!     let config = Arc::new(TemplateExpression::new(json!({})));
//!     graph.add_vertex(Vertex::Resource(ResourceVertex::desired(Address::new(name), config))).unwrap();
//! }
//! graph.add_edge(&Address::new("mem_x.a"), &Address::new("mem_x.b")).unwrap();
//!
//! assert!(graph.validate().is_ok());
//! assert_eq!(
//!     graph.topological_order().unwrap(),
//!     vec![Address::new("mem_x.a"), Address::new("mem_x.b")]
//! );
//! ```

mod address;
mod cycles;
mod vertex;

pub use address::Address;
pub use vertex::{
    Lifecycle, ModuleBoundaryVertex, OutputVertex, ProviderVertex, ResourceMode, ResourceVertex,
    Vertex, VertexKind,
};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::errors::GraphError;

#[derive(Debug, Default)]
pub struct Graph {
    inner: StableDiGraph<Vertex, ()>,
    index: HashMap<Address, NodeIndex>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<(), GraphError> {
        let address = vertex.address().clone();
        if self.index.contains_key(&address) {
            return Err(GraphError::DuplicateAddress { address });
        }
        let idx = self.inner.add_node(vertex);
        self.index.insert(address, idx);
        Ok(())
    }

    /// Adds `from -> to`. Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, from: &Address, to: &Address) -> Result<bool, GraphError> {
        let a = self.node(from)?;
        let b = self.node(to)?;
        if self.inner.find_edge(a, b).is_some() {
            return Ok(false);
        }
        self.inner.add_edge(a, b, ());
        Ok(true)
    }

    pub fn remove_edge(&mut self, from: &Address, to: &Address) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        match self.inner.find_edge(a, b) {
            Some(edge) => self.inner.remove_edge(edge).is_some(),
            None => false,
        }
    }

    /// Removes a vertex together with all its edges.
    pub fn remove_vertex(&mut self, address: &Address) -> Option<Vertex> {
        let idx = self.index.remove(address)?;
        self.inner.remove_node(idx)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.index.contains_key(address)
    }

    pub fn vertex(&self, address: &Address) -> Option<&Vertex> {
        self.index.get(address).map(|&idx| &self.inner[idx])
    }

    pub fn vertex_mut(&mut self, address: &Address) -> Option<&mut Vertex> {
        let idx = *self.index.get(address)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.inner.node_weights()
    }

    pub fn vertices_mut(&mut self) -> impl Iterator<Item = &mut Vertex> {
        self.inner.node_weights_mut()
    }

    /// All addresses, sorted.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.index.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn has_edge(&self, from: &Address, to: &Address) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.inner.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Direct upstream vertices, sorted by address.
    pub fn predecessors(&self, address: &Address) -> Vec<Address> {
        self.neighbors(address, Direction::Incoming)
    }

    /// Direct downstream vertices, sorted by address.
    pub fn successors(&self, address: &Address) -> Vec<Address> {
        self.neighbors(address, Direction::Outgoing)
    }

    /// Everything `address` transitively depends on.
    pub fn ancestors(&self, address: &Address) -> Result<BTreeSet<Address>, GraphError> {
        self.reachable(address, Direction::Incoming)
    }

    /// Everything that transitively depends on `address`.
    pub fn descendants(&self, address: &Address) -> Result<BTreeSet<Address>, GraphError> {
        self.reachable(address, Direction::Outgoing)
    }

    /// Deterministic topological order.
    ///
    /// Kahn's algorithm with ties broken by address, so the same graph always
    /// yields the same order. This is the order a walk with parallelism 1
    /// follows.
    pub fn topological_order(&self) -> Result<Vec<Address>, GraphError> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .inner
            .node_indices()
            .map(|idx| (idx, self.inner.neighbors_directed(idx, Direction::Incoming).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<(&Address, NodeIndex)>> = in_degree
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&idx, _)| Reverse((self.inner[idx].address(), idx)))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse((address, idx))) = ready.pop() {
            order.push(address.clone());
            for next in self.inner.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(count) = in_degree.get_mut(&next) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse((self.inner[next].address(), next)));
                    }
                }
            }
        }

        if order.len() != self.len() {
            return Err(self.first_cycle_error());
        }
        Ok(order)
    }

    /// Address -> index in [`Graph::topological_order`].
    pub fn positions(&self) -> Result<HashMap<Address, usize>, GraphError> {
        Ok(self
            .topological_order()?
            .into_iter()
            .enumerate()
            .map(|(position, address)| (address, position))
            .collect())
    }

    /// Removes every vertex not in `keep`. Returns the removed addresses.
    pub fn retain(&mut self, keep: &BTreeSet<Address>) -> Vec<Address> {
        let removed: Vec<Address> = self
            .addresses()
            .into_iter()
            .filter(|address| !keep.contains(address))
            .collect();
        for address in &removed {
            self.remove_vertex(address);
        }
        removed
    }

    fn node(&self, address: &Address) -> Result<NodeIndex, GraphError> {
        self.index
            .get(address)
            .copied()
            .ok_or_else(|| GraphError::UnknownVertex {
                address: address.clone(),
            })
    }

    fn neighbors(&self, address: &Address, direction: Direction) -> Vec<Address> {
        let Some(&idx) = self.index.get(address) else {
            return Vec::new();
        };
        let mut out: Vec<Address> = self
            .inner
            .neighbors_directed(idx, direction)
            .map(|n| self.inner[n].address().clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    fn reachable(
        &self,
        address: &Address,
        direction: Direction,
    ) -> Result<BTreeSet<Address>, GraphError> {
        let start = self.node(address)?;
        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            for next in self.inner.neighbors_directed(idx, direction) {
                if next != start && seen.insert(self.inner[next].address().clone()) {
                    stack.push(next);
                }
            }
        }
        Ok(seen)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_duplicate_address_is_rejected() {
        let mut graph = graph_of(&["a"], &[]);
        let err = graph.add_vertex(resource("a")).unwrap_err();
        assert_eq!(err, GraphError::DuplicateAddress { address: Address::new("a") });
    }

    #[test]
    fn test_edge_to_unknown_vertex_is_rejected() {
        let mut graph = graph_of(&["a"], &[]);
        let err = graph.add_edge(&Address::new("a"), &Address::new("missing")).unwrap_err();
        assert_eq!(err, GraphError::UnknownVertex { address: Address::new("missing") });
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = graph_of(&["a", "b"], &[("a", "b")]);
        assert!(!graph.add_edge(&Address::new("a"), &Address::new("b")).unwrap());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_linear_topological_order() {
        let graph = graph_of(&["c", "b", "a"], &[("a", "b"), ("b", "c")]);
        assert_eq!(graph.topological_order().unwrap(), addrs(&["a", "b", "c"]));
    }

    #[test]
    fn test_topological_order_breaks_ties_by_address() {
        let graph = graph_of(&["d", "c", "b", "a"], &[("a", "d"), ("b", "d"), ("c", "d")]);
        assert_eq!(graph.topological_order().unwrap(), addrs(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let graph = graph_of(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let descendants = graph.descendants(&Address::new("a")).unwrap();
        assert_eq!(descendants.into_iter().collect::<Vec<_>>(), addrs(&["b", "c", "d"]));
        let ancestors = graph.ancestors(&Address::new("d")).unwrap();
        assert_eq!(ancestors.into_iter().collect::<Vec<_>>(), addrs(&["a", "b", "c"]));
        assert!(graph.descendants(&Address::new("e")).unwrap().is_empty());
    }

    #[test]
    fn test_remove_vertex_drops_edges() {
        let mut graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        assert!(graph.remove_vertex(&Address::new("b")).is_some());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.successors(&Address::new("a")).is_empty());
        // Indices stay valid after removal.
        assert!(graph.vertex(&Address::new("c")).is_some());
    }

    #[test]
    fn test_retain_keeps_subset() {
        let mut graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let keep = BTreeSet::from([Address::new("a"), Address::new("b")]);
        let removed = graph.retain(&keep);
        assert_eq!(removed, addrs(&["c"]));
        assert_eq!(graph.len(), 2);
        assert!(graph.has_edge(&Address::new("a"), &Address::new("b")));
    }

    #[test]
    fn test_positions_follow_topological_order() {
        let graph = graph_of(&["b", "a"], &[("b", "a")]);
        let positions = graph.positions().unwrap();
        assert_eq!(positions[&Address::new("b")], 0);
        assert_eq!(positions[&Address::new("a")], 1);
    }
}
