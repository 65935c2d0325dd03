// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ready queue for the walker.
//!
//! Vertices whose dependencies have all finished wait here until a
//! parallelism slot frees up. Dispatch order is the vertex's position in the
//! graph's deterministic topological order, with the address as a tie
//! breaker, so a walk with parallelism 1 visits vertices in exactly
//! [`Graph::topological_order`](crate::graph::Graph::topological_order).
//!
//! # Examples
//! ```rust
//! use terrawalk::engine::ready_queue::{ReadyQueue, ReadyVertex};
//! use terrawalk::graph::Address;
//!
//! let mut queue = ReadyQueue::new();
//! queue.push(ReadyVertex::new(Address::new("mem_x.late"), 7));
//! queue.push(ReadyVertex::new(Address::new("mem_x.early"), 2));
//!
//! assert_eq!(queue.pop(), Some(Address::new("mem_x.early")));
//! assert_eq!(queue.pop(), Some(Address::new("mem_x.late")));
//! assert_eq!(queue.pop(), None);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::Address;

/// A vertex waiting for a parallelism slot.
#[derive(Debug, Clone)]
pub struct ReadyVertex {
    pub address: Address,
    pub position: usize,
}

impl ReadyVertex {
    pub fn new(address: Address, position: usize) -> Self {
        Self { address, position }
    }
}

impl PartialEq for ReadyVertex {
    /// Identity is the address alone.
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for ReadyVertex {}

impl PartialOrd for ReadyVertex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyVertex {
    /// Reversed so that the max-heap pops the lowest position first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .position
            .cmp(&self.position)
            .then_with(|| other.address.cmp(&self.address))
    }
}

#[derive(Debug, Default)]
pub struct ReadyQueue {
    heap: BinaryHeap<ReadyVertex>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, vertex: ReadyVertex) {
        self.heap.push(vertex);
    }

    pub fn extend<I>(&mut self, vertices: I)
    where
        I: IntoIterator<Item = ReadyVertex>,
    {
        self.heap.extend(vertices);
    }

    /// Removes the earliest vertex in topological order.
    pub fn pop(&mut self) -> Option<Address> {
        self.heap.pop().map(|v| v.address)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Empties the queue, returning what was still waiting.
    pub fn drain(&mut self) -> Vec<Address> {
        let mut drained: Vec<Address> = self.heap.drain().map(|v| v.address).collect();
        drained.sort();
        drained
    }
}
