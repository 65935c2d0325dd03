// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::graph::Address;

/// Structural errors raised by [`crate::graph::Graph`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A vertex with this address is already part of the graph.
    #[error("duplicate vertex address '{address}'")]
    DuplicateAddress { address: Address },

    /// An edge endpoint or queried vertex does not exist.
    #[error("unknown vertex '{address}'")]
    UnknownVertex { address: Address },

    /// The graph contains a cycle. `cycle` lists the members in edge order,
    /// starting from the lowest address; the closing edge back to the first
    /// member is implied.
    #[error("cyclic dependency detected: {}", render_cycle(.cycle))]
    Cycle { cycle: Vec<Address> },
}

fn render_cycle(cycle: &[Address]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(Address::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.as_str());
    }
    parts.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_the_loop() {
        let err = GraphError::Cycle {
            cycle: vec![Address::new("a"), Address::new("b"), Address::new("c")],
        };
        assert_eq!(err.to_string(), "cyclic dependency detected: a -> b -> c -> a");
    }
}
