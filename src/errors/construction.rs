// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::GraphError;
use crate::graph::Address;

/// Fatal errors raised while the transformer pipeline builds a graph.
/// Nothing has been evaluated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A resource is bound to a provider configuration whose type has no
    /// registered implementation.
    #[error("no provider implementation registered for type '{provider_type}' (needed by '{address}')")]
    UnknownProviderType {
        address: Address,
        provider_type: String,
    },

    /// A resource could not be associated with any provider configuration.
    #[error("resource '{address}' has no provider configuration")]
    MissingProvider { address: Address },

    /// A target filter entry matched no vertex.
    #[error("target '{target}' does not match any resource, output or module")]
    UnknownTarget { target: Address },

    #[error("transformer '{pass}' failed: {reason}")]
    PassFailed { pass: &'static str, reason: String },
}
