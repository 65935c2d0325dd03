// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::graph::Address;

/// Failures reported by a [`crate::traits::Provider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider rejected or failed a single request. Recorded against the
    /// vertex; the walk goes on.
    #[error("provider '{provider}' failed for '{address}': {message}")]
    Recoverable {
        provider: String,
        address: Address,
        message: String,
    },

    /// The provider connection is no longer usable. Ends the walk.
    #[error("protocol error from provider '{provider}': {message}")]
    Protocol { provider: String, message: String },
}

impl ProviderError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Protocol { .. })
    }
}
