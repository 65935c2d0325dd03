// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failures loading or saving a state document.
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("state store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state document is not valid: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("state schema version {found} is not supported (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("state store unavailable: {0}")]
    Unavailable(String),
}
