// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::{ConstructionError, FatalError};
use crate::graph::Address;
use crate::orchestrator::Phase;

/// Why an operation ended in [`Phase::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("graph construction failed: {0}")]
    Construction(#[from] ConstructionError),

    #[error("dependency cycle: {}", .cycle.iter().map(Address::as_str).collect::<Vec<_>>().join(" -> "))]
    Cycle { cycle: Vec<Address> },

    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("invalid phase transition from {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },
}
