// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod construction;
mod execution;
mod graph;
mod operation;
mod provider;
mod state;

pub use config::ConfigError;
pub use construction::ConstructionError;
pub use execution::{FailureStrategy, FatalError, VertexError};
pub use graph::GraphError;
pub use operation::OperationError;
pub use provider::ProviderError;
pub use state::StateStoreError;
