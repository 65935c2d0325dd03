// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::ProviderError;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::graph::Address;

/// How the walker reacts to a failed vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Skip the failed vertex's descendants and keep walking everything else.
    #[default]
    ContinueOnError,
    /// Stop admitting new vertices after the first failure. In-flight
    /// vertices still finish.
    FailFast,
}

/// A failure local to one vertex. Recorded as diagnostics against the vertex;
/// its descendants are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VertexError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Expression evaluation produced an error diagnostic.
    #[error("{}", .0.summary)]
    Evaluation(Diagnostic),

    /// The provider answered but reported error diagnostics.
    #[error("provider reported {} error(s) for '{address}'", .diagnostics.errors().count())]
    ProviderDiagnostics {
        address: Address,
        diagnostics: Diagnostics,
    },

    #[error("instance '{address}' has prevent_destroy set but the plan calls for destroying it")]
    PreventDestroy { address: Address },

    #[error("vertex evaluation panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Internal(String),
}

impl VertexError {
    /// The fatal condition hidden inside this vertex failure, if any.
    pub fn fatal(&self) -> Option<FatalError> {
        match self {
            VertexError::Provider(err) if err.is_fatal() => Some(FatalError::Protocol(err.clone())),
            _ => None,
        }
    }

    /// Renders the failure as diagnostics attributed to `address`.
    pub fn to_diagnostics(&self, address: &Address) -> Diagnostics {
        match self {
            VertexError::Evaluation(diagnostic) => {
                Diagnostics::from(diagnostic.clone().with_address(address.clone()))
            }
            VertexError::ProviderDiagnostics { diagnostics, .. } => diagnostics
                .iter()
                .cloned()
                .map(|d| match d.address {
                    Some(_) => d,
                    None => d.with_address(address.clone()),
                })
                .collect::<Vec<_>>()
                .into(),
            VertexError::Provider(err) => Diagnostics::from(
                Diagnostic::error("Provider call failed", err.to_string()).with_address(address.clone()),
            ),
            VertexError::PreventDestroy { .. } => Diagnostics::from(
                Diagnostic::error("Instance cannot be destroyed", self.to_string())
                    .with_address(address.clone()),
            ),
            VertexError::Panicked(_) => Diagnostics::from(
                Diagnostic::error("Vertex evaluation panicked", self.to_string())
                    .with_address(address.clone()),
            ),
            VertexError::Internal(_) => Diagnostics::from(
                Diagnostic::error("Internal engine error", self.to_string())
                    .with_address(address.clone()),
            ),
        }
    }
}

/// Conditions that invalidate the whole operation. The walk admits no new
/// vertices once one is raised; effects already written to state stay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("operation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Protocol(ProviderError),

    #[error("state store failure: {0}")]
    StateStore(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FatalError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let summary = match self {
            FatalError::Cancelled => "Operation cancelled",
            FatalError::DeadlineExceeded(_) => "Operation timed out",
            FatalError::Protocol(_) => "Provider protocol failure",
            FatalError::StateStore(_) => "State store failure",
            FatalError::Internal(_) => "Internal engine error",
        };
        Diagnostic::error(summary, self.to_string())
    }
}
