// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::DiagnosticsAggregator;
use crate::errors::FatalError;
use crate::orchestrator::OperationKind;
use crate::state::SyncState;

/// Everything a vertex evaluation may touch besides its own inputs.
///
/// Shared by reference between the walker and every worker task.
#[derive(Debug)]
pub struct WalkContext {
    pub operation: OperationKind,
    pub diagnostics: Arc<DiagnosticsAggregator>,
    pub state: Arc<SyncState>,
    pub cancel: CancellationToken,
    /// Re-read current objects from their providers before planning.
    pub refresh: bool,
    deadline: Option<Duration>,
    deadline_hit: Arc<AtomicBool>,
}

impl WalkContext {
    pub fn new(operation: OperationKind, state: Arc<SyncState>) -> Self {
        Self {
            operation,
            diagnostics: Arc::new(DiagnosticsAggregator::new()),
            state,
            cancel: CancellationToken::new(),
            refresh: false,
            deadline: None,
            deadline_hit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<DiagnosticsAggregator>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Missing attributes evaluate to the unknown marker instead of failing.
    /// Apply always works with real values.
    pub fn allows_unknown(&self) -> bool {
        matches!(self.operation, OperationKind::Plan | OperationKind::Validate)
    }

    /// Starts the deadline timer, if one is configured. When it fires the
    /// walk's token is cancelled and the cancellation is reported as a
    /// timeout.
    pub fn arm_deadline(&self) -> Option<JoinHandle<()>> {
        let deadline = self.deadline?;
        let cancel = self.cancel.clone();
        let hit = self.deadline_hit.clone();
        Some(tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    hit.store(true, Ordering::SeqCst);
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        }))
    }

    /// The fatal error a cancelled walk reports.
    pub fn cancellation_reason(&self) -> FatalError {
        match self.deadline {
            Some(deadline) if self.deadline_hit.load(Ordering::SeqCst) => {
                FatalError::DeadlineExceeded(deadline)
            }
            _ => FatalError::Cancelled,
        }
    }
}
