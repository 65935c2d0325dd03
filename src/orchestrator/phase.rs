// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use super::OperationKind;
use crate::errors::OperationError;
use crate::observability::messages::orchestrator::PhaseChanged;
use crate::observability::messages::StructuredLog;

/// Lifecycle of one operation.
///
/// ```text
/// NotStarted -> Building -> Walking -> Completed
///      \            \          \
///       `------------`----------`--> Failed
/// ```
///
/// `Completed` means the walk ran to its end; individual vertices may still
/// have failed. `Failed` means construction failed, a cycle was found, or a
/// fatal error ended the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Building,
    Walking,
    Completed,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::Building => "building",
            Phase::Walking => "walking",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }

    pub fn can_transition_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::NotStarted, Phase::Building)
                | (Phase::Building, Phase::Walking)
                | (Phase::Walking, Phase::Completed)
                | (Phase::NotStarted | Phase::Building | Phase::Walking, Phase::Failed)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enforces [`Phase`] transitions and remembers every phase visited.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    operation: OperationKind,
    history: Vec<Phase>,
}

impl PhaseMachine {
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            history: vec![Phase::NotStarted],
        }
    }

    pub fn current(&self) -> Phase {
        self.history.last().copied().unwrap_or(Phase::NotStarted)
    }

    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn transition(&mut self, next: Phase) -> Result<(), OperationError> {
        let from = self.current();
        if !from.can_transition_to(next) {
            return Err(OperationError::InvalidTransition { from, to: next });
        }
        PhaseChanged {
            operation: self.operation.as_str(),
            from: from.as_str(),
            to: next.as_str(),
        }
        .log();
        self.history.push(next);
        Ok(())
    }

    /// Moves to [`Phase::Failed`] unless the machine already finished.
    pub fn fail(&mut self) {
        if !self.current().is_terminal() {
            let _ = self.transition(Phase::Failed);
        }
    }

    pub fn into_history(self) -> Vec<Phase> {
        self.history
    }
}
