// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Proposed changes and the plan that collects them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::graph::Address;

/// Placeholder for attribute values a provider only learns during apply.
pub const UNKNOWN_VALUE: &str = "(known after apply)";

pub fn unknown() -> Value {
    Value::String(UNKNOWN_VALUE.to_string())
}

pub fn is_unknown(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoOp,
    Create,
    Update,
    Delete,
    Replace,
}

impl Action {
    /// Derives the action from the object before and after the change.
    ///
    /// # Examples
    /// ```
    /// use serde_json::json;
    /// use terrawalk::engine::Action;
    ///
    /// let old = json!({ "size": 1 });
    /// let new = json!({ "size": 2 });
    /// assert_eq!(Action::derive(None, Some(&new), false), Action::Create);
    /// assert_eq!(Action::derive(Some(&old), Some(&new), false), Action::Update);
    /// assert_eq!(Action::derive(Some(&old), Some(&new), true), Action::Replace);
    /// assert_eq!(Action::derive(Some(&old), None, false), Action::Delete);
    /// assert_eq!(Action::derive(Some(&old), Some(&old), false), Action::NoOp);
    /// ```
    pub fn derive(before: Option<&Value>, after: Option<&Value>, requires_replace: bool) -> Self {
        match (before, after) {
            (None, None) => Action::NoOp,
            (None, Some(_)) => Action::Create,
            (Some(_), None) => Action::Delete,
            (Some(_), Some(_)) if requires_replace => Action::Replace,
            (Some(b), Some(a)) if a == b => Action::NoOp,
            (Some(_), Some(_)) => Action::Update,
        }
    }

    pub fn is_change(&self) -> bool {
        *self != Action::NoOp
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::NoOp => "no-op",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Replace => "replace",
        };
        f.write_str(name)
    }
}

/// One resource's proposed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedChange {
    pub address: Address,
    pub action: Action,
    pub before: Option<Value>,
    pub after: Option<Value>,
    /// Provider configuration that will carry out the change.
    pub provider: Address,
}

impl PlannedChange {
    /// The create half of a replacement.
    pub fn as_create(&self) -> Self {
        Self {
            action: Action::Create,
            before: None,
            ..self.clone()
        }
    }

    /// The delete half of a replacement.
    pub fn as_delete(&self) -> Self {
        Self {
            action: Action::Delete,
            after: None,
            ..self.clone()
        }
    }
}

/// Counts used by the plan summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub add: usize,
    pub change: usize,
    pub destroy: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plan: {} to add, {} to change, {} to destroy.",
            self.add, self.change, self.destroy
        )
    }
}

/// Immutable result of a plan (or validate) operation.
///
/// `changes` holds one entry per resource that was planned, including no-op
/// entries, in the graph's topological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
    /// Root module output values, where known.
    pub outputs: BTreeMap<Address, Value>,
}

impl Plan {
    pub fn change(&self, address: &Address) -> Option<&PlannedChange> {
        self.changes.iter().find(|c| &c.address == address)
    }

    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action.is_change())
    }

    /// Changes other than no-ops.
    pub fn actionable(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.action.is_change())
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change.action {
                Action::NoOp => {}
                Action::Create => summary.add += 1,
                Action::Update => summary.change += 1,
                Action::Delete => summary.destroy += 1,
                Action::Replace => {
                    summary.add += 1;
                    summary.destroy += 1;
                }
            }
        }
        summary
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in self.actionable() {
            writeln!(f, "  {} {}", change.action, change.address)?;
        }
        write!(f, "{}", self.summary())
    }
}
