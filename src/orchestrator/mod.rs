// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Operation driver: build, validate, walk, report.
//!
//! Every operation follows the same sequence:
//!
//! 1. **Build**: the transformer pipeline for the operation assembles a fresh
//!    graph from configuration and prior state
//! 2. **Validate**: any dependency cycle fails the operation before a single
//!    vertex is evaluated
//! 3. **Walk**: the concurrent walker evaluates every vertex with the
//!    operation's evaluator
//! 4. **Report**: diagnostics are ordered by graph position; plan and
//!    validate return a [`Plan`], apply returns the new [`StateDocument`]
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use terrawalk::backends::InMemoryProvider;
//! use terrawalk::config::{ProviderRegistry, ResourceConfig, StaticConfig};
//! use terrawalk::orchestrator::{Orchestrator, Phase, RunOptions};
//! use terrawalk::state::StateDocument;
//! use terrawalk::traits::Provider;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = ProviderRegistry::new().with_instance(
//!     "mem",
//!     Arc::new(InMemoryProvider::new("mem")) as Arc<dyn Provider>,
//! );
//! let config = StaticConfig::new()
//!     .resource(ResourceConfig::template("mem_network.main", json!({ "cidr": "10.0.0.0/16" })))
//!     .resource(ResourceConfig::template(
//!         "mem_subnet.a",
//!         json!({ "network": "${mem_network.main.id}" }),
//!     ));
//!
//! let orchestrator = Orchestrator::new(registry);
//! let output = orchestrator
//!     .plan(&config, &StateDocument::new(), RunOptions::default())
//!     .await;
//!
//! assert_eq!(output.phase, Phase::Completed);
//! assert_eq!(
//!     output.plan().unwrap().summary().to_string(),
//!     "Plan: 2 to add, 0 to change, 0 to destroy."
//! );
//! # }
//! ```

mod options;
mod phase;

#[cfg(test)]
mod integration_tests;

pub use options::RunOptions;
pub use phase::{Phase, PhaseMachine};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ConfigTree, ProviderRegistry};
use crate::diagnostics::{Diagnostic, Diagnostics, DiagnosticsAggregator};
use crate::engine::{evaluator_for, Plan, WalkContext, WalkReport, Walker};
use crate::errors::{FatalError, GraphError, OperationError};
use crate::graph::Address;
use crate::observability::messages::graph::CycleDetected;
use crate::observability::messages::orchestrator::{
    OperationFinished, OperationStarted, StateSaved, StateStoreFailed,
};
use crate::observability::messages::StructuredLog;
use crate::state::{StateDocument, StateStore, SyncState};
use crate::transform::{BuildInput, TransformPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Plan,
    Apply,
    Validate,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Plan => "plan",
            OperationKind::Apply => "apply",
            OperationKind::Validate => "validate",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    Plan(Plan),
    Apply(StateDocument),
}

/// How much of the graph an operation got through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    NothingRan,
    Partial,
    Complete,
}

/// Everything an operation produced.
#[derive(Debug)]
pub struct RunOutput {
    pub operation: OperationKind,
    pub phase: Phase,
    pub phase_history: Vec<Phase>,
    /// `None` for a plan or validate that did not finish.
    pub result: Option<OperationResult>,
    pub diagnostics: Diagnostics,
    /// `None` if the operation failed before the walk.
    pub report: Option<WalkReport>,
    pub error: Option<OperationError>,
}

impl RunOutput {
    pub fn progress(&self) -> Progress {
        match &self.report {
            None => Progress::NothingRan,
            Some(report) if report.is_complete() => Progress::Complete,
            Some(report) if !report.anything_ran() => Progress::NothingRan,
            Some(_) => Progress::Partial,
        }
    }

    pub fn plan(&self) -> Option<&Plan> {
        match &self.result {
            Some(OperationResult::Plan(plan)) => Some(plan),
            _ => None,
        }
    }

    pub fn state(&self) -> Option<&StateDocument> {
        match &self.result {
            Some(OperationResult::Apply(state)) => Some(state),
            _ => None,
        }
    }

    /// Completed without a single error diagnostic.
    pub fn succeeded(&self) -> bool {
        self.phase == Phase::Completed && !self.diagnostics.has_errors()
    }
}

/// Mutable bookkeeping of one operation.
struct Run {
    machine: PhaseMachine,
    diagnostics: Diagnostics,
    report: Option<WalkReport>,
    result: Option<OperationResult>,
}

pub struct Orchestrator {
    providers: ProviderRegistry,
}

impl Orchestrator {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }

    pub async fn plan(
        &self,
        config: &dyn ConfigTree,
        prior_state: &StateDocument,
        options: RunOptions,
    ) -> RunOutput {
        self.run(OperationKind::Plan, config, prior_state, options).await
    }

    pub async fn apply(
        &self,
        config: &dyn ConfigTree,
        prior_state: &StateDocument,
        options: RunOptions,
    ) -> RunOutput {
        self.run(OperationKind::Apply, config, prior_state, options).await
    }

    /// Checks configuration and references. Never touches state or providers.
    ///
    /// The returned [`Plan`] carries no changes, only root output values.
    pub async fn validate(&self, config: &dyn ConfigTree, options: RunOptions) -> RunOutput {
        self.run(OperationKind::Validate, config, &StateDocument::new(), options)
            .await
    }

    pub async fn run(
        &self,
        operation: OperationKind,
        config: &dyn ConfigTree,
        prior_state: &StateDocument,
        options: RunOptions,
    ) -> RunOutput {
        let prior = match operation {
            OperationKind::Validate => StateDocument::new(),
            OperationKind::Plan | OperationKind::Apply => prior_state.clone(),
        };
        self.execute(operation, config, prior, options, None).await
    }

    /// Like [`Orchestrator::run`], with prior state loaded from `store` and,
    /// for apply, the new state saved back to it. State is saved even when a
    /// fatal error ended the walk, so completed effects are never lost.
    pub async fn run_with_store(
        &self,
        operation: OperationKind,
        config: &dyn ConfigTree,
        store: &dyn StateStore,
        options: RunOptions,
    ) -> RunOutput {
        if operation == OperationKind::Validate {
            return self
                .execute(operation, config, StateDocument::new(), options, None)
                .await;
        }
        match store.load().await {
            Ok(prior) => self.execute(operation, config, prior, options, Some(store)).await,
            Err(err) => {
                StateStoreFailed {
                    action: "load",
                    error: &err,
                }
                .log();
                let started = Instant::now();
                let mut run = Run::new(operation);
                let fatal = FatalError::StateStore(err.to_string());
                run.diagnostics.push(fatal.to_diagnostic());
                self.finish(operation, run, Err(fatal.into()), started)
            }
        }
    }

    async fn execute(
        &self,
        operation: OperationKind,
        config: &dyn ConfigTree,
        prior: StateDocument,
        options: RunOptions,
        store: Option<&dyn StateStore>,
    ) -> RunOutput {
        let started = Instant::now();
        OperationStarted {
            operation: operation.as_str(),
            parallelism: options.parallelism,
            target_count: options.targets.len(),
        }
        .log();

        let mut run = Run::new(operation);
        let outcome = self
            .drive(&mut run, operation, config, prior, &options, store)
            .await;
        self.finish(operation, run, outcome, started)
    }

    async fn drive(
        &self,
        run: &mut Run,
        operation: OperationKind,
        config: &dyn ConfigTree,
        prior: StateDocument,
        options: &RunOptions,
        store: Option<&dyn StateStore>,
    ) -> Result<(), OperationError> {
        // === BUILD ===
        run.machine.transition(Phase::Building)?;
        let input = BuildInput {
            config,
            prior_state: &prior,
            providers: &self.providers,
            operation,
            targets: &options.targets,
            target_mode: options.target_mode,
        };
        let graph = match TransformPipeline::for_operation(operation).build(&input) {
            Ok(graph) => graph,
            Err(err) => {
                run.diagnostics
                    .push(Diagnostic::error("Graph construction failed", err.to_string()));
                return Err(err.into());
            }
        };

        let cycles = graph.cycles();
        if let Some(first) = cycles.first() {
            for cycle in &cycles {
                CycleDetected { cycle }.log();
                let err = GraphError::Cycle { cycle: cycle.clone() };
                run.diagnostics
                    .push(Diagnostic::error("Cyclic dependency", err.to_string()));
            }
            return Err(OperationError::Cycle { cycle: first.clone() });
        }

        // === WALK ===
        run.machine.transition(Phase::Walking)?;
        let state = Arc::new(SyncState::new(prior.clone()));
        let aggregator = Arc::new(DiagnosticsAggregator::new());
        let ctx = Arc::new(
            WalkContext::new(operation, state.clone())
                .with_cancel(options.cancel.clone())
                .with_diagnostics(aggregator.clone())
                .with_refresh(options.refresh)
                .with_deadline(options.timeout),
        );
        let walker = Walker::new(options.parallelism).with_failure_strategy(options.failure_strategy);
        let report = walker
            .walk(Arc::new(graph), evaluator_for(operation), ctx)
            .await;

        // === REPORT ===
        let mut fatal = report.fatal.clone();
        if let Some(fatal) = &fatal {
            run.diagnostics.push(fatal.to_diagnostic());
        }
        run.diagnostics.extend(aggregator.finish(&report.positions));

        match operation {
            OperationKind::Plan | OperationKind::Validate if fatal.is_none() => {
                run.result = Some(OperationResult::Plan(Plan {
                    changes: report.changes(),
                    outputs: root_outputs(&report),
                }));
            }
            OperationKind::Apply => {
                let mut next = state.current();
                if next.resources != prior.resources {
                    next.serial += 1;
                }
                if let Some(store) = store {
                    match store.save(&next).await {
                        Ok(()) => StateSaved {
                            serial: next.serial,
                            resource_count: next.len(),
                        }
                        .log(),
                        Err(err) => {
                            StateStoreFailed {
                                action: "save",
                                error: &err,
                            }
                            .log();
                            let failure = FatalError::StateStore(err.to_string());
                            run.diagnostics.push(failure.to_diagnostic());
                            if fatal.is_none() {
                                fatal = Some(failure);
                            }
                        }
                    }
                }
                run.result = Some(OperationResult::Apply(next));
            }
            OperationKind::Plan | OperationKind::Validate => {}
        }
        run.report = Some(report);

        if let Some(fatal) = fatal {
            return Err(fatal.into());
        }
        run.machine.transition(Phase::Completed)
    }

    fn finish(
        &self,
        operation: OperationKind,
        mut run: Run,
        outcome: Result<(), OperationError>,
        started: Instant,
    ) -> RunOutput {
        let error = outcome.err();
        if error.is_some() {
            run.machine.fail();
        }
        let phase = run.machine.current();
        OperationFinished {
            operation: operation.as_str(),
            phase: phase.as_str(),
            error_count: run.diagnostics.errors().count(),
            warning_count: run.diagnostics.warnings().count(),
            duration: started.elapsed(),
        }
        .log();
        RunOutput {
            operation,
            phase,
            phase_history: run.machine.into_history(),
            result: run.result,
            diagnostics: run.diagnostics,
            report: run.report,
            error,
        }
    }
}

impl Run {
    fn new(operation: OperationKind) -> Self {
        Self {
            machine: PhaseMachine::new(operation),
            diagnostics: Diagnostics::new(),
            report: None,
            result: None,
        }
    }
}

/// Output values declared in the root module.
fn root_outputs(report: &WalkReport) -> BTreeMap<Address, serde_json::Value> {
    report
        .outputs
        .iter()
        .filter(|(address, _)| address.is_output() && address.module_path().is_none())
        .map(|(address, output)| (address.clone(), output.value.clone()))
        .collect()
}
