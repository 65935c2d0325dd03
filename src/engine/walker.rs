// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrent, dependency-respecting walk of a validated graph.
//!
//! The walker combines **dependency counting** with a **ready queue**:
//! - Every vertex starts with a count of unfinished direct predecessors
//! - Vertices whose count reaches zero wait in the [`ReadyQueue`] ordered by
//!   topological position
//! - At most `parallelism` evaluations are in flight at any time
//!
//! # Value flow
//!
//! A finished vertex's value is stored in a map owned by the walk loop and
//! nowhere else. When a vertex is dispatched it receives a [`Scope`] holding
//! the values of its direct predecessors only; it never sees values from
//! elsewhere in the graph.
//!
//! ```text
//!     provider.mem
//!      /        \
//!   mem_x.b    mem_x.c      (run concurrently)
//!      \        /
//!       mem_x.d             (scope = { mem_x.b, mem_x.c })
//! ```
//!
//! # Failures
//!
//! A failed vertex never releases its dependents. Once all of a dependent's
//! predecessors have finished it is marked skipped, citing the failed root
//! earliest in graph order, and its own dependents are skipped the same way.
//! Vertices that do not depend on the failure keep running unless the
//! failure strategy is [`FailureStrategy::FailFast`], which stops dispatch.
//!
//! A fatal error (cancellation, deadline, provider protocol failure) stops
//! dispatch as well. In-flight vertices are allowed to finish and their
//! results are kept.
//!
//! # Execution flow
//!
//! 1. **Setup**: topological positions and dependency counts
//! 2. **Dispatch**: pop ready vertices while slots are free
//! 3. **Wait**: first of cancellation or any in-flight completion
//! 4. **Release**: decrement dependents, queue or skip them
//! 5. **Report**: leftovers are marked halted or aborted

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinSet};

use super::ready_queue::{ReadyQueue, ReadyVertex};
use super::report::{SkipReason, VertexStatus, WalkReport};
use super::{VertexEvaluator, VertexOutput, WalkContext};
use crate::config::Scope;
use crate::diagnostics::Diagnostic;
use crate::errors::{FailureStrategy, FatalError, VertexError};
use crate::graph::{Address, Graph};
use crate::observability::messages::walk::{
    VertexCompleted, VertexFailed, VertexSkipped, VertexStarted, WalkAborted, WalkCompleted,
    WalkStarted,
};
use crate::observability::messages::StructuredLog;

type TaskResult = (Address, Result<VertexOutput, VertexError>);

#[derive(Debug, Clone, Copy)]
pub struct Walker {
    parallelism: usize,
    failure_strategy: FailureStrategy,
}

impl Walker {
    /// A walker running at most `parallelism` evaluations at once.
    /// Clamped to a minimum of 1.
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
            failure_strategy: FailureStrategy::default(),
        }
    }

    pub fn with_failure_strategy(mut self, failure_strategy: FailureStrategy) -> Self {
        self.failure_strategy = failure_strategy;
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Walks every vertex of `graph`, evaluating each with `evaluator`.
    ///
    /// The graph must already be validated. A graph that still contains a
    /// cycle yields a report with an internal fatal error and nothing run.
    pub async fn walk(
        &self,
        graph: Arc<Graph>,
        evaluator: Arc<dyn VertexEvaluator>,
        ctx: Arc<WalkContext>,
    ) -> WalkReport {
        let started_at = Instant::now();
        let operation = ctx.operation.as_str();

        // === PHASE 1: SETUP ===
        let positions = match graph.positions() {
            Ok(positions) => positions,
            Err(err) => {
                let fatal = FatalError::Internal(err.to_string());
                WalkAborted {
                    reason: &fatal,
                    in_flight: 0,
                }
                .log();
                return WalkReport {
                    fatal: Some(fatal),
                    duration: started_at.elapsed(),
                    ..WalkReport::default()
                };
            }
        };

        WalkStarted {
            operation,
            vertex_count: graph.len(),
            parallelism: self.parallelism,
        }
        .log();

        let mut walk = WalkState::new(&graph, positions);
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let timer = ctx.arm_deadline();

        loop {
            if walk.report.fatal.is_none() && ctx.cancel.is_cancelled() {
                walk.abort(ctx.cancellation_reason(), tasks.len());
            }

            // === PHASE 2: DISPATCH ===
            while walk.admitting() && tasks.len() < self.parallelism {
                let Some(address) = walk.ready.pop() else {
                    break;
                };
                let scope = walk.scope_for(&graph, &address, ctx.allows_unknown());
                walk.report.started.push(address.clone());
                VertexStarted {
                    address: &address,
                    in_flight: tasks.len() + 1,
                }
                .log();
                tasks.spawn(evaluate(
                    address,
                    scope,
                    graph.clone(),
                    evaluator.clone(),
                    ctx.clone(),
                ));
            }

            if tasks.is_empty() {
                break;
            }

            // === PHASE 3: WAIT ===
            let joined = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled(), if walk.report.fatal.is_none() => {
                    walk.abort(ctx.cancellation_reason(), tasks.len());
                    continue;
                }
                joined = tasks.join_next() => joined,
            };

            // === PHASE 4: RELEASE ===
            match joined {
                Some(Ok((address, Ok(output)))) => {
                    VertexCompleted { address: &address }.log();
                    walk.complete(address.clone(), output);
                    walk.release(&graph, &address, &ctx);
                }
                Some(Ok((address, Err(err)))) => {
                    VertexFailed {
                        address: &address,
                        error: &err,
                    }
                    .log();
                    ctx.diagnostics.append_all(err.to_diagnostics(&address));
                    if let Some(fatal) = err.fatal() {
                        walk.abort(fatal, tasks.len());
                    }
                    if self.failure_strategy == FailureStrategy::FailFast {
                        walk.halted = true;
                    }
                    walk.fail(address.clone());
                    walk.release(&graph, &address, &ctx);
                }
                Some(Err(err)) => {
                    // Only reachable if the wrapper task itself is torn down.
                    walk.abort(FatalError::Internal(err.to_string()), tasks.len());
                }
                None => break,
            }
        }

        if let Some(timer) = timer {
            timer.abort();
        }

        // === PHASE 5: REPORT ===
        walk.mark_leftovers(&graph, &ctx);
        let mut report = walk.report;
        report.duration = started_at.elapsed();
        WalkCompleted {
            operation,
            completed: report.completed(),
            failed: report.failed(),
            skipped: report.skipped(),
            duration: report.duration,
        }
        .log();
        report
    }
}

/// Runs one evaluation in its own task so a panic is contained and reported
/// against the vertex.
async fn evaluate(
    address: Address,
    scope: Scope,
    graph: Arc<Graph>,
    evaluator: Arc<dyn VertexEvaluator>,
    ctx: Arc<WalkContext>,
) -> TaskResult {
    let target = address.clone();
    let handle = tokio::spawn(async move {
        match graph.vertex(&target) {
            Some(vertex) => evaluator.evaluate(vertex, &scope, &ctx).await,
            None => Err(VertexError::Internal(format!(
                "vertex '{}' is not part of the graph",
                target
            ))),
        }
    });
    let result = match handle.await {
        Ok(result) => result,
        Err(err) => Err(VertexError::Panicked(panic_message(err))),
    };
    (address, result)
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Bookkeeping owned by the walk loop.
struct WalkState {
    pending: HashMap<Address, usize>,
    ready: ReadyQueue,
    values: HashMap<Address, Value>,
    /// Failed roots upstream of every failed or skipped vertex.
    failed_roots: HashMap<Address, BTreeSet<Address>>,
    halted: bool,
    report: WalkReport,
}

impl WalkState {
    fn new(graph: &Graph, positions: HashMap<Address, usize>) -> Self {
        let pending: HashMap<Address, usize> = graph
            .addresses()
            .into_iter()
            .map(|address| {
                let count = graph.predecessors(&address).len();
                (address, count)
            })
            .collect();

        let mut ready = ReadyQueue::new();
        ready.extend(
            pending
                .iter()
                .filter(|&(_, &count)| count == 0)
                .map(|(address, _)| ReadyVertex::new(address.clone(), position(&positions, address))),
        );

        Self {
            pending,
            ready,
            values: HashMap::new(),
            failed_roots: HashMap::new(),
            halted: false,
            report: WalkReport {
                positions,
                ..WalkReport::default()
            },
        }
    }

    fn admitting(&self) -> bool {
        !self.halted && self.report.fatal.is_none()
    }

    fn scope_for(&self, graph: &Graph, address: &Address, allow_unknown: bool) -> Scope {
        let mut scope = Scope::new().with_unknowns(allow_unknown);
        for predecessor in graph.predecessors(address) {
            if let Some(value) = self.values.get(&predecessor) {
                scope.insert(predecessor, value.clone());
            }
        }
        scope
    }

    fn abort(&mut self, fatal: FatalError, in_flight: usize) {
        if self.report.fatal.is_some() {
            return;
        }
        WalkAborted {
            reason: &fatal,
            in_flight,
        }
        .log();
        self.report.fatal = Some(fatal);
    }

    fn complete(&mut self, address: Address, output: VertexOutput) {
        self.values.insert(address.clone(), output.value.clone());
        self.report.statuses.insert(address.clone(), VertexStatus::Completed);
        self.report.outputs.insert(address, output);
    }

    fn fail(&mut self, address: Address) {
        self.report.statuses.insert(address.clone(), VertexStatus::Failed);
        self.failed_roots.insert(address.clone(), BTreeSet::from([address]));
    }

    /// Decrements the dependents of a finished vertex. Dependents whose last
    /// predecessor just finished are queued, or skipped if any predecessor
    /// failed or was skipped; skips cascade.
    fn release(&mut self, graph: &Graph, finished: &Address, ctx: &WalkContext) {
        let mut worklist = vec![finished.clone()];
        while let Some(done) = worklist.pop() {
            for next in graph.successors(&done) {
                let Some(count) = self.pending.get_mut(&next) else {
                    continue;
                };
                *count = count.saturating_sub(1);
                if *count > 0 {
                    continue;
                }

                let roots: BTreeSet<Address> = graph
                    .predecessors(&next)
                    .iter()
                    .filter_map(|p| self.failed_roots.get(p))
                    .flatten()
                    .cloned()
                    .collect();

                if roots.is_empty() {
                    let at = position(&self.report.positions, &next);
                    self.ready.push(ReadyVertex::new(next, at));
                    continue;
                }

                let mut ordered: Vec<Address> = roots.iter().cloned().collect();
                ordered.sort_by_key(|root| (position(&self.report.positions, root), root.clone()));
                let upstream = ordered[0].clone();

                VertexSkipped {
                    address: &next,
                    upstream: &upstream,
                }
                .log();
                ctx.diagnostics.append(
                    Diagnostic::warning(
                        "Vertex skipped",
                        format!("'{}' was not evaluated because '{}' failed", next, upstream),
                    )
                    .with_address(next.clone()),
                );
                self.report.statuses.insert(
                    next.clone(),
                    VertexStatus::Skipped(SkipReason::UpstreamFailed {
                        upstream,
                        roots: ordered,
                    }),
                );
                self.failed_roots.insert(next.clone(), roots);
                worklist.push(next);
            }
        }
    }

    /// Everything never dispatched after dispatch stopped.
    fn mark_leftovers(&mut self, graph: &Graph, ctx: &WalkContext) {
        let (reason, detail) = if self.report.fatal.is_some() {
            (SkipReason::Aborted, "the operation was aborted")
        } else {
            (SkipReason::Halted, "an earlier failure stopped the walk")
        };
        for address in graph.addresses() {
            if self.report.statuses.contains_key(&address) {
                continue;
            }
            ctx.diagnostics.append(
                Diagnostic::warning(
                    "Vertex not evaluated",
                    format!("'{}' was not evaluated because {}", address, detail),
                )
                .with_address(address.clone()),
            );
            self.report
                .statuses
                .insert(address, VertexStatus::Skipped(reason.clone()));
        }
        self.ready.drain();
    }
}

fn position(positions: &HashMap<Address, usize>, address: &Address) -> usize {
    positions.get(address).copied().unwrap_or(usize::MAX)
}
