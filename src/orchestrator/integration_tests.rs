// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::*;
use crate::backends::InMemoryProvider;
use crate::config::{OutputConfig, ResourceConfig, StaticConfig};
use crate::engine::{Action, SkipReason, VertexStatus};
use crate::errors::FailureStrategy;
use crate::graph::Lifecycle;
use crate::state::{MemoryStateStore, ResourceObject};
use crate::traits::Provider;
use crate::transform::test_support::mem_registry;
use crate::transform::TargetMode;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn addr(s: &str) -> Address {
    Address::new(s)
}

/// Orchestrator whose "mem" provider is the given shared instance.
fn with_provider(provider: InMemoryProvider) -> (Arc<InMemoryProvider>, Orchestrator) {
    let provider = Arc::new(provider);
    let registry = ProviderRegistry::new().with_instance("mem", provider.clone() as Arc<dyn Provider>);
    (provider, Orchestrator::new(registry))
}

fn recorded(attributes: Value) -> ResourceObject {
    ResourceObject::new(attributes, addr("provider.mem"))
}

/// a <- b, a <- c, {b, c} <- d
fn diamond() -> StaticConfig {
    StaticConfig::new()
        .resource(ResourceConfig::template("mem_x.a", json!({ "name": "a" })))
        .resource(ResourceConfig::template("mem_x.b", json!({ "a": "${mem_x.a.id}" })))
        .resource(ResourceConfig::template("mem_x.c", json!({ "a": "${mem_x.a.id}" })))
        .resource(ResourceConfig::template(
            "mem_x.d",
            json!({ "b": "${mem_x.b.id}", "c": "${mem_x.c.id}" }),
        ))
}

#[tokio::test]
async fn test_cycle_fails_before_any_provider_call() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let config = StaticConfig::new()
        .resource(ResourceConfig::template("mem_x.a", json!({})).depends_on(["mem_x.c"]))
        .resource(ResourceConfig::template("mem_x.b", json!({})).depends_on(["mem_x.a"]))
        .resource(ResourceConfig::template("mem_x.c", json!({})).depends_on(["mem_x.b"]));

    let output = orchestrator
        .apply(&config, &StateDocument::new(), RunOptions::default())
        .await;

    assert_eq!(output.phase, Phase::Failed);
    assert_eq!(output.phase_history, vec![Phase::NotStarted, Phase::Building, Phase::Failed]);
    match &output.error {
        Some(OperationError::Cycle { cycle }) => {
            assert_eq!(cycle, &vec![addr("mem_x.a"), addr("mem_x.b"), addr("mem_x.c")]);
        }
        other => panic!("expected a cycle error, got {:?}", other),
    }
    assert_eq!(output.progress(), Progress::NothingRan);
    assert!(output.diagnostics.first_error().unwrap().summary.contains("Cyclic"));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_diamond_apply() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let output = orchestrator
        .apply(&diamond(), &StateDocument::new(), RunOptions::default())
        .await;

    assert!(output.succeeded(), "{:?}", output.diagnostics);
    assert_eq!(output.progress(), Progress::Complete);

    let applied: Vec<Address> = provider.applied().into_iter().map(|(a, _)| a).collect();
    assert_eq!(applied.first(), Some(&addr("mem_x.a")));
    assert_eq!(applied.last(), Some(&addr("mem_x.d")));

    let state = output.state().unwrap();
    assert_eq!(state.serial, 1);
    assert_eq!(state.len(), 4);
    let d = state.get(&addr("mem_x.d")).unwrap();
    assert_eq!(d.dependencies, vec![addr("mem_x.b"), addr("mem_x.c")]);
    assert_eq!(
        d.attributes,
        json!({ "b": "mem/mem_x.b", "c": "mem/mem_x.c", "id": "mem/mem_x.d" })
    );
}

#[tokio::test]
async fn test_failure_skips_only_dependents() {
    let (_provider, orchestrator) = with_provider(InMemoryProvider::new("mem").failing_apply("mem_x.b"));
    let output = orchestrator
        .apply(&diamond(), &StateDocument::new(), RunOptions::default())
        .await;

    assert_eq!(output.phase, Phase::Completed);
    assert!(!output.succeeded());
    assert_eq!(output.progress(), Progress::Partial);

    let report = output.report.as_ref().unwrap();
    assert_eq!(report.status(&addr("mem_x.b")), Some(&VertexStatus::Failed));
    assert_eq!(report.status(&addr("mem_x.c")), Some(&VertexStatus::Completed));
    assert_eq!(
        report.status(&addr("mem_x.d")),
        Some(&VertexStatus::Skipped(SkipReason::UpstreamFailed {
            upstream: addr("mem_x.b"),
            roots: vec![addr("mem_x.b")],
        }))
    );

    let state = output.state().unwrap();
    assert!(state.get(&addr("mem_x.a")).is_some());
    assert!(state.get(&addr("mem_x.c")).is_some());
    assert!(state.get(&addr("mem_x.d")).is_none());

    let skipped = output
        .diagnostics
        .iter()
        .find(|d| d.address == Some(addr("mem_x.d")))
        .unwrap();
    assert!(skipped.detail.contains("'mem_x.b' failed"));
}

#[tokio::test]
async fn test_concurrent_independent_writes_all_land() {
    let (provider, orchestrator) = with_provider(
        InMemoryProvider::new("mem")
            .concurrency_safe()
            .with_delay(Duration::from_millis(5)),
    );
    let config = (0..20).fold(StaticConfig::new(), |config, i| {
        config.resource(ResourceConfig::template(format!("mem_x.r{}", i), json!({ "n": i })))
    });

    let output = orchestrator
        .apply(&config, &StateDocument::new(), RunOptions::default().with_parallelism(8))
        .await;

    assert!(output.succeeded(), "{:?}", output.diagnostics);
    assert_eq!(output.state().unwrap().len(), 20);
    assert_eq!(provider.objects().len(), 20);
    assert!(provider.max_in_flight() > 1);
}

#[tokio::test]
async fn test_linear_plan_follows_dependency_order() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let config = StaticConfig::new()
        .resource(ResourceConfig::template("mem_x.z", json!({})))
        .resource(ResourceConfig::template("mem_x.y", json!({ "z": "${mem_x.z.id}" })))
        .resource(ResourceConfig::template("mem_x.x", json!({ "y": "${mem_x.y.id}" })))
        .output(OutputConfig::template("output.last", json!("${mem_x.x.id}")));

    let output = orchestrator
        .plan(&config, &StateDocument::new(), RunOptions::default())
        .await;

    let plan = output.plan().unwrap();
    let order: Vec<&str> = plan.changes.iter().map(|c| c.address.as_str()).collect();
    assert_eq!(order, vec!["mem_x.z", "mem_x.y", "mem_x.x"]);
    assert!(plan.changes.iter().all(|c| c.action == Action::Create));
    assert_eq!(plan.outputs.get(&addr("output.last")), Some(&json!("(known after apply)")));
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert!(provider.applied().is_empty());
}

#[tokio::test]
async fn test_plan_summary_line() {
    let (_provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let config = StaticConfig::new()
        .resource(ResourceConfig::template("mem_x.new", json!({})))
        .resource(ResourceConfig::template("mem_x.same", json!({ "size": 1 })))
        .resource(ResourceConfig::template("mem_x.grown", json!({ "size": 2 })));
    let prior = StateDocument::new()
        .with_resource("mem_x.same", recorded(json!({ "size": 1, "id": "s" })))
        .with_resource("mem_x.grown", recorded(json!({ "size": 1, "id": "g" })))
        .with_resource("mem_x.gone", recorded(json!({ "id": "x" })));

    let output = orchestrator.plan(&config, &prior, RunOptions::default()).await;
    let plan = output.plan().unwrap();

    assert_eq!(plan.summary().to_string(), "Plan: 1 to add, 1 to change, 1 to destroy.");
    assert_eq!(plan.change(&addr("mem_x.same")).unwrap().action, Action::NoOp);
    assert_eq!(plan.change(&addr("mem_x.gone")).unwrap().action, Action::Delete);
    assert_eq!(plan.actionable().count(), 3);
}

#[tokio::test]
async fn test_unsafe_provider_calls_are_serialized() {
    let (provider, orchestrator) =
        with_provider(InMemoryProvider::new("mem").with_delay(Duration::from_millis(10)));
    let config = (0..4).fold(StaticConfig::new(), |config, i| {
        config.resource(ResourceConfig::template(format!("mem_x.r{}", i), json!({})))
    });

    let output = orchestrator
        .apply(&config, &StateDocument::new(), RunOptions::default().with_parallelism(4))
        .await;

    assert!(output.succeeded());
    assert_eq!(provider.max_in_flight(), 1);
}

#[tokio::test]
async fn test_concurrency_safe_provider_overlaps_calls() {
    let (provider, orchestrator) = with_provider(
        InMemoryProvider::new("mem")
            .concurrency_safe()
            .with_delay(Duration::from_millis(20)),
    );
    let config = (0..4).fold(StaticConfig::new(), |config, i| {
        config.resource(ResourceConfig::template(format!("mem_x.r{}", i), json!({})))
    });

    orchestrator
        .apply(&config, &StateDocument::new(), RunOptions::default().with_parallelism(4))
        .await;

    assert!(provider.max_in_flight() > 1);
}

#[tokio::test]
async fn test_cancel_before_walk_runs_nothing() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let output = orchestrator
        .apply(&diamond(), &StateDocument::new(), RunOptions::default().with_cancel(cancel))
        .await;

    assert_eq!(output.phase, Phase::Failed);
    assert_eq!(output.error, Some(OperationError::Fatal(FatalError::Cancelled)));
    assert_eq!(output.progress(), Progress::NothingRan);
    assert_eq!(output.diagnostics.first_error().unwrap().summary, "Operation cancelled");
    assert!(provider.calls().is_empty());
    assert!(output.state().unwrap().is_empty());
}

#[tokio::test]
async fn test_deadline_fails_the_operation() {
    let (_provider, orchestrator) =
        with_provider(InMemoryProvider::new("mem").with_delay(Duration::from_millis(100)));
    let timeout = Duration::from_millis(20);

    let output = orchestrator
        .apply(&diamond(), &StateDocument::new(), RunOptions::default().with_timeout(timeout))
        .await;

    assert_eq!(output.phase, Phase::Failed);
    assert_eq!(
        output.error,
        Some(OperationError::Fatal(FatalError::DeadlineExceeded(timeout)))
    );
    let report = output.report.as_ref().unwrap();
    assert_eq!(report.status(&addr("mem_x.d")), Some(&VertexStatus::Skipped(SkipReason::Aborted)));
}

#[tokio::test]
async fn test_fail_fast_halts_remaining_vertices() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem").failing_apply("mem_x.a"));
    let config = StaticConfig::new()
        .resource(ResourceConfig::template("mem_x.a", json!({})))
        .resource(ResourceConfig::template("mem_x.b", json!({})));
    let options = RunOptions::default()
        .with_parallelism(1)
        .with_failure_strategy(FailureStrategy::FailFast);

    let output = orchestrator.apply(&config, &StateDocument::new(), options).await;

    assert_eq!(output.phase, Phase::Completed);
    let report = output.report.as_ref().unwrap();
    assert_eq!(report.status(&addr("mem_x.a")), Some(&VertexStatus::Failed));
    assert_eq!(report.status(&addr("mem_x.b")), Some(&VertexStatus::Skipped(SkipReason::Halted)));
    assert_eq!(provider.applied(), vec![(addr("mem_x.a"), Action::Create)]);
}

#[tokio::test]
async fn test_protocol_failure_is_fatal() {
    let (_provider, orchestrator) =
        with_provider(InMemoryProvider::new("mem").protocol_failure("mem_x.a"));

    let output = orchestrator
        .apply(&diamond(), &StateDocument::new(), RunOptions::default().with_parallelism(1))
        .await;

    assert_eq!(output.phase, Phase::Failed);
    assert!(matches!(output.error, Some(OperationError::Fatal(FatalError::Protocol(_)))));
    assert_eq!(
        output.diagnostics.first_error().unwrap().summary,
        "Provider protocol failure"
    );
    assert!(output.state().unwrap().is_empty());
}

#[tokio::test]
async fn test_prevent_destroy_blocks_replacement_plan() {
    let (_provider, orchestrator) = with_provider(InMemoryProvider::new("mem").replace_on("zone"));
    let config = StaticConfig::new().resource(
        ResourceConfig::template("mem_x.db", json!({ "zone": "b" })).with_lifecycle(Lifecycle {
            prevent_destroy: true,
            ..Lifecycle::default()
        }),
    );
    let prior = StateDocument::new().with_resource("mem_x.db", recorded(json!({ "zone": "a", "id": "db" })));

    let output = orchestrator.plan(&config, &prior, RunOptions::default()).await;

    let error = output.diagnostics.first_error().unwrap();
    assert_eq!(error.summary, "Instance cannot be destroyed");
    assert_eq!(error.address, Some(addr("mem_x.db")));
    assert!(output.plan().unwrap().change(&addr("mem_x.db")).is_none());
}

#[tokio::test]
async fn test_orphans_are_destroyed_dependents_first() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let prior = StateDocument {
        serial: 3,
        ..StateDocument::new()
            .with_resource("mem_x.net", recorded(json!({ "id": "net" })))
            .with_resource(
                "mem_x.app",
                recorded(json!({ "id": "app" })).with_dependencies(vec![addr("mem_x.subnet")]),
            )
            .with_resource(
                "mem_x.subnet",
                recorded(json!({ "id": "subnet" })).with_dependencies(vec![addr("mem_x.net")]),
            )
    };

    let output = orchestrator
        .apply(&StaticConfig::new(), &prior, RunOptions::default().with_parallelism(4))
        .await;

    assert!(output.succeeded(), "{:?}", output.diagnostics);
    assert_eq!(
        provider.applied(),
        vec![
            (addr("mem_x.app"), Action::Delete),
            (addr("mem_x.subnet"), Action::Delete),
            (addr("mem_x.net"), Action::Delete),
        ]
    );
    let state = output.state().unwrap();
    assert!(state.is_empty());
    assert_eq!(state.serial, 4);
}

#[tokio::test]
async fn test_orphan_is_destroyed_before_replaced_dependency() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let config = StaticConfig::new().resource(ResourceConfig::template("mem_x.base", json!({ "size": 1 })));
    let prior = StateDocument::new()
        .with_resource("mem_x.base", recorded(json!({ "size": 1, "id": "base" })).tainted())
        .with_resource(
            "mem_x.old",
            recorded(json!({ "id": "old" })).with_dependencies(vec![addr("mem_x.base")]),
        );

    let output = orchestrator
        .apply(&config, &prior, RunOptions::default().with_parallelism(1))
        .await;

    assert!(output.succeeded(), "{:?}", output.diagnostics);
    assert_eq!(
        provider.applied(),
        vec![
            (addr("mem_x.old"), Action::Delete),
            (addr("mem_x.base"), Action::Delete),
            (addr("mem_x.base"), Action::Create),
        ]
    );
    let state = output.state().unwrap();
    assert!(state.get(&addr("mem_x.old")).is_none());
    assert!(!state.get(&addr("mem_x.base")).unwrap().is_tainted());
}

#[tokio::test]
async fn test_tainted_object_is_replaced_by_next_apply() {
    let config = StaticConfig::new().resource(ResourceConfig::template("mem_x.vm", json!({ "size": 1 })));

    let (_provider, first) = with_provider(InMemoryProvider::new("mem").tainting_apply("mem_x.vm"));
    let output = first
        .apply(&config, &StateDocument::new(), RunOptions::default())
        .await;
    assert!(output.diagnostics.has_errors());
    let tainted = output.state().unwrap().clone();
    assert!(tainted.get(&addr("mem_x.vm")).unwrap().is_tainted());

    let (provider, second) = with_provider(InMemoryProvider::new("mem"));
    let plan = second.plan(&config, &tainted, RunOptions::default()).await;
    assert_eq!(
        plan.plan().unwrap().change(&addr("mem_x.vm")).unwrap().action,
        Action::Replace
    );

    let output = second.apply(&config, &tainted, RunOptions::default()).await;
    assert!(output.succeeded(), "{:?}", output.diagnostics);
    assert_eq!(
        provider.applied(),
        vec![(addr("mem_x.vm"), Action::Delete), (addr("mem_x.vm"), Action::Create)]
    );
    assert!(!output.state().unwrap().get(&addr("mem_x.vm")).unwrap().is_tainted());
}

#[tokio::test]
async fn test_refresh_notices_object_deleted_outside() {
    let (_provider, orchestrator) = with_provider(InMemoryProvider::new("mem").deleted_outside("mem_x.vm"));
    let config = StaticConfig::new().resource(ResourceConfig::template("mem_x.vm", json!({ "size": 1 })));
    let prior = StateDocument::new().with_resource("mem_x.vm", recorded(json!({ "size": 1, "id": "vm" })));

    let stale = orchestrator.plan(&config, &prior, RunOptions::default()).await;
    assert_eq!(
        stale.plan().unwrap().change(&addr("mem_x.vm")).unwrap().action,
        Action::NoOp
    );

    let refreshed = orchestrator
        .plan(&config, &prior, RunOptions::default().with_refresh(true))
        .await;
    assert_eq!(
        refreshed.plan().unwrap().change(&addr("mem_x.vm")).unwrap().action,
        Action::Create
    );
    let warning = refreshed.diagnostics.warnings().next().unwrap();
    assert_eq!(warning.summary, "Object no longer exists");
}

#[tokio::test]
async fn test_targets_limit_the_plan_silently() {
    let (_provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let config = StaticConfig::new()
        .resource(ResourceConfig::template("mem_x.a", json!({})))
        .resource(ResourceConfig::template("mem_x.b", json!({})))
        .resource(ResourceConfig::template("mem_x.c", json!({ "a": "${mem_x.a.id}" })));

    let output = orchestrator
        .plan(&config, &StateDocument::new(), RunOptions::default().with_targets(["mem_x.c"]))
        .await;

    assert!(output.succeeded());
    let planned: Vec<&str> = output.plan().unwrap().changes.iter().map(|c| c.address.as_str()).collect();
    assert_eq!(planned, vec!["mem_x.a", "mem_x.c"]);
    assert!(output.diagnostics.is_empty());

    let dependents = orchestrator
        .plan(
            &config,
            &StateDocument::new(),
            RunOptions::default()
                .with_targets(["mem_x.a"])
                .with_target_mode(TargetMode::WithDependents),
        )
        .await;
    assert!(dependents.plan().unwrap().change(&addr("mem_x.b")).is_none());
    assert!(dependents.plan().unwrap().change(&addr("mem_x.c")).is_some());
}

#[tokio::test]
async fn test_failed_target_leaves_untargeted_dependents_unreported() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem").failing_apply("mem_x.a"));
    let config = StaticConfig::new()
        .resource(ResourceConfig::template("mem_x.a", json!({})))
        .resource(ResourceConfig::template("mem_x.b", json!({ "a": "${mem_x.a.id}" })))
        .resource(ResourceConfig::template("mem_x.c", json!({ "a": "${mem_x.a.id}" })));

    let output = orchestrator
        .apply(
            &config,
            &StateDocument::new(),
            RunOptions::default().with_targets(["mem_x.a", "mem_x.c"]),
        )
        .await;

    assert_eq!(output.phase, Phase::Completed);
    let report = output.report.as_ref().unwrap();
    assert_eq!(report.status(&addr("mem_x.a")), Some(&VertexStatus::Failed));
    assert_eq!(
        report.status(&addr("mem_x.c")),
        Some(&VertexStatus::Skipped(SkipReason::UpstreamFailed {
            upstream: addr("mem_x.a"),
            roots: vec![addr("mem_x.a")],
        }))
    );
    assert_eq!(report.status(&addr("mem_x.b")), None);
    assert!(output.diagnostics.iter().all(|d| d.address != Some(addr("mem_x.b"))));
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.address == Some(addr("mem_x.c")) && d.summary == "Vertex skipped"));
    assert!(provider.calls().iter().all(|c| c.address != Some(addr("mem_x.b"))));
}

#[tokio::test]
async fn test_unknown_target_fails_construction() {
    let (_provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let output = orchestrator
        .plan(&diamond(), &StateDocument::new(), RunOptions::default().with_targets(["mem_x.nope"]))
        .await;

    assert_eq!(output.phase, Phase::Failed);
    assert!(matches!(output.error, Some(OperationError::Construction(_))));
    assert!(output.report.is_none());
}

#[tokio::test]
async fn test_store_round_trip_bumps_serial_only_on_change() {
    let store = MemoryStateStore::new();
    let orchestrator = Orchestrator::new(mem_registry());

    let first = orchestrator
        .run_with_store(OperationKind::Apply, &diamond(), &store, RunOptions::default())
        .await;
    assert!(first.succeeded(), "{:?}", first.diagnostics);
    let saved = store.snapshot().unwrap();
    assert_eq!(saved.serial, 1);
    assert_eq!(saved.len(), 4);

    let second = orchestrator
        .run_with_store(OperationKind::Apply, &diamond(), &store, RunOptions::default())
        .await;
    assert!(second.succeeded(), "{:?}", second.diagnostics);
    assert_eq!(store.snapshot().unwrap().serial, 1);

    let plan = orchestrator
        .run_with_store(OperationKind::Plan, &diamond(), &store, RunOptions::default())
        .await;
    assert!(!plan.plan().unwrap().has_changes());
}

#[tokio::test]
async fn test_plan_reads_seeded_store() {
    let seeded = StateDocument::new().with_resource("mem_x.gone", recorded(json!({ "id": "gone" })));
    let store = MemoryStateStore::with_document(seeded.clone());
    let orchestrator = Orchestrator::new(mem_registry());

    let output = orchestrator
        .run_with_store(OperationKind::Plan, &StaticConfig::new(), &store, RunOptions::default())
        .await;

    assert_eq!(
        output.plan().unwrap().change(&addr("mem_x.gone")).unwrap().action,
        Action::Delete
    );
    assert_eq!(store.snapshot(), Some(seeded));
}

#[tokio::test]
async fn test_rejected_provider_config_skips_its_resources() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem").rejecting_config());
    let output = orchestrator
        .apply(&diamond(), &StateDocument::new(), RunOptions::default())
        .await;

    assert_eq!(output.phase, Phase::Completed);
    let report = output.report.as_ref().unwrap();
    assert_eq!(report.status(&addr("provider.mem")), Some(&VertexStatus::Failed));
    assert_eq!(report.failed(), 1);
    assert_eq!(
        report.status(&addr("mem_x.d")),
        Some(&VertexStatus::Skipped(SkipReason::UpstreamFailed {
            upstream: addr("provider.mem"),
            roots: vec![addr("provider.mem")],
        }))
    );
    assert_eq!(
        output.diagnostics.first_error().unwrap().summary,
        "Invalid provider configuration"
    );
    assert!(provider.applied().is_empty());
}

#[tokio::test]
async fn test_json_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = crate::state::JsonFileStateStore::new(dir.path().join("state.json"));
    let orchestrator = Orchestrator::new(mem_registry());

    let applied = orchestrator
        .run_with_store(OperationKind::Apply, &diamond(), &store, RunOptions::default())
        .await;
    assert!(applied.succeeded(), "{:?}", applied.diagnostics);

    let loaded = store.load().await.unwrap();
    assert_eq!(&loaded, applied.state().unwrap());
}

#[tokio::test]
async fn test_unavailable_store_fails_without_building() {
    let orchestrator = Orchestrator::new(mem_registry());
    let output = orchestrator
        .run_with_store(
            OperationKind::Apply,
            &diamond(),
            &MemoryStateStore::unavailable(),
            RunOptions::default(),
        )
        .await;

    assert_eq!(output.phase, Phase::Failed);
    assert_eq!(output.phase_history, vec![Phase::NotStarted, Phase::Failed]);
    assert!(matches!(output.error, Some(OperationError::Fatal(FatalError::StateStore(_)))));
    assert_eq!(output.diagnostics.first_error().unwrap().summary, "State store failure");
}

#[tokio::test]
async fn test_validate_touches_no_provider() {
    let (provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let output = orchestrator.validate(&diamond(), RunOptions::default()).await;

    assert!(output.succeeded(), "{:?}", output.diagnostics);
    let plan = output.plan().unwrap();
    assert!(plan.changes.is_empty());
    assert!(!plan.has_changes());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_validate_returns_root_outputs() {
    let (_provider, orchestrator) = with_provider(InMemoryProvider::new("mem"));
    let config = diamond().output(OutputConfig::template("output.name", json!("${mem_x.a.name}")));

    let output = orchestrator.validate(&config, RunOptions::default()).await;

    assert_eq!(
        output.plan().unwrap().outputs.get(&addr("output.name")),
        Some(&json!("a"))
    );
}

/// Random DAG over `n` resources plus the resources whose apply fails. An
/// edge (i, j) with i < j makes j reference i.
fn random_dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<bool>)> {
    (2usize..8).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, 0..n), 0..n * 2),
            prop::collection::vec(prop::bool::weighted(0.25), n),
        )
    })
}

fn dag_config(n: usize, edges: &[(usize, usize)]) -> StaticConfig {
    (0..n).fold(StaticConfig::new(), |config, j| {
        let mut attributes = serde_json::Map::new();
        attributes.insert("index".to_string(), json!(j));
        for &(a, b) in edges {
            let (from, to) = (a.min(b), a.max(b));
            if to == j && from != to {
                attributes.insert(format!("dep_{}", from), json!(format!("${{mem_x.r{}.id}}", from)));
            }
        }
        config.resource(ResourceConfig::template(format!("mem_x.r{}", j), Value::Object(attributes)))
    })
}

/// Registry whose providers reject applying the given addresses.
fn failing_registry(failing: Vec<Address>) -> ProviderRegistry {
    ProviderRegistry::new().with("mem", move |address: &Address| {
        let provider = failing
            .iter()
            .cloned()
            .fold(InMemoryProvider::new(address.as_str()), |p, a| p.failing_apply(a));
        Arc::new(provider) as Arc<dyn Provider>
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_parallelism_does_not_change_results((n, edges, fails) in random_dag()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let config = dag_config(n, &edges);
        let failing: Vec<Address> = fails
            .iter()
            .enumerate()
            .filter(|(_, fail)| **fail)
            .map(|(i, _)| Address::new(format!("mem_x.r{}", i)))
            .collect();

        let outcome = |parallelism: usize| {
            let orchestrator = Orchestrator::new(failing_registry(failing.clone()));
            let options = || RunOptions::default().with_parallelism(parallelism);
            runtime.block_on(async {
                let plan = orchestrator.plan(&config, &StateDocument::new(), options()).await;
                let apply = orchestrator.apply(&config, &StateDocument::new(), options()).await;
                let statuses = apply.report.as_ref().map(|report| report.statuses.clone());
                (plan.plan().cloned(), apply.state().cloned(), statuses)
            })
        };

        let (serial_plan, serial_state, serial_statuses) = outcome(1);
        let (parallel_plan, parallel_state, parallel_statuses) = outcome(6);
        prop_assert!(serial_plan.is_some());
        prop_assert!(serial_statuses.is_some());
        prop_assert_eq!(serial_plan, parallel_plan);
        prop_assert_eq!(serial_state, parallel_state);
        prop_assert_eq!(serial_statuses, parallel_statuses);
    }
}
