// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use terrawalk::backends::InMemoryProvider;
use terrawalk::config::{load_engine_config, EngineConfig, ProviderRegistry, Workspace};
use terrawalk::graph::Address;
use terrawalk::orchestrator::{OperationKind, Orchestrator, Progress, RunOutput};
use terrawalk::state::JsonFileStateStore;
use terrawalk::traits::Provider;

const DEFAULT_STATE_FILE: &str = "terrawalk.state.json";

struct Args {
    operation: OperationKind,
    workspace: PathBuf,
    state: PathBuf,
    engine: Option<PathBuf>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <plan|apply|validate> <workspace.yaml> [--state FILE] [--engine FILE]\n\
         Example: {} plan demos/workspace.yaml --state /tmp/demo.state.json",
        program, program
    )
}

fn parse_args(args: &[String]) -> Result<Args> {
    let program = args.first().map(String::as_str).unwrap_or("terrawalk");
    if args.len() < 3 {
        bail!(usage(program));
    }
    let operation = match args[1].as_str() {
        "plan" => OperationKind::Plan,
        "apply" => OperationKind::Apply,
        "validate" => OperationKind::Validate,
        other => bail!("unknown operation '{}'\n{}", other, usage(program)),
    };

    let mut parsed = Args {
        operation,
        workspace: PathBuf::from(&args[2]),
        state: PathBuf::from(DEFAULT_STATE_FILE),
        engine: None,
    };
    let mut rest = args[3..].iter();
    while let Some(flag) = rest.next() {
        let value = rest
            .next()
            .with_context(|| format!("{} needs a value", flag))?;
        match flag.as_str() {
            "--state" => parsed.state = PathBuf::from(value),
            "--engine" => parsed.engine = Some(PathBuf::from(value)),
            other => bail!("unknown flag '{}'\n{}", other, usage(program)),
        }
    }
    Ok(parsed)
}

fn registry() -> ProviderRegistry {
    ProviderRegistry::new().with("mem", |address: &Address| {
        Arc::new(InMemoryProvider::new(address.as_str())) as Arc<dyn Provider>
    })
}

fn print_output(output: &RunOutput) {
    if let Some(plan) = output.plan() {
        if output.operation == OperationKind::Plan {
            for change in plan.actionable() {
                println!("  {} {}", change.action, change.address);
            }
            println!("{}", plan.summary());
        }
        for (address, value) in &plan.outputs {
            println!("  {} = {}", address, value);
        }
    }
    if let Some(state) = output.state() {
        println!(
            "State serial {}: {} resource(s)",
            state.serial,
            state.len()
        );
    }
    for diagnostic in output.diagnostics.iter() {
        eprintln!("{}", diagnostic);
    }
    let progress = match output.progress() {
        Progress::NothingRan => "nothing ran",
        Progress::Partial => "ran partially",
        Progress::Complete => "ran completely",
    };
    println!("{} {} ({})", output.operation, output.phase, progress);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let args = parse_args(&args)?;

    let workspace = Workspace::load(&args.workspace)
        .with_context(|| format!("loading workspace {}", args.workspace.display()))?;
    let engine = match &args.engine {
        Some(path) => load_engine_config(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let store = JsonFileStateStore::new(&args.state);
    let orchestrator = Orchestrator::new(registry());

    let start = Instant::now();
    let output = orchestrator
        .run_with_store(args.operation, &workspace, &store, engine.to_run_options())
        .await;
    print_output(&output);
    println!("Finished in {:?}", start.elapsed());

    if let Some(err) = &output.error {
        bail!("{} failed: {}", args.operation, err);
    }
    if output.diagnostics.has_errors() {
        bail!("{} finished with errors", args.operation);
    }
    Ok(())
}
