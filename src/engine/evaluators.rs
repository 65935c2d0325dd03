// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Vertex evaluation for each operation.
//!
//! | vertex          | validate            | plan                        | apply                          |
//! |-----------------|---------------------|-----------------------------|--------------------------------|
//! | provider        | evaluate config     | evaluate config, configure  | evaluate config, configure     |
//! | resource        | evaluate config     | refresh?, diff, propose     | plan, then carry out the change |
//! | output          | evaluate expression | evaluate expression         | evaluate expression            |
//! | module boundary | module outputs      | module outputs              | module outputs                 |

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{Action, PlannedChange, VertexEvaluator, VertexOutput, WalkContext};
use crate::config::Scope;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::errors::VertexError;
use crate::graph::{
    Address, ModuleBoundaryVertex, OutputVertex, ProviderVertex, ResourceMode, ResourceVertex, Vertex,
};
use crate::observability::messages::provider::{ChangeApplied, ProviderConfigured};
use crate::observability::messages::StructuredLog;
use crate::orchestrator::OperationKind;
use crate::state::ResourceObject;
use crate::traits::ProviderHandle;

/// The evaluator an operation walks its graph with.
pub fn evaluator_for(operation: OperationKind) -> Arc<dyn VertexEvaluator> {
    match operation {
        OperationKind::Plan => Arc::new(PlanEvaluator),
        OperationKind::Apply => Arc::new(ApplyEvaluator),
        OperationKind::Validate => Arc::new(ValidateEvaluator),
    }
}

/// Checks expressions and references without calling any provider.
pub struct ValidateEvaluator;

#[async_trait]
impl VertexEvaluator for ValidateEvaluator {
    async fn evaluate(
        &self,
        vertex: &Vertex,
        scope: &Scope,
        _ctx: &WalkContext,
    ) -> Result<VertexOutput, VertexError> {
        match vertex {
            Vertex::Provider(provider) => evaluate_provider_config(provider, scope).map(VertexOutput::value),
            Vertex::Resource(resource) => {
                let desired = desired_config(resource, scope)?;
                Ok(VertexOutput::value(desired.unwrap_or(Value::Null)))
            }
            Vertex::Output(output) => evaluate_output(output, scope),
            Vertex::ModuleBoundary(boundary) => Ok(module_outputs(boundary, scope)),
        }
    }
}

/// Computes proposed changes. Never changes a real object or state.
pub struct PlanEvaluator;

#[async_trait]
impl VertexEvaluator for PlanEvaluator {
    async fn evaluate(
        &self,
        vertex: &Vertex,
        scope: &Scope,
        ctx: &WalkContext,
    ) -> Result<VertexOutput, VertexError> {
        match vertex {
            Vertex::Provider(provider) => configure_provider(provider, scope, ctx).await,
            Vertex::Resource(resource) => {
                let (_, change) = plan_resource(resource, scope, ctx).await?;
                Ok(VertexOutput {
                    value: change.after.clone().unwrap_or(Value::Null),
                    change: Some(change),
                })
            }
            Vertex::Output(output) => evaluate_output(output, scope),
            Vertex::ModuleBoundary(boundary) => Ok(module_outputs(boundary, scope)),
        }
    }
}

/// Plans each resource against current state, then carries the change out
/// and records the result in state.
pub struct ApplyEvaluator;

#[async_trait]
impl VertexEvaluator for ApplyEvaluator {
    async fn evaluate(
        &self,
        vertex: &Vertex,
        scope: &Scope,
        ctx: &WalkContext,
    ) -> Result<VertexOutput, VertexError> {
        match vertex {
            Vertex::Provider(provider) => configure_provider(provider, scope, ctx).await,
            Vertex::Resource(resource) => apply_resource(resource, scope, ctx).await,
            Vertex::Output(output) => evaluate_output(output, scope),
            Vertex::ModuleBoundary(boundary) => Ok(module_outputs(boundary, scope)),
        }
    }
}

fn evaluate_provider_config(provider: &ProviderVertex, scope: &Scope) -> Result<Value, VertexError> {
    provider.config.evaluate(scope).map_err(VertexError::Evaluation)
}

async fn configure_provider(
    provider: &ProviderVertex,
    scope: &Scope,
    ctx: &WalkContext,
) -> Result<VertexOutput, VertexError> {
    let config = evaluate_provider_config(provider, scope)?;
    let handle = provider
        .handle
        .as_ref()
        .ok_or_else(|| missing_instance(&provider.address))?;
    let diagnostics = handle.configure(&config).await?;
    absorb(&provider.address, diagnostics, ctx)?;
    ProviderConfigured {
        address: &provider.address,
        provider: handle.name(),
    }
    .log();
    Ok(VertexOutput::value(config))
}

fn evaluate_output(output: &OutputVertex, scope: &Scope) -> Result<VertexOutput, VertexError> {
    output
        .expression
        .evaluate(scope)
        .map(VertexOutput::value)
        .map_err(VertexError::Evaluation)
}

/// An object of the module's own outputs, keyed by output name.
fn module_outputs(boundary: &ModuleBoundaryVertex, scope: &Scope) -> VertexOutput {
    let outputs: Map<String, Value> = scope
        .entries()
        .filter(|(address, _)| {
            address.is_output() && address.module_path().as_ref() == Some(&boundary.address)
        })
        .filter_map(|(address, value)| {
            let name = address.segments().last()?;
            Some((name.to_string(), value.clone()))
        })
        .collect();
    VertexOutput::value(Value::Object(outputs))
}

fn desired_config(resource: &ResourceVertex, scope: &Scope) -> Result<Option<Value>, VertexError> {
    match &resource.mode {
        ResourceMode::Desired(config) => config
            .evaluate(scope)
            .map(Some)
            .map_err(VertexError::Evaluation),
        ResourceMode::Orphan { .. } => Ok(None),
    }
}

fn handle_of(resource: &ResourceVertex) -> Result<&ProviderHandle, VertexError> {
    resource
        .provider_handle
        .as_ref()
        .ok_or_else(|| missing_instance(&resource.address))
}

fn missing_instance(address: &Address) -> VertexError {
    VertexError::Internal(format!("'{}' has no provider instance", address))
}

/// Fails on provider error diagnostics, keeps warnings.
fn absorb(address: &Address, diagnostics: Diagnostics, ctx: &WalkContext) -> Result<(), VertexError> {
    if diagnostics.has_errors() {
        return Err(VertexError::ProviderDiagnostics {
            address: address.clone(),
            diagnostics,
        });
    }
    ctx.diagnostics.append_all(
        diagnostics
            .into_iter()
            .map(|d| match d.address {
                Some(_) => d,
                None => d.with_address(address.clone()),
            })
            .collect::<Vec<_>>()
            .into(),
    );
    Ok(())
}

/// Diffs desired configuration against the current object.
async fn plan_resource<'a>(
    resource: &'a ResourceVertex,
    scope: &Scope,
    ctx: &WalkContext,
) -> Result<(&'a ProviderHandle, PlannedChange), VertexError> {
    let address = &resource.address;
    let handle = handle_of(resource)?;
    let desired = desired_config(resource, scope)?;

    let prior = ctx.state.get(address);
    let tainted = prior.as_ref().map(ResourceObject::is_tainted).unwrap_or(false);
    let mut current = prior.map(|object| object.attributes);

    if ctx.refresh {
        if let Some(recorded) = current.take() {
            current = handle.read_resource(address, &recorded).await?;
            if current.is_none() {
                ctx.diagnostics.append(
                    Diagnostic::warning(
                        "Object no longer exists",
                        format!("'{}' was deleted outside of this engine", address),
                    )
                    .with_address(address.clone()),
                );
            }
        }
    }

    let proposed = handle
        .plan_change(address, desired.as_ref(), current.as_ref())
        .await?;
    absorb(address, proposed.diagnostics, ctx)?;

    let action = Action::derive(
        current.as_ref(),
        proposed.planned.as_ref(),
        proposed.requires_replace || tainted,
    );
    if resource.lifecycle.prevent_destroy && matches!(action, Action::Delete | Action::Replace) {
        return Err(VertexError::PreventDestroy {
            address: address.clone(),
        });
    }

    Ok((
        handle,
        PlannedChange {
            address: address.clone(),
            action,
            before: current,
            after: proposed.planned,
            provider: handle.address().clone(),
        },
    ))
}

async fn apply_resource(
    resource: &ResourceVertex,
    scope: &Scope,
    ctx: &WalkContext,
) -> Result<VertexOutput, VertexError> {
    let (handle, change) = plan_resource(resource, scope, ctx).await?;
    let address = &resource.address;

    let value = match change.action {
        Action::NoOp => {
            if change.after.is_none() {
                ctx.state.remove(address);
            }
            change.after.clone().unwrap_or(Value::Null)
        }
        Action::Create | Action::Update => write_object(handle, resource, &change, ctx).await?,
        Action::Delete => {
            destroy_object(handle, &change, ctx, true).await?;
            Value::Null
        }
        Action::Replace if resource.lifecycle.create_before_destroy => {
            let created = write_object(handle, resource, &change.as_create(), ctx).await?;
            destroy_object(handle, &change.as_delete(), ctx, false).await?;
            created
        }
        Action::Replace => {
            destroy_object(handle, &change.as_delete(), ctx, true).await?;
            write_object(handle, resource, &change.as_create(), ctx).await?
        }
    };

    Ok(VertexOutput {
        value,
        change: Some(change),
    })
}

/// Creates or updates the object and records it. An object returned along
/// with errors is recorded as tainted and fails the vertex.
async fn write_object(
    handle: &ProviderHandle,
    resource: &ResourceVertex,
    change: &PlannedChange,
    ctx: &WalkContext,
) -> Result<Value, VertexError> {
    let address = &resource.address;
    let applied = handle.apply_change(change).await?;

    let Some(attributes) = applied.new_object else {
        ctx.state.remove(address);
        absorb(address, applied.diagnostics, ctx)?;
        return Ok(Value::Null);
    };

    let object = ResourceObject::new(attributes.clone(), handle.address().clone())
        .with_dependencies(recorded_dependencies(resource));
    if applied.diagnostics.has_errors() {
        ctx.state.set(address.clone(), object.tainted());
        return Err(VertexError::ProviderDiagnostics {
            address: address.clone(),
            diagnostics: applied.diagnostics,
        });
    }
    ctx.state.set(address.clone(), object);
    absorb(address, applied.diagnostics, ctx)?;
    ChangeApplied {
        address,
        action: &change.action.to_string(),
    }
    .log();
    Ok(attributes)
}

/// Deletes the old object. `forget` is false when a create-before-destroy
/// replacement already owns the state entry.
async fn destroy_object(
    handle: &ProviderHandle,
    change: &PlannedChange,
    ctx: &WalkContext,
    forget: bool,
) -> Result<(), VertexError> {
    let address = &change.address;
    let applied = handle.apply_change(change).await?;
    absorb(address, applied.diagnostics, ctx)?;
    if forget {
        ctx.state.remove(address);
    }
    ChangeApplied {
        address,
        action: &change.action.to_string(),
    }
    .log();
    Ok(())
}

/// Resources this one depends on, for ordering its eventual deletion.
fn recorded_dependencies(resource: &ResourceVertex) -> Vec<Address> {
    resource
        .references
        .iter()
        .filter(|a| !a.is_provider() && !a.is_module() && !a.is_output())
        .cloned()
        .collect()
}
