// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::diagnostics::Diagnostics;
use crate::engine::PlannedChange;
use crate::errors::ProviderError;
use crate::graph::Address;
use crate::observability::messages::provider::ProviderCallFailed;
use crate::observability::messages::StructuredLog;

/// What a provider proposes for one resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposedChange {
    /// Attributes the object will have after apply. `None` means the object
    /// will not exist. Values not known until apply use the unknown marker.
    pub planned: Option<Value>,
    /// The change cannot be made in place.
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

/// Result of applying one change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedChange {
    /// The object as it now exists, or `None` if it no longer exists.
    pub new_object: Option<Value>,
    pub diagnostics: Diagnostics,
}

/// A plugin that owns one family of resource types.
///
/// Every call may suspend for a long time. A provider that is not
/// [`concurrency_safe`](Provider::concurrency_safe) only ever sees one call
/// at a time per instance.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn concurrency_safe(&self) -> bool {
        false
    }

    async fn configure(&self, config: &Value) -> Result<Diagnostics, ProviderError>;

    /// Refreshes an object. `Ok(None)` means it no longer exists.
    async fn read_resource(
        &self,
        address: &Address,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError>;

    async fn plan_change(
        &self,
        address: &Address,
        desired: Option<&Value>,
        current: Option<&Value>,
    ) -> Result<ProposedChange, ProviderError>;

    async fn apply_change(&self, change: &PlannedChange) -> Result<AppliedChange, ProviderError>;
}

/// One instantiated provider configuration, shared by every resource vertex
/// bound to it.
///
/// Calls go through the handle, which holds the instance's exclusion scope
/// for the duration of the call and nothing longer.
#[derive(Clone)]
pub struct ProviderHandle {
    address: Address,
    provider: Arc<dyn Provider>,
    gate: Arc<Mutex<()>>,
}

impl ProviderHandle {
    pub fn new(address: Address, provider: Arc<dyn Provider>) -> Self {
        Self {
            address,
            provider,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    async fn serialize(&self) -> Option<MutexGuard<'_, ()>> {
        if self.provider.concurrency_safe() {
            None
        } else {
            Some(self.gate.lock().await)
        }
    }

    pub async fn configure(&self, config: &Value) -> Result<Diagnostics, ProviderError> {
        let result = {
            let _guard = self.serialize().await;
            self.provider.configure(config).await
        };
        self.report("configure", &self.address, result)
    }

    pub async fn read_resource(
        &self,
        address: &Address,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let result = {
            let _guard = self.serialize().await;
            self.provider.read_resource(address, current).await
        };
        self.report("read_resource", address, result)
    }

    pub async fn plan_change(
        &self,
        address: &Address,
        desired: Option<&Value>,
        current: Option<&Value>,
    ) -> Result<ProposedChange, ProviderError> {
        let result = {
            let _guard = self.serialize().await;
            self.provider.plan_change(address, desired, current).await
        };
        self.report("plan_change", address, result)
    }

    pub async fn apply_change(&self, change: &PlannedChange) -> Result<AppliedChange, ProviderError> {
        let result = {
            let _guard = self.serialize().await;
            self.provider.apply_change(change).await
        };
        self.report("apply_change", &change.address, result)
    }

    fn report<T>(
        &self,
        call: &str,
        address: &Address,
        result: Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        if let Err(err) = &result {
            ProviderCallFailed {
                provider: self.provider.name(),
                call,
                address,
                error: err,
            }
            .log();
        }
        result
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("address", &self.address)
            .field("provider", &self.provider.name())
            .field("concurrency_safe", &self.provider.concurrency_safe())
            .finish()
    }
}
