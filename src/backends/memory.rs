// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::engine::plan::{is_unknown, unknown};
use crate::engine::{Action, PlannedChange};
use crate::errors::ProviderError;
use crate::graph::Address;
use crate::traits::{AppliedChange, ProposedChange, Provider};

/// One call observed by an [`InMemoryProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub call: &'static str,
    pub address: Option<Address>,
    pub action: Option<Action>,
}

/// A provider whose "infrastructure" is a map held in memory.
///
/// Object ids are derived from the provider name and the resource address, so
/// two runs over the same configuration produce identical state. Failure
/// injection and call accounting make it the workhorse of the test suite.
pub struct InMemoryProvider {
    name: String,
    concurrency_safe: bool,
    delay: Duration,
    reject_config: bool,
    fail_plan: HashSet<Address>,
    fail_apply: HashSet<Address>,
    taint_apply: HashSet<Address>,
    protocol_failure: HashSet<Address>,
    replace_on: HashSet<String>,
    deleted_outside: HashSet<Address>,
    objects: Mutex<BTreeMap<Address, Value>>,
    calls: Mutex<Vec<ProviderCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            concurrency_safe: false,
            delay: Duration::ZERO,
            reject_config: false,
            fail_plan: HashSet::new(),
            fail_apply: HashSet::new(),
            taint_apply: HashSet::new(),
            protocol_failure: HashSet::new(),
            replace_on: HashSet::new(),
            deleted_outside: HashSet::new(),
            objects: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn concurrency_safe(mut self) -> Self {
        self.concurrency_safe = true;
        self
    }

    /// Every call sleeps this long while holding its in-flight slot.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `configure` answers with an error diagnostic.
    pub fn rejecting_config(mut self) -> Self {
        self.reject_config = true;
        self
    }

    pub fn failing_plan(mut self, address: impl Into<Address>) -> Self {
        self.fail_plan.insert(address.into());
        self
    }

    pub fn failing_apply(mut self, address: impl Into<Address>) -> Self {
        self.fail_apply.insert(address.into());
        self
    }

    /// Apply creates the object but reports an error alongside it.
    pub fn tainting_apply(mut self, address: impl Into<Address>) -> Self {
        self.taint_apply.insert(address.into());
        self
    }

    /// Any call for `address` fails as if the provider connection broke.
    pub fn protocol_failure(mut self, address: impl Into<Address>) -> Self {
        self.protocol_failure.insert(address.into());
        self
    }

    /// Changing this attribute cannot be done in place.
    pub fn replace_on(mut self, attribute: impl Into<String>) -> Self {
        self.replace_on.insert(attribute.into());
        self
    }

    /// Refresh reports this object as gone.
    pub fn deleted_outside(mut self, address: impl Into<Address>) -> Self {
        self.deleted_outside.insert(address.into());
        self
    }

    /// Seeds an existing object.
    pub fn with_object(self, address: impl Into<Address>, attributes: Value) -> Self {
        self.objects.lock().insert(address.into(), attributes);
        self
    }

    pub fn object(&self, address: &Address) -> Option<Value> {
        self.objects.lock().get(address).cloned()
    }

    pub fn objects(&self) -> BTreeMap<Address, Value> {
        self.objects.lock().clone()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    /// Addresses passed to `apply_change`, in call order.
    pub fn applied(&self) -> Vec<(Address, Action)> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.call == "apply_change")
            .filter_map(|c| Some((c.address.clone()?, c.action?)))
            .collect()
    }

    /// Highest number of calls ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Deterministic id for an object created at `address`.
    pub fn object_id(&self, address: &Address) -> String {
        format!("{}/{}", self.name, address)
    }

    async fn enter(&self, call: &'static str, address: Option<&Address>, action: Option<Action>) -> InFlight<'_> {
        self.calls.lock().push(ProviderCall {
            call,
            address: address.cloned(),
            action,
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let slot = InFlight { counter: &self.in_flight };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        slot
    }

    fn check_protocol(&self, address: &Address) -> Result<(), ProviderError> {
        if self.protocol_failure.contains(address) {
            return Err(ProviderError::Protocol {
                provider: self.name.clone(),
                message: format!("connection lost while handling '{}'", address),
            });
        }
        Ok(())
    }

    fn recoverable(&self, address: &Address, message: &str) -> ProviderError {
        ProviderError::Recoverable {
            provider: self.name.clone(),
            address: address.clone(),
            message: message.to_string(),
        }
    }

    fn requires_replace(&self, desired: &Map<String, Value>, current: &Value) -> bool {
        self.replace_on
            .iter()
            .any(|key| desired.get(key) != current.get(key))
    }
}

/// Holds one in-flight slot until dropped.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

fn as_attributes(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn concurrency_safe(&self) -> bool {
        self.concurrency_safe
    }

    async fn configure(&self, _config: &Value) -> Result<Diagnostics, ProviderError> {
        let _slot = self.enter("configure", None, None).await;
        let mut diagnostics = Diagnostics::new();
        if self.reject_config {
            diagnostics.push(Diagnostic::error(
                "Invalid provider configuration",
                format!("provider '{}' rejected its configuration", self.name),
            ));
        }
        Ok(diagnostics)
    }

    async fn read_resource(
        &self,
        address: &Address,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let _slot = self.enter("read_resource", Some(address), None).await;
        self.check_protocol(address)?;
        if self.deleted_outside.contains(address) {
            return Ok(None);
        }
        Ok(Some(self.object(address).unwrap_or_else(|| current.clone())))
    }

    async fn plan_change(
        &self,
        address: &Address,
        desired: Option<&Value>,
        current: Option<&Value>,
    ) -> Result<ProposedChange, ProviderError> {
        let _slot = self.enter("plan_change", Some(address), None).await;
        self.check_protocol(address)?;
        if self.fail_plan.contains(address) {
            return Err(self.recoverable(address, "plan rejected"));
        }

        let Some(desired) = desired else {
            return Ok(ProposedChange::default());
        };
        let mut planned = as_attributes(desired);
        let requires_replace = current
            .map(|c| self.requires_replace(&planned, c))
            .unwrap_or(false);
        let id = match current.and_then(|c| c.get("id")) {
            Some(id) if !requires_replace => id.clone(),
            _ => unknown(),
        };
        planned.insert("id".to_string(), id);

        Ok(ProposedChange {
            planned: Some(Value::Object(planned)),
            requires_replace,
            diagnostics: Diagnostics::new(),
        })
    }

    async fn apply_change(&self, change: &PlannedChange) -> Result<AppliedChange, ProviderError> {
        let address = &change.address;
        let _slot = self
            .enter("apply_change", Some(address), Some(change.action))
            .await;
        self.check_protocol(address)?;
        if self.fail_apply.contains(address) {
            return Err(self.recoverable(address, "apply rejected"));
        }

        match change.action {
            Action::NoOp => Ok(AppliedChange {
                new_object: change.before.clone(),
                diagnostics: Diagnostics::new(),
            }),
            Action::Delete => {
                // A create-before-destroy replacement has already stored the
                // new object under the same address.
                let mut objects = self.objects.lock();
                let stale = match (&change.before, objects.get(address)) {
                    (Some(before), Some(stored)) => before == stored,
                    _ => true,
                };
                if stale {
                    objects.remove(address);
                }
                Ok(AppliedChange::default())
            }
            Action::Create | Action::Update | Action::Replace => {
                let mut attributes = change
                    .after
                    .as_ref()
                    .map(as_attributes)
                    .unwrap_or_default();
                for value in attributes.values_mut() {
                    if is_unknown(value) {
                        *value = Value::String(self.object_id(address));
                    }
                }
                let object = Value::Object(attributes);
                self.objects.lock().insert(address.clone(), object.clone());

                let mut diagnostics = Diagnostics::new();
                if self.taint_apply.contains(address) {
                    diagnostics.push(Diagnostic::error(
                        "Object created with errors",
                        format!("'{}' exists but did not finish initializing", address),
                    ));
                }
                Ok(AppliedChange {
                    new_object: Some(object),
                    diagnostics,
                })
            }
        }
    }
}
