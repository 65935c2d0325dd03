// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recorded infrastructure state.
//!
//! A [`StateDocument`] maps resource addresses to the attributes last
//! returned by their provider. It is loaded through a [`StateStore`] at the
//! start of an operation, wrapped in a [`SyncState`] for the duration of the
//! walk and, for apply, written back at the end.

mod store;
mod sync;

pub use store::{JsonFileStateStore, MemoryStateStore, StateStore};
pub use sync::SyncState;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::consts::STATE_SCHEMA_VERSION;
use crate::errors::StateStoreError;
use crate::graph::Address;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    #[default]
    Ready,
    /// Creation started but did not finish cleanly. Replaced on the next apply.
    Tainted,
}

/// One real object as last seen by its provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    pub attributes: Value,
    pub provider: Address,
    /// Resources this object depended on when it was written. Used to order
    /// deletion once the resource leaves configuration.
    #[serde(default)]
    pub dependencies: Vec<Address>,
    #[serde(default)]
    pub status: ObjectStatus,
}

impl ResourceObject {
    pub fn new(attributes: Value, provider: Address) -> Self {
        Self {
            attributes,
            provider,
            dependencies: Vec::new(),
            status: ObjectStatus::Ready,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Address>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn tainted(mut self) -> Self {
        self.status = ObjectStatus::Tainted;
        self
    }

    pub fn is_tainted(&self) -> bool {
        self.status == ObjectStatus::Tainted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub schema_version: u32,
    /// Incremented by every apply that changed at least one object.
    #[serde(default)]
    pub serial: u64,
    #[serde(default)]
    pub resources: BTreeMap<Address, ResourceObject>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            serial: 0,
            resources: BTreeMap::new(),
        }
    }
}

impl StateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, address: impl Into<Address>, object: ResourceObject) -> Self {
        self.resources.insert(address.into(), object);
        self
    }

    pub fn get(&self, address: &Address) -> Option<&ResourceObject> {
        self.resources.get(address)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn check_schema(&self) -> Result<(), StateStoreError> {
        if self.schema_version != STATE_SCHEMA_VERSION {
            return Err(StateStoreError::UnsupportedSchema {
                found: self.schema_version,
                expected: STATE_SCHEMA_VERSION,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_round_trips_through_json() {
        let doc = StateDocument::new().with_resource(
            "mem_network.main",
            ResourceObject::new(json!({ "id": "n-1" }), Address::new("provider.mem"))
                .with_dependencies(vec![Address::new("mem_zone.a")]),
        );
        let text = serde_json::to_string(&doc).unwrap();
        let parsed: StateDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let doc: StateDocument = serde_json::from_value(json!({
            "schema_version": 1,
            "resources": {
                "mem_x.a": { "attributes": { "id": "a" }, "provider": "provider.mem" }
            }
        }))
        .unwrap();
        let object = doc.get(&Address::new("mem_x.a")).unwrap();
        assert_eq!(object.status, ObjectStatus::Ready);
        assert!(object.dependencies.is_empty());
        assert_eq!(doc.serial, 0);
    }

    #[test]
    fn test_unsupported_schema_is_rejected() {
        let doc = StateDocument {
            schema_version: 7,
            ..StateDocument::default()
        };
        assert!(matches!(
            doc.check_schema(),
            Err(StateStoreError::UnsupportedSchema { found: 7, expected: 1 })
        ));
    }
}
