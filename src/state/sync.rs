// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{ResourceObject, StateDocument};
use crate::graph::Address;

/// The state document shared by every worker of one walk.
///
/// Each accessor takes the lock for exactly one read or write and never
/// hands out a guard, so no caller can hold the lock across a provider call.
/// Reads return clones.
#[derive(Debug)]
pub struct SyncState {
    document: RwLock<StateDocument>,
}

impl SyncState {
    pub fn new(document: StateDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    pub fn get(&self, address: &Address) -> Option<ResourceObject> {
        self.document.read().resources.get(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.document.read().resources.contains_key(address)
    }

    /// Replaces the object at `address`, returning the previous one.
    pub fn set(&self, address: Address, object: ResourceObject) -> Option<ResourceObject> {
        self.document.write().resources.insert(address, object)
    }

    pub fn remove(&self, address: &Address) -> Option<ResourceObject> {
        self.document.write().resources.remove(address)
    }

    pub fn len(&self) -> usize {
        self.document.read().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.read().resources.is_empty()
    }

    /// Snapshot of every resource currently recorded.
    pub fn resources(&self) -> BTreeMap<Address, ResourceObject> {
        self.document.read().resources.clone()
    }

    /// Snapshot of the whole document.
    pub fn current(&self) -> StateDocument {
        self.document.read().clone()
    }

    pub fn into_inner(self) -> StateDocument {
        self.document.into_inner()
    }
}
