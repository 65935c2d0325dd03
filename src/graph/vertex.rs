// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::Address;
use crate::config::Expression;
use crate::traits::ProviderHandle;

/// Kind tag for a [`Vertex`], handy for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Resource,
    Provider,
    Output,
    ModuleBoundary,
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VertexKind::Resource => "resource",
            VertexKind::Provider => "provider",
            VertexKind::Output => "output",
            VertexKind::ModuleBoundary => "module",
        };
        f.write_str(name)
    }
}

/// A unit of work in the operation graph.
///
/// Vertices are immutable once the transformer pipeline hands the graph to
/// the walker; everything a vertex produces flows through the walk's value
/// map and the synchronized state.
pub enum Vertex {
    Resource(ResourceVertex),
    Provider(ProviderVertex),
    Output(OutputVertex),
    ModuleBoundary(ModuleBoundaryVertex),
}

impl Vertex {
    pub fn address(&self) -> &Address {
        match self {
            Vertex::Resource(v) => &v.address,
            Vertex::Provider(v) => &v.address,
            Vertex::Output(v) => &v.address,
            Vertex::ModuleBoundary(v) => &v.address,
        }
    }

    pub fn kind(&self) -> VertexKind {
        match self {
            Vertex::Resource(_) => VertexKind::Resource,
            Vertex::Provider(_) => VertexKind::Provider,
            Vertex::Output(_) => VertexKind::Output,
            Vertex::ModuleBoundary(_) => VertexKind::ModuleBoundary,
        }
    }

    /// Addresses this vertex reads values from. Each becomes an incoming edge.
    pub fn references(&self) -> &BTreeSet<Address> {
        match self {
            Vertex::Resource(v) => &v.references,
            Vertex::Provider(v) => &v.references,
            Vertex::Output(v) => &v.references,
            Vertex::ModuleBoundary(v) => &v.references,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceVertex> {
        match self {
            Vertex::Resource(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_resource_mut(&mut self) -> Option<&mut ResourceVertex> {
        match self {
            Vertex::Resource(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_provider(&self) -> Option<&ProviderVertex> {
        match self {
            Vertex::Provider(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_provider_mut(&mut self) -> Option<&mut ProviderVertex> {
        match self {
            Vertex::Provider(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertex::Resource(v) => v.fmt(f),
            Vertex::Provider(v) => v.fmt(f),
            Vertex::Output(v) => v.fmt(f),
            Vertex::ModuleBoundary(v) => v.fmt(f),
        }
    }
}

/// Lifecycle flags carried from resource configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Lifecycle {
    /// On replacement, create the new object before destroying the old one.
    pub create_before_destroy: bool,
    /// Any plan that would destroy the object fails the vertex instead.
    pub prevent_destroy: bool,
}

/// Where a resource vertex comes from.
#[derive(Clone)]
pub enum ResourceMode {
    /// Declared in configuration; the expression yields the desired attributes.
    Desired(Arc<dyn Expression>),
    /// Present in prior state but no longer declared; planned for deletion.
    Orphan { prior_dependencies: Vec<Address> },
}

#[derive(Clone)]
pub struct ResourceVertex {
    pub address: Address,
    pub mode: ResourceMode,
    pub references: BTreeSet<Address>,
    pub lifecycle: Lifecycle,
    /// Provider configuration serving this resource, once resolved.
    pub provider: Option<Address>,
    /// Set by the provider transformer; required before walking.
    pub provider_handle: Option<ProviderHandle>,
}

impl ResourceVertex {
    pub fn desired(address: Address, config: Arc<dyn Expression>) -> Self {
        let references = config.references();
        Self {
            address,
            mode: ResourceMode::Desired(config),
            references,
            lifecycle: Lifecycle::default(),
            provider: None,
            provider_handle: None,
        }
    }

    pub fn orphan(address: Address, provider: Address, prior_dependencies: Vec<Address>) -> Self {
        Self {
            address,
            mode: ResourceMode::Orphan { prior_dependencies },
            references: BTreeSet::new(),
            lifecycle: Lifecycle::default(),
            provider: Some(provider),
            provider_handle: None,
        }
    }

    pub fn is_orphan(&self) -> bool {
        matches!(self.mode, ResourceMode::Orphan { .. })
    }
}

impl fmt::Debug for ResourceVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceVertex")
            .field("address", &self.address)
            .field("orphan", &self.is_orphan())
            .field("references", &self.references)
            .field("lifecycle", &self.lifecycle)
            .field("provider", &self.provider)
            .finish()
    }
}

#[derive(Clone)]
pub struct ProviderVertex {
    pub address: Address,
    pub provider_type: String,
    pub config: Arc<dyn Expression>,
    pub references: BTreeSet<Address>,
    pub handle: Option<ProviderHandle>,
}

impl fmt::Debug for ProviderVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderVertex")
            .field("address", &self.address)
            .field("provider_type", &self.provider_type)
            .field("references", &self.references)
            .field("instantiated", &self.handle.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct OutputVertex {
    pub address: Address,
    pub expression: Arc<dyn Expression>,
    pub references: BTreeSet<Address>,
}

impl fmt::Debug for OutputVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputVertex")
            .field("address", &self.address)
            .field("references", &self.references)
            .finish()
    }
}

/// Closes a module: depends on everything inside it, and everything that
/// reads the module as a whole depends on it.
#[derive(Debug, Clone)]
pub struct ModuleBoundaryVertex {
    pub address: Address,
    pub references: BTreeSet<Address>,
}

impl ModuleBoundaryVertex {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            references: BTreeSet::new(),
        }
    }
}
