// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod consts;
mod expression;
mod loader;
mod provider_registry;
mod tree;
mod workspace;

pub use expression::{reference_target, Expression, Scope, TemplateExpression, ValueLookup};
pub use loader::{load_engine_config, parse_engine_config, EngineConfig};
pub use provider_registry::{ProviderFactory, ProviderRegistry};
pub use tree::{ConfigTree, OutputConfig, ProviderConfig, ResourceConfig, StaticConfig};
pub use workspace::{OutputBlock, ProviderBlock, ResourceBlock, Workspace};
