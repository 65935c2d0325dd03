// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::graph::Address;
use crate::traits::Provider;

/// Creates a provider instance for one provider configuration.
pub trait ProviderFactory: Send + Sync {
    fn instantiate(&self, address: &Address) -> Arc<dyn Provider>;
}

impl<F> ProviderFactory for F
where
    F: Fn(&Address) -> Arc<dyn Provider> + Send + Sync,
{
    fn instantiate(&self, address: &Address) -> Arc<dyn Provider> {
        self(address)
    }
}

/// Provider type name (`mem` in `provider.mem.west`) to factory.
#[derive(Clone, Default)]
pub struct ProviderRegistry(HashMap<String, Arc<dyn ProviderFactory>>);

impl ProviderRegistry {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn register(&mut self, provider_type: impl Into<String>, factory: impl ProviderFactory + 'static) {
        self.0.insert(provider_type.into(), Arc::new(factory));
    }

    /// Builder form of [`ProviderRegistry::register`].
    pub fn with(mut self, provider_type: impl Into<String>, factory: impl ProviderFactory + 'static) -> Self {
        self.register(provider_type, factory);
        self
    }

    /// Registers one shared instance for every configuration of this type.
    pub fn with_instance(self, provider_type: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.with(provider_type, move |_: &Address| provider.clone())
    }

    pub fn contains(&self, provider_type: &str) -> bool {
        self.0.contains_key(provider_type)
    }

    pub fn instantiate(&self, provider_type: &str, address: &Address) -> Option<Arc<dyn Provider>> {
        self.0.get(provider_type).map(|factory| factory.instantiate(address))
    }

    pub fn types(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.0.keys().collect();
        types.sort();
        f.debug_struct("ProviderRegistry")
            .field("provider_types", &types)
            .finish()
    }
}
