// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for provider interactions.
//!
//! This module contains message types for logging events related to:
//! * Provider instantiation and configuration
//! * Provider call failures
//! * Changes applied to real objects

use crate::graph::Address;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Provider instance created for a provider configuration.
///
/// # Log Level
/// `debug!` - One line per provider configuration
pub struct ProviderInstantiated<'a> {
    pub address: &'a Address,
    pub provider_type: &'a str,
}

impl Display for ProviderInstantiated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Instantiated provider '{}' of type '{}'",
            self.address, self.provider_type
        )
    }
}

impl StructuredLog for ProviderInstantiated<'_> {
    fn log(&self) {
        tracing::debug!(address = %self.address, provider_type = self.provider_type, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("provider", span_name = name, address = %self.address)
    }
}

/// Provider accepted its configuration.
///
/// # Log Level
/// `debug!` - Provider lifecycle
pub struct ProviderConfigured<'a> {
    pub address: &'a Address,
    pub provider: &'a str,
}

impl Display for ProviderConfigured<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Provider '{}' ({}) configured", self.address, self.provider)
    }
}

impl StructuredLog for ProviderConfigured<'_> {
    fn log(&self) {
        tracing::debug!(address = %self.address, provider = self.provider, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("provider_configured", span_name = name, address = %self.address)
    }
}

/// A provider call returned an error.
///
/// # Log Level
/// `warn!` - The vertex fails, the walk decides what happens next
///
/// # Example
/// ```
/// use terrawalk::graph::Address;
/// use terrawalk::observability::messages::provider::ProviderCallFailed;
///
/// let address = Address::new("mem_network.main");
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded");
/// let msg = ProviderCallFailed {
///     provider: "mem",
///     call: "apply_change",
///     address: &address,
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct ProviderCallFailed<'a> {
    pub provider: &'a str,
    pub call: &'a str,
    pub address: &'a Address,
    pub error: &'a dyn std::error::Error,
}

impl Display for ProviderCallFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Provider '{}' {} failed for '{}': {}",
            self.provider, self.call, self.address, self.error
        )
    }
}

impl StructuredLog for ProviderCallFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            provider = self.provider,
            call = self.call,
            address = %self.address,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "provider_call_failed",
            span_name = name,
            provider = self.provider,
            call = self.call,
        )
    }
}

/// A change was applied to a real object.
///
/// # Log Level
/// `info!` - Infrastructure was modified
pub struct ChangeApplied<'a> {
    pub address: &'a Address,
    pub action: &'a str,
}

impl Display for ChangeApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: {} complete", self.address, self.action)
    }
}

impl StructuredLog for ChangeApplied<'_> {
    fn log(&self) {
        tracing::info!(address = %self.address, action = self.action, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("change_applied", span_name = name, address = %self.address)
    }
}
