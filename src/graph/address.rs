// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

const MODULE_SEGMENT: &str = "module";
const PROVIDER_PREFIX: &str = "provider";
const OUTPUT_SEGMENT: &str = "output";

/// Stable, human-readable identity of a vertex.
///
/// Addresses are dot-separated and hierarchical. Resources nested in a module
/// carry the module path as a prefix:
///
/// ```text
/// mem_network.main
/// module.net.mem_subnet.a[0]
/// provider.mem.west
/// output.network_id
/// ```
///
/// # Examples
/// ```
/// use terrawalk::graph::Address;
///
/// let addr = Address::new("module.net.mem_subnet.a[0]");
/// assert_eq!(addr.module_path(), Some(Address::new("module.net")));
/// assert!(addr.matches_target(&Address::new("module.net")));
/// assert!(addr.matches_target(&Address::new("module.net.mem_subnet.a")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The innermost module this address lives in, or `None` for the root module.
    ///
    /// A module address itself (`module.net`) belongs to its parent module.
    pub fn module_path(&self) -> Option<Address> {
        let segments: Vec<&str> = self.segments().collect();
        let mut end = 0;
        let mut i = 0;
        while i + 1 < segments.len() && segments[i] == MODULE_SEGMENT {
            // A trailing `module.<name>` pair names the module itself, not a member.
            if i + 2 == segments.len() {
                break;
            }
            end = i + 2;
            i += 2;
        }
        if end == 0 {
            None
        } else {
            Some(Address(segments[..end].join(".")))
        }
    }

    /// True if this address names a module (`module.<name>` repeated).
    pub fn is_module(&self) -> bool {
        let segments: Vec<&str> = self.segments().collect();
        !segments.is_empty()
            && segments.len() % 2 == 0
            && segments.chunks(2).all(|pair| pair[0] == MODULE_SEGMENT)
    }

    /// True for output values (`output.x`, `module.net.output.x`).
    pub fn is_output(&self) -> bool {
        !self.is_module() && self.resource_type() == Some(OUTPUT_SEGMENT)
    }

    pub fn is_provider(&self) -> bool {
        self.segments().next() == Some(PROVIDER_PREFIX)
    }

    /// True if this address lives anywhere below `module`.
    pub fn is_within(&self, module: &Address) -> bool {
        self.0.len() > module.0.len()
            && self.0.starts_with(module.as_str())
            && self.0.as_bytes()[module.0.len()] == b'.'
    }

    /// Whether a target filter entry selects this address.
    ///
    /// A target selects itself, everything nested under it with `.`, and every
    /// indexed instance (`[n]`) of it.
    pub fn matches_target(&self, target: &Address) -> bool {
        if self == target {
            return true;
        }
        self.0.len() > target.0.len()
            && self.0.starts_with(target.as_str())
            && matches!(self.0.as_bytes()[target.0.len()], b'.' | b'[')
    }

    /// The resource type segment (`mem_subnet` in `module.net.mem_subnet.a`).
    pub fn resource_type(&self) -> Option<&str> {
        let mut segments = self.segments().peekable();
        while segments.peek() == Some(&MODULE_SEGMENT) {
            segments.next();
            segments.next();
        }
        segments.next()
    }

    /// Provider configuration implied by the resource type prefix:
    /// `mem_subnet.a` is served by `provider.mem`.
    pub fn implied_provider(&self) -> Option<Address> {
        let resource_type = self.resource_type()?;
        let provider_type = resource_type.split('_').next()?;
        if provider_type.is_empty() {
            return None;
        }
        Some(Address(format!("{}.{}", PROVIDER_PREFIX, provider_type)))
    }

    /// Provider type named by a provider configuration address
    /// (`mem` for `provider.mem.west`).
    pub fn provider_type(&self) -> Option<&str> {
        let mut segments = self.segments();
        match segments.next() {
            Some(PROVIDER_PREFIX) => segments.next(),
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
