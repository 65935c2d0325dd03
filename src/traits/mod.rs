// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod provider;

pub use provider::{AppliedChange, ProposedChange, Provider, ProviderHandle};
