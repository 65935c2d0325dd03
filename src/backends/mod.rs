// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Provider implementations shipped with the engine.

pub mod memory;

pub use memory::{InMemoryProvider, ProviderCall};
