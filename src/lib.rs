// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;     // provider implementations
pub mod config;       // declared configuration + engine settings
pub mod diagnostics;  // errors and warnings reported to the caller
pub mod engine;       // concurrent walker and evaluators
pub mod errors;       // error handling
pub mod graph;        // addressed dependency graph
pub mod observability;
pub mod orchestrator; // plan / apply / validate
pub mod state;        // synchronized state and stores
pub mod traits;       // provider abstraction
pub mod transform;    // graph construction passes
