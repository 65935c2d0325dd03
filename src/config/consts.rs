// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default number of vertices evaluated concurrently.
pub const DEFAULT_PARALLELISM: usize = 10;
/// Upper bound accepted from configuration.
pub const MAX_PARALLELISM: usize = 256;
/// Version written to, and required from, state documents.
pub const STATE_SCHEMA_VERSION: u32 = 1;
