// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::consts::DEFAULT_PARALLELISM;
use crate::errors::FailureStrategy;
use crate::graph::Address;
use crate::transform::TargetMode;

/// Per-run knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Upper bound on concurrently evaluating vertices.
    pub parallelism: usize,
    /// Empty means the whole configuration.
    pub targets: Vec<Address>,
    pub target_mode: TargetMode,
    /// Cancelling stops dispatch; in-flight vertices finish.
    pub cancel: CancellationToken,
    pub failure_strategy: FailureStrategy,
    pub timeout: Option<Duration>,
    pub refresh: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            targets: Vec::new(),
            target_mode: TargetMode::default(),
            cancel: CancellationToken::new(),
            failure_strategy: FailureStrategy::default(),
            timeout: None,
            refresh: false,
        }
    }
}

impl RunOptions {
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_targets<I, A>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_mode(mut self, target_mode: TargetMode) -> Self {
        self.target_mode = target_mode;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_failure_strategy(mut self, failure_strategy: FailureStrategy) -> Self {
        self.failure_strategy = failure_strategy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }
}
