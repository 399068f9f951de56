// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Connection health tracking with exponential backoff

use std::time::Duration;

/// Consecutive errors tolerated before attempts are throttled
const BACKOFF_THRESHOLD: u32 = 3;

/// Tracks connection health and error state
#[derive(Clone, Debug, Default)]
pub(super) struct ConnectionState {
    pub(super) consecutive_errors: u32,
    last_error_time: Option<tokio::time::Instant>,
}

impl ConnectionState {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn record_success(&mut self) {
        self.consecutive_errors = 0;
        self.last_error_time = None;
    }

    pub(super) fn record_error(&mut self) {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.last_error_time = Some(tokio::time::Instant::now());
    }

    pub(super) fn backoff_delay(&self) -> Duration {
        // 2^n seconds, capped at 2^8
        let base_delay = 2u64.pow(self.consecutive_errors.min(8));
        Duration::from_secs(base_delay.min(300))
    }

    pub(super) fn should_skip_attempt(&self) -> bool {
        if self.consecutive_errors < BACKOFF_THRESHOLD {
            return false;
        }

        if let Some(last_error) = self.last_error_time {
            last_error.elapsed() < self.backoff_delay()
        } else {
            false
        }
    }
}
