use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::RetryPolicy;

/// Tuning for one list instance.
///
/// Durations are stored in milliseconds so the struct round-trips through
/// settings files unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Height assumed for rows that were never measured.
    pub estimated_row_height: u32,
    pub max_preview_lines: u32,
    pub image_row_height: u32,
    /// Extra rows rendered on each side of the viewport.
    pub overscan: usize,
    pub asset_cache_capacity: usize,
    pub max_concurrent_fetches: usize,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub scroll_settle_ms: u64,
    pub resize_debounce_ms: u64,
}

impl ListConfig {
    pub const fn new() -> Self {
        Self {
            estimated_row_height: 2,
            max_preview_lines: 3,
            image_row_height: 3,
            overscan: 3,
            asset_cache_capacity: 100,
            max_concurrent_fetches: 3,
            retry_attempts: 3,
            retry_backoff_ms: 200,
            scroll_settle_ms: 120,
            resize_debounce_ms: 100,
        }
    }

    pub const fn with_estimated_row_height(mut self, height: u32) -> Self {
        self.estimated_row_height = height;
        self
    }

    pub const fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub const fn with_max_preview_lines(mut self, lines: u32) -> Self {
        self.max_preview_lines = lines;
        self
    }

    pub const fn with_asset_cache_capacity(mut self, capacity: usize) -> Self {
        self.asset_cache_capacity = capacity;
        self
    }

    pub const fn with_retry(mut self, attempts: u32, backoff_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_backoff_ms = backoff_ms;
        self
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_backoff_ms))
    }

    pub const fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub const fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fall_back_to_defaults() {
        let config: ListConfig = serde_json::from_str(r#"{"overscan": 5, "retry_backoff_ms": 50}"#).unwrap();
        assert_eq!(config.overscan, 5);
        assert_eq!(config.retry_policy(), RetryPolicy::new(3, Duration::from_millis(50)));
        assert_eq!(config.asset_cache_capacity, 100);
    }
}
